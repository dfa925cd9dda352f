use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};

use agora_core::pagination::Page;
use agora_types::api::{PageQuery, TopicRequest};

use crate::error::ApiError;
use crate::state::{AppState, blocking};

pub async fn list_topics(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = Page::try_from(query)?;
    let topics = blocking(&state, move |s| s.topics.list(page)).await?;
    Ok(Json(topics))
}

pub async fn get_topic(State(state): State<AppState>, Path(id): Path<i64>) -> Result<impl IntoResponse, ApiError> {
    let topic = blocking(&state, move |s| s.topics.get(id)).await?;
    Ok(Json(topic))
}

pub async fn create_topic(
    State(state): State<AppState>,
    Json(req): Json<TopicRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let topic = blocking(&state, move |s| s.topics.create(&req.name, req.description.as_deref())).await?;
    Ok((StatusCode::CREATED, Json(topic)))
}

pub async fn update_topic(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<TopicRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let topic = blocking(&state, move |s| s.topics.update(id, &req.name, req.description.as_deref())).await?;
    Ok(Json(topic))
}

pub async fn delete_topic(State(state): State<AppState>, Path(id): Path<i64>) -> Result<impl IntoResponse, ApiError> {
    blocking(&state, move |s| s.topics.delete(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
