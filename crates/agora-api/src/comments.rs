use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};

use agora_core::Actor;
use agora_core::pagination::Page;
use agora_types::api::{Claims, CreateCommentRequest, PageQuery, UpdateCommentRequest};

use crate::error::ApiError;
use crate::state::{AppState, blocking};

pub async fn add_comment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateCommentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = Actor::from(&claims);
    let comment = blocking(&state, move |s| s.comments.add(actor, req.post_id, &req.content)).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn get_comment(State(state): State<AppState>, Path(id): Path<i64>) -> Result<impl IntoResponse, ApiError> {
    let comment = blocking(&state, move |s| s.comments.get(id)).await?;
    Ok(Json(comment))
}

pub async fn comments_by_post(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = Page::try_from(query)?;
    let comments = blocking(&state, move |s| s.comments.list_by_post(post_id, page)).await?;
    Ok(Json(comments))
}

pub async fn update_comment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateCommentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = Actor::from(&claims);
    let comment = blocking(&state, move |s| s.comments.update(actor, id, &req.content)).await?;
    Ok(Json(comment))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = Actor::from(&claims);
    blocking(&state, move |s| s.comments.delete(actor, id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
