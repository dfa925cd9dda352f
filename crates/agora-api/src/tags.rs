use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};

use agora_core::Actor;
use agora_types::api::{AddTagsRequest, Claims};

use crate::error::ApiError;
use crate::state::{AppState, blocking};

pub async fn add_tags_to_post(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(post_id): Path<i64>,
    Json(req): Json<AddTagsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = Actor::from(&claims);
    let tags = blocking(&state, move |s| s.tags.add_to_post(actor, post_id, &req.tags)).await?;
    Ok(Json(tags))
}

pub async fn tags_for_post(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let tags = blocking(&state, move |s| s.tags.for_post(post_id)).await?;
    Ok(Json(tags))
}

pub async fn get_tag(State(state): State<AppState>, Path(name): Path<String>) -> Result<impl IntoResponse, ApiError> {
    let tag = blocking(&state, move |s| s.tags.get_by_name(&name)).await?;
    Ok(Json(tag))
}
