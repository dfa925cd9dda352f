use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};

use agora_core::pagination::Page;
use agora_types::api::{Claims, PageQuery, ToggleReactionRequest, ToggleReactionResponse};
use agora_types::models::ReactionTarget;

use crate::error::ApiError;
use crate::state::{AppState, blocking};

pub async fn toggle_reaction(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<ToggleReactionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let target = ReactionTarget::from_ids(req.post_id, req.comment_id)
        .ok_or_else(|| ApiError::BadRequest("exactly one of post_id or comment_id is required".into()))?;

    let outcome = blocking(&state, move |s| s.reactions.toggle(claims.sub, target, req.reaction_type)).await?;
    Ok(Json(ToggleReactionResponse {
        state: outcome.state().to_string(),
        reaction_type: outcome.current(),
    }))
}

pub async fn reactions_for_post(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = Page::try_from(query)?;
    let reactions = blocking(&state, move |s| s.reactions.list(ReactionTarget::Post(post_id), page)).await?;
    Ok(Json(reactions))
}

pub async fn reactions_for_comment(
    State(state): State<AppState>,
    Path(comment_id): Path<i64>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = Page::try_from(query)?;
    let reactions = blocking(&state, move |s| s.reactions.list(ReactionTarget::Comment(comment_id), page)).await?;
    Ok(Json(reactions))
}
