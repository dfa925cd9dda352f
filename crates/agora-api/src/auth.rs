use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};

use agora_types::api::{Claims, LoginRequest, RefreshRequest, RegisterRequest};

use crate::error::ApiError;
use crate::state::{AppState, blocking};

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let registered = blocking(&state, move |s| s.users.register(&req.username, &req.email, &req.password)).await?;
    Ok((StatusCode::CREATED, Json(registered)))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let tokens = blocking(&state, move |s| s.users.login(&req.username, &req.password)).await?;
    Ok(Json(tokens))
}

/// Public: the access token presented here has normally expired already.
pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.access_token.is_empty() || req.refresh_token.is_empty() {
        return Err(ApiError::BadRequest("access_token and refresh_token are required".into()));
    }
    let tokens = blocking(&state, move |s| s.users.refresh(&req.access_token, &req.refresh_token)).await?;
    Ok(Json(tokens))
}

pub async fn revoke(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    blocking(&state, move |s| s.users.revoke(claims.sub)).await?;
    Ok(StatusCode::NO_CONTENT)
}
