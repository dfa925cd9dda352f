use axum::{
    Extension, Json,
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
};

use agora_core::{Actor, ServiceError};
use agora_core::uploads::ImageFolder;
use agora_core::users::ConfirmOutcome;
use agora_types::api::{
    AvatarResponse, Claims, ConfirmUpdateRequest, ConfirmUpdateResponse, UpdateProfileRequest, UpdateUserRequest,
};
use agora_types::models::ProfileChanges;

use crate::error::ApiError;
use crate::state::{AppState, blocking};

pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Extension(_claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let user = blocking(&state, move |s| s.users.get_user(id)).await?;
    Ok(Json(user))
}

pub async fn current_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let user = blocking(&state, move |s| s.users.get_user(claims.sub)).await?;
    Ok(Json(user))
}

/// Starts the emailed-code confirmation for the caller's own profile.
pub async fn update_current_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let changes = ProfileChanges {
        username: req.username,
        email_address: req.email_address,
    };
    blocking(&state, move |s| s.users.request_update(claims.sub, changes)).await?;
    Ok(StatusCode::ACCEPTED)
}

/// Admin variant of [`update_current_user`] for any account.
pub async fn update_specific_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if !claims.is_admin() {
        return Err(ServiceError::Forbidden("admin role required".into()).into());
    }
    let actor = Actor::from(&claims);
    let changes = ProfileChanges {
        username: req.username,
        email_address: req.email_address,
    };
    blocking(&state, move |s| s.users.request_update_as(actor, req.id, changes)).await?;
    Ok(StatusCode::ACCEPTED)
}

pub async fn confirm_update(
    State(state): State<AppState>,
    Json(req): Json<ConfirmUpdateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = blocking(&state, move |s| s.users.confirm_update(&req.email, &req.code)).await?;

    let (status, reason) = match outcome {
        ConfirmOutcome::Applied => (StatusCode::OK, None),
        other => (StatusCode::BAD_REQUEST, Some(other.reason().to_string())),
    };
    Ok((
        status,
        Json(ConfirmUpdateResponse {
            confirmed: outcome.is_applied(),
            reason,
        }),
    ))
}

/// Raw image body; the type comes from `Content-Type`.
pub async fn upload_avatar(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let content_type = headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok());
    let url = state.images.save(ImageFolder::Avatars, content_type, &body).await?;

    let stored = url.clone();
    blocking(&state, move |s| s.users.set_avatar(claims.sub, &stored)).await?;
    Ok(Json(AvatarResponse { avatar_url: url }))
}
