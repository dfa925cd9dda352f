use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use agora_core::ServiceError;

/// Error type for every handler. Internal failures are logged here and
/// answered with a generic message.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("{0}")]
    BadRequest(String),

    #[error("blocking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Join(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Service(e) => match e {
                ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
                ServiceError::InvalidInput(_) => StatusCode::BAD_REQUEST,
                ServiceError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
                ServiceError::Conflict(_) => StatusCode::CONFLICT,
                ServiceError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
                ServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
                ServiceError::Transport(_) => StatusCode::SERVICE_UNAVAILABLE,
                ServiceError::Storage(_)
                | ServiceError::Io(_)
                | ServiceError::Token(_)
                | ServiceError::PasswordHash(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            Self::Service(ServiceError::Transport(e)) => {
                error!("Email queue unavailable: {}", e);
                "email service unavailable".to_string()
            }
            Self::Service(e) if e.is_internal() => {
                error!("Request failed: {}", e);
                "internal server error".to_string()
            }
            Self::Join(e) => {
                error!("spawn_blocking join error: {}", e);
                "internal server error".to_string()
            }
            other => other.to_string(),
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}
