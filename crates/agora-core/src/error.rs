use thiserror::Error;

use crate::queue::QueueError;

/// Errors returned by the service layer.
///
/// Business-rule failures (`NotFound`, `InvalidInput`, ...) are expected
/// outcomes for callers; `Transport`, `Storage`, `Io` and `Token` are
/// infrastructure faults.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("already exists: {0}")]
    Conflict(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("permission denied: {0}")]
    Forbidden(String),

    /// The email queue could not accept a message. No retry is attempted.
    #[error("queue transport failure: {0}")]
    Transport(#[from] QueueError),

    #[error("storage error: {0}")]
    Storage(#[from] anyhow::Error),

    #[error("file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("password hashing error: {0}")]
    PasswordHash(String),
}

impl ServiceError {
    /// True for failures caused by infrastructure rather than the request.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::Storage(_) | Self::Io(_) | Self::Token(_) | Self::PasswordHash(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;
