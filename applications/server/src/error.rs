/// Server error types
use crate::services::blob_store::BlobError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tape_core::CoreError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ServerError>;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("{0}")]
    Validation(String),

    #[error("User not found")]
    UserNotFound,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired")]
    ExpiredToken,

    /// Token is well-formed but is no longer the user's current session
    #[error("Session is no longer active")]
    SessionMismatch,

    #[error("Not authenticated")]
    Unauthenticated,

    #[error("Email already registered")]
    EmailTaken,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Audio not found")]
    AudioNotFound,

    #[error("Share ticket not found")]
    TicketNotFound,

    #[error("Share ticket expired")]
    TicketExpired,

    #[error("Cannot share audio with yourself")]
    SelfShare,

    #[error("Shared audio no longer exists")]
    SourceAudioMissing,

    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Blob store error: {0}")]
    BlobStore(#[from] BlobError),

    #[error("Store error: {0}")]
    Store(#[from] CoreError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Bcrypt error: {0}")]
    Bcrypt(#[from] bcrypt::BcryptError),
}

impl From<tape_storage::StorageError> for ServerError {
    fn from(err: tape_storage::StorageError) -> Self {
        ServerError::Store(err.into())
    }
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::Validation(_) | ServerError::SelfShare => StatusCode::BAD_REQUEST,
            ServerError::UserNotFound
            | ServerError::AudioNotFound
            | ServerError::TicketNotFound
            | ServerError::SourceAudioMissing => StatusCode::NOT_FOUND,
            ServerError::InvalidCredentials
            | ServerError::InvalidToken
            | ServerError::ExpiredToken
            | ServerError::SessionMismatch
            | ServerError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ServerError::Forbidden(_) => StatusCode::FORBIDDEN,
            ServerError::EmailTaken => StatusCode::CONFLICT,
            ServerError::TicketExpired => StatusCode::GONE,
            ServerError::UpstreamUnavailable(_) => StatusCode::BAD_GATEWAY,
            ServerError::BlobStore(_)
            | ServerError::Store(_)
            | ServerError::Config(_)
            | ServerError::Internal(_)
            | ServerError::Bcrypt(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();

        let error_message = match self {
            ServerError::UpstreamUnavailable(ref msg) => {
                tracing::error!("Upstream unavailable: {}", msg);
                "Upstream unavailable".to_string()
            }
            ServerError::BlobStore(ref e) => {
                tracing::error!("Blob store error: {:?}", e);
                "Blob store error".to_string()
            }
            ServerError::Store(ref e) => {
                tracing::error!("Store error: {:?}", e);
                "Database error".to_string()
            }
            ServerError::Config(ref msg) => {
                tracing::error!("Config error: {}", msg);
                "Configuration error".to_string()
            }
            ServerError::Internal(ref msg) => {
                tracing::error!("Internal error: {}", msg);
                "Internal server error".to_string()
            }
            ServerError::Bcrypt(ref e) => {
                tracing::error!("Bcrypt error: {:?}", e);
                "Password error".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}
