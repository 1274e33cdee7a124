//! Server error types.

use api_protocol::{ErrorBody, ValidationError};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use shop_store::StoreError;

/// Server error type.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Malformed or unacceptable input.
    #[error("{0}")]
    InvalidInput(String),

    /// Missing or invalid credentials.
    #[error("{0}")]
    Unauthenticated(String),

    /// Authenticated, but not allowed.
    #[error("{0}")]
    Forbidden(String),

    /// Resource not found.
    #[error("{0}")]
    NotFound(String),

    /// A product cannot cover the requested quantity.
    #[error("Insufficient stock for {name}. Available: {available}")]
    InsufficientStock { name: String, available: i32 },

    /// The resource is not in a state that allows the operation.
    #[error("{0}")]
    InvalidState(String),

    /// Request validation failed.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Storage error.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Authentication error.
    #[error("Auth error: {0}")]
    Auth(#[from] auth::AuthError),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServerError {
    /// Returns the HTTP status this error renders with.
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::InvalidInput(_)
            | ServerError::InsufficientStock { .. }
            | ServerError::InvalidState(_)
            | ServerError::Validation(_) => StatusCode::BAD_REQUEST,
            ServerError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ServerError::Forbidden(_) => StatusCode::FORBIDDEN,
            ServerError::NotFound(_) => StatusCode::NOT_FOUND,
            ServerError::Auth(e) if e.is_unauthenticated() => StatusCode::UNAUTHORIZED,
            ServerError::Store(StoreError::NotFound { .. }) => StatusCode::NOT_FOUND,
            ServerError::Store(StoreError::AlreadyExists { .. }) => StatusCode::BAD_REQUEST,
            ServerError::Auth(_) | ServerError::Store(_) | ServerError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
            ErrorBody::new("Server error").with_error(self.to_string())
        } else {
            match &self {
                ServerError::Auth(_) => ErrorBody::new("Invalid token."),
                ServerError::Store(StoreError::NotFound { entity_type, .. }) => {
                    ErrorBody::new(format!("{entity_type} not found"))
                }
                _ => ErrorBody::new(self.to_string()),
            }
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for server operations.
pub type ServerResult<T> = Result<T, ServerError>;
