//! Authentication error types.

use thiserror::Error;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// JWT validation failed.
    #[error("JWT validation failed: {0}")]
    JwtValidation(String),

    /// JWT encoding failed.
    #[error("JWT encoding failed: {0}")]
    JwtEncoding(String),

    /// Token expired.
    #[error("Token expired")]
    TokenExpired,

    /// Invalid token.
    #[error("Invalid token")]
    InvalidToken,

    /// Wrong password, or no password set for the account.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Password hashing failed.
    #[error("Password hashing failed")]
    PasswordHash,
}

impl AuthError {
    /// Returns true if the error means the caller failed to prove who they are,
    /// as opposed to an internal failure.
    pub fn is_unauthenticated(&self) -> bool {
        !matches!(self, Self::JwtEncoding(_) | Self::PasswordHash)
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            jsonwebtoken::errors::ErrorKind::InvalidToken => AuthError::InvalidToken,
            _ => AuthError::JwtValidation(e.to_string()),
        }
    }
}

/// Result type for authentication operations.
pub type AuthResult<T> = Result<T, AuthError>;
