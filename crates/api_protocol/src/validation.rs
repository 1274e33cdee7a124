//! Request validation.

use thiserror::Error;

/// A request body or query that failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or blank.
    #[error("{0} is required")]
    Required(&'static str),

    /// A field is present but its value is not acceptable.
    #[error("Invalid {field}: {reason}")]
    Invalid {
        field: &'static str,
        reason: String,
    },

    /// A check that is reported to the client with a fixed message.
    #[error("{0}")]
    Message(String),
}

impl ValidationError {
    /// Creates an invalid field error.
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }

    /// Creates an error carrying a fixed client message.
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }
}

/// Checks that serde alone cannot express.
pub trait Validate {
    /// Returns an error describing the first problem found.
    fn validate(&self) -> Result<(), ValidationError>;
}

/// Fails with `Required(field)` when `value` is empty or whitespace.
pub fn require_non_blank(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required(field));
    }
    Ok(())
}

/// Minimal shape check for an email address.
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    require_non_blank("email", email)?;
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(ValidationError::invalid("email", "not an email address")),
    }
}
