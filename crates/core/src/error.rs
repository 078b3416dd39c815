// Central Error Type for the Application
//
// Front-ends print these messages as-is, so the user-facing variants carry
// the exact text the user should see.

use crate::domain::DomainError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    /// Rejected input (form validation, bad attachments)
    #[error("{0}")]
    Domain(#[from] DomainError),

    #[error("{0}")]
    NotFound(String),

    /// Duplicate registration
    #[error("{0}")]
    Conflict(String),

    /// Bad credentials
    #[error("{0}")]
    Unauthorized(String),

    /// Signed in, but not allowed (deleting someone else's listing)
    #[error("{0}")]
    Forbidden(String),

    #[error("Storage error: {0}")]
    Database(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    /// Stored data we cannot make sense of
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// The user can fix this by changing their input
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            AppError::Domain(_)
                | AppError::NotFound(_)
                | AppError::Conflict(_)
                | AppError::Unauthorized(_)
                | AppError::Forbidden(_)
        )
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
