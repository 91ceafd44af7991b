//! # AppError
//!
//! Centralized error handling for the Ashtray services.
//! Maps domain-specific failures to actionable error types.

use thiserror::Error;

/// The primary error type for all ash-core operations.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (e.g., Item, Review, Comment)
    #[error("{0} not found with ID {1}")]
    NotFound(String, String),

    /// Validation failure (e.g., rating out of range, empty content)
    #[error("validation error: {0}")]
    ValidationError(String),

    /// Missing or invalid credentials
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated, but acting on someone else's content
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Infrastructure failure (e.g., DB down)
    #[error("internal service error: {0}")]
    Internal(String),

    /// Resource already exists (e.g., duplicate account email)
    #[error("conflict: {0}")]
    Conflict(String),

    /// Rate limit exceeded. `retry_after_secs` is `None` when waiting will not help.
    #[error("too many requests: {message}")]
    RateLimitExceeded {
        message: String,
        retry_after_secs: Option<u64>,
    },
}

impl AppError {
    pub fn not_found(kind: &str, id: impl ToString) -> Self {
        AppError::NotFound(kind.to_string(), id.to_string())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::ValidationError(msg.into())
    }
}

/// Ports report typed failures (e.g. a duplicate email) by wrapping an
/// `AppError` in the `anyhow::Error`; those pass through unchanged.
impl From<anyhow::Error> for AppError {
    fn from(e: anyhow::Error) -> Self {
        match e.downcast::<AppError>() {
            Ok(app) => app,
            Err(e) => AppError::Internal(format!("{e:#}")),
        }
    }
}

/// A specialized Result type for Ashtray logic.
pub type Result<T> = std::result::Result<T, AppError>;
