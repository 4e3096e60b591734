//! Error taxonomy shared across the dispatch core.

use thiserror::Error;

/// Failure categories for core operations.
///
/// `Validation` and `NotFound` always fail fast with no side effects.
/// `Conflict` covers success-adjacent states (already assigned, already
/// distributed) that callers usually report rather than retry.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
}

impl CoreError {
    pub fn validation(message: impl Into<String>) -> Self {
        CoreError::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        CoreError::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        CoreError::Conflict(message.into())
    }
}
