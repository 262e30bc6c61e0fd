//! Error types for subscription operations
//!
//! This module defines the errors the engine surfaces to its callers. Caller
//! mistakes (`NotFound`, `Validation`) are reported verbatim; storage failures
//! are passed through untouched and never retried here.

use std::fmt;
use thiserror::Error;

/// Subscription engine error types.
#[derive(Debug, Error)]
pub enum SubscriptionError {
    /// A referenced tenant, user or post does not exist
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of entity that was looked up
        entity: &'static str,
        /// Identifier that was looked up
        id: String,
    },

    /// Input rejected (unknown settings key, malformed bitmask, ...)
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The backing store could not serve the request
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),
}

/// Result type for subscription operations.
pub type SubscriptionResult<T> = Result<T, SubscriptionError>;

impl SubscriptionError {
    /// Build a `NotFound` error for `entity` with identifier `id`.
    pub fn not_found(entity: &'static str, id: impl fmt::Display) -> Self {
        SubscriptionError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Check if this error should be logged at error level.
    ///
    /// Caller-correctable errors are expected and are not server errors.
    pub fn is_server_error(&self) -> bool {
        matches!(self, SubscriptionError::StorageUnavailable(_))
    }

    /// Check if the caller may retry the same request unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SubscriptionError::StorageUnavailable(_))
    }

    /// Get error code for API responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            SubscriptionError::NotFound { .. } => "NOT_FOUND",
            SubscriptionError::Validation(_) => "VALIDATION_ERROR",
            SubscriptionError::StorageUnavailable(_) => "STORAGE_UNAVAILABLE",
        }
    }
}
