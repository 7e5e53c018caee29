//! Error types for the Lookalike service.
//!
//! This module defines a unified error enum that covers all error categories
//! in the application: index lifecycle, embedding, data sources, persistence,
//! and configuration.

use thiserror::Error;

/// Unified error type for the Lookalike service.
///
/// All fallible functions in the application return `Result<T, AppError>`.
/// We never panic; errors must be represented and propagated.
#[derive(Error, Debug)]
pub enum AppError {
    /// The index has not finished its initial build. Retryable: callers
    /// should poll the health report until `ready` is true.
    #[error("index is not ready: {0}")]
    NotReady(String),

    /// Product id unknown to the data source or the index.
    #[error("product {0} not found")]
    NotFound(u64),

    /// Product exists at the source but is marked deleted.
    #[error("product {0} is marked deleted")]
    AlreadyDeleted(u64),

    /// Embedding input unreachable or invalid.
    #[error("embedding error: {0}")]
    Embed(String),

    /// Persisted artifact incompatible with the active embedding model.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    Dimension { expected: usize, actual: usize },

    /// Durable write or read of the index artifacts failed.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Product data source errors (connection, query, dump parse).
    #[error("data source error: {0}")]
    Source(String),

    /// Configuration-related errors
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl AppError {
    /// Whether the caller may retry the same request later without change.
    ///
    /// Only `NotReady` qualifies: the background build will eventually
    /// transition the index to ready or failed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::NotReady(_))
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = AppError::NotFound(42);
        assert_eq!(err.to_string(), "product 42 not found");

        let err = AppError::Dimension {
            expected: 512,
            actual: 384,
        };
        assert!(err.to_string().contains("512"));
        assert!(err.to_string().contains("384"));
    }

    #[test]
    fn test_retryable() {
        assert!(AppError::NotReady("building".into()).is_retryable());
        assert!(!AppError::NotFound(1).is_retryable());
        assert!(!AppError::Embed("bad image".into()).is_retryable());
    }
}
