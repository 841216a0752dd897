//! Error types for the reconciliation core

use thiserror::Error;

/// Result type for reconciliation operations
pub type Result<T> = std::result::Result<T, Error>;

/// Reconciliation errors
#[derive(Error, Debug)]
pub enum Error {
    /// Bad or missing webhook signature
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Timestamp outside the replay tolerance
    #[error("replay rejected: {0}")]
    Replay(String),

    /// Malformed payload
    #[error("validation failed: {0}")]
    Validation(String),

    /// Transient storage failure; the provider is expected to retry
    #[error("persistence failure: {0}")]
    Persistence(String),

    /// Configuration error (missing secret, bad config file, ...)
    #[error("configuration error: {0}")]
    Config(String),

    /// Referenced record does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// A stored-state invariant was violated
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
