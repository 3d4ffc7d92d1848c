//! Error types for the pinbase-store crate

use thiserror::Error;

/// Result type alias using `StoreError`
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur during item/data storage operations
///
/// Absence is never an error: lookups return `None`, removals return
/// `false`. The variants here cover validation failures (raised before any
/// network call), the parent-item precondition, and backend/gateway
/// failures, which propagate without retries or wrapping.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Malformed caller input (bad type string, non-object data body, ...)
    #[error("validation error: {0}")]
    Validation(String),

    /// A required identifier was not supplied
    #[error("missing identifier: {0}")]
    MissingIdentifier(&'static str),

    /// Data operation attempted against an item that does not exist
    #[error("item not found: {0}")]
    ItemMissing(String),

    /// A backend record could not be interpreted as a domain object
    #[error("malformed record {hash}: {reason}")]
    MalformedRecord { hash: String, reason: String },

    /// Pin operation rejected by the backend
    #[error("pin operation failed: {0}")]
    PinFailed(String),

    /// Unpin operation rejected by the backend
    #[error("unpin operation failed: {0}")]
    UnpinFailed(String),

    /// Gateway retrieval failed
    #[error("gateway error: {0}")]
    Gateway(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Deserialization error
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// Connection error
    #[error("connection error: {0}")]
    Connection(String),

    /// Operation timed out
    #[error("operation timed out after {seconds}s")]
    Timeout { seconds: u64 },

    /// HTTP error
    #[error("http error: {0}")]
    Http(String),
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            StoreError::Timeout { seconds: 30 }
        } else if err.is_connect() {
            StoreError::Connection(err.to_string())
        } else {
            StoreError::Http(err.to_string())
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

impl From<regex::Error> for StoreError {
    fn from(err: regex::Error) -> Self {
        StoreError::Validation(format!("invalid pattern: {}", err))
    }
}
