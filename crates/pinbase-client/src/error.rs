//! Client error types

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, ClientError>;

/// Client errors
#[derive(Error, Debug)]
pub enum ClientError {
    /// Invalid configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage layer error
    #[error(transparent)]
    Store(#[from] pinbase_store::StoreError),
}

impl ClientError {
    /// Check if this error originated in validation rather than a backend
    pub fn is_validation(&self) -> bool {
        use pinbase_store::StoreError;
        matches!(
            self,
            Self::Config(_)
                | Self::Store(StoreError::Validation(_) | StoreError::MissingIdentifier(_))
        )
    }
}
