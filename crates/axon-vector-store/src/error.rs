//! Error types for vector store operations

use thiserror::Error;

/// Result type alias for vector store operations
pub type VectorStoreResult<T> = Result<T, VectorStoreError>;

/// Errors that can occur during vector storage operations
#[derive(Error, Debug)]
pub enum VectorStoreError {
    /// Storage backend is unavailable or connection failed
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// A collection exists with a different vector dimension than requested
    #[error(
        "Collection '{collection}' has dimension {existing}, but {requested} was requested"
    )]
    CollectionDimensionMismatch {
        collection: String,
        existing: u64,
        requested: u64,
    },

    /// Collection/index operations failed
    #[error("Collection operation failed: {0}")]
    CollectionError(String),

    /// One or more payload index creations failed; all failures are reported
    #[error("Failed to create payload indexes: {0:?}")]
    IndexCreationFailed(Vec<String>),

    /// Storage backend specific error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Generic error for other issues
    #[error("Other error: {0}")]
    Other(String),
}

impl From<anyhow::Error> for VectorStoreError {
    fn from(err: anyhow::Error) -> Self {
        VectorStoreError::Other(err.to_string())
    }
}
