//! Error types for the chunking crate

use thiserror::Error;

/// Chunking-specific error types
#[derive(Error, Debug)]
pub enum ChunkingError {
    /// Chunking error
    #[error("Chunking error: {0}")]
    ChunkingError(String),

    /// IO error wrapper
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Anyhow error wrapper
    #[error("Generic error: {0}")]
    AnyhowError(#[from] anyhow::Error),

    /// Other error (fallback)
    #[error("Other error: {0}")]
    Other(String),
}

impl ChunkingError {
    pub fn chunking_error(msg: impl Into<String>) -> Self {
        Self::ChunkingError(msg.into())
    }
}

/// Result type alias for chunking operations
pub type ChunkingResult<T> = Result<T, ChunkingError>;
