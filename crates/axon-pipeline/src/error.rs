//! Error types for the embed pipeline.

use axon_embeddings::EmbeddingError;
use axon_vector_store::VectorStoreError;
use thiserror::Error;

pub type PipelineResult<T> = Result<T, PipelineError>;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("embedding failed: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("vector store failed: {0}")]
    VectorStore(#[from] VectorStoreError),

    #[error("chunking produced a mismatched vector count: expected {expected}, got {actual}")]
    VectorCountMismatch { expected: usize, actual: usize },

    #[error("other error: {0}")]
    Other(String),
}
