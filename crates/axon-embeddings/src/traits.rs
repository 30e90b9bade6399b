//! Trait abstraction over the embedding-inference backend.

use crate::EmbeddingResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Model metadata reported by the embedding-inference service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeiInfo {
    pub model_id: String,
    pub dimension: usize,
    pub max_input: usize,
}

impl Default for TeiInfo {
    fn default() -> Self {
        Self {
            model_id: "unknown".to_string(),
            dimension: 1024,
            max_input: 32768,
        }
    }
}

/// Abstracts the embedding-inference backend so the pipeline can run against
/// a real TEI deployment or a hand-written mock in tests.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Fetch (and memoize) model metadata.
    async fn get_info(&self) -> EmbeddingResult<TeiInfo>;

    /// Embed a single batch of texts. Callers are responsible for keeping
    /// `inputs.len()` within the provider's configured batch size.
    async fn embed_batch(&self, inputs: &[String]) -> EmbeddingResult<Vec<Vec<f32>>>;

    /// Embed an arbitrary number of texts, internally batching and
    /// dispatching batches with bounded concurrency. Results preserve input
    /// order. Empty input returns empty output without any network call.
    async fn embed_chunks(&self, texts: &[String]) -> EmbeddingResult<Vec<Vec<f32>>>;
}
