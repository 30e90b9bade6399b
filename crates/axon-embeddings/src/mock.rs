//! Hand-written mock embedding provider for tests in downstream crates.

use crate::error::EmbeddingResult;
use crate::traits::{EmbeddingProvider, TeiInfo};
use async_trait::async_trait;

/// Deterministic, network-free embedding provider for unit tests.
pub struct MockEmbeddingProvider {
    pub info: TeiInfo,
    /// When set, `embed_batch`/`embed_chunks` return this error instead of
    /// fabricating vectors.
    pub fails_with: Option<String>,
}

impl Default for MockEmbeddingProvider {
    fn default() -> Self {
        Self {
            info: TeiInfo {
                model_id: "mock-test-model".to_string(),
                dimension: 4,
                max_input: 8192,
            },
            fails_with: None,
        }
    }
}

impl MockEmbeddingProvider {
    /// A provider that reports the given vector dimension.
    pub fn new(dimension: usize) -> Self {
        Self {
            info: TeiInfo {
                dimension,
                ..TeiInfo::default()
            },
            fails_with: None,
        }
    }

    /// A provider whose embed calls always fail, for exercising error paths.
    pub fn failing() -> Self {
        Self {
            fails_with: Some("mock embedding provider configured to fail".to_string()),
            ..Self::default()
        }
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    async fn get_info(&self) -> EmbeddingResult<TeiInfo> {
        Ok(self.info.clone())
    }

    async fn embed_batch(&self, inputs: &[String]) -> EmbeddingResult<Vec<Vec<f32>>> {
        if let Some(msg) = &self.fails_with {
            return Err(crate::error::EmbeddingError::Other(msg.clone()));
        }
        Ok(inputs
            .iter()
            .map(|_| vec![0.1; self.info.dimension])
            .collect())
    }

    async fn embed_chunks(&self, texts: &[String]) -> EmbeddingResult<Vec<Vec<f32>>> {
        self.embed_batch(texts).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_returns_fixed_dimension_vectors() {
        let provider = MockEmbeddingProvider::default();
        let vectors = provider
            .embed_chunks(&["a".to_string(), "b".to_string()])
            .await
            .unwrap();
        assert_eq!(vectors.len(), 2);
        assert_eq!(vectors[0].len(), 4);
    }
}
