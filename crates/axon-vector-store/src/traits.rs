//! Storage abstraction over the Qdrant vector database.

use crate::error::VectorStoreResult;
use crate::models::QdrantPoint;
use async_trait::async_trait;
use serde_json::{Map, Value};

/// A stored point returned from a query/scroll, with its payload and
/// (for queries) similarity score.
#[derive(Debug, Clone)]
pub struct StoredPoint {
    pub id: String,
    pub score: Option<f32>,
    pub payload: Map<String, Value>,
}

/// Collection-level metadata.
#[derive(Debug, Clone)]
pub struct CollectionInfo {
    pub name: String,
    pub vector_count: u64,
    pub dimension: u64,
}

/// Filter restricting a query/scroll/delete to points whose payload matches
/// on one or more keyword fields.
#[derive(Debug, Clone, Default)]
pub struct PointFilter {
    pub domain: Option<String>,
    pub source_command: Option<String>,
    pub url: Option<String>,
}

impl PointFilter {
    pub fn is_empty(&self) -> bool {
        self.domain.is_none() && self.source_command.is_none() && self.url.is_none()
    }
}

/// Abstracts the vector database so the pipeline can run against a real
/// Qdrant deployment or a hand-written in-memory mock in tests.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Ensure `collection` exists with the given vector `dimension` and the
    /// three keyword payload indexes (`url`, `domain`, `source_command`).
    /// Mismatched existing dimension is a fatal error.
    async fn ensure_collection(&self, collection: &str, dimension: u64) -> VectorStoreResult<()>;

    async fn upsert_points(&self, collection: &str, points: Vec<QdrantPoint>)
    -> VectorStoreResult<()>;

    /// No-op when `url` is empty, to prevent an accidental mass delete.
    async fn delete_by_url(&self, collection: &str, url: &str) -> VectorStoreResult<()>;

    /// No-op when `domain` is empty, to prevent an accidental mass delete.
    async fn delete_by_domain(&self, collection: &str, domain: &str) -> VectorStoreResult<()>;

    async fn delete_all(&self, collection: &str) -> VectorStoreResult<()>;

    async fn query_points(
        &self,
        collection: &str,
        vector: Vec<f32>,
        limit: usize,
        filter: Option<PointFilter>,
    ) -> VectorStoreResult<Vec<StoredPoint>>;

    /// Points for `url`, ordered by `chunk_index`.
    async fn scroll_by_url(&self, collection: &str, url: &str) -> VectorStoreResult<Vec<StoredPoint>>;

    /// All points matching `filter` (or all points with no filter), paginating
    /// internally using Qdrant's `next_page_offset` (page size 100).
    async fn scroll_all(
        &self,
        collection: &str,
        filter: Option<PointFilter>,
    ) -> VectorStoreResult<Vec<StoredPoint>>;

    async fn count_points(&self, collection: &str) -> VectorStoreResult<u64>;
    async fn count_by_url(&self, collection: &str, url: &str) -> VectorStoreResult<u64>;
    async fn count_by_domain(&self, collection: &str, domain: &str) -> VectorStoreResult<u64>;

    async fn get_collection_info(&self, collection: &str) -> VectorStoreResult<CollectionInfo>;
}
