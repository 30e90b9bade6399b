//! In-memory [`VectorStore`] for tests that don't need a real Qdrant instance.

use crate::error::VectorStoreResult;
use crate::models::QdrantPoint;
use crate::traits::{CollectionInfo, PointFilter, StoredPoint, VectorStore};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

/// Records every point ever upserted, keyed by collection name. Dimension is
/// whatever was passed to the first `ensure_collection` call for that
/// collection.
#[derive(Default)]
pub struct MockVectorStore {
    collections: Mutex<HashMap<String, u64>>,
    points: Mutex<HashMap<String, Vec<QdrantPoint>>>,
}

impl MockVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn matches(point: &QdrantPoint, filter: &PointFilter) -> bool {
        filter.domain.as_deref().is_none_or(|d| point.domain() == d)
            && filter
                .source_command
                .as_deref()
                .is_none_or(|sc| point.source_command.as_deref() == Some(sc))
            && filter.url.as_deref().is_none_or(|u| point.url == u)
    }

    fn to_stored(point: &QdrantPoint, score: Option<f32>) -> StoredPoint {
        StoredPoint {
            id: point.id.to_string(),
            score,
            payload: point.to_payload(),
        }
    }
}

#[async_trait]
impl VectorStore for MockVectorStore {
    async fn ensure_collection(&self, collection: &str, dimension: u64) -> VectorStoreResult<()> {
        self.collections
            .lock()
            .expect("lock poisoned")
            .entry(collection.to_string())
            .or_insert(dimension);
        self.points
            .lock()
            .expect("lock poisoned")
            .entry(collection.to_string())
            .or_default();
        Ok(())
    }

    async fn upsert_points(
        &self,
        collection: &str,
        points: Vec<QdrantPoint>,
    ) -> VectorStoreResult<()> {
        let mut store = self.points.lock().expect("lock poisoned");
        let existing = store.entry(collection.to_string()).or_default();
        for point in points {
            existing.retain(|p| p.id != point.id);
            existing.push(point);
        }
        Ok(())
    }

    async fn delete_by_url(&self, collection: &str, url: &str) -> VectorStoreResult<()> {
        if url.is_empty() {
            return Ok(());
        }
        if let Some(existing) = self.points.lock().expect("lock poisoned").get_mut(collection) {
            existing.retain(|p| p.url != url);
        }
        Ok(())
    }

    async fn delete_by_domain(&self, collection: &str, domain: &str) -> VectorStoreResult<()> {
        if domain.is_empty() {
            return Ok(());
        }
        if let Some(existing) = self.points.lock().expect("lock poisoned").get_mut(collection) {
            existing.retain(|p| p.domain() != domain);
        }
        Ok(())
    }

    async fn delete_all(&self, collection: &str) -> VectorStoreResult<()> {
        if let Some(existing) = self.points.lock().expect("lock poisoned").get_mut(collection) {
            existing.clear();
        }
        Ok(())
    }

    async fn query_points(
        &self,
        collection: &str,
        _vector: Vec<f32>,
        limit: usize,
        filter: Option<PointFilter>,
    ) -> VectorStoreResult<Vec<StoredPoint>> {
        let store = self.points.lock().expect("lock poisoned");
        let Some(existing) = store.get(collection) else {
            return Ok(Vec::new());
        };

        Ok(existing
            .iter()
            .filter(|p| filter.as_ref().is_none_or(|f| Self::matches(p, f)))
            .take(limit)
            .map(|p| Self::to_stored(p, Some(1.0)))
            .collect())
    }

    async fn scroll_by_url(&self, collection: &str, url: &str) -> VectorStoreResult<Vec<StoredPoint>> {
        let mut points = self
            .scroll_all(
                collection,
                Some(PointFilter {
                    url: Some(url.to_string()),
                    ..Default::default()
                }),
            )
            .await?;
        points.sort_by_key(|p| {
            p.payload
                .get("chunk_index")
                .and_then(serde_json::Value::as_u64)
                .unwrap_or(0)
        });
        Ok(points)
    }

    async fn scroll_all(
        &self,
        collection: &str,
        filter: Option<PointFilter>,
    ) -> VectorStoreResult<Vec<StoredPoint>> {
        let store = self.points.lock().expect("lock poisoned");
        let Some(existing) = store.get(collection) else {
            return Ok(Vec::new());
        };

        Ok(existing
            .iter()
            .filter(|p| filter.as_ref().is_none_or(|f| Self::matches(p, f)))
            .map(|p| Self::to_stored(p, None))
            .collect())
    }

    async fn count_points(&self, collection: &str) -> VectorStoreResult<u64> {
        Ok(self
            .points
            .lock()
            .expect("lock poisoned")
            .get(collection)
            .map_or(0, Vec::len) as u64)
    }

    async fn count_by_url(&self, collection: &str, url: &str) -> VectorStoreResult<u64> {
        Ok(self
            .points
            .lock()
            .expect("lock poisoned")
            .get(collection)
            .map_or(0, |points| points.iter().filter(|p| p.url == url).count()) as u64)
    }

    async fn count_by_domain(&self, collection: &str, domain: &str) -> VectorStoreResult<u64> {
        Ok(self
            .points
            .lock()
            .expect("lock poisoned")
            .get(collection)
            .map_or(0, |points| points.iter().filter(|p| p.domain() == domain).count())
            as u64)
    }

    async fn get_collection_info(&self, collection: &str) -> VectorStoreResult<CollectionInfo> {
        let dimension = self
            .collections
            .lock()
            .expect("lock poisoned")
            .get(collection)
            .copied()
            .unwrap_or(0);
        let vector_count = self.count_points(collection).await?;

        Ok(CollectionInfo {
            name: collection.to_string(),
            vector_count,
            dimension,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::Map;
    use uuid::Uuid;

    fn point(url: &str, chunk_index: u32) -> QdrantPoint {
        QdrantPoint {
            id: Uuid::new_v4(),
            vector: vec![0.1, 0.2],
            url: url.to_string(),
            title: None,
            chunk_index,
            chunk_text: "text".to_string(),
            chunk_header: None,
            total_chunks: 1,
            source_command: Some("crawl".to_string()),
            content_type: Some("markdown".to_string()),
            scraped_at: Utc::now(),
            extra: Map::new(),
        }
    }

    #[tokio::test]
    async fn upsert_then_scroll_by_url_orders_by_chunk_index() {
        let store = MockVectorStore::new();
        store.ensure_collection("c", 2).await.unwrap();
        store
            .upsert_points(
                "c",
                vec![
                    point("https://a.test/p", 1),
                    point("https://a.test/p", 0),
                ],
            )
            .await
            .unwrap();

        let results = store.scroll_by_url("c", "https://a.test/p").await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(
            results[0].payload.get("chunk_index").unwrap().as_u64(),
            Some(0)
        );
    }

    #[tokio::test]
    async fn delete_by_url_is_noop_on_empty_url() {
        let store = MockVectorStore::new();
        store.ensure_collection("c", 2).await.unwrap();
        store.upsert_points("c", vec![point("https://a.test/p", 0)]).await.unwrap();

        store.delete_by_url("c", "").await.unwrap();
        assert_eq!(store.count_points("c").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn delete_by_domain_removes_matching_points() {
        let store = MockVectorStore::new();
        store.ensure_collection("c", 2).await.unwrap();
        store
            .upsert_points(
                "c",
                vec![point("https://a.test/p", 0), point("https://b.test/p", 0)],
            )
            .await
            .unwrap();

        store.delete_by_domain("c", "a.test").await.unwrap();
        assert_eq!(store.count_points("c").await.unwrap(), 1);
    }
}
