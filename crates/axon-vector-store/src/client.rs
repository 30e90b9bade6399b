//! Qdrant-backed implementation of [`VectorStore`].

use crate::error::{VectorStoreError, VectorStoreResult};
use crate::models::QdrantPoint;
use crate::traits::{CollectionInfo, PointFilter, StoredPoint, VectorStore};
use async_trait::async_trait;
use lru::LruCache;
use qdrant_client::qdrant::{
    Condition, CollectionExistsRequest, CountPoints, CreateCollection, CreateFieldIndexCollection,
    DeletePoints, Distance, FieldType, Filter, GetCollectionInfoRequest, PointId, PointStruct,
    PointsSelector, ScrollPoints, SearchPoints, UpsertPoints, Value as QdrantValue, VectorParams,
    points_selector::PointsSelectorOneOf,
};
use qdrant_client::{Payload, Qdrant};
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::Duration;

const LRU_CAPACITY: usize = 100;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const MAX_RETRIES: u32 = 3;
const KEYWORD_INDEX_FIELDS: [&str; 3] = ["url", "domain", "source_command"];

/// Client for Qdrant, the vector database backing the embedding pipeline.
pub struct QdrantVectorStore {
    client: Qdrant,
    known_collections: Mutex<LruCache<String, u64>>,
}

impl QdrantVectorStore {
    pub fn new(url: &str) -> VectorStoreResult<Self> {
        let mut builder = Qdrant::from_url(url).timeout(REQUEST_TIMEOUT);
        if let Ok(api_key) = std::env::var("QDRANT_API_KEY") {
            builder = builder.api_key(api_key);
        }
        let client = builder
            .build()
            .map_err(|e| VectorStoreError::StorageUnavailable(e.to_string()))?;

        Ok(Self {
            client,
            known_collections: Mutex::new(LruCache::new(
                NonZeroUsize::new(LRU_CAPACITY).expect("nonzero"),
            )),
        })
    }

    /// Retry idempotent requests on transient failures (5xx, 408, 429,
    /// connection errors) with exponential backoff, up to `MAX_RETRIES`.
    async fn with_retry<T, F, Fut>(&self, op: &str, mut f: F) -> VectorStoreResult<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, qdrant_client::QdrantError>>,
    {
        let mut attempt = 0;
        loop {
            match f().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < MAX_RETRIES && is_transient(&e) => {
                    attempt += 1;
                    let backoff = Duration::from_millis(200 * 2u64.pow(attempt));
                    tracing::warn!(op, attempt, error = %e, "Qdrant request failed, retrying");
                    tokio::time::sleep(backoff).await;
                }
                Err(e) => {
                    return Err(VectorStoreError::Storage(format!("{op} failed: {e}")));
                }
            }
        }
    }

    async fn collection_exists(&self, collection: &str) -> VectorStoreResult<bool> {
        let request = CollectionExistsRequest {
            collection_name: collection.to_string(),
        };
        self.with_retry("collection_exists", || {
            self.client.collection_exists(request.clone())
        })
        .await
    }

    fn build_filter(filter: &PointFilter) -> Filter {
        let mut must = Vec::new();
        if let Some(domain) = &filter.domain {
            must.push(Condition::matches("domain", domain.clone()));
        }
        if let Some(source_command) = &filter.source_command {
            must.push(Condition::matches("source_command", source_command.clone()));
        }
        if let Some(url) = &filter.url {
            must.push(Condition::matches("url", url.clone()));
        }
        Filter {
            must,
            ..Default::default()
        }
    }

    async fn delete_by_filter(&self, collection: &str, filter: Filter) -> VectorStoreResult<()> {
        let request = DeletePoints {
            collection_name: collection.to_string(),
            points: Some(PointsSelector {
                points_selector_one_of: Some(PointsSelectorOneOf::Filter(filter)),
            }),
            ..Default::default()
        };

        self.with_retry("delete_points", || self.client.delete_points(request.clone()))
            .await?;
        Ok(())
    }

    async fn count_with_filter(
        &self,
        collection: &str,
        filter: Option<PointFilter>,
    ) -> VectorStoreResult<u64> {
        let request = CountPoints {
            collection_name: collection.to_string(),
            filter: filter.as_ref().filter(|f| !f.is_empty()).map(Self::build_filter),
            exact: Some(true),
            ..Default::default()
        };

        let response = self
            .with_retry("count_points", || self.client.count(request.clone()))
            .await?;

        Ok(response
            .result
            .ok_or_else(|| VectorStoreError::Other("missing count result".into()))?
            .count)
    }
}

fn is_transient(err: &qdrant_client::QdrantError) -> bool {
    let msg = err.to_string();
    msg.contains("500")
        || msg.contains("502")
        || msg.contains("503")
        || msg.contains("504")
        || msg.contains("408")
        || msg.contains("429")
        || msg.to_lowercase().contains("connection")
        || msg.to_lowercase().contains("timed out")
}

fn point_to_struct(point: &QdrantPoint) -> PointStruct {
    let payload: HashMap<String, QdrantValue> = point
        .to_payload()
        .into_iter()
        .filter_map(|(k, v)| json_to_qdrant_value(v).map(|v| (k, v)))
        .collect();

    PointStruct::new(point.id.to_string(), point.vector.clone(), Payload::from(payload))
}

/// Payload values are dropped rather than stored as an explicit null, since
/// Qdrant's filter/index semantics treat an absent key and a null value the
/// same way for our purposes.
fn json_to_qdrant_value(value: serde_json::Value) -> Option<QdrantValue> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::Bool(b) => Some(QdrantValue::from(b)),
        serde_json::Value::Number(n) => Some(n.as_i64().map_or_else(
            || QdrantValue::from(n.as_f64().unwrap_or_default()),
            QdrantValue::from,
        )),
        serde_json::Value::String(s) => Some(QdrantValue::from(s)),
        other => Some(QdrantValue::from(other.to_string())),
    }
}

fn qdrant_value_to_json(value: &QdrantValue) -> serde_json::Value {
    if let Some(s) = value.as_str() {
        serde_json::Value::String(s.to_string())
    } else if let Some(i) = value.as_integer() {
        serde_json::Value::from(i)
    } else if let Some(d) = value.as_double() {
        serde_json::Value::from(d)
    } else if let Some(b) = value.as_bool() {
        serde_json::Value::Bool(b)
    } else {
        serde_json::Value::Null
    }
}

fn point_id_to_string(id: Option<PointId>) -> String {
    id.and_then(|id| id.point_id_options)
        .map(|variant| match variant {
            qdrant_client::qdrant::point_id::PointIdOptions::Uuid(u) => u,
            qdrant_client::qdrant::point_id::PointIdOptions::Num(n) => n.to_string(),
        })
        .unwrap_or_default()
}

fn stored_point_from(
    id: Option<PointId>,
    score: Option<f32>,
    payload: HashMap<String, QdrantValue>,
) -> StoredPoint {
    let payload_json: serde_json::Map<String, serde_json::Value> = payload
        .iter()
        .map(|(k, v)| (k.clone(), qdrant_value_to_json(v)))
        .collect();

    StoredPoint {
        id: point_id_to_string(id),
        score,
        payload: payload_json,
    }
}

#[async_trait]
impl VectorStore for QdrantVectorStore {
    #[tracing::instrument(skip(self))]
    async fn ensure_collection(&self, collection: &str, dimension: u64) -> VectorStoreResult<()> {
        if let Some(&known_dim) = self
            .known_collections
            .lock()
            .expect("lock poisoned")
            .peek(collection)
        {
            if known_dim == dimension {
                return Ok(());
            }
        }

        if self.collection_exists(collection).await? {
            let info = self.get_collection_info(collection).await?;
            if info.dimension != dimension {
                return Err(VectorStoreError::CollectionDimensionMismatch {
                    collection: collection.to_string(),
                    existing: info.dimension,
                    requested: dimension,
                });
            }
        } else {
            let request = CreateCollection {
                collection_name: collection.to_string(),
                vectors_config: Some(
                    VectorParams {
                        size: dimension,
                        distance: Distance::Cosine as i32,
                        ..Default::default()
                    }
                    .into(),
                ),
                ..Default::default()
            };

            self.with_retry("create_collection", || self.client.create_collection(request.clone()))
                .await?;

            let results = futures::future::join_all(KEYWORD_INDEX_FIELDS.iter().map(|field| {
                let request = CreateFieldIndexCollection {
                    collection_name: collection.to_string(),
                    field_name: (*field).to_string(),
                    field_type: Some(FieldType::Keyword as i32),
                    ..Default::default()
                };
                self.client.create_field_index(request)
            }))
            .await;

            let failures: Vec<String> = KEYWORD_INDEX_FIELDS
                .iter()
                .zip(results)
                .filter_map(|(field, result)| result.err().map(|e| format!("{field}: {e}")))
                .collect();

            if !failures.is_empty() {
                return Err(VectorStoreError::IndexCreationFailed(failures));
            }
        }

        self.known_collections
            .lock()
            .expect("lock poisoned")
            .put(collection.to_string(), dimension);
        Ok(())
    }

    async fn upsert_points(
        &self,
        collection: &str,
        points: Vec<QdrantPoint>,
    ) -> VectorStoreResult<()> {
        if points.is_empty() {
            return Ok(());
        }

        let request = UpsertPoints {
            collection_name: collection.to_string(),
            points: points.iter().map(point_to_struct).collect(),
            ..Default::default()
        };

        self.with_retry("upsert_points", || self.client.upsert_points(request.clone()))
            .await?;
        Ok(())
    }

    async fn delete_by_url(&self, collection: &str, url: &str) -> VectorStoreResult<()> {
        if url.is_empty() {
            return Ok(());
        }
        self.delete_by_filter(
            collection,
            Filter {
                must: vec![Condition::matches("url", url.to_string())],
                ..Default::default()
            },
        )
        .await
    }

    async fn delete_by_domain(&self, collection: &str, domain: &str) -> VectorStoreResult<()> {
        if domain.is_empty() {
            return Ok(());
        }
        self.delete_by_filter(
            collection,
            Filter {
                must: vec![Condition::matches("domain", domain.to_string())],
                ..Default::default()
            },
        )
        .await
    }

    async fn delete_all(&self, collection: &str) -> VectorStoreResult<()> {
        self.delete_by_filter(collection, Filter::default()).await
    }

    async fn query_points(
        &self,
        collection: &str,
        vector: Vec<f32>,
        limit: usize,
        filter: Option<PointFilter>,
    ) -> VectorStoreResult<Vec<StoredPoint>> {
        let request = SearchPoints {
            collection_name: collection.to_string(),
            vector,
            limit: limit as u64,
            with_payload: Some(true.into()),
            filter: filter.as_ref().filter(|f| !f.is_empty()).map(Self::build_filter),
            ..Default::default()
        };

        let response = self
            .with_retry("search_points", || self.client.search_points(request.clone()))
            .await?;

        Ok(response
            .result
            .into_iter()
            .map(|p| stored_point_from(p.id, Some(p.score), p.payload))
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
        let mut all = Vec::new();
        let mut offset: Option<PointId> = None;
        let qdrant_filter = filter.as_ref().filter(|f| !f.is_empty()).map(Self::build_filter);

        loop {
            let request = ScrollPoints {
                collection_name: collection.to_string(),
                filter: qdrant_filter.clone(),
                limit: Some(100),
                offset: offset.clone(),
                with_payload: Some(true.into()),
                with_vectors: Some(false.into()),
                ..Default::default()
            };

            let response = self
                .with_retry("scroll_points", || self.client.scroll(request.clone()))
                .await?;

            for point in response.result {
                all.push(stored_point_from(point.id, None, point.payload));
            }

            match response.next_page_offset {
                Some(next) => offset = Some(next),
                None => break,
            }
        }

        Ok(all)
    }

    async fn count_points(&self, collection: &str) -> VectorStoreResult<u64> {
        self.count_with_filter(collection, None).await
    }

    async fn count_by_url(&self, collection: &str, url: &str) -> VectorStoreResult<u64> {
        self.count_with_filter(
            collection,
            Some(PointFilter {
                url: Some(url.to_string()),
                ..Default::default()
            }),
        )
        .await
    }

    async fn count_by_domain(&self, collection: &str, domain: &str) -> VectorStoreResult<u64> {
        self.count_with_filter(
            collection,
            Some(PointFilter {
                domain: Some(domain.to_string()),
                ..Default::default()
            }),
        )
        .await
    }

    async fn get_collection_info(&self, collection: &str) -> VectorStoreResult<CollectionInfo> {
        let request = GetCollectionInfoRequest {
            collection_name: collection.to_string(),
        };

        let response = self
            .with_retry("collection_info", || self.client.collection_info(request.clone()))
            .await?;

        let result = response
            .result
            .ok_or_else(|| VectorStoreError::Other("missing collection info result".into()))?;

        let dimension = result
            .config
            .and_then(|c| c.params)
            .and_then(|p| p.vectors_config)
            .and_then(|v| v.config)
            .and_then(|c| match c {
                qdrant_client::qdrant::vectors_params::Config::Params(params) => Some(params.size),
                qdrant_client::qdrant::vectors_params::Config::ParamsMap(_) => None,
            })
            .unwrap_or(0);

        Ok(CollectionInfo {
            name: collection.to_string(),
            vector_count: result.vectors_count.unwrap_or(0),
            dimension,
        })
    }
}
