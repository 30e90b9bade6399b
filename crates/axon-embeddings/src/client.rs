//! `reqwest`-backed client for the TEI embedding-inference service.

use crate::error::EmbeddingResult;
use crate::traits::{EmbeddingProvider, TeiInfo};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OnceCell, Semaphore};

const DEFAULT_BATCH_SIZE: usize = 24;
const DEFAULT_CONCURRENCY: usize = 4;
const TIMEOUT_BASE_SECS: f64 = 10.0;
const TIMEOUT_PER_ITEM_SECS: f64 = 2.0;
const TIMEOUT_BUFFER: f64 = 1.5;
const BATCH_RETRY_ATTEMPTS: u32 = 2;
const BATCH_RETRY_DELAY: Duration = Duration::from_secs(30);

/// Client for a Text Embeddings Inference (TEI) server.
pub struct TeiClient {
    http: Client,
    base_url: String,
    batch_size: usize,
    concurrency: usize,
    info: OnceCell<TeiInfo>,
}

impl TeiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into(),
            batch_size: DEFAULT_BATCH_SIZE,
            concurrency: DEFAULT_CONCURRENCY,
            info: OnceCell::new(),
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    fn embed_timeout(batch_len: usize) -> Duration {
        let secs = (TIMEOUT_BASE_SECS + batch_len as f64 * TIMEOUT_PER_ITEM_SECS) * TIMEOUT_BUFFER;
        Duration::from_secs_f64(secs)
    }

    async fn fetch_info(&self) -> EmbeddingResult<TeiInfo> {
        let url = format!("{}/info", self.base_url.trim_end_matches('/'));
        let response = self.http.get(&url).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(crate::error::EmbeddingError::TeiInfoFailed {
                status: status.as_u16(),
                body,
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| crate::error::EmbeddingError::TeiMalformedResponse(e.to_string()))?;

        let model_id = body
            .get("model_id")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string();

        let dimension = body
            .get("model_type")
            .and_then(|mt| mt.get("embedding").or_else(|| mt.get("Embedding")))
            .and_then(|e| e.get("dim"))
            .and_then(Value::as_u64)
            .map(|d| d as usize)
            .unwrap_or(1024);

        let max_input = body
            .get("max_input_length")
            .and_then(Value::as_u64)
            .map(|m| m as usize)
            .unwrap_or(32768);

        Ok(TeiInfo {
            model_id,
            dimension,
            max_input,
        })
    }

    async fn post_embed_once(&self, inputs: &[String]) -> EmbeddingResult<Vec<Vec<f32>>> {
        let url = format!("{}/embed", self.base_url.trim_end_matches('/'));
        let timeout = Self::embed_timeout(inputs.len());

        let response = self
            .http
            .post(&url)
            .timeout(timeout)
            .json(&serde_json::json!({ "inputs": inputs }))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    crate::error::EmbeddingError::TeiTimeout(timeout)
                } else {
                    crate::error::EmbeddingError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(crate::error::EmbeddingError::TeiEmbedFailed {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<Vec<Vec<f32>>>()
            .await
            .map_err(|e| crate::error::EmbeddingError::TeiMalformedResponse(e.to_string()))
    }

    /// Batch-level retry: up to `BATCH_RETRY_ATTEMPTS` extra attempts after a
    /// fixed delay, on top of whatever retries the HTTP client itself does.
    /// Non-retryable 4xx (other than 408/429) short-circuits immediately.
    async fn embed_batch_with_retry(&self, inputs: &[String]) -> EmbeddingResult<Vec<Vec<f32>>> {
        let mut attempt = 0;
        loop {
            match self.post_embed_once(inputs).await {
                Ok(vectors) => return Ok(vectors),
                Err(err) if attempt < BATCH_RETRY_ATTEMPTS && err.is_retryable() => {
                    attempt += 1;
                    tracing::warn!(
                        attempt,
                        error = %err,
                        "TEI embed batch failed, retrying after delay"
                    );
                    tokio::time::sleep(BATCH_RETRY_DELAY).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[async_trait]
impl EmbeddingProvider for TeiClient {
    #[tracing::instrument(skip(self))]
    async fn get_info(&self) -> EmbeddingResult<TeiInfo> {
        self.info
            .get_or_try_init(|| self.fetch_info())
            .await
            .cloned()
    }

    #[tracing::instrument(skip(self, inputs))]
    async fn embed_batch(&self, inputs: &[String]) -> EmbeddingResult<Vec<Vec<f32>>> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }
        self.embed_batch_with_retry(inputs).await
    }

    #[tracing::instrument(skip(self, texts))]
    async fn embed_chunks(&self, texts: &[String]) -> EmbeddingResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let semaphore = Arc::new(Semaphore::new(self.concurrency.max(1)));
        let mut tasks = Vec::new();

        for (batch_index, batch) in texts.chunks(self.batch_size.max(1)).enumerate() {
            let batch = batch.to_vec();
            let sem = Arc::clone(&semaphore);
            tasks.push(async move {
                let _permit = sem.acquire_owned().await.expect("semaphore not closed");
                (batch_index, self.embed_batch_with_retry(&batch).await)
            });
        }

        let mut results: Vec<Option<Vec<Vec<f32>>>> = vec![None; tasks.len()];
        for (batch_index, outcome) in futures::future::join_all(tasks).await {
            results[batch_index] = Some(outcome?);
        }

        Ok(results.into_iter().flatten().flatten().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn get_info_parses_dimension_and_memoizes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/info"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "model_id": "bge-small",
                "model_type": { "embedding": { "dim": 384 } },
                "max_input_length": 512
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = TeiClient::new(server.uri());
        let info = client.get_info().await.unwrap();
        assert_eq!(info.model_id, "bge-small");
        assert_eq!(info.dimension, 384);

        // Second call must not hit the mock again (memoized, expect(1) above).
        let info2 = client.get_info().await.unwrap();
        assert_eq!(info2.dimension, 384);
    }

    #[tokio::test]
    async fn embed_chunks_preserves_order_across_batches() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embed"))
            .respond_with(move |req: &wiremock::Request| {
                let body: serde_json::Value = req.body_json().unwrap();
                let inputs = body["inputs"].as_array().unwrap();
                let vectors: Vec<Vec<f32>> = inputs
                    .iter()
                    .map(|v| vec![v.as_str().unwrap().len() as f32])
                    .collect();
                ResponseTemplate::new(200).set_body_json(vectors)
            })
            .mount(&server)
            .await;

        let client = TeiClient::new(server.uri()).with_batch_size(2);
        let texts: Vec<String> = (0..5).map(|i| "x".repeat(i + 1)).collect();
        let vectors = client.embed_chunks(&texts).await.unwrap();

        assert_eq!(vectors.len(), 5);
        for (i, v) in vectors.iter().enumerate() {
            assert_eq!(v[0] as usize, i + 1);
        }
    }

    #[tokio::test]
    async fn embed_chunks_on_empty_input_makes_no_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embed"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = TeiClient::new(server.uri());
        let vectors = client.embed_chunks(&[]).await.unwrap();
        assert!(vectors.is_empty());
    }

    #[tokio::test]
    async fn non_retryable_4xx_short_circuits_without_retry_delay() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embed"))
            .respond_with(ResponseTemplate::new(422))
            .expect(1)
            .mount(&server)
            .await;

        let client = TeiClient::new(server.uri());
        let start = std::time::Instant::now();
        let result = client.embed_batch(&["hi".to_string()]).await;
        assert!(result.is_err());
        assert!(start.elapsed() < Duration::from_secs(5));
    }
}
