//! Chunk → embed → upsert pipeline driving the vector store from raw content.

use crate::error::{PipelineError, PipelineResult};
use crate::models::{BatchResult, EmbedItem, EmbedMetadata};
use axon_chunker::{chunk, ContentType};
use axon_embeddings::EmbeddingProvider;
use axon_vector_store::{QdrantPoint, VectorStore};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Semaphore;
use uuid::Uuid;

const DEFAULT_CONCURRENCY: usize = 10;
const MAX_RETAINED_ERRORS: usize = 10;

pub struct EmbedPipeline {
    embeddings: Arc<dyn EmbeddingProvider>,
    vector_store: Arc<dyn VectorStore>,
    collection: String,
}

impl EmbedPipeline {
    pub fn new(
        embeddings: Arc<dyn EmbeddingProvider>,
        vector_store: Arc<dyn VectorStore>,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            embeddings,
            vector_store,
            collection: collection.into(),
        }
    }

    /// Fire-and-forget wrapper: logs and discards any error so a caller
    /// reacting to one crawled page never has its task aborted by one bad
    /// page.
    #[tracing::instrument(skip(self, content), fields(url = %metadata.url))]
    pub async fn auto_embed(&self, content: &str, metadata: EmbedMetadata) {
        if let Err(e) = self.auto_embed_internal(content, metadata.clone()).await {
            tracing::error!(url = %metadata.url, error = %e, "auto_embed failed");
        }
    }

    pub async fn auto_embed_internal(&self, content: &str, metadata: EmbedMetadata) -> PipelineResult<()> {
        if content.trim().is_empty() {
            return Ok(());
        }

        let info = self.embeddings.get_info().await?;
        self.vector_store
            .ensure_collection(&self.collection, info.dimension as u64)
            .await?;

        let content_type = match metadata.content_type.as_deref() {
            Some("html") => ContentType::Html,
            _ => ContentType::Markdown,
        };
        let chunks = chunk(content, content_type);
        if chunks.is_empty() {
            return Ok(());
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = self.embeddings.embed_chunks(&texts).await?;
        if vectors.len() != chunks.len() {
            return Err(PipelineError::VectorCountMismatch {
                expected: chunks.len(),
                actual: vectors.len(),
            });
        }

        self.vector_store.delete_by_url(&self.collection, &metadata.url).await?;

        let total_chunks = chunks.len() as u32;
        let scraped_at = Utc::now();
        let points: Vec<QdrantPoint> = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| QdrantPoint {
                id: Uuid::new_v4(),
                vector,
                url: metadata.url.clone(),
                title: metadata.title.clone(),
                chunk_index: chunk.index,
                chunk_text: chunk.text,
                chunk_header: chunk.header,
                total_chunks,
                source_command: metadata.source_command.clone(),
                content_type: metadata.content_type.clone(),
                scraped_at,
                extra: metadata.extra.clone(),
            })
            .collect();

        self.vector_store.upsert_points(&self.collection, points).await?;
        Ok(())
    }

    /// Run `auto_embed_internal` over every item with bounded concurrency.
    /// Never returns an error; failures are aggregated into the result.
    pub async fn batch_embed(
        &self,
        items: Vec<EmbedItem>,
        concurrency: Option<usize>,
        mut on_progress: Option<Box<dyn FnMut(usize, usize) + Send>>,
    ) -> BatchResult {
        let total = items.len();
        let semaphore = Arc::new(Semaphore::new(concurrency.unwrap_or(DEFAULT_CONCURRENCY).max(1)));

        let futures: Vec<_> = items
            .into_iter()
            .map(|item| {
                let semaphore = Arc::clone(&semaphore);
                async move {
                    let _permit = semaphore.acquire_owned().await.expect("semaphore closed");
                    let url = item.metadata.url.clone();
                    let result = self.auto_embed_internal(&item.content, item.metadata).await;
                    (url, result)
                }
            })
            .collect();

        let mut result = BatchResult::default();
        let mut current = 0usize;
        for outcome in futures::future::join_all(futures).await {
            current += 1;
            match outcome {
                (_, Ok(())) => result.succeeded += 1,
                (url, Err(e)) => {
                    result.failed += 1;
                    if result.errors.len() < MAX_RETAINED_ERRORS {
                        result.errors.push(format!("{url}: {e}"));
                    }
                }
            }
            if let Some(cb) = on_progress.as_mut() {
                cb(current, total);
            }
        }

        result
    }
}
