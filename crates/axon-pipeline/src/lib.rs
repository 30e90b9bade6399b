//! Chunk → embed → upsert pipeline tying together the chunker, the
//! embedding provider, and the vector store.

pub mod error;
pub mod models;
pub mod pipeline;

pub use error::{PipelineError, PipelineResult};
pub use models::{BatchResult, EmbedItem, EmbedMetadata};
pub use pipeline::EmbedPipeline;

#[cfg(test)]
mod tests {
    use super::*;
    use axon_embeddings::MockEmbeddingProvider;
    use axon_vector_store::MockVectorStore;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    fn metadata(url: &str) -> EmbedMetadata {
        EmbedMetadata {
            url: url.to_string(),
            title: Some("title".to_string()),
            source_command: Some("crawl".to_string()),
            content_type: Some("markdown".to_string()),
            extra: Default::default(),
        }
    }

    #[tokio::test]
    async fn auto_embed_internal_skips_empty_content() {
        let pipeline = EmbedPipeline::new(
            Arc::new(MockEmbeddingProvider::new(4)),
            Arc::new(MockVectorStore::new()),
            "pages",
        );
        pipeline
            .auto_embed_internal("   \n  ", metadata("https://example.com"))
            .await
            .expect("empty content is a no-op");
    }

    #[tokio::test]
    async fn auto_embed_internal_embeds_and_stores_chunks() {
        let vector_store = Arc::new(MockVectorStore::new());
        let pipeline = EmbedPipeline::new(
            Arc::new(MockEmbeddingProvider::new(4)),
            vector_store.clone(),
            "pages",
        );

        pipeline
            .auto_embed_internal(
                "# Heading\n\nSome content that should chunk into at least one piece.",
                metadata("https://example.com/a"),
            )
            .await
            .expect("embedding should succeed");

        let count = vector_store
            .count_by_url("pages", "https://example.com/a")
            .await
            .expect("count should succeed");
        assert!(count > 0);
    }

    #[tokio::test]
    async fn auto_embed_internal_dedupes_on_reembed_of_same_url() {
        let vector_store = Arc::new(MockVectorStore::new());
        let pipeline = EmbedPipeline::new(
            Arc::new(MockEmbeddingProvider::new(4)),
            vector_store.clone(),
            "pages",
        );

        for _ in 0..2 {
            pipeline
                .auto_embed_internal(
                    "# Heading\n\nContent that produces chunks every time.",
                    metadata("https://example.com/a"),
                )
                .await
                .expect("embedding should succeed");
        }

        let count = vector_store
            .count_by_url("pages", "https://example.com/a")
            .await
            .expect("count should succeed");
        let first_run_count = vector_store
            .count_points("pages")
            .await
            .expect("count should succeed");
        assert_eq!(count, first_run_count, "re-embedding the same url should replace, not accumulate");
    }

    #[tokio::test]
    async fn auto_embed_never_propagates_errors() {
        let pipeline = EmbedPipeline::new(
            Arc::new(MockEmbeddingProvider::failing()),
            Arc::new(MockVectorStore::new()),
            "pages",
        );
        // Must not panic even though the embedding provider always errors.
        pipeline.auto_embed("content that will fail to embed", metadata("https://example.com")).await;
    }

    #[tokio::test]
    async fn batch_embed_caps_errors_and_reports_progress() {
        let vector_store = Arc::new(MockVectorStore::new());
        let pipeline = EmbedPipeline::new(
            Arc::new(MockEmbeddingProvider::failing()),
            vector_store,
            "pages",
        );

        let items = (0..15)
            .map(|i| EmbedItem {
                content: format!("content {i}"),
                metadata: metadata(&format!("https://example.com/{i}")),
            })
            .collect();

        let progress_calls = Arc::new(AtomicUsize::new(0));
        let progress_calls_clone = progress_calls.clone();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();

        let result = pipeline
            .batch_embed(
                items,
                Some(4),
                Some(Box::new(move |current, total| {
                    progress_calls_clone.fetch_add(1, Ordering::SeqCst);
                    seen_clone.lock().unwrap().push((current, total));
                })),
            )
            .await;

        assert_eq!(result.failed, 15);
        assert_eq!(result.succeeded, 0);
        assert_eq!(result.errors.len(), 10);
        assert_eq!(progress_calls.load(Ordering::SeqCst), 15);
        assert_eq!(seen.lock().unwrap().last(), Some(&(15, 15)));
    }
}
