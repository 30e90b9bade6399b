//! Service initialization for the `axond` daemon, separated from `main` so
//! it can be exercised without actually binding a socket.

use crate::auth::generate_secret;
use crate::state::AppState;
use axon_config::AxonConfig;
use axon_embeddings::TeiClient;
use axon_pipeline::EmbedPipeline;
use axon_queue::QueueStore;
use axon_scrape::HttpScrapeClient;
use axon_vector_store::QdrantVectorStore;
use std::sync::Arc;
use std::time::SystemTime;
use tracing::info;

pub type BootstrapResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Initialize every service and build the shared [`AppState`]. Also runs the
/// startup cleanup pass over old terminal jobs.
pub async fn initialize_app_state(config: &AxonConfig) -> BootstrapResult<AppState> {
    info!("Initializing durable job queue...");
    let queue = Arc::new(QueueStore::new(config.queue.dir.clone(), config.queue.max_retries)?);

    let cleanup_age = std::time::Duration::from_secs(config.queue.cleanup_hours * 3600);
    let removed = queue.cleanup_old_jobs(cleanup_age).await?;
    if removed > 0 {
        info!(removed, "cleaned up old terminal jobs on startup");
    }

    info!("Initializing embedding and vector store clients...");
    let embeddings = Arc::new(TeiClient::new(config.tei.url.clone()));
    let vector_store = Arc::new(QdrantVectorStore::new(&config.qdrant.url)?);
    let pipeline = Arc::new(EmbedPipeline::new(embeddings, vector_store, config.qdrant.collection.clone()));

    let scrape = Arc::new(HttpScrapeClient::new(config.scrape.url.clone(), config.scrape.api_key.clone()));

    let webhook_secret = config.webhook.secret.clone().unwrap_or_else(|| {
        let secret = generate_secret();
        tracing::warn!("AXON_WEBHOOK_SECRET not set, generated an ephemeral secret for this run");
        secret
    });

    Ok(AppState {
        queue,
        pipeline,
        scrape,
        webhook_secret,
        webhook_configured: config.webhook.url.is_some(),
        polling_interval_ms: sweep_interval_ms(config.queue.stale_minutes),
        stale_threshold_ms: config.queue.stale_minutes * 60 * 1000,
        stuck_threshold_ms: config.queue.stuck_minutes * 60 * 1000,
        started_at: SystemTime::now(),
    })
}

/// T = max(60s, staleMs / 2), in milliseconds.
pub fn sweep_interval_ms(stale_minutes: u64) -> u64 {
    let stale_ms = stale_minutes * 60 * 1000;
    (stale_ms / 2).max(60_000)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sweep_interval_has_a_60s_floor() {
        assert_eq!(sweep_interval_ms(1), 60_000);
        assert_eq!(sweep_interval_ms(10), 300_000);
    }
}
