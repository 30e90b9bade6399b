//! Shared application state handed to every Axum handler.

use axon_pipeline::EmbedPipeline;
use axon_queue::QueueStore;
use axon_scrape::ScrapeClient;
use std::sync::Arc;
use std::time::SystemTime;

#[derive(Clone)]
pub struct AppState {
    pub queue: Arc<QueueStore>,
    pub pipeline: Arc<EmbedPipeline>,
    pub scrape: Arc<dyn ScrapeClient>,
    pub webhook_secret: String,
    pub webhook_configured: bool,
    pub polling_interval_ms: u64,
    pub stale_threshold_ms: u64,
    pub stuck_threshold_ms: u64,
    pub started_at: SystemTime,
}
