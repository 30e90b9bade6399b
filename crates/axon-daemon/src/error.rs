//! Error types for the embedder daemon.

use thiserror::Error;

pub type DaemonResult<T> = Result<T, DaemonError>;

#[derive(Error, Debug)]
pub enum DaemonError {
    #[error("configuration error: {0}")]
    Config(#[from] axon_config::ConfigError),

    #[error("queue error: {0}")]
    Queue(#[from] axon_queue::QueueError),

    #[error("pipeline error: {0}")]
    Pipeline(#[from] axon_pipeline::PipelineError),

    #[error("scrape client error: {0}")]
    Scrape(#[from] axon_scrape::ScrapeError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("other error: {0}")]
    Other(String),
}
