//! Client for the scraping API the embedding pipeline reacts to.

pub mod client;
pub mod error;
pub mod mock;
pub mod models;
pub mod traits;

pub use client::HttpScrapeClient;
pub use error::{ScrapeError, ScrapeResult};
pub use mock::MockScrapeClient;
pub use models::{
    CrawlOptions, CrawlState, CrawlStatusResponse, Document, DocumentMetadata, StartCrawlResponse,
    WebhookOptions,
};
pub use traits::ScrapeClient;
