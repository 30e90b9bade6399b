//! Abstraction over the scraping API so the pipeline can be tested without it.

use crate::error::ScrapeResult;
use crate::models::{CrawlOptions, CrawlStatusResponse, StartCrawlResponse};
use async_trait::async_trait;

#[async_trait]
pub trait ScrapeClient: Send + Sync {
    async fn start_crawl(&self, url: &str, options: CrawlOptions) -> ScrapeResult<StartCrawlResponse>;

    async fn get_crawl_status(&self, id: &str) -> ScrapeResult<CrawlStatusResponse>;
}
