//! In-memory [`ScrapeClient`] for pipeline tests.

use crate::error::ScrapeResult;
use crate::models::{CrawlOptions, CrawlState, CrawlStatusResponse, Document, StartCrawlResponse};
use crate::traits::ScrapeClient;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Default)]
pub struct MockScrapeClient {
    jobs: Mutex<HashMap<String, CrawlStatusResponse>>,
    next_id: Mutex<u64>,
}

impl MockScrapeClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seed a job's eventual status, as if the scraping API had already
    /// finished processing it.
    pub fn seed_completed(&self, id: &str, pages: Vec<Document>) {
        self.jobs.lock().expect("lock poisoned").insert(
            id.to_string(),
            CrawlStatusResponse {
                id: id.to_string(),
                status: CrawlState::Completed,
                total: pages.len() as u32,
                completed: pages.len() as u32,
                credits_used: None,
                expires_at: None,
                data: Some(pages),
            },
        );
    }
}

#[async_trait]
impl ScrapeClient for MockScrapeClient {
    async fn start_crawl(&self, url: &str, _options: CrawlOptions) -> ScrapeResult<StartCrawlResponse> {
        let mut next_id = self.next_id.lock().expect("lock poisoned");
        *next_id += 1;
        let id = format!("mock-job-{next_id}");

        self.jobs.lock().expect("lock poisoned").insert(
            id.clone(),
            CrawlStatusResponse {
                id: id.clone(),
                status: CrawlState::Scraping,
                total: 0,
                completed: 0,
                credits_used: None,
                expires_at: None,
                data: None,
            },
        );

        Ok(StartCrawlResponse {
            id,
            url: url.to_string(),
        })
    }

    async fn get_crawl_status(&self, id: &str) -> ScrapeResult<CrawlStatusResponse> {
        self.jobs
            .lock()
            .expect("lock poisoned")
            .get(id)
            .cloned()
            .ok_or_else(|| crate::error::ScrapeError::Other(format!("unknown job {id}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn start_crawl_then_status_round_trips() {
        let client = MockScrapeClient::new();
        let started = client.start_crawl("https://a.test", CrawlOptions::default()).await.unwrap();

        client.seed_completed(&started.id, vec![Document {
            markdown: Some("hi".into()),
            url: Some("https://a.test".into()),
            ..Default::default()
        }]);

        let status = client.get_crawl_status(&started.id).await.unwrap();
        assert_eq!(status.status, CrawlState::Completed);
        assert_eq!(status.data.unwrap().len(), 1);
    }
}
