//! `reqwest`-backed client for the scraping API.

use crate::error::{ScrapeError, ScrapeResult};
use crate::models::{CrawlOptions, CrawlStatusResponse, StartCrawlResponse};
use crate::traits::ScrapeClient;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for the external crawling/scraping API.
pub struct HttpScrapeClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpScrapeClient {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            http: Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_default(),
            base_url: base_url.into(),
            api_key,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path.trim_start_matches('/'))
    }

    fn authed(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }
}

#[async_trait]
impl ScrapeClient for HttpScrapeClient {
    #[tracing::instrument(skip(self, options))]
    async fn start_crawl(&self, url: &str, options: CrawlOptions) -> ScrapeResult<StartCrawlResponse> {
        let body = serde_json::json!({
            "url": url,
            "limit": options.limit,
            "maxDiscoveryDepth": options.max_discovery_depth,
            "excludePaths": options.exclude_paths,
            "includePaths": options.include_paths,
            "sitemap": options.sitemap,
            "ignoreQueryParameters": options.ignore_query_parameters,
            "crawlEntireDomain": options.crawl_entire_domain,
            "allowExternalLinks": options.allow_external_links,
            "allowSubdomains": options.allow_subdomains,
            "delay": options.delay,
            "maxConcurrency": options.max_concurrency,
            "webhook": options.webhook,
        });

        let request = self.authed(self.http.post(self.endpoint("/v1/crawl")).json(&body));
        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ScrapeError::RequestFailed {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<StartCrawlResponse>()
            .await
            .map_err(|e| ScrapeError::MalformedResponse(e.to_string()))
    }

    #[tracing::instrument(skip(self))]
    async fn get_crawl_status(&self, id: &str) -> ScrapeResult<CrawlStatusResponse> {
        let request = self.authed(self.http.get(self.endpoint(&format!("/v1/crawl/{id}"))));
        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ScrapeError::RequestFailed {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<CrawlStatusResponse>()
            .await
            .map_err(|e| ScrapeError::MalformedResponse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn start_crawl_parses_id_and_url() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/crawl"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "job-1",
                "url": "https://example.com"
            })))
            .mount(&server)
            .await;

        let client = HttpScrapeClient::new(server.uri(), None);
        let result = client
            .start_crawl("https://example.com", CrawlOptions::default())
            .await
            .unwrap();

        assert_eq!(result.id, "job-1");
    }

    #[tokio::test]
    async fn get_crawl_status_parses_pages() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/crawl/job-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "job-1",
                "status": "completed",
                "total": 1,
                "completed": 1,
                "data": [{"markdown": "# hi", "url": "https://example.com"}]
            })))
            .mount(&server)
            .await;

        let client = HttpScrapeClient::new(server.uri(), None);
        let status = client.get_crawl_status("job-1").await.unwrap();

        assert_eq!(status.data.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn non_success_status_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/crawl/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
            .mount(&server)
            .await;

        let client = HttpScrapeClient::new(server.uri(), None);
        let err = client.get_crawl_status("missing").await.unwrap_err();

        assert!(matches!(err, ScrapeError::RequestFailed { status: 404, .. }));
    }
}
