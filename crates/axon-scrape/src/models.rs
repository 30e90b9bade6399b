//! Request/response shapes for the scraping API.

use serde::{Deserialize, Serialize};

/// Options accepted by `start_crawl`. All fields are optional; the scraping
/// API applies its own defaults for anything omitted.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CrawlOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "maxDiscoveryDepth")]
    pub max_discovery_depth: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty", rename = "excludePaths")]
    pub exclude_paths: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", rename = "includePaths")]
    pub include_paths: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sitemap: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "ignoreQueryParameters")]
    pub ignore_query_parameters: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "crawlEntireDomain")]
    pub crawl_entire_domain: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "allowExternalLinks")]
    pub allow_external_links: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "allowSubdomains")]
    pub allow_subdomains: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "maxConcurrency")]
    pub max_concurrency: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webhook: Option<WebhookOptions>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WebhookOptions {
    pub url: String,
    #[serde(skip_serializing_if = "std::collections::HashMap::is_empty")]
    pub headers: std::collections::HashMap<String, String>,
    pub events: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StartCrawlResponse {
    pub id: String,
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CrawlState {
    Scraping,
    Completed,
    Failed,
    Cancelled,
}

#[derive(Debug, Clone, Deserialize)]
#[allow(clippy::struct_field_names)]
pub struct CrawlStatusResponse {
    pub id: String,
    pub status: CrawlState,
    pub total: u32,
    pub completed: u32,
    #[serde(default, rename = "creditsUsed")]
    pub credits_used: Option<u64>,
    #[serde(default, rename = "expiresAt")]
    pub expires_at: Option<String>,
    #[serde(default)]
    pub data: Option<Vec<Document>>,
}

/// A scraped page. The scraping API is loose about which fields are
/// present; callers should treat all of them as optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub markdown: Option<String>,
    #[serde(default)]
    pub html: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub metadata: Option<DocumentMetadata>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DocumentMetadata {
    #[serde(default, rename = "sourceURL")]
    pub source_url: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

impl Document {
    /// Best-effort URL for this document: its own `url`, else
    /// `metadata.source_url`, else `metadata.url`.
    pub fn effective_url(&self) -> Option<&str> {
        self.url
            .as_deref()
            .or_else(|| self.metadata.as_ref().and_then(|m| m.source_url.as_deref()))
            .or_else(|| self.metadata.as_ref().and_then(|m| m.url.as_deref()))
    }

    /// Best-effort title: this document's own `title`, else `metadata.title`.
    pub fn effective_title(&self) -> Option<&str> {
        self.title
            .as_deref()
            .or_else(|| self.metadata.as_ref().and_then(|m| m.title.as_deref()))
    }
}
