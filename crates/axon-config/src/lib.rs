//! Centralized configuration management for axon
//!
//! This crate provides a single typed `AxonConfig`, loaded from environment
//! variables with safe local defaults. There is no profile/environment
//! selection — the daemon has one deployment shape, and every setting can be
//! overridden individually via its own env var.

pub mod error;
pub mod source;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use source::EnvironmentSource;

use validation::{Validate, validate_identifier, validate_non_empty, validate_port, validate_url};

// =============================================================================
// SAFE DEFAULTS
// =============================================================================

const DEFAULT_TEI_URL: &str = "http://localhost:8080";
const DEFAULT_QDRANT_URL: &str = "http://localhost:6334";
const DEFAULT_QDRANT_COLLECTION: &str = "axon";
const DEFAULT_SCRAPE_API_URL: &str = "https://api.firecrawl.dev";

const DEFAULT_WEBHOOK_PORT: u16 = 53000;
const DEFAULT_WEBHOOK_PATH: &str = "/webhooks/crawl";
const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1";
const OPT_IN_BIND_ADDRESS: &str = "0.0.0.0";

const DEFAULT_STALE_MINUTES: u64 = 10;
const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_STUCK_MINUTES: u64 = 5;
const DEFAULT_CLEANUP_HOURS: u64 = 24;

/// Root configuration for the `axond` daemon.
///
/// All settings have safe defaults and can be overridden via environment
/// variables; see [`AxonConfig::from_env`].
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct AxonConfig {
    pub tei: TeiConfig,
    pub qdrant: QdrantConfig,
    pub scrape: ScrapeConfig,
    pub queue: QueueConfig,
    pub webhook: WebhookConfig,
}

/// Scraping API client configuration.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ScrapeConfig {
    /// Base URL of the scraping API, e.g. `https://api.firecrawl.dev`.
    pub url: String,

    /// API key sent as a bearer token, if the scraping API requires one.
    pub api_key: Option<String>,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_SCRAPE_API_URL.to_string(),
            api_key: None,
        }
    }
}

/// TEI embedding-inference service configuration.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TeiConfig {
    /// Base URL of the TEI HTTP service, e.g. `http://localhost:8080`.
    pub url: String,
}

impl Default for TeiConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_TEI_URL.to_string(),
        }
    }
}

/// Qdrant vector database configuration.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct QdrantConfig {
    /// gRPC endpoint for the Qdrant cluster.
    pub url: String,

    /// Name of the collection pages are embedded into.
    pub collection: String,
}

impl Default for QdrantConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_QDRANT_URL.to_string(),
            collection: DEFAULT_QDRANT_COLLECTION.to_string(),
        }
    }
}

/// Durable job queue configuration.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct QueueConfig {
    /// Directory holding one `<jobId>.json` file per job. Defaults to
    /// `$XDG_CONFIG_HOME/axon/embed-queue` (or the platform equivalent).
    pub dir: std::path::PathBuf,

    /// Minutes a `pending` job may sit unattended before the sweeper treats
    /// it as stale and re-runs it outside the webhook path.
    pub stale_minutes: u64,

    /// Minutes a `processing` job may run before the sweeper assumes its
    /// worker crashed and reverts it to `pending`.
    pub stuck_minutes: u64,

    /// Maximum retry attempts for a transient failure before a job is
    /// marked permanently `failed`.
    pub max_retries: u32,

    /// Hours a terminal (`completed`/`failed`) job is kept before the
    /// startup cleanup pass deletes it.
    pub cleanup_hours: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            dir: default_queue_dir(),
            stale_minutes: DEFAULT_STALE_MINUTES,
            stuck_minutes: DEFAULT_STUCK_MINUTES,
            max_retries: DEFAULT_MAX_RETRIES,
            cleanup_hours: DEFAULT_CLEANUP_HOURS,
        }
    }
}

fn default_queue_dir() -> std::path::PathBuf {
    dirs::config_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("axon")
        .join("embed-queue")
}

/// Webhook HTTP ingress configuration.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct WebhookConfig {
    /// Public URL the scraping API should POST webhooks to, if configured.
    pub url: Option<String>,

    /// Shared secret clients must present in `x-axon-embedder-secret`.
    /// Generated at process start if unset.
    pub secret: Option<String>,

    /// Port the daemon's HTTP server listens on.
    pub port: u16,

    /// Path the webhook is served under.
    pub path: String,

    /// Bind address; only `"0.0.0.0"` is honored as an explicit opt-in to
    /// listen on all interfaces. Anything else falls back to loopback.
    pub bind_address: String,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            url: None,
            secret: None,
            port: DEFAULT_WEBHOOK_PORT,
            path: DEFAULT_WEBHOOK_PATH.to_string(),
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
        }
    }
}

impl Default for AxonConfig {
    fn default() -> Self {
        Self {
            tei: TeiConfig::default(),
            qdrant: QdrantConfig::default(),
            scrape: ScrapeConfig::default(),
            queue: QueueConfig::default(),
            webhook: WebhookConfig::default(),
        }
    }
}

impl AxonConfig {
    /// Build configuration from environment variables, falling back to safe
    /// defaults for anything unset.
    ///
    /// Recognized variables: `TEI_URL`, `QDRANT_URL`, `QDRANT_COLLECTION`,
    /// `AXON_WEBHOOK_URL`, `AXON_WEBHOOK_SECRET`, `AXON_WEBHOOK_PORT`,
    /// `AXON_WEBHOOK_PATH`, `AXON_EMBEDDER_QUEUE_DIR`,
    /// `AXON_EMBEDDER_STALE_MINUTES`, `AXON_EMBEDDER_STUCK_MINUTES`,
    /// `AXON_EMBEDDER_BIND_ADDRESS`.
    ///
    /// # Errors
    /// Returns `ConfigError` if an overridden value fails validation (e.g. a
    /// malformed URL or an out-of-range port).
    pub fn from_env() -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("TEI_URL") {
            config.tei.url = url;
        }
        if let Ok(url) = std::env::var("QDRANT_URL") {
            config.qdrant.url = url;
        }
        if let Ok(name) = std::env::var("QDRANT_COLLECTION") {
            config.qdrant.collection = name;
        }
        if let Ok(url) = std::env::var("AXON_SCRAPE_API_URL") {
            config.scrape.url = url;
        }
        if let Ok(key) = std::env::var("AXON_SCRAPE_API_KEY") {
            config.scrape.api_key = Some(key);
        }

        if let Ok(url) = std::env::var("AXON_WEBHOOK_URL") {
            config.webhook.url = Some(url);
        }
        if let Ok(secret) = std::env::var("AXON_WEBHOOK_SECRET") {
            config.webhook.secret = Some(secret);
        }
        if let Ok(port) = std::env::var("AXON_WEBHOOK_PORT") {
            config.webhook.port = port.parse().map_err(|_| ConfigError::Generic {
                message: format!("AXON_WEBHOOK_PORT must be a valid port number, got {port:?}"),
            })?;
        }
        if let Ok(path) = std::env::var("AXON_WEBHOOK_PATH") {
            config.webhook.path = path;
        }
        if let Ok(bind) = std::env::var("AXON_EMBEDDER_BIND_ADDRESS") {
            config.webhook.bind_address = if bind == OPT_IN_BIND_ADDRESS {
                bind
            } else {
                DEFAULT_BIND_ADDRESS.to_string()
            };
        }

        if let Ok(dir) = std::env::var("AXON_EMBEDDER_QUEUE_DIR") {
            config.queue.dir = std::path::PathBuf::from(dir);
        }
        if let Ok(minutes) = std::env::var("AXON_EMBEDDER_STALE_MINUTES") {
            config.queue.stale_minutes = minutes.parse().map_err(|_| ConfigError::Generic {
                message: format!(
                    "AXON_EMBEDDER_STALE_MINUTES must be a non-negative integer, got {minutes:?}"
                ),
            })?;
        }
        if let Ok(minutes) = std::env::var("AXON_EMBEDDER_STUCK_MINUTES") {
            config.queue.stuck_minutes = minutes.parse().map_err(|_| ConfigError::Generic {
                message: format!(
                    "AXON_EMBEDDER_STUCK_MINUTES must be a non-negative integer, got {minutes:?}"
                ),
            })?;
        }

        tracing::debug!(
            tei_url = %config.tei.url,
            qdrant_url = %config.qdrant.url,
            collection = %config.qdrant.collection,
            queue_dir = %config.queue.dir.display(),
            "Loaded configuration from environment"
        );

        Ok(config)
    }
}

impl Validate for AxonConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_url(&self.tei.url, "tei.url")?;
        validate_url(&self.qdrant.url, "qdrant.url")?;
        validate_url(&self.scrape.url, "scrape.url")?;
        validate_identifier(&self.qdrant.collection, "qdrant.collection")?;
        validate_non_empty(&self.webhook.path, "webhook.path")?;
        validate_port(self.webhook.port, "webhook.port")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate_cleanly() {
        let config = AxonConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn bind_address_opt_in_is_exact_match_only() {
        // SAFETY: test-only env var scoping; no other test in this module reads it.
        unsafe {
            std::env::set_var("AXON_EMBEDDER_BIND_ADDRESS", "0.0.0.0/24");
        }
        let config = AxonConfig::from_env().unwrap();
        assert_eq!(config.webhook.bind_address, DEFAULT_BIND_ADDRESS);
        unsafe {
            std::env::set_var("AXON_EMBEDDER_BIND_ADDRESS", "0.0.0.0");
        }
        let config = AxonConfig::from_env().unwrap();
        assert_eq!(config.webhook.bind_address, "0.0.0.0");
        unsafe {
            std::env::remove_var("AXON_EMBEDDER_BIND_ADDRESS");
        }
    }

    #[test]
    fn rejects_bad_collection_name() {
        let mut config = AxonConfig::default();
        config.qdrant.collection = "../traverse".to_string();
        assert!(config.validate().is_err());
    }
}
