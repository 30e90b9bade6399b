//! Error types for the scraping API client.

use thiserror::Error;

pub type ScrapeResult<T> = Result<T, ScrapeError>;

#[derive(Error, Debug)]
pub enum ScrapeError {
    #[error("scrape API returned {status}: {body}")]
    RequestFailed { status: u16, body: String },

    #[error("scrape API response could not be parsed: {0}")]
    MalformedResponse(String),

    #[error("network error contacting scrape API: {0}")]
    Network(String),

    #[error("other error: {0}")]
    Other(String),
}

impl From<reqwest::Error> for ScrapeError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() {
            Self::Network(err.to_string())
        } else {
            Self::Other(err.to_string())
        }
    }
}

impl From<anyhow::Error> for ScrapeError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
