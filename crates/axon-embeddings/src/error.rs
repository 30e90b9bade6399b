//! Error types for the TEI embedding client

use thiserror::Error;

/// Result type alias for embedding operations
pub type EmbeddingResult<T> = Result<T, EmbeddingError>;

/// Errors raised talking to the TEI embedding-inference service.
#[derive(Error, Debug)]
pub enum EmbeddingError {
    /// `GET /info` failed
    #[error("TEI /info failed: {status} {body}")]
    TeiInfoFailed { status: u16, body: String },

    /// `POST /embed` failed after retries
    #[error("TEI /embed failed: {status} {body}")]
    TeiEmbedFailed { status: u16, body: String },

    /// A request to TEI timed out
    #[error("TEI request timed out after {0:?}")]
    TeiTimeout(std::time::Duration),

    /// TEI responded with a 2xx but an unexpected body shape
    #[error("TEI returned a malformed response: {0}")]
    TeiMalformedResponse(String),

    /// Low-level network error (connection refused/reset, DNS, etc.)
    #[error("Network error: {0}")]
    Network(String),

    /// Generic error for other cases
    #[error("Other error: {0}")]
    Other(String),
}

impl EmbeddingError {
    /// Whether this failure is worth retrying at the batch level.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::TeiTimeout(_) | Self::Network(_) => true,
            Self::TeiEmbedFailed { status, .. } | Self::TeiInfoFailed { status, .. } => {
                !(400..500).contains(status) || *status == 408 || *status == 429
            }
            Self::TeiMalformedResponse(_) | Self::Other(_) => false,
        }
    }
}

impl From<reqwest::Error> for EmbeddingError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::TeiTimeout(std::time::Duration::from_secs(0))
        } else {
            Self::Network(err.to_string())
        }
    }
}

impl From<anyhow::Error> for EmbeddingError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
