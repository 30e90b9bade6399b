//! Error types for the durable job queue.

use thiserror::Error;

pub type QueueResult<T> = Result<T, QueueError>;

#[derive(Error, Debug)]
pub enum QueueError {
    #[error("job '{0}' not found")]
    NotFound(String),

    #[error("invalid job id {0:?}: {1}")]
    InvalidJobId(String, String),

    #[error("job '{0}' is corrupted: {1}")]
    Corrupted(String, String),

    #[error("could not acquire lock for job '{0}'")]
    LockContended(String),

    /// ENOENT/EACCES acquiring or releasing a lock. Needs operator attention.
    #[error("lock failure for job '{0}': {1}")]
    LockFailure(String, String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("other error: {0}")]
    Other(String),
}

impl From<anyhow::Error> for QueueError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
