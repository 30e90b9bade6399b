//! The persisted job record and its state machine.

use axon_config::validation::validate_identifier;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

/// Progress counters for a job's embed pipeline run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobProgress {
    pub total: u32,
    pub processed: u32,
    pub failed: u32,
    pub progress_updated_at: Option<DateTime<Utc>>,
}

/// A durable record of one crawl-to-embed job, persisted as
/// `<jobId>.json` in the queue directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbedJob {
    pub job_id: String,
    pub url: String,
    pub status: JobStatus,
    pub retries: u32,
    pub max_retries: u32,
    #[serde(default)]
    pub progress: JobProgress,
    #[serde(default)]
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    /// Crawl-backend credential, if the caller supplied one when enqueuing.
    /// In-memory only: never serialized, so it can never land in the
    /// on-disk job file.
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl EmbedJob {
    pub fn new(job_id: impl Into<String>, url: impl Into<String>, max_retries: u32) -> Self {
        let now = Utc::now();
        Self {
            job_id: job_id.into(),
            url: url.into(),
            status: JobStatus::Pending,
            retries: 0,
            max_retries,
            progress: JobProgress::default(),
            last_error: None,
            created_at: now,
            updated_at: now,
            api_key: None,
        }
    }

    /// Basic structural invariants a corrupted file might violate.
    pub fn validate(&self) -> Result<(), String> {
        validate_identifier(&self.job_id, "jobId").map_err(|e| e.to_string())?;
        if self.retries > self.max_retries {
            return Err(format!(
                "retries ({}) exceeds maxRetries ({})",
                self.retries, self.max_retries
            ));
        }
        Ok(())
    }

    pub fn is_retryable(&self) -> bool {
        self.status == JobStatus::Pending && self.retries < self.max_retries
    }

    pub fn is_stuck_processing(&self) -> bool {
        self.status == JobStatus::Processing && self.retries < self.max_retries
    }
}

/// Outcome of a detailed job lookup, distinguishing "doesn't exist" from
/// "exists but failed schema validation".
#[derive(Debug, Clone)]
pub enum JobLookup {
    Found(EmbedJob),
    NotFound,
    Corrupted(String),
}
