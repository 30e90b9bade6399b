//! Durable file-backed job queue.
//!
//! One JSON file per job under the queue directory, guarded by an adjacent
//! `.lock` file. All read-modify-write cycles run inside `spawn_blocking`
//! since the queue directory lives on local disk and `tokio`'s runtime here
//! has no `fs` feature enabled.

use crate::error::{QueueError, QueueResult};
use crate::lock::JobLock;
use crate::models::{EmbedJob, JobLookup, JobStatus};
use axon_config::validation::validate_identifier;
use chrono::Utc;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

const NORMAL_LOCK_RETRIES: u32 = 5;
const CLAIM_LOCK_RETRIES: u32 = 0;
const PROGRESS_LOCK_RETRIES: u32 = 1;

pub struct QueueStore {
    dir: PathBuf,
    default_max_retries: u32,
}

impl QueueStore {
    pub fn new(dir: impl Into<PathBuf>, default_max_retries: u32) -> QueueResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        set_dir_mode(&dir)?;
        Ok(Self {
            dir,
            default_max_retries,
        })
    }

    /// Builds the on-disk path for a job, rejecting any `job_id` that isn't
    /// `^[A-Za-z0-9_-]{1,128}$` before it can be interpolated into a path —
    /// the only thing standing between a webhook-supplied id and a path
    /// traversal.
    fn job_path(&self, job_id: &str) -> QueueResult<PathBuf> {
        validate_identifier(job_id, "jobId")
            .map_err(|e| QueueError::InvalidJobId(job_id.to_string(), e.to_string()))?;
        Ok(self.dir.join(format!("{job_id}.json")))
    }

    pub async fn enqueue(&self, job_id: &str, url: &str) -> QueueResult<EmbedJob> {
        let path = self.job_path(job_id)?;
        let job = EmbedJob::new(job_id, url, self.default_max_retries);
        tokio::task::spawn_blocking(move || write_job_atomic(&path, &job).map(|()| job))
            .await
            .map_err(join_error)?
    }

    /// Atomically transition `pending -> processing`. Returns `false` without
    /// error when the job is missing, not pending, or the lock is contended.
    pub async fn try_claim(&self, job_id: &str) -> QueueResult<bool> {
        let path = self.job_path(job_id)?;
        let job_id = job_id.to_string();

        tokio::task::spawn_blocking(move || -> QueueResult<bool> {
            let _lock = match JobLock::acquire(&path, CLAIM_LOCK_RETRIES) {
                Ok(lock) => lock,
                Err(QueueError::LockContended(_)) => return Ok(false),
                Err(e) => return Err(e),
            };

            let mut job = match read_job(&path) {
                Ok(job) => job,
                Err(QueueError::NotFound(_)) => return Ok(false),
                Err(e) => return Err(e),
            };

            if job.status != JobStatus::Pending {
                return Ok(false);
            }

            job.status = JobStatus::Processing;
            job.updated_at = Utc::now();
            write_job_atomic(&path, &job)?;
            tracing::debug!(job_id, "claimed job for processing");
            Ok(true)
        })
        .await
        .map_err(join_error)?
    }

    pub async fn mark_completed(&self, job_id: &str) -> QueueResult<()> {
        self.mutate(job_id, NORMAL_LOCK_RETRIES, |job| {
            job.status = JobStatus::Completed;
            job.last_error = None;
        })
        .await
    }

    /// `retries+1 >= maxRetries` makes this terminal; otherwise the job goes
    /// back to `pending` with the retry budget consumed.
    pub async fn mark_failed(&self, job_id: &str, err: impl Into<String>) -> QueueResult<()> {
        let err = err.into();
        self.mutate(job_id, NORMAL_LOCK_RETRIES, move |job| {
            job.retries += 1;
            job.last_error = Some(err.clone());
            job.status = if job.retries >= job.max_retries {
                JobStatus::Failed
            } else {
                JobStatus::Pending
            };
        })
        .await
    }

    /// Deferral (e.g. "crawl still running"): back to `pending` without
    /// consuming a retry.
    pub async fn mark_pending_no_retry(&self, job_id: &str, err: impl Into<String>) -> QueueResult<()> {
        let err = err.into();
        self.mutate(job_id, NORMAL_LOCK_RETRIES, move |job| {
            job.status = JobStatus::Pending;
            job.last_error = Some(err.clone());
        })
        .await
    }

    pub async fn mark_config_error(&self, job_id: &str, err: impl Into<String>) -> QueueResult<()> {
        self.mark_terminal(job_id, err).await
    }

    pub async fn mark_permanent_failed(&self, job_id: &str, err: impl Into<String>) -> QueueResult<()> {
        self.mark_terminal(job_id, err).await
    }

    async fn mark_terminal(&self, job_id: &str, err: impl Into<String>) -> QueueResult<()> {
        let err = err.into();
        self.mutate(job_id, NORMAL_LOCK_RETRIES, move |job| {
            job.status = JobStatus::Failed;
            job.retries = job.max_retries;
            job.last_error = Some(err.clone());
        })
        .await
    }

    pub async fn update_progress(
        &self,
        job_id: &str,
        processed: u32,
        total: u32,
        failed: u32,
    ) -> QueueResult<()> {
        self.mutate(job_id, PROGRESS_LOCK_RETRIES, move |job| {
            job.progress.processed = processed;
            job.progress.total = total;
            job.progress.failed = failed;
            job.progress.progress_updated_at = Some(Utc::now());
        })
        .await
    }

    async fn mutate<F>(&self, job_id: &str, lock_retries: u32, mutator: F) -> QueueResult<()>
    where
        F: FnOnce(&mut EmbedJob) + Send + 'static,
    {
        let path = self.job_path(job_id)?;
        tokio::task::spawn_blocking(move || -> QueueResult<()> {
            let _lock = JobLock::acquire(&path, lock_retries)?;
            let mut job = read_job(&path)?;
            mutator(&mut job);
            job.updated_at = Utc::now();
            write_job_atomic(&path, &job)
        })
        .await
        .map_err(join_error)?
    }

    pub async fn get_detailed(&self, job_id: &str) -> QueueResult<JobLookup> {
        let path = match self.job_path(job_id) {
            Ok(path) => path,
            Err(QueueError::InvalidJobId(_, reason)) => return Ok(JobLookup::Corrupted(reason)),
            Err(e) => return Err(e),
        };
        tokio::task::spawn_blocking(move || -> QueueResult<JobLookup> {
            if !path.exists() {
                return Ok(JobLookup::NotFound);
            }
            match read_job(&path) {
                Ok(job) => Ok(JobLookup::Found(job)),
                Err(QueueError::Corrupted(_, reason)) => Ok(JobLookup::Corrupted(reason)),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(join_error)?
    }

    /// All valid jobs, plus the number of files skipped for being corrupted.
    pub async fn list(&self) -> QueueResult<(Vec<EmbedJob>, usize)> {
        let dir = self.dir.clone();
        tokio::task::spawn_blocking(move || -> QueueResult<(Vec<EmbedJob>, usize)> {
            let mut jobs = Vec::new();
            let mut corrupted = 0;
            for entry in fs::read_dir(&dir)? {
                let entry = entry?;
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) != Some("json") {
                    continue;
                }
                match read_job(&path) {
                    Ok(job) => jobs.push(job),
                    Err(_) => corrupted += 1,
                }
            }
            Ok((jobs, corrupted))
        })
        .await
        .map_err(join_error)?
    }

    pub async fn get_pending_jobs(&self) -> QueueResult<Vec<EmbedJob>> {
        let (jobs, _) = self.list().await?;
        let mut pending: Vec<EmbedJob> = jobs.into_iter().filter(EmbedJob::is_retryable).collect();
        pending.sort_by_key(|j| j.created_at);
        Ok(pending)
    }

    pub async fn get_stale_pending_jobs(&self, max_age: Duration) -> QueueResult<Vec<EmbedJob>> {
        let cutoff = Utc::now() - chrono::Duration::from_std(max_age).unwrap_or_default();
        let (jobs, _) = self.list().await?;
        Ok(jobs
            .into_iter()
            .filter(|j| j.is_retryable() && j.updated_at <= cutoff)
            .collect())
    }

    pub async fn get_stuck_processing_jobs(&self, max_age: Duration) -> QueueResult<Vec<EmbedJob>> {
        let cutoff = Utc::now() - chrono::Duration::from_std(max_age).unwrap_or_default();
        let (jobs, _) = self.list().await?;
        Ok(jobs
            .into_iter()
            .filter(|j| j.is_stuck_processing() && j.updated_at <= cutoff)
            .collect())
    }

    /// Revert stuck jobs (`processing` past `max_age`) back to `pending`,
    /// keeping their retry history.
    pub async fn recover_stuck_jobs(&self, max_age: Duration) -> QueueResult<usize> {
        let stuck = self.get_stuck_processing_jobs(max_age).await?;
        let count = stuck.len();
        for job in stuck {
            self.mutate(&job.job_id, NORMAL_LOCK_RETRIES, |job| {
                job.status = JobStatus::Pending;
            })
            .await?;
        }
        Ok(count)
    }

    /// Delete completed/failed jobs older than `max_age`.
    pub async fn cleanup_old_jobs(&self, max_age: Duration) -> QueueResult<usize> {
        let cutoff = Utc::now() - chrono::Duration::from_std(max_age).unwrap_or_default();
        let (jobs, _) = self.list().await?;
        let mut removed = 0;
        for job in jobs {
            let terminal = matches!(job.status, JobStatus::Completed | JobStatus::Failed);
            if terminal && job.updated_at <= cutoff {
                self.remove(&job.job_id).await?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Delete `failed` jobs whose `lastError` matches `is_irrecoverable`
    /// (e.g. "job not found" style errors that will never succeed on retry).
    pub async fn cleanup_irrecoverable_failed<F>(&self, is_irrecoverable: F) -> QueueResult<usize>
    where
        F: Fn(&str) -> bool,
    {
        let (jobs, _) = self.list().await?;
        let mut removed = 0;
        for job in jobs {
            if job.status == JobStatus::Failed
                && job
                    .last_error
                    .as_deref()
                    .is_some_and(|e| is_irrecoverable(e))
            {
                self.remove(&job.job_id).await?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn remove(&self, job_id: &str) -> QueueResult<()> {
        let path = self.job_path(job_id)?;
        let lock_path = {
            let mut p = path.clone().into_os_string();
            p.push(".lock");
            PathBuf::from(p)
        };
        tokio::task::spawn_blocking(move || -> QueueResult<()> {
            if path.exists() {
                fs::remove_file(&path)?;
            }
            let _ = fs::remove_file(&lock_path);
            Ok(())
        })
        .await
        .map_err(join_error)?
    }
}

fn read_job(path: &Path) -> QueueResult<EmbedJob> {
    if !path.exists() {
        return Err(QueueError::NotFound(
            path.file_stem().map_or_else(String::new, |s| s.to_string_lossy().into_owned()),
        ));
    }

    let raw = fs::read_to_string(path)?;
    let job: EmbedJob = serde_json::from_str(&raw)
        .map_err(|e| QueueError::Corrupted(path.display().to_string(), e.to_string()))?;
    job.validate()
        .map_err(|e| QueueError::Corrupted(path.display().to_string(), e))?;
    Ok(job)
}

fn write_job_atomic(path: &Path, job: &EmbedJob) -> QueueResult<()> {
    let tmp_path = {
        let mut p = path.as_os_str().to_owned();
        p.push(".tmp");
        PathBuf::from(p)
    };

    let body = serde_json::to_vec_pretty(job)?;
    {
        let mut file = fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&tmp_path)?;
        file.write_all(&body)?;
        file.sync_all()?;
    }
    set_file_mode(&tmp_path)?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}

#[cfg(unix)]
fn set_dir_mode(dir: &Path) -> QueueResult<()> {
    fs::set_permissions(dir, fs::Permissions::from_mode(0o700))?;
    Ok(())
}

#[cfg(not(unix))]
fn set_dir_mode(_dir: &Path) -> QueueResult<()> {
    Ok(())
}

#[cfg(unix)]
fn set_file_mode(path: &Path) -> QueueResult<()> {
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    Ok(())
}

#[cfg(not(unix))]
fn set_file_mode(_path: &Path) -> QueueResult<()> {
    Ok(())
}

fn join_error(e: tokio::task::JoinError) -> QueueError {
    QueueError::Other(format!("queue task panicked: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration as StdDuration;

    async fn store() -> (QueueStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = QueueStore::new(dir.path(), 3).unwrap();
        (store, dir)
    }

    #[tokio::test]
    async fn enqueue_then_claim_transitions_to_processing() {
        let (store, _dir) = store().await;
        store.enqueue("job-1", "https://a.test").await.unwrap();

        assert!(store.try_claim("job-1").await.unwrap());
        assert!(!store.try_claim("job-1").await.unwrap());

        let JobLookup::Found(job) = store.get_detailed("job-1").await.unwrap() else {
            panic!("expected found job");
        };
        assert_eq!(job.status, JobStatus::Processing);
    }

    #[tokio::test]
    async fn mark_failed_retries_then_terminates() {
        let (store, _dir) = store().await;
        store.enqueue("job-1", "https://a.test").await.unwrap();

        store.mark_failed("job-1", "boom").await.unwrap();
        let JobLookup::Found(job) = store.get_detailed("job-1").await.unwrap() else {
            panic!("expected found job");
        };
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.retries, 1);

        store.mark_failed("job-1", "boom").await.unwrap();
        store.mark_failed("job-1", "boom").await.unwrap();
        let JobLookup::Found(job) = store.get_detailed("job-1").await.unwrap() else {
            panic!("expected found job");
        };
        assert_eq!(job.status, JobStatus::Failed);
    }

    #[tokio::test]
    async fn mark_pending_no_retry_does_not_consume_budget() {
        let (store, _dir) = store().await;
        store.enqueue("job-1", "https://a.test").await.unwrap();
        store.mark_pending_no_retry("job-1", "crawl still scraping").await.unwrap();

        let JobLookup::Found(job) = store.get_detailed("job-1").await.unwrap() else {
            panic!("expected found job");
        };
        assert_eq!(job.retries, 0);
        assert_eq!(job.status, JobStatus::Pending);
    }

    #[tokio::test]
    async fn get_pending_jobs_is_fifo() {
        let (store, _dir) = store().await;
        store.enqueue("job-a", "https://a.test").await.unwrap();
        tokio::time::sleep(StdDuration::from_millis(5)).await;
        store.enqueue("job-b", "https://b.test").await.unwrap();

        let pending = store.get_pending_jobs().await.unwrap();
        assert_eq!(pending[0].job_id, "job-a");
        assert_eq!(pending[1].job_id, "job-b");
    }

    #[tokio::test]
    async fn get_detailed_reports_not_found() {
        let (store, _dir) = store().await;
        assert!(matches!(store.get_detailed("missing").await.unwrap(), JobLookup::NotFound));
    }

    #[tokio::test]
    async fn enqueue_rejects_path_traversal_job_id() {
        let (store, _dir) = store().await;
        let err = store.enqueue("../../etc/passwd", "https://a.test").await.unwrap_err();
        assert!(matches!(err, QueueError::InvalidJobId(_, _)));
    }

    #[tokio::test]
    async fn get_detailed_reports_corrupted_for_path_traversal_job_id() {
        let (store, _dir) = store().await;
        let lookup = store.get_detailed("../../etc/passwd").await.unwrap();
        assert!(matches!(lookup, JobLookup::Corrupted(_)));
    }

    #[tokio::test]
    async fn list_skips_corrupted_files() {
        let (store, dir) = store().await;
        store.enqueue("job-a", "https://a.test").await.unwrap();
        std::fs::write(dir.path().join("job-b.json"), "{ not json").unwrap();

        let (jobs, corrupted) = store.list().await.unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(corrupted, 1);
    }

    #[tokio::test]
    async fn cleanup_old_jobs_removes_only_terminal_jobs_past_max_age() {
        let (store, _dir) = store().await;
        store.enqueue("job-a", "https://a.test").await.unwrap();
        store.mark_completed("job-a").await.unwrap();

        let removed = store.cleanup_old_jobs(StdDuration::from_secs(0)).await.unwrap();
        assert_eq!(removed, 1);
        assert!(matches!(store.get_detailed("job-a").await.unwrap(), JobLookup::NotFound));
    }
}
