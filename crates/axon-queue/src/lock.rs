//! Advisory per-job file lock with stale-lock detection.

use crate::error::{QueueError, QueueResult};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};

const STALE_TIMEOUT: Duration = Duration::from_secs(60);
const RETRY_BASE_DELAY: Duration = Duration::from_millis(50);

/// Advisory lock on `<job_id>.json.lock`, held for the duration of one
/// read-modify-write cycle against the job file.
pub struct JobLock {
    path: PathBuf,
    file: Option<File>,
}

impl JobLock {
    fn lock_path(job_path: &Path) -> PathBuf {
        let mut path = job_path.as_os_str().to_owned();
        path.push(".lock");
        PathBuf::from(path)
    }

    /// Acquire the lock, retrying up to `max_retries` times (0 for a single
    /// non-blocking attempt, as used by `try_claim`).
    pub fn acquire(job_path: &Path, max_retries: u32) -> QueueResult<Self> {
        let path = Self::lock_path(job_path);
        let start = Instant::now();

        for attempt in 0..=max_retries {
            let file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(false)
                .open(&path)
                .map_err(|e| classify_io_error(&path, e))?;

            match file.try_lock_exclusive() {
                Ok(()) => {
                    return Ok(Self {
                        path,
                        file: Some(file),
                    });
                }
                Err(_) if is_stale(&path) => {
                    let _ = fs::remove_file(&path);
                    continue;
                }
                Err(_) if attempt < max_retries => {
                    let backoff = RETRY_BASE_DELAY * 2u32.pow(attempt.min(4));
                    std::thread::sleep(backoff);
                }
                Err(_) => {
                    tracing::debug!(job_lock = %path.display(), elapsed_ms = %start.elapsed().as_millis(), "lock contended");
                    return Err(QueueError::LockContended(path.display().to_string()));
                }
            }
        }

        Err(QueueError::LockContended(path.display().to_string()))
    }
}

impl Drop for JobLock {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            if let Err(e) = FileExt::unlock(&file) {
                tracing::warn!(job_lock = %self.path.display(), error = %e, "failed to release job lock");
            }
        }
    }
}

fn is_stale(path: &Path) -> bool {
    let Ok(metadata) = fs::metadata(path) else {
        return false;
    };
    let Ok(modified) = metadata.modified() else {
        return false;
    };
    let age = SystemTime::now()
        .duration_since(modified)
        .unwrap_or_default();
    age >= STALE_TIMEOUT
}

fn classify_io_error(path: &Path, err: std::io::Error) -> QueueError {
    use std::io::ErrorKind::{NotFound, PermissionDenied};
    match err.kind() {
        NotFound | PermissionDenied => {
            QueueError::LockFailure(path.display().to_string(), err.to_string())
        }
        _ => QueueError::Io(err),
    }
}
