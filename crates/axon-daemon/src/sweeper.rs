//! Periodic background maintenance: stuck-job recovery, stale-pending
//! processing, and tombstone cleanup for irrecoverable failures.

use crate::processing::{is_job_not_found, process_job};
use crate::state::AppState;
use std::time::Duration;

const CONSECUTIVE_FAILURE_THRESHOLD: u32 = 3;

/// Runs until `shutdown` resolves. Consecutive sweep failures are counted;
/// past the threshold each further failure is logged as `critical`.
pub async fn run(state: AppState, interval: Duration, mut shutdown: tokio::sync::oneshot::Receiver<()>) {
    let mut ticker = tokio::time::interval(interval);
    let mut consecutive_failures: u32 = 0;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = sweep_once(&state).await {
                    consecutive_failures += 1;
                    if consecutive_failures >= CONSECUTIVE_FAILURE_THRESHOLD {
                        tracing::error!(critical = true, error = %e, consecutive_failures, "sweeper failing repeatedly");
                    } else {
                        tracing::warn!(error = %e, consecutive_failures, "sweeper pass failed");
                    }
                } else {
                    consecutive_failures = 0;
                }
            }
            _ = &mut shutdown => {
                tracing::info!("sweeper shutting down");
                return;
            }
        }
    }
}

async fn sweep_once(state: &AppState) -> Result<(), String> {
    let stuck_threshold = Duration::from_millis(state.stuck_threshold_ms);
    let recovered = state
        .queue
        .recover_stuck_jobs(stuck_threshold)
        .await
        .map_err(|e| e.to_string())?;
    if recovered > 0 {
        tracing::info!(recovered, "recovered stuck processing jobs");
    }

    let stale_threshold = Duration::from_millis(state.stale_threshold_ms);
    let stale = state
        .queue
        .get_stale_pending_jobs(stale_threshold)
        .await
        .map_err(|e| e.to_string())?;
    for job in stale {
        process_job(state, &job.job_id, None).await;
    }

    let removed = state
        .queue
        .cleanup_irrecoverable_failed(|err| is_job_not_found(&err.to_lowercase()))
        .await
        .map_err(|e| e.to_string())?;
    if removed > 0 {
        tracing::info!(removed, "cleaned up irrecoverable failed jobs");
    }

    Ok(())
}
