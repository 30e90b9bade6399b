//! Drives one job from `try_claim` through to a terminal or deferred state.

use crate::state::AppState;
use axon_pipeline::{EmbedItem, EmbedMetadata};
use axon_scrape::{CrawlState, CrawlStatusResponse, Document};
use serde_json::Value;

const PROGRESS_PERSIST_EVERY: usize = 10;
const BACKOFF_BASE_SECS: u64 = 30;
const BACKOFF_MAX_SECS: u64 = 3600;

/// Process a single job end-to-end. Never panics; all failure paths persist
/// to the queue rather than propagating.
#[tracing::instrument(skip(state), fields(job_id))]
pub async fn process_job(state: &AppState, job_id: &str, webhook_pages: Option<Vec<Value>>) {
    match state.queue.try_claim(job_id).await {
        Ok(true) => {}
        Ok(false) => return,
        Err(e) => {
            tracing::warn!(job_id, error = %e, "failed to claim job");
            return;
        }
    }

    if let Err(err) = process_claimed_job(state, job_id, webhook_pages).await {
        handle_job_error(state, job_id, &err).await;
    }
}

async fn process_claimed_job(
    state: &AppState,
    job_id: &str,
    webhook_pages: Option<Vec<Value>>,
) -> Result<(), String> {
    let (status, pages) = match webhook_pages {
        Some(pages) => (CrawlState::Completed, pages_from_values(pages)),
        None => {
            let status_response = state
                .scrape
                .get_crawl_status(job_id)
                .await
                .map_err(|e| format!("failed to fetch crawl status: {e}"))?;
            documents_from_response(status_response)
        }
    };

    match status {
        CrawlState::Failed | CrawlState::Cancelled => {
            return Err(format!("Crawl {status:?}, cannot embed"));
        }
        CrawlState::Scraping => {
            return Err(format!("Crawl still {status:?}"));
        }
        CrawlState::Completed => {}
    }

    if pages.is_empty() {
        state
            .queue
            .update_progress(job_id, 0, 0, 0)
            .await
            .map_err(|e| e.to_string())?;
        state.queue.mark_completed(job_id).await.map_err(|e| e.to_string())?;
        return Ok(());
    }

    let items: Vec<EmbedItem> = pages
        .iter()
        .filter_map(|doc| {
            let content = doc.markdown.clone().or_else(|| doc.html.clone())?;
            let url = doc.effective_url()?.to_string();
            let content_type = if doc.markdown.is_some() { "markdown" } else { "html" };
            Some(EmbedItem {
                content,
                metadata: EmbedMetadata {
                    url,
                    title: doc.effective_title().map(str::to_string),
                    source_command: Some("crawl".to_string()),
                    content_type: Some(content_type.to_string()),
                    extra: Default::default(),
                },
            })
        })
        .collect();

    let total = items.len() as u32;
    state.queue.update_progress(job_id, 0, total, 0).await.map_err(|e| e.to_string())?;

    let queue = state.queue.clone();
    let job_id_owned = job_id.to_string();
    let result = state
        .pipeline
        .batch_embed(
            items,
            None,
            Some(Box::new(move |current, total| {
                if current % PROGRESS_PERSIST_EVERY == 0 || current == total {
                    let queue = queue.clone();
                    let job_id = job_id_owned.clone();
                    tokio::spawn(async move {
                        let _ = queue.update_progress(&job_id, current as u32, total as u32, 0).await;
                    });
                }
            })),
        )
        .await;

    state
        .queue
        .update_progress(job_id, total, total, result.failed as u32)
        .await
        .map_err(|e| e.to_string())?;
    state.queue.mark_completed(job_id).await.map_err(|e| e.to_string())?;

    tracing::info!(
        job_id,
        succeeded = result.succeeded,
        failed = result.failed,
        "batch embed finished"
    );
    if !result.errors.is_empty() {
        tracing::warn!(job_id, errors = ?result.errors, "some pages failed to embed");
    }

    Ok(())
}

fn pages_from_values(values: Vec<Value>) -> Vec<Document> {
    values
        .into_iter()
        .filter_map(|v| serde_json::from_value(v).ok())
        .collect()
}

fn documents_from_response(response: CrawlStatusResponse) -> (CrawlState, Vec<Document>) {
    (response.status, response.data.unwrap_or_default())
}

async fn handle_job_error(state: &AppState, job_id: &str, err: &str) {
    let lower = err.to_lowercase();
    if lower.starts_with("crawl still") {
        let _ = state.queue.mark_pending_no_retry(job_id, err).await;
        return;
    }

    if is_permanent_failure(&lower) {
        let _ = state.queue.mark_permanent_failed(job_id, err).await;
        return;
    }

    if let Ok(axon_queue::JobLookup::Found(job)) = state.queue.get_detailed(job_id).await {
        let delay = backoff_secs(job.retries);
        tracing::warn!(job_id, error = err, retry_delay_secs = delay, "job failed, will retry");
    }

    let _ = state.queue.mark_failed(job_id, err).await;
}

fn is_permanent_failure(lower_err: &str) -> bool {
    is_job_not_found(lower_err)
}

/// Classifier shared with the sweeper's tombstone cleanup: "job not found"
/// style errors will never succeed on retry.
pub fn is_job_not_found(lower_err: &str) -> bool {
    lower_err.contains("not found") || lower_err.contains("404")
}

fn backoff_secs(retries: u32) -> u64 {
    BACKOFF_BASE_SECS
        .saturating_mul(1u64.checked_shl(retries).unwrap_or(u64::MAX))
        .min(BACKOFF_MAX_SECS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_exponentially_then_caps() {
        assert_eq!(backoff_secs(0), 30);
        assert_eq!(backoff_secs(1), 60);
        assert_eq!(backoff_secs(2), 120);
        assert_eq!(backoff_secs(20), BACKOFF_MAX_SECS);
    }

    #[test]
    fn classifies_not_found_errors_as_permanent() {
        assert!(is_job_not_found("crawl job not found"));
        assert!(is_job_not_found("scrape api returned 404"));
        assert!(!is_job_not_found("connection reset"));
    }
}
