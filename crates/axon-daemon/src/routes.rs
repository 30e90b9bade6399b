//! Axum routes for the webhook HTTP ingress.

use crate::auth::constant_time_eq;
use crate::processing::process_job;
use crate::state::AppState;
use crate::webhook_payload::{parse_webhook_payload, ReportedStatus};
use axon_common::error_sanitizer::sanitize_error;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::{json, Value};

const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;
const SECRET_HEADER: &str = "x-axon-embedder-secret";

pub fn router(state: AppState, webhook_path: &str) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/status", get(status))
        .route(webhook_path, post(webhook))
        .with_state(state)
        .layer(axum::extract::DefaultBodyLimit::max(MAX_BODY_BYTES))
}

async fn health() -> Json<Value> {
    Json(json!({"status": "ok", "service": "embedder-daemon"}))
}

#[derive(Serialize)]
struct StatusResponse {
    webhook_configured: bool,
    polling_interval_ms: u64,
    stale_threshold_ms: u64,
    pending_jobs: usize,
    processing_jobs: usize,
}

async fn status(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if !authorized(&state, &headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let (jobs, _corrupted) = state.queue.list().await.unwrap_or_default();
    let pending_jobs = jobs.iter().filter(|j| j.status == axon_queue::JobStatus::Pending).count();
    let processing_jobs = jobs
        .iter()
        .filter(|j| j.status == axon_queue::JobStatus::Processing)
        .count();

    Json(StatusResponse {
        webhook_configured: state.webhook_configured,
        polling_interval_ms: state.polling_interval_ms,
        stale_threshold_ms: state.stale_threshold_ms,
        pending_jobs,
        processing_jobs,
    })
    .into_response()
}

async fn webhook(State(state): State<AppState>, headers: HeaderMap, body: axum::body::Bytes) -> Response {
    if !authorized(&state, &headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let payload = match serde_json::from_slice::<Value>(&body) {
        Ok(payload) => payload,
        Err(e) => {
            let message = sanitize_error(e, "webhook_body_parse");
            return (StatusCode::BAD_REQUEST, Json(json!({"error": message}))).into_response();
        }
    };

    let Some(parsed) = parse_webhook_payload(&payload) else {
        tracing::warn!("webhook payload missing a job id, dropping");
        return StatusCode::ACCEPTED.into_response();
    };

    tokio::spawn(async move {
        match parsed.status {
            ReportedStatus::Failed | ReportedStatus::Cancelled => {
                let reason = format!("Crawl {:?}", parsed.status);
                let _ = state.queue.mark_permanent_failed(&parsed.job_id, reason).await;
            }
            ReportedStatus::Completed => {
                process_job(&state, &parsed.job_id, parsed.pages).await;
            }
            ReportedStatus::Other => {
                // Intermediate progress event; nothing actionable yet.
            }
        }
    });

    StatusCode::ACCEPTED.into_response()
}

fn authorized(state: &AppState, headers: &HeaderMap) -> bool {
    headers
        .get(SECRET_HEADER)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|provided| constant_time_eq(provided.as_bytes(), state.webhook_secret.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axon_embeddings::MockEmbeddingProvider;
    use axon_pipeline::EmbedPipeline;
    use axon_queue::QueueStore;
    use axon_scrape::MockScrapeClient;
    use axon_vector_store::MockVectorStore;
    use axum::body::Body;
    use axum::http::Request;
    use std::sync::Arc;
    use std::time::SystemTime;
    use tower::ServiceExt;

    async fn test_state() -> (AppState, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let queue = Arc::new(QueueStore::new(dir.path(), 3).unwrap());
        let pipeline = Arc::new(EmbedPipeline::new(
            Arc::new(MockEmbeddingProvider::new(4)),
            Arc::new(MockVectorStore::new()),
            "pages",
        ));
        let state = AppState {
            queue,
            pipeline,
            scrape: Arc::new(MockScrapeClient::new()),
            webhook_secret: "test-secret".to_string(),
            webhook_configured: true,
            polling_interval_ms: 60_000,
            stale_threshold_ms: 600_000,
            stuck_threshold_ms: 300_000,
            started_at: SystemTime::now(),
        };
        (state, dir)
    }

    #[tokio::test]
    async fn health_is_unauthenticated() {
        let (state, _dir) = test_state().await;
        let app = router(state, "/webhooks/crawl");

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn status_requires_secret() {
        let (state, _dir) = test_state().await;
        let app = router(state, "/webhooks/crawl");

        let response = app
            .oneshot(Request::builder().uri("/status").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn status_with_correct_secret_succeeds() {
        let (state, _dir) = test_state().await;
        let app = router(state, "/webhooks/crawl");

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/status")
                    .header("x-axon-embedder-secret", "test-secret")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn webhook_with_malformed_body_returns_sanitized_error() {
        let (state, _dir) = test_state().await;
        let app = router(state, "/webhooks/crawl");

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/webhooks/crawl")
                    .header("x-axon-embedder-secret", "test-secret")
                    .header("content-type", "application/json")
                    .body(Body::from("{ not json"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&body).unwrap();
        let message = body["error"].as_str().unwrap();
        assert!(message.starts_with("Operation failed (ref: "));
    }

    #[tokio::test]
    async fn webhook_without_job_id_is_still_accepted() {
        let (state, _dir) = test_state().await;
        let app = router(state, "/webhooks/crawl");

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/webhooks/crawl")
                    .header("x-axon-embedder-secret", "test-secret")
                    .header("content-type", "application/json")
                    .body(Body::from("{}"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }
}
