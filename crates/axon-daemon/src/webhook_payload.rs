//! Tolerant parsing of the scraping API's webhook payload shapes.

use axon_config::validation::validate_identifier;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportedStatus {
    Completed,
    Failed,
    Cancelled,
    Other,
}

#[derive(Debug, Clone)]
pub struct WebhookPayload {
    pub job_id: String,
    pub status: ReportedStatus,
    pub pages: Option<Vec<Value>>,
}

/// Extract `{jobId, status, pages}` from a loosely-shaped webhook body.
/// `jobId` may be top-level or nested under `data`/`crawl`; `status` may be
/// explicit or inferred from an `event`/`type` field; `pages` is the first
/// array found at `data`, `data.data`, or `crawl.data`. Returns `None` when
/// no job id can be found anywhere, or when the only candidate found does not
/// match the job id schema (`^[A-Za-z0-9_-]{1,128}$`) — this is the only
/// value from the payload that ever becomes part of a filesystem path, so it
/// is rejected here rather than deeper in the queue.
pub fn parse_webhook_payload(body: &Value) -> Option<WebhookPayload> {
    let job_id = find_job_id(body)?;
    let status = find_status(body);
    let pages = find_pages(body);

    Some(WebhookPayload {
        job_id,
        status,
        pages,
    })
}

fn find_job_id(body: &Value) -> Option<String> {
    for candidate in [
        body.get("jobId"),
        body.get("data").and_then(|d| d.get("jobId")),
        body.get("crawl").and_then(|c| c.get("jobId")),
        body.get("id"),
        body.get("data").and_then(|d| d.get("id")),
        body.get("crawl").and_then(|c| c.get("id")),
    ] {
        if let Some(id) = candidate.and_then(Value::as_str)
            && validate_identifier(id, "jobId").is_ok()
        {
            return Some(id.to_string());
        }
    }
    None
}

fn find_status(body: &Value) -> ReportedStatus {
    let explicit = body
        .get("status")
        .and_then(Value::as_str)
        .or_else(|| body.get("data").and_then(|d| d.get("status")).and_then(Value::as_str));

    if let Some(status) = explicit {
        return classify(status);
    }

    let inferred = body
        .get("event")
        .and_then(Value::as_str)
        .or_else(|| body.get("type").and_then(Value::as_str));

    inferred.map_or(ReportedStatus::Other, classify)
}

fn classify(text: &str) -> ReportedStatus {
    let lower = text.to_lowercase();
    if lower.contains("complet") {
        ReportedStatus::Completed
    } else if lower.contains("fail") || lower.contains("error") {
        ReportedStatus::Failed
    } else if lower.contains("cancel") {
        ReportedStatus::Cancelled
    } else {
        ReportedStatus::Other
    }
}

fn find_pages(body: &Value) -> Option<Vec<Value>> {
    for candidate in [
        body.get("data").and_then(Value::as_array),
        body.get("data").and_then(|d| d.get("data")).and_then(Value::as_array),
        body.get("crawl").and_then(|c| c.get("data")).and_then(Value::as_array),
    ] {
        if let Some(pages) = candidate {
            return Some(pages.clone());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reads_top_level_job_id_and_status() {
        let payload = parse_webhook_payload(&json!({"jobId": "j1", "status": "completed"})).unwrap();
        assert_eq!(payload.job_id, "j1");
        assert_eq!(payload.status, ReportedStatus::Completed);
    }

    #[test]
    fn reads_nested_job_id_under_data() {
        let payload = parse_webhook_payload(&json!({"data": {"jobId": "j2"}, "event": "crawl.page"})).unwrap();
        assert_eq!(payload.job_id, "j2");
        assert_eq!(payload.status, ReportedStatus::Other);
    }

    #[test]
    fn infers_status_from_event_substring() {
        let payload = parse_webhook_payload(&json!({"jobId": "j3", "event": "crawl.failed"})).unwrap();
        assert_eq!(payload.status, ReportedStatus::Failed);
    }

    #[test]
    fn extracts_pages_from_nested_data_data() {
        let payload = parse_webhook_payload(&json!({
            "jobId": "j4",
            "status": "completed",
            "data": {"data": [{"markdown": "hi"}]}
        }))
        .unwrap();
        assert_eq!(payload.pages.unwrap().len(), 1);
    }

    #[test]
    fn missing_job_id_yields_none() {
        assert!(parse_webhook_payload(&json!({"status": "completed"})).is_none());
    }

    #[test]
    fn path_traversal_job_id_is_rejected() {
        assert!(parse_webhook_payload(&json!({"jobId": "../../etc/passwd", "status": "completed"})).is_none());
    }
}
