//! Error sanitization utilities for security
//!
//! Webhook responses and status endpoints must never leak internal details
//! (file paths, queue directory layout, upstream error bodies) to callers.
//! These helpers log the real error with a correlation id and hand back a
//! generic message referencing that id.

use tracing::error;

/// Sanitize an error message for external consumption.
///
/// Logs the detailed error internally and returns a generic message.
pub fn sanitize_error<E: std::fmt::Display>(error: E, context: &str) -> String {
    let correlation_id = uuid::Uuid::new_v4();
    error!(
        correlation_id = %correlation_id,
        error = %error,
        context = %context,
        "Internal error occurred"
    );

    format!("Operation failed (ref: {correlation_id})")
}

/// Sanitize an error with a user-friendly message.
pub fn sanitize_with_message<E: std::fmt::Display>(
    error: E,
    context: &str,
    user_message: &str,
) -> String {
    let correlation_id = uuid::Uuid::new_v4();
    error!(
        correlation_id = %correlation_id,
        error = %error,
        context = %context,
        "Internal error occurred"
    );

    format!("{user_message} (ref: {correlation_id})")
}

/// Build a sanitized `Err(String)` from a source error.
#[macro_export]
macro_rules! sanitized_error {
    ($error:expr, $context:expr) => {
        Err($crate::error_sanitizer::sanitize_error($error, $context))
    };
    ($error:expr, $context:expr, $message:expr) => {
        Err($crate::error_sanitizer::sanitize_with_message(
            $error, $context, $message,
        ))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_error() {
        let error = "Qdrant auth failed: api-key=supersecret";
        let result = sanitize_error(error, "qdrant_upsert");
        assert!(result.starts_with("Operation failed (ref: "));
        assert!(!result.contains("supersecret"));
    }

    #[test]
    fn test_sanitize_with_message() {
        let error = "open(/var/axon/queue/job-17.json): permission denied";
        let result = sanitize_with_message(error, "queue_read", "Unable to load job");
        assert!(result.starts_with("Unable to load job (ref: "));
        assert!(!result.contains("/var/axon/queue"));
    }
}
