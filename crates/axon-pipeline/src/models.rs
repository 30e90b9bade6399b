//! Item and batch shapes accepted by the pipeline.

use serde_json::{Map, Value};

/// Metadata describing one piece of content to embed. `extra` keys are
/// merged into the stored payload but never override the core fields.
#[derive(Debug, Clone, Default)]
pub struct EmbedMetadata {
    pub url: String,
    pub title: Option<String>,
    pub source_command: Option<String>,
    pub content_type: Option<String>,
    pub extra: Map<String, Value>,
}

/// One unit of work for `batch_embed`.
#[derive(Debug, Clone)]
pub struct EmbedItem {
    pub content: String,
    pub metadata: EmbedMetadata,
}

/// Outcome of a `batch_embed` run. `errors` is capped at 10 entries even
/// when more items fail; `failed` still counts the true total.
#[derive(Debug, Clone, Default)]
pub struct BatchResult {
    pub succeeded: usize,
    pub failed: usize,
    pub errors: Vec<String>,
}
