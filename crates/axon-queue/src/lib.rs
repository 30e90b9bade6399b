//! Durable, file-backed job queue for the embed pipeline's crawl-to-embed jobs.

pub mod error;
pub mod lock;
pub mod models;
pub mod store;

pub use error::{QueueError, QueueResult};
pub use models::{EmbedJob, JobLookup, JobProgress, JobStatus};
pub use store::QueueStore;
