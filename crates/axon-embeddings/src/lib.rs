//! HTTP client for the TEI embedding-inference service.

pub mod client;
pub mod error;
pub mod mock;
pub mod traits;

pub use client::TeiClient;
pub use error::{EmbeddingError, EmbeddingResult};
pub use mock::MockEmbeddingProvider;
pub use traits::{EmbeddingProvider, TeiInfo};
