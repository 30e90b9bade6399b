//! Vector storage abstraction over Qdrant for the embedding pipeline.

pub mod client;
pub mod error;
pub mod mock;
pub mod models;
pub mod traits;

pub use client::QdrantVectorStore;
pub use error::{VectorStoreError, VectorStoreResult};
pub use mock::MockVectorStore;
pub use models::{extract_domain, QdrantPoint};
pub use traits::{CollectionInfo, PointFilter, StoredPoint, VectorStore};
