//! Splits scraped page content into ordered, header-tagged chunks for embedding.

pub mod chunker;
pub mod error;

pub use chunker::{Chunk, ContentType, chunk};
pub use error::{ChunkingError, ChunkingResult};
