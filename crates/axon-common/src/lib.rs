//! Common utilities and patterns shared across axon crates
//!
//! Provides the correlation-id type, the shared error-handling traits/macros,
//! and process-wide initialization helpers used by every other crate in the
//! workspace.

pub mod error;
pub mod error_sanitizer;
pub mod init;
pub mod tracing_ext;

pub use error::{CommonError, ErrorContext};
pub use init::initialize_environment;
pub use tracing_ext::CorrelationId;
