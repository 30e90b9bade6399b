//! Background daemon that turns completed scraping-API crawls into embedded,
//! searchable vectors: a durable job queue, a webhook HTTP ingress, and a
//! periodic sweeper.

pub mod auth;
pub mod bootstrap;
pub mod error;
pub mod processing;
pub mod routes;
pub mod state;
pub mod sweeper;
pub mod webhook_payload;

pub use error::{DaemonError, DaemonResult};
pub use state::AppState;
