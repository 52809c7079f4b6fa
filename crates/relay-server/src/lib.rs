//! Relay Server
//!
//! Composition root of the `relayd` daemon: configuration loading, wiring of
//! the pipeline cache, trigger listener and dispatcher, and line-delimited
//! JSON ingestion of events.

pub mod app;
pub mod config;
pub mod ingest;

pub use app::Relay;
pub use config::{ConfigError, RelayConfig};
pub use ingest::{IngestStats, parse_line};
