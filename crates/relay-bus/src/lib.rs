//! Relay Bus
//!
//! In-process fan-out of ingested events to every registered listener.

pub mod dispatcher;
pub mod metrics;

pub use dispatcher::EventDispatcher;
pub use metrics::{DispatchMetrics, DispatchMetricsSnapshot};
