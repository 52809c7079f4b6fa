//! Relay Core
//!
//! Core domain types, ports, and error handling for Relay.
//! This crate has minimal dependencies and defines the shared vocabulary
//! used across all other crates: ingested events, pipeline and trigger
//! value objects, artifacts, and the traits external collaborators implement.

pub mod artifact;
pub mod context;
mod de;
pub mod error;
pub mod event;
pub mod metrics;
pub mod pipeline;
pub mod ports;

pub use artifact::{Artifact, ExpectedArtifact};
pub use context::RequestContext;
pub use error::{Error, Result};
pub use event::{Event, EventDetails};
pub use metrics::{Counter, Gauge, MetricId, MetricSample, MetricsRegistry};
pub use pipeline::{Pipeline, Trigger, TriggerType};
pub use ports::{EventListener, PipelineInitiator, PipelineStore};
