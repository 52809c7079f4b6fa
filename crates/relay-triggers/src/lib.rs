//! Relay Triggers
//!
//! The trigger-matching engine: a periodically refreshed cache of pipeline
//! configuration, one matcher per event category, and the monitors that run
//! a matcher against every cached pipeline and hand matches to the initiator.

pub mod activation;
pub mod artifacts;
pub mod cache;
pub mod config;
pub mod listener;
pub mod matchers;
pub mod monitor;
mod patterns;

#[cfg(test)]
mod testing;

pub use activation::Activation;
pub use cache::{PipelineCache, PipelineSnapshot, decorate_triggers};
pub use config::PipelineCacheConfig;
pub use listener::TriggerEventListener;
pub use matchers::TriggerMatcher;
pub use monitor::{EventMonitor, StartupGate, TriggerMonitor};
