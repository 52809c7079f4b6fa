//! Relay Clients
//!
//! HTTP adapters for the two services the trigger engine talks to: the
//! pipeline configuration store and the pipeline initiation service.

pub mod config;
pub mod initiator;
pub mod store;

pub use config::HttpClientConfig;
pub use initiator::HttpPipelineInitiator;
pub use store::HttpPipelineStore;
