//! Logging and distributed tracing setup for Relay.
//!
//! A single entry point, [`init_tracer`], installs the global subscriber: an
//! env-filtered fmt layer and, when configured, an OTLP span exporter.

pub mod tracer;

pub use tracer::{LogFormat, OtlpConfig, TracerError, TracingConfig, init_tracer, shutdown_tracer};
