//! Integration test infrastructure for Relay.
//!
//! Fixtures for pipelines and events, recording collaborators, and a
//! [`TestHarness`] that wires the trigger listener into a dispatcher over an
//! in-memory pipeline store.
//!
//! # Usage
//!
//! ```ignore
//! use relay_tests::{EventFixture, PipelineFixture, TestHarness};
//!
//! #[tokio::test]
//! async fn test_something() {
//!     let harness = TestHarness::new(vec![PipelineFixture::git_deploy()]).await.unwrap();
//!     harness.send(EventFixture::git_push("main", "abc123"));
//!     harness.settle().await;
//! }
//! ```

pub mod context;
pub mod fixtures;
pub mod helpers;

pub use context::TestHarness;
pub use fixtures::*;
pub use helpers::*;

/// Initialize test logging (call once per test binary).
pub fn init_test_logging() {
    use tracing_subscriber::{EnvFilter, fmt};

    let _ = fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn,relay_triggers=debug,relay_bus=debug")),
        )
        .with_test_writer()
        .try_init();
}
