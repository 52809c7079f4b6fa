//! Configuration for the pipeline cache.

use std::time::Duration;

/// Configuration for the pipeline cache.
#[derive(Debug, Clone)]
pub struct PipelineCacheConfig {
    /// Time between two polls of the pipeline store.
    pub poll_interval: Duration,
    /// How long the first event may wait for the initial snapshot.
    pub startup_wait: Duration,
    /// Keep author-supplied trigger ids instead of recomputing them.
    pub preserve_authored_trigger_ids: bool,
}

impl Default for PipelineCacheConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(10),
            startup_wait: Duration::from_secs(30),
            preserve_authored_trigger_ids: false,
        }
    }
}

impl PipelineCacheConfig {
    /// Set the poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the startup wait.
    pub fn with_startup_wait(mut self, wait: Duration) -> Self {
        self.startup_wait = wait;
        self
    }

    pub fn with_preserve_authored_trigger_ids(mut self, preserve: bool) -> Self {
        self.preserve_authored_trigger_ids = preserve;
        self
    }
}
