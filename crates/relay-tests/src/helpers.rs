//! Recording collaborators and async helpers.

use async_trait::async_trait;
use relay_core::ports::{EventListener, PipelineInitiator, PipelineStore};
use relay_core::{Error, Event, Pipeline, RequestContext, Result};
use std::sync::{Arc, Mutex, MutexGuard};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// In-memory pipeline store whose contents and health can be changed
/// between polls.
#[derive(Default)]
pub struct StaticPipelineStore {
    pipelines: Mutex<Vec<Pipeline>>,
    failing: Mutex<bool>,
    requests: Mutex<u64>,
}

impl StaticPipelineStore {
    pub fn new(pipelines: Vec<Pipeline>) -> Arc<Self> {
        Arc::new(Self {
            pipelines: Mutex::new(pipelines),
            ..Default::default()
        })
    }

    pub fn set_pipelines(&self, pipelines: Vec<Pipeline>) {
        *lock(&self.pipelines) = pipelines;
    }

    /// Make subsequent polls fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        *lock(&self.failing) = failing;
    }

    pub fn requests(&self) -> u64 {
        *lock(&self.requests)
    }
}

#[async_trait]
impl PipelineStore for StaticPipelineStore {
    async fn list_pipelines(&self) -> Result<Vec<Pipeline>> {
        *lock(&self.requests) += 1;
        if *lock(&self.failing) {
            return Err(Error::Store("store unavailable".to_string()));
        }
        Ok(lock(&self.pipelines).clone())
    }
}

/// Records every start and failure report. Refuses pipelines named in
/// `failing_on`.
#[derive(Default)]
pub struct RecordingInitiator {
    fail_on: Vec<String>,
    started: Mutex<Vec<(Pipeline, RequestContext)>>,
    failed: Mutex<Vec<Pipeline>>,
}

impl RecordingInitiator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing_on(names: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            fail_on: names.iter().map(|n| n.to_string()).collect(),
            ..Default::default()
        })
    }

    pub fn started(&self) -> Vec<(Pipeline, RequestContext)> {
        lock(&self.started).clone()
    }

    pub fn started_names(&self) -> Vec<String> {
        self.started().into_iter().map(|(p, _)| p.name).collect()
    }

    pub fn failed_names(&self) -> Vec<String> {
        lock(&self.failed).iter().map(|p| p.name.clone()).collect()
    }
}

#[async_trait]
impl PipelineInitiator for RecordingInitiator {
    async fn start(&self, pipeline: &Pipeline, ctx: &RequestContext) -> Result<()> {
        if self.fail_on.contains(&pipeline.name) {
            return Err(Error::Initiation {
                pipeline: pipeline.to_string(),
                reason: "refused by test initiator".to_string(),
            });
        }
        lock(&self.started).push((pipeline.clone(), ctx.clone()));
        Ok(())
    }

    async fn record_failure(&self, pipeline: &Pipeline) -> Result<()> {
        lock(&self.failed).push(pipeline.clone());
        Ok(())
    }
}

/// Listener that records what it receives.
#[derive(Default)]
pub struct RecordingListener {
    seen: Mutex<Vec<(Event, RequestContext)>>,
}

impl RecordingListener {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn seen(&self) -> Vec<(Event, RequestContext)> {
        lock(&self.seen).clone()
    }
}

#[async_trait]
impl EventListener for RecordingListener {
    fn name(&self) -> &str {
        "recording"
    }

    async fn process_event(&self, event: &Event, ctx: &RequestContext) -> Result<()> {
        lock(&self.seen).push((event.clone(), ctx.clone()));
        Ok(())
    }
}

/// How a [`MisbehavingListener`] misbehaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Misbehavior {
    Fail,
    Panic,
}

pub struct MisbehavingListener(pub Misbehavior);

#[async_trait]
impl EventListener for MisbehavingListener {
    fn name(&self) -> &str {
        match self.0 {
            Misbehavior::Fail => "failing",
            Misbehavior::Panic => "panicking",
        }
    }

    async fn process_event(&self, _event: &Event, _ctx: &RequestContext) -> Result<()> {
        match self.0 {
            Misbehavior::Fail => Err(Error::Listener("listener refused the event".to_string())),
            Misbehavior::Panic => panic!("listener panicked on purpose"),
        }
    }
}

/// Wait for a condition with timeout.
pub async fn wait_for<F, Fut>(
    timeout: std::time::Duration,
    interval: std::time::Duration,
    mut condition: F,
) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let start = std::time::Instant::now();
    while start.elapsed() < timeout {
        if condition().await {
            return true;
        }
        tokio::time::sleep(interval).await;
    }
    false
}

/// Assert that a future completes within a timeout.
pub async fn assert_completes_within<F, T>(future: F, timeout: std::time::Duration) -> T
where
    F: std::future::Future<Output = T>,
{
    match tokio::time::timeout(timeout, future).await {
        Ok(value) => value,
        Err(_) => panic!("Operation timed out after {timeout:?}"),
    }
}
