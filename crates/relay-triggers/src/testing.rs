//! Test doubles shared by the unit tests in this crate.

use async_trait::async_trait;
use relay_core::ports::{PipelineInitiator, PipelineStore};
use relay_core::{Error, Pipeline, RequestContext, Result};
use std::sync::{Arc, Mutex};

pub struct FixedStore {
    pipelines: Vec<Pipeline>,
}

impl FixedStore {
    pub fn new(pipelines: Vec<Pipeline>) -> Arc<Self> {
        Arc::new(Self { pipelines })
    }
}

#[async_trait]
impl PipelineStore for FixedStore {
    async fn list_pipelines(&self) -> Result<Vec<Pipeline>> {
        Ok(self.pipelines.clone())
    }
}

/// Records starts; refuses to start pipelines named in `fail_on`.
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
        self.started.lock().unwrap().clone()
    }

    pub fn started_names(&self) -> Vec<String> {
        self.started().into_iter().map(|(p, _)| p.name).collect()
    }

    pub fn failed_names(&self) -> Vec<String> {
        self.failed.lock().unwrap().iter().map(|p| p.name.clone()).collect()
    }
}

#[async_trait]
impl PipelineInitiator for RecordingInitiator {
    async fn start(&self, pipeline: &Pipeline, ctx: &RequestContext) -> Result<()> {
        if self.fail_on.contains(&pipeline.name) {
            return Err(Error::Initiation {
                pipeline: pipeline.to_string(),
                reason: "refused".to_string(),
            });
        }
        self.started.lock().unwrap().push((pipeline.clone(), ctx.clone()));
        Ok(())
    }

    async fn record_failure(&self, pipeline: &Pipeline) -> Result<()> {
        self.failed.lock().unwrap().push(pipeline.clone());
        Ok(())
    }
}
