//! Per-category trigger matchers.
//!
//! A matcher knows how to read one category of [`Event`] and how to decide
//! whether a pipeline trigger fires for it. The default matching algorithm is
//! a provided method on [`TriggerMatcher`]; matchers only supply the
//! category-specific pieces.

mod docker;
mod git;
mod manual;
mod pubsub;
mod webhook;

pub use docker::{DockerEvent, DockerMatcher};
pub use git::{GitEvent, GitMatcher};
pub use manual::{ManualEvent, ManualMatcher};
pub use pubsub::{PubsubEvent, PubsubMatcher};
pub use webhook::{WebhookEvent, WebhookMatcher};

use crate::artifacts::any_artifacts_satisfy;
use relay_core::{Artifact, Event, MetricsRegistry, Pipeline, Result, Trigger};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, error};

pub trait TriggerMatcher: Send + Sync {
    /// Typed view over a generic event.
    type Event: Send + Sync;

    /// Identity used in logs and metric tags.
    fn name(&self) -> &'static str;

    /// Whether this matcher handles events of `category`.
    fn applies(&self, category: &str) -> bool;

    fn convert(&self, event: &Event) -> Result<Self::Event>;

    /// Whether `trigger` carries everything this matcher needs.
    fn is_well_formed(&self, trigger: &Trigger) -> bool;

    /// Unsuccessful events never match anything.
    fn is_successful(&self, _event: &Self::Event) -> bool {
        true
    }

    fn matches(&self, event: &Self::Event, pipeline: &Pipeline, trigger: &Trigger) -> Result<bool>;

    /// Artifacts carried by the event.
    fn artifacts(&self, _event: &Self::Event) -> Vec<Artifact> {
        Vec::new()
    }

    /// Build the matched copy of `pipeline` with the resolved trigger bound.
    fn build(&self, pipeline: &Pipeline, trigger: &Trigger, event: &Self::Event) -> Result<Pipeline>;

    /// Extra metric tags for a matched pipeline.
    fn additional_tags(&self, _pipeline: &Pipeline) -> Vec<(String, String)> {
        Vec::new()
    }

    /// The first trigger of `pipeline` that fires for `event`, built into a
    /// matched pipeline.
    fn match_pipeline(&self, event: &Self::Event, pipeline: &Pipeline) -> Result<Option<Pipeline>> {
        if pipeline.disabled {
            return Ok(None);
        }

        let artifacts = self.artifacts(event);
        for trigger in pipeline
            .triggers
            .iter()
            .filter(|t| t.enabled && self.is_well_formed(t))
        {
            if self.matches(event, pipeline, trigger)?
                && any_artifacts_satisfy(&artifacts, trigger, pipeline)
            {
                return self.build(pipeline, trigger, event).map(Some);
            }
        }
        Ok(None)
    }

    /// Every pipeline `event` starts. A failure while evaluating one pipeline
    /// is logged and counted, and that pipeline is treated as not matching.
    fn matching_pipelines(
        &self,
        event: &Self::Event,
        pipelines: &[Arc<Pipeline>],
        metrics: &MetricsRegistry,
    ) -> Vec<Pipeline> {
        if !self.is_successful(event) {
            debug!(matcher = self.name(), "Event is not successful, nothing to match");
            return Vec::new();
        }

        pipelines
            .iter()
            .filter_map(|pipeline| match self.match_pipeline(event, pipeline) {
                Ok(matched) => matched,
                Err(e) => {
                    error!(
                        matcher = self.name(),
                        pipeline = %pipeline,
                        error = %e,
                        "Error evaluating triggers for pipeline"
                    );
                    metrics
                        .counter("trigger.errors", &[("monitor", self.name()), ("kind", e.kind())])
                        .increment();
                    None
                }
            })
            .collect()
    }
}

/// Deserialize `event.content` into a category-specific shape.
pub(crate) fn content_as<T: DeserializeOwned>(category: &str, event: &Event) -> Result<T> {
    serde_json::from_value(Value::Object(event.content.clone()))
        .map_err(|e| relay_core::Error::conversion(category, e))
}

/// Artifacts listed under `key`, skipping entries that are not artifacts.
pub(crate) fn artifacts_under(map: &Map<String, Value>, key: &str) -> Vec<Artifact> {
    match map.get(key) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| serde_json::from_value(item.clone()).ok())
            .collect(),
        _ => Vec::new(),
    }
}

pub(crate) fn eq_ignore_case(a: Option<&str>, b: Option<&str>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
        _ => false,
    }
}

pub(crate) fn is_blank(value: Option<&str>) -> bool {
    value.is_none_or(|v| v.trim().is_empty())
}
