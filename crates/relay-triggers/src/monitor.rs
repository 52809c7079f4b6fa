//! Runs one matcher against incoming events.
//!
//! A [`TriggerMonitor`] pairs a [`TriggerMatcher`] with the pipeline cache and
//! the initiator. Failures are contained: a bad conversion skips the matcher,
//! a bad pipeline is skipped by the matching algorithm, and a failed start
//! does not stop the remaining matches from being started.

use crate::cache::{PipelineCache, PipelineSnapshot};
use crate::matchers::TriggerMatcher;
use async_trait::async_trait;
use relay_core::ports::PipelineInitiator;
use relay_core::{Error, Event, MetricsRegistry, Pipeline, RequestContext, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, error, info, warn};

/// Lets exactly one caller wait for the initial pipeline snapshot. Everyone
/// else reads whatever is available.
#[derive(Debug, Default)]
pub struct StartupGate {
    claimed: AtomicBool,
}

impl StartupGate {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// `true` for the first caller only.
    pub fn try_claim(&self) -> bool {
        !self.claimed.swap(true, Ordering::SeqCst)
    }
}

/// Category of `event`. Events without details or a type are rejected.
pub fn validate_event(event: &Event) -> Result<&str> {
    let details = event
        .details
        .as_ref()
        .ok_or_else(|| Error::InvalidEvent("event details are required".to_string()))?;
    details
        .event_type
        .as_deref()
        .ok_or_else(|| Error::InvalidEvent("event details type is required".to_string()))
}

/// Type-erased monitor, so monitors over different matchers can share a list.
#[async_trait]
pub trait EventMonitor: Send + Sync {
    fn name(&self) -> &'static str;

    async fn handle(&self, event: &Event, ctx: &RequestContext) -> Result<()>;
}

pub struct TriggerMonitor<M: TriggerMatcher> {
    matcher: M,
    cache: Arc<PipelineCache>,
    initiator: Arc<dyn PipelineInitiator>,
    metrics: Arc<MetricsRegistry>,
    gate: Arc<StartupGate>,
}

impl<M: TriggerMatcher> TriggerMonitor<M> {
    pub fn new(
        matcher: M,
        cache: Arc<PipelineCache>,
        initiator: Arc<dyn PipelineInitiator>,
        metrics: Arc<MetricsRegistry>,
        gate: Arc<StartupGate>,
    ) -> Self {
        Self {
            matcher,
            cache,
            initiator,
            metrics,
            gate,
        }
    }

    pub fn matcher(&self) -> &M {
        &self.matcher
    }

    async fn snapshot(&self) -> Option<Arc<PipelineSnapshot>> {
        let first = self.gate.try_claim();
        if let Some(snapshot) = self.cache.current_snapshot() {
            return Some(snapshot);
        }
        if !first {
            return None;
        }

        debug!(matcher = self.matcher.name(), "Waiting for initial pipeline configs");
        match self.cache.await_snapshot(self.cache.startup_wait()).await {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                warn!(error = %e, "Initial pipeline configs did not arrive");
                None
            }
        }
    }

    async fn start(&self, pipeline: &Pipeline, ctx: &RequestContext) {
        info!(
            matcher = self.matcher.name(),
            application = %pipeline.application,
            name = %pipeline.name,
            request_id = %ctx.request_id,
            "Found matching pipeline"
        );

        let extra = self.matcher.additional_tags(pipeline);
        let mut tags: Vec<(&str, &str)> = vec![
            ("monitor", self.matcher.name()),
            ("application", pipeline.application.as_str()),
            ("name", pipeline.name.as_str()),
        ];
        tags.extend(extra.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        self.metrics.counter("pipelines.triggered", &tags).increment();

        if let Err(e) = self.initiator.start(pipeline, ctx).await {
            error!(
                application = %pipeline.application,
                name = %pipeline.name,
                error = %e,
                "Failed to start pipeline"
            );
            self.metrics
                .counter(
                    "pipelines.initiation.errors",
                    &[("monitor", self.matcher.name()), ("application", pipeline.application.as_str())],
                )
                .increment();

            if let Err(e) = self.initiator.record_failure(pipeline).await {
                warn!(error = %e, pipeline = %pipeline, "Failed to record initiation failure");
            }
        }
    }
}

#[async_trait]
impl<M> EventMonitor for TriggerMonitor<M>
where
    M: TriggerMatcher + 'static,
{
    fn name(&self) -> &'static str {
        self.matcher.name()
    }

    async fn handle(&self, event: &Event, ctx: &RequestContext) -> Result<()> {
        let category = validate_event(event)?;
        if !self.matcher.applies(category) {
            return Ok(());
        }

        let typed = match self.matcher.convert(event) {
            Ok(typed) => typed,
            Err(e) => {
                warn!(matcher = self.matcher.name(), error = %e, "Could not convert event");
                return Ok(());
            }
        };

        let Some(snapshot) = self.snapshot().await else {
            warn!(
                matcher = self.matcher.name(),
                "Pipeline configs not available yet, skipping event"
            );
            return Ok(());
        };

        self.metrics
            .counter("events.processed", &[("monitor", self.matcher.name())])
            .increment();

        let matched = self
            .matcher
            .matching_pipelines(&typed, snapshot.pipelines(), &self.metrics);
        debug!(
            matcher = self.matcher.name(),
            candidates = snapshot.len(),
            matched = matched.len(),
            "Matched event against pipelines"
        );

        for pipeline in &matched {
            self.start(pipeline, ctx).await;
        }
        Ok(())
    }
}
