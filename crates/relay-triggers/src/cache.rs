//! Periodically refreshed pipeline configuration.
//!
//! The cache owns one immutable [`PipelineSnapshot`] at a time, published
//! through a `watch` channel. A poll that fails leaves the previous snapshot
//! in place, so readers always see the last good configuration.

use crate::activation::Activation;
use crate::config::PipelineCacheConfig;
use chrono::{DateTime, Utc};
use relay_core::ports::PipelineStore;
use relay_core::{Error, MetricsRegistry, Pipeline, Result};
use std::sync::{Arc, Mutex, Weak};
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, error, info, trace, warn};

/// Pipelines as of one successful poll.
#[derive(Debug)]
pub struct PipelineSnapshot {
    pipelines: Vec<Arc<Pipeline>>,
    fetched_at: DateTime<Utc>,
}

impl PipelineSnapshot {
    pub fn new(pipelines: Vec<Arc<Pipeline>>) -> Self {
        Self {
            pipelines,
            fetched_at: Utc::now(),
        }
    }

    pub fn pipelines(&self) -> &[Arc<Pipeline>] {
        &self.pipelines
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    pub fn len(&self) -> usize {
        self.pipelines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pipelines.is_empty()
    }
}

/// Attach each trigger to its owning pipeline and assign it an id.
///
/// The fallback id replaces whatever id the trigger carried, unless
/// `preserve_ids` is set and the trigger has a non-empty authored id.
pub fn decorate_triggers(pipelines: Vec<Pipeline>, preserve_ids: bool) -> Vec<Arc<Pipeline>> {
    pipelines
        .into_iter()
        .map(|pipeline| {
            Arc::new_cyclic(|parent: &Weak<Pipeline>| {
                let triggers = pipeline
                    .triggers
                    .iter()
                    .map(|trigger| {
                        let id = match &trigger.id {
                            Some(id) if preserve_ids && !id.is_empty() => id.clone(),
                            _ => trigger.fallback_id_for(Some(&pipeline)),
                        };
                        trigger.with_parent(parent.clone()).with_id(id)
                    })
                    .collect();
                Pipeline {
                    triggers,
                    ..pipeline
                }
            })
        })
        .collect()
}

struct PollerHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

pub struct PipelineCache {
    store: Arc<dyn PipelineStore>,
    config: PipelineCacheConfig,
    activation: Activation,
    metrics: Arc<MetricsRegistry>,
    snapshot: watch::Sender<Option<Arc<PipelineSnapshot>>>,
    poller: Mutex<Option<PollerHandle>>,
}

impl PipelineCache {
    pub fn new(
        store: Arc<dyn PipelineStore>,
        config: PipelineCacheConfig,
        activation: Activation,
        metrics: Arc<MetricsRegistry>,
    ) -> Arc<Self> {
        let (snapshot, _) = watch::channel(None);
        Arc::new(Self {
            store,
            config,
            activation,
            metrics,
            snapshot,
            poller: Mutex::new(None),
        })
    }

    /// Start polling. The first poll fires immediately. No-op if already running.
    pub fn start(self: &Arc<Self>) {
        let mut poller = match self.poller.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if poller.is_some() {
            return;
        }

        let (shutdown_tx, mut shutdown) = watch::channel(false);
        let cache = Arc::clone(self);
        let poll_interval = self.config.poll_interval;

        let task = tokio::spawn(async move {
            let mut ticker = interval(poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            info!(
                interval_ms = poll_interval.as_millis() as u64,
                "Starting pipeline cache poller"
            );

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        cache.poll().await;
                    }
                    _ = shutdown.changed() => {
                        if *shutdown.borrow() {
                            info!("Pipeline cache poller shutting down");
                            break;
                        }
                    }
                }
            }
        });

        *poller = Some(PollerHandle {
            shutdown: shutdown_tx,
            task,
        });
    }

    /// Stop polling. The current snapshot stays readable. No-op if not running.
    pub async fn stop(&self) {
        let handle = match self.poller.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(handle) = handle {
            let _ = handle.shutdown.send(true);
            if let Err(e) = handle.task.await {
                warn!(error = %e, "Pipeline cache poller did not stop cleanly");
            }
        }
    }

    pub fn is_running(&self) -> bool {
        match self.poller.lock() {
            Ok(guard) => guard.is_some(),
            Err(poisoned) => poisoned.into_inner().is_some(),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        self.config.poll_interval
    }

    pub fn startup_wait(&self) -> Duration {
        self.config.startup_wait
    }

    /// Time of the last successful poll.
    pub fn last_poll(&self) -> Option<DateTime<Utc>> {
        self.current_snapshot().map(|s| s.fetched_at())
    }

    /// Fetch pipelines once and publish a new snapshot on success.
    pub async fn poll(&self) {
        if !self.activation.is_active() {
            trace!("Activation stopped, skipping pipeline poll");
            return;
        }

        debug!("Fetching pipelines from store");
        let start = Instant::now();

        match self.store.list_pipelines().await {
            Ok(pipelines) => {
                let decorated =
                    decorate_triggers(pipelines, self.config.preserve_authored_trigger_ids);
                let snapshot = Arc::new(PipelineSnapshot::new(decorated));
                let count = snapshot.len();

                self.snapshot.send_replace(Some(snapshot));
                self.metrics.counter("pipeline_store.requests", &[]).increment();
                self.metrics.gauge("pipelines.cached", &[]).set(count as u64);

                debug!(
                    count,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Fetched pipeline configs"
                );
            }
            Err(e) => {
                error!(error = %e, "Error fetching pipelines from store");
                self.metrics.counter("pipeline_store.errors", &[]).increment();
            }
        }
    }

    /// The latest snapshot, or `None` before the first successful poll.
    pub fn current_snapshot(&self) -> Option<Arc<PipelineSnapshot>> {
        self.snapshot.borrow().clone()
    }

    /// Wait for a snapshot to become available, up to `timeout`.
    pub async fn await_snapshot(&self, timeout: Duration) -> Result<Arc<PipelineSnapshot>> {
        if let Some(snapshot) = self.current_snapshot() {
            return Ok(snapshot);
        }

        let start = Instant::now();
        let mut rx = self.snapshot.subscribe();
        let waited = tokio::time::timeout(timeout, async {
            rx.wait_for(Option::is_some)
                .await
                .map(|snapshot| snapshot.clone())
        })
        .await;

        match waited {
            Ok(Ok(Some(snapshot))) => Ok(snapshot),
            Ok(Ok(None)) | Ok(Err(_)) => Err(Error::Internal(
                "pipeline snapshot channel closed".to_string(),
            )),
            Err(_) => Err(Error::Timeout {
                what: "pipeline configs are still not available".to_string(),
                elapsed_ms: start.elapsed().as_millis() as u64,
            }),
        }
    }
}
