//! End-to-end wiring over in-memory collaborators.

use crate::helpers::{RecordingInitiator, StaticPipelineStore};
use relay_bus::EventDispatcher;
use relay_core::ports::EventListener;
use relay_core::{Event, MetricsRegistry, Pipeline, RequestContext};
use relay_triggers::{Activation, PipelineCache, PipelineCacheConfig, TriggerEventListener};
use std::sync::Arc;
use std::time::Duration;

/// Trigger listener registered on a dispatcher, reading pipelines from a
/// [`StaticPipelineStore`] and starting them on a [`RecordingInitiator`].
pub struct TestHarness {
    pub store: Arc<StaticPipelineStore>,
    pub initiator: Arc<RecordingInitiator>,
    pub cache: Arc<PipelineCache>,
    pub metrics: Arc<MetricsRegistry>,
    pub dispatcher: EventDispatcher,
}

impl TestHarness {
    /// Build the harness and load `pipelines` into the cache.
    pub async fn new(pipelines: Vec<Pipeline>) -> anyhow::Result<Self> {
        Self::with_initiator(pipelines, RecordingInitiator::new()).await
    }

    pub async fn with_initiator(
        pipelines: Vec<Pipeline>,
        initiator: Arc<RecordingInitiator>,
    ) -> anyhow::Result<Self> {
        crate::init_test_logging();

        let store = StaticPipelineStore::new(pipelines);
        let metrics = MetricsRegistry::new();
        let cache = PipelineCache::new(
            store.clone(),
            PipelineCacheConfig::default().with_startup_wait(Duration::from_millis(200)),
            Activation::active(),
            metrics.clone(),
        );
        cache.poll().await;
        cache.await_snapshot(Duration::from_secs(1)).await?;

        let listener =
            TriggerEventListener::with_default_matchers(cache.clone(), initiator.clone(), metrics.clone());
        let dispatcher = EventDispatcher::new();
        dispatcher.register(Arc::new(listener));

        Ok(Self {
            store,
            initiator,
            cache,
            metrics,
            dispatcher,
        })
    }

    /// Register an additional listener alongside the trigger listener.
    pub fn add_listener(&self, listener: Arc<dyn EventListener>) {
        self.dispatcher.register(listener);
    }

    pub fn send(&self, event: Event) -> usize {
        self.dispatcher.dispatch(event, RequestContext::anonymous())
    }

    pub fn send_as(&self, event: Event, ctx: RequestContext) -> usize {
        self.dispatcher.dispatch(event, ctx)
    }

    /// Wait until every dispatched event has been processed. The harness
    /// accepts no further events afterwards.
    pub async fn settle(&self) {
        self.dispatcher.shutdown().await;
    }
}
