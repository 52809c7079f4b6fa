//! Wiring of the trigger engine.

use crate::config::RelayConfig;
use crate::ingest::{IngestStats, ingest};
use relay_bus::{DispatchMetricsSnapshot, EventDispatcher};
use relay_clients::{HttpPipelineInitiator, HttpPipelineStore};
use relay_core::ports::{PipelineInitiator, PipelineStore};
use relay_core::{Event, MetricSample, MetricsRegistry, RequestContext, Result};
use relay_triggers::{Activation, PipelineCache, TriggerEventListener};
use std::sync::Arc;
use tokio::io::AsyncBufRead;
use tracing::info;

/// A running trigger engine: cache, trigger listener and dispatcher.
pub struct Relay {
    cache: Arc<PipelineCache>,
    dispatcher: EventDispatcher,
    activation: Activation,
    metrics: Arc<MetricsRegistry>,
}

impl Relay {
    /// Wire the engine over the given collaborators. Must be called from
    /// within a Tokio runtime.
    pub fn new(
        config: &RelayConfig,
        store: Arc<dyn PipelineStore>,
        initiator: Arc<dyn PipelineInitiator>,
    ) -> Self {
        let activation = if config.cache.enabled {
            Activation::active()
        } else {
            Activation::stopped()
        };
        let metrics = MetricsRegistry::new();
        let cache = PipelineCache::new(
            store,
            config.cache.to_cache_config(),
            activation.clone(),
            metrics.clone(),
        );

        let listener = TriggerEventListener::with_default_matchers(cache.clone(), initiator, metrics.clone());
        info!(monitors = ?listener.monitor_names(), "Trigger listener ready");

        let mut dispatcher = EventDispatcher::new();
        if let Some(capacity) = config.dispatcher.queue_capacity {
            dispatcher = dispatcher.with_queue_capacity(capacity);
        }
        dispatcher.register_with(Arc::new(listener), config.dispatcher.max_in_flight);

        Self {
            cache,
            dispatcher,
            activation,
            metrics,
        }
    }

    /// Wire the engine against the HTTP store and initiator.
    pub fn from_config(config: &RelayConfig) -> Result<Self> {
        let store = HttpPipelineStore::new(config.store.to_client_config())?;
        let initiator = HttpPipelineInitiator::new(config.initiator.to_client_config())?;
        Ok(Self::new(config, Arc::new(store), Arc::new(initiator)))
    }

    /// Start polling the pipeline store.
    pub fn start(&self) {
        self.cache.start();
        info!(
            poll_interval_ms = self.cache.poll_interval().as_millis() as u64,
            active = self.activation.is_active(),
            "Relay started"
        );
    }

    pub fn dispatch(&self, event: Event, ctx: RequestContext) -> usize {
        self.dispatcher.dispatch(event, ctx)
    }

    pub async fn ingest<R>(&self, reader: R) -> std::io::Result<IngestStats>
    where
        R: AsyncBufRead + Unpin,
    {
        ingest(reader, &self.dispatcher).await
    }

    pub fn cache(&self) -> &Arc<PipelineCache> {
        &self.cache
    }

    pub fn activation(&self) -> &Activation {
        &self.activation
    }

    pub fn metrics(&self) -> Vec<MetricSample> {
        self.metrics.snapshot()
    }

    pub fn dispatch_metrics(&self) -> DispatchMetricsSnapshot {
        self.dispatcher.metrics().snapshot()
    }

    /// Stop polling, then let every queued event finish.
    pub async fn shutdown(&self) {
        self.cache.stop().await;
        self.dispatcher.shutdown().await;

        for sample in self.metrics() {
            info!(metric = %sample.id, value = sample.value, "Final metric");
        }
        info!("Relay shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use relay_core::{Pipeline, Trigger, TriggerType};
    use std::sync::Mutex;
    use std::time::Duration;

    struct OneDockerPipeline;

    #[async_trait]
    impl PipelineStore for OneDockerPipeline {
        async fn list_pipelines(&self) -> Result<Vec<Pipeline>> {
            Ok(vec![Pipeline::new("shop", "deploy").with_triggers(vec![Trigger {
                account: Some("gcr".to_string()),
                repository: Some("shop/checkout".to_string()),
                ..Trigger::new(TriggerType::Docker)
            }])])
        }
    }

    #[derive(Default)]
    struct Started(Mutex<Vec<String>>);

    #[async_trait]
    impl PipelineInitiator for Started {
        async fn start(&self, pipeline: &Pipeline, _ctx: &RequestContext) -> Result<()> {
            self.0.lock().unwrap().push(pipeline.name.clone());
            Ok(())
        }

        async fn record_failure(&self, _pipeline: &Pipeline) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_ingested_event_starts_pipeline() {
        let initiator = Arc::new(Started::default());
        let relay = Relay::new(&RelayConfig::default(), Arc::new(OneDockerPipeline), initiator.clone());
        relay.start();
        relay
            .cache()
            .await_snapshot(Duration::from_secs(1))
            .await
            .unwrap();

        let input = r#"{"details": {"type": "docker", "source": "gcr"}, "content": {"account": "gcr", "repository": "shop/checkout", "tag": "v2"}}"#;
        let stats = relay.ingest(input.as_bytes()).await.unwrap();
        relay.shutdown().await;

        assert_eq!(stats.dispatched, 1);
        assert_eq!(*initiator.0.lock().unwrap(), vec!["deploy"]);
        assert_eq!(relay.dispatch_metrics().deliveries, 1);
        assert!(!relay.cache().is_running());
    }

    #[tokio::test]
    async fn test_disabled_cache_never_polls() {
        let mut config = RelayConfig::default();
        config.cache.enabled = false;
        let relay = Relay::new(&config, Arc::new(OneDockerPipeline), Arc::new(Started::default()));

        relay.cache().poll().await;

        assert!(!relay.activation().is_active());
        assert!(relay.cache().current_snapshot().is_none());
        relay.shutdown().await;
    }

    #[tokio::test]
    async fn test_configured_queue_capacity_reaches_dispatcher() {
        let mut config = RelayConfig::default();
        config.dispatcher.queue_capacity = Some(8);
        let relay = Relay::new(&config, Arc::new(OneDockerPipeline), Arc::new(Started::default()));

        assert_eq!(relay.dispatcher.queue_capacity(), Some(8));
        relay.shutdown().await;

        let unbounded = Relay::new(
            &RelayConfig::default(),
            Arc::new(OneDockerPipeline),
            Arc::new(Started::default()),
        );
        assert_eq!(unbounded.dispatcher.queue_capacity(), None);
        unbounded.shutdown().await;
    }
}
