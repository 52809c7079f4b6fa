//! The trigger engine as a dispatcher listener.

use crate::cache::PipelineCache;
use crate::matchers::{
    DockerMatcher, GitMatcher, ManualMatcher, PubsubMatcher, TriggerMatcher, WebhookMatcher,
};
use crate::monitor::{EventMonitor, StartupGate, TriggerMonitor, validate_event};
use async_trait::async_trait;
use relay_core::ports::{EventListener, PipelineInitiator};
use relay_core::{Event, MetricsRegistry, RequestContext, Result};
use std::sync::Arc;
use tracing::{debug, warn};

/// Runs every registered monitor for each event.
pub struct TriggerEventListener {
    monitors: Vec<Arc<dyn EventMonitor>>,
}

impl TriggerEventListener {
    pub fn new(monitors: Vec<Arc<dyn EventMonitor>>) -> Self {
        Self { monitors }
    }

    /// One monitor per built-in matcher: git, docker, webhook, pubsub, manual.
    pub fn with_default_matchers(
        cache: Arc<PipelineCache>,
        initiator: Arc<dyn PipelineInitiator>,
        metrics: Arc<MetricsRegistry>,
    ) -> Self {
        let gate = StartupGate::new();
        let monitors = vec![
            erase(TriggerMonitor::new(GitMatcher, cache.clone(), initiator.clone(), metrics.clone(), gate.clone())),
            erase(TriggerMonitor::new(DockerMatcher, cache.clone(), initiator.clone(), metrics.clone(), gate.clone())),
            erase(TriggerMonitor::new(WebhookMatcher, cache.clone(), initiator.clone(), metrics.clone(), gate.clone())),
            erase(TriggerMonitor::new(PubsubMatcher, cache.clone(), initiator.clone(), metrics.clone(), gate.clone())),
            erase(TriggerMonitor::new(ManualMatcher, cache, initiator, metrics, gate)),
        ];

        Self::new(monitors)
    }

    pub fn monitor_names(&self) -> Vec<&'static str> {
        self.monitors.iter().map(|m| m.name()).collect()
    }
}

fn erase<M: TriggerMatcher + 'static>(monitor: TriggerMonitor<M>) -> Arc<dyn EventMonitor> {
    Arc::new(monitor)
}

#[async_trait]
impl EventListener for TriggerEventListener {
    fn name(&self) -> &str {
        "triggers"
    }

    async fn process_event(&self, event: &Event, ctx: &RequestContext) -> Result<()> {
        validate_event(event)?;
        debug!(
            category = event.category().unwrap_or_default(),
            source = event.source().unwrap_or_default(),
            request_id = %ctx.request_id,
            "Processing event"
        );

        for monitor in &self.monitors {
            if let Err(e) = monitor.handle(event, ctx).await {
                warn!(monitor = monitor.name(), error = %e, "Monitor failed to handle event");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activation::Activation;
    use crate::config::PipelineCacheConfig;
    use crate::testing::{FixedStore, RecordingInitiator};
    use relay_core::{Error, Pipeline, Trigger, TriggerType};
    use serde_json::{Value, json};

    struct FailingMonitor;

    #[async_trait]
    impl EventMonitor for FailingMonitor {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn handle(&self, _event: &Event, _ctx: &RequestContext) -> Result<()> {
            Err(Error::Internal("monitor exploded".to_string()))
        }
    }

    fn webhook_pipeline() -> Pipeline {
        Pipeline::new("shop", "hooked").with_triggers(vec![Trigger {
            source: Some("ci".to_string()),
            ..Trigger::new(TriggerType::Webhook)
        }])
    }

    fn webhook_event() -> Event {
        let Value::Object(content) = json!({ "build": 7 }) else {
            unreachable!()
        };
        Event::new("webhook", "ci", content)
    }

    async fn cache() -> Arc<PipelineCache> {
        let cache = PipelineCache::new(
            FixedStore::new(vec![webhook_pipeline()]),
            PipelineCacheConfig::default(),
            Activation::active(),
            MetricsRegistry::new(),
        );
        cache.poll().await;
        cache
    }

    #[tokio::test]
    async fn test_default_matchers() {
        let listener = TriggerEventListener::with_default_matchers(
            cache().await,
            RecordingInitiator::new(),
            MetricsRegistry::new(),
        );
        assert_eq!(
            listener.monitor_names(),
            vec!["git", "docker", "webhook", "pubsub", "manual"]
        );
    }

    #[tokio::test]
    async fn test_failing_monitor_does_not_stop_others() {
        let cache = cache().await;
        let initiator = RecordingInitiator::new();
        let metrics = MetricsRegistry::new();
        let webhook: Arc<dyn EventMonitor> = Arc::new(TriggerMonitor::new(
            crate::matchers::WebhookMatcher,
            cache,
            initiator.clone(),
            metrics,
            StartupGate::new(),
        ));
        let failing: Arc<dyn EventMonitor> = Arc::new(FailingMonitor);
        let listener = TriggerEventListener::new(vec![failing, webhook]);

        listener
            .process_event(&webhook_event(), &RequestContext::anonymous())
            .await
            .unwrap();

        assert_eq!(initiator.started_names(), vec!["hooked"]);
    }

    #[tokio::test]
    async fn test_event_without_type_is_rejected() {
        let listener = TriggerEventListener::with_default_matchers(
            cache().await,
            RecordingInitiator::new(),
            MetricsRegistry::new(),
        );

        let err = listener
            .process_event(&Event::default(), &RequestContext::anonymous())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidEvent(_)));
    }
}
