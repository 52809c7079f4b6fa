//! Inbound webhook events.

use super::{TriggerMatcher, artifacts_under};
use relay_core::{Artifact, Error, Event, Pipeline, Result, Trigger};
use serde_json::{Map, Value};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct WebhookEvent {
    pub category: String,
    pub source: Option<String>,
    /// The posted body; the event content.
    pub payload: Map<String, Value>,
    pub event_id: Option<String>,
}

/// Webhook matching takes every category not owned by a dedicated matcher.
#[derive(Debug, Default, Clone, Copy)]
pub struct WebhookMatcher;

/// Categories with their own matcher.
const CLAIMED_CATEGORIES: [&str; 4] = ["git", "docker", "pubsub", "manual"];

/// Every constraint key must be present in `payload` with a non-null value.
/// Values are not compared.
fn constraints_present(constraints: &Map<String, Value>, payload: &Map<String, Value>) -> bool {
    constraints.keys().all(|key| match payload.get(key) {
        Some(value) if !value.is_null() => true,
        _ => {
            debug!(key = %key, "Webhook trigger ignored, constraint missing from payload");
            false
        }
    })
}

impl TriggerMatcher for WebhookMatcher {
    type Event = WebhookEvent;

    fn name(&self) -> &'static str {
        "webhook"
    }

    fn applies(&self, category: &str) -> bool {
        !category.is_empty()
            && !CLAIMED_CATEGORIES
                .iter()
                .any(|claimed| category.eq_ignore_ascii_case(claimed))
    }

    fn convert(&self, event: &Event) -> Result<WebhookEvent> {
        let category = event
            .category()
            .ok_or_else(|| Error::conversion("webhook", "event has no type"))?;

        Ok(WebhookEvent {
            category: category.to_string(),
            source: event.source().map(str::to_string),
            payload: event.content.clone(),
            event_id: event.event_id.clone(),
        })
    }

    fn is_well_formed(&self, trigger: &Trigger) -> bool {
        trigger.enabled
            && !trigger.trigger_type.as_str().is_empty()
            && trigger.source.as_deref().is_some_and(|s| !s.is_empty())
    }

    fn matches(&self, event: &WebhookEvent, _pipeline: &Pipeline, trigger: &Trigger) -> Result<bool> {
        Ok(trigger.trigger_type.as_str().eq_ignore_ascii_case(&event.category)
            && trigger.source == event.source
            && trigger
                .payload_constraints
                .as_ref()
                .is_none_or(|constraints| constraints_present(constraints, &event.payload)))
    }

    fn artifacts(&self, event: &WebhookEvent) -> Vec<Artifact> {
        artifacts_under(&event.payload, "artifacts")
    }

    fn build(&self, pipeline: &Pipeline, trigger: &Trigger, event: &WebhookEvent) -> Result<Pipeline> {
        let bound = trigger
            .at_payload(Some(event.payload.clone()))
            .at_event_id(event.event_id.clone());

        Ok(pipeline
            .with_trigger(bound)
            .with_received_artifacts(self.artifacts(event)))
    }

    fn additional_tags(&self, pipeline: &Pipeline) -> Vec<(String, String)> {
        let Some(trigger) = &pipeline.trigger else {
            return Vec::new();
        };

        let mut tags = Vec::new();
        if let Some(source) = &trigger.source {
            tags.push(("source".to_string(), source.clone()));
        }
        tags.push(("type".to_string(), trigger.trigger_type.to_string()));
        tags
    }
}
