//! Pub/sub message events.

use super::{TriggerMatcher, content_as, eq_ignore_case};
use crate::artifacts::field_matches;
use relay_core::{Artifact, Event, Pipeline, Result, Trigger, TriggerType};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashMap;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageDescription {
    subscription_name: Option<String>,
    pubsub_system: Option<String>,
    message_payload: Option<String>,
    #[serde(default)]
    message_attributes: HashMap<String, String>,
    #[serde(default)]
    artifacts: Vec<Artifact>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PubsubContent {
    #[serde(default)]
    message_description: MessageDescription,
}

#[derive(Debug, Clone)]
pub struct PubsubEvent {
    pub subscription_name: Option<String>,
    pub pubsub_system: Option<String>,
    pub payload: Map<String, Value>,
    pub attributes: HashMap<String, String>,
    pub artifacts: Vec<Artifact>,
    pub event_id: Option<String>,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct PubsubMatcher;

/// String constraints are patterns; anything else must be equal.
fn constraint_holds(constraint: &Value, actual: Option<&Value>) -> bool {
    match (constraint, actual) {
        (Value::String(pattern), Some(Value::String(value))) => {
            field_matches(Some(pattern), Some(value))
        }
        (_, Some(value)) => constraint == value,
        (_, None) => false,
    }
}

fn payload_satisfies(constraints: &Map<String, Value>, payload: &Map<String, Value>) -> bool {
    constraints
        .iter()
        .all(|(key, constraint)| constraint_holds(constraint, payload.get(key)))
}

fn attributes_satisfy(constraints: &Map<String, Value>, attributes: &HashMap<String, String>) -> bool {
    constraints.iter().all(|(key, constraint)| {
        let actual = attributes.get(key).map(|v| Value::String(v.clone()));
        constraint_holds(constraint, actual.as_ref())
    })
}

impl TriggerMatcher for PubsubMatcher {
    type Event = PubsubEvent;

    fn name(&self) -> &'static str {
        "pubsub"
    }

    fn applies(&self, category: &str) -> bool {
        category.eq_ignore_ascii_case("pubsub")
    }

    fn convert(&self, event: &Event) -> Result<PubsubEvent> {
        let content: PubsubContent = content_as("pubsub", event)?;
        let description = content.message_description;

        // Prefer the structured payload; fall back to the raw message body.
        let payload = event.payload.clone().unwrap_or_else(|| {
            description
                .message_payload
                .as_deref()
                .and_then(|raw| serde_json::from_str::<Map<String, Value>>(raw).ok())
                .unwrap_or_default()
        });

        let mut attributes = event
            .details
            .as_ref()
            .map(|d| d.attributes.clone())
            .unwrap_or_default();
        attributes.extend(description.message_attributes);

        Ok(PubsubEvent {
            subscription_name: description.subscription_name,
            pubsub_system: description.pubsub_system,
            payload,
            attributes,
            artifacts: description.artifacts,
            event_id: event.event_id.clone(),
        })
    }

    fn is_well_formed(&self, trigger: &Trigger) -> bool {
        trigger.enabled
            && trigger.trigger_type == TriggerType::Pubsub
            && trigger.subscription_name.as_deref().is_some_and(|v| !v.is_empty())
            && trigger.pubsub_system.as_deref().is_some_and(|v| !v.is_empty())
    }

    fn matches(&self, event: &PubsubEvent, _pipeline: &Pipeline, trigger: &Trigger) -> Result<bool> {
        Ok(
            eq_ignore_case(trigger.pubsub_system.as_deref(), event.pubsub_system.as_deref())
                && eq_ignore_case(
                    trigger.subscription_name.as_deref(),
                    event.subscription_name.as_deref(),
                )
                && trigger
                    .payload_constraints
                    .as_ref()
                    .is_none_or(|c| payload_satisfies(c, &event.payload))
                && trigger
                    .attribute_constraints
                    .as_ref()
                    .is_none_or(|c| attributes_satisfy(c, &event.attributes)),
        )
    }

    fn artifacts(&self, event: &PubsubEvent) -> Vec<Artifact> {
        event.artifacts.clone()
    }

    fn build(&self, pipeline: &Pipeline, trigger: &Trigger, event: &PubsubEvent) -> Result<Pipeline> {
        let bound = trigger
            .at_message_description(event.subscription_name.clone(), event.pubsub_system.clone())
            .at_payload(Some(event.payload.clone()))
            .at_event_id(event.event_id.clone());

        Ok(pipeline
            .with_trigger(bound)
            .with_received_artifacts(event.artifacts.clone()))
    }

    fn additional_tags(&self, pipeline: &Pipeline) -> Vec<(String, String)> {
        let Some(trigger) = &pipeline.trigger else {
            return Vec::new();
        };

        let mut tags = Vec::new();
        if let Some(subscription) = &trigger.subscription_name {
            tags.push(("subscription".to_string(), subscription.clone()));
        }
        if let Some(system) = &trigger.pubsub_system {
            tags.push(("pubsubSystem".to_string(), system.clone()));
        }
        tags
    }
}
