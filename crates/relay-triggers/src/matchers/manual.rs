//! User-initiated pipeline starts. The trigger travels inside the event.

use super::{TriggerMatcher, content_as};
use relay_core::{Event, Pipeline, Result, Trigger};
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualEvent {
    pub application: String,
    pub pipeline_name_or_id: String,
    #[serde(default)]
    pub trigger: Trigger,
    #[serde(skip)]
    pub event_id: Option<String>,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ManualMatcher;

impl TriggerMatcher for ManualMatcher {
    type Event = ManualEvent;

    fn name(&self) -> &'static str {
        "manual"
    }

    fn applies(&self, category: &str) -> bool {
        category.eq_ignore_ascii_case("manual")
    }

    fn convert(&self, event: &Event) -> Result<ManualEvent> {
        let mut manual: ManualEvent = content_as("manual", event)?;
        manual.event_id = event.event_id.clone();
        Ok(manual)
    }

    fn is_well_formed(&self, _trigger: &Trigger) -> bool {
        true
    }

    fn matches(&self, event: &ManualEvent, pipeline: &Pipeline, _trigger: &Trigger) -> Result<bool> {
        Ok(pipeline.application == event.application && pipeline.is_named(&event.pipeline_name_or_id))
    }

    /// Notifications of the pipeline and the trigger are merged, and the
    /// caller's identity is propagated to the execution.
    fn build(&self, pipeline: &Pipeline, trigger: &Trigger, event: &ManualEvent) -> Result<Pipeline> {
        let mut notifications = pipeline.notifications.clone();
        notifications.extend(trigger.notifications.iter().flatten().cloned());

        let mut bound = trigger.at_propagate_auth(true);
        if bound.event_id.is_none() {
            bound = bound.at_event_id(event.event_id.clone());
        }

        Ok(pipeline.with_trigger(bound).with_notifications(notifications))
    }

    /// Only the embedded trigger is considered; the pipeline's own triggers
    /// and the artifact constraints do not apply.
    fn match_pipeline(&self, event: &ManualEvent, pipeline: &Pipeline) -> Result<Option<Pipeline>> {
        if pipeline.disabled || !self.matches(event, pipeline, &event.trigger)? {
            return Ok(None);
        }
        self.build(pipeline, &event.trigger, event).map(Some)
    }
}
