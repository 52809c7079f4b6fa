//! Container registry push events.

use super::{TriggerMatcher, content_as, is_blank};
use crate::artifacts::full_match;
use relay_core::{Artifact, Event, Pipeline, Result, Trigger, TriggerType};
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DockerEvent {
    #[serde(default)]
    pub account: Option<String>,
    #[serde(default)]
    pub registry: Option<String>,
    #[serde(default)]
    pub repository: Option<String>,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub digest: Option<String>,
    #[serde(skip)]
    pub event_id: Option<String>,
}

impl DockerEvent {
    /// `registry/repository`
    pub fn image_name(&self) -> String {
        format!(
            "{}/{}",
            self.registry.as_deref().unwrap_or_default(),
            self.repository.as_deref().unwrap_or_default()
        )
    }

    /// `registry/repository:tag`
    pub fn image_reference(&self) -> String {
        format!("{}:{}", self.image_name(), self.tag.as_deref().unwrap_or_default())
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DockerMatcher;

impl DockerMatcher {
    /// No pattern accepts anything but `latest`. A pattern must fully match;
    /// one that does not compile matches nothing.
    fn tag_matches(configured: Option<&str>, incoming: &str) -> bool {
        if is_blank(configured) {
            return incoming != "latest";
        }
        let pattern = configured.unwrap_or_default().trim();
        full_match(pattern, incoming).unwrap_or(false)
    }
}

impl TriggerMatcher for DockerMatcher {
    type Event = DockerEvent;

    fn name(&self) -> &'static str {
        "docker"
    }

    fn applies(&self, category: &str) -> bool {
        category.eq_ignore_ascii_case("docker")
    }

    fn convert(&self, event: &Event) -> Result<DockerEvent> {
        let mut docker: DockerEvent = content_as("docker", event)?;
        docker.event_id = event.event_id.clone();
        Ok(docker)
    }

    fn is_well_formed(&self, trigger: &Trigger) -> bool {
        trigger.enabled
            && trigger.trigger_type == TriggerType::Docker
            && trigger.account.as_deref().is_some_and(|v| !v.is_empty())
            && trigger.repository.as_deref().is_some_and(|v| !v.is_empty())
    }

    fn is_successful(&self, event: &DockerEvent) -> bool {
        event.tag.as_deref().is_some_and(|t| !t.is_empty())
    }

    fn matches(&self, event: &DockerEvent, _pipeline: &Pipeline, trigger: &Trigger) -> Result<bool> {
        Ok(trigger.repository == event.repository
            && trigger.account == event.account
            && Self::tag_matches(trigger.tag.as_deref(), event.tag.as_deref().unwrap_or_default()))
    }

    fn artifacts(&self, event: &DockerEvent) -> Vec<Artifact> {
        let mut artifact = Artifact::new("docker/image", event.image_name())
            .with_reference(event.image_reference());
        artifact.version = event.tag.clone();
        vec![artifact]
    }

    fn build(&self, pipeline: &Pipeline, trigger: &Trigger, event: &DockerEvent) -> Result<Pipeline> {
        let bound = trigger
            .at_tag(event.tag.clone())
            .at_event_id(event.event_id.clone());

        Ok(pipeline
            .with_trigger(bound)
            .with_received_artifacts(self.artifacts(event)))
    }

    fn additional_tags(&self, pipeline: &Pipeline) -> Vec<(String, String)> {
        let image = pipeline
            .received_artifacts
            .iter()
            .find(|a| a.artifact_type.as_deref() == Some("docker/image"))
            .and_then(|a| a.reference.clone());

        match image {
            Some(reference) => vec![("imageId".to_string(), reference)],
            None => Vec::new(),
        }
    }
}
