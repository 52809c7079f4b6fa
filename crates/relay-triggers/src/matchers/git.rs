//! Source-control push events.

use super::{TriggerMatcher, artifacts_under, content_as, eq_ignore_case};
use crate::artifacts::full_match;
use hmac::{Hmac, Mac};
use relay_core::{Artifact, Error, Event, Pipeline, Result, Trigger, TriggerType};
use serde::Deserialize;
use serde_json::{Map, Value};
use sha1::Sha1;
use tracing::{debug, warn};

const SIGNATURE_HEADER: &str = "X-Hub-Signature";

type HmacSha1 = Hmac<Sha1>;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GitContent {
    repo_project: Option<String>,
    slug: Option<String>,
    branch: Option<String>,
    hash: Option<String>,
    action: Option<String>,
    #[serde(flatten)]
    rest: Map<String, Value>,
}

#[derive(Debug, Clone)]
pub struct GitEvent {
    pub source: Option<String>,
    pub project: Option<String>,
    pub slug: Option<String>,
    pub branch: Option<String>,
    pub hash: Option<String>,
    pub action: Option<String>,
    pub artifacts: Vec<Artifact>,
    pub raw_content: Option<String>,
    pub has_signature: bool,
    pub signature: Option<String>,
    pub event_id: Option<String>,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct GitMatcher;

impl GitMatcher {
    /// Signature check. A trigger with a secret requires a valid signature;
    /// a trigger without one rejects signed events.
    fn passes_signature_check(&self, event: &GitEvent, trigger: &Trigger) -> bool {
        let secret = trigger.secret.as_deref().filter(|s| !s.is_empty());

        match (secret, event.has_signature) {
            (None, false) => true,
            (Some(_), false) => {
                warn!("Received git event without a signature for a trigger configured with a secret");
                false
            }
            (None, true) => {
                warn!("Received signed git event for a trigger without a secret");
                false
            }
            (Some(secret), true) => self.has_valid_signature(event, secret),
        }
    }

    fn has_valid_signature(&self, event: &GitEvent, secret: &str) -> bool {
        let header = event.signature.as_deref().unwrap_or_default();
        let signature = header.strip_prefix("sha1=").unwrap_or(header);
        let raw = event.raw_content.as_deref().unwrap_or_default();

        let Some(computed) = hmac_sha1_hex(secret, raw) else {
            return false;
        };

        let valid = signature.eq_ignore_ascii_case(&computed);
        if !valid {
            warn!(
                project = event.project.as_deref().unwrap_or_default(),
                slug = event.slug.as_deref().unwrap_or_default(),
                "Git signature mismatch, pipeline not triggered"
            );
        }
        valid
    }
}

/// Hex-encoded HMAC-SHA1 of `body` keyed with `secret`.
pub(crate) fn hmac_sha1_hex(secret: &str, body: &str) -> Option<String> {
    let mut mac = HmacSha1::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(body.as_bytes());
    Some(hex::encode(mac.finalize().into_bytes()))
}

impl TriggerMatcher for GitMatcher {
    type Event = GitEvent;

    fn name(&self) -> &'static str {
        "git"
    }

    fn applies(&self, category: &str) -> bool {
        category.eq_ignore_ascii_case("git")
    }

    fn convert(&self, event: &Event) -> Result<GitEvent> {
        let content: GitContent = content_as("git", event)?;
        let details = event.details.as_ref();

        Ok(GitEvent {
            source: event.source().map(str::to_string),
            project: content.repo_project,
            slug: content.slug,
            branch: content.branch,
            hash: content.hash,
            action: content.action,
            artifacts: artifacts_under(&content.rest, "artifacts"),
            raw_content: event.raw_content.clone(),
            has_signature: details.is_some_and(|d| d.has_header(SIGNATURE_HEADER)),
            signature: event.header(SIGNATURE_HEADER).map(str::to_string),
            event_id: event.event_id.clone(),
        })
    }

    fn is_well_formed(&self, trigger: &Trigger) -> bool {
        trigger.enabled
            && trigger.trigger_type == TriggerType::Git
            && [&trigger.source, &trigger.project, &trigger.slug]
                .iter()
                .all(|field| field.as_deref().is_some_and(|v| !v.is_empty()))
    }

    fn matches(&self, event: &GitEvent, _pipeline: &Pipeline, trigger: &Trigger) -> Result<bool> {
        if !(eq_ignore_case(trigger.source.as_deref(), event.source.as_deref())
            && eq_ignore_case(trigger.project.as_deref(), event.project.as_deref())
            && eq_ignore_case(trigger.slug.as_deref(), event.slug.as_deref()))
        {
            return Ok(false);
        }

        if let Some(pattern) = trigger.branch.as_deref().filter(|b| !b.is_empty()) {
            let branch = event.branch.as_deref().unwrap_or_default();
            let matched = full_match(pattern, branch).ok_or_else(|| Error::InvalidPattern {
                pattern: pattern.to_string(),
                reason: "branch pattern does not compile".to_string(),
            })?;
            if !matched {
                debug!(pattern, branch, "Branch does not match");
                return Ok(false);
            }
        }

        Ok(self.passes_signature_check(event, trigger))
    }

    fn artifacts(&self, event: &GitEvent) -> Vec<Artifact> {
        event.artifacts.clone()
    }

    fn build(&self, pipeline: &Pipeline, trigger: &Trigger, event: &GitEvent) -> Result<Pipeline> {
        let bound = trigger
            .at_hash(event.hash.clone())
            .at_branch(event.branch.clone())
            .at_event_id(event.event_id.clone());

        Ok(pipeline
            .with_received_artifacts(event.artifacts.clone())
            .with_trigger(bound))
    }
}
