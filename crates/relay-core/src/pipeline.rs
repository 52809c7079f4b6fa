//! Pipeline and trigger value objects.
//!
//! These mirror the configuration documents served by the pipeline store.
//! Both types are immutable once shared: every update goes through a
//! copy-and-override method (`with_*` / `at_*`) returning a new value, so a
//! cached snapshot can be read from many tasks without coordination.
//!
//! Attributes the engine does not interpret (stages, templates, concurrency
//! flags, ...) are kept verbatim in `extra` and written back unchanged.

use crate::artifact::{Artifact, ExpectedArtifact};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::{Arc, Weak};

/// A named, application-scoped delivery workflow definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pipeline {
    #[serde(default, deserialize_with = "crate::de::null_as_default")]
    pub application: String,
    #[serde(default, deserialize_with = "crate::de::null_as_default")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "crate::de::null_as_default")]
    pub disabled: bool,
    #[serde(default, deserialize_with = "crate::de::null_as_default")]
    pub triggers: Vec<Trigger>,
    #[serde(
        default,
        deserialize_with = "crate::de::null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub expected_artifacts: Vec<ExpectedArtifact>,
    #[serde(
        default,
        deserialize_with = "crate::de::null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub received_artifacts: Vec<Artifact>,
    #[serde(
        default,
        deserialize_with = "crate::de::null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub notifications: Vec<Map<String, Value>>,
    /// The resolved trigger. Only set on a matched copy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger: Option<Trigger>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Pipeline {
    pub fn new(application: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            application: application.into(),
            name: name.into(),
            id: None,
            disabled: false,
            triggers: Vec::new(),
            expected_artifacts: Vec::new(),
            received_artifacts: Vec::new(),
            notifications: Vec::new(),
            trigger: None,
            extra: Map::new(),
        }
    }

    pub fn with_id(&self, id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..self.clone()
        }
    }

    pub fn with_disabled(&self, disabled: bool) -> Self {
        Self {
            disabled,
            ..self.clone()
        }
    }

    pub fn with_triggers(&self, triggers: Vec<Trigger>) -> Self {
        Self {
            triggers,
            ..self.clone()
        }
    }

    pub fn with_expected_artifacts(&self, expected_artifacts: Vec<ExpectedArtifact>) -> Self {
        Self {
            expected_artifacts,
            ..self.clone()
        }
    }

    /// Bind the resolved trigger.
    pub fn with_trigger(&self, trigger: Trigger) -> Self {
        Self {
            trigger: Some(trigger),
            ..self.clone()
        }
    }

    pub fn with_received_artifacts(&self, received_artifacts: Vec<Artifact>) -> Self {
        Self {
            received_artifacts,
            ..self.clone()
        }
    }

    pub fn with_notifications(&self, notifications: Vec<Map<String, Value>>) -> Self {
        Self {
            notifications,
            ..self.clone()
        }
    }

    /// `true` when `name_or_id` names this pipeline or equals its id.
    pub fn is_named(&self, name_or_id: &str) -> bool {
        self.name == name_or_id || self.id.as_deref() == Some(name_or_id)
    }
}

impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.id {
            Some(id) => write!(f, "{}:{} ({})", self.application, self.name, id),
            None => write!(f, "{}:{}", self.application, self.name),
        }
    }
}

/// Trigger categories. Unknown categories are carried through as `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TriggerType {
    Git,
    Docker,
    Webhook,
    Pubsub,
    Manual,
    Cron,
    Jenkins,
    Other(String),
}

impl TriggerType {
    pub fn as_str(&self) -> &str {
        match self {
            TriggerType::Git => "git",
            TriggerType::Docker => "docker",
            TriggerType::Webhook => "webhook",
            TriggerType::Pubsub => "pubsub",
            TriggerType::Manual => "manual",
            TriggerType::Cron => "cron",
            TriggerType::Jenkins => "jenkins",
            TriggerType::Other(other) => other,
        }
    }
}

impl Default for TriggerType {
    fn default() -> Self {
        TriggerType::Other(String::new())
    }
}

impl From<String> for TriggerType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "git" => TriggerType::Git,
            "docker" => TriggerType::Docker,
            "webhook" => TriggerType::Webhook,
            "pubsub" => TriggerType::Pubsub,
            "manual" => TriggerType::Manual,
            "cron" => TriggerType::Cron,
            "jenkins" => TriggerType::Jenkins,
            _ => TriggerType::Other(value),
        }
    }
}

impl From<&str> for TriggerType {
    fn from(value: &str) -> Self {
        TriggerType::from(value.to_string())
    }
}

impl From<TriggerType> for String {
    fn from(value: TriggerType) -> Self {
        match value {
            TriggerType::Other(other) => other,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for TriggerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A configured condition under which a pipeline should start.
///
/// Category-specific configuration lives side by side in one flat record, the
/// way the pipeline store serves it. Fields under "bound at run time" are
/// filled in by the matchers on the copy attached to a matched pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trigger {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type", default, deserialize_with = "crate::de::null_as_default")]
    pub trigger_type: TriggerType,
    #[serde(default, deserialize_with = "crate::de::null_as_default")]
    pub enabled: bool,

    // git
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,

    // jenkins
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub master: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_file: Option<String>,

    // cron
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cron_expression: Option<String>,

    // pubsub
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pubsub_system: Option<String>,

    // docker
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,

    // webhook / pubsub constraints
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload_constraints: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute_constraints: Option<Map<String, Value>>,

    // pipeline
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,

    #[serde(
        default,
        deserialize_with = "crate::de::null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub expected_artifact_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_name: Option<String>,

    // bound at run time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_number: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_info: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_as_user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
    #[serde(default, deserialize_with = "crate::de::null_as_default")]
    pub rebake: bool,
    #[serde(default, deserialize_with = "crate::de::null_as_default")]
    pub dry_run: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notifications: Option<Vec<Map<String, Value>>>,
    /// Correlates an execution with the event that started it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_successful_execution: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_text: Option<String>,

    /// Owning pipeline. Relation only; never serialized.
    #[serde(skip)]
    pub parent: Option<Weak<Pipeline>>,

    /// Set by the engine only. Any input value is discarded; the engine's
    /// value is always written.
    #[serde(default, deserialize_with = "crate::de::engine_owned")]
    pub propagate_auth: bool,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Trigger {
    pub fn new(trigger_type: impl Into<TriggerType>) -> Self {
        Self {
            trigger_type: trigger_type.into(),
            enabled: true,
            ..Default::default()
        }
    }

    /// The owning pipeline, if it is still alive.
    pub fn parent(&self) -> Option<Arc<Pipeline>> {
        self.parent.as_ref()?.upgrade()
    }

    pub fn is_type(&self, trigger_type: &TriggerType) -> bool {
        &self.trigger_type == trigger_type
    }

    pub fn with_parent(&self, parent: Weak<Pipeline>) -> Self {
        Self {
            parent: Some(parent),
            ..self.clone()
        }
    }

    pub fn with_id(&self, id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..self.clone()
        }
    }

    /// Deterministic identifier derived from the trigger's significant fields
    /// and the identity of its parent pipeline. The current `id` is not part
    /// of the input, so recomputing it is idempotent.
    pub fn fallback_id(&self) -> String {
        self.fallback_id_for(self.parent().as_deref())
    }

    /// [`Trigger::fallback_id`] with an explicit parent, for use while the
    /// parent is still being constructed.
    pub fn fallback_id_for(&self, parent: Option<&Pipeline>) -> String {
        let significant = serde_json::json!({
            "parent": parent.map(|p| (p.application.as_str(), p.name.as_str(), p.id.as_deref())),
            "type": self.trigger_type.as_str(),
            "master": self.master,
            "job": self.job,
            "cronExpression": self.cron_expression,
            "source": self.source,
            "project": self.project,
            "slug": self.slug,
            "account": self.account,
            "repository": self.repository,
            "tag": self.tag,
            "parameters": self.parameters,
            "payloadConstraints": self.payload_constraints,
            "attributeConstraints": self.attribute_constraints,
            "branch": self.branch,
            "runAsUser": self.run_as_user,
            "subscriptionName": self.subscription_name,
            "pubsubSystem": self.pubsub_system,
            "expectedArtifactIds": self.expected_artifact_ids,
            "payload": self.payload,
            "status": self.status,
            "artifactName": self.artifact_name,
            "link": self.link,
            "linkText": self.link_text,
        });

        let mut hasher = Sha256::new();
        hasher.update(significant.to_string().as_bytes());
        let digest = hasher.finalize();
        hex::encode(&digest[..16])
    }

    pub fn at_build_number(&self, build_number: i64) -> Self {
        Self {
            build_number: Some(build_number),
            hash: None,
            tag: None,
            ..self.clone()
        }
    }

    pub fn at_hash(&self, hash: Option<String>) -> Self {
        Self {
            build_number: None,
            hash,
            tag: None,
            ..self.clone()
        }
    }

    pub fn at_branch(&self, branch: Option<String>) -> Self {
        Self {
            build_number: None,
            tag: None,
            branch,
            ..self.clone()
        }
    }

    pub fn at_tag(&self, tag: Option<String>) -> Self {
        Self {
            build_number: None,
            hash: None,
            tag,
            ..self.clone()
        }
    }

    pub fn at_payload(&self, payload: Option<Map<String, Value>>) -> Self {
        Self {
            payload,
            ..self.clone()
        }
    }

    pub fn at_parameters(&self, parameters: Option<Map<String, Value>>) -> Self {
        Self {
            parameters,
            ..self.clone()
        }
    }

    pub fn at_secret(&self, secret: Option<String>) -> Self {
        Self {
            build_number: None,
            hash: None,
            digest: None,
            secret,
            ..self.clone()
        }
    }

    pub fn at_message_description(
        &self,
        subscription_name: Option<String>,
        pubsub_system: Option<String>,
    ) -> Self {
        Self {
            subscription_name,
            pubsub_system,
            ..self.clone()
        }
    }

    pub fn at_event_id(&self, event_id: Option<String>) -> Self {
        Self {
            event_id,
            ..self.clone()
        }
    }

    pub fn at_notifications(&self, notifications: Option<Vec<Map<String, Value>>>) -> Self {
        Self {
            notifications,
            ..self.clone()
        }
    }

    pub fn at_propagate_auth(&self, propagate_auth: bool) -> Self {
        Self {
            propagate_auth,
            ..self.clone()
        }
    }
}
