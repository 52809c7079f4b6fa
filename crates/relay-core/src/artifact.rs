//! Artifacts produced by events and expected by pipelines.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// An artifact carried by an event, e.g. a pushed image or a commit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub artifact_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_account: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provenance: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(
        default,
        deserialize_with = "crate::de::null_as_default",
        skip_serializing_if = "Map::is_empty"
    )]
    pub metadata: Map<String, Value>,
    /// Fields this crate does not model, written back unchanged.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Artifact {
    pub fn new(artifact_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            artifact_type: Some(artifact_type.into()),
            name: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }
}

/// A pipeline-level declaration of an artifact a trigger must deliver.
///
/// Fields of `match_artifact` are either literal values or regular
/// expressions; empty fields are wildcards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpectedArtifact {
    #[serde(default, deserialize_with = "crate::de::null_as_default")]
    pub id: String,
    #[serde(default, deserialize_with = "crate::de::null_as_default")]
    pub match_artifact: Artifact,
    #[serde(default, deserialize_with = "crate::de::null_as_default")]
    pub use_prior_artifact: bool,
    #[serde(default, deserialize_with = "crate::de::null_as_default")]
    pub use_default_artifact: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_artifact: Option<Artifact>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ExpectedArtifact {
    pub fn new(id: impl Into<String>, match_artifact: Artifact) -> Self {
        Self {
            id: id.into(),
            match_artifact,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_artifact_wire_names() {
        let artifact = Artifact::new("docker/image", "gcr.io/project/app")
            .with_version("v1")
            .with_reference("gcr.io/project/app:v1");

        let value = serde_json::to_value(&artifact).unwrap();
        assert_eq!(value["type"], json!("docker/image"));
        assert_eq!(value["reference"], json!("gcr.io/project/app:v1"));
        assert!(value.get("metadata").is_none());
    }

    #[test]
    fn test_expected_artifact_defaults() {
        let expected: ExpectedArtifact = serde_json::from_value(json!({
            "id": "ea-1",
            "matchArtifact": { "type": "docker/image", "name": "app.*" }
        }))
        .unwrap();

        assert_eq!(expected.id, "ea-1");
        assert_eq!(expected.match_artifact.name.as_deref(), Some("app.*"));
        assert!(!expected.use_default_artifact);
        assert!(expected.default_artifact.is_none());
    }

    #[test]
    fn test_unmodelled_artifact_fields_survive_roundtrip() {
        let input = json!({
            "matchArtifact": {
                "type": "custom/object",
                "name": "bundle",
                "customKind": true
            },
            "usePriorArtifact": false,
            "usePriorExecution": true
        });

        let expected: ExpectedArtifact = serde_json::from_value(input).unwrap();
        assert_eq!(expected.id, "");
        assert_eq!(expected.extra["usePriorExecution"], json!(true));
        assert_eq!(expected.match_artifact.extra["customKind"], json!(true));

        let written = serde_json::to_value(&expected).unwrap();
        assert_eq!(written["usePriorExecution"], json!(true));
        assert_eq!(written["matchArtifact"]["customKind"], json!(true));
        assert_eq!(written["matchArtifact"]["name"], json!("bundle"));
    }

    #[test]
    fn test_null_artifact_fields_read_as_defaults() {
        let expected: ExpectedArtifact = serde_json::from_value(json!({
            "id": null,
            "matchArtifact": null,
            "useDefaultArtifact": null
        }))
        .unwrap();

        assert_eq!(expected.id, "");
        assert_eq!(expected.match_artifact, Artifact::default());
        assert!(!expected.use_default_artifact);
    }
}
