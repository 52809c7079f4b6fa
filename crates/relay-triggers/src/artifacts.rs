//! Artifact constraint resolution.
//!
//! A trigger may reference expected-artifact definitions declared on its
//! pipeline. The trigger only fires if the event carries at least one artifact
//! satisfying one of those definitions.

use crate::patterns;
use relay_core::{Artifact, ExpectedArtifact, Pipeline, Trigger};

/// `true` if `candidates` satisfy the expected artifacts `trigger` references
/// on `pipeline`. Vacuously true when no referenced definition resolves.
pub fn any_artifacts_satisfy(candidates: &[Artifact], trigger: &Trigger, pipeline: &Pipeline) -> bool {
    let expected: Vec<&ExpectedArtifact> = pipeline
        .expected_artifacts
        .iter()
        .filter(|ea| trigger.expected_artifact_ids.contains(&ea.id))
        .collect();

    if expected.is_empty() {
        return true;
    }

    expected
        .iter()
        .any(|ea| candidates.iter().any(|artifact| artifact_matches(&ea.match_artifact, artifact)))
}

/// Every non-empty field of `pattern` must match the same field of `artifact`.
pub fn artifact_matches(pattern: &Artifact, artifact: &Artifact) -> bool {
    field_matches(pattern.artifact_type.as_deref(), artifact.artifact_type.as_deref())
        && field_matches(pattern.name.as_deref(), artifact.name.as_deref())
        && field_matches(pattern.version.as_deref(), artifact.version.as_deref())
        && field_matches(pattern.location.as_deref(), artifact.location.as_deref())
        && field_matches(pattern.reference.as_deref(), artifact.reference.as_deref())
}

/// Literal equality or a full regex match. Empty patterns match anything.
pub fn field_matches(pattern: Option<&str>, value: Option<&str>) -> bool {
    let pattern = match pattern {
        Some(p) if !p.is_empty() => p,
        _ => return true,
    };
    let Some(value) = value else {
        return false;
    };

    pattern == value || full_match(pattern, value).unwrap_or(false)
}

/// Anchored regex match. `None` if `pattern` does not compile.
pub(crate) fn full_match(pattern: &str, value: &str) -> Option<bool> {
    patterns::anchored(pattern).map(|re| re.is_match(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_core::TriggerType;

    fn pipeline_expecting(pattern: Artifact) -> Pipeline {
        Pipeline::new("app", "deploy")
            .with_expected_artifacts(vec![ExpectedArtifact::new("ea-1", pattern)])
    }

    fn trigger_referencing(ids: &[&str]) -> Trigger {
        Trigger {
            expected_artifact_ids: ids.iter().map(|s| s.to_string()).collect(),
            ..Trigger::new(TriggerType::Docker)
        }
    }

    #[test]
    fn test_vacuous_without_references() {
        let pipeline = pipeline_expecting(Artifact::new("docker/image", "gcr.io/app"));
        assert!(any_artifacts_satisfy(&[], &trigger_referencing(&[]), &pipeline));
    }

    #[test]
    fn test_vacuous_when_reference_does_not_resolve() {
        let pipeline = pipeline_expecting(Artifact::new("docker/image", "gcr.io/app"));
        assert!(any_artifacts_satisfy(&[], &trigger_referencing(&["unknown"]), &pipeline));
    }

    #[test]
    fn test_requires_a_matching_candidate() {
        let pipeline = pipeline_expecting(Artifact::new("docker/image", "gcr.io/app"));
        let trigger = trigger_referencing(&["ea-1"]);

        assert!(!any_artifacts_satisfy(&[], &trigger, &pipeline));
        assert!(!any_artifacts_satisfy(
            &[Artifact::new("docker/image", "gcr.io/other")],
            &trigger,
            &pipeline
        ));
        assert!(any_artifacts_satisfy(
            &[
                Artifact::new("docker/image", "gcr.io/other"),
                Artifact::new("docker/image", "gcr.io/app").with_version("v1"),
            ],
            &trigger,
            &pipeline
        ));
    }

    #[test]
    fn test_regex_fields() {
        let pattern = Artifact::new("docker/image", "gcr.io/.*").with_version("v\\d+");
        assert!(artifact_matches(
            &pattern,
            &Artifact::new("docker/image", "gcr.io/app").with_version("v12")
        ));
        assert!(!artifact_matches(
            &pattern,
            &Artifact::new("docker/image", "gcr.io/app").with_version("v12-rc")
        ));
    }

    #[test]
    fn test_field_matches() {
        assert!(field_matches(None, None));
        assert!(field_matches(Some(""), Some("anything")));
        assert!(!field_matches(Some("x"), None));
        // invalid regex still matches literally
        assert!(field_matches(Some("a[b"), Some("a[b")));
        assert!(!field_matches(Some("a[b"), Some("ab")));
    }
}
