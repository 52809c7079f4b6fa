//! Wire-shape tests for relay-core types.

use pretty_assertions::assert_eq;
use relay_core::{Event, Pipeline, RequestContext, TriggerType};
use serde_json::json;

#[test]
fn test_store_document_survives_write_back() {
    let raw = json!({
        "application": "checkout",
        "name": "deploy-prod",
        "id": "7c1e",
        "disabled": false,
        "parallel": true,
        "keepWaitingPipelines": false,
        "stages": [
            { "refId": "1", "type": "bake", "requisiteStageRefIds": [] },
            { "refId": "2", "type": "deploy", "requisiteStageRefIds": ["1"] }
        ],
        "template": { "source": "spinnaker://tmpl", "variables": { "region": "us-east-1" } },
        "expectedArtifacts": [{
            "id": "ea-image",
            "matchArtifact": { "type": "docker/image", "name": "gcr.io/shop/checkout" },
            "useDefaultArtifact": false,
            "usePriorArtifact": true
        }],
        "triggers": [{
            "type": "docker",
            "enabled": true,
            "account": "gcr",
            "registry": "gcr.io",
            "repository": "shop/checkout",
            "tag": "v.*",
            "expectedArtifactIds": ["ea-image"],
            "organization": "shop"
        }]
    });

    let pipeline: Pipeline = serde_json::from_value(raw.clone()).expect("deserialize");
    assert_eq!(pipeline.triggers[0].trigger_type, TriggerType::Docker);
    assert_eq!(pipeline.expected_artifacts[0].id, "ea-image");
    assert!(pipeline.expected_artifacts[0].use_prior_artifact);

    let written = serde_json::to_value(&pipeline).expect("serialize");
    for key in ["parallel", "keepWaitingPipelines", "stages", "template"] {
        assert_eq!(written[key], raw[key], "attribute {key} changed");
    }
    assert_eq!(written["triggers"][0]["organization"], json!("shop"));
    assert_eq!(written["triggers"][0]["expectedArtifactIds"], json!(["ea-image"]));
}

#[test]
fn test_unknown_trigger_type_is_carried() {
    let pipeline: Pipeline = serde_json::from_value(json!({
        "application": "app",
        "name": "nightly",
        "triggers": [{ "type": "concourse", "enabled": true }]
    }))
    .expect("deserialize");

    assert_eq!(
        pipeline.triggers[0].trigger_type,
        TriggerType::Other("concourse".to_string())
    );
    let written = serde_json::to_value(&pipeline).expect("serialize");
    assert_eq!(written["triggers"][0]["type"], json!("concourse"));
}

#[test]
fn test_matched_copy_serializes_resolved_trigger() {
    let pipeline = Pipeline::new("app", "deploy");
    let trigger = relay_core::Trigger::new(TriggerType::Git)
        .at_hash(Some("abc123".to_string()))
        .at_event_id(Some("evt-9".to_string()))
        .at_propagate_auth(true);

    let matched = pipeline.with_trigger(trigger);
    let written = serde_json::to_value(&matched).expect("serialize");

    assert_eq!(written["trigger"]["hash"], json!("abc123"));
    assert_eq!(written["trigger"]["eventId"], json!("evt-9"));
    assert_eq!(written["trigger"]["propagateAuth"], json!(true));
    assert!(pipeline.trigger.is_none());
}

#[test]
fn test_stored_propagate_auth_is_replaced_by_engine_value() {
    let pipeline: Pipeline = serde_json::from_value(json!({
        "application": "app",
        "name": "deploy",
        "triggers": [{ "type": "manual", "enabled": true, "propagateAuth": true }]
    }))
    .expect("deserialize");

    let stored = serde_json::to_value(&pipeline).expect("serialize");
    assert_eq!(stored["triggers"][0]["propagateAuth"], json!(false));

    let matched = pipeline.with_trigger(pipeline.triggers[0].at_propagate_auth(true));
    let written = serde_json::to_value(&matched).expect("serialize");
    assert_eq!(written["trigger"]["propagateAuth"], json!(true));
}

#[test]
fn test_store_document_with_nulls() {
    let pipeline: Pipeline = serde_json::from_value(json!({
        "application": "app",
        "name": "deploy",
        "disabled": null,
        "triggers": null,
        "expectedArtifacts": [{
            "id": "ea-1",
            "matchArtifact": { "type": "docker/image", "metadata": null, "customKind": "x" },
            "usePriorExecution": true
        }]
    }))
    .expect("deserialize");

    assert!(!pipeline.disabled);
    assert!(pipeline.triggers.is_empty());

    let written = serde_json::to_value(&pipeline).expect("serialize");
    assert_eq!(written["expectedArtifacts"][0]["usePriorExecution"], json!(true));
    assert_eq!(
        written["expectedArtifacts"][0]["matchArtifact"]["customKind"],
        json!("x")
    );
}

#[test]
fn test_event_roundtrip_keeps_headers() {
    let event = Event::new("git", "github", serde_json::Map::new())
        .with_raw_content(r#"{"ref":"refs/heads/main"}"#)
        .with_header("X-Hub-Signature", "sha1=00ff");

    let json = serde_json::to_string(&event).expect("serialize");
    let parsed: Event = serde_json::from_str(&json).expect("deserialize");

    assert_eq!(parsed, event);
    assert_eq!(parsed.header("x-hub-signature"), Some("sha1=00ff"));
}

#[test]
fn test_request_context_wire_names() {
    let ctx = RequestContext::for_user("bob");
    let value = serde_json::to_value(&ctx).expect("serialize");
    assert_eq!(value["user"], json!("bob"));
    assert!(value.get("requestId").is_some());
}
