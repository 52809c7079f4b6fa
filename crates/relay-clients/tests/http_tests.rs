//! HTTP adapter tests against a mock server.

use pretty_assertions::assert_eq;
use relay_clients::{HttpClientConfig, HttpPipelineInitiator, HttpPipelineStore};
use relay_core::ports::{PipelineInitiator, PipelineStore};
use relay_core::{Error, Pipeline, RequestContext, Trigger, TriggerType};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(server: &MockServer) -> HttpClientConfig {
    HttpClientConfig::new(server.uri()).with_timeout(Duration::from_secs(5))
}

fn matched_pipeline(propagate_auth: bool) -> Pipeline {
    let trigger = Trigger {
        run_as_user: Some("svc-deployer".to_string()),
        ..Trigger::new(TriggerType::Manual)
    }
    .at_propagate_auth(propagate_auth);
    Pipeline::new("shop", "deploy").with_id("p-1").with_trigger(trigger)
}

#[tokio::test]
async fn test_store_lists_pipelines() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/pipelines"))
        .and(query_param("restricted", "false"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "application": "shop",
                "name": "deploy",
                "stages": [{ "type": "wait" }],
                "triggers": [{ "type": "docker", "enabled": true, "account": "gcr", "repository": "shop/app" }]
            },
            { "application": "shop", "name": "nightly", "disabled": true }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let store = HttpPipelineStore::new(config(&server)).unwrap();
    let pipelines = store.list_pipelines().await.unwrap();

    assert_eq!(pipelines.len(), 2);
    assert_eq!(pipelines[0].triggers[0].trigger_type, TriggerType::Docker);
    assert_eq!(pipelines[0].extra["stages"], json!([{ "type": "wait" }]));
    assert!(pipelines[1].disabled);
}

#[tokio::test]
async fn test_store_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/pipelines"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let store = HttpPipelineStore::new(config(&server)).unwrap();
    let err = store.list_pipelines().await.unwrap_err();
    assert!(matches!(err, Error::Store(_)));
}

#[tokio::test]
async fn test_store_malformed_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/pipelines"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{not json"))
        .mount(&server)
        .await;

    let store = HttpPipelineStore::new(config(&server)).unwrap();
    let err = store.list_pipelines().await.unwrap_err();
    assert!(matches!(err, Error::Serialization(_)));
}

#[tokio::test]
async fn test_store_skips_malformed_pipeline_and_keeps_the_rest() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/pipelines"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "application": "shop",
                "name": "deploy",
                "disabled": null,
                "expectedArtifacts": null,
                "triggers": [{ "type": "git", "enabled": true, "expectedArtifactIds": null }]
            },
            { "application": "shop", "name": "broken", "triggers": { "type": "git" } },
            { "name": "orphan", "application": null }
        ])))
        .mount(&server)
        .await;

    let store = HttpPipelineStore::new(config(&server)).unwrap();
    let pipelines = store.list_pipelines().await.unwrap();

    let names: Vec<&str> = pipelines.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["deploy", "orphan"]);
    assert!(!pipelines[0].disabled);
    assert_eq!(pipelines[0].triggers[0].trigger_type, TriggerType::Git);
    assert_eq!(pipelines[1].application, "");
}

#[tokio::test]
async fn test_initiator_body_carries_engine_propagate_auth() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/orchestrate"))
        .and(body_partial_json(json!({ "trigger": { "propagateAuth": true } })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let stored: Trigger =
        serde_json::from_value(json!({ "type": "manual", "propagateAuth": false })).unwrap();
    let pipeline = Pipeline::new("shop", "deploy").with_trigger(stored.at_propagate_auth(true));

    let initiator = HttpPipelineInitiator::new(config(&server)).unwrap();
    initiator
        .start(&pipeline, &RequestContext::for_user("alice"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_initiator_posts_pipeline_with_user() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/orchestrate"))
        .and(header("X-Relay-User", "alice"))
        .and(body_partial_json(json!({ "application": "shop", "name": "deploy" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ref": "/pipelines/01H" })))
        .expect(1)
        .mount(&server)
        .await;

    let initiator = HttpPipelineInitiator::new(config(&server)).unwrap();
    initiator
        .start(&matched_pipeline(true), &RequestContext::for_user("alice"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_initiator_falls_back_to_run_as_user() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/orchestrate"))
        .and(header("X-Relay-User", "svc-deployer"))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;

    let initiator = HttpPipelineInitiator::new(config(&server)).unwrap();
    initiator
        .start(&matched_pipeline(true), &RequestContext::anonymous())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_initiator_omits_user_without_propagation() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/orchestrate"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let initiator = HttpPipelineInitiator::new(config(&server)).unwrap();
    initiator
        .start(&matched_pipeline(false), &RequestContext::for_user("alice"))
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    assert!(requests[0].headers.get("X-Relay-User").is_none());
}

#[tokio::test]
async fn test_initiator_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/orchestrate"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/fail"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let initiator = HttpPipelineInitiator::new(config(&server)).unwrap();
    let pipeline = matched_pipeline(false);

    let err = initiator
        .start(&pipeline, &RequestContext::anonymous())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Initiation { .. }));

    initiator.record_failure(&pipeline).await.unwrap();
}

#[tokio::test]
async fn test_disabled_initiator_does_not_call_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let initiator = HttpPipelineInitiator::new(config(&server).with_enabled(false)).unwrap();
    initiator
        .start(&matched_pipeline(true), &RequestContext::anonymous())
        .await
        .unwrap();
    initiator.record_failure(&matched_pipeline(true)).await.unwrap();
}
