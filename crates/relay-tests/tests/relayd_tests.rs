//! The daemon wiring against mock store and initiation services.

use relay_server::{Relay, RelayConfig};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(store: &MockServer, initiator: &MockServer) -> RelayConfig {
    let mut config = RelayConfig::default();
    config.store.base_url = store.uri();
    config.initiator.base_url = initiator.uri();
    config.cache.poll_interval_secs = 60;
    config
}

#[tokio::test]
async fn test_ingested_manual_event_is_posted_to_initiator() {
    relay_tests::init_test_logging();
    let store = MockServer::start().await;
    let initiator = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/pipelines"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "application": "myapp", "name": "deploy", "id": "p-1", "stages": [] }
        ])))
        .mount(&store)
        .await;
    Mock::given(method("POST"))
        .and(path("/orchestrate"))
        .and(header("X-Relay-User", "alice"))
        .and(body_partial_json(json!({
            "application": "myapp",
            "name": "deploy",
            "stages": [],
            "trigger": { "type": "manual", "user": "alice" }
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&initiator)
        .await;

    let relay = Relay::from_config(&config(&store, &initiator)).unwrap();
    relay.start();
    relay.cache().await_snapshot(Duration::from_secs(5)).await.unwrap();

    let line = json!({
        "user": "alice",
        "event": {
            "details": { "type": "manual", "source": "api" },
            "content": {
                "application": "myapp",
                "pipelineNameOrId": "deploy",
                "trigger": { "type": "manual", "user": "alice" }
            }
        }
    })
    .to_string();
    let stats = relay.ingest(line.as_bytes()).await.unwrap();
    relay.shutdown().await;

    assert_eq!(stats.dispatched, 1);
}

#[tokio::test]
async fn test_rejected_start_is_reported_as_failure() {
    let store = MockServer::start().await;
    let initiator = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/pipelines"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "application": "myapp",
            "name": "bake",
            "triggers": [{ "type": "docker", "enabled": true, "account": "acct", "repository": "repo" }]
        }])))
        .mount(&store)
        .await;
    Mock::given(method("POST"))
        .and(path("/orchestrate"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&initiator)
        .await;
    Mock::given(method("POST"))
        .and(path("/fail"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&initiator)
        .await;

    let relay = Relay::from_config(&config(&store, &initiator)).unwrap();
    relay.start();
    relay.cache().await_snapshot(Duration::from_secs(5)).await.unwrap();

    let line = json!({
        "details": { "type": "docker", "source": "dockerhub" },
        "content": { "account": "acct", "repository": "repo", "tag": "v2" }
    })
    .to_string();
    relay.ingest(line.as_bytes()).await.unwrap();
    relay.shutdown().await;

    assert!(relay
        .metrics()
        .iter()
        .any(|s| s.id.name == "pipelines.initiation.errors" && s.value == 1));
}

#[tokio::test]
async fn test_malformed_pipeline_does_not_empty_the_snapshot() {
    let store = MockServer::start().await;
    let initiator = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/pipelines"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "application": "myapp",
                "name": "deploy",
                "notifications": null,
                "triggers": [{ "type": "git", "enabled": true, "source": "github", "expectedArtifactIds": null }]
            },
            { "application": "myapp", "name": "broken", "disabled": "sometimes" }
        ])))
        .mount(&store)
        .await;

    let relay = Relay::from_config(&config(&store, &initiator)).unwrap();
    relay.cache().poll().await;

    let snapshot = relay.cache().await_snapshot(Duration::from_secs(5)).await.unwrap();
    let names: Vec<&str> = snapshot.pipelines().iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["deploy"]);
    relay.shutdown().await;
}

#[tokio::test]
async fn test_unreachable_store_leaves_cache_empty() {
    let initiator = MockServer::start().await;
    let mut config = RelayConfig::default();
    config.store.base_url = "http://127.0.0.1:9".to_string();
    config.store.timeout_secs = 1;
    config.initiator.base_url = initiator.uri();

    let relay = Relay::from_config(&config).unwrap();
    relay.cache().poll().await;

    assert!(relay.cache().current_snapshot().is_none());
    assert!(relay.cache().await_snapshot(Duration::from_millis(50)).await.is_err());
    relay.shutdown().await;
}
