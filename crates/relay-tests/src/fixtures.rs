//! Sample pipelines and events.

use relay_core::{Event, Pipeline, Trigger, TriggerType};
use serde_json::{Map, Value, json};

pub const APPLICATION: &str = "myapp";

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Factory for pipelines with one trigger each.
pub struct PipelineFixture;

impl PipelineFixture {
    /// `myapp:deploy`, started by pushes to `org/repo` on `main`.
    pub fn git_deploy() -> Pipeline {
        Pipeline::new(APPLICATION, "deploy")
            .with_id("pipeline-deploy")
            .with_triggers(vec![Self::git_trigger("main")])
    }

    pub fn git_trigger(branch: &str) -> Trigger {
        Trigger {
            source: Some("github".to_string()),
            project: Some("org".to_string()),
            slug: Some("repo".to_string()),
            branch: Some(branch.to_string()),
            ..Trigger::new(TriggerType::Git)
        }
    }

    /// Started by any tag of `acct/repo` except `latest`.
    pub fn docker_deploy() -> Pipeline {
        Pipeline::new(APPLICATION, "bake").with_triggers(vec![Trigger {
            account: Some("acct".to_string()),
            repository: Some("repo".to_string()),
            ..Trigger::new(TriggerType::Docker)
        }])
    }

    /// Webhook from `ci` whose payload must carry `foo`.
    pub fn webhook_with_constraint() -> Pipeline {
        Pipeline::new(APPLICATION, "hooked").with_triggers(vec![Trigger {
            source: Some("ci".to_string()),
            payload_constraints: Some(object(json!({ "foo": "bar" }))),
            ..Trigger::new(TriggerType::Webhook)
        }])
    }

    /// Webhook trigger listening on its own event type instead of `webhook`.
    pub fn custom_hook(hook_type: &str) -> Pipeline {
        Pipeline::new(APPLICATION, "custom-hooked").with_triggers(vec![Trigger {
            source: Some("ci".to_string()),
            ..Trigger::new(TriggerType::Other(hook_type.to_string()))
        }])
    }

    pub fn disabled(pipeline: Pipeline) -> Pipeline {
        pipeline.with_disabled(true)
    }
}

/// Factory for normalized events.
pub struct EventFixture;

impl EventFixture {
    pub fn git_push(branch: &str, hash: &str) -> Event {
        Event::new(
            "git",
            "github",
            object(json!({
                "repoProject": "org",
                "slug": "repo",
                "branch": branch,
                "hash": hash,
            })),
        )
    }

    pub fn docker_push(tag: &str) -> Event {
        Event::new(
            "docker",
            "dockerhub",
            object(json!({
                "account": "acct",
                "registry": "index.docker.io",
                "repository": "repo",
                "tag": tag,
            })),
        )
    }

    pub fn manual(application: &str, pipeline_name_or_id: &str, user: &str) -> Event {
        Event::new(
            "manual",
            "api",
            object(json!({
                "application": application,
                "pipelineNameOrId": pipeline_name_or_id,
                "trigger": { "type": "manual", "user": user },
            })),
        )
    }

    pub fn webhook(payload: Value) -> Event {
        Self::typed_webhook("webhook", payload)
    }

    pub fn typed_webhook(hook_type: &str, payload: Value) -> Event {
        Event::new(hook_type, "ci", object(payload))
    }
}
