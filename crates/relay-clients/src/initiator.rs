//! Pipeline initiation over HTTP.

use crate::config::HttpClientConfig;
use async_trait::async_trait;
use relay_core::ports::PipelineInitiator;
use relay_core::{Error, Pipeline, RequestContext, Result};
use reqwest::Client;
use tracing::{info, warn};

/// Header carrying the identity an execution runs as.
pub const USER_HEADER: &str = "X-Relay-User";
/// Header carrying the caller's accounts, comma separated.
pub const ACCOUNTS_HEADER: &str = "X-Relay-Accounts";

pub struct HttpPipelineInitiator {
    client: Client,
    config: HttpClientConfig,
}

impl HttpPipelineInitiator {
    pub fn new(config: HttpClientConfig) -> Result<Self> {
        Ok(Self {
            client: config.build_client()?,
            config,
        })
    }

    fn failure(pipeline: &Pipeline, reason: impl ToString) -> Error {
        Error::Initiation {
            pipeline: pipeline.to_string(),
            reason: reason.to_string(),
        }
    }
}

#[async_trait]
impl PipelineInitiator for HttpPipelineInitiator {
    async fn start(&self, pipeline: &Pipeline, ctx: &RequestContext) -> Result<()> {
        if !self.config.enabled {
            info!(
                application = %pipeline.application,
                name = %pipeline.name,
                "Initiation disabled, would have started pipeline"
            );
            return Ok(());
        }

        let mut req = self
            .client
            .post(self.config.endpoint("orchestrate")?)
            .json(pipeline);

        // Identity is forwarded only for triggers that ask for it.
        if let Some(trigger) = pipeline.trigger.as_ref().filter(|t| t.propagate_auth) {
            if let Some(user) = ctx.user.as_deref().or(trigger.run_as_user.as_deref()) {
                req = req.header(USER_HEADER, user);
            }
            if !ctx.accounts.is_empty() {
                req = req.header(ACCOUNTS_HEADER, ctx.accounts.join(","));
            }
        }

        let res = req.send().await.map_err(|e| Self::failure(pipeline, e))?;
        let status = res.status();
        if !status.is_success() {
            return Err(Self::failure(pipeline, format!("orchestrate returned {}", status)));
        }

        info!(
            application = %pipeline.application,
            name = %pipeline.name,
            request_id = %ctx.request_id,
            "Started pipeline"
        );
        Ok(())
    }

    async fn record_failure(&self, pipeline: &Pipeline) -> Result<()> {
        if !self.config.enabled {
            warn!(pipeline = %pipeline, "Initiation disabled, not recording failure");
            return Ok(());
        }

        let res = self
            .client
            .post(self.config.endpoint("fail")?)
            .json(pipeline)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        let status = res.status();
        if !status.is_success() {
            return Err(Error::Http(format!("fail returned {}", status)));
        }
        Ok(())
    }
}
