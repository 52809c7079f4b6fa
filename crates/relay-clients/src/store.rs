//! Pipeline configuration store over HTTP.

use crate::config::HttpClientConfig;
use async_trait::async_trait;
use relay_core::ports::PipelineStore;
use relay_core::{Error, Pipeline, Result};
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, warn};

pub struct HttpPipelineStore {
    client: Client,
    config: HttpClientConfig,
}

impl HttpPipelineStore {
    pub fn new(config: HttpClientConfig) -> Result<Self> {
        Ok(Self {
            client: config.build_client()?,
            config,
        })
    }
}

#[async_trait]
impl PipelineStore for HttpPipelineStore {
    async fn list_pipelines(&self) -> Result<Vec<Pipeline>> {
        let mut url = self.config.endpoint("pipelines")?;
        url.query_pairs_mut().append_pair("restricted", "false");

        let res = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        let status = res.status();
        if !status.is_success() {
            return Err(Error::Store(format!("GET /pipelines returned {}", status)));
        }

        let body = res.bytes().await.map_err(|e| Error::Http(e.to_string()))?;
        let entries: Vec<Value> = serde_json::from_slice(&body)?;
        let pipelines = decode_pipelines(entries);
        debug!(count = pipelines.len(), "Fetched pipelines");
        Ok(pipelines)
    }
}

/// Decodes each entry on its own; a malformed config is logged and skipped.
fn decode_pipelines(entries: Vec<Value>) -> Vec<Pipeline> {
    entries
        .into_iter()
        .enumerate()
        .filter_map(|(index, entry)| {
            let application = entry.get("application").and_then(Value::as_str).map(str::to_owned);
            let name = entry.get("name").and_then(Value::as_str).map(str::to_owned);
            match serde_json::from_value::<Pipeline>(entry) {
                Ok(pipeline) => Some(pipeline),
                Err(e) => {
                    warn!(
                        index,
                        application = application.as_deref().unwrap_or(""),
                        name = name.as_deref().unwrap_or(""),
                        error = %e,
                        "Skipping malformed pipeline config"
                    );
                    None
                }
            }
        })
        .collect()
}
