//! Configuration for HTTP adapters.

use relay_core::{Error, Result};
use std::time::Duration;
use url::Url;

/// Connection settings for one remote service.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Base URL; request paths are appended to it.
    pub base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// When false, the adapter logs instead of calling out.
    pub enabled: bool,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            timeout: Duration::from_secs(30),
            enabled: true,
        }
    }
}

impl HttpClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// `base_url` joined with `path`.
    pub fn endpoint(&self, path: &str) -> Result<Url> {
        let base = format!("{}/", self.base_url.trim_end_matches('/'));
        Url::parse(&base)
            .and_then(|base| base.join(path.trim_start_matches('/')))
            .map_err(|e| Error::Config(format!("invalid base url '{}': {}", self.base_url, e)))
    }

    pub(crate) fn build_client(&self) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(concat!("relay/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Http(e.to_string()))
    }
}
