//! Daemon configuration.
//!
//! Values come from, in increasing priority: built-in defaults, an optional
//! YAML file, and `RELAY__`-prefixed environment variables
//! (`RELAY__CACHE__POLL_INTERVAL_SECS=5`).

use relay_clients::HttpClientConfig;
use relay_trace::TracingConfig;
use relay_triggers::PipelineCacheConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

pub const ENV_PREFIX: &str = "RELAY";
pub const ENV_SEPARATOR: &str = "__";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid YAML configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub cache: CacheSettings,
    /// Pipeline configuration store.
    pub store: ServiceSettings,
    /// Pipeline initiation service.
    pub initiator: ServiceSettings,
    pub dispatcher: DispatcherSettings,
    pub tracing: TracingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Start with trigger processing enabled.
    pub enabled: bool,
    pub poll_interval_secs: u64,
    pub startup_wait_secs: u64,
    pub preserve_authored_trigger_ids: bool,
}

impl Default for CacheSettings {
    fn default() -> Self {
        let defaults = PipelineCacheConfig::default();
        Self {
            enabled: true,
            poll_interval_secs: defaults.poll_interval.as_secs(),
            startup_wait_secs: defaults.startup_wait.as_secs(),
            preserve_authored_trigger_ids: defaults.preserve_authored_trigger_ids,
        }
    }
}

impl CacheSettings {
    pub fn to_cache_config(&self) -> PipelineCacheConfig {
        PipelineCacheConfig::default()
            .with_poll_interval(Duration::from_secs(self.poll_interval_secs))
            .with_startup_wait(Duration::from_secs(self.startup_wait_secs))
            .with_preserve_authored_trigger_ids(self.preserve_authored_trigger_ids)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    pub base_url: String,
    pub timeout_secs: u64,
    pub enabled: bool,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        let defaults = HttpClientConfig::default();
        Self {
            base_url: defaults.base_url,
            timeout_secs: defaults.timeout.as_secs(),
            enabled: defaults.enabled,
        }
    }
}

impl ServiceSettings {
    pub fn to_client_config(&self) -> HttpClientConfig {
        HttpClientConfig::new(self.base_url.clone())
            .with_timeout(Duration::from_secs(self.timeout_secs))
            .with_enabled(self.enabled)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherSettings {
    /// Events the trigger listener may process concurrently.
    pub max_in_flight: usize,
    /// Per-listener queue bound; unbounded when unset.
    pub queue_capacity: Option<usize>,
}

impl Default for DispatcherSettings {
    fn default() -> Self {
        Self {
            max_in_flight: 4,
            queue_capacity: None,
        }
    }
}

impl RelayConfig {
    /// Layer the optional file at `path` and the environment over defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(
                config::File::from(path)
                    .format(config::FileFormat::Yaml)
                    .required(true),
            );
        }
        let config: Self = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator(ENV_SEPARATOR)
                    .separator(ENV_SEPARATOR)
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Parse a YAML document without consulting the environment.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache.poll_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "cache.poll_interval_secs must be greater than zero".to_string(),
            ));
        }
        if self.dispatcher.queue_capacity == Some(0) {
            return Err(ConfigError::Invalid(
                "dispatcher.queue_capacity must be greater than zero".to_string(),
            ));
        }
        for (name, service) in [("store", &self.store), ("initiator", &self.initiator)] {
            service
                .to_client_config()
                .endpoint("")
                .map_err(|e| ConfigError::Invalid(format!("{name}: {e}")))?;
        }
        Ok(())
    }
}
