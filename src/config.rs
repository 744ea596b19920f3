//! # Configuration
//!
//! Layered configuration for the runtime and both actor kinds:
//! struct defaults, then an optional TOML file, then `SIGNALBRIDGE_*`
//! environment variables.
//!
//! ```rust,no_run
//! use signalbridge_core::config::BridgeConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = BridgeConfig::load()?;
//! let timeout = config.proxy_reply_timeout();
//! # Ok(())
//! # }
//! ```

use crate::constants::{
    DEFAULT_COMPACTION_INTERVAL, DEFAULT_EVENT_CHANNEL_CAPACITY, DEFAULT_PLAN,
    DEFAULT_PROXY_REPLY_TIMEOUT, DEFAULT_TASK_QUEUE,
};
use crate::error::{BridgeError, Result};
use crate::orchestration::{AccountSettings, ProxySettings};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

pub const ENV_PREFIX: &str = "SIGNALBRIDGE";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub environment: String,
    pub task_queue: String,
    pub default_plan: String,
    pub compaction_interval_secs: u64,
    /// Zero disables the reply timeout.
    pub proxy_reply_timeout_ms: u64,
    pub event_channel_capacity: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            task_queue: DEFAULT_TASK_QUEUE.to_string(),
            default_plan: DEFAULT_PLAN.to_string(),
            compaction_interval_secs: DEFAULT_COMPACTION_INTERVAL.as_secs(),
            proxy_reply_timeout_ms: DEFAULT_PROXY_REPLY_TIMEOUT.as_millis() as u64,
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
        }
    }
}

impl BridgeConfig {
    /// Load from `SIGNALBRIDGE_CONFIG_PATH` (if set) and the environment
    pub fn load() -> Result<Self> {
        match std::env::var(format!("{ENV_PREFIX}_CONFIG_PATH")) {
            Ok(path) => Self::load_from(Some(Path::new(&path))),
            Err(_) => Self::load_from(None),
        }
    }

    /// Load from an optional TOML file, with environment variables layered on top
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            debug!(path = %path.display(), "Loading configuration file");
            builder = builder.add_source(
                config::File::from(path)
                    .format(config::FileFormat::Toml)
                    .required(true),
            );
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX).try_parsing(true),
        );

        let config: BridgeConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overridden by individual environment variables only
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(environment) = std::env::var(format!("{ENV_PREFIX}_ENVIRONMENT")) {
            config.environment = environment;
        }

        if let Ok(plan) = std::env::var(format!("{ENV_PREFIX}_DEFAULT_PLAN")) {
            config.default_plan = plan;
        }

        if let Ok(interval) = std::env::var(format!("{ENV_PREFIX}_COMPACTION_INTERVAL_SECS")) {
            config.compaction_interval_secs = interval.parse().map_err(|e| {
                BridgeError::ConfigurationError(format!("Invalid compaction_interval_secs: {e}"))
            })?;
        }

        if let Ok(timeout) = std::env::var(format!("{ENV_PREFIX}_PROXY_REPLY_TIMEOUT_MS")) {
            config.proxy_reply_timeout_ms = timeout.parse().map_err(|e| {
                BridgeError::ConfigurationError(format!("Invalid proxy_reply_timeout_ms: {e}"))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.default_plan.trim().is_empty() {
            return Err(BridgeError::ConfigurationError(
                "default_plan must not be empty".to_string(),
            ));
        }
        if self.compaction_interval_secs == 0 {
            return Err(BridgeError::ConfigurationError(
                "compaction_interval_secs must be greater than zero".to_string(),
            ));
        }
        if self.event_channel_capacity == 0 {
            return Err(BridgeError::ConfigurationError(
                "event_channel_capacity must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn compaction_interval(&self) -> Duration {
        Duration::from_secs(self.compaction_interval_secs)
    }

    /// `None` means the proxy waits for its reply indefinitely
    pub fn proxy_reply_timeout(&self) -> Option<Duration> {
        (self.proxy_reply_timeout_ms > 0).then(|| Duration::from_millis(self.proxy_reply_timeout_ms))
    }

    pub fn account_settings(&self) -> AccountSettings {
        AccountSettings {
            compaction_interval: self.compaction_interval(),
            default_plan: self.default_plan.clone(),
        }
    }

    pub fn proxy_settings(&self) -> ProxySettings {
        ProxySettings {
            reply_timeout: self.proxy_reply_timeout(),
        }
    }
}
