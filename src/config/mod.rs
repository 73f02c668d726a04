//! Configuration management for the broker host.
//!
//! Provides hierarchical configuration loading and validation with:
//! - Default values as code base
//! - Configuration file support (`CONFIG_PATH`)
//! - Environment variable overrides (`BROKER__SECTION__FIELD`)
//! - Component-wise validation
mod backend;
mod client;
mod log;
mod monitoring;
mod server;
mod session;
pub use backend::*;
pub use client::*;
pub use log::*;
pub use monitoring::*;
pub use server::*;
pub use session::*;

use std::env;

use config::Config;
use config::Environment;
use config::File;
use serde::Deserialize;
use serde::Serialize;

use crate::Result;

const ENV_PREFIX: &str = "BROKER";

/// Main configuration container for the broker host
///
/// Combines all subsystem configurations with hierarchical override support:
/// 1. Default values from code implementation
/// 2. Configuration file specified by `CONFIG_PATH`
/// 3. Environment variables (highest priority)
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct BrokerConfig {
    /// Listener and framing parameters
    #[serde(default)]
    pub server: ServerConfig,
    /// Per-client session policy
    #[serde(default)]
    pub session: SessionConfig,
    /// Native provider selection
    #[serde(default)]
    pub backend: BackendConfig,
    /// Defaults for [`BrokerClient`](crate::BrokerClient)
    #[serde(default)]
    pub client: ClientConfig,
    /// Prometheus exporter
    #[serde(default)]
    pub monitoring: MonitoringConfig,
    /// Log file location
    #[serde(default)]
    pub log: LogConfig,
}

impl BrokerConfig {
    /// Loads configuration from hierarchical sources without validation.
    ///
    /// Configuration sources are merged in the following order (later sources override earlier):
    /// 1. Type defaults (lowest priority)
    /// 2. Configuration file from `CONFIG_PATH` environment variable (if set)
    /// 3. Environment variables with `BROKER__` prefix (highest priority)
    ///
    /// # Note
    /// This method does NOT validate the configuration. Callers MUST call `validate()`
    /// before using the configuration.
    ///
    /// # Examples
    /// ```ignore
    /// std::env::set_var("CONFIG_PATH", "config/broker.toml");
    /// std::env::set_var("BROKER__SERVER__LISTEN_ADDRESS", "0.0.0.0:9470");
    /// let cfg = BrokerConfig::new()?.validate()?;
    /// ```
    pub fn new() -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if let Ok(config_path) = env::var("CONFIG_PATH") {
            builder = builder.add_source(File::with_name(&config_path).required(true));
        }

        builder = builder.add_source(environment());

        let config: Self = builder.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Applies additional configuration overrides from file without validation.
    ///
    /// Merging order (later sources override earlier):
    /// 1. Current configuration values
    /// 2. New configuration file
    /// 3. Latest environment variables (highest priority)
    pub fn with_override_config(
        &self,
        path: &str,
    ) -> Result<Self> {
        let config: Self = Config::builder()
            .add_source(Config::try_from(self)?)
            .add_source(File::with_name(path))
            .add_source(environment())
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    /// Validates configuration and returns validated instance.
    pub fn validate(self) -> Result<Self> {
        self.server.validate()?;
        self.session.validate()?;
        self.backend.validate()?;
        self.client.validate()?;
        self.monitoring.validate(&self.server)?;
        self.log.validate()?;
        Ok(self)
    }
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .ignore_empty(true)
        .try_parsing(true)
}
