use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Which native provider the broker loads on first use
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BackendConfig {
    /// Provider name, resolved by [`ConfiguredLoader`](crate::ConfiguredLoader)
    #[serde(default = "default_provider")]
    pub provider: String,

    /// View-model types exposed to clients; empty exposes all
    #[serde(default)]
    pub enabled_types: Vec<String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            enabled_types: Vec::new(),
        }
    }
}

impl BackendConfig {
    pub fn validate(&self) -> Result<()> {
        if self.provider.trim().is_empty() {
            return Err(Error::InvalidConfig("backend.provider cannot be empty".into()));
        }
        if self.enabled_types.iter().any(|t| t.trim().is_empty()) {
            return Err(Error::InvalidConfig(
                "backend.enabled_types cannot contain empty names".into(),
            ));
        }
        Ok(())
    }
}

fn default_provider() -> String {
    "builtin".to_string()
}
