use serde::Deserialize;
use serde::Serialize;

use crate::Result;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SessionConfig {
    /// Remove every instance a session created once it disconnects
    #[serde(default = "default_cleanup_on_disconnect")]
    pub cleanup_on_disconnect: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cleanup_on_disconnect: default_cleanup_on_disconnect(),
        }
    }
}

impl SessionConfig {
    pub fn validate(&self) -> Result<()> {
        Ok(())
    }
}

fn default_cleanup_on_disconnect() -> bool {
    true
}
