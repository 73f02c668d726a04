use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ClientConfig {
    /// TCP connect timeout in milliseconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_in_ms: u64,

    /// Time a request may wait for its response in milliseconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_in_ms: u64,

    /// Outbound request queue depth
    #[serde(default = "default_event_buffer_size")]
    pub event_buffer_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout_in_ms: default_connect_timeout(),
            request_timeout_in_ms: default_request_timeout(),
            event_buffer_size: default_event_buffer_size(),
        }
    }
}

impl ClientConfig {
    pub fn validate(&self) -> Result<()> {
        if self.connect_timeout_in_ms == 0 || self.request_timeout_in_ms == 0 {
            return Err(Error::InvalidConfig("client timeouts must be > 0".into()));
        }
        if self.event_buffer_size == 0 {
            return Err(Error::InvalidConfig("client.event_buffer_size must be > 0".into()));
        }
        Ok(())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_in_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_in_ms)
    }
}

fn default_connect_timeout() -> u64 {
    3000
}

fn default_request_timeout() -> u64 {
    5000
}

fn default_event_buffer_size() -> usize {
    1024
}
