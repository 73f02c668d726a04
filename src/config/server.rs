use std::net::SocketAddr;

use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Host listener settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerConfig {
    /// Socket address the TCP transport binds to
    #[serde(default = "default_listen_address")]
    pub listen_address: String,

    /// Largest accepted frame in bytes (both directions)
    #[serde(default = "default_max_frame_length")]
    pub max_frame_length: usize,

    /// Requests of one session allowed in flight at once
    #[serde(default = "default_request_concurrency")]
    pub request_concurrency: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_address: default_listen_address(),
            max_frame_length: default_max_frame_length(),
            request_concurrency: default_request_concurrency(),
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> Result<()> {
        self.socket_addr()?;

        if self.max_frame_length < 1024 {
            return Err(Error::InvalidConfig(format!(
                "server.max_frame_length {} is below the 1024 byte minimum",
                self.max_frame_length
            )));
        }

        if self.request_concurrency == 0 {
            return Err(Error::InvalidConfig("server.request_concurrency must be > 0".into()));
        }

        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        self.listen_address.parse().map_err(|e| {
            Error::InvalidConfig(format!(
                "server.listen_address '{}' is not a socket address: {}",
                self.listen_address, e
            ))
        })
    }
}

fn default_listen_address() -> String {
    "127.0.0.1:9470".to_string()
}

fn default_max_frame_length() -> usize {
    8 * 1024 * 1024
}

fn default_request_concurrency() -> usize {
    64
}
