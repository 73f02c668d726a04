use serde::Deserialize;
use serde::Serialize;

use super::ServerConfig;
use crate::Error;
use crate::Result;

/// Prometheus exporter settings. The exporter serves `/metrics` on all
/// interfaces, next to the broker listener.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MonitoringConfig {
    #[serde(default)]
    pub prometheus_enabled: bool,

    #[serde(default = "default_prometheus_port")]
    pub prometheus_port: u16,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            prometheus_enabled: false,
            prometheus_port: default_prometheus_port(),
        }
    }
}

impl MonitoringConfig {
    /// The port is only checked while the exporter is enabled. It must be
    /// fixed (non-zero) and must not be the broker's own listen port.
    pub fn validate(
        &self,
        server: &ServerConfig,
    ) -> Result<()> {
        if !self.prometheus_enabled {
            return Ok(());
        }

        if self.prometheus_port == 0 {
            return Err(Error::InvalidConfig(
                "monitoring.prometheus_port must be set when the exporter is enabled".into(),
            ));
        }

        let listen = server.socket_addr()?;
        if listen.port() == self.prometheus_port {
            return Err(Error::InvalidConfig(format!(
                "monitoring.prometheus_port {} collides with server.listen_address {}",
                self.prometheus_port, listen
            )));
        }

        Ok(())
    }
}

fn default_prometheus_port() -> u16 {
    9471
}
