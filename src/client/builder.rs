use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use super::BrokerClient;
use super::ClientError;
use crate::network::connect;
use crate::network::connect_in_process;
use crate::Broker;
use crate::ClientConfig;
use crate::ServerConfig;

pub struct ClientBuilder {
    config: ClientConfig,
    max_frame_length: usize,
    request_concurrency: usize,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        let server = ServerConfig::default();
        Self {
            config: ClientConfig::default(),
            max_frame_length: server.max_frame_length,
            request_concurrency: server.request_concurrency,
        }
    }
}

impl ClientBuilder {
    /// Create a new builder with default config
    pub fn new() -> Self {
        Self::default()
    }

    /// Set connection timeout (default: 3s)
    pub fn connect_timeout(
        mut self,
        timeout: Duration,
    ) -> Self {
        self.config.connect_timeout_in_ms = timeout.as_millis() as u64;
        self
    }

    /// Set request timeout (default: 5s)
    pub fn request_timeout(
        mut self,
        timeout: Duration,
    ) -> Self {
        self.config.request_timeout_in_ms = timeout.as_millis() as u64;
        self
    }

    /// Must not exceed the host's `server.max_frame_length`
    pub fn max_frame_length(
        mut self,
        max_frame_length: usize,
    ) -> Self {
        self.max_frame_length = max_frame_length;
        self
    }

    /// Completely replaces the default configuration
    ///
    /// Discards anything set through
    /// [`connect_timeout`](ClientBuilder::connect_timeout) or
    /// [`request_timeout`](ClientBuilder::request_timeout).
    pub fn set_config(
        mut self,
        config: ClientConfig,
    ) -> Self {
        self.config = config;
        self
    }

    /// Connects to a broker host over TCP.
    pub async fn connect(
        self,
        addr: SocketAddr,
    ) -> std::result::Result<BrokerClient, ClientError> {
        let connection = connect(
            addr,
            self.config.connect_timeout(),
            self.max_frame_length,
            self.config.event_buffer_size,
        )
        .await?;
        info!(%addr, "Connected to broker");
        Ok(BrokerClient::from_connection(connection, self.config.request_timeout()))
    }

    /// Opens a session on a broker in the same process.
    pub fn in_process(
        self,
        broker: Arc<Broker>,
    ) -> BrokerClient {
        let connection = connect_in_process(broker, self.request_concurrency, self.config.event_buffer_size);
        BrokerClient::from_connection(connection, self.config.request_timeout())
    }
}
