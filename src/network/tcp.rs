//! TCP transport.
//!
//! Host side: [`serve`] accepts connections and bridges each socket to a
//! [`run_session`] driver through a pair of channels. Client side:
//! [`connect`] performs the same bridging in the other direction, so
//! [`BrokerClient`](crate::BrokerClient) only ever sees a [`Connection`].
//!
//! Frames that fail to decode are logged and skipped; the connection stays
//! open.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures::SinkExt;
use futures::StreamExt;
use tokio::net::TcpListener;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::sync::watch;
use tokio_util::codec::FramedRead;
use tokio_util::codec::FramedWrite;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use super::decode_frame;
use super::encode_frame;
use super::frame_codec;
use super::run_session;
use super::Connection;
use crate::proto::RequestEnvelope;
use crate::proto::ServerMessage;
use crate::Broker;
use crate::NetworkError;
use crate::Result;
use crate::ServerConfig;

pub async fn bind(config: &ServerConfig) -> Result<TcpListener> {
    let addr = config.socket_addr()?;
    let listener = TcpListener::bind(addr).await.map_err(NetworkError::Io)?;
    info!(%addr, "Broker listening");
    Ok(listener)
}

/// Accepts clients until `shutdown` fires.
pub async fn serve(
    listener: TcpListener,
    broker: Arc<Broker>,
    config: ServerConfig,
    mut shutdown: watch::Receiver<()>,
) -> Result<()> {
    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                warn!("Shutdown signal received, listener stops accepting");
                return Ok(());
            }
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, peer)) => {
                        let broker = broker.clone();
                        let config = config.clone();
                        tokio::spawn(async move {
                            handle_connection(stream, peer, broker, config).await;
                        });
                    }
                    Err(e) => {
                        error!("accept failed: {:?}", e);
                    }
                }
            }
        }
    }
}

async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    broker: Arc<Broker>,
    config: ServerConfig,
) {
    info!(%peer, "Client connected");
    if let Err(e) = stream.set_nodelay(true) {
        debug!(%peer, "set_nodelay failed: {}", e);
    }
    let (read_half, write_half) = stream.into_split();

    let (request_tx, request_rx) = mpsc::channel::<RequestEnvelope>(config.request_concurrency.max(1));
    let (message_tx, mut message_rx) = mpsc::unbounded_channel::<ServerMessage>();

    let session = tokio::spawn(run_session(broker, request_rx, message_tx, config.request_concurrency));

    let mut writer = FramedWrite::new(write_half, frame_codec(config.max_frame_length));
    let write_task = tokio::spawn(async move {
        while let Some(message) = message_rx.recv().await {
            let frame = match encode_frame(&message) {
                Ok(frame) => frame,
                Err(e) => {
                    error!(%peer, "could not encode server message: {}", e);
                    continue;
                }
            };
            if let Err(e) = writer.send(frame).await {
                debug!(%peer, "write failed, dropping connection: {}", e);
                break;
            }
        }
    });

    let mut reader = FramedRead::new(read_half, frame_codec(config.max_frame_length));
    while let Some(frame) = reader.next().await {
        let frame = match frame {
            Ok(frame) => frame,
            Err(e) => {
                warn!(%peer, "read failed: {}", e);
                break;
            }
        };
        match decode_frame::<RequestEnvelope>(&frame) {
            Ok(envelope) => {
                if request_tx.send(envelope).await.is_err() {
                    break;
                }
            }
            Err(e) => warn!(%peer, len = frame.len(), "Malformed request frame dropped: {}", e),
        }
    }
    drop(request_tx);

    match session.await {
        Ok(session_id) => info!(%peer, session_id, "Client disconnected"),
        Err(e) => error!(%peer, "session task failed: {:?}", e),
    }
    if let Err(e) = write_task.await {
        error!(%peer, "writer task failed: {:?}", e);
    }
}

/// Opens a client connection to a broker host.
pub async fn connect(
    addr: SocketAddr,
    connect_timeout: Duration,
    max_frame_length: usize,
    request_buffer: usize,
) -> std::result::Result<Connection, NetworkError> {
    let stream = tokio::time::timeout(connect_timeout, TcpStream::connect(addr))
        .await
        .map_err(|_| NetworkError::Timeout(connect_timeout))??;
    if let Err(e) = stream.set_nodelay(true) {
        debug!(%addr, "set_nodelay failed: {}", e);
    }
    let (read_half, write_half) = stream.into_split();

    let (request_tx, mut request_rx) = mpsc::channel::<RequestEnvelope>(request_buffer.max(1));
    let (message_tx, message_rx) = mpsc::unbounded_channel::<ServerMessage>();

    let mut writer = FramedWrite::new(write_half, frame_codec(max_frame_length));
    tokio::spawn(async move {
        while let Some(envelope) = request_rx.recv().await {
            let frame = match encode_frame(&envelope) {
                Ok(frame) => frame,
                Err(e) => {
                    error!(request_id = envelope.request_id, "could not encode request: {}", e);
                    continue;
                }
            };
            if let Err(e) = writer.send(frame).await {
                warn!(%addr, "write failed: {}", e);
                break;
            }
        }
        debug!(%addr, "Request writer finished");
    });

    let mut reader = FramedRead::new(read_half, frame_codec(max_frame_length));
    tokio::spawn(async move {
        while let Some(frame) = reader.next().await {
            let frame = match frame {
                Ok(frame) => frame,
                Err(e) => {
                    warn!(%addr, "read failed: {}", e);
                    break;
                }
            };
            match decode_frame::<ServerMessage>(&frame) {
                Ok(message) => {
                    if message_tx.send(message).is_err() {
                        break;
                    }
                }
                Err(e) => warn!(%addr, len = frame.len(), "Malformed server frame dropped: {}", e),
            }
        }
        debug!(%addr, "Server stream ended");
    });

    Ok(Connection {
        requests: request_tx,
        messages: message_rx,
    })
}
