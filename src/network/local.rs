use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::debug;

use super::run_session;
use super::Connection;
use crate::Broker;

/// Connects a client to a broker living in the same process.
///
/// Frames never get serialized; requests and server messages travel through
/// channels. The session ends when the returned [`Connection`]'s request
/// sender is dropped.
pub fn connect_in_process(
    broker: Arc<Broker>,
    request_concurrency: usize,
    request_buffer: usize,
) -> Connection {
    let (request_tx, request_rx) = mpsc::channel(request_buffer.max(1));
    let (message_tx, message_rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let session = run_session(broker, request_rx, message_tx, request_concurrency).await;
        debug!(session_id = session, "In-process session finished");
    });

    Connection {
        requests: request_tx,
        messages: message_rx,
    }
}
