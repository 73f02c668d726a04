//! Session driver shared by every transport.
//!
//! Reads request envelopes from a channel, runs each on the blocking pool
//! and queues the response on the session's outbound sink. Requests of one
//! session may run concurrently up to `concurrency`; the client correlates
//! responses by `request_id`.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::Semaphore;
use tracing::debug;
use tracing::error;
use tracing::warn;

use crate::proto::RequestEnvelope;
use crate::proto::ServerMessage;
use crate::Broker;
use crate::EventSink;
use crate::SessionId;

/// Serves one client until its request channel closes, then closes the
/// session after every in-flight request has answered.
pub async fn run_session(
    broker: Arc<Broker>,
    mut inbound: mpsc::Receiver<RequestEnvelope>,
    outbound: EventSink,
    concurrency: usize,
) -> SessionId {
    let concurrency = concurrency.max(1);
    let session = broker.open_session(outbound.clone());
    let in_flight = Arc::new(Semaphore::new(concurrency));

    while let Some(envelope) = inbound.recv().await {
        let permit = match in_flight.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(e) => {
                error!(session_id = session, "Request limiter closed: {}", e);
                break;
            }
        };

        let broker = broker.clone();
        let outbound = outbound.clone();
        tokio::task::spawn_blocking(move || {
            let request_id = envelope.request_id;
            let response = broker.handle_envelope(session, envelope);
            if outbound.send(ServerMessage::Response(response)).is_err() {
                warn!(session_id = session, request_id, "Response dropped, client channel closed");
            }
            drop(permit);
        });
    }

    debug!(session_id = session, "Request stream ended, draining in-flight requests");
    if let Ok(all) = in_flight.acquire_many(concurrency as u32).await {
        drop(all);
    }
    broker.close_session(session);
    session
}
