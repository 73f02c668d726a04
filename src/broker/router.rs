//! Event Router
//!
//! Pushes property change events to the outbound queues of attached
//! sessions. A session's queue also carries its responses, so a client sees
//! events and replies in the order the host produced them.
//!
//! Delivery to a session whose queue is gone is dropped and logged; there is
//! no request to fail.

use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::debug;
use tracing::trace;
use tracing::warn;

use crate::metrics::EVENTS_DROPPED;
use crate::metrics::EVENTS_ROUTED;
use crate::proto::PropertyChanged;
use crate::proto::ServerMessage;

/// Broker-local identifier of a client session
pub type SessionId = u64;

/// Outbound queue of one session
pub type EventSink = mpsc::UnboundedSender<ServerMessage>;

#[derive(Debug, Default)]
pub struct EventRouter {
    sinks: DashMap<SessionId, EventSink>,
}

impl EventRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(
        &self,
        session: SessionId,
        sink: EventSink,
    ) {
        self.sinks.insert(session, sink);
        debug!(session_id = session, "Session sink attached");
    }

    /// Returns false if the session was not attached.
    pub fn detach(
        &self,
        session: SessionId,
    ) -> bool {
        let removed = self.sinks.remove(&session).is_some();
        debug!(session_id = session, removed, "Session sink detached");
        removed
    }

    pub fn is_attached(
        &self,
        session: SessionId,
    ) -> bool {
        self.sinks.contains_key(&session)
    }

    pub fn session_count(&self) -> usize {
        self.sinks.len()
    }

    /// Delivers `event` once to each of `sessions`.
    ///
    /// Returns the number of sessions the event was queued for.
    pub fn route<'a>(
        &self,
        event: &PropertyChanged,
        sessions: impl IntoIterator<Item = &'a SessionId>,
    ) -> usize {
        let mut delivered = 0;
        for session in sessions {
            let Some(sink) = self.sinks.get(session) else {
                EVENTS_DROPPED.with_label_values(&["detached"]).inc();
                debug!(session_id = *session, instance_id = %event.instance_id, "Dropping event for detached session");
                continue;
            };

            if sink.send(ServerMessage::PropertyChanged(event.clone())).is_err() {
                EVENTS_DROPPED.with_label_values(&["disconnected"]).inc();
                warn!(
                    session_id = *session,
                    instance_id = %event.instance_id,
                    property = %event.property_name,
                    "Client channel closed, event dropped"
                );
                continue;
            }

            EVENTS_ROUTED.inc();
            delivered += 1;
        }

        trace!(
            instance_id = %event.instance_id,
            property = %event.property_name,
            delivered,
            "Event routed"
        );
        delivered
    }
}
