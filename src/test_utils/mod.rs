//! Helpers shared by the unit tests of every module.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::network::encode_frame;
use crate::proto::InstanceId;
use crate::proto::PropertyChanged;
use crate::proto::Request;
use crate::proto::RequestEnvelope;
use crate::proto::ResponseEnvelope;
use crate::proto::ServerMessage;
use crate::proto::Value;
use crate::BackendBinding;
use crate::Broker;
use crate::BuiltinProvider;
use crate::SessionConfig;
use crate::SessionId;

pub(crate) fn counter_binding() -> BackendBinding {
    BackendBinding::with_provider(Arc::new(BuiltinProvider::with_defaults()))
}

pub(crate) fn counter_broker() -> Arc<Broker> {
    Arc::new(Broker::new(counter_binding(), SessionConfig::default()))
}

pub(crate) fn counter_broker_with(session_config: SessionConfig) -> Arc<Broker> {
    Arc::new(Broker::new(counter_binding(), session_config))
}

/// Opens a session whose outbound queue the test reads directly.
pub(crate) fn open_session(broker: &Broker) -> (SessionId, mpsc::UnboundedReceiver<ServerMessage>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (broker.open_session(tx), rx)
}

/// Everything queued so far, without waiting.
pub(crate) fn drain(rx: &mut mpsc::UnboundedReceiver<ServerMessage>) -> Vec<ServerMessage> {
    let mut messages = Vec::new();
    while let Ok(message) = rx.try_recv() {
        messages.push(message);
    }
    messages
}

pub(crate) fn drain_events(rx: &mut mpsc::UnboundedReceiver<ServerMessage>) -> Vec<PropertyChanged> {
    drain(rx)
        .into_iter()
        .filter_map(|message| match message {
            ServerMessage::PropertyChanged(event) => Some(event),
            ServerMessage::Response(_) => None,
        })
        .collect()
}

/// Waits for the next response, skipping pushed events.
pub(crate) async fn next_response(rx: &mut mpsc::UnboundedReceiver<ServerMessage>) -> ResponseEnvelope {
    loop {
        let message = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("response in time")
            .expect("channel open");
        if let ServerMessage::Response(response) = message {
            return response;
        }
    }
}

/// Bincode payload of an `ExecuteAction` whose only argument is `depth`
/// arrays wrapped around a null. Built byte by byte so that neither
/// encoding nor dropping it recurses.
pub(crate) fn nested_args_payload(
    request_id: u64,
    depth: usize,
) -> Vec<u8> {
    let envelope = RequestEnvelope {
        request_id,
        request: Request::ExecuteAction {
            instance_id: InstanceId::from("vm-0-nested"),
            action_name: "add".into(),
            args: vec![Value::Null],
        },
    };
    let mut bytes = encode_frame(&envelope).unwrap().to_vec();
    // The trailing null is the last four bytes: its u32 variant index
    let null = bytes.split_off(bytes.len() - 4);
    bytes.reserve(depth * 12 + null.len());
    for _ in 0..depth {
        bytes.extend_from_slice(&5u32.to_le_bytes()); // Value::Array
        bytes.extend_from_slice(&1u64.to_le_bytes()); // one element
    }
    bytes.extend_from_slice(&null);
    bytes
}
