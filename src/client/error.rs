use std::time::Duration;

use crate::proto::ErrorCode;
use crate::proto::ErrorPayload;
use crate::NetworkError;

/// Failures seen by a [`BrokerClient`](super::BrokerClient) caller.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ClientError {
    /// The broker answered with a structured failure
    #[error("{}: {message}", code.as_str())]
    Broker { code: ErrorCode, message: String },

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// The connection went away before the response arrived
    #[error("Connection to broker closed")]
    ChannelClosed,

    #[error("Connect failed: {0}")]
    Connect(String),

    /// The broker answered with a reply of the wrong kind
    #[error("Unexpected reply to {operation}: {reply}")]
    UnexpectedReply { operation: &'static str, reply: String },
}

impl ClientError {
    /// Broker error code, if the failure came from the broker
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            ClientError::Broker { code, .. } => Some(*code),
            _ => None,
        }
    }
}

impl From<ErrorPayload> for ClientError {
    fn from(payload: ErrorPayload) -> Self {
        ClientError::Broker {
            code: payload.code,
            message: payload.message,
        }
    }
}

impl From<NetworkError> for ClientError {
    fn from(e: NetworkError) -> Self {
        match e {
            NetworkError::Timeout(after) => ClientError::Timeout(after),
            NetworkError::ChannelClosed(_) => ClientError::ChannelClosed,
            other => ClientError::Connect(other.to_string()),
        }
    }
}
