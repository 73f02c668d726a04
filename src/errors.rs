//! Broker error hierarchy
//!
//! Client-facing failures live in [`BrokerError`] and are always converted
//! into a structured [`ErrorPayload`] before crossing the process boundary.
//! Infrastructure failures (transport, configuration) stay on the host side.

use std::time::Duration;

use config::ConfigError;
use tokio::task::JoinError;

use crate::proto::ErrorCode;
use crate::proto::ErrorPayload;
use crate::proto::InstanceId;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Failures reported back to the requesting client
    #[error(transparent)]
    Broker(#[from] BrokerError),

    /// Transport-level failures (socket, framing, closed channels)
    #[error(transparent)]
    Network(#[from] NetworkError),

    /// Configuration loading failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Configuration validation failures
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Unrecoverable failures requiring process termination
    #[error("Fatal error: {0}")]
    Fatal(String),
}

/// Failures of the five broker operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BrokerError {
    /// The native provider failed to initialize; sticky until restart
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Unknown view-model type: {0}")]
    UnknownType(String),

    #[error("Instance not found: {0}")]
    InstanceNotFound(InstanceId),

    #[error("Action '{action}' not found on instance {instance_id}")]
    ActionNotFound { instance_id: InstanceId, action: String },

    #[error("Property '{property}' not found on instance {instance_id}")]
    PropertyNotFound { instance_id: InstanceId, property: String },

    #[error("Action execution failed: {0}")]
    ActionExecutionFailed(String),

    #[error("Malformed request: {0}")]
    MalformedRequest(String),
}

impl BrokerError {
    pub fn code(&self) -> ErrorCode {
        match self {
            BrokerError::BackendUnavailable(_) => ErrorCode::BackendUnavailable,
            BrokerError::UnknownType(_) => ErrorCode::UnknownType,
            BrokerError::InstanceNotFound(_) => ErrorCode::InstanceNotFound,
            BrokerError::ActionNotFound { .. } => ErrorCode::ActionNotFound,
            BrokerError::PropertyNotFound { .. } => ErrorCode::PropertyNotFound,
            BrokerError::ActionExecutionFailed(_) => ErrorCode::ActionExecutionFailed,
            BrokerError::MalformedRequest(_) => ErrorCode::MalformedRequest,
        }
    }
}

impl From<&BrokerError> for ErrorPayload {
    fn from(e: &BrokerError) -> Self {
        ErrorPayload {
            code: e.code(),
            message: e.to_string(),
        }
    }
}

/// What a provider or handle reports. The broker attaches the instance
/// context when lifting it into a [`BrokerError`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    #[error("provider initialization failed: {0}")]
    InitFailed(String),

    #[error("unknown type: {0}")]
    UnknownType(String),

    #[error("action not found: {0}")]
    ActionNotFound(String),

    #[error("property not found: {0}")]
    PropertyNotFound(String),

    #[error("{0}")]
    ExecutionFailed(String),
}

impl BackendError {
    pub(crate) fn into_broker_error(
        self,
        instance_id: &InstanceId,
    ) -> BrokerError {
        match self {
            BackendError::InitFailed(msg) => BrokerError::BackendUnavailable(msg),
            BackendError::UnknownType(name) => BrokerError::UnknownType(name),
            BackendError::ActionNotFound(action) => BrokerError::ActionNotFound {
                instance_id: instance_id.clone(),
                action,
            },
            BackendError::PropertyNotFound(property) => BrokerError::PropertyNotFound {
                instance_id: instance_id.clone(),
                property,
            },
            BackendError::ExecutionFailed(msg) => BrokerError::ActionExecutionFailed(msg),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Frame payload could not be encoded or decoded
    #[error("Codec error: {0}")]
    Codec(#[from] bincode::Error),

    #[error("Invalid listen address: {0}")]
    InvalidAddress(String),

    /// Peer or session task went away
    #[error("Channel closed: {0}")]
    ChannelClosed(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Background task failed: {0}")]
    TaskFailed(#[from] JoinError),

    #[error("{0}")]
    SignalSendFailed(String),
}
