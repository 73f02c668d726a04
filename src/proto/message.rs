use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use super::Value;

/// Broker-generated identifier of a live instance.
///
/// Clients must treat it as an opaque token: no structure or ordering may be
/// assumed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstanceId(String);

impl InstanceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for InstanceId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Client-to-host operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Request {
    CreateInstance {
        type_name: String,
    },
    ExecuteAction {
        instance_id: InstanceId,
        action_name: String,
        args: Vec<Value>,
    },
    ReadProperty {
        instance_id: InstanceId,
        property_name: String,
    },
    /// Snapshot of every property of an instance
    ReadState {
        instance_id: InstanceId,
    },
    Subscribe {
        instance_id: InstanceId,
        property_name: String,
    },
    RemoveInstance {
        instance_id: InstanceId,
    },
}

impl Request {
    /// Operation label used in logs and metrics
    pub fn operation(&self) -> &'static str {
        match self {
            Request::CreateInstance { .. } => "create_instance",
            Request::ExecuteAction { .. } => "execute_action",
            Request::ReadProperty { .. } => "read_property",
            Request::ReadState { .. } => "read_state",
            Request::Subscribe { .. } => "subscribe",
            Request::RemoveInstance { .. } => "remove_instance",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestEnvelope {
    /// Correlation key chosen by the client and echoed in the response
    pub request_id: u64,
    pub request: Request,
}

/// Success payloads, one per operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Reply {
    Created { instance_id: InstanceId },
    ActionResult { result: Value },
    PropertyValue { value: Value },
    State { state: BTreeMap<String, Value> },
    Ok,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    BackendUnavailable,
    UnknownType,
    InstanceNotFound,
    ActionNotFound,
    PropertyNotFound,
    ActionExecutionFailed,
    MalformedRequest,
    Internal,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::BackendUnavailable => "backend_unavailable",
            ErrorCode::UnknownType => "unknown_type",
            ErrorCode::InstanceNotFound => "instance_not_found",
            ErrorCode::ActionNotFound => "action_not_found",
            ErrorCode::PropertyNotFound => "property_not_found",
            ErrorCode::ActionExecutionFailed => "action_execution_failed",
            ErrorCode::MalformedRequest => "malformed_request",
            ErrorCode::Internal => "internal",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub code: ErrorCode,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Outcome {
    Success(Reply),
    Failure(ErrorPayload),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub request_id: u64,
    pub outcome: Outcome,
}

impl ResponseEnvelope {
    pub fn success(
        request_id: u64,
        reply: Reply,
    ) -> Self {
        Self {
            request_id,
            outcome: Outcome::Success(reply),
        }
    }

    pub fn failure(
        request_id: u64,
        error: ErrorPayload,
    ) -> Self {
        Self {
            request_id,
            outcome: Outcome::Failure(error),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Success(_))
    }
}

/// Unsolicited host-to-client notification of a property's new value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyChanged {
    pub instance_id: InstanceId,
    pub property_name: String,
    pub value: Value,
}

/// Every frame the host sends to a client.
///
/// Responses and pushes share one ordered stream per session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ServerMessage {
    Response(ResponseEnvelope),
    PropertyChanged(PropertyChanged),
}
