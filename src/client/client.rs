use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio::sync::oneshot;
use tracing::debug;
use tracing::trace;
use tracing::warn;

use super::ClientBuilder;
use super::ClientError;
use super::ListenerGuard;
use super::PropertyCallback;
use super::PropertyObservers;
use super::RemoteInstance;
use crate::network::Connection;
use crate::proto::InstanceId;
use crate::proto::Outcome;
use crate::proto::Reply;
use crate::proto::Request;
use crate::proto::RequestEnvelope;
use crate::proto::ResponseEnvelope;
use crate::proto::ServerMessage;
use crate::proto::Value;

type PendingMap = DashMap<u64, oneshot::Sender<ResponseEnvelope>>;

/// Asynchronous handle to a broker session.
///
/// Cheap to clone; all clones share one session. The session ends when the
/// last clone is dropped.
#[derive(Clone)]
pub struct BrokerClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    requests: mpsc::Sender<RequestEnvelope>,
    pending: Arc<PendingMap>,
    /// Set by the reader task once the server stream has ended
    closed: Arc<AtomicBool>,
    next_request_id: AtomicU64,
    observers: PropertyObservers,
    /// (instance, property) pairs the broker already routes to this session
    subscribed: DashMap<(InstanceId, String), ()>,
    request_timeout: Duration,
}

impl fmt::Debug for BrokerClient {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("BrokerClient")
            .field("pending", &self.inner.pending.len())
            .field("request_timeout", &self.inner.request_timeout)
            .finish_non_exhaustive()
    }
}

impl BrokerClient {
    /// Create a configured client builder
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Wraps an established connection and starts its reader task.
    pub fn from_connection(
        connection: Connection,
        request_timeout: Duration,
    ) -> Self {
        let Connection { requests, messages } = connection;
        let pending = Arc::new(PendingMap::new());
        let observers = PropertyObservers::new();
        let closed = Arc::new(AtomicBool::new(false));

        tokio::spawn(read_server_messages(
            messages,
            pending.clone(),
            closed.clone(),
            observers.clone(),
        ));

        Self {
            inner: Arc::new(ClientInner {
                requests,
                pending,
                closed,
                next_request_id: AtomicU64::new(1),
                observers,
                subscribed: DashMap::new(),
                request_timeout,
            }),
        }
    }

    /// Sends one request and waits for its response.
    pub async fn request(
        &self,
        request: Request,
    ) -> std::result::Result<Reply, ClientError> {
        let request_id = self.inner.next_request_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.inner.pending.insert(request_id, tx);
        if self.inner.closed.load(Ordering::Acquire) {
            self.inner.pending.remove(&request_id);
            return Err(ClientError::ChannelClosed);
        }

        trace!(request_id, operation = request.operation(), "Sending request");
        if self
            .inner
            .requests
            .send(RequestEnvelope { request_id, request })
            .await
            .is_err()
        {
            self.inner.pending.remove(&request_id);
            return Err(ClientError::ChannelClosed);
        }

        let response = match tokio::time::timeout(self.inner.request_timeout, rx).await {
            Ok(Ok(response)) => response,
            Ok(Err(_)) => return Err(ClientError::ChannelClosed),
            Err(_) => {
                self.inner.pending.remove(&request_id);
                warn!(request_id, "Request timed out");
                return Err(ClientError::Timeout(self.inner.request_timeout));
            }
        };

        match response.outcome {
            Outcome::Success(reply) => Ok(reply),
            Outcome::Failure(payload) => Err(payload.into()),
        }
    }

    pub async fn create_instance(
        &self,
        type_name: &str,
    ) -> std::result::Result<InstanceId, ClientError> {
        match self
            .request(Request::CreateInstance {
                type_name: type_name.to_string(),
            })
            .await?
        {
            Reply::Created { instance_id } => Ok(instance_id),
            other => Err(unexpected("create_instance", other)),
        }
    }

    /// Creates an instance and wraps it in a proxy.
    pub async fn create(
        &self,
        type_name: &str,
    ) -> std::result::Result<RemoteInstance, ClientError> {
        let instance_id = self.create_instance(type_name).await?;
        Ok(RemoteInstance::new(self.clone(), instance_id, type_name.to_string()))
    }

    pub async fn execute_action(
        &self,
        instance_id: &InstanceId,
        action_name: &str,
        args: Vec<Value>,
    ) -> std::result::Result<Value, ClientError> {
        match self
            .request(Request::ExecuteAction {
                instance_id: instance_id.clone(),
                action_name: action_name.to_string(),
                args,
            })
            .await?
        {
            Reply::ActionResult { result } => Ok(result),
            other => Err(unexpected("execute_action", other)),
        }
    }

    pub async fn read_property(
        &self,
        instance_id: &InstanceId,
        property_name: &str,
    ) -> std::result::Result<Value, ClientError> {
        match self
            .request(Request::ReadProperty {
                instance_id: instance_id.clone(),
                property_name: property_name.to_string(),
            })
            .await?
        {
            Reply::PropertyValue { value } => Ok(value),
            other => Err(unexpected("read_property", other)),
        }
    }

    pub async fn read_state(
        &self,
        instance_id: &InstanceId,
    ) -> std::result::Result<BTreeMap<String, Value>, ClientError> {
        match self
            .request(Request::ReadState {
                instance_id: instance_id.clone(),
            })
            .await?
        {
            Reply::State { state } => Ok(state),
            other => Err(unexpected("read_state", other)),
        }
    }

    /// Asks the broker to route changes of `property_name` to this session.
    ///
    /// Prefer [`add_property_listener`](Self::add_property_listener), which
    /// subscribes on first use and fans events out locally.
    pub async fn subscribe(
        &self,
        instance_id: &InstanceId,
        property_name: &str,
    ) -> std::result::Result<(), ClientError> {
        match self
            .request(Request::Subscribe {
                instance_id: instance_id.clone(),
                property_name: property_name.to_string(),
            })
            .await?
        {
            Reply::Ok => {
                self.inner
                    .subscribed
                    .insert((instance_id.clone(), property_name.to_string()), ());
                Ok(())
            }
            other => Err(unexpected("subscribe", other)),
        }
    }

    /// Registers a local listener. Only the first listener of a pair sends
    /// `Subscribe` to the broker.
    pub async fn add_property_listener<F>(
        &self,
        instance_id: &InstanceId,
        property_name: &str,
        callback: F,
    ) -> std::result::Result<ListenerGuard, ClientError>
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        let callback: PropertyCallback = Arc::new(callback);
        let guard = self.inner.observers.add(instance_id, property_name, callback);

        let key = (instance_id.clone(), property_name.to_string());
        if !self.inner.subscribed.contains_key(&key) {
            // The guard is dropped with the error, removing the listener.
            self.subscribe(instance_id, property_name).await?;
        }
        Ok(guard)
    }

    /// Removes the instance on the broker and drops its local listeners.
    pub async fn remove_instance(
        &self,
        instance_id: &InstanceId,
    ) -> std::result::Result<(), ClientError> {
        let reply = self
            .request(Request::RemoveInstance {
                instance_id: instance_id.clone(),
            })
            .await;

        self.inner.observers.forget_instance(instance_id);
        self.inner.subscribed.retain(|(id, _), _| id != instance_id);

        match reply? {
            Reply::Ok => Ok(()),
            other => Err(unexpected("remove_instance", other)),
        }
    }

    pub fn listener_count(
        &self,
        instance_id: &InstanceId,
        property_name: &str,
    ) -> usize {
        self.inner.observers.listener_count(instance_id, property_name)
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Requests still waiting for a response
    pub fn pending_requests(&self) -> usize {
        self.inner.pending.len()
    }
}

fn unexpected(
    operation: &'static str,
    reply: Reply,
) -> ClientError {
    ClientError::UnexpectedReply {
        operation,
        reply: format!("{reply:?}"),
    }
}

/// Resolves pending requests and fans pushed events out to local
/// listeners until the connection closes.
async fn read_server_messages(
    mut messages: mpsc::UnboundedReceiver<ServerMessage>,
    pending: Arc<PendingMap>,
    closed: Arc<AtomicBool>,
    observers: PropertyObservers,
) {
    while let Some(message) = messages.recv().await {
        match message {
            ServerMessage::Response(response) => match pending.remove(&response.request_id) {
                Some((_, tx)) => {
                    if tx.send(response).is_err() {
                        debug!("Caller gave up before the response arrived");
                    }
                }
                None => debug!(request_id = response.request_id, "Late or unknown response dropped"),
            },
            ServerMessage::PropertyChanged(event) => {
                observers.dispatch(&event);
            }
        }
    }

    debug!(pending = pending.len(), "Broker connection closed, failing pending requests");
    closed.store(true, Ordering::Release);
    pending.clear();
}
