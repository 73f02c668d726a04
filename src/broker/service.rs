//! Host Broker
//!
//! Wires the registry, dispatcher, reader, subscription manager and router
//! together and exposes the five client operations plus state reads. Every
//! transport (TCP, in-process) funnels into [`Broker::handle_envelope`].

use std::collections::BTreeMap;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use tracing::debug;
use tracing::info;

use super::ActionDispatcher;
use super::EventRouter;
use super::EventSink;
use super::InstanceRegistry;
use super::PropertyReader;
use super::SessionId;
use super::SubscriptionManager;
use crate::metrics::ACTIVE_SESSIONS;
use crate::metrics::REQUESTS_TOTAL;
use crate::proto::InstanceId;
use crate::proto::Reply;
use crate::proto::Request;
use crate::proto::RequestEnvelope;
use crate::proto::ResponseEnvelope;
use crate::proto::Value;
use crate::BackendBinding;
use crate::BrokerError;
use crate::SessionConfig;

#[derive(Debug)]
pub struct Broker {
    session_config: SessionConfig,
    registry: Arc<InstanceRegistry>,
    dispatcher: ActionDispatcher,
    reader: PropertyReader,
    subscriptions: SubscriptionManager,
    router: Arc<EventRouter>,
    next_session: AtomicU64,
}

impl Broker {
    pub fn new(
        backend: BackendBinding,
        session_config: SessionConfig,
    ) -> Self {
        let registry = Arc::new(InstanceRegistry::new(Arc::new(backend)));
        let router = Arc::new(EventRouter::new());
        Self {
            session_config,
            dispatcher: ActionDispatcher::new(registry.clone()),
            reader: PropertyReader::new(registry.clone()),
            subscriptions: SubscriptionManager::new(registry.clone(), router.clone()),
            registry,
            router,
            next_session: AtomicU64::new(1),
        }
    }

    /// Attaches a client's outbound queue and returns its session id.
    pub fn open_session(
        &self,
        sink: EventSink,
    ) -> SessionId {
        let session = self.next_session.fetch_add(1, Ordering::Relaxed);
        self.router.attach(session, sink);
        ACTIVE_SESSIONS.inc();
        info!(session_id = session, "Session opened");
        session
    }

    /// Detaches a session. With `cleanup_on_disconnect`, every instance the
    /// session created is removed as well.
    pub fn close_session(
        &self,
        session: SessionId,
    ) {
        if !self.router.detach(session) {
            debug!(session_id = session, "Session already closed");
            return;
        }
        ACTIVE_SESSIONS.dec();
        self.registry.detach_session(session);

        if self.session_config.cleanup_on_disconnect {
            let owned = self.registry.owned_by(session);
            let count = owned.len();
            for id in owned {
                if let Err(e) = self.registry.remove(&id) {
                    debug!(instance_id = %id, "Cleanup skipped: {}", e);
                }
            }
            info!(session_id = session, removed = count, "Session closed, owned instances released");
        } else {
            info!(session_id = session, "Session closed");
        }
    }

    pub fn create_instance(
        &self,
        session: SessionId,
        type_name: &str,
    ) -> std::result::Result<InstanceId, BrokerError> {
        self.registry.create(type_name, session)
    }

    pub fn execute_action(
        &self,
        instance_id: &InstanceId,
        action_name: &str,
        args: Vec<Value>,
    ) -> std::result::Result<Value, BrokerError> {
        self.dispatcher.execute(instance_id, action_name, args)
    }

    pub fn read_property(
        &self,
        instance_id: &InstanceId,
        property_name: &str,
    ) -> std::result::Result<Value, BrokerError> {
        self.reader.read(instance_id, property_name)
    }

    pub fn read_state(
        &self,
        instance_id: &InstanceId,
    ) -> std::result::Result<BTreeMap<String, Value>, BrokerError> {
        self.reader.read_state(instance_id)
    }

    pub fn subscribe(
        &self,
        session: SessionId,
        instance_id: &InstanceId,
        property_name: &str,
    ) -> std::result::Result<(), BrokerError> {
        self.subscriptions.subscribe(session, instance_id, property_name)
    }

    /// Once this returns, no event of `instance_id` is routed anymore.
    pub fn remove_instance(
        &self,
        instance_id: &InstanceId,
    ) -> std::result::Result<(), BrokerError> {
        self.registry.remove(instance_id)
    }

    pub fn handle(
        &self,
        session: SessionId,
        request: Request,
    ) -> std::result::Result<Reply, BrokerError> {
        match request {
            Request::CreateInstance { type_name } => self
                .create_instance(session, &type_name)
                .map(|instance_id| Reply::Created { instance_id }),
            Request::ExecuteAction {
                instance_id,
                action_name,
                args,
            } => self
                .execute_action(&instance_id, &action_name, args)
                .map(|result| Reply::ActionResult { result }),
            Request::ReadProperty {
                instance_id,
                property_name,
            } => self
                .read_property(&instance_id, &property_name)
                .map(|value| Reply::PropertyValue { value }),
            Request::ReadState { instance_id } => self.read_state(&instance_id).map(|state| Reply::State { state }),
            Request::Subscribe {
                instance_id,
                property_name,
            } => self
                .subscribe(session, &instance_id, &property_name)
                .map(|_| Reply::Ok),
            Request::RemoveInstance { instance_id } => self.remove_instance(&instance_id).map(|_| Reply::Ok),
        }
    }

    /// Handles one request and wraps the outcome for the wire.
    pub fn handle_envelope(
        &self,
        session: SessionId,
        envelope: RequestEnvelope,
    ) -> ResponseEnvelope {
        let RequestEnvelope { request_id, request } = envelope;
        let operation = request.operation();
        debug!(session_id = session, request_id, operation, "Handling request");

        match self.handle(session, request) {
            Ok(reply) => {
                REQUESTS_TOTAL.with_label_values(&[operation, "success"]).inc();
                ResponseEnvelope::success(request_id, reply)
            }
            Err(e) => {
                REQUESTS_TOTAL.with_label_values(&[operation, e.code().as_str()]).inc();
                debug!(session_id = session, request_id, operation, "Request failed: {}", e);
                ResponseEnvelope::failure(request_id, (&e).into())
            }
        }
    }

    pub fn instance_count(&self) -> usize {
        self.registry.len()
    }

    pub fn session_count(&self) -> usize {
        self.router.session_count()
    }

    /// Instances created by `session` that are still live
    pub fn instances_of(
        &self,
        session: SessionId,
    ) -> Vec<InstanceId> {
        let mut ids = self.registry.owned_by(session);
        ids.sort();
        ids
    }

    pub(crate) fn registry(&self) -> &Arc<InstanceRegistry> {
        &self.registry
    }
}
