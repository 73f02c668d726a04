//! Instance Registry
//!
//! Maps broker-generated [`InstanceId`]s to live handles and owns every
//! handle from creation to explicit removal. Nothing expires on its own.

use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use dashmap::DashMap;
use nanoid::nanoid;
use parking_lot::Mutex;
use tracing::debug;
use tracing::info;

use super::Instance;
use super::SessionId;
use crate::metrics::LIVE_INSTANCES;
use crate::proto::InstanceId;
use crate::BackendBinding;
use crate::BrokerError;

const ID_PREFIX: &str = "vm";
const ID_SUFFIX_LEN: usize = 8;

#[derive(Debug)]
pub struct InstanceRegistry {
    backend: Arc<BackendBinding>,
    instances: DashMap<InstanceId, Arc<Instance>>,
    next_seq: AtomicU64,
    /// create/remove are serialized
    mutation: Mutex<()>,
}

impl InstanceRegistry {
    pub fn new(backend: Arc<BackendBinding>) -> Self {
        Self {
            backend,
            instances: DashMap::new(),
            next_seq: AtomicU64::new(1),
            mutation: Mutex::new(()),
        }
    }

    /// Creates a backend object of `type_name` and registers it for `owner`.
    pub fn create(
        &self,
        type_name: &str,
        owner: SessionId,
    ) -> std::result::Result<InstanceId, BrokerError> {
        if type_name.trim().is_empty() {
            return Err(BrokerError::MalformedRequest("type name cannot be empty".into()));
        }

        let handle = self.backend.create_instance(type_name)?;

        let _guard = self.mutation.lock();
        let id = self.generate_id();
        let instance = Instance::new(id.clone(), type_name.to_string(), owner, handle);
        self.instances.insert(id.clone(), Arc::new(instance));
        LIVE_INSTANCES.inc();

        info!(instance_id = %id, %type_name, session_id = owner, "Instance created");
        Ok(id)
    }

    pub fn lookup(
        &self,
        id: &InstanceId,
    ) -> std::result::Result<Arc<Instance>, BrokerError> {
        self.instances
            .get(id)
            .map(|entry| entry.value().clone())
            .filter(|instance| instance.is_live())
            .ok_or_else(|| BrokerError::InstanceNotFound(id.clone()))
    }

    /// Deletes the entry, retires its subscriptions and releases the handle.
    ///
    /// The handle itself is dropped once the last in-flight call holding the
    /// entry returns.
    pub fn remove(
        &self,
        id: &InstanceId,
    ) -> std::result::Result<(), BrokerError> {
        let _guard = self.mutation.lock();
        let (_, instance) = self
            .instances
            .remove(id)
            .ok_or_else(|| BrokerError::InstanceNotFound(id.clone()))?;

        instance.retire();
        LIVE_INSTANCES.dec();

        info!(instance_id = %id, type_name = instance.type_name(), "Instance removed");
        Ok(())
    }

    pub fn contains(
        &self,
        id: &InstanceId,
    ) -> bool {
        self.instances.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Ids of every instance created by `session`
    pub fn owned_by(
        &self,
        session: SessionId,
    ) -> Vec<InstanceId> {
        self.instances
            .iter()
            .filter(|entry| entry.value().owner() == session)
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Removes `session` from the subscriber sets of every instance.
    pub fn detach_session(
        &self,
        session: SessionId,
    ) {
        let instances: Vec<Arc<Instance>> = self.instances.iter().map(|e| e.value().clone()).collect();
        for instance in instances {
            instance.detach_session(session);
        }
        debug!(session_id = session, "Session detached from all subscriptions");
    }

    fn generate_id(&self) -> InstanceId {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        InstanceId::new(format!("{}-{}-{}", ID_PREFIX, seq, nanoid!(ID_SUFFIX_LEN)))
    }
}
