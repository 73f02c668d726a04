use std::collections::HashMap;
use std::collections::HashSet;
use std::fmt;

use parking_lot::RwLock;

use super::SessionId;
use crate::proto::InstanceId;
use crate::ViewModelHandle;

/// Registry entry: one live business object and its subscription set.
pub struct Instance {
    id: InstanceId,
    type_name: String,
    owner: SessionId,
    handle: Box<dyn ViewModelHandle>,
    subscriptions: RwLock<SubscriptionSet>,
}

/// Per-instance subscription state.
///
/// A key in `properties` means the native callback for that property is
/// registered on the handle; the value is the set of sessions it routes to.
/// `live` flips to false exactly once, under the write lock, on removal.
#[derive(Debug)]
pub(crate) struct SubscriptionSet {
    pub(crate) live: bool,
    pub(crate) properties: HashMap<String, HashSet<SessionId>>,
}

impl fmt::Debug for Instance {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("Instance")
            .field("id", &self.id)
            .field("type_name", &self.type_name)
            .field("owner", &self.owner)
            .field("subscriptions", &*self.subscriptions.read())
            .finish_non_exhaustive()
    }
}

impl Instance {
    pub(crate) fn new(
        id: InstanceId,
        type_name: String,
        owner: SessionId,
        handle: Box<dyn ViewModelHandle>,
    ) -> Self {
        Self {
            id,
            type_name,
            owner,
            handle,
            subscriptions: RwLock::new(SubscriptionSet {
                live: true,
                properties: HashMap::new(),
            }),
        }
    }

    pub fn id(&self) -> &InstanceId {
        &self.id
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Session that created the instance
    pub fn owner(&self) -> SessionId {
        self.owner
    }

    pub fn handle(&self) -> &dyn ViewModelHandle {
        self.handle.as_ref()
    }

    pub fn is_live(&self) -> bool {
        self.subscriptions.read().live
    }

    pub(crate) fn subscriptions(&self) -> &RwLock<SubscriptionSet> {
        &self.subscriptions
    }

    /// Properties with a registered native callback
    pub fn subscribed_properties(&self) -> Vec<String> {
        let mut props: Vec<String> = self.subscriptions.read().properties.keys().cloned().collect();
        props.sort();
        props
    }

    pub fn subscribers(
        &self,
        property_name: &str,
    ) -> Vec<SessionId> {
        let mut sessions: Vec<SessionId> = self
            .subscriptions
            .read()
            .properties
            .get(property_name)
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default();
        sessions.sort_unstable();
        sessions
    }

    /// Marks the instance dead and drops every subscription.
    ///
    /// Returns false if it was already retired.
    pub(crate) fn retire(&self) -> bool {
        let mut subs = self.subscriptions.write();
        if !subs.live {
            return false;
        }
        subs.live = false;
        subs.properties.clear();
        true
    }

    /// Stops routing this instance's events to `session`.
    pub(crate) fn detach_session(
        &self,
        session: SessionId,
    ) {
        let mut subs = self.subscriptions.write();
        for sessions in subs.properties.values_mut() {
            sessions.remove(&session);
        }
    }
}
