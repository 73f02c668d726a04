//! Local multicast list of property observers.
//!
//! One broker subscription per (instance, property) serves any number of
//! local listeners. Each listener is owned through a [`ListenerGuard`];
//! dropping the guard removes that listener only.

use std::fmt;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Weak;

use dashmap::DashMap;
use tracing::trace;

use crate::proto::InstanceId;
use crate::proto::PropertyChanged;
use crate::proto::Value;

/// Client-side change callback
pub type PropertyCallback = Arc<dyn Fn(&Value) + Send + Sync>;

type ObserverKey = (InstanceId, String);

#[derive(Default)]
struct ObserverTable {
    next_listener_id: AtomicU64,
    listeners: DashMap<ObserverKey, Vec<(u64, PropertyCallback)>>,
}

#[derive(Clone, Default)]
pub struct PropertyObservers {
    table: Arc<ObserverTable>,
}

impl fmt::Debug for PropertyObservers {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("PropertyObservers")
            .field("keys", &self.table.listeners.len())
            .finish()
    }
}

impl PropertyObservers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(
        &self,
        instance_id: &InstanceId,
        property_name: &str,
        callback: PropertyCallback,
    ) -> ListenerGuard {
        let listener_id = self.table.next_listener_id.fetch_add(1, Ordering::Relaxed);
        let key = (instance_id.clone(), property_name.to_string());
        self.table
            .listeners
            .entry(key.clone())
            .or_default()
            .push((listener_id, callback));

        ListenerGuard {
            table: Arc::downgrade(&self.table),
            key,
            listener_id,
        }
    }

    /// Calls every local listener of the event's (instance, property).
    ///
    /// Returns the number of listeners called.
    pub fn dispatch(
        &self,
        event: &PropertyChanged,
    ) -> usize {
        let key = (event.instance_id.clone(), event.property_name.clone());
        let callbacks: Vec<PropertyCallback> = match self.table.listeners.get(&key) {
            Some(entry) => entry.value().iter().map(|(_, cb)| cb.clone()).collect(),
            None => return 0,
        };

        for callback in &callbacks {
            callback(&event.value);
        }
        trace!(instance_id = %event.instance_id, property = %event.property_name, listeners = callbacks.len(), "Event fanned out");
        callbacks.len()
    }

    pub fn listener_count(
        &self,
        instance_id: &InstanceId,
        property_name: &str,
    ) -> usize {
        self.table
            .listeners
            .get(&(instance_id.clone(), property_name.to_string()))
            .map(|entry| entry.value().len())
            .unwrap_or(0)
    }

    /// Drops every listener of an instance.
    pub fn forget_instance(
        &self,
        instance_id: &InstanceId,
    ) {
        self.table.listeners.retain(|(id, _), _| id != instance_id);
    }
}

/// Keeps one local listener registered.
#[must_use = "dropping the guard removes the listener"]
pub struct ListenerGuard {
    table: Weak<ObserverTable>,
    key: ObserverKey,
    listener_id: u64,
}

impl fmt::Debug for ListenerGuard {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("ListenerGuard")
            .field("instance_id", &self.key.0)
            .field("property", &self.key.1)
            .field("listener_id", &self.listener_id)
            .finish()
    }
}

impl ListenerGuard {
    pub fn instance_id(&self) -> &InstanceId {
        &self.key.0
    }

    pub fn property_name(&self) -> &str {
        &self.key.1
    }
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        let Some(table) = self.table.upgrade() else {
            return;
        };
        // Empty lists go away atomically with respect to `add`.
        table.listeners.remove_if_mut(&self.key, |_key, listeners| {
            listeners.retain(|(id, _)| *id != self.listener_id);
            listeners.is_empty()
        });
        trace!(listener_id = self.listener_id, property = %self.key.1, "Listener removed");
    }
}
