//! Subscription Manager
//!
//! Registers at most one native change callback per (instance, property)
//! and keeps, per pair, the set of sessions that asked for it. Repeated
//! subscribe calls only extend that set.
//!
//! The native callback holds the instance weakly and routes while holding
//! the instance's subscription read lock. Removal takes the write lock and
//! marks the instance dead, so once `remove` returns no further event for
//! that instance reaches the router.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;
use tracing::trace;

use super::EventRouter;
use super::Instance;
use super::InstanceRegistry;
use super::SessionId;
use crate::metrics::EVENTS_DROPPED;
use crate::proto::InstanceId;
use crate::proto::PropertyChanged;
use crate::proto::Value;
use crate::BrokerError;
use crate::PropertyListener;

#[derive(Debug, Clone)]
pub struct SubscriptionManager {
    registry: Arc<InstanceRegistry>,
    router: Arc<EventRouter>,
}

impl SubscriptionManager {
    pub fn new(
        registry: Arc<InstanceRegistry>,
        router: Arc<EventRouter>,
    ) -> Self {
        Self { registry, router }
    }

    /// Idempotent: the native callback is registered on the first call for a
    /// pair only.
    pub fn subscribe(
        &self,
        session: SessionId,
        instance_id: &InstanceId,
        property_name: &str,
    ) -> std::result::Result<(), BrokerError> {
        let instance = self.registry.lookup(instance_id)?;

        let mut subs = instance.subscriptions().write();
        if !subs.live {
            return Err(BrokerError::InstanceNotFound(instance_id.clone()));
        }

        if let Some(sessions) = subs.properties.get_mut(property_name) {
            let added = sessions.insert(session);
            debug!(
                %instance_id,
                property = property_name,
                session_id = session,
                added,
                "Native callback already registered"
            );
            return Ok(());
        }

        instance
            .handle()
            .add_property_listener(property_name, native_listener(&instance, property_name, self.router.clone()));
        subs.properties
            .insert(property_name.to_string(), HashSet::from([session]));

        debug!(%instance_id, property = property_name, session_id = session, "Native callback registered");
        Ok(())
    }

    /// Number of native callbacks registered for an instance
    pub fn subscription_count(
        &self,
        instance_id: &InstanceId,
    ) -> std::result::Result<usize, BrokerError> {
        let instance = self.registry.lookup(instance_id)?;
        let count = instance.subscriptions().read().properties.len();
        Ok(count)
    }
}

fn native_listener(
    instance: &Arc<Instance>,
    property_name: &str,
    router: Arc<EventRouter>,
) -> PropertyListener {
    let weak = Arc::downgrade(instance);
    let property_name = property_name.to_string();

    Arc::new(move |_: &str, value: &Value| {
        let Some(instance) = weak.upgrade() else {
            EVENTS_DROPPED.with_label_values(&["instance_removed"]).inc();
            return;
        };

        let subs = instance.subscriptions().read();
        if !subs.live {
            EVENTS_DROPPED.with_label_values(&["instance_removed"]).inc();
            trace!(instance_id = %instance.id(), property = %property_name, "Change after removal ignored");
            return;
        }

        let Some(sessions) = subs.properties.get(&property_name) else {
            return;
        };

        let event = PropertyChanged {
            instance_id: instance.id().clone(),
            property_name: property_name.clone(),
            value: value.clone(),
        };
        router.route(&event, sessions);
    })
}
