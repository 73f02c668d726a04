use std::sync::Arc;
use std::time::Instant;

use tracing::debug;
use tracing::warn;

use super::Instance;
use super::InstanceRegistry;
use crate::metrics::ACTION_LATENCY_MS;
use crate::proto::InstanceId;
use crate::proto::Value;
use crate::BrokerError;

/// Forwards named actions to registered handles.
///
/// Arguments are passed through untouched; arity and type checks belong to
/// the handle. Two actions on the same instance may run concurrently.
///
/// A `remove` racing with `execute` may land after the liveness check and
/// before the call returns. The action then still runs on the retired handle,
/// which stays alive until the call drops its `Arc<Instance>`. Its property
/// changes are not routed: the native listener sees `live == false`.
#[derive(Debug, Clone)]
pub struct ActionDispatcher {
    registry: Arc<InstanceRegistry>,
}

impl ActionDispatcher {
    pub fn new(registry: Arc<InstanceRegistry>) -> Self {
        Self { registry }
    }

    pub fn execute(
        &self,
        instance_id: &InstanceId,
        action_name: &str,
        args: Vec<Value>,
    ) -> std::result::Result<Value, BrokerError> {
        let instance = self.registry.lookup(instance_id)?;
        self.dispatch(&instance, action_name, args)
    }

    /// Runs the action on an already resolved instance, unless it was
    /// retired since the lookup.
    pub(crate) fn dispatch(
        &self,
        instance: &Instance,
        action_name: &str,
        args: Vec<Value>,
    ) -> std::result::Result<Value, BrokerError> {
        let instance_id = instance.id();
        if !instance.is_live() {
            return Err(BrokerError::InstanceNotFound(instance_id.clone()));
        }

        debug!(%instance_id, action = action_name, argc = args.len(), "Executing action");
        let started = Instant::now();
        let result = instance
            .handle()
            .action(action_name, args)
            .map_err(|e| e.into_broker_error(instance_id));
        ACTION_LATENCY_MS.observe(started.elapsed().as_secs_f64() * 1000.0);

        if let Err(e) = &result {
            warn!(%instance_id, action = action_name, "Action failed: {}", e);
        }
        result
    }
}
