use std::collections::BTreeMap;
use std::sync::Arc;

use super::InstanceRegistry;
use crate::proto::InstanceId;
use crate::proto::Value;
use crate::BrokerError;

/// Synchronous property reads. Reading never requires a subscription.
#[derive(Debug, Clone)]
pub struct PropertyReader {
    registry: Arc<InstanceRegistry>,
}

impl PropertyReader {
    pub fn new(registry: Arc<InstanceRegistry>) -> Self {
        Self { registry }
    }

    pub fn read(
        &self,
        instance_id: &InstanceId,
        property_name: &str,
    ) -> std::result::Result<Value, BrokerError> {
        let instance = self.registry.lookup(instance_id)?;
        instance
            .handle()
            .property(property_name)
            .map_err(|e| e.into_broker_error(instance_id))
    }

    pub fn read_state(
        &self,
        instance_id: &InstanceId,
    ) -> std::result::Result<BTreeMap<String, Value>, BrokerError> {
        let instance = self.registry.lookup(instance_id)?;
        Ok(instance.handle().state())
    }
}
