use std::collections::BTreeMap;

use super::BrokerClient;
use super::ClientError;
use super::ListenerGuard;
use crate::proto::InstanceId;
use crate::proto::Value;

/// Client-side stand-in for one broker-held instance.
#[derive(Debug, Clone)]
pub struct RemoteInstance {
    client: BrokerClient,
    instance_id: InstanceId,
    type_name: String,
}

impl RemoteInstance {
    pub(crate) fn new(
        client: BrokerClient,
        instance_id: InstanceId,
        type_name: String,
    ) -> Self {
        Self {
            client,
            instance_id,
            type_name,
        }
    }

    pub fn id(&self) -> &InstanceId {
        &self.instance_id
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub async fn action(
        &self,
        action_name: &str,
        args: Vec<Value>,
    ) -> std::result::Result<Value, ClientError> {
        self.client.execute_action(&self.instance_id, action_name, args).await
    }

    pub async fn get_prop(
        &self,
        property_name: &str,
    ) -> std::result::Result<Value, ClientError> {
        self.client.read_property(&self.instance_id, property_name).await
    }

    pub async fn state(&self) -> std::result::Result<BTreeMap<String, Value>, ClientError> {
        self.client.read_state(&self.instance_id).await
    }

    pub async fn add_property_listener<F>(
        &self,
        property_name: &str,
        callback: F,
    ) -> std::result::Result<ListenerGuard, ClientError>
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.client
            .add_property_listener(&self.instance_id, property_name, callback)
            .await
    }

    /// Releases the instance on the broker. Every proxy clone of it becomes
    /// stale.
    pub async fn remove(self) -> std::result::Result<(), ClientError> {
        self.client.remove_instance(&self.instance_id).await
    }
}
