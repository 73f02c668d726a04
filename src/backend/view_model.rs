//! Reusable base for in-process view-models.
//!
//! A [`ViewModel`] is a property map plus an action table. Actions mutate
//! properties through [`ViewModel::set_prop`], which fires the registered
//! listeners of that property in registration order.

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::fmt;

use parking_lot::ReentrantMutex;
use parking_lot::RwLock;

use super::PropertyListener;
use super::ViewModelHandle;
use crate::proto::Value;
use crate::BackendError;

pub type ActionFn =
    Box<dyn Fn(&ViewModel, &[Value]) -> std::result::Result<Value, BackendError> + Send + Sync>;

pub struct ViewModel {
    type_name: String,
    properties: RwLock<BTreeMap<String, Value>>,
    actions: HashMap<String, ActionFn>,
    listeners: RwLock<HashMap<String, Vec<PropertyListener>>>,
    /// Serializes write + notify so listeners observe changes in write order
    notify_lock: ReentrantMutex<()>,
}

impl fmt::Debug for ViewModel {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("ViewModel")
            .field("type_name", &self.type_name)
            .field("properties", &*self.properties.read())
            .field("actions", &self.actions.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl ViewModel {
    pub fn builder(type_name: impl Into<String>) -> ViewModelBuilder {
        ViewModelBuilder {
            type_name: type_name.into(),
            properties: BTreeMap::new(),
            actions: HashMap::new(),
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn get_prop(
        &self,
        name: &str,
    ) -> Option<Value> {
        self.properties.read().get(name).cloned()
    }

    pub fn has_prop(
        &self,
        name: &str,
    ) -> bool {
        self.properties.read().contains_key(name)
    }

    /// Stores `value` and notifies the listeners of `name`.
    pub fn set_prop(
        &self,
        name: &str,
        value: impl Into<Value>,
    ) {
        let value = value.into();
        let _seq = self.notify_lock.lock();

        self.properties.write().insert(name.to_string(), value.clone());

        let listeners = match self.listeners.read().get(name) {
            Some(listeners) => listeners.clone(),
            None => return,
        };
        for listener in listeners {
            listener(name, &value);
        }
    }

    /// Runs `f` with every other write to this view-model held off.
    ///
    /// Read-modify-write sequences inside `f` are atomic; `set_prop` may be
    /// called from `f`.
    pub fn atomically<R>(
        &self,
        f: impl FnOnce(&Self) -> R,
    ) -> R {
        let _seq = self.notify_lock.lock();
        f(self)
    }

    pub fn listener_count(
        &self,
        name: &str,
    ) -> usize {
        self.listeners.read().get(name).map(Vec::len).unwrap_or(0)
    }
}

impl ViewModelHandle for ViewModel {
    fn action(
        &self,
        action_name: &str,
        args: Vec<Value>,
    ) -> std::result::Result<Value, BackendError> {
        let action = self
            .actions
            .get(action_name)
            .ok_or_else(|| BackendError::ActionNotFound(action_name.to_string()))?;
        action(self, &args)
    }

    fn property(
        &self,
        property_name: &str,
    ) -> std::result::Result<Value, BackendError> {
        self.get_prop(property_name)
            .ok_or_else(|| BackendError::PropertyNotFound(property_name.to_string()))
    }

    fn state(&self) -> BTreeMap<String, Value> {
        self.properties.read().clone()
    }

    fn add_property_listener(
        &self,
        property_name: &str,
        listener: PropertyListener,
    ) {
        self.listeners
            .write()
            .entry(property_name.to_string())
            .or_default()
            .push(listener);
    }
}

pub struct ViewModelBuilder {
    type_name: String,
    properties: BTreeMap<String, Value>,
    actions: HashMap<String, ActionFn>,
}

impl ViewModelBuilder {
    pub fn property(
        mut self,
        name: impl Into<String>,
        initial: impl Into<Value>,
    ) -> Self {
        self.properties.insert(name.into(), initial.into());
        self
    }

    pub fn action<F>(
        mut self,
        name: impl Into<String>,
        action: F,
    ) -> Self
    where
        F: Fn(&ViewModel, &[Value]) -> std::result::Result<Value, BackendError> + Send + Sync + 'static,
    {
        self.actions.insert(name.into(), Box::new(action));
        self
    }

    pub fn build(self) -> ViewModel {
        ViewModel {
            type_name: self.type_name,
            properties: RwLock::new(self.properties),
            actions: self.actions,
            listeners: RwLock::new(HashMap::new()),
            notify_lock: ReentrantMutex::new(()),
        }
    }
}
