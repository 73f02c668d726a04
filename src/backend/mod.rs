//! Backend Binding: the seam between the broker and native business logic.
//!
//! The broker only ever talks to business objects through the traits in this
//! module:
//! - [`BackendLoader`] produces a [`ViewModelProvider`] once per process
//! - [`ViewModelProvider`] is the `createInstance(typeName)` factory
//! - [`ViewModelHandle`] exposes the three handle operations (action,
//!   property read, change callback registration)
//!
//! [`BackendBinding`] wraps a loader and guarantees the provider is
//! initialized at most once; a failed initialization is remembered and every
//! later creation fails with `BackendUnavailable`.

mod binding;
mod builtin;
mod counter;
mod loader;
mod view_model;

pub use binding::*;
pub use builtin::*;
pub use counter::*;
pub use loader::*;
pub use view_model::*;

#[cfg(test)]
mod builtin_test;

use std::collections::BTreeMap;
use std::sync::Arc;

#[cfg(test)]
use mockall::automock;

use crate::proto::Value;
use crate::BackendError;

/// Native change callback: `(property_name, new_value)`.
pub type PropertyListener = Arc<dyn Fn(&str, &Value) + Send + Sync>;

/// A live business object owned by the broker's registry.
///
/// Implementations must be safe to call from several threads; the broker
/// does not serialize actions against the same handle.
#[cfg_attr(test, automock)]
pub trait ViewModelHandle: Send + Sync {
    /// Runs a named action. Unknown names fail with
    /// [`BackendError::ActionNotFound`].
    fn action(
        &self,
        action_name: &str,
        args: Vec<Value>,
    ) -> std::result::Result<Value, BackendError>;

    /// Reads the current value of a property.
    fn property(
        &self,
        property_name: &str,
    ) -> std::result::Result<Value, BackendError>;

    /// All properties and their current values.
    fn state(&self) -> BTreeMap<String, Value>;

    /// Registers a callback fired on every change of `property_name`.
    fn add_property_listener(
        &self,
        property_name: &str,
        listener: PropertyListener,
    );
}

#[cfg_attr(test, automock)]
pub trait ViewModelProvider: Send + Sync {
    fn create(
        &self,
        type_name: &str,
    ) -> std::result::Result<Box<dyn ViewModelHandle>, BackendError>;

    /// Type names this provider can instantiate
    fn type_names(&self) -> Vec<String>;
}

/// Loads the native provider. Which concrete provider is loaded is a
/// startup-configuration decision, see [`ConfiguredLoader`].
#[cfg_attr(test, automock)]
pub trait BackendLoader: Send + Sync {
    fn initialize(&self) -> std::result::Result<Arc<dyn ViewModelProvider>, BackendError>;
}
