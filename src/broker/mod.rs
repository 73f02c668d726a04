//! Host-side broker.
//!
//! Owns every live view-model instance on behalf of its clients:
//! - [`InstanceRegistry`] maps ids to handles and owns them until removal
//! - [`ActionDispatcher`] and [`PropertyReader`] forward calls to handles
//! - [`SubscriptionManager`] registers native change callbacks
//! - [`EventRouter`] pushes changes to the sessions that subscribed
//!
//! [`Broker`] ties the pieces together behind one request entry point.

mod dispatcher;
mod instance;
mod reader;
mod registry;
mod router;
mod service;
mod subscription;

pub use dispatcher::*;
pub use instance::*;
pub use reader::*;
pub use registry::*;
pub use router::*;
pub use service::*;
pub use subscription::*;

#[cfg(test)]
mod service_test;
