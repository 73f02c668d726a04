//! Cross-process view-model broker.
//!
//! A host process owns stateful business objects ("view-models") and lets
//! clients in other processes create them, run their actions, read their
//! properties and subscribe to property changes. Only serializable messages
//! cross the process boundary; see [`proto`] for the wire contract.
//!
//! - [`backend`](BackendBinding): the seam to native business logic
//! - [`Broker`]: registry, dispatch, reads, subscriptions and event routing
//! - [`network`]: session driver, framing and TCP transport
//! - [`BrokerClient`]: request correlation and local listener fan-out

mod backend;
mod broker;
mod client;
mod config;
mod errors;
pub mod metrics;
pub mod network;
pub mod proto;

pub use backend::*;
pub use broker::*;
pub use client::*;
pub use config::*;
pub use errors::*;


//-----------------------------------------------------------
// Test utils

#[cfg(test)]
pub(crate) mod test_utils;
