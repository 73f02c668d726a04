//! Client side of the broker.
//!
//! - [`BrokerClient`] correlates requests with responses and fans pushed
//!   events out to local listeners
//! - [`RemoteInstance`] wraps one instance id
//! - [`ClientBuilder`] connects over TCP or to an in-process broker
//!
//! # Basic Usage
//! ```no_run
//! use vm_broker::BrokerClient;
//! use vm_broker::proto::Value;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let client = BrokerClient::builder()
//!         .connect("127.0.0.1:9470".parse().unwrap())
//!         .await
//!         .unwrap();
//!
//!     let counter = client.create("counter").await.unwrap();
//!     let _guard = counter
//!         .add_property_listener("count", |v| println!("count is now {v}"))
//!         .await
//!         .unwrap();
//!
//!     counter.action("add", vec![Value::Int(5)]).await.unwrap();
//!     counter.remove().await.unwrap();
//! }
//! ```

mod builder;
#[allow(clippy::module_inception)]
mod client;
mod error;
mod observers;
mod proxy;

pub use builder::*;
pub use client::*;
pub use error::*;
pub use observers::*;
pub use proxy::*;
