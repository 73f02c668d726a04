//! Wire contract between the host broker and its clients.
//!
//! Every type here is `serde`-serializable and transport agnostic. The
//! [`network`](crate::network) module frames them with bincode; an
//! in-process transport can pass them through channels untouched.

mod message;
mod value;

pub use message::*;
pub use value::*;

#[cfg(test)]
mod value_test;
