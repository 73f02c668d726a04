//! Transports between broker clients and the host.
//!
//! Both the TCP and the in-process transport reduce a client connection to
//! the same pair of channels, see [`Connection`].

mod codec;
mod local;
mod session;
mod tcp;

pub use codec::*;
pub use local::*;
pub use session::*;
pub use tcp::*;

#[cfg(test)]
mod codec_test;

use tokio::sync::mpsc;

use crate::proto::RequestEnvelope;
use crate::proto::ServerMessage;

/// Client end of a broker session.
///
/// Dropping `requests` ends the session on the host.
#[derive(Debug)]
pub struct Connection {
    pub requests: mpsc::Sender<RequestEnvelope>,
    pub messages: mpsc::UnboundedReceiver<ServerMessage>,
}
