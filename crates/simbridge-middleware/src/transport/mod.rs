//! Byte transports underneath the codecs.
//!
//! The bridge is driven from a synchronous `update()` call, so a
//! [`Transport`] is a non-blocking handle: frames are queued with
//! [`Transport::send`] and inbound events are drained with
//! [`Transport::try_recv`].  The network transports run their socket I/O on
//! a tokio task and talk to the handle through unbounded channels.
//!
//! | Transport | Used for | Frames |
//! |-----------|----------|--------|
//! | [`websocket`] | ROS1 / ROS2 rosbridge | one text message per op |
//! | [`tcp`] | Cyber RT | arbitrary binary chunks of the byte stream |
//! | [`memory`] | tests and embedding | whatever the peer injects |

pub mod memory;
pub mod tcp;
pub mod websocket;

use std::time::Duration;

use simbridge_types::{BridgeError, Endpoint};
use tokio::runtime::Handle;
use tracing::debug;

use crate::codec::Frame;

pub use memory::{MemoryConnector, MemoryPeer};

/// Something the transport observed since the last poll.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// The link is up and frames may be sent.
    Opened,
    Frame(Frame),
    /// The link is gone.  Carries the reason when one is known.
    Closed(Option<String>),
}

pub trait Transport: Send {
    /// Queue `frame` for sending.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Transport`] when the link is already closed.
    fn send(&mut self, frame: Frame) -> Result<(), BridgeError>;

    /// The next pending event, without blocking.
    fn try_recv(&mut self) -> Option<TransportEvent>;

    /// Tear the link down.  No events follow.
    fn close(&mut self);
}

/// Opens transports.  Opening only starts the attempt; success or failure
/// arrives later as a [`TransportEvent`].
pub trait Connector: Send {
    fn open(&mut self, endpoint: &Endpoint) -> Result<Box<dyn Transport>, BridgeError>;
}

/// Picks WebSocket or TCP from the endpoint protocol and runs the socket
/// on a tokio runtime.
#[derive(Debug, Clone)]
pub struct NetworkConnector {
    handle: Handle,
    connect_timeout: Duration,
}

impl NetworkConnector {
    pub fn new(handle: Handle, connect_timeout: Duration) -> Self {
        Self {
            handle,
            connect_timeout,
        }
    }

    /// Use the runtime of the calling context.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Runtime`] outside a tokio runtime.
    pub fn current(connect_timeout: Duration) -> Result<Self, BridgeError> {
        let handle = Handle::try_current().map_err(|e| BridgeError::Runtime(e.to_string()))?;
        Ok(Self::new(handle, connect_timeout))
    }
}

impl Connector for NetworkConnector {
    fn open(&mut self, endpoint: &Endpoint) -> Result<Box<dyn Transport>, BridgeError> {
        debug!(endpoint = %endpoint, "opening transport");
        if endpoint.protocol().is_rosbridge() {
            Ok(Box::new(websocket::WebSocketTransport::spawn(
                &self.handle,
                endpoint.websocket_url(),
                self.connect_timeout,
            )))
        } else {
            Ok(Box::new(tcp::TcpTransport::spawn(
                &self.handle,
                endpoint.authority(),
                self.connect_timeout,
            )))
        }
    }
}
