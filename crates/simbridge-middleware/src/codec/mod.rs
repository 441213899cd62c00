//! Protocol codecs: control and data frames for each middleware family.
//!
//! A [`Codec`] is chosen once from the endpoint protocol.  Everything above
//! it (registry, bridge) deals in topic names, type names and
//! [`Record`]s only.
//!
//! | Protocol | Codec | Transport framing |
//! |----------|-------|-------------------|
//! | ROS1 / ROS2 | [`RosbridgeCodec`] | one JSON text message per op |
//! | Cyber RT | [`CyberCodec`] | length-prefixed binary ops on a byte stream |

pub mod cyber;
pub mod rosbridge;

use bytes::Bytes;
use simbridge_types::{BridgeError, Dialect, Protocol, Record};
use thiserror::Error;

pub use cyber::CyberCodec;
pub use rosbridge::RosbridgeCodec;

/// One unit handed to or received from a transport.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Text(String),
    Binary(Bytes),
}

/// A decoded inbound operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Publish {
        topic: String,
        msg: Record,
    },
    CallService {
        service: String,
        /// Echoed verbatim in the response.
        id: Option<serde_json::Value>,
        args: Record,
    },
    /// An op that needs no action (`set_level`, unknown ops).
    Ignored(String),
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum FrameError {
    /// The frame is unusable; later frames are unaffected.
    #[error("malformed frame: {0}")]
    Malformed(String),

    /// Framing was lost; nothing more can be read from this stream.
    #[error("stream out of sync: {0}")]
    Desync(String),
}

pub trait Codec: Send {
    fn protocol(&self) -> Protocol;

    fn dialect(&self) -> Dialect {
        self.protocol().dialect()
    }

    fn advertise(&self, topic: &str, type_name: &str) -> Result<Frame, BridgeError>;

    fn subscribe(&self, topic: &str, type_name: &str) -> Result<Frame, BridgeError>;

    fn advertise_service(&self, service: &str, type_name: &str) -> Result<Frame, BridgeError>;

    fn publish(&self, topic: &str, msg: &Record) -> Result<Frame, BridgeError>;

    /// `values` is `None` when the request could not be served.
    fn service_response(
        &self,
        service: &str,
        id: Option<&serde_json::Value>,
        values: Option<&Record>,
    ) -> Result<Frame, BridgeError>;

    /// Decode whatever complete operations `frame` finishes.
    fn decode(&mut self, frame: Frame) -> Vec<Result<Inbound, FrameError>>;

    /// Forget partial input from a previous connection.
    fn reset(&mut self) {}
}

/// The codec for `protocol`.
pub fn for_protocol(protocol: Protocol) -> Box<dyn Codec> {
    match protocol {
        Protocol::Ros1 | Protocol::Ros2 => Box::new(RosbridgeCodec::new(protocol)),
        Protocol::Cyber => Box::new(CyberCodec::new()),
    }
}
