//! `simbridge-types` – Shared vocabulary for the simulator bridge.
//!
//! Everything that both the message catalogue and the transport layer need
//! to agree on lives here.
//!
//! # Modules
//!
//! - [`endpoint`] – [`Protocol`], [`Endpoint`] (`host[:port]`, default port
//!   9090) and the connection [`Status`].
//! - [`error`] – [`BridgeError`] and the path-aware [`DecodeError`].
//! - [`time`] – ROS [`Time`] and the Apollo GPS-epoch conversion.
//! - [`value`] – [`Value`] / [`Record`]: the protocol-neutral tree every
//!   message is shaped into before it hits a wire format.
//! - [`message`] – [`Message`], [`Service`], [`FieldValue`] and [`OneOf`]
//!   traits plus the `message!`, `one_of!` and `proto_enum!` declaration
//!   macros.
//! - [`wire`] – encoders for rosbridge JSON, protobuf binary and protobuf
//!   text format.
//!
//! # Declaring a message
//!
//! ```
//! use simbridge_types::{message, Dialect, Message, TypeDescriptor};
//!
//! message! {
//!     /// Wheel speed report.
//!     pub struct WheelSpeed [TypeDescriptor::ros("demo_msgs/WheelSpeed")] {
//!         pub left: f64 = 1,
//!         pub right: Option<f64> = 2,
//!     }
//! }
//!
//! let msg = WheelSpeed { left: 1.5, right: None };
//! let record = msg.to_record(Dialect::Ros1);
//! assert_eq!(record.len(), 1);
//! ```

pub mod endpoint;
pub mod error;
pub mod message;
pub mod time;
pub mod value;
pub mod wire;

mod macros;

pub use endpoint::{DEFAULT_PORT, Endpoint, Protocol, Status};
pub use error::{BridgeError, DecodeError};
pub use message::{FieldValue, Message, OneOf, Service, TypeDescriptor};
pub use time::{GPS_EPOCH_UNIX_SECONDS, Time, gps_to_unix, unix_to_gps};
pub use value::{Dialect, Field, Record, Value};

// Re-exported so `message!` expansions and downstream crates agree on the
// byte container type.
pub use bytes::Bytes;
