//! `simbridge-middleware` – The bridge core
//!
//! Connects in-simulation producers and consumers to an external robotics
//! middleware (ROS1, ROS2 or Apollo Cyber RT) and keeps that link alive
//! across disconnects without the callers noticing.
//!
//! # Modules
//!
//! - [`bridge`] – [`Bridge`] facade: typed publishers, subscribers and
//!   services, driven by a non-blocking `update()` per tick.
//! - [`connection`] – Connection state machine with reconnect backoff and
//!   the host-owned [`ConnectGate`].
//! - [`registry`] – Insertion-ordered registrations replayed on every
//!   (re)connect, inbound dispatch and per-topic statistics.
//! - [`codec`] – rosbridge v2 JSON and Cyber RT binary framing.
//! - [`transport`] – WebSocket, TCP and in-memory transports.
//! - [`clock`] – Monotonic clock abstraction ([`SystemClock`],
//!   [`ManualClock`]).
//! - [`config`] – [`BridgeConfig`] as read from configuration files.
//! - [`gate`] – The [`ConnectGate`] switch.

pub mod bridge;
pub mod clock;
pub mod codec;
pub mod config;
pub mod connection;
pub mod gate;
pub mod registry;
pub mod transport;

pub use bridge::{Bridge, BridgeBuilder, BridgeClient};
pub use clock::{Clock, ManualClock, SystemClock};
pub use codec::{Codec, Frame, FrameError, Inbound};
pub use config::{BridgeConfig, MIN_RECONNECT_BACKOFF};
pub use connection::{Connection, ConnectionEvent};
pub use gate::ConnectGate;
pub use registry::{Direction, TopicInfo, TopicRegistry};
pub use transport::{Connector, MemoryConnector, MemoryPeer, NetworkConnector, Transport, TransportEvent};
