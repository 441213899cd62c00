//! The [`Bridge`] facade: typed publish / subscribe / serve against one
//! middleware endpoint.
//!
//! All work happens inside [`Bridge::update`], which the host calls once
//! per simulation tick.  It never blocks: connection attempts, replays,
//! inbound dispatch and service replies are all driven from there, on the
//! calling thread.
//!
//! ```no_run
//! use simbridge_middleware::{Bridge, ConnectGate};
//! use simbridge_msgs::ros::Float64;
//! use simbridge_types::Protocol;
//!
//! # async fn demo() -> Result<(), simbridge_types::BridgeError> {
//! let mut bridge = Bridge::builder(Protocol::Ros1).gate(ConnectGate::default()).build()?;
//! bridge.add_publisher::<Float64>("/speed")?;
//! bridge.connect("localhost", 9090);
//! loop {
//!     bridge.update();
//!     bridge.publish("/speed", &Float64 { data: 4.2 });
//!     # break;
//! }
//! # Ok(())
//! # }
//! ```

use std::any::TypeId;
use std::sync::Arc;
use std::time::Duration;

use simbridge_types::{BridgeError, Endpoint, Message, Protocol, Record, Service, Status};
use tokio::runtime::Handle;
use tracing::{debug, trace, warn};

use crate::clock::{Clock, SystemClock};
use crate::codec::{self, Codec, FrameError, Inbound};
use crate::config::{BridgeConfig, MIN_RECONNECT_BACKOFF};
use crate::connection::{Connection, ConnectionEvent};
use crate::gate::ConnectGate;
use crate::registry::{Direction, Registered, TopicInfo, TopicRegistry, control_frame};
use crate::transport::{Connector, NetworkConnector};

/// Observer of a [`Bridge`].
///
/// Clients are told once that the bridge is available, which is where they
/// add their publishers and subscribers, and then about every status
/// change.
pub trait BridgeClient: Send {
    fn on_bridge_available(&mut self, bridge: &mut Bridge) -> Result<(), BridgeError>;

    fn on_status_changed(&mut self, _status: Status) {}
}

// ────────────────────────────────────────────────────────────────────────────
// Builder
// ────────────────────────────────────────────────────────────────────────────

pub struct BridgeBuilder {
    protocol: Protocol,
    gate: ConnectGate,
    clock: Arc<dyn Clock>,
    connector: Option<Box<dyn Connector>>,
    runtime: Option<Handle>,
    backoff: Duration,
    connect_timeout: Duration,
    endpoint: Option<Endpoint>,
}

impl BridgeBuilder {
    fn new(protocol: Protocol) -> Self {
        let defaults = BridgeConfig::default();
        Self {
            protocol,
            gate: ConnectGate::default(),
            clock: Arc::new(SystemClock),
            connector: None,
            runtime: None,
            backoff: MIN_RECONNECT_BACKOFF,
            connect_timeout: defaults.connect_timeout(),
            endpoint: None,
        }
    }

    /// Builder preloaded from configuration, connecting to the configured
    /// address once built.
    ///
    /// # Errors
    ///
    /// Fails on an unknown protocol or an unparsable address.
    pub fn from_config(config: &BridgeConfig) -> Result<Self, BridgeError> {
        let endpoint = config.endpoint()?;
        let mut builder = Self::new(endpoint.protocol())
            .reconnect_backoff(config.reconnect_backoff())
            .connect_timeout(config.connect_timeout());
        builder.endpoint = Some(endpoint);
        Ok(builder)
    }

    pub fn gate(mut self, gate: ConnectGate) -> Self {
        self.gate = gate;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Use `connector` instead of real sockets.
    pub fn connector(mut self, connector: Box<dyn Connector>) -> Self {
        self.connector = Some(connector);
        self
    }

    /// Runtime that hosts socket I/O.  Defaults to the current one.
    pub fn runtime(mut self, handle: Handle) -> Self {
        self.runtime = Some(handle);
        self
    }

    /// Clamped to at least [`MIN_RECONNECT_BACKOFF`].
    pub fn reconnect_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff.max(MIN_RECONNECT_BACKOFF);
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// # Errors
    ///
    /// Returns [`BridgeError::Runtime`] when no connector was given and the
    /// call is made outside a tokio runtime.
    pub fn build(self) -> Result<Bridge, BridgeError> {
        let connector: Box<dyn Connector> = match (self.connector, self.runtime) {
            (Some(connector), _) => connector,
            (None, Some(handle)) => Box::new(NetworkConnector::new(handle, self.connect_timeout)),
            (None, None) => Box::new(NetworkConnector::current(self.connect_timeout)?),
        };
        let connection = Connection::new(
            connector,
            Arc::clone(&self.clock),
            self.gate,
            self.backoff,
            self.connect_timeout,
        );
        let mut bridge = Bridge {
            protocol: self.protocol,
            codec: codec::for_protocol(self.protocol),
            connection,
            registry: TopicRegistry::new(),
            clients: Vec::new(),
            clock: self.clock,
        };
        if let Some(endpoint) = self.endpoint {
            bridge.connect_to(endpoint)?;
        }
        Ok(bridge)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Bridge
// ────────────────────────────────────────────────────────────────────────────

pub struct Bridge {
    protocol: Protocol,
    codec: Box<dyn Codec>,
    connection: Connection,
    registry: TopicRegistry,
    clients: Vec<Box<dyn BridgeClient>>,
    clock: Arc<dyn Clock>,
}

impl Bridge {
    pub fn builder(protocol: Protocol) -> BridgeBuilder {
        BridgeBuilder::new(protocol)
    }

    /// A bridge for `protocol` (`ros1`, `ros2`, `cyber`) on the current
    /// tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::UnsupportedProtocol`] for any other name.
    pub fn new(protocol: &str) -> Result<Self, BridgeError> {
        Self::builder(protocol.parse()?).build()
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    pub fn status(&self) -> Status {
        self.connection.status()
    }

    pub fn endpoint(&self) -> Option<&Endpoint> {
        self.connection.endpoint()
    }

    /// Snapshot of every registration with its traffic statistics.
    pub fn topics(&self) -> Vec<TopicInfo> {
        self.registry.topics()
    }

    // ── Lifecycle ───────────────────────────────────────────────────────────

    /// Connect to `address:port`.  The attempt itself starts in the next
    /// [`update`](Self::update); an empty address never connects.
    pub fn connect(&mut self, address: &str, port: u16) {
        self.connection
            .connect(Endpoint::new(address, port, self.protocol));
    }

    /// # Errors
    ///
    /// Returns [`BridgeError::InvalidEndpoint`] when `endpoint` speaks a
    /// different protocol than this bridge.
    pub fn connect_to(&mut self, endpoint: Endpoint) -> Result<(), BridgeError> {
        if endpoint.protocol() != self.protocol {
            return Err(BridgeError::InvalidEndpoint(format!(
                "{endpoint} does not match the {} bridge",
                self.protocol
            )));
        }
        self.connection.connect(endpoint);
        Ok(())
    }

    /// Close the connection and stop reconnecting.  Registrations are kept.
    pub fn disconnect(&mut self) {
        self.connection.disconnect();
        self.codec.reset();
        self.notify_clients();
    }

    /// Drive the connection and deliver inbound traffic.  Call once per tick.
    pub fn update(&mut self) {
        self.connection.tick();
        while let Some(event) = self.connection.next_event() {
            match event {
                ConnectionEvent::Opened => self.on_opened(),
                ConnectionEvent::Frame(frame) => {
                    for inbound in self.codec.decode(frame) {
                        self.handle_inbound(inbound);
                    }
                }
                ConnectionEvent::Closed => self.codec.reset(),
            }
        }
        self.registry.update_stats(self.clock.now());
        self.notify_clients();
    }

    fn on_opened(&mut self) {
        self.codec.reset();
        match self.registry.replay_all(self.codec.as_ref(), &mut self.connection) {
            Ok(()) => self.connection.mark_connected(),
            Err(e) => debug!(error = %e, "replay interrupted"),
        }
    }

    fn handle_inbound(&mut self, inbound: Result<Inbound, FrameError>) {
        match inbound {
            Ok(Inbound::Publish { topic, msg }) => {
                trace!(topic = %topic, "inbound message");
                self.registry.dispatch(&topic, &msg);
            }
            Ok(Inbound::CallService { service, id, args }) => {
                let values = match self.registry.call_service(&service, &args) {
                    Some(Ok(values)) => Some(values),
                    Some(Err(e)) => {
                        warn!(service = %service, error = %e, "bad service request");
                        None
                    }
                    None => {
                        debug!(service = %service, "call for unknown service");
                        None
                    }
                };
                match self.codec.service_response(&service, id.as_ref(), values.as_ref()) {
                    Ok(frame) => {
                        let _ = self.connection.send(frame);
                    }
                    Err(e) => warn!(service = %service, error = %e, "cannot encode service response"),
                }
            }
            Ok(Inbound::Ignored(op)) => trace!(op = %op, "ignored inbound op"),
            Err(FrameError::Malformed(reason)) => {
                warn!(reason = %reason, "dropping malformed frame");
            }
            Err(FrameError::Desync(reason)) => {
                self.connection.fail(Some(format!("stream out of sync: {reason}")));
            }
        }
    }

    fn notify_clients(&mut self) {
        for status in self.connection.take_transitions() {
            for client in &mut self.clients {
                client.on_status_changed(status);
            }
        }
    }

    // ── Clients ─────────────────────────────────────────────────────────────

    /// Attach an observer.  It is told right away that the bridge is
    /// available so it can register its topics.
    ///
    /// # Errors
    ///
    /// Propagates the client's registration error; the client is not kept.
    pub fn add_client(&mut self, mut client: Box<dyn BridgeClient>) -> Result<(), BridgeError> {
        client.on_bridge_available(self)?;
        client.on_status_changed(self.status());
        self.clients.push(client);
        Ok(())
    }

    // ── Registration ────────────────────────────────────────────────────────

    fn message_type<T: Message>(&self) -> Result<String, BridgeError> {
        T::DESCRIPTOR
            .message_type(self.protocol)
            .map(|name| name.into_owned())
            .ok_or(BridgeError::UnsupportedMessage {
                type_name: short_type_name::<T>(),
                protocol: self.protocol,
            })
    }

    fn announce(&mut self, outcome: Registered, direction: Direction, name: &str, type_name: &str) {
        if !outcome.needs_frame() || self.status() != Status::Connected {
            return;
        }
        match control_frame(self.codec.as_ref(), direction, name, type_name) {
            Ok(frame) => {
                let _ = self.connection.send(frame);
            }
            Err(e) => warn!(name = %name, error = %e, "cannot announce registration"),
        }
    }

    /// Advertise `topic` as carrying `T`.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::UnsupportedMessage`] when `T` has no type name
    /// on this protocol.
    pub fn add_publisher<T: Message>(&mut self, topic: &str) -> Result<(), BridgeError> {
        let type_name = self.message_type::<T>()?;
        let outcome = self.registry.add_publisher::<T>(topic, &type_name);
        self.announce(outcome, Direction::Publish, topic, &type_name);
        Ok(())
    }

    /// Subscribe to `topic`.  `callback` runs inside [`update`](Self::update).
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::UnsupportedMessage`] when `T` has no type name
    /// on this protocol.
    pub fn add_subscriber<T, F>(&mut self, topic: &str, callback: F) -> Result<(), BridgeError>
    where
        T: Message + Clone,
        F: FnMut(T) + Send + 'static,
    {
        let type_name = self.message_type::<T>()?;
        let outcome = self.registry.add_subscriber(topic, &type_name, callback);
        self.announce(outcome, Direction::Subscribe, topic, &type_name);
        Ok(())
    }

    /// Serve `service`.  `handler` runs inside [`update`](Self::update).
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Unsupported`] on Cyber RT and
    /// [`BridgeError::UnsupportedMessage`] when `S` has no type name on this
    /// protocol.
    pub fn add_service<S, F>(&mut self, service: &str, mut handler: F) -> Result<(), BridgeError>
    where
        S: Service,
        F: FnMut(S::Request) -> S::Response + Send + 'static,
    {
        if !self.protocol.is_rosbridge() {
            return Err(BridgeError::Unsupported {
                operation: "services",
                protocol: self.protocol,
            });
        }
        let type_name = S::DESCRIPTOR
            .service_type(self.protocol)
            .map(|name| name.into_owned())
            .ok_or(BridgeError::UnsupportedMessage {
                type_name: short_type_name::<S>(),
                protocol: self.protocol,
            })?;
        let dialect = self.codec.dialect();
        let outcome = self.registry.add_service(
            service,
            &type_name,
            TypeId::of::<S>(),
            Box::new(move |args: &Record| {
                let request = <S::Request as Message>::decode(args)?;
                Ok(handler(request).to_record(dialect))
            }),
        );
        self.announce(outcome, Direction::Serve, service, &type_name);
        Ok(())
    }

    // ── Data ────────────────────────────────────────────────────────────────

    /// Send `msg` on `topic` if connected; otherwise drop it.  Never fails.
    pub fn publish<T: Message>(&mut self, topic: &str, msg: &T) {
        if self.status() != Status::Connected {
            trace!(topic = %topic, "not connected, message dropped");
            return;
        }
        if !self.registry.contains(Direction::Publish, topic) {
            debug!(topic = %topic, "publishing on a topic that was never advertised");
        }
        let record = msg.to_record(self.codec.dialect());
        match self.codec.publish(topic, &record) {
            Ok(frame) => {
                if self.connection.send(frame).is_ok() {
                    self.registry.record_publish(topic);
                }
            }
            Err(e) => warn!(topic = %topic, error = %e, "cannot encode message"),
        }
    }
}

fn short_type_name<T>() -> &'static str {
    let full = std::any::type_name::<T>();
    full.rsplit("::").next().unwrap_or(full)
}
