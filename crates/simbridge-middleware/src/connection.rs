//! Connection lifecycle: `Disconnected → Connecting → Connected`.
//!
//! [`Connection`] owns the transport exclusively and is the only place the
//! [`Status`] changes.  It is polled from the bridge's `update()`:
//!
//! 1. [`Connection::tick`] starts an attempt when one is wanted, the host
//!    is non-empty, the [`ConnectGate`] is open and the reconnect backoff
//!    since the last disconnect has elapsed.  It also expires attempts that
//!    exceed the connect timeout.
//! 2. [`Connection::next_event`] drains what the transport produced.  The
//!    caller replays registrations when it sees [`ConnectionEvent::Opened`]
//!    and then calls [`Connection::mark_connected`].
//!
//! Socket failures never surface as errors; they turn into a transition
//! back to `Disconnected` and a retry after the backoff.

use std::sync::Arc;
use std::time::{Duration, Instant};

use simbridge_types::{BridgeError, Endpoint, Status};
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::codec::Frame;
use crate::config::MIN_RECONNECT_BACKOFF;
use crate::gate::ConnectGate;
use crate::transport::{Connector, Transport, TransportEvent};

#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionEvent {
    /// The transport is up; registrations should be replayed now.
    Opened,
    Frame(Frame),
    /// The link dropped and the connection is `Disconnected` again.
    Closed,
}

pub struct Connection {
    endpoint: Option<Endpoint>,
    status: Status,
    transport: Option<Box<dyn Transport>>,
    connector: Box<dyn Connector>,
    clock: Arc<dyn Clock>,
    gate: ConnectGate,
    backoff: Duration,
    connect_timeout: Duration,
    last_disconnect: Option<Instant>,
    attempt_started: Option<Instant>,
    wants_connection: bool,
    transitions: Vec<Status>,
}

impl Connection {
    pub fn new(
        connector: Box<dyn Connector>,
        clock: Arc<dyn Clock>,
        gate: ConnectGate,
        backoff: Duration,
        connect_timeout: Duration,
    ) -> Self {
        Self {
            endpoint: None,
            status: Status::Disconnected,
            transport: None,
            connector,
            clock,
            gate,
            backoff: backoff.max(MIN_RECONNECT_BACKOFF),
            connect_timeout,
            last_disconnect: None,
            attempt_started: None,
            wants_connection: false,
            transitions: Vec::new(),
        }
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn endpoint(&self) -> Option<&Endpoint> {
        self.endpoint.as_ref()
    }

    pub fn backoff(&self) -> Duration {
        self.backoff
    }

    /// Point the connection at `endpoint` and ask for it to be connected.
    /// A different endpoint drops the current link first.
    pub fn connect(&mut self, endpoint: Endpoint) {
        if self.endpoint.as_ref() != Some(&endpoint) {
            if self.status != Status::Disconnected {
                info!(from = ?self.endpoint, to = %endpoint, "endpoint changed, reconnecting");
                self.close_transport();
                self.set_status(Status::Disconnected);
                self.last_disconnect = Some(self.clock.now());
            }
            self.endpoint = Some(endpoint);
        }
        self.wants_connection = true;
    }

    /// Drop the link and stop reconnecting.  Safe to call in any state.
    pub fn disconnect(&mut self) {
        self.wants_connection = false;
        if self.status == Status::Disconnected {
            return;
        }
        debug!("disconnect requested");
        self.close_transport();
        self.set_status(Status::Disconnected);
        self.last_disconnect = Some(self.clock.now());
    }

    /// When the next attempt becomes allowed, if one is pending.
    pub fn next_attempt_at(&self) -> Option<Instant> {
        self.last_disconnect.map(|at| at + self.backoff)
    }

    fn eligible(&self, now: Instant) -> bool {
        let Some(endpoint) = &self.endpoint else {
            return false;
        };
        self.wants_connection
            && !endpoint.host().is_empty()
            && self.gate.is_open()
            && self.next_attempt_at().is_none_or(|at| now >= at)
    }

    /// Start or expire connection attempts.
    pub fn tick(&mut self) {
        let now = self.clock.now();
        match self.status {
            Status::Disconnected if self.eligible(now) => self.start_attempt(now),
            Status::Connecting => {
                let expired = self
                    .attempt_started
                    .is_some_and(|at| now.duration_since(at) >= self.connect_timeout);
                if expired {
                    self.fail(Some("connect timed out".to_string()));
                }
            }
            _ => {}
        }
    }

    fn start_attempt(&mut self, now: Instant) {
        let Some(endpoint) = self.endpoint.clone() else {
            return;
        };
        self.set_status(Status::Connecting);
        self.attempt_started = Some(now);
        match self.connector.open(&endpoint) {
            Ok(transport) => self.transport = Some(transport),
            Err(e) => self.fail(Some(e.to_string())),
        }
    }

    /// The next transport event, or `None` when nothing is pending.
    pub fn next_event(&mut self) -> Option<ConnectionEvent> {
        loop {
            let event = self.transport.as_mut()?.try_recv()?;
            match event {
                TransportEvent::Opened if self.status == Status::Connecting => {
                    return Some(ConnectionEvent::Opened);
                }
                TransportEvent::Opened => continue,
                TransportEvent::Frame(frame) => return Some(ConnectionEvent::Frame(frame)),
                TransportEvent::Closed(reason) => {
                    self.fail(reason);
                    return Some(ConnectionEvent::Closed);
                }
            }
        }
    }

    /// Complete the `Connecting → Connected` transition once registrations
    /// have been replayed.
    pub fn mark_connected(&mut self) {
        if self.status == Status::Connecting && self.transport.is_some() {
            self.attempt_started = None;
            self.set_status(Status::Connected);
        }
    }

    /// Queue `frame` on the live transport.  A send failure drops the link.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Transport`] when there is no transport or the
    /// transport refused the frame.
    pub fn send(&mut self, frame: Frame) -> Result<(), BridgeError> {
        let transport = self
            .transport
            .as_mut()
            .ok_or_else(|| BridgeError::Transport("not connected".to_string()))?;
        if let Err(e) = transport.send(frame) {
            self.fail(Some(e.to_string()));
            return Err(e);
        }
        Ok(())
    }

    /// Drop the link after an error.  The connection intent is kept so the
    /// next attempt follows after the backoff.
    pub fn fail(&mut self, reason: Option<String>) {
        if self.status == Status::Disconnected {
            return;
        }
        match &reason {
            Some(reason) => warn!(endpoint = ?self.endpoint, reason = %reason, "connection lost"),
            None => warn!(endpoint = ?self.endpoint, "connection closed by peer"),
        }
        self.close_transport();
        self.set_status(Status::Disconnected);
        self.last_disconnect = Some(self.clock.now());
    }

    /// Status changes since the last call, oldest first.
    pub fn take_transitions(&mut self) -> Vec<Status> {
        std::mem::take(&mut self.transitions)
    }

    fn close_transport(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            transport.close();
        }
        self.attempt_started = None;
    }

    fn set_status(&mut self, status: Status) {
        if self.status != status {
            info!(from = %self.status, to = %status, "bridge status");
            self.status = status;
            self.transitions.push(status);
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.close_transport();
    }
}
