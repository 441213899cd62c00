//! In-process transport driven by a scripted peer.
//!
//! [`MemoryConnector`] hands out transports whose far end is a
//! [`MemoryPeer`].  The peer decides when a connection opens, injects
//! inbound frames and inspects what the bridge sent.

use std::collections::VecDeque;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use simbridge_types::{BridgeError, Endpoint};

use super::{Connector, Transport, TransportEvent};
use crate::codec::Frame;

#[derive(Debug, Default)]
struct Link {
    inbox: VecDeque<TransportEvent>,
    sent: Vec<Frame>,
    closed: bool,
}

#[derive(Debug, Default)]
struct Shared {
    attempts: Vec<Endpoint>,
    current: Option<Arc<Mutex<Link>>>,
    auto_accept: bool,
}

/// Creates a connector and the peer that controls it.
pub fn pair() -> (MemoryConnector, MemoryPeer) {
    let shared = Arc::new(Mutex::new(Shared::default()));
    (
        MemoryConnector {
            shared: Arc::clone(&shared),
        },
        MemoryPeer { shared },
    )
}

#[derive(Debug, Clone)]
pub struct MemoryConnector {
    shared: Arc<Mutex<Shared>>,
}

impl Connector for MemoryConnector {
    fn open(&mut self, endpoint: &Endpoint) -> Result<Box<dyn Transport>, BridgeError> {
        let mut shared = self.shared.lock();
        let mut link = Link::default();
        if shared.auto_accept {
            link.inbox.push_back(TransportEvent::Opened);
        }
        let link = Arc::new(Mutex::new(link));
        shared.attempts.push(endpoint.clone());
        shared.current = Some(Arc::clone(&link));
        Ok(Box::new(MemoryTransport { link }))
    }
}

struct MemoryTransport {
    link: Arc<Mutex<Link>>,
}

impl Transport for MemoryTransport {
    fn send(&mut self, frame: Frame) -> Result<(), BridgeError> {
        let mut link = self.link.lock();
        if link.closed {
            return Err(BridgeError::Transport("memory link is closed".to_string()));
        }
        link.sent.push(frame);
        Ok(())
    }

    fn try_recv(&mut self) -> Option<TransportEvent> {
        self.link.lock().inbox.pop_front()
    }

    fn close(&mut self) {
        let mut link = self.link.lock();
        link.closed = true;
        link.inbox.clear();
    }
}

/// The far end of the most recent [`MemoryConnector`] transport.
#[derive(Debug, Clone)]
pub struct MemoryPeer {
    shared: Arc<Mutex<Shared>>,
}

impl MemoryPeer {
    /// Number of transports opened so far.
    pub fn attempts(&self) -> usize {
        self.shared.lock().attempts.len()
    }

    pub fn last_endpoint(&self) -> Option<Endpoint> {
        self.shared.lock().attempts.last().cloned()
    }

    /// Open every future connection immediately.
    pub fn set_auto_accept(&self, auto: bool) {
        self.shared.lock().auto_accept = auto;
    }

    fn with_link<R>(&self, f: impl FnOnce(&mut Link) -> R) -> Option<R> {
        let link = self.shared.lock().current.clone()?;
        let mut link = link.lock();
        Some(f(&mut link))
    }

    fn push(&self, event: TransportEvent) {
        self.with_link(|link| {
            if !link.closed {
                link.inbox.push_back(event);
            }
        });
    }

    /// Complete the pending connection.
    pub fn accept(&self) {
        self.push(TransportEvent::Opened);
    }

    /// Fail the pending connection.
    pub fn refuse(&self, reason: &str) {
        self.drop_connection(reason);
    }

    /// Close the current link from the far end.
    pub fn drop_connection(&self, reason: &str) {
        self.push(TransportEvent::Closed(Some(reason.to_string())));
        self.with_link(|link| link.closed = true);
    }

    pub fn send_text(&self, text: impl Into<String>) {
        self.push(TransportEvent::Frame(Frame::Text(text.into())));
    }

    pub fn send_binary(&self, bytes: impl Into<Bytes>) {
        self.push(TransportEvent::Frame(Frame::Binary(bytes.into())));
    }

    /// Frames the bridge sent on the current link since the last call.
    pub fn take_sent(&self) -> Vec<Frame> {
        self.with_link(|link| std::mem::take(&mut link.sent))
            .unwrap_or_default()
    }

    /// Like [`take_sent`](Self::take_sent), keeping only text frames.
    pub fn take_sent_text(&self) -> Vec<String> {
        self.take_sent()
            .into_iter()
            .filter_map(|frame| match frame {
                Frame::Text(text) => Some(text),
                Frame::Binary(_) => None,
            })
            .collect()
    }

    /// Whether the current link has been closed by either side.
    pub fn is_closed(&self) -> bool {
        self.with_link(|link| link.closed).unwrap_or(true)
    }
}
