//! WebSocket client transport for rosbridge servers.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use simbridge_types::BridgeError;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};

use super::{Transport, TransportEvent};
use crate::codec::Frame;

pub struct WebSocketTransport {
    outgoing: mpsc::UnboundedSender<Frame>,
    incoming: mpsc::UnboundedReceiver<TransportEvent>,
    task: JoinHandle<()>,
    closed: bool,
}

impl WebSocketTransport {
    /// Start connecting to `url` on `handle`.
    pub fn spawn(handle: &Handle, url: String, connect_timeout: Duration) -> Self {
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (in_tx, in_rx) = mpsc::unbounded_channel();
        let task = handle.spawn(run(url, connect_timeout, out_rx, in_tx));
        Self {
            outgoing: out_tx,
            incoming: in_rx,
            task,
            closed: false,
        }
    }
}

async fn run(
    url: String,
    connect_timeout: Duration,
    mut out_rx: mpsc::UnboundedReceiver<Frame>,
    in_tx: mpsc::UnboundedSender<TransportEvent>,
) {
    let stream = match tokio::time::timeout(connect_timeout, connect_async(url.as_str())).await {
        Ok(Ok((stream, _response))) => stream,
        Ok(Err(e)) => {
            let _ = in_tx.send(TransportEvent::Closed(Some(e.to_string())));
            return;
        }
        Err(_) => {
            let _ = in_tx.send(TransportEvent::Closed(Some(format!(
                "connect to {url} timed out"
            ))));
            return;
        }
    };
    debug!(url = %url, "websocket open");
    if in_tx.send(TransportEvent::Opened).is_err() {
        return;
    }

    let (mut ws_tx, mut ws_rx) = stream.split();
    let reason = loop {
        tokio::select! {
            frame = out_rx.recv() => {
                let Some(frame) = frame else {
                    let _ = ws_tx.send(Message::Close(None)).await;
                    return;
                };
                let msg = match frame {
                    Frame::Text(text) => Message::Text(text.into()),
                    Frame::Binary(bytes) => Message::Binary(bytes),
                };
                if let Err(e) = ws_tx.send(msg).await {
                    break Some(e.to_string());
                }
            }
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let _ = in_tx.send(TransportEvent::Frame(Frame::Text(text.as_str().to_string())));
                    }
                    Some(Ok(Message::Binary(bytes))) => {
                        let _ = in_tx.send(TransportEvent::Frame(Frame::Binary(bytes)));
                    }
                    Some(Ok(Message::Close(frame))) => {
                        break frame.map(|f| f.reason.as_str().to_string());
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!(url = %url, error = %e, "websocket read error");
                        break Some(e.to_string());
                    }
                    None => break None,
                }
            }
        }
    };
    let _ = in_tx.send(TransportEvent::Closed(reason));
}

impl Transport for WebSocketTransport {
    fn send(&mut self, frame: Frame) -> Result<(), BridgeError> {
        if self.closed {
            return Err(BridgeError::Transport("websocket is closed".to_string()));
        }
        self.outgoing
            .send(frame)
            .map_err(|_| BridgeError::Transport("websocket task has stopped".to_string()))
    }

    fn try_recv(&mut self) -> Option<TransportEvent> {
        if self.closed {
            return None;
        }
        self.incoming.try_recv().ok()
    }

    fn close(&mut self) {
        self.closed = true;
        self.task.abort();
    }
}

impl Drop for WebSocketTransport {
    fn drop(&mut self) {
        self.task.abort();
    }
}
