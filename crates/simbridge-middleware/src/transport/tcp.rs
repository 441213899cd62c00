//! Plain TCP transport for the Cyber RT bridge.
//!
//! The stream carries no message boundaries; each read is handed up as a
//! binary frame and the codec reassembles operations.

use std::time::Duration;

use bytes::BytesMut;
use simbridge_types::BridgeError;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::{Transport, TransportEvent};
use crate::codec::Frame;

const READ_CHUNK: usize = 64 * 1024;

pub struct TcpTransport {
    outgoing: mpsc::UnboundedSender<Frame>,
    incoming: mpsc::UnboundedReceiver<TransportEvent>,
    task: JoinHandle<()>,
    closed: bool,
}

impl TcpTransport {
    /// Start connecting to `authority` (`host:port`) on `handle`.
    pub fn spawn(handle: &Handle, authority: String, connect_timeout: Duration) -> Self {
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (in_tx, in_rx) = mpsc::unbounded_channel();
        let task = handle.spawn(run(authority, connect_timeout, out_rx, in_tx));
        Self {
            outgoing: out_tx,
            incoming: in_rx,
            task,
            closed: false,
        }
    }
}

async fn run(
    authority: String,
    connect_timeout: Duration,
    mut out_rx: mpsc::UnboundedReceiver<Frame>,
    in_tx: mpsc::UnboundedSender<TransportEvent>,
) {
    let stream = match tokio::time::timeout(connect_timeout, TcpStream::connect(authority.as_str())).await {
        Ok(Ok(stream)) => stream,
        Ok(Err(e)) => {
            let _ = in_tx.send(TransportEvent::Closed(Some(e.to_string())));
            return;
        }
        Err(_) => {
            let _ = in_tx.send(TransportEvent::Closed(Some(format!(
                "connect to {authority} timed out"
            ))));
            return;
        }
    };
    if let Err(e) = stream.set_nodelay(true) {
        debug!(error = %e, "could not disable Nagle");
    }
    debug!(authority = %authority, "tcp open");
    if in_tx.send(TransportEvent::Opened).is_err() {
        return;
    }

    let (mut reader, mut writer) = stream.into_split();
    let mut buf = BytesMut::with_capacity(READ_CHUNK);
    let reason = loop {
        tokio::select! {
            frame = out_rx.recv() => {
                let Some(frame) = frame else {
                    let _ = writer.shutdown().await;
                    return;
                };
                let bytes = match &frame {
                    Frame::Text(text) => text.as_bytes(),
                    Frame::Binary(bytes) => &bytes[..],
                };
                if let Err(e) = writer.write_all(bytes).await {
                    break Some(e.to_string());
                }
            }
            read = reader.read_buf(&mut buf) => {
                match read {
                    Ok(0) => break None,
                    Ok(_) => {
                        let chunk = buf.split().freeze();
                        let _ = in_tx.send(TransportEvent::Frame(Frame::Binary(chunk)));
                        buf.reserve(READ_CHUNK);
                    }
                    Err(e) => {
                        warn!(authority = %authority, error = %e, "tcp read error");
                        break Some(e.to_string());
                    }
                }
            }
        }
    };
    let _ = in_tx.send(TransportEvent::Closed(reason));
}

impl Transport for TcpTransport {
    fn send(&mut self, frame: Frame) -> Result<(), BridgeError> {
        if self.closed {
            return Err(BridgeError::Transport("tcp stream is closed".to_string()));
        }
        self.outgoing
            .send(frame)
            .map_err(|_| BridgeError::Transport("tcp task has stopped".to_string()))
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

impl Drop for TcpTransport {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    async fn next_event(transport: &mut TcpTransport) -> TransportEvent {
        for _ in 0..200 {
            if let Some(event) = transport.try_recv() {
                return event;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("no transport event");
    }

    #[tokio::test]
    async fn exchanges_bytes_with_a_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 3];
            socket.read_exact(&mut buf).await.unwrap();
            socket.write_all(&[4, 5]).await.unwrap();
            buf
        });

        let mut transport = TcpTransport::spawn(&Handle::current(), addr.to_string(), Duration::from_secs(2));
        assert_eq!(next_event(&mut transport).await, TransportEvent::Opened);
        transport.send(Frame::Binary(bytes::Bytes::from_static(&[1, 2, 3]))).unwrap();
        assert_eq!(
            next_event(&mut transport).await,
            TransportEvent::Frame(Frame::Binary(bytes::Bytes::from_static(&[4, 5])))
        );
        assert_eq!(server.await.unwrap(), [1, 2, 3]);
        assert_eq!(next_event(&mut transport).await, TransportEvent::Closed(None));
    }

    #[tokio::test]
    async fn refused_connection_reports_closed() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let mut transport = TcpTransport::spawn(&Handle::current(), addr.to_string(), Duration::from_secs(2));
        assert!(matches!(next_event(&mut transport).await, TransportEvent::Closed(Some(_))));
        transport.close();
        assert!(transport.send(Frame::Binary(bytes::Bytes::new())).is_err());
    }
}
