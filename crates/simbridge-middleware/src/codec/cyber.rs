//! Apollo Cyber RT bridge protocol.
//!
//! Every operation is a one-byte op code followed by length-prefixed
//! fields.  All lengths are little-endian `u32`.
//!
//! ```text
//! RegisterDesc = 1 | count | (len | FileDescriptorProto)*
//! AddReader    = 2 | len | channel | len | type
//! AddWriter    = 3 | len | channel | len | type
//! Publish      = 4 | len | channel | len | protobuf payload
//! ```
//!
//! The peer only ever sends `Publish`.  Anything else means the byte
//! stream lost its framing.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use simbridge_types::wire::proto;
use simbridge_types::{BridgeError, Protocol, Record};
use tracing::trace;

use super::{Codec, Frame, FrameError, Inbound};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Op {
    RegisterDesc = 1,
    AddReader = 2,
    AddWriter = 3,
    Publish = 4,
}

const LEN: usize = 4;

/// Longest channel name or payload accepted from the peer.  A larger
/// length prefix means the stream lost its framing.
pub const MAX_FIELD_LEN: usize = 64 * 1024 * 1024;

#[derive(Debug, Default)]
pub struct CyberCodec {
    pending: BytesMut,
}

impl CyberCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes received but not yet forming a complete operation.
    pub fn buffered(&self) -> usize {
        self.pending.len()
    }
}

fn put_field(buf: &mut BytesMut, field: &[u8]) -> Result<(), BridgeError> {
    let len = u32::try_from(field.len())
        .map_err(|_| BridgeError::Codec(format!("field of {} bytes is too long", field.len())))?;
    buf.put_u32_le(len);
    buf.put_slice(field);
    Ok(())
}

fn channel_op(op: Op, channel: &str, type_name: &str) -> Result<BytesMut, BridgeError> {
    let mut buf = BytesMut::with_capacity(1 + 2 * LEN + channel.len() + type_name.len());
    buf.put_u8(op as u8);
    put_field(&mut buf, channel.as_bytes())?;
    put_field(&mut buf, type_name.as_bytes())?;
    Ok(buf)
}

fn read_len(buf: &[u8], at: usize) -> Result<Option<usize>, FrameError> {
    let Some(mut raw) = buf.get(at..at + LEN) else {
        return Ok(None);
    };
    let len = raw.get_u32_le() as usize;
    if len > MAX_FIELD_LEN {
        return Err(FrameError::Desync(format!("field length {len} exceeds {MAX_FIELD_LEN}")));
    }
    Ok(Some(len))
}

/// Split one complete `Publish` off the front of `buf`.
///
/// Returns `Ok(None)` when more bytes are needed.
pub fn split_frame(buf: &mut BytesMut) -> Result<Option<(Bytes, Bytes)>, FrameError> {
    let Some(&op) = buf.first() else {
        return Ok(None);
    };
    if op != Op::Publish as u8 {
        return Err(FrameError::Desync(format!("unexpected op {op}")));
    }
    let mut offset = 1;
    let Some(channel_len) = read_len(buf, offset)? else {
        return Ok(None);
    };
    offset += LEN;
    let channel_at = offset;
    offset += channel_len;
    let Some(payload_len) = read_len(buf, offset)? else {
        return Ok(None);
    };
    offset += LEN;
    let payload_at = offset;
    offset += payload_len;
    if buf.len() < offset {
        return Ok(None);
    }
    let mut frame = buf.split_to(offset).freeze();
    let payload = frame.split_off(payload_at);
    let channel = frame.slice(channel_at..channel_at + channel_len);
    Ok(Some((channel, payload)))
}

impl Codec for CyberCodec {
    fn protocol(&self) -> Protocol {
        Protocol::Cyber
    }

    /// Sends `RegisterDesc` with no descriptors ahead of `AddWriter`.
    ///
    /// No `FileDescriptorProto`s are shipped, so the Apollo side must
    /// already know `type_name` (it resolves the types it was built with).
    /// Advertising a type it does not know leaves the channel unreadable
    /// there.
    fn advertise(&self, topic: &str, type_name: &str) -> Result<Frame, BridgeError> {
        let writer = channel_op(Op::AddWriter, topic, type_name)?;
        let mut buf = BytesMut::with_capacity(1 + LEN + writer.len());
        buf.put_u8(Op::RegisterDesc as u8);
        buf.put_u32_le(0);
        buf.extend_from_slice(&writer);
        Ok(Frame::Binary(buf.freeze()))
    }

    fn subscribe(&self, topic: &str, type_name: &str) -> Result<Frame, BridgeError> {
        channel_op(Op::AddReader, topic, type_name).map(|buf| Frame::Binary(buf.freeze()))
    }

    fn advertise_service(&self, _service: &str, _type_name: &str) -> Result<Frame, BridgeError> {
        Err(BridgeError::Unsupported {
            operation: "services",
            protocol: Protocol::Cyber,
        })
    }

    fn publish(&self, topic: &str, msg: &Record) -> Result<Frame, BridgeError> {
        let payload = proto::encode(msg);
        let mut buf = BytesMut::with_capacity(1 + 2 * LEN + topic.len() + payload.len());
        buf.put_u8(Op::Publish as u8);
        put_field(&mut buf, topic.as_bytes())?;
        put_field(&mut buf, &payload)?;
        Ok(Frame::Binary(buf.freeze()))
    }

    fn service_response(
        &self,
        _service: &str,
        _id: Option<&serde_json::Value>,
        _values: Option<&Record>,
    ) -> Result<Frame, BridgeError> {
        Err(BridgeError::Unsupported {
            operation: "services",
            protocol: Protocol::Cyber,
        })
    }

    fn decode(&mut self, frame: Frame) -> Vec<Result<Inbound, FrameError>> {
        match frame {
            Frame::Binary(bytes) => self.pending.extend_from_slice(&bytes),
            Frame::Text(text) => self.pending.extend_from_slice(text.as_bytes()),
        }

        let mut out = Vec::new();
        loop {
            match split_frame(&mut self.pending) {
                Ok(Some((channel, payload))) => {
                    trace!(bytes = payload.len(), "cyber publish received");
                    out.push(decode_publish(&channel, &payload));
                }
                Ok(None) => break,
                Err(e) => {
                    self.pending.clear();
                    out.push(Err(e));
                    break;
                }
            }
        }
        out
    }

    fn reset(&mut self) {
        self.pending.clear();
    }
}

fn decode_publish(channel: &[u8], payload: &[u8]) -> Result<Inbound, FrameError> {
    let topic = std::str::from_utf8(channel)
        .map_err(|e| FrameError::Malformed(format!("channel name is not UTF-8: {e}")))?
        .to_string();
    let msg = proto::decode(payload).map_err(|e| FrameError::Malformed(format!("{topic}: {e}")))?;
    Ok(Inbound::Publish { topic, msg })
}

#[cfg(test)]
mod tests {
    use super::*;
    use simbridge_types::{Dialect, Value};

    fn binary(frame: Frame) -> Bytes {
        match frame {
            Frame::Binary(bytes) => bytes,
            Frame::Text(_) => panic!("expected a binary frame"),
        }
    }

    fn publish_bytes(channel: &str, value: u64) -> Bytes {
        let mut record = Record::new(Dialect::Protobuf);
        record.push("v", 1, Value::UInt(value));
        binary(CyberCodec::new().publish(channel, &record).unwrap())
    }

    #[test]
    fn reader_layout() {
        let bytes = binary(CyberCodec::new().subscribe("/ab", "x.Y").unwrap());
        assert_eq!(
            &bytes[..],
            &[2, 3, 0, 0, 0, b'/', b'a', b'b', 3, 0, 0, 0, b'x', b'.', b'Y']
        );
    }

    #[test]
    fn advertise_registers_descriptors_then_writer() {
        let bytes = binary(CyberCodec::new().advertise("/c", "T").unwrap());
        assert_eq!(
            &bytes[..],
            &[1, 0, 0, 0, 0, 3, 2, 0, 0, 0, b'/', b'c', 1, 0, 0, 0, b'T']
        );
    }

    #[test]
    fn publish_layout() {
        let bytes = publish_bytes("/c", 150);
        assert_eq!(
            &bytes[..],
            &[4, 2, 0, 0, 0, b'/', b'c', 3, 0, 0, 0, 0x08, 0x96, 0x01]
        );
    }

    #[test]
    fn partial_input_waits_for_the_rest() {
        let bytes = publish_bytes("/c", 150);
        for split in [1, 3, 6, 9, bytes.len() - 1] {
            let mut codec = CyberCodec::new();
            assert!(codec.decode(Frame::Binary(bytes.slice(..split))).is_empty());
            let out = codec.decode(Frame::Binary(bytes.slice(split..)));
            assert_eq!(out.len(), 1, "split at {split}");
            assert_eq!(codec.buffered(), 0);
        }
    }

    #[test]
    fn several_operations_in_one_chunk() {
        let mut chunk = BytesMut::new();
        chunk.extend_from_slice(&publish_bytes("/a", 1));
        chunk.extend_from_slice(&publish_bytes("/b", 2));
        chunk.extend_from_slice(&publish_bytes("/c", 3)[..4]);

        let mut codec = CyberCodec::new();
        let topics: Vec<_> = codec
            .decode(Frame::Binary(chunk.freeze()))
            .into_iter()
            .map(|r| match r.unwrap() {
                Inbound::Publish { topic, msg } => {
                    assert_eq!(msg.dialect(), Dialect::Protobuf);
                    topic
                }
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_eq!(topics, ["/a", "/b"]);
        assert_eq!(codec.buffered(), 4);
    }

    #[test]
    fn unknown_op_desyncs_and_clears() {
        let mut codec = CyberCodec::new();
        let out = codec.decode(Frame::Binary(Bytes::from_static(&[9, 1, 2, 3])));
        assert!(matches!(out.as_slice(), [Err(FrameError::Desync(_))]));
        assert_eq!(codec.buffered(), 0);
    }

    #[test]
    fn oversized_length_desyncs_instead_of_stalling() {
        let mut codec = CyberCodec::new();
        let out = codec.decode(Frame::Binary(Bytes::from_static(&[4, 0xf0, 0xff, 0xff, 0xff])));
        assert!(matches!(out.as_slice(), [Err(FrameError::Desync(_))]));
        assert_eq!(codec.buffered(), 0);

        // oversized payload length behind a valid channel
        let mut chunk = BytesMut::new();
        chunk.extend_from_slice(&[4, 1, 0, 0, 0, b'/']);
        chunk.put_u32_le(u32::try_from(MAX_FIELD_LEN + 1).unwrap());
        let out = codec.decode(Frame::Binary(chunk.freeze()));
        assert!(matches!(out.as_slice(), [Err(FrameError::Desync(_))]));
        assert_eq!(codec.buffered(), 0);

        let out = codec.decode(Frame::Binary(publish_bytes("/ok", 7)));
        assert!(matches!(out.as_slice(), [Ok(Inbound::Publish { topic, .. })] if topic == "/ok"));
    }

    #[test]
    fn bad_payload_is_malformed_but_stream_continues() {
        let mut chunk = BytesMut::new();
        // payload 0x0a 0x05 claims five bytes but has none
        chunk.extend_from_slice(&[4, 1, 0, 0, 0, b'/', 2, 0, 0, 0, 0x0a, 0x05]);
        chunk.extend_from_slice(&publish_bytes("/ok", 7));

        let mut codec = CyberCodec::new();
        let out = codec.decode(Frame::Binary(chunk.freeze()));
        assert_eq!(out.len(), 2);
        assert!(matches!(out[0], Err(FrameError::Malformed(_))));
        assert!(matches!(&out[1], Ok(Inbound::Publish { topic, .. }) if topic == "/ok"));
    }

    #[test]
    fn services_are_unsupported() {
        let codec = CyberCodec::new();
        assert!(matches!(
            codec.advertise_service("/s", "T"),
            Err(BridgeError::Unsupported { .. })
        ));
    }
}
