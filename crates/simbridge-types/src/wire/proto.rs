//! Protobuf binary encoding over the [`Record`] tree.
//!
//! Encoding follows proto2 conventions: repeated scalars are written
//! unpacked (one key per element) and unset optionals are absent.  The
//! decoder is schema-less: it produces a tag-keyed record whose leaves are
//! raw wire values, and accepts packed repeated fields when the typed
//! [`FieldValue`](crate::FieldValue) asks for them.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use prost::encoding::{WireType, decode_key, decode_varint, encode_key, encode_varint};

use crate::error::DecodeError;
use crate::time::Time;
use crate::value::{Dialect, Record, Value};

/// Serialize a record to protobuf bytes.  Fields with tag `0` have no wire
/// representation and are skipped.
pub fn encode(record: &Record) -> Bytes {
    let mut buf = BytesMut::new();
    encode_into(record, &mut buf);
    buf.freeze()
}

fn encode_into(record: &Record, buf: &mut BytesMut) {
    for field in record.fields() {
        if field.tag != 0 {
            encode_value(field.tag, &field.value, buf);
        }
    }
}

fn encode_value(tag: u32, value: &Value, buf: &mut BytesMut) {
    match value {
        Value::Bool(b) => {
            encode_key(tag, WireType::Varint, buf);
            encode_varint(u64::from(*b), buf);
        }
        Value::Int(n) => {
            encode_key(tag, WireType::Varint, buf);
            encode_varint(*n as u64, buf);
        }
        Value::UInt(n) => {
            encode_key(tag, WireType::Varint, buf);
            encode_varint(*n, buf);
        }
        Value::Enum { value, .. } => {
            encode_key(tag, WireType::Varint, buf);
            encode_varint(i64::from(*value) as u64, buf);
        }
        Value::Float(f) => {
            encode_key(tag, WireType::ThirtyTwoBit, buf);
            buf.put_f32_le(*f);
        }
        Value::Fixed32(n) => {
            encode_key(tag, WireType::ThirtyTwoBit, buf);
            buf.put_u32_le(*n);
        }
        Value::Double(d) => {
            encode_key(tag, WireType::SixtyFourBit, buf);
            buf.put_f64_le(*d);
        }
        Value::Fixed64(n) => {
            encode_key(tag, WireType::SixtyFourBit, buf);
            buf.put_u64_le(*n);
        }
        Value::String(s) => encode_bytes(tag, s.as_bytes(), buf),
        Value::Bytes(b) => encode_bytes(tag, b, buf),
        Value::Time(t) => encode_bytes(tag, &encode_time(t), buf),
        Value::Record(r) => encode_bytes(tag, &encode(r), buf),
        Value::List(items) => {
            for item in items {
                encode_value(tag, item, buf);
            }
        }
    }
}

fn encode_bytes(tag: u32, bytes: &[u8], buf: &mut BytesMut) {
    encode_key(tag, WireType::LengthDelimited, buf);
    encode_varint(bytes.len() as u64, buf);
    buf.put_slice(bytes);
}

fn encode_time(t: &Time) -> Bytes {
    let mut nested = Record::new(Dialect::Protobuf);
    nested.push("sec", 1, Value::Int(i64::from(t.sec)));
    nested.push("nanosec", 2, Value::UInt(u64::from(t.nanosec)));
    encode(&nested)
}

fn malformed(e: impl std::fmt::Display) -> DecodeError {
    DecodeError::new(format!("malformed protobuf: {e}"))
}

/// Parse protobuf bytes into a tag-keyed record of raw wire values.
pub fn decode(bytes: &[u8]) -> Result<Record, DecodeError> {
    let mut buf = bytes;
    let mut record = Record::new(Dialect::Protobuf);
    while buf.has_remaining() {
        let (tag, wire_type) = decode_key(&mut buf).map_err(malformed)?;
        let value = match wire_type {
            WireType::Varint => Value::UInt(decode_varint(&mut buf).map_err(malformed)?),
            WireType::SixtyFourBit => {
                if buf.remaining() < 8 {
                    return Err(malformed(format!("truncated fixed64 in field {tag}")));
                }
                Value::Fixed64(buf.get_u64_le())
            }
            WireType::ThirtyTwoBit => {
                if buf.remaining() < 4 {
                    return Err(malformed(format!("truncated fixed32 in field {tag}")));
                }
                Value::Fixed32(buf.get_u32_le())
            }
            WireType::LengthDelimited => {
                let len = decode_varint(&mut buf).map_err(malformed)?;
                let len = usize::try_from(len).map_err(malformed)?;
                if buf.remaining() < len {
                    return Err(malformed(format!("truncated field {tag}")));
                }
                let value = Value::Bytes(Bytes::copy_from_slice(&buf[..len]));
                buf.advance(len);
                value
            }
            WireType::StartGroup | WireType::EndGroup => {
                return Err(malformed(format!("group in field {tag} is not supported")));
            }
        };
        record.push("", tag, value);
    }
    Ok(record)
}

/// Split a packed repeated varint field.
pub fn unpack_varints(bytes: &[u8]) -> Result<Vec<u64>, DecodeError> {
    let mut buf = bytes;
    let mut out = Vec::new();
    while buf.has_remaining() {
        out.push(decode_varint(&mut buf).map_err(malformed)?);
    }
    Ok(out)
}

/// Split a packed repeated `double` / `fixed64` field.
pub fn unpack_fixed64(bytes: &[u8]) -> Result<Vec<u64>, DecodeError> {
    if bytes.len() % 8 != 0 {
        return Err(malformed("packed fixed64 length is not a multiple of 8"));
    }
    let mut buf = bytes;
    let mut out = Vec::with_capacity(bytes.len() / 8);
    while buf.has_remaining() {
        out.push(buf.get_u64_le());
    }
    Ok(out)
}

/// Split a packed repeated `float` / `fixed32` field.
pub fn unpack_fixed32(bytes: &[u8]) -> Result<Vec<u32>, DecodeError> {
    if bytes.len() % 4 != 0 {
        return Err(malformed("packed fixed32 length is not a multiple of 4"));
    }
    let mut buf = bytes;
    let mut out = Vec::with_capacity(bytes.len() / 4);
    while buf.has_remaining() {
        out.push(buf.get_u32_le());
    }
    Ok(out)
}
