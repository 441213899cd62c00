//! Declared-schema message model.
//!
//! A message type lists its fields once (name, protobuf tag, Rust type) via
//! the [`message!`](crate::message!) macro.  Encoding walks the fields in
//! declaration order and asks each [`FieldValue`] to contribute a
//! [`Value`]; decoding looks each field up by name (JSON) or tag
//! (protobuf) and is lenient about numeric representations.
//!
//! | Rust field type | Unset behaviour |
//! |-----------------|-----------------|
//! | `T` (scalar, record, enum) | always written; missing on decode → `Default` |
//! | `Option<T>` | `None` is absent from the output |
//! | `Vec<T>` | written as a list; protobuf writes one entry per element |
//! | `Option<E>` with `= oneof` | only the set member is written, keyed by its name |

use std::borrow::Cow;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::Bytes;

use crate::endpoint::Protocol;
use crate::error::DecodeError;
use crate::time::Time;
use crate::value::{Dialect, Record, Value};
use crate::wire::proto;

// ────────────────────────────────────────────────────────────────────────────
// Type descriptors
// ────────────────────────────────────────────────────────────────────────────

/// Wire type names of a message for each middleware family.
///
/// ROS names are written in ROS1 form (`pkg/Type`); the ROS2 form
/// (`pkg/msg/Type`, `pkg/srv/Type`) is derived.  A missing name means the
/// type cannot be used on that protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeDescriptor {
    pub ros: Option<&'static str>,
    pub cyber: Option<&'static str>,
}

impl TypeDescriptor {
    /// Record types that only ever appear nested inside other messages.
    pub const NESTED: TypeDescriptor = TypeDescriptor {
        ros: None,
        cyber: None,
    };

    pub const fn ros(name: &'static str) -> Self {
        Self {
            ros: Some(name),
            cyber: None,
        }
    }

    pub const fn cyber(name: &'static str) -> Self {
        Self {
            ros: None,
            cyber: Some(name),
        }
    }

    pub const fn both(ros: &'static str, cyber: &'static str) -> Self {
        Self {
            ros: Some(ros),
            cyber: Some(cyber),
        }
    }

    /// Topic type name on `protocol`, or `None` when unsupported.
    pub fn message_type(&self, protocol: Protocol) -> Option<Cow<'static, str>> {
        self.wire_name(protocol, "msg")
    }

    /// Service type name on `protocol`, or `None` when unsupported.
    pub fn service_type(&self, protocol: Protocol) -> Option<Cow<'static, str>> {
        self.wire_name(protocol, "srv")
    }

    fn wire_name(&self, protocol: Protocol, kind: &str) -> Option<Cow<'static, str>> {
        match protocol {
            Protocol::Ros1 => self.ros.map(Cow::Borrowed),
            Protocol::Ros2 => self.ros.map(|name| match name.split_once('/') {
                Some((pkg, ty)) if !ty.contains('/') => Cow::Owned(format!("{pkg}/{kind}/{ty}")),
                _ => Cow::Borrowed(name),
            }),
            Protocol::Cyber => self.cyber.map(Cow::Borrowed),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Message / Service
// ────────────────────────────────────────────────────────────────────────────

/// A typed wire message.  Implemented by [`message!`](crate::message!).
pub trait Message: Sized + Send + 'static {
    const DESCRIPTOR: TypeDescriptor;

    /// Append this message's set fields to `out`, in declaration order.
    fn encode(&self, out: &mut Record);

    /// Rebuild the message from a decoded record.
    fn decode(record: &Record) -> Result<Self, DecodeError>;

    fn to_record(&self, dialect: Dialect) -> Record {
        let mut record = Record::new(dialect);
        self.encode(&mut record);
        record
    }
}

/// A request/response service type.
pub trait Service: Send + 'static {
    const DESCRIPTOR: TypeDescriptor;
    type Request: Message;
    type Response: Message;
}

// ────────────────────────────────────────────────────────────────────────────
// Fields
// ────────────────────────────────────────────────────────────────────────────

/// A Rust type that can occupy a message field.
pub trait FieldValue: Sized + Default {
    /// Shape the value.  `None` leaves the field out of the encoding.
    fn to_value(&self, dialect: Dialect) -> Option<Value>;

    fn from_value(value: &Value) -> Result<Self, DecodeError>;

    /// Decode a packed repeated field.  Only numeric scalars pack.
    fn from_packed(_bytes: &[u8]) -> Option<Result<Vec<Self>, DecodeError>> {
        None
    }

    fn write(&self, name: &'static str, tag: u32, out: &mut Record) {
        if let Some(value) = self.to_value(out.dialect()) {
            out.push(name, tag, value);
        }
    }

    fn read(record: &Record, name: &str, tag: u32) -> Result<Self, DecodeError> {
        match record.get(name, tag) {
            Some(value) => Self::from_value(value).map_err(|e| e.at(name)),
            None => Ok(Self::default()),
        }
    }
}

/// A tagged union stored in an `Option<Self>` field declared `= oneof`.
pub trait OneOf: Sized {
    /// Write the active member under its own field name.
    fn write_member(&self, out: &mut Record);

    /// Find whichever member is present, if any.
    fn read_member(record: &Record) -> Result<Option<Self>, DecodeError>;
}

#[doc(hidden)]
pub fn write_oneof<E: OneOf>(value: &Option<E>, out: &mut Record) {
    if let Some(member) = value {
        member.write_member(out);
    }
}

#[doc(hidden)]
pub fn read_oneof<E: OneOf>(record: &Record) -> Result<Option<E>, DecodeError> {
    E::read_member(record)
}

/// Decode a nested message from either a named record or raw protobuf bytes.
pub fn decode_nested<M: Message>(value: &Value) -> Result<M, DecodeError> {
    match value {
        Value::Record(record) => M::decode(record),
        Value::Bytes(bytes) => M::decode(&proto::decode(bytes)?),
        other => Err(DecodeError::type_mismatch("record", other)),
    }
}

impl<T: FieldValue> FieldValue for Option<T> {
    fn to_value(&self, dialect: Dialect) -> Option<Value> {
        self.as_ref().and_then(|v| v.to_value(dialect))
    }

    fn from_value(value: &Value) -> Result<Self, DecodeError> {
        T::from_value(value).map(Some)
    }
}

impl<T: FieldValue> FieldValue for Vec<T> {
    fn to_value(&self, dialect: Dialect) -> Option<Value> {
        Some(Value::List(
            self.iter().filter_map(|v| v.to_value(dialect)).collect(),
        ))
    }

    fn from_value(value: &Value) -> Result<Self, DecodeError> {
        match value {
            Value::List(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| T::from_value(item).map_err(|e| e.at(&i.to_string())))
                .collect(),
            Value::Bytes(bytes) => match T::from_packed(bytes) {
                Some(unpacked) => unpacked,
                None => Ok(vec![T::from_value(value)?]),
            },
            single => Ok(vec![T::from_value(single)?]),
        }
    }

    fn read(record: &Record, name: &str, tag: u32) -> Result<Self, DecodeError> {
        let mut out = Vec::new();
        for value in record.get_all(name, tag) {
            out.extend(Self::from_value(value).map_err(|e| e.at(name))?);
        }
        Ok(out)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Scalar conversions
// ────────────────────────────────────────────────────────────────────────────

fn as_i64(value: &Value) -> Result<i64, DecodeError> {
    match value {
        Value::Int(n) => Ok(*n),
        // protobuf varints carry negative int32/int64 sign-extended
        Value::UInt(n) => Ok(*n as i64),
        Value::Bool(b) => Ok(i64::from(*b)),
        Value::Enum { value, .. } => Ok(i64::from(*value)),
        Value::Fixed64(n) => Ok(*n as i64),
        Value::Fixed32(n) => Ok(i64::from(*n as i32)),
        Value::Double(d) if d.is_finite() && d.fract() == 0.0 => Ok(*d as i64),
        other => Err(DecodeError::type_mismatch("integer", other)),
    }
}

fn as_u64(value: &Value) -> Result<u64, DecodeError> {
    match value {
        Value::UInt(n) | Value::Fixed64(n) => Ok(*n),
        Value::Fixed32(n) => Ok(u64::from(*n)),
        Value::Bool(b) => Ok(u64::from(*b)),
        Value::Int(n) => u64::try_from(*n)
            .map_err(|_| DecodeError::new(format!("{n} is negative for an unsigned field"))),
        Value::Double(d) if d.is_finite() && d.fract() == 0.0 && *d >= 0.0 => Ok(*d as u64),
        other => Err(DecodeError::type_mismatch("unsigned integer", other)),
    }
}

fn as_f64(value: &Value) -> Result<f64, DecodeError> {
    match value {
        Value::Double(d) => Ok(*d),
        Value::Float(f) => Ok(f64::from(*f)),
        Value::Int(n) => Ok(*n as f64),
        Value::UInt(n) => Ok(*n as f64),
        Value::Fixed64(bits) => Ok(f64::from_bits(*bits)),
        Value::Fixed32(bits) => Ok(f64::from(f32::from_bits(*bits))),
        other => Err(DecodeError::type_mismatch("double", other)),
    }
}

fn out_of_range(n: impl std::fmt::Display, ty: &str) -> DecodeError {
    DecodeError::new(format!("{n} does not fit in {ty}"))
}

macro_rules! signed_field {
    ($($ty:ty),*) => {$(
        impl FieldValue for $ty {
            fn to_value(&self, _dialect: Dialect) -> Option<Value> {
                Some(Value::Int(i64::from(*self)))
            }

            fn from_value(value: &Value) -> Result<Self, DecodeError> {
                let n = as_i64(value)?;
                <$ty>::try_from(n).map_err(|_| out_of_range(n, stringify!($ty)))
            }

            fn from_packed(bytes: &[u8]) -> Option<Result<Vec<Self>, DecodeError>> {
                Some(proto::unpack_varints(bytes).and_then(|raw| {
                    raw.into_iter()
                        .map(|n| Self::from_value(&Value::UInt(n)))
                        .collect()
                }))
            }
        }
    )*};
}

macro_rules! unsigned_field {
    ($($ty:ty),*) => {$(
        impl FieldValue for $ty {
            fn to_value(&self, _dialect: Dialect) -> Option<Value> {
                Some(Value::UInt(u64::from(*self)))
            }

            fn from_value(value: &Value) -> Result<Self, DecodeError> {
                let n = as_u64(value)?;
                <$ty>::try_from(n).map_err(|_| out_of_range(n, stringify!($ty)))
            }

            fn from_packed(bytes: &[u8]) -> Option<Result<Vec<Self>, DecodeError>> {
                Some(proto::unpack_varints(bytes).and_then(|raw| {
                    raw.into_iter()
                        .map(|n| Self::from_value(&Value::UInt(n)))
                        .collect()
                }))
            }
        }
    )*};
}

signed_field!(i8, i16, i32, i64);
unsigned_field!(u8, u16, u32, u64);

impl FieldValue for bool {
    fn to_value(&self, _dialect: Dialect) -> Option<Value> {
        Some(Value::Bool(*self))
    }

    fn from_value(value: &Value) -> Result<Self, DecodeError> {
        match value {
            Value::Bool(b) => Ok(*b),
            Value::UInt(n) => Ok(*n != 0),
            Value::Int(n) => Ok(*n != 0),
            other => Err(DecodeError::type_mismatch("bool", other)),
        }
    }

    fn from_packed(bytes: &[u8]) -> Option<Result<Vec<Self>, DecodeError>> {
        Some(proto::unpack_varints(bytes).map(|raw| raw.into_iter().map(|n| n != 0).collect()))
    }
}

impl FieldValue for f64 {
    fn to_value(&self, _dialect: Dialect) -> Option<Value> {
        Some(Value::Double(*self))
    }

    fn from_value(value: &Value) -> Result<Self, DecodeError> {
        as_f64(value)
    }

    fn from_packed(bytes: &[u8]) -> Option<Result<Vec<Self>, DecodeError>> {
        Some(proto::unpack_fixed64(bytes).map(|raw| raw.into_iter().map(f64::from_bits).collect()))
    }
}

impl FieldValue for f32 {
    fn to_value(&self, _dialect: Dialect) -> Option<Value> {
        Some(Value::Float(*self))
    }

    fn from_value(value: &Value) -> Result<Self, DecodeError> {
        match value {
            Value::Float(f) => Ok(*f),
            Value::Fixed32(bits) => Ok(f32::from_bits(*bits)),
            other => as_f64(other).map(|d| d as f32),
        }
    }

    fn from_packed(bytes: &[u8]) -> Option<Result<Vec<Self>, DecodeError>> {
        Some(proto::unpack_fixed32(bytes).map(|raw| raw.into_iter().map(f32::from_bits).collect()))
    }
}

impl FieldValue for String {
    fn to_value(&self, _dialect: Dialect) -> Option<Value> {
        Some(Value::String(self.clone()))
    }

    fn from_value(value: &Value) -> Result<Self, DecodeError> {
        match value {
            Value::String(s) => Ok(s.clone()),
            Value::Bytes(b) => String::from_utf8(b.to_vec())
                .map_err(|e| DecodeError::new(format!("invalid UTF-8: {e}"))),
            other => Err(DecodeError::type_mismatch("string", other)),
        }
    }
}

/// Raw byte payloads (images, point clouds).  ROS1 rosbridge expects
/// base64 text, ROS2 a number array, protobuf a length-delimited field.
impl FieldValue for Bytes {
    fn to_value(&self, _dialect: Dialect) -> Option<Value> {
        Some(Value::Bytes(self.clone()))
    }

    fn from_value(value: &Value) -> Result<Self, DecodeError> {
        match value {
            Value::Bytes(b) => Ok(b.clone()),
            Value::String(s) => BASE64
                .decode(s)
                .map(Bytes::from)
                .map_err(|e| DecodeError::new(format!("invalid base64: {e}"))),
            Value::List(items) => items
                .iter()
                .map(|item| {
                    let n = as_u64(item)?;
                    u8::try_from(n).map_err(|_| out_of_range(n, "u8"))
                })
                .collect::<Result<Vec<u8>, _>>()
                .map(Bytes::from),
            other => Err(DecodeError::type_mismatch("bytes", other)),
        }
    }
}

impl FieldValue for Time {
    fn to_value(&self, _dialect: Dialect) -> Option<Value> {
        Some(Value::Time(*self))
    }

    fn from_value(value: &Value) -> Result<Self, DecodeError> {
        let record = match value {
            Value::Time(t) => return Ok(*t),
            Value::Record(record) => Cow::Borrowed(record),
            Value::Bytes(bytes) => Cow::Owned(proto::decode(bytes)?),
            other => return Err(DecodeError::type_mismatch("time", other)),
        };
        let sec = record.get("secs", 1).or_else(|| record.get("sec", 1));
        let nanosec = record.get("nsecs", 2).or_else(|| record.get("nanosec", 2));
        Ok(Time {
            sec: sec.map(i32::from_value).transpose()?.unwrap_or_default(),
            nanosec: nanosec.map(u32::from_value).transpose()?.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ros2_names_gain_kind_segment() {
        let d = TypeDescriptor::ros("std_msgs/String");
        assert_eq!(d.message_type(Protocol::Ros1).unwrap(), "std_msgs/String");
        assert_eq!(d.message_type(Protocol::Ros2).unwrap(), "std_msgs/msg/String");
        assert_eq!(d.service_type(Protocol::Ros2).unwrap(), "std_msgs/srv/String");
        assert!(d.message_type(Protocol::Cyber).is_none());
    }

    #[test]
    fn cyber_only_descriptor() {
        let d = TypeDescriptor::cyber("apollo.canbus.Chassis");
        assert!(d.message_type(Protocol::Ros1).is_none());
        assert_eq!(
            d.message_type(Protocol::Cyber).unwrap(),
            "apollo.canbus.Chassis"
        );
    }

    #[test]
    fn negative_int32_from_protobuf_varint() {
        let raw = Value::UInt((-5i64) as u64);
        assert_eq!(i32::from_value(&raw).unwrap(), -5);
    }

    #[test]
    fn unsigned_rejects_negative_json() {
        let err = u32::from_value(&Value::Int(-1)).unwrap_err();
        assert!(err.reason().contains("negative"));
    }

    #[test]
    fn double_accepts_integers_and_raw_bits() {
        assert_eq!(f64::from_value(&Value::UInt(3)).unwrap(), 3.0);
        assert_eq!(
            f64::from_value(&Value::Fixed64(2.5f64.to_bits())).unwrap(),
            2.5
        );
        assert!(f64::from_value(&Value::String("x".into())).is_err());
    }

    #[test]
    fn bytes_accept_base64_and_arrays() {
        let b64 = Bytes::from_value(&Value::String("AQID".into())).unwrap();
        assert_eq!(&b64[..], &[1, 2, 3]);

        let arr = Value::List(vec![Value::UInt(4), Value::UInt(5)]);
        assert_eq!(&Bytes::from_value(&arr).unwrap()[..], &[4, 5]);

        let too_big = Value::List(vec![Value::UInt(300)]);
        assert!(Bytes::from_value(&too_big).is_err());
    }

    #[test]
    fn time_accepts_both_ros_spellings() {
        let mut ros1 = Record::new(Dialect::Ros1);
        ros1.push("secs", 0, Value::UInt(10));
        ros1.push("nsecs", 0, Value::UInt(20));
        assert_eq!(
            Time::from_value(&Value::Record(ros1)).unwrap(),
            Time::new(10, 20)
        );

        let mut ros2 = Record::new(Dialect::Ros2);
        ros2.push("sec", 0, Value::Int(-1));
        ros2.push("nanosec", 0, Value::UInt(7));
        assert_eq!(
            Time::from_value(&Value::Record(ros2)).unwrap(),
            Time::new(-1, 7)
        );
    }

    #[test]
    fn missing_plain_field_reads_default_and_vec_collects_repeats() {
        let mut r = Record::new(Dialect::Protobuf);
        r.push("", 2, Value::Fixed64(1.0f64.to_bits()));
        r.push("", 2, Value::Fixed64(2.0f64.to_bits()));
        assert_eq!(f64::read(&r, "x", 1).unwrap(), 0.0);
        assert_eq!(Vec::<f64>::read(&r, "v", 2).unwrap(), vec![1.0, 2.0]);
        assert_eq!(Option::<f64>::read(&r, "y", 3).unwrap(), None);
    }

    #[test]
    fn vec_error_carries_index_path() {
        let mut r = Record::new(Dialect::Ros1);
        r.push(
            "values",
            0,
            Value::List(vec![Value::UInt(1), Value::String("bad".into())]),
        );
        let err = Vec::<u32>::read(&r, "values", 0).unwrap_err();
        assert_eq!(err.path(), "values.1");
    }
}
