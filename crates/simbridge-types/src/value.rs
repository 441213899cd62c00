//! Protocol-neutral value tree.
//!
//! Messages never serialize themselves straight to bytes.  They shape
//! themselves into a [`Record`] (an ordered list of named, tagged fields)
//! and a wire encoder in [`crate::wire`] walks that tree.  The same record
//! feeds rosbridge JSON, protobuf binary and protobuf text export.
//!
//! Decoders produce records too.  JSON records carry names and tag `0`;
//! protobuf records carry tags and empty names, with leaves left as raw
//! wire values ([`Value::UInt`], [`Value::Fixed32`], [`Value::Fixed64`],
//! [`Value::Bytes`]) until a typed [`FieldValue`](crate::FieldValue)
//! interprets them.

use std::borrow::Cow;

use bytes::Bytes;

use crate::time::Time;

/// Field-shaping dialect, selected once from the endpoint protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    Ros1,
    Ros2,
    Protobuf,
}

/// One node of the value tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f32),
    Double(f64),
    Enum { value: i32, name: &'static str },
    String(String),
    Bytes(Bytes),
    Time(Time),
    List(Vec<Value>),
    Record(Record),
    /// Raw protobuf `I32` wire value.
    Fixed32(u32),
    /// Raw protobuf `I64` wire value.
    Fixed64(u64),
}

impl Value {
    /// Human-readable kind, used in decode errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Int(_) => "integer",
            Value::UInt(_) => "unsigned integer",
            Value::Float(_) => "float",
            Value::Double(_) => "double",
            Value::Enum { .. } => "enum",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Time(_) => "time",
            Value::List(_) => "list",
            Value::Record(_) => "record",
            Value::Fixed32(_) => "fixed32",
            Value::Fixed64(_) => "fixed64",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: Cow<'static, str>,
    pub tag: u32,
    pub value: Value,
}

impl Field {
    fn matches(&self, name: &str, tag: u32) -> bool {
        if self.name.is_empty() {
            tag != 0 && self.tag == tag
        } else {
            self.name == name
        }
    }
}

/// Ordered field list.  Field order is the declaration order of the
/// message, or the arrival order for decoded input.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    dialect: Dialect,
    fields: Vec<Field>,
}

impl Record {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            fields: Vec::new(),
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn push(&mut self, name: impl Into<Cow<'static, str>>, tag: u32, value: Value) {
        self.fields.push(Field {
            name: name.into(),
            tag,
            value,
        });
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Last value stored under `name` (named records) or `tag` (protobuf
    /// records).  Last-wins matches protobuf merge semantics.
    pub fn get(&self, name: &str, tag: u32) -> Option<&Value> {
        self.fields
            .iter()
            .rev()
            .find(|f| f.matches(name, tag))
            .map(|f| &f.value)
    }

    /// Every value stored under `name` / `tag`, in arrival order.
    pub fn get_all<'a>(&'a self, name: &'a str, tag: u32) -> impl Iterator<Item = &'a Value> + 'a {
        self.fields
            .iter()
            .filter(move |f| f.matches(name, tag))
            .map(|f| &f.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_lookup_ignores_tags() {
        let mut r = Record::new(Dialect::Ros1);
        r.push("speed", 0, Value::Double(1.0));
        assert_eq!(r.get("speed", 5), Some(&Value::Double(1.0)));
        assert_eq!(r.get("other", 0), None);
    }

    #[test]
    fn tagged_lookup_is_last_wins() {
        let mut r = Record::new(Dialect::Protobuf);
        r.push("", 3, Value::UInt(1));
        r.push("", 4, Value::UInt(9));
        r.push("", 3, Value::UInt(2));
        assert_eq!(r.get("ignored", 3), Some(&Value::UInt(2)));
        assert_eq!(r.get_all("ignored", 3).count(), 2);
        assert_eq!(r.get("ignored", 0), None);
    }
}
