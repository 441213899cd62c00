//! Protobuf text format writer.
//!
//! Produces the layout Apollo tooling reads for `base_map.txt`: top-level
//! fields without an enclosing brace pair, nested messages as
//! `name {` … `}` blocks indented by two spaces, repeated fields as
//! repeated entries and enums by symbolic name.

use std::fmt::Write as _;

use crate::value::{Record, Value};

const INDENT: &str = "  ";

/// Render a record as protobuf text.
pub fn to_text(record: &Record) -> String {
    let mut out = String::new();
    write_record(record, 0, &mut out);
    out
}

fn write_record(record: &Record, depth: usize, out: &mut String) {
    for field in record.fields() {
        write_field(&field.name, &field.value, depth, out);
    }
}

fn write_field(name: &str, value: &Value, depth: usize, out: &mut String) {
    match value {
        Value::List(items) => {
            for item in items {
                write_field(name, item, depth, out);
            }
        }
        Value::Record(record) => {
            pad(depth, out);
            out.push_str(name);
            out.push_str(" {\n");
            write_record(record, depth + 1, out);
            pad(depth, out);
            out.push_str("}\n");
        }
        Value::Time(t) => {
            pad(depth, out);
            let _ = writeln!(out, "{name} {{");
            pad(depth + 1, out);
            let _ = writeln!(out, "sec: {}", t.sec);
            pad(depth + 1, out);
            let _ = writeln!(out, "nanosec: {}", t.nanosec);
            pad(depth, out);
            out.push_str("}\n");
        }
        scalar => {
            pad(depth, out);
            let _ = writeln!(out, "{name}: {}", scalar_text(scalar));
        }
    }
}

fn pad(depth: usize, out: &mut String) {
    for _ in 0..depth {
        out.push_str(INDENT);
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::Bool(b) => b.to_string(),
        Value::Int(n) => n.to_string(),
        Value::UInt(n) => n.to_string(),
        Value::Fixed64(n) => n.to_string(),
        Value::Fixed32(n) => n.to_string(),
        Value::Float(f) => float_text(f64::from(*f), f.to_string()),
        Value::Double(d) => float_text(*d, d.to_string()),
        Value::Enum { value, name } if name.is_empty() => value.to_string(),
        Value::Enum { name, .. } => (*name).to_string(),
        Value::String(s) => quote(s.as_bytes()),
        Value::Bytes(b) => quote(b),
        Value::Time(_) | Value::List(_) | Value::Record(_) => String::new(),
    }
}

fn float_text(value: f64, shortest: String) -> String {
    if value.is_nan() {
        "nan".to_string()
    } else if value == f64::INFINITY {
        "inf".to_string()
    } else if value == f64::NEG_INFINITY {
        "-inf".to_string()
    } else {
        shortest
    }
}

fn quote(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    let utf8 = matches!(text, std::borrow::Cow::Borrowed(_));
    let mut out = String::with_capacity(bytes.len() + 2);
    out.push('"');
    if utf8 {
        for c in text.chars() {
            match c {
                '"' => out.push_str("\\\""),
                '\\' => out.push_str("\\\\"),
                '\n' => out.push_str("\\n"),
                '\r' => out.push_str("\\r"),
                '\t' => out.push_str("\\t"),
                c if c.is_control() => {
                    let mut buf = [0u8; 4];
                    for byte in c.encode_utf8(&mut buf).bytes() {
                        let _ = write!(out, "\\{byte:03o}");
                    }
                }
                c => out.push(c),
            }
        }
    } else {
        for &byte in bytes {
            match byte {
                b'"' => out.push_str("\\\""),
                b'\\' => out.push_str("\\\\"),
                0x20..=0x7e => out.push(char::from(byte)),
                _ => {
                    let _ = write!(out, "\\{byte:03o}");
                }
            }
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Dialect;
    use bytes::Bytes;

    #[test]
    fn nested_blocks_and_repeats() {
        let mut point = Record::new(Dialect::Protobuf);
        point.push("x", 1, Value::Double(1.5));
        point.push("y", 2, Value::Double(-2.0));

        let mut segment = Record::new(Dialect::Protobuf);
        segment.push("point", 1, Value::List(vec![Value::Record(point.clone()), Value::Record(point)]));

        let mut root = Record::new(Dialect::Protobuf);
        root.push("name", 1, Value::String("lane \"a\"".into()));
        root.push("line_segment", 2, Value::Record(segment));
        root.push("type", 3, Value::Enum { value: 2, name: "CITY_DRIVING" });

        let expected = "\
name: \"lane \\\"a\\\"\"
line_segment {
  point {
    x: 1.5
    y: -2
  }
  point {
    x: 1.5
    y: -2
  }
}
type: CITY_DRIVING
";
        assert_eq!(to_text(&root), expected);
    }

    #[test]
    fn non_utf8_bytes_are_octal_escaped() {
        let mut r = Record::new(Dialect::Protobuf);
        r.push("raw", 1, Value::Bytes(Bytes::from_static(&[b'a', 0xff, 0x00])));
        assert_eq!(to_text(&r), "raw: \"a\\377\\000\"\n");
    }

    #[test]
    fn special_floats() {
        let mut r = Record::new(Dialect::Protobuf);
        r.push("a", 1, Value::Double(f64::INFINITY));
        r.push("b", 2, Value::Float(f32::NAN));
        assert_eq!(to_text(&r), "a: inf\nb: nan\n");
    }

    #[test]
    fn empty_list_writes_nothing() {
        let mut r = Record::new(Dialect::Protobuf);
        r.push("overlap_id", 7, Value::List(Vec::new()));
        assert_eq!(to_text(&r), "");
    }
}
