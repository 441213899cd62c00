//! rosbridge JSON shaping.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde_json::{Map, Number, Value as Json};

use crate::error::DecodeError;
use crate::time::Time;
use crate::value::{Dialect, Record, Value};

/// Render a record as a JSON object, field order preserved.
pub fn to_json(record: &Record) -> Json {
    let dialect = record.dialect();
    let mut map = Map::with_capacity(record.len());
    for field in record.fields() {
        map.insert(field.name.to_string(), value_to_json(&field.value, dialect));
    }
    Json::Object(map)
}

fn value_to_json(value: &Value, dialect: Dialect) -> Json {
    match value {
        Value::Bool(b) => Json::Bool(*b),
        Value::Int(n) => Json::from(*n),
        Value::UInt(n) => Json::from(*n),
        Value::Float(f) => float_to_json(*f),
        Value::Double(d) => Number::from_f64(*d).map_or(Json::Null, Json::Number),
        Value::Enum { value, .. } => Json::from(*value),
        Value::String(s) => Json::String(s.clone()),
        Value::Bytes(b) => match dialect {
            Dialect::Ros1 => Json::String(BASE64.encode(b)),
            Dialect::Ros2 | Dialect::Protobuf => {
                Json::Array(b.iter().map(|byte| Json::from(*byte)).collect())
            }
        },
        Value::Time(t) => time_to_json(t, dialect),
        Value::List(items) => Json::Array(items.iter().map(|v| value_to_json(v, dialect)).collect()),
        Value::Record(r) => to_json(r),
        Value::Fixed32(n) => Json::from(*n),
        Value::Fixed64(n) => Json::from(*n),
    }
}

// Widening an f32 directly prints representation noise (0.1 becomes
// 0.10000000149011612); go through the shortest decimal form instead.
fn float_to_json(f: f32) -> Json {
    let widened = f.to_string().parse::<f64>().unwrap_or(f64::from(f));
    Number::from_f64(widened).map_or(Json::Null, Json::Number)
}

fn time_to_json(t: &Time, dialect: Dialect) -> Json {
    let (sec, nanosec) = match dialect {
        Dialect::Ros1 => ("secs", "nsecs"),
        Dialect::Ros2 | Dialect::Protobuf => ("sec", "nanosec"),
    };
    let mut map = Map::with_capacity(2);
    map.insert(sec.to_string(), Json::from(t.sec));
    map.insert(nanosec.to_string(), Json::from(t.nanosec));
    Json::Object(map)
}

/// Parse a JSON object into a named record.  `null` members count as
/// absent.
pub fn from_json(json: &Json, dialect: Dialect) -> Result<Record, DecodeError> {
    match json {
        Json::Object(map) => Ok(object_to_record(map, dialect)),
        other => Err(DecodeError::new(format!(
            "expected JSON object, found {}",
            json_kind(other)
        ))),
    }
}

fn object_to_record(map: &Map<String, Json>, dialect: Dialect) -> Record {
    let mut record = Record::new(dialect);
    for (name, json) in map {
        if let Some(value) = json_to_value(json, dialect) {
            record.push(name.clone(), 0, value);
        }
    }
    record
}

fn json_to_value(json: &Json, dialect: Dialect) -> Option<Value> {
    match json {
        Json::Null => None,
        Json::Bool(b) => Some(Value::Bool(*b)),
        Json::Number(n) => n
            .as_u64()
            .map(Value::UInt)
            .or_else(|| n.as_i64().map(Value::Int))
            .or_else(|| n.as_f64().map(Value::Double)),
        Json::String(s) => Some(Value::String(s.clone())),
        Json::Array(items) => Some(Value::List(
            items.iter().filter_map(|v| json_to_value(v, dialect)).collect(),
        )),
        Json::Object(map) => Some(Value::Record(object_to_record(map, dialect))),
    }
}

fn json_kind(json: &Json) -> &'static str {
    match json {
        Json::Null => "null",
        Json::Bool(_) => "bool",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use serde_json::json;

    fn stamped(dialect: Dialect) -> Record {
        let mut r = Record::new(dialect);
        r.push("stamp", 0, Value::Time(Time::new(5, 6)));
        r.push("data", 0, Value::Bytes(Bytes::from_static(&[1, 2, 3])));
        r
    }

    #[test]
    fn ros1_time_and_bytes() {
        assert_eq!(
            to_json(&stamped(Dialect::Ros1)),
            json!({"stamp": {"secs": 5, "nsecs": 6}, "data": "AQID"})
        );
    }

    #[test]
    fn ros2_time_and_bytes() {
        assert_eq!(
            to_json(&stamped(Dialect::Ros2)),
            json!({"stamp": {"sec": 5, "nanosec": 6}, "data": [1, 2, 3]})
        );
    }

    #[test]
    fn field_order_is_preserved() {
        let mut r = Record::new(Dialect::Ros1);
        r.push("z", 0, Value::Double(1.0));
        r.push("a", 0, Value::Double(2.0));
        assert_eq!(serde_json::to_string(&to_json(&r)).unwrap(), r#"{"z":1.0,"a":2.0}"#);
    }

    #[test]
    fn float_uses_shortest_form() {
        let mut r = Record::new(Dialect::Ros1);
        r.push("x", 0, Value::Float(0.1));
        assert_eq!(to_json(&r), json!({"x": 0.1}));
    }

    #[test]
    fn nan_becomes_null() {
        let mut r = Record::new(Dialect::Ros1);
        r.push("x", 0, Value::Double(f64::NAN));
        assert_eq!(to_json(&r), json!({"x": null}));
    }

    #[test]
    fn decode_skips_nulls_and_keeps_nesting() {
        let r = from_json(
            &json!({"a": null, "b": {"c": [1, -2, 2.5]}}),
            Dialect::Ros1,
        )
        .unwrap();
        assert_eq!(r.get("a", 0), None);
        let Some(Value::Record(b)) = r.get("b", 0) else {
            panic!("expected nested record");
        };
        assert_eq!(
            b.get("c", 0),
            Some(&Value::List(vec![
                Value::UInt(1),
                Value::Int(-2),
                Value::Double(2.5)
            ]))
        );
    }

    #[test]
    fn decode_rejects_non_objects() {
        let err = from_json(&json!([1, 2]), Dialect::Ros2).unwrap_err();
        assert!(err.reason().contains("array"));
    }
}
