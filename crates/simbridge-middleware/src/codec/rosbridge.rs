//! rosbridge v2 protocol (JSON over WebSocket) for ROS1 and ROS2.

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use simbridge_types::wire::json::{from_json, to_json};
use simbridge_types::{BridgeError, Protocol, Record};
use tracing::debug;

use super::{Codec, Frame, FrameError, Inbound};

/// Operations this side sends.
#[derive(Debug, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum Outgoing<'a> {
    Advertise {
        topic: &'a str,
        #[serde(rename = "type")]
        type_name: &'a str,
    },
    Subscribe {
        topic: &'a str,
        #[serde(rename = "type")]
        type_name: &'a str,
    },
    AdvertiseService {
        #[serde(rename = "type")]
        type_name: &'a str,
        service: &'a str,
    },
    Publish {
        topic: &'a str,
        msg: Json,
    },
    ServiceResponse {
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<&'a Json>,
        service: &'a str,
        values: Json,
        result: bool,
    },
}

/// Operations the rosbridge server sends.
#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum Incoming {
    Publish {
        topic: String,
        #[serde(default)]
        msg: Json,
    },
    CallService {
        service: String,
        #[serde(default)]
        id: Option<Json>,
        #[serde(default)]
        args: Json,
    },
    SetLevel,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone)]
pub struct RosbridgeCodec {
    protocol: Protocol,
}

impl RosbridgeCodec {
    pub fn new(protocol: Protocol) -> Self {
        Self { protocol }
    }

    fn encode(&self, op: &Outgoing<'_>) -> Result<Frame, BridgeError> {
        serde_json::to_string(op)
            .map(Frame::Text)
            .map_err(|e| BridgeError::Codec(e.to_string()))
    }

    fn record(&self, json: &Json) -> Result<Record, FrameError> {
        match json {
            // rosbridge omits `args` for requests without fields
            Json::Null => Ok(Record::new(self.dialect())),
            other => from_json(other, self.dialect()).map_err(|e| FrameError::Malformed(e.to_string())),
        }
    }

    fn decode_text(&self, text: &str) -> Result<Inbound, FrameError> {
        let json: Json =
            serde_json::from_str(text).map_err(|e| FrameError::Malformed(e.to_string()))?;
        let op = json
            .get("op")
            .and_then(Json::as_str)
            .unwrap_or_default()
            .to_string();
        let incoming: Incoming =
            serde_json::from_value(json).map_err(|e| FrameError::Malformed(format!("{op}: {e}")))?;
        match incoming {
            Incoming::Publish { topic, msg } => Ok(Inbound::Publish {
                msg: self.record(&msg)?,
                topic,
            }),
            Incoming::CallService { service, id, args } => Ok(Inbound::CallService {
                args: self.record(&args)?,
                service,
                id,
            }),
            Incoming::SetLevel => Ok(Inbound::Ignored(op)),
            Incoming::Unknown => {
                debug!(op = %op, "unknown rosbridge operation");
                Ok(Inbound::Ignored(op))
            }
        }
    }
}

impl Codec for RosbridgeCodec {
    fn protocol(&self) -> Protocol {
        self.protocol
    }

    fn advertise(&self, topic: &str, type_name: &str) -> Result<Frame, BridgeError> {
        self.encode(&Outgoing::Advertise { topic, type_name })
    }

    fn subscribe(&self, topic: &str, type_name: &str) -> Result<Frame, BridgeError> {
        self.encode(&Outgoing::Subscribe { topic, type_name })
    }

    fn advertise_service(&self, service: &str, type_name: &str) -> Result<Frame, BridgeError> {
        self.encode(&Outgoing::AdvertiseService { type_name, service })
    }

    fn publish(&self, topic: &str, msg: &Record) -> Result<Frame, BridgeError> {
        self.encode(&Outgoing::Publish {
            topic,
            msg: to_json(msg),
        })
    }

    fn service_response(
        &self,
        service: &str,
        id: Option<&Json>,
        values: Option<&Record>,
    ) -> Result<Frame, BridgeError> {
        self.encode(&Outgoing::ServiceResponse {
            id,
            service,
            values: values.map_or_else(|| Json::Object(Default::default()), to_json),
            result: values.is_some(),
        })
    }

    fn decode(&mut self, frame: Frame) -> Vec<Result<Inbound, FrameError>> {
        let decoded = match frame {
            Frame::Text(text) => self.decode_text(&text),
            Frame::Binary(bytes) => match std::str::from_utf8(&bytes) {
                Ok(text) => self.decode_text(text),
                Err(e) => Err(FrameError::Malformed(format!("binary frame is not UTF-8: {e}"))),
            },
        };
        vec![decoded]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use simbridge_types::{Dialect, Value};

    fn parse(frame: Frame) -> Json {
        match frame {
            Frame::Text(text) => serde_json::from_str(&text).unwrap(),
            Frame::Binary(_) => panic!("expected a text frame"),
        }
    }

    fn single(codec: &mut RosbridgeCodec, text: &str) -> Result<Inbound, FrameError> {
        let mut out = codec.decode(Frame::Text(text.to_string()));
        assert_eq!(out.len(), 1);
        out.remove(0)
    }

    #[test]
    fn control_frames() {
        let codec = RosbridgeCodec::new(Protocol::Ros1);
        assert_eq!(
            parse(codec.advertise("/chassis", "pb_msgs/Chassis").unwrap()),
            json!({"op": "advertise", "topic": "/chassis", "type": "pb_msgs/Chassis"})
        );
        assert_eq!(
            parse(codec.subscribe("/control", "pb_msgs/ControlCommand").unwrap()),
            json!({"op": "subscribe", "topic": "/control", "type": "pb_msgs/ControlCommand"})
        );
        assert_eq!(
            parse(codec.advertise_service("/reset", "std_srvs/Empty").unwrap()),
            json!({"op": "advertise_service", "type": "std_srvs/Empty", "service": "/reset"})
        );
    }

    #[test]
    fn publish_envelope_keeps_field_order() {
        let codec = RosbridgeCodec::new(Protocol::Ros2);
        let mut msg = Record::new(Dialect::Ros2);
        msg.push("z", 0, Value::Int(1));
        msg.push("a", 0, Value::Int(2));
        let Frame::Text(text) = codec.publish("/t", &msg).unwrap() else {
            panic!("expected text");
        };
        assert_eq!(text, r#"{"op":"publish","topic":"/t","msg":{"z":1,"a":2}}"#);
    }

    #[test]
    fn service_response_success_and_failure() {
        let codec = RosbridgeCodec::new(Protocol::Ros1);
        let id = json!("call_service:/reset:1");
        let mut values = Record::new(Dialect::Ros1);
        values.push("success", 0, Value::Bool(true));

        assert_eq!(
            parse(codec.service_response("/reset", Some(&id), Some(&values)).unwrap()),
            json!({"op": "service_response", "id": "call_service:/reset:1", "service": "/reset",
                   "values": {"success": true}, "result": true})
        );
        assert_eq!(
            parse(codec.service_response("/reset", None, None).unwrap()),
            json!({"op": "service_response", "service": "/reset", "values": {}, "result": false})
        );
    }

    #[test]
    fn decodes_publish() {
        let mut codec = RosbridgeCodec::new(Protocol::Ros1);
        let inbound = single(&mut codec, r#"{"op":"publish","topic":"/x","msg":{"data":true}}"#).unwrap();
        let Inbound::Publish { topic, msg } = inbound else {
            panic!("expected publish");
        };
        assert_eq!(topic, "/x");
        assert_eq!(msg.get("data", 0), Some(&Value::Bool(true)));
        assert_eq!(msg.dialect(), Dialect::Ros1);
    }

    #[test]
    fn decodes_call_service_without_args() {
        let mut codec = RosbridgeCodec::new(Protocol::Ros2);
        let inbound = single(&mut codec, r#"{"op":"call_service","service":"/reset","id":"c1"}"#).unwrap();
        assert_eq!(
            inbound,
            Inbound::CallService {
                service: "/reset".to_string(),
                id: Some(json!("c1")),
                args: Record::new(Dialect::Ros2),
            }
        );
    }

    #[test]
    fn set_level_and_unknown_ops_are_ignored() {
        let mut codec = RosbridgeCodec::new(Protocol::Ros1);
        assert_eq!(
            single(&mut codec, r#"{"op":"set_level","level":"info"}"#).unwrap(),
            Inbound::Ignored("set_level".to_string())
        );
        assert_eq!(
            single(&mut codec, r#"{"op":"png","data":"..."}"#).unwrap(),
            Inbound::Ignored("png".to_string())
        );
    }

    #[test]
    fn malformed_frames_are_reported() {
        let mut codec = RosbridgeCodec::new(Protocol::Ros1);
        assert!(matches!(single(&mut codec, "{not json"), Err(FrameError::Malformed(_))));
        assert!(matches!(
            single(&mut codec, r#"{"op":"publish","msg":{}}"#),
            Err(FrameError::Malformed(_))
        ));
        assert!(matches!(
            single(&mut codec, r#"{"op":"publish","topic":"/x","msg":[1,2]}"#),
            Err(FrameError::Malformed(_))
        ));
    }
}
