//! Publishers, subscribers and services known to the bridge.
//!
//! Registrations are keyed by `(direction, name)` and kept in insertion
//! order.  They outlive any single connection: every time a connection
//! opens, [`TopicRegistry::replay_all`] re-issues their control frames in
//! the order they were first added.
//!
//! | Re-registration | Outcome |
//! |-----------------|---------|
//! | same direction, name and Rust type | publisher: nothing; subscriber: callback appended |
//! | same direction and name, other type | replaced in place (keeps its replay position) |

use std::any::{Any, TypeId};
use std::time::{Duration, Instant};

use indexmap::IndexMap;
use serde::Serialize;
use simbridge_types::{BridgeError, DecodeError, Message, Record};
use tracing::{debug, trace, warn};

use crate::codec::{Codec, Frame};
use crate::connection::Connection;

const STATS_WINDOW: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Publish,
    Subscribe,
    Serve,
}

/// What a registration call changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registered {
    New,
    /// Already present with the same type; no control frame needed.
    Unchanged,
    /// Another callback joined an existing subscription.
    Appended,
    /// The previous registration had a different type and was overwritten.
    Replaced,
}

impl Registered {
    /// Whether the control frame must be (re)sent to a live connection.
    pub fn needs_frame(self) -> bool {
        matches!(self, Registered::New | Registered::Replaced)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

trait SubscriberSet: Send {
    fn deliver(&mut self, record: &Record) -> Result<(), DecodeError>;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

struct Subscribers<T> {
    callbacks: Vec<Box<dyn FnMut(T) + Send>>,
}

impl<T: Message + Clone> SubscriberSet for Subscribers<T> {
    fn deliver(&mut self, record: &Record) -> Result<(), DecodeError> {
        let msg = T::decode(record)?;
        for callback in &mut self.callbacks {
            callback(msg.clone());
        }
        Ok(())
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Decodes a request record, runs the user handler and encodes the reply.
pub type ServiceHandler = Box<dyn FnMut(&Record) -> Result<Record, DecodeError> + Send>;

enum Handler {
    None,
    Subscribers(Box<dyn SubscriberSet>),
    Service(ServiceHandler),
}

// ────────────────────────────────────────────────────────────────────────────
// Registration
// ────────────────────────────────────────────────────────────────────────────

struct Registration {
    type_name: String,
    rust_type: TypeId,
    handler: Handler,
    stats: Stats,
}

#[derive(Debug, Default, Clone)]
struct Stats {
    count: u64,
    window_count: u64,
    window_start: Option<Instant>,
    frequency: f32,
}

impl Stats {
    fn hit(&mut self) {
        self.count += 1;
        self.window_count += 1;
    }

    fn roll(&mut self, now: Instant) {
        let Some(start) = self.window_start else {
            self.window_start = Some(now);
            return;
        };
        let elapsed = now.saturating_duration_since(start);
        if elapsed >= STATS_WINDOW {
            self.frequency = self.window_count as f32 / elapsed.as_secs_f32();
            self.window_count = 0;
            self.window_start = Some(now);
        }
    }
}

/// Read-only view of one registration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopicInfo {
    pub direction: Direction,
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    /// Messages published, delivered or served so far.
    pub count: u64,
    /// Messages per second over the last completed window.
    pub frequency: f32,
}

// ────────────────────────────────────────────────────────────────────────────
// TopicRegistry
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct TopicRegistry {
    entries: IndexMap<(Direction, String), Registration>,
}

impl TopicRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, direction: Direction, name: &str) -> bool {
        self.entries.contains_key(&(direction, name.to_string()))
    }

    fn upsert(
        &mut self,
        direction: Direction,
        name: &str,
        type_name: &str,
        rust_type: TypeId,
        handler: Handler,
    ) -> Registered {
        let registration = Registration {
            type_name: type_name.to_string(),
            rust_type,
            handler,
            stats: Stats::default(),
        };
        match self.entries.insert((direction, name.to_string()), registration) {
            None => Registered::New,
            Some(previous) if previous.rust_type == rust_type => {
                debug!(name = %name, "registration handler replaced");
                Registered::Replaced
            }
            Some(previous) => {
                warn!(
                    name = %name,
                    previous = %previous.type_name,
                    current = %type_name,
                    "registration replaced with a different type"
                );
                Registered::Replaced
            }
        }
    }

    pub fn add_publisher<T: Message>(&mut self, topic: &str, type_name: &str) -> Registered {
        let key = (Direction::Publish, topic.to_string());
        if let Some(existing) = self.entries.get(&key) {
            if existing.rust_type == TypeId::of::<T>() {
                return Registered::Unchanged;
            }
        }
        self.upsert(Direction::Publish, topic, type_name, TypeId::of::<T>(), Handler::None)
    }

    pub fn add_subscriber<T, F>(&mut self, topic: &str, type_name: &str, callback: F) -> Registered
    where
        T: Message + Clone,
        F: FnMut(T) + Send + 'static,
    {
        let key = (Direction::Subscribe, topic.to_string());
        if let Some(existing) = self.entries.get_mut(&key) {
            if existing.rust_type == TypeId::of::<T>() {
                if let Handler::Subscribers(set) = &mut existing.handler {
                    if let Some(typed) = set.as_any_mut().downcast_mut::<Subscribers<T>>() {
                        typed.callbacks.push(Box::new(callback));
                        return Registered::Appended;
                    }
                }
            }
        }
        let set: Subscribers<T> = Subscribers {
            callbacks: vec![Box::new(callback)],
        };
        self.upsert(
            Direction::Subscribe,
            topic,
            type_name,
            TypeId::of::<T>(),
            Handler::Subscribers(Box::new(set)),
        )
    }

    /// Register a service.  `rust_type` identifies the service type so a
    /// repeated registration of the same type can be told apart.
    pub fn add_service(
        &mut self,
        service: &str,
        type_name: &str,
        rust_type: TypeId,
        handler: ServiceHandler,
    ) -> Registered {
        self.upsert(Direction::Serve, service, type_name, rust_type, Handler::Service(handler))
    }

    /// Control frames for every registration, in insertion order.
    pub fn control_frames(&self, codec: &dyn Codec) -> Vec<Result<Frame, BridgeError>> {
        self.entries
            .iter()
            .map(|((direction, name), reg)| control_frame(codec, *direction, name, &reg.type_name))
            .collect()
    }

    /// Re-issue every registration on a freshly opened connection.
    ///
    /// A registration the codec cannot express is logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns the transport error that dropped the connection mid-replay.
    pub fn replay_all(&self, codec: &dyn Codec, connection: &mut Connection) -> Result<(), BridgeError> {
        debug!(registrations = self.entries.len(), "replaying registrations");
        for ((direction, name), reg) in &self.entries {
            match control_frame(codec, *direction, name, &reg.type_name) {
                Ok(frame) => connection.send(frame)?,
                Err(e) => warn!(name = %name, error = %e, "cannot replay registration"),
            }
        }
        Ok(())
    }

    /// Hand an inbound message to the subscribers of `topic`.
    ///
    /// Returns `false` when nobody subscribed to `topic`.
    pub fn dispatch(&mut self, topic: &str, record: &Record) -> bool {
        let Some(reg) = self.entries.get_mut(&(Direction::Subscribe, topic.to_string())) else {
            trace!(topic = %topic, "no subscriber, message discarded");
            return false;
        };
        reg.stats.hit();
        if let Handler::Subscribers(set) = &mut reg.handler {
            if let Err(e) = set.deliver(record) {
                warn!(topic = %topic, r#type = %reg.type_name, error = %e, "dropping undecodable message");
            }
        }
        true
    }

    /// Run the handler of `service`.  `None` when no such service exists.
    pub fn call_service(&mut self, service: &str, args: &Record) -> Option<Result<Record, DecodeError>> {
        let reg = self.entries.get_mut(&(Direction::Serve, service.to_string()))?;
        reg.stats.hit();
        match &mut reg.handler {
            Handler::Service(handler) => Some(handler(args)),
            _ => None,
        }
    }

    /// Count one outbound message on `topic`.
    pub fn record_publish(&mut self, topic: &str) {
        if let Some(reg) = self.entries.get_mut(&(Direction::Publish, topic.to_string())) {
            reg.stats.hit();
        }
    }

    /// Advance the frequency windows.
    pub fn update_stats(&mut self, now: Instant) {
        for reg in self.entries.values_mut() {
            reg.stats.roll(now);
        }
    }

    pub fn topics(&self) -> Vec<TopicInfo> {
        self.entries
            .iter()
            .map(|((direction, name), reg)| TopicInfo {
                direction: *direction,
                name: name.clone(),
                type_name: reg.type_name.clone(),
                count: reg.stats.count,
                frequency: reg.stats.frequency,
            })
            .collect()
    }
}

/// The control frame announcing one registration.
pub fn control_frame(
    codec: &dyn Codec,
    direction: Direction,
    name: &str,
    type_name: &str,
) -> Result<Frame, BridgeError> {
    match direction {
        Direction::Publish => codec.advertise(name, type_name),
        Direction::Subscribe => codec.subscribe(name, type_name),
        Direction::Serve => codec.advertise_service(name, type_name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::RosbridgeCodec;
    use simbridge_msgs::ros::{BoolMsg, Float64, StringMsg};
    use simbridge_types::{Dialect, Protocol, Value};
    use std::sync::{Arc, Mutex};

    fn frames_as_json(registry: &TopicRegistry) -> Vec<serde_json::Value> {
        let codec = RosbridgeCodec::new(Protocol::Ros1);
        registry
            .control_frames(&codec)
            .into_iter()
            .map(|frame| match frame.unwrap() {
                Frame::Text(text) => serde_json::from_str(&text).unwrap(),
                Frame::Binary(_) => panic!("expected text"),
            })
            .collect()
    }

    fn bool_record(data: bool) -> Record {
        let mut record = Record::new(Dialect::Ros1);
        record.push("data", 1, Value::Bool(data));
        record
    }

    #[test]
    fn control_frames_follow_insertion_order() {
        let mut registry = TopicRegistry::new();
        registry.add_publisher::<Float64>("/b", "std_msgs/Float64");
        registry.add_subscriber::<BoolMsg, _>("/a", "std_msgs/Bool", |_| {});
        registry.add_publisher::<StringMsg>("/a", "std_msgs/String");

        let ops: Vec<_> = frames_as_json(&registry)
            .iter()
            .map(|f| (f["op"].as_str().unwrap().to_string(), f["topic"].as_str().unwrap().to_string()))
            .collect();
        assert_eq!(
            ops,
            [
                ("advertise".to_string(), "/b".to_string()),
                ("subscribe".to_string(), "/a".to_string()),
                ("advertise".to_string(), "/a".to_string()),
            ]
        );
    }

    #[test]
    fn same_publisher_twice_is_unchanged() {
        let mut registry = TopicRegistry::new();
        assert_eq!(registry.add_publisher::<Float64>("/x", "std_msgs/Float64"), Registered::New);
        assert_eq!(registry.add_publisher::<Float64>("/x", "std_msgs/Float64"), Registered::Unchanged);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn different_type_replaces_in_place() {
        let mut registry = TopicRegistry::new();
        registry.add_publisher::<Float64>("/x", "std_msgs/Float64");
        registry.add_publisher::<Float64>("/y", "std_msgs/Float64");
        assert_eq!(registry.add_publisher::<StringMsg>("/x", "std_msgs/String"), Registered::Replaced);

        let frames = frames_as_json(&registry);
        assert_eq!(frames[0]["topic"], "/x");
        assert_eq!(frames[0]["type"], "std_msgs/String");
        assert_eq!(frames[1]["topic"], "/y");
    }

    #[test]
    fn subscribers_of_same_type_are_appended() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut registry = TopicRegistry::new();
        for id in 0..2 {
            let seen = Arc::clone(&seen);
            let outcome = registry.add_subscriber("/flag", "std_msgs/Bool", move |msg: BoolMsg| {
                seen.lock().unwrap().push((id, msg.data));
            });
            assert_eq!(outcome, if id == 0 { Registered::New } else { Registered::Appended });
        }

        assert!(registry.dispatch("/flag", &bool_record(true)));
        assert_eq!(*seen.lock().unwrap(), [(0, true), (1, true)]);
        assert_eq!(frames_as_json(&registry).len(), 1);
    }

    #[test]
    fn subscriber_of_other_type_replaces() {
        let hits = Arc::new(Mutex::new(0));
        let mut registry = TopicRegistry::new();
        let first = Arc::clone(&hits);
        registry.add_subscriber("/t", "std_msgs/Bool", move |_: BoolMsg| *first.lock().unwrap() += 1);
        let outcome = registry.add_subscriber("/t", "std_msgs/Float64", |_: Float64| {});
        assert_eq!(outcome, Registered::Replaced);

        registry.dispatch("/t", &bool_record(true));
        assert_eq!(*hits.lock().unwrap(), 0);
    }

    #[test]
    fn unknown_topic_is_discarded() {
        let mut registry = TopicRegistry::new();
        assert!(!registry.dispatch("/nobody", &bool_record(true)));
    }

    #[test]
    fn undecodable_message_is_dropped_and_counted() {
        let hits = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&hits);
        let mut registry = TopicRegistry::new();
        registry.add_subscriber("/f", "std_msgs/Float64", move |_: Float64| *counter.lock().unwrap() += 1);

        let mut bad = Record::new(Dialect::Ros1);
        bad.push("data", 1, Value::String("fast".to_string()));
        assert!(registry.dispatch("/f", &bad));
        assert_eq!(*hits.lock().unwrap(), 0);
        assert_eq!(registry.topics()[0].count, 1);
    }

    #[test]
    fn services_answer_and_unknown_services_are_none() {
        let mut registry = TopicRegistry::new();
        registry.add_service(
            "/echo",
            "std_srvs/SetBool",
            TypeId::of::<()>(),
            Box::new(|args: &Record| Ok(args.clone())),
        );
        let reply = registry.call_service("/echo", &bool_record(false)).unwrap().unwrap();
        assert_eq!(reply.get("data", 1), Some(&Value::Bool(false)));
        assert!(registry.call_service("/missing", &bool_record(false)).is_none());
    }

    #[test]
    fn frequency_over_one_second_window() {
        let start = Instant::now();
        let mut registry = TopicRegistry::new();
        registry.add_publisher::<Float64>("/rate", "std_msgs/Float64");
        registry.update_stats(start);
        for _ in 0..20 {
            registry.record_publish("/rate");
        }
        registry.update_stats(start + Duration::from_millis(500));
        assert_eq!(registry.topics()[0].frequency, 0.0);

        registry.update_stats(start + Duration::from_secs(2));
        let info = &registry.topics()[0];
        assert_eq!(info.count, 20);
        assert!((info.frequency - 10.0).abs() < 1e-3);
    }
}
