//! [`Agent`] – the fixed-rate tick loop.
//!
//! Each tick:
//!
//! 1. **Update** – [`Bridge::update`] advances the connection, replays
//!    registrations after a (re)connect and dispatches inbound traffic.
//! 2. **Report** – every [`Component`] publishes or applies what it has.
//! 3. **Step** – the [`VehicleState`] integrates one tick of motion.
//!
//! Components whose messages have no type name on the bridge protocol (for
//! example `/clock` over Cyber RT) are skipped at startup with a warning.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::sync::atomic::AtomicBool;
//! use simbridge_middleware::Bridge;
//! use simbridge_runtime::agent::{Agent, AgentConfig};
//!
//! # async fn demo() -> Result<(), simbridge_types::BridgeError> {
//! let mut bridge = Bridge::new("ros1")?;
//! bridge.connect("localhost", 9090);
//! let mut agent = Agent::new(bridge, &AgentConfig::default())?;
//! agent.run(Arc::new(AtomicBool::new(false))).await;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use simbridge_middleware::{Bridge, BridgeClient};
use simbridge_types::{BridgeError, Status, Time};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::components::{ChassisReporter, ClockPublisher, Component, ControlListener, GnssReporter, Stack};
use crate::vehicle::{GeoOrigin, VehicleState};

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Topic names that differ from the stack defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TopicOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chassis: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gnss: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub control: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AgentConfig {
    /// Simulation ticks per second.
    pub tick_hz: f64,
    pub stack: Stack,
    pub chassis_hz: f64,
    pub gps_hz: f64,
    /// Publish `/clock` every tick (ROS only).
    pub publish_clock: bool,
    pub origin: GeoOrigin,
    pub topics: TopicOverrides,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            tick_hz: 50.0,
            stack: Stack::Apollo,
            chassis_hz: 50.0,
            gps_hz: 12.5,
            publish_clock: true,
            origin: GeoOrigin::default(),
            topics: TopicOverrides::default(),
        }
    }
}

impl AgentConfig {
    /// Tick period; non-positive rates fall back to the default 50 Hz.
    pub fn tick_period(&self) -> Duration {
        let hz = if self.tick_hz > 0.0 { self.tick_hz } else { 50.0 };
        Duration::from_secs_f64(1.0 / hz)
    }

    /// The reference components for this configuration, in attach order.
    pub fn components(&self) -> Vec<Box<dyn Component>> {
        let stack = self.stack;
        let topic = |name: &Option<String>, default: &str| name.clone().unwrap_or_else(|| default.to_string());
        let mut components: Vec<Box<dyn Component>> = vec![
            Box::new(ChassisReporter::new(
                stack,
                topic(&self.topics.chassis, stack.chassis_topic()),
                self.origin,
                self.chassis_hz,
            )),
            Box::new(GnssReporter::new(
                stack,
                topic(&self.topics.gnss, stack.gnss_topic()),
                self.origin,
                self.gps_hz,
            )),
            Box::new(ControlListener::new(stack, topic(&self.topics.control, stack.control_topic()))),
        ];
        if self.publish_clock {
            components.push(Box::new(ClockPublisher));
        }
        components
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Link monitor
// ─────────────────────────────────────────────────────────────────────────────

/// Connection history as seen by the agent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkStats {
    pub status: Status,
    /// Times the link reached `Connected`.
    pub connects: u32,
    /// Times an established link was lost.
    pub drops: u32,
}

struct LinkMonitor {
    stats: Arc<Mutex<LinkStats>>,
}

impl BridgeClient for LinkMonitor {
    fn on_bridge_available(&mut self, _bridge: &mut Bridge) -> Result<(), BridgeError> {
        Ok(())
    }

    fn on_status_changed(&mut self, status: Status) {
        let mut stats = self.stats.lock();
        match (stats.status, status) {
            (Status::Connected, Status::Connected) => {}
            (_, Status::Connected) => stats.connects += 1,
            (Status::Connected, _) => stats.drops += 1,
            _ => {}
        }
        stats.status = status;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Agent
// ─────────────────────────────────────────────────────────────────────────────

pub struct Agent {
    bridge: Bridge,
    vehicle: VehicleState,
    components: Vec<Box<dyn Component>>,
    link: Arc<Mutex<LinkStats>>,
    period: Duration,
}

impl Agent {
    /// Attach the configured components to `bridge`.
    ///
    /// # Errors
    ///
    /// Propagates any registration error other than a message or operation
    /// the bridge protocol does not support.
    pub fn new(bridge: Bridge, config: &AgentConfig) -> Result<Self, BridgeError> {
        Self::with_components(bridge, config.components(), config.tick_period())
    }

    pub fn with_components(
        mut bridge: Bridge,
        components: Vec<Box<dyn Component>>,
        period: Duration,
    ) -> Result<Self, BridgeError> {
        let link = Arc::new(Mutex::new(LinkStats::default()));
        bridge.add_client(Box::new(LinkMonitor {
            stats: Arc::clone(&link),
        }))?;

        let mut attached: Vec<Box<dyn Component>> = Vec::with_capacity(components.len());
        for mut component in components {
            match component.attach(&mut bridge) {
                Ok(()) => {
                    debug!(component = component.name(), "component attached");
                    attached.push(component);
                }
                Err(e @ (BridgeError::UnsupportedMessage { .. } | BridgeError::Unsupported { .. })) => {
                    warn!(
                        component = component.name(),
                        protocol = %bridge.protocol(),
                        error = %e,
                        "component skipped"
                    );
                }
                Err(e) => return Err(e),
            }
        }

        Ok(Self {
            bridge,
            vehicle: VehicleState::new(Time::now().as_secs_f64()),
            components: attached,
            link,
            period,
        })
    }

    pub fn bridge(&self) -> &Bridge {
        &self.bridge
    }

    pub fn bridge_mut(&mut self) -> &mut Bridge {
        &mut self.bridge
    }

    pub fn vehicle(&self) -> &VehicleState {
        &self.vehicle
    }

    pub fn vehicle_mut(&mut self) -> &mut VehicleState {
        &mut self.vehicle
    }

    pub fn component_names(&self) -> Vec<&'static str> {
        self.components.iter().map(|c| c.name()).collect()
    }

    pub fn link_stats(&self) -> LinkStats {
        *self.link.lock()
    }

    /// Run one tick of `dt` seconds.
    pub fn tick(&mut self, dt: f64) {
        self.bridge.update();
        for component in &mut self.components {
            component.tick(&mut self.bridge, &mut self.vehicle);
        }
        self.vehicle.step(dt);
    }

    /// Tick at the configured rate until `shutdown` is set, then disconnect.
    /// Returns the number of ticks run.
    pub async fn run(&mut self, shutdown: Arc<AtomicBool>) -> u64 {
        let mut interval = tokio::time::interval(self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let dt = self.period.as_secs_f64();
        let mut ticks: u64 = 0;

        info!(
            protocol = %self.bridge.protocol(),
            period_ms = self.period.as_millis() as u64,
            components = ?self.component_names(),
            "agent started"
        );
        while !shutdown.load(Ordering::Relaxed) {
            interval.tick().await;
            self.tick(dt);
            ticks += 1;
        }

        self.bridge.disconnect();
        let stats = self.link_stats();
        info!(ticks, connects = stats.connects, drops = stats.drops, "agent stopped");
        ticks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value as Json, json};
    use simbridge_middleware::transport::memory::{self, MemoryPeer};
    use simbridge_middleware::{ConnectGate, ManualClock};
    use simbridge_types::Protocol;

    fn make_agent(protocol: Protocol, config: &AgentConfig) -> (Agent, MemoryPeer, ManualClock) {
        let (connector, peer) = memory::pair();
        let clock = ManualClock::new();
        let mut bridge = Bridge::builder(protocol)
            .connector(Box::new(connector))
            .clock(Arc::new(clock.clone()))
            .gate(ConnectGate::default())
            .build()
            .unwrap();
        bridge.connect("localhost", 9090);
        (Agent::new(bridge, config).unwrap(), peer, clock)
    }

    fn sent_ops(peer: &MemoryPeer) -> Vec<(String, String)> {
        peer.take_sent_text()
            .iter()
            .map(|text| {
                let frame: Json = serde_json::from_str(text).unwrap();
                (
                    frame["op"].as_str().unwrap().to_string(),
                    frame["topic"].as_str().unwrap_or_default().to_string(),
                )
            })
            .collect()
    }

    fn op(op: &str, topic: &str) -> (String, String) {
        (op.to_string(), topic.to_string())
    }

    #[test]
    fn config_defaults_and_partial_toml_style_json() {
        let cfg: AgentConfig = serde_json::from_value(json!({"stack": "lgsvl", "topics": {"gnss": "/fix"}})).unwrap();
        assert_eq!(cfg.stack, Stack::Lgsvl);
        assert_eq!(cfg.tick_hz, 50.0);
        assert_eq!(cfg.topics.gnss.as_deref(), Some("/fix"));
        assert_eq!(cfg.tick_period(), Duration::from_millis(20));

        let zero = AgentConfig {
            tick_hz: 0.0,
            ..Default::default()
        };
        assert_eq!(zero.tick_period(), Duration::from_millis(20));
    }

    #[test]
    fn registrations_are_sent_once_connected() {
        let (mut agent, peer, _clock) = make_agent(Protocol::Ros1, &AgentConfig::default());
        assert_eq!(agent.component_names(), ["chassis", "gnss", "control", "clock"]);

        agent.tick(0.02);
        peer.accept();
        agent.tick(0.02);

        let ops = sent_ops(&peer);
        assert_eq!(
            ops[..4],
            [
                op("advertise", "/apollo/canbus/chassis"),
                op("advertise", "/apollo/sensor/gnss/best_pose"),
                op("subscribe", "/apollo/control"),
                op("advertise", "/clock"),
            ]
        );
        assert!(ops[4..].contains(&op("publish", "/apollo/canbus/chassis")));
        assert!(ops[4..].contains(&op("publish", "/clock")));
        assert_eq!(agent.link_stats().connects, 1);
    }

    #[test]
    fn cyber_skips_ros_only_components() {
        let (agent, _peer, _clock) = make_agent(Protocol::Cyber, &AgentConfig::default());
        assert_eq!(agent.component_names(), ["chassis", "gnss", "control"]);

        let config = AgentConfig {
            stack: Stack::Lgsvl,
            publish_clock: false,
            ..Default::default()
        };
        let (agent, _peer, _clock) = make_agent(Protocol::Cyber, &config);
        assert!(agent.component_names().is_empty());
    }

    #[test]
    fn topic_overrides_replace_defaults() {
        let config = AgentConfig {
            stack: Stack::Lgsvl,
            publish_clock: false,
            topics: TopicOverrides {
                chassis: Some("/canbus".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        let (agent, _peer, _clock) = make_agent(Protocol::Ros2, &config);
        let names: Vec<String> = agent.bridge().topics().into_iter().map(|t| t.name).collect();
        assert_eq!(names, ["/canbus", "/gps", "/vehicle_cmd"]);
    }

    #[test]
    fn control_commands_move_the_vehicle() {
        let (mut agent, peer, _clock) = make_agent(Protocol::Ros1, &AgentConfig::default());
        agent.tick(0.02);
        peer.accept();
        agent.tick(0.02);

        peer.send_text(
            json!({"op": "publish", "topic": "/apollo/control", "msg": {"throttle": 100.0}}).to_string(),
        );
        let start = agent.vehicle().east;
        for _ in 0..50 {
            agent.tick(0.02);
        }
        assert_eq!(agent.vehicle().throttle, 1.0);
        assert!(agent.vehicle().east > start);
    }

    #[test]
    fn link_stats_count_drops_and_reconnects() {
        let (mut agent, peer, clock) = make_agent(Protocol::Ros1, &AgentConfig::default());
        agent.tick(0.02);
        peer.accept();
        agent.tick(0.02);

        peer.drop_connection("simulated outage");
        agent.tick(0.02);
        assert_eq!(agent.bridge().status(), Status::Disconnected);

        clock.advance(Duration::from_secs(1));
        agent.tick(0.02);
        peer.accept();
        agent.tick(0.02);

        let stats = agent.link_stats();
        assert_eq!(stats.status, Status::Connected);
        assert_eq!(stats.connects, 2);
        assert_eq!(stats.drops, 1);
    }

    #[tokio::test]
    async fn run_stops_on_shutdown_and_disconnects() {
        let (mut agent, peer, _clock) = make_agent(Protocol::Ros1, &AgentConfig::default());
        peer.set_auto_accept(true);
        let shutdown = Arc::new(AtomicBool::new(false));

        let flag = Arc::clone(&shutdown);
        let stopper = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            flag.store(true, Ordering::Relaxed);
        });

        let ticks = agent.run(shutdown).await;
        stopper.await.unwrap();
        assert!(ticks >= 2);
        assert_eq!(agent.bridge().status(), Status::Disconnected);
        assert!(peer.is_closed());
    }
}
