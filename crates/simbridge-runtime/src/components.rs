//! Reference bridge clients that report on and drive a [`VehicleState`].
//!
//! Each component registers its topics in [`Component::attach`] and is then
//! ticked once per simulation step, after the bridge has processed inbound
//! traffic.  Message families follow the configured [`Stack`]:
//!
//! | Component | Apollo | LGSVL |
//! |---|---|---|
//! | [`ChassisReporter`] | `Chassis` | `CanBusData` |
//! | [`GnssReporter`] | `GnssBestPose` (GPS time) | `NavSatFix` |
//! | [`ClockPublisher`] | `rosgraph_msgs/Clock` | `rosgraph_msgs/Clock` |
//! | [`ControlListener`] | `ControlCommand` | `VehicleControlData` |

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use simbridge_middleware::Bridge;
use simbridge_msgs::{apollo, lgsvl, ros};
use simbridge_types::{BridgeError, Time, unix_to_gps};

use crate::vehicle::{ControlInput, Gear, GeoOrigin, MAX_STEER_RAD, VehicleState};

/// Which robotics stack the agent talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stack {
    #[default]
    Apollo,
    Lgsvl,
}

impl Stack {
    pub fn chassis_topic(self) -> &'static str {
        match self {
            Self::Apollo => "/apollo/canbus/chassis",
            Self::Lgsvl => "/simulator/canbus",
        }
    }

    pub fn gnss_topic(self) -> &'static str {
        match self {
            Self::Apollo => "/apollo/sensor/gnss/best_pose",
            Self::Lgsvl => "/gps",
        }
    }

    pub fn control_topic(self) -> &'static str {
        match self {
            Self::Apollo => "/apollo/control",
            Self::Lgsvl => "/vehicle_cmd",
        }
    }
}

pub const CLOCK_TOPIC: &str = "/clock";

/// A bridge client driven by the agent's tick loop.
pub trait Component: Send {
    fn name(&self) -> &'static str;

    /// Register topics.  Called once, before the first tick.
    fn attach(&mut self, bridge: &mut Bridge) -> Result<(), BridgeError>;

    fn tick(&mut self, bridge: &mut Bridge, vehicle: &mut VehicleState);
}

/// Fires at most `hz` times per second of simulation time, starting on the
/// first call.
#[derive(Debug, Clone)]
pub struct Rate {
    period: f64,
    next: Option<f64>,
}

impl Rate {
    /// A non-positive rate fires on every tick.
    pub fn new(hz: f64) -> Self {
        Self {
            period: if hz > 0.0 { 1.0 / hz } else { 0.0 },
            next: None,
        }
    }

    pub fn ready(&mut self, now: f64) -> bool {
        if self.next.is_some_and(|next| now < next) {
            return false;
        }
        self.next = Some(now + self.period);
        true
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Chassis
// ────────────────────────────────────────────────────────────────────────────

pub struct ChassisReporter {
    stack: Stack,
    topic: String,
    origin: GeoOrigin,
    rate: Rate,
    seq: u32,
}

impl ChassisReporter {
    pub fn new(stack: Stack, topic: impl Into<String>, origin: GeoOrigin, hz: f64) -> Self {
        Self {
            stack,
            topic: topic.into(),
            origin,
            rate: Rate::new(hz),
            seq: 0,
        }
    }

    fn apollo_chassis(&self, vehicle: &VehicleState) -> apollo::Chassis {
        let (latitude, longitude) = self.origin.to_geodetic(vehicle.east, vehicle.north);
        apollo::Chassis {
            engine_started: Some(vehicle.engine_on),
            engine_rpm: Some(vehicle.engine_rpm() as f32),
            speed_mps: Some(vehicle.speed as f32),
            odometer_m: Some(vehicle.odometer as f32),
            throttle_percentage: Some((vehicle.throttle * 100.0) as f32),
            brake_percentage: Some((vehicle.brake * 100.0) as f32),
            steering_percentage: Some((vehicle.steering * 100.0) as f32),
            parking_brake: Some(vehicle.gear == Gear::Park),
            driving_mode: Some(apollo::DrivingMode::CompleteAutoDrive),
            gear_location: Some(apollo_gear(vehicle.gear)),
            header: Some(apollo::Header::new("chassis", self.seq, vehicle.time)),
            chassis_gps: Some(apollo::ChassisGps {
                latitude: Some(latitude),
                longitude: Some(longitude),
                gps_valid: Some(true),
                altitude: Some(self.origin.altitude),
                heading: Some(vehicle.heading.to_degrees()),
                quality: Some(apollo::GpsQuality::Fix3d),
                num_satellites: Some(15),
                gps_speed: Some(vehicle.speed),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn lgsvl_canbus(&self, vehicle: &VehicleState) -> lgsvl::CanBusData {
        let (gps_latitude, gps_longitude) = self.origin.to_geodetic(vehicle.east, vehicle.north);
        let v = vehicle.velocity();
        lgsvl::CanBusData {
            header: ros::Header::stamped("base_link", vehicle.time),
            speed_mps: vehicle.speed as f32,
            throttle_pct: vehicle.throttle as f32,
            brake_pct: vehicle.brake as f32,
            steer_pct: vehicle.steering as f32,
            parking_brake_active: vehicle.gear == Gear::Park,
            reverse_gear_active: vehicle.gear == Gear::Reverse,
            selected_gear: lgsvl_gear(vehicle.gear),
            engine_active: vehicle.engine_on,
            engine_rpm: vehicle.engine_rpm() as f32,
            gps_latitude,
            gps_longitude,
            gps_altitude: self.origin.altitude,
            orientation: yaw_quaternion(vehicle.heading),
            linear_velocities: ros::Vector3 {
                x: v * vehicle.heading.cos(),
                y: v * vehicle.heading.sin(),
                z: 0.0,
            },
            ..Default::default()
        }
    }
}

impl Component for ChassisReporter {
    fn name(&self) -> &'static str {
        "chassis"
    }

    fn attach(&mut self, bridge: &mut Bridge) -> Result<(), BridgeError> {
        match self.stack {
            Stack::Apollo => bridge.add_publisher::<apollo::Chassis>(&self.topic),
            Stack::Lgsvl => bridge.add_publisher::<lgsvl::CanBusData>(&self.topic),
        }
    }

    fn tick(&mut self, bridge: &mut Bridge, vehicle: &mut VehicleState) {
        if !self.rate.ready(vehicle.time) {
            return;
        }
        match self.stack {
            Stack::Apollo => bridge.publish(&self.topic, &self.apollo_chassis(vehicle)),
            Stack::Lgsvl => bridge.publish(&self.topic, &self.lgsvl_canbus(vehicle)),
        }
        self.seq = self.seq.wrapping_add(1);
    }
}

// ────────────────────────────────────────────────────────────────────────────
// GNSS
// ────────────────────────────────────────────────────────────────────────────

pub struct GnssReporter {
    stack: Stack,
    topic: String,
    origin: GeoOrigin,
    rate: Rate,
    seq: u32,
}

impl GnssReporter {
    pub fn new(stack: Stack, topic: impl Into<String>, origin: GeoOrigin, hz: f64) -> Self {
        Self {
            stack,
            topic: topic.into(),
            origin,
            rate: Rate::new(hz),
            seq: 0,
        }
    }

    fn best_pose(&self, vehicle: &VehicleState) -> apollo::GnssBestPose {
        let (latitude, longitude) = self.origin.to_geodetic(vehicle.east, vehicle.north);
        let measurement_time = unix_to_gps(vehicle.time);
        let accuracy = 0.01;
        apollo::GnssBestPose {
            header: Some(apollo::Header::new("gnss", self.seq, measurement_time)),
            measurement_time: Some(measurement_time),
            sol_status: Some(apollo::SolutionStatus::SolComputed),
            sol_type: Some(apollo::SolutionType::NarrowInt),
            latitude: Some(latitude),
            longitude: Some(longitude),
            height_msl: Some(self.origin.altitude),
            undulation: Some(0.0),
            // WGS84
            datum_id: Some(61),
            latitude_std_dev: Some(accuracy),
            longitude_std_dev: Some(accuracy),
            height_std_dev: Some(accuracy),
            base_station_id: Some("0".to_string()),
            differential_age: Some(2.0),
            solution_age: Some(0.0),
            num_sats_tracked: Some(15),
            num_sats_in_solution: Some(15),
            num_sats_l1: Some(15),
            num_sats_multi: Some(12),
            extended_solution_status: Some(33),
            galileo_beidou_used_mask: Some(0),
            gps_glonass_used_mask: Some(51),
            ..Default::default()
        }
    }

    fn nav_sat_fix(&self, vehicle: &VehicleState) -> ros::NavSatFix {
        let (latitude, longitude) = self.origin.to_geodetic(vehicle.east, vehicle.north);
        ros::NavSatFix {
            header: ros::Header::stamped("gps", vehicle.time),
            status: ros::NavSatStatus {
                status: ros::NavFixStatus::Fix,
                service: ros::NavSatStatus::SERVICE_GPS,
            },
            latitude,
            longitude,
            altitude: self.origin.altitude,
            position_covariance: vec![0.0; 9],
            position_covariance_type: ros::NavSatFix::COVARIANCE_TYPE_UNKNOWN,
        }
    }
}

impl Component for GnssReporter {
    fn name(&self) -> &'static str {
        "gnss"
    }

    fn attach(&mut self, bridge: &mut Bridge) -> Result<(), BridgeError> {
        match self.stack {
            Stack::Apollo => bridge.add_publisher::<apollo::GnssBestPose>(&self.topic),
            Stack::Lgsvl => bridge.add_publisher::<ros::NavSatFix>(&self.topic),
        }
    }

    fn tick(&mut self, bridge: &mut Bridge, vehicle: &mut VehicleState) {
        if !self.rate.ready(vehicle.time) {
            return;
        }
        match self.stack {
            Stack::Apollo => bridge.publish(&self.topic, &self.best_pose(vehicle)),
            Stack::Lgsvl => bridge.publish(&self.topic, &self.nav_sat_fix(vehicle)),
        }
        self.seq = self.seq.wrapping_add(1);
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Clock
// ────────────────────────────────────────────────────────────────────────────

/// Publishes simulation time on `/clock` every tick.  ROS only; Cyber RT
/// has no clock message and attaching fails with `UnsupportedMessage`.
#[derive(Default)]
pub struct ClockPublisher;

impl Component for ClockPublisher {
    fn name(&self) -> &'static str {
        "clock"
    }

    fn attach(&mut self, bridge: &mut Bridge) -> Result<(), BridgeError> {
        bridge.add_publisher::<ros::Clock>(CLOCK_TOPIC)
    }

    fn tick(&mut self, bridge: &mut Bridge, vehicle: &mut VehicleState) {
        bridge.publish(
            CLOCK_TOPIC,
            &ros::Clock {
                clock: Time::from_secs_f64(vehicle.time),
            },
        );
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Control
// ────────────────────────────────────────────────────────────────────────────

/// Applies the most recent control command to the vehicle.
///
/// Subscriber callbacks only park the decoded command in a slot; it is
/// applied on the next tick so the vehicle is never touched from inside
/// `Bridge::update`.
pub struct ControlListener {
    stack: Stack,
    topic: String,
    pending: Arc<Mutex<Option<ControlInput>>>,
}

impl ControlListener {
    pub fn new(stack: Stack, topic: impl Into<String>) -> Self {
        Self {
            stack,
            topic: topic.into(),
            pending: Arc::new(Mutex::new(None)),
        }
    }
}

impl Component for ControlListener {
    fn name(&self) -> &'static str {
        "control"
    }

    fn attach(&mut self, bridge: &mut Bridge) -> Result<(), BridgeError> {
        let slot = Arc::clone(&self.pending);
        match self.stack {
            Stack::Apollo => bridge.add_subscriber(&self.topic, move |cmd: apollo::ControlCommand| {
                *slot.lock() = Some(from_apollo(&cmd));
            }),
            Stack::Lgsvl => bridge.add_subscriber(&self.topic, move |cmd: lgsvl::VehicleControlData| {
                *slot.lock() = Some(from_lgsvl(&cmd));
            }),
        }
    }

    fn tick(&mut self, _bridge: &mut Bridge, vehicle: &mut VehicleState) {
        if let Some(input) = self.pending.lock().take() {
            vehicle.apply(&input);
        }
    }
}

fn from_apollo(cmd: &apollo::ControlCommand) -> ControlInput {
    ControlInput {
        throttle: cmd.throttle.map(|pct| pct / 100.0),
        brake: cmd.brake.map(|pct| pct / 100.0),
        steering: cmd.steering_target.map(|pct| pct / 100.0),
        gear: cmd.gear_location.and_then(|gear| match gear {
            apollo::GearPosition::Drive | apollo::GearPosition::Low => Some(Gear::Drive),
            apollo::GearPosition::Reverse => Some(Gear::Reverse),
            apollo::GearPosition::Neutral => Some(Gear::Neutral),
            apollo::GearPosition::Parking => Some(Gear::Park),
            apollo::GearPosition::Invalid | apollo::GearPosition::None => None,
        }),
    }
}

fn from_lgsvl(cmd: &lgsvl::VehicleControlData) -> ControlInput {
    ControlInput {
        throttle: Some(f64::from(cmd.acceleration_pct)),
        brake: Some(f64::from(cmd.braking_pct)),
        steering: Some(f64::from(cmd.target_wheel_angle) / MAX_STEER_RAD),
        gear: Some(match cmd.target_gear {
            lgsvl::Gear::Drive | lgsvl::Gear::Low => Gear::Drive,
            lgsvl::Gear::Reverse => Gear::Reverse,
            lgsvl::Gear::Neutral => Gear::Neutral,
            lgsvl::Gear::Parking => Gear::Park,
        }),
    }
}

fn apollo_gear(gear: Gear) -> apollo::GearPosition {
    match gear {
        Gear::Drive => apollo::GearPosition::Drive,
        Gear::Reverse => apollo::GearPosition::Reverse,
        Gear::Neutral => apollo::GearPosition::Neutral,
        Gear::Park => apollo::GearPosition::Parking,
    }
}

fn lgsvl_gear(gear: Gear) -> lgsvl::Gear {
    match gear {
        Gear::Drive => lgsvl::Gear::Drive,
        Gear::Reverse => lgsvl::Gear::Reverse,
        Gear::Neutral => lgsvl::Gear::Neutral,
        Gear::Park => lgsvl::Gear::Parking,
    }
}

fn yaw_quaternion(yaw: f64) -> ros::Quaternion {
    let half = yaw / 2.0;
    ros::Quaternion {
        x: 0.0,
        y: 0.0,
        z: half.sin(),
        w: half.cos(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value as Json, json};
    use simbridge_middleware::transport::memory::{self, MemoryPeer};
    use simbridge_middleware::ManualClock;
    use simbridge_types::{Protocol, Status};

    fn make_bridge(protocol: Protocol) -> (Bridge, MemoryPeer) {
        let (connector, peer) = memory::pair();
        let bridge = Bridge::builder(protocol)
            .connector(Box::new(connector))
            .clock(Arc::new(ManualClock::new()))
            .build()
            .unwrap();
        (bridge, peer)
    }

    fn connect(bridge: &mut Bridge, peer: &MemoryPeer) {
        bridge.connect("localhost", 9090);
        bridge.update();
        peer.accept();
        bridge.update();
        assert_eq!(bridge.status(), Status::Connected);
        peer.take_sent();
    }

    fn published(peer: &MemoryPeer) -> Vec<Json> {
        peer.take_sent_text()
            .iter()
            .map(|text| serde_json::from_str::<Json>(text).unwrap())
            .filter(|frame| frame["op"] == "publish")
            .collect()
    }

    #[test]
    fn rate_fires_first_then_every_period() {
        let mut rate = Rate::new(10.0);
        assert!(rate.ready(0.0));
        assert!(!rate.ready(0.05));
        assert!(rate.ready(0.1));
        assert!(!rate.ready(0.15));
    }

    #[test]
    fn apollo_chassis_reports_percentages_and_unix_header() {
        let (mut bridge, peer) = make_bridge(Protocol::Ros1);
        let mut chassis = ChassisReporter::new(Stack::Apollo, "/apollo/canbus/chassis", GeoOrigin::default(), 0.0);
        chassis.attach(&mut bridge).unwrap();
        connect(&mut bridge, &peer);

        let mut car = VehicleState::new(1_500_000_000.0);
        car.throttle = 0.25;
        car.steering = -0.5;
        chassis.tick(&mut bridge, &mut car);

        let frames = published(&peer);
        assert_eq!(frames.len(), 1);
        let msg = &frames[0]["msg"];
        assert_eq!(msg["throttle_percentage"], json!(25.0));
        assert_eq!(msg["steering_percentage"], json!(-50.0));
        assert_eq!(msg["gear_location"], json!(1));
        assert_eq!(msg["header"]["timestamp_sec"], json!(1_500_000_000.0));
        assert_eq!(msg["header"]["module_name"], "chassis");
    }

    #[test]
    fn gnss_best_pose_uses_gps_time() {
        let (mut bridge, peer) = make_bridge(Protocol::Ros1);
        let mut gnss = GnssReporter::new(Stack::Apollo, "/gnss", GeoOrigin::default(), 0.0);
        gnss.attach(&mut bridge).unwrap();
        connect(&mut bridge, &peer);

        let mut car = VehicleState::new(1_500_000_000.0);
        gnss.tick(&mut bridge, &mut car);

        let msg = &published(&peer)[0]["msg"];
        assert_eq!(msg["measurement_time"], json!(1_184_035_200.0));
        assert_eq!(msg["header"]["timestamp_sec"], msg["measurement_time"]);
        assert_eq!(msg["sol_type"], json!(50));
    }

    #[test]
    fn lgsvl_stack_uses_ros_messages() {
        let (mut bridge, peer) = make_bridge(Protocol::Ros1);
        let mut gnss = GnssReporter::new(Stack::Lgsvl, "/gps", GeoOrigin::default(), 0.0);
        let mut chassis = ChassisReporter::new(Stack::Lgsvl, "/canbus", GeoOrigin::default(), 0.0);
        gnss.attach(&mut bridge).unwrap();
        chassis.attach(&mut bridge).unwrap();

        let types: Vec<String> = bridge.topics().into_iter().map(|t| t.type_name).collect();
        assert_eq!(types, ["sensor_msgs/NavSatFix", "lgsvl_msgs/CanBusData"]);

        connect(&mut bridge, &peer);
        let mut car = VehicleState::new(100.0);
        gnss.tick(&mut bridge, &mut car);
        let msg = &published(&peer)[0]["msg"];
        assert_eq!(msg["latitude"], json!(GeoOrigin::default().latitude));
        assert_eq!(msg["header"]["stamp"]["secs"], json!(100));
    }

    #[test]
    fn clock_is_not_available_on_cyber() {
        let (mut bridge, _peer) = make_bridge(Protocol::Cyber);
        assert!(matches!(
            ClockPublisher.attach(&mut bridge),
            Err(BridgeError::UnsupportedMessage { .. })
        ));
        assert!(bridge.topics().is_empty());
    }

    #[test]
    fn lgsvl_canbus_is_not_available_on_cyber() {
        let (mut bridge, _peer) = make_bridge(Protocol::Cyber);
        let mut chassis = ChassisReporter::new(Stack::Lgsvl, "/canbus", GeoOrigin::default(), 0.0);
        assert!(chassis.attach(&mut bridge).is_err());
        let mut apollo = ChassisReporter::new(Stack::Apollo, "/apollo/canbus/chassis", GeoOrigin::default(), 0.0);
        apollo.attach(&mut bridge).unwrap();
    }

    #[test]
    fn control_command_is_applied_on_next_tick() {
        let (mut bridge, peer) = make_bridge(Protocol::Ros1);
        let mut control = ControlListener::new(Stack::Apollo, "/apollo/control");
        control.attach(&mut bridge).unwrap();
        connect(&mut bridge, &peer);

        peer.send_text(
            json!({
                "op": "publish",
                "topic": "/apollo/control",
                "msg": {"throttle": 40.0, "brake": 0.0, "steering_target": 50.0, "gear_location": 2}
            })
            .to_string(),
        );
        bridge.update();

        let mut car = VehicleState::new(0.0);
        control.tick(&mut bridge, &mut car);
        assert_eq!(car.throttle, 0.4);
        assert_eq!(car.steering, 0.5);
        assert_eq!(car.gear, Gear::Reverse);

        car.throttle = 0.0;
        control.tick(&mut bridge, &mut car);
        assert_eq!(car.throttle, 0.0);
    }

    #[test]
    fn lgsvl_control_scales_wheel_angle() {
        let input = from_lgsvl(&lgsvl::VehicleControlData {
            acceleration_pct: 0.5,
            target_wheel_angle: -0.25,
            target_gear: lgsvl::Gear::Parking,
            ..Default::default()
        });
        assert_eq!(input.throttle, Some(0.5));
        assert_eq!(input.steering, Some(-0.5));
        assert_eq!(input.gear, Some(Gear::Park));
    }

    #[test]
    fn unset_apollo_fields_leave_controls_alone() {
        let input = from_apollo(&apollo::ControlCommand {
            brake: Some(100.0),
            ..Default::default()
        });
        assert_eq!(input.throttle, None);
        assert_eq!(input.brake, Some(1.0));
        assert_eq!(input.gear, None);
    }

    #[test]
    fn yaw_quaternion_is_unit() {
        let q = yaw_quaternion(1.2);
        assert!((q.z * q.z + q.w * q.w - 1.0).abs() < 1e-12);
        assert!((2.0 * q.z.atan2(q.w) - 1.2).abs() < 1e-12);
    }
}
