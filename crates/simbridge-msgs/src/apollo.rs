//! Apollo messages exchanged with Cyber RT, and with the ROS-based Apollo
//! 3.0 stack through `pb_msgs/*` JSON.
//!
//! Apollo schemas are proto2: almost every field is optional and
//! unset fields stay off the wire.  They are `Option<T>` here; only
//! `required` fields are plain values.

use simbridge_types::{TypeDescriptor, message, proto_enum};

// ────────────────────────────────────────────────────────────────────────────
// Common
// ────────────────────────────────────────────────────────────────────────────

message! {
    /// `apollo.common.Header`.
    pub struct Header [TypeDescriptor::NESTED] {
        /// Seconds; GPS time on GNSS messages, Unix time elsewhere.
        pub timestamp_sec: Option<f64> = 1,
        pub module_name: Option<String> = 2,
        pub sequence_num: Option<u32> = 3,
        pub lidar_timestamp: Option<u64> = 4,
        pub camera_timestamp: Option<u64> = 5,
        pub radar_timestamp: Option<u64> = 6,
        pub version: Option<u32> = 7,
        pub frame_id: Option<String> = 9,
    }
}

impl Header {
    pub fn new(module_name: &str, sequence_num: u32, timestamp_sec: f64) -> Self {
        Self {
            timestamp_sec: Some(timestamp_sec),
            module_name: Some(module_name.to_string()),
            sequence_num: Some(sequence_num),
            ..Default::default()
        }
    }
}

message! {
    pub struct Point3D [TypeDescriptor::NESTED] {
        pub x: Option<f64> = 1,
        pub y: Option<f64> = 2,
        pub z: Option<f64> = 3,
    }
}

impl Point3D {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            z: Some(z),
        }
    }
}

message! {
    /// East/north/up position in the map frame.
    pub struct PointENU [TypeDescriptor::NESTED] {
        pub x: Option<f64> = 1,
        pub y: Option<f64> = 2,
        pub z: Option<f64> = 3,
    }
}

impl PointENU {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            z: Some(z),
        }
    }
}

message! {
    pub struct Quaternion [TypeDescriptor::NESTED] {
        pub qx: Option<f64> = 1,
        pub qy: Option<f64> = 2,
        pub qz: Option<f64> = 3,
        pub qw: Option<f64> = 4,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Localization
// ────────────────────────────────────────────────────────────────────────────

message! {
    pub struct Pose [TypeDescriptor::NESTED] {
        pub position: Option<PointENU> = 1,
        pub orientation: Option<Quaternion> = 2,
        pub linear_velocity: Option<Point3D> = 3,
        pub linear_acceleration: Option<Point3D> = 4,
        pub angular_velocity: Option<Point3D> = 5,
        /// Radians, counter-clockwise from east.
        pub heading: Option<f64> = 6,
        pub linear_acceleration_vrf: Option<Point3D> = 7,
        pub angular_velocity_vrf: Option<Point3D> = 8,
        pub euler_angles: Option<Point3D> = 9,
    }
}

message! {
    /// Odometry from the simulated GNSS/INS.
    pub struct Gps [TypeDescriptor::both("pb_msgs/Gps", "apollo.localization.Gps")] {
        pub header: Option<Header> = 1,
        pub localization: Option<Pose> = 2,
    }
}

message! {
    pub struct CorrectedImu [TypeDescriptor::both("pb_msgs/CorrectedImu", "apollo.localization.CorrectedImu")] {
        pub header: Option<Header> = 1,
        pub imu: Option<Pose> = 3,
    }
}

message! {
    /// Raw IMU sample, `apollo.drivers.gnss.Imu`.
    pub struct Imu [TypeDescriptor::both("pb_msgs/Imu", "apollo.drivers.gnss.Imu")] {
        pub header: Option<Header> = 1,
        pub measurement_time: Option<f64> = 2,
        pub measurement_span: Option<f32> = 3,
        pub linear_acceleration: Option<Point3D> = 4,
        pub angular_velocity: Option<Point3D> = 5,
    }
}

proto_enum! {
    pub enum SolutionStatus {
        SolComputed = 0 => "SOL_COMPUTED",
        InsufficientObs = 1 => "INSUFFICIENT_OBS",
        NoConvergence = 2 => "NO_CONVERGENCE",
        Singularity = 3 => "SINGULARITY",
        CovTrace = 4 => "COV_TRACE",
        TestDist = 5 => "TEST_DIST",
        ColdStart = 6 => "COLD_START",
        VHLimit = 7 => "V_H_LIMIT",
        Variance = 8 => "VARIANCE",
        Residuals = 9 => "RESIDUALS",
        IntegrityWarning = 13 => "INTEGRITY_WARNING",
        Pending = 18 => "PENDING",
        InvalidFix = 19 => "INVALID_FIX",
        Unauthorized = 20 => "UNAUTHORIZED",
        InvalidRate = 22 => "INVALID_RATE",
    }
}

proto_enum! {
    pub enum SolutionType {
        None = 0 => "NONE",
        FixedPos = 1 => "FIXEDPOS",
        FixedHeight = 2 => "FIXEDHEIGHT",
        FloatConv = 4 => "FLOATCONV",
        WideLane = 5 => "WIDELANE",
        NarrowLane = 6 => "NARROWLANE",
        DopplerVelocity = 8 => "DOPPLER_VELOCITY",
        Single = 16 => "SINGLE",
        PsrDiff = 17 => "PSRDIFF",
        Waas = 18 => "WAAS",
        Propagated = 19 => "PROPOGATED",
        Omnistar = 20 => "OMNISTAR",
        L1Float = 32 => "L1_FLOAT",
        IonofreeFloat = 33 => "IONOFREE_FLOAT",
        NarrowFloat = 34 => "NARROW_FLOAT",
        L1Int = 48 => "L1_INT",
        WideInt = 49 => "WIDE_INT",
        NarrowInt = 50 => "NARROW_INT",
        RtkDirectIns = 51 => "RTK_DIRECT_INS",
        InsSbas = 52 => "INS_SBAS",
        InsPsrsp = 53 => "INS_PSRSP",
        InsPsrdiff = 54 => "INS_PSRDIFF",
        InsRtkFloat = 55 => "INS_RTKFLOAT",
        InsRtkFixed = 56 => "INS_RTKFIXED",
        InsOmnistar = 57 => "INS_OMNISTAR",
        InsOmnistarHp = 58 => "INS_OMNISTAR_HP",
        InsOmnistarXp = 59 => "INS_OMNISTAR_XP",
        OmnistarHp = 64 => "OMNISTAR_HP",
        OmnistarXp = 65 => "OMNISTAR_XP",
        PppConverging = 68 => "PPP_CONVERGING",
        Ppp = 69 => "PPP",
        InsPppConverging = 73 => "INS_PPP_CONVERGING",
        InsPpp = 74 => "INS_PPP",
    }
}

message! {
    /// Receiver best position, `apollo.drivers.gnss.GnssBestPose`.
    pub struct GnssBestPose [TypeDescriptor::both("pb_msgs/GnssBestPose", "apollo.drivers.gnss.GnssBestPose")] {
        pub header: Option<Header> = 1,
        /// Seconds since the GPS epoch.
        pub measurement_time: Option<f64> = 2,
        pub sol_status: Option<SolutionStatus> = 3,
        pub sol_type: Option<SolutionType> = 4,
        pub latitude: Option<f64> = 5,
        pub longitude: Option<f64> = 6,
        pub height_msl: Option<f64> = 7,
        pub undulation: Option<f32> = 8,
        pub datum_id: Option<u32> = 9,
        pub latitude_std_dev: Option<f32> = 10,
        pub longitude_std_dev: Option<f32> = 11,
        pub height_std_dev: Option<f32> = 12,
        pub base_station_id: Option<String> = 13,
        pub differential_age: Option<f32> = 14,
        pub solution_age: Option<f32> = 15,
        pub num_sats_tracked: Option<u32> = 16,
        pub num_sats_in_solution: Option<u32> = 17,
        pub num_sats_l1: Option<u32> = 18,
        pub num_sats_multi: Option<u32> = 19,
        pub reserved: Option<u32> = 20,
        pub extended_solution_status: Option<u32> = 21,
        pub galileo_beidou_used_mask: Option<u32> = 22,
        pub gps_glonass_used_mask: Option<u32> = 23,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Chassis
// ────────────────────────────────────────────────────────────────────────────

proto_enum! {
    pub enum DrivingMode {
        CompleteManual = 0 => "COMPLETE_MANUAL",
        CompleteAutoDrive = 1 => "COMPLETE_AUTO_DRIVE",
        AutoSteerOnly = 2 => "AUTO_STEER_ONLY",
        AutoSpeedOnly = 3 => "AUTO_SPEED_ONLY",
        EmergencyMode = 4 => "EMERGENCY_MODE",
    }
}

proto_enum! {
    pub enum ChassisErrorCode {
        NoError = 0 => "NO_ERROR",
        CmdNotInPeriod = 1 => "CMD_NOT_IN_PERIOD",
        ChassisErrorOnSteer = 2 => "CHASSIS_ERROR_ON_STEER",
        ChassisErrorOnBrake = 3 => "CHASSIS_ERROR_ON_BRAKE",
        ChassisErrorOnThrottle = 4 => "CHASSIS_ERROR_ON_THROTTLE",
        UnknownError = 5 => "UNKNOWN_ERROR",
    }
}

proto_enum! {
    pub enum GearPosition {
        Neutral = 0 => "GEAR_NEUTRAL",
        Drive = 1 => "GEAR_DRIVE",
        Reverse = 2 => "GEAR_REVERSE",
        Parking = 3 => "GEAR_PARKING",
        Low = 4 => "GEAR_LOW",
        Invalid = 5 => "GEAR_INVALID",
        None = 6 => "GEAR_NONE",
    }
}

proto_enum! {
    pub enum TurnSignal {
        None = 0 => "TURN_NONE",
        Left = 1 => "TURN_LEFT",
        Right = 2 => "TURN_RIGHT",
    }
}

proto_enum! {
    pub enum Advice {
        Unknown = 0 => "UNKNOWN",
        DisallowEngage = 1 => "DISALLOW_ENGAGE",
        ReadyToEngage = 2 => "READY_TO_ENGAGE",
        KeepEngaged = 3 => "KEEP_ENGAGED",
        PrepareDisengage = 4 => "PREPARE_DISENGAGE",
    }
}

proto_enum! {
    pub enum GpsQuality {
        FixNo = 0 => "FIX_NO",
        Fix2d = 1 => "FIX_2D",
        Fix3d = 2 => "FIX_3D",
        FixInvalid = 3 => "FIX_INVALID",
    }
}

message! {
    pub struct VehicleSignal [TypeDescriptor::NESTED] {
        pub turn_signal: Option<TurnSignal> = 1,
        pub high_beam: Option<bool> = 2,
        pub low_beam: Option<bool> = 3,
        pub horn: Option<bool> = 4,
        pub emergency_light: Option<bool> = 5,
    }
}

message! {
    pub struct EngageAdvice [TypeDescriptor::NESTED] {
        pub advice: Option<Advice> = 1,
        pub reason: Option<String> = 2,
    }
}

message! {
    pub struct ChassisGps [TypeDescriptor::NESTED] {
        pub latitude: Option<f64> = 1,
        pub longitude: Option<f64> = 2,
        pub gps_valid: Option<bool> = 3,
        pub year: Option<i32> = 4,
        pub month: Option<i32> = 5,
        pub day: Option<i32> = 6,
        pub hours: Option<i32> = 7,
        pub minutes: Option<i32> = 8,
        pub seconds: Option<i32> = 9,
        pub compass_direction: Option<f64> = 10,
        pub pdop: Option<f64> = 11,
        pub is_gps_fault: Option<bool> = 12,
        pub is_inferred: Option<bool> = 13,
        pub altitude: Option<f64> = 14,
        pub heading: Option<f64> = 15,
        pub hdop: Option<f64> = 16,
        pub vdop: Option<f64> = 17,
        pub quality: Option<GpsQuality> = 18,
        pub num_satellites: Option<i32> = 19,
        pub gps_speed: Option<f64> = 20,
    }
}

message! {
    /// Vehicle state as reported by the CAN bus, `apollo.canbus.Chassis`.
    pub struct Chassis [TypeDescriptor::both("pb_msgs/Chassis", "apollo.canbus.Chassis")] {
        pub engine_started: Option<bool> = 3,
        pub engine_rpm: Option<f32> = 4,
        pub speed_mps: Option<f32> = 5,
        pub odometer_m: Option<f32> = 6,
        pub fuel_range_m: Option<i32> = 7,
        /// Percentages are 0 to 100.
        pub throttle_percentage: Option<f32> = 8,
        pub brake_percentage: Option<f32> = 9,
        /// -100 (right) to 100 (left).
        pub steering_percentage: Option<f32> = 11,
        pub steering_torque_nm: Option<f32> = 12,
        pub parking_brake: Option<bool> = 13,
        pub high_beam_signal: Option<bool> = 14,
        pub low_beam_signal: Option<bool> = 15,
        pub left_turn_signal: Option<bool> = 16,
        pub right_turn_signal: Option<bool> = 17,
        pub horn: Option<bool> = 18,
        pub wiper: Option<bool> = 19,
        pub disengage_status: Option<bool> = 20,
        pub driving_mode: Option<DrivingMode> = 21,
        pub error_code: Option<ChassisErrorCode> = 22,
        pub gear_location: Option<GearPosition> = 23,
        pub steering_timestamp: Option<f64> = 24,
        pub header: Option<Header> = 25,
        pub chassis_error_mask: Option<i32> = 26,
        pub signal: Option<VehicleSignal> = 27,
        pub chassis_gps: Option<ChassisGps> = 28,
        pub engage_advice: Option<EngageAdvice> = 29,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Control
// ────────────────────────────────────────────────────────────────────────────

message! {
    pub struct LatencyStats [TypeDescriptor::NESTED] {
        pub total_time_ms: Option<f64> = 1,
        pub controller_time_ms: Vec<f64> = 2,
        pub total_time_exceeded: Option<bool> = 3,
    }
}

message! {
    /// Actuation request from Apollo's control module.
    pub struct ControlCommand [TypeDescriptor::both("pb_msgs/ControlCommand", "apollo.control.ControlCommand")] {
        pub header: Option<Header> = 1,
        /// 0 to 100.
        pub throttle: Option<f64> = 3,
        /// 0 to 100.
        pub brake: Option<f64> = 4,
        pub steering_rate: Option<f64> = 6,
        /// -100 (right) to 100 (left).
        pub steering_target: Option<f64> = 7,
        pub parking_brake: Option<bool> = 8,
        pub speed: Option<f64> = 9,
        pub acceleration: Option<f64> = 10,
        pub high_beam: Option<bool> = 11,
        pub low_beam: Option<bool> = 12,
        pub left_turn: Option<bool> = 13,
        pub right_turn: Option<bool> = 14,
        pub horn: Option<bool> = 15,
        pub reset_model: Option<bool> = 16,
        pub engine_on_off: Option<bool> = 17,
        pub trajectory_fraction: Option<f64> = 18,
        pub driving_mode: Option<DrivingMode> = 19,
        pub gear_location: Option<GearPosition> = 20,
        pub turn_signal: Option<TurnSignal> = 21,
        pub signal: Option<VehicleSignal> = 23,
        pub latency_stats: Option<LatencyStats> = 24,
        pub engage_advice: Option<EngageAdvice> = 26,
        pub is_in_safe_mode: Option<bool> = 27,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Continental ARS408 radar
// ────────────────────────────────────────────────────────────────────────────

proto_enum! {
    pub enum OutputType {
        None = 0 => "OUTPUT_TYPE_NONE",
        Objects = 1 => "OUTPUT_TYPE_OBJECTS",
        Clusters = 2 => "OUTPUT_TYPE_CLUSTERS",
        Error = 3 => "OUTPUT_TYPE_ERROR",
    }
}

proto_enum! {
    pub enum RcsThreshold {
        Standard = 0 => "RCS_THRESHOLD_STANDARD",
        HighSensitivity = 1 => "RCS_THRESHOLD_HIGH_SENSITIVITY",
        Error = 2 => "RCS_THRESHOLD_ERROR",
    }
}

message! {
    pub struct RadarState201 [TypeDescriptor::NESTED] {
        pub max_distance: Option<u32> = 1,
        pub radar_power: Option<u32> = 2,
        pub output_type: Option<OutputType> = 3,
        pub rcs_threshold: Option<RcsThreshold> = 4,
        pub send_quality: Option<bool> = 5,
        pub send_ext_info: Option<bool> = 6,
    }
}

message! {
    pub struct ClusterListStatus600 [TypeDescriptor::NESTED] {
        pub near: Option<i32> = 1,
        pub far: Option<i32> = 2,
        pub meas_counter: Option<i32> = 3,
        pub interface_version: Option<i32> = 4,
    }
}

message! {
    pub struct ObjectListStatus60A [TypeDescriptor::NESTED] {
        pub nof_objects: Option<i32> = 1,
        pub meas_counter: Option<i32> = 2,
        pub interface_version: Option<i32> = 3,
    }
}

message! {
    /// One radar return.  Distances and velocities are in the radar frame.
    pub struct ContiRadarObs [TypeDescriptor::NESTED] {
        pub header: Option<Header> = 1,
        pub clusterortrack: Option<bool> = 2,
        pub obstacle_id: Option<i32> = 3,
        pub longitude_dist: f64 = 4,
        pub lateral_dist: f64 = 5,
        pub longitude_vel: f64 = 6,
        pub lateral_vel: f64 = 7,
        pub rcs: Option<f64> = 8,
        pub dynprop: Option<i32> = 9,
        pub longitude_dist_rms: Option<f64> = 10,
        pub lateral_dist_rms: Option<f64> = 11,
        pub longitude_vel_rms: Option<f64> = 12,
        pub lateral_vel_rms: Option<f64> = 13,
        pub probexist: Option<f64> = 14,
        pub meas_state: Option<i32> = 15,
        pub longitude_accel: Option<f64> = 16,
        pub lateral_accel: Option<f64> = 17,
        pub oritation_angle: Option<f64> = 18,
        pub longitude_accel_rms: Option<f64> = 19,
        pub lateral_accel_rms: Option<f64> = 20,
        pub oritation_angle_rms: Option<f64> = 21,
        pub length: Option<f64> = 22,
        pub width: Option<f64> = 23,
        pub obstacle_class: Option<i32> = 24,
    }
}

message! {
    pub struct ContiRadar [TypeDescriptor::both("pb_msgs/ContiRadar", "apollo.drivers.ContiRadar")] {
        pub header: Option<Header> = 1,
        pub contiobs: Vec<ContiRadarObs> = 2,
        pub radar_state: Option<RadarState201> = 3,
        pub cluster_list_status: Option<ClusterListStatus600> = 4,
        pub object_list_status: Option<ObjectListStatus60A> = 5,
    }
}
