//! Standard ROS messages.
//!
//! Field tags only matter if a ROS type is ever written as protobuf; they
//! follow declaration order.

use bytes::Bytes;
use simbridge_types::message::decode_nested;
use simbridge_types::{
    DecodeError, Dialect, FieldValue, Message, Record, Service, Time, TypeDescriptor, Value,
    message, proto_enum,
};

// ────────────────────────────────────────────────────────────────────────────
// std_msgs / rosgraph_msgs
// ────────────────────────────────────────────────────────────────────────────

/// `std_msgs/Header`.
///
/// ROS2 dropped the sequence number; it is only written for ROS1 and
/// protobuf.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Header {
    pub seq: u32,
    pub stamp: Time,
    pub frame_id: String,
}

impl Header {
    /// Header stamped with simulation time in Unix epoch seconds.
    pub fn stamped(frame_id: impl Into<String>, seconds: f64) -> Self {
        Self {
            seq: 0,
            stamp: Time::from_secs_f64(seconds),
            frame_id: frame_id.into(),
        }
    }
}

impl Message for Header {
    const DESCRIPTOR: TypeDescriptor = TypeDescriptor::ros("std_msgs/Header");

    fn encode(&self, out: &mut Record) {
        if out.dialect() != Dialect::Ros2 {
            self.seq.write("seq", 1, out);
        }
        self.stamp.write("stamp", 2, out);
        self.frame_id.write("frame_id", 3, out);
    }

    fn decode(record: &Record) -> Result<Self, DecodeError> {
        Ok(Self {
            seq: u32::read(record, "seq", 1)?,
            stamp: Time::read(record, "stamp", 2)?,
            frame_id: String::read(record, "frame_id", 3)?,
        })
    }
}

impl FieldValue for Header {
    fn to_value(&self, dialect: Dialect) -> Option<Value> {
        Some(Value::Record(self.to_record(dialect)))
    }

    fn from_value(value: &Value) -> Result<Self, DecodeError> {
        decode_nested(value)
    }
}

message! {
    /// `std_msgs/String`.
    pub struct StringMsg [TypeDescriptor::ros("std_msgs/String")] {
        pub data: String = 1,
    }
}

message! {
    /// `std_msgs/Bool`.
    pub struct BoolMsg [TypeDescriptor::ros("std_msgs/Bool")] {
        pub data: bool = 1,
    }
}

message! {
    /// `std_msgs/Int32`.
    pub struct Int32 [TypeDescriptor::ros("std_msgs/Int32")] {
        pub data: i32 = 1,
    }
}

message! {
    /// `std_msgs/Float64`.
    pub struct Float64 [TypeDescriptor::ros("std_msgs/Float64")] {
        pub data: f64 = 1,
    }
}

message! {
    pub struct ColorRGBA [TypeDescriptor::ros("std_msgs/ColorRGBA")] {
        pub r: f32 = 1,
        pub g: f32 = 2,
        pub b: f32 = 3,
        pub a: f32 = 4,
    }
}

message! {
    /// `rosgraph_msgs/Clock`, published when the simulator owns time.
    pub struct Clock [TypeDescriptor::ros("rosgraph_msgs/Clock")] {
        pub clock: Time = 1,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// geometry_msgs
// ────────────────────────────────────────────────────────────────────────────

message! {
    pub struct Point [TypeDescriptor::ros("geometry_msgs/Point")] {
        pub x: f64 = 1,
        pub y: f64 = 2,
        pub z: f64 = 3,
    }
}

message! {
    pub struct Vector3 [TypeDescriptor::ros("geometry_msgs/Vector3")] {
        pub x: f64 = 1,
        pub y: f64 = 2,
        pub z: f64 = 3,
    }
}

message! {
    pub struct Quaternion [TypeDescriptor::ros("geometry_msgs/Quaternion")] {
        pub x: f64 = 1,
        pub y: f64 = 2,
        pub z: f64 = 3,
        pub w: f64 = 4,
    }
}

impl Quaternion {
    pub const IDENTITY: Quaternion = Quaternion {
        x: 0.0,
        y: 0.0,
        z: 0.0,
        w: 1.0,
    };
}

message! {
    pub struct Pose [TypeDescriptor::ros("geometry_msgs/Pose")] {
        pub position: Point = 1,
        pub orientation: Quaternion = 2,
    }
}

message! {
    pub struct PoseWithCovariance [TypeDescriptor::ros("geometry_msgs/PoseWithCovariance")] {
        pub pose: Pose = 1,
        /// Row-major 6x6.
        pub covariance: Vec<f64> = 2,
    }
}

message! {
    pub struct Twist [TypeDescriptor::ros("geometry_msgs/Twist")] {
        pub linear: Vector3 = 1,
        pub angular: Vector3 = 2,
    }
}

message! {
    pub struct TwistStamped [TypeDescriptor::ros("geometry_msgs/TwistStamped")] {
        pub header: Header = 1,
        pub twist: Twist = 2,
    }
}

message! {
    pub struct TwistWithCovariance [TypeDescriptor::ros("geometry_msgs/TwistWithCovariance")] {
        pub twist: Twist = 1,
        /// Row-major 6x6.
        pub covariance: Vec<f64> = 2,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// sensor_msgs / nav_msgs / nmea_msgs
// ────────────────────────────────────────────────────────────────────────────

message! {
    pub struct CompressedImage [TypeDescriptor::ros("sensor_msgs/CompressedImage")] {
        pub header: Header = 1,
        /// `jpeg` or `png`.
        pub format: String = 2,
        pub data: Bytes = 3,
    }
}

message! {
    pub struct Image [TypeDescriptor::ros("sensor_msgs/Image")] {
        pub header: Header = 1,
        pub height: u32 = 2,
        pub width: u32 = 3,
        pub encoding: String = 4,
        pub is_bigendian: u8 = 5,
        pub step: u32 = 6,
        pub data: Bytes = 7,
    }
}

message! {
    pub struct Imu [TypeDescriptor::ros("sensor_msgs/Imu")] {
        pub header: Header = 1,
        pub orientation: Quaternion = 2,
        pub orientation_covariance: Vec<f64> = 3,
        pub angular_velocity: Vector3 = 4,
        pub angular_velocity_covariance: Vec<f64> = 5,
        pub linear_acceleration: Vector3 = 6,
        pub linear_acceleration_covariance: Vec<f64> = 7,
    }
}

message! {
    pub struct LaserScan [TypeDescriptor::ros("sensor_msgs/LaserScan")] {
        pub header: Header = 1,
        pub angle_min: f32 = 2,
        pub angle_max: f32 = 3,
        pub angle_increment: f32 = 4,
        pub time_increment: f32 = 5,
        pub scan_time: f32 = 6,
        pub range_min: f32 = 7,
        pub range_max: f32 = 8,
        pub ranges: Vec<f32> = 9,
        pub intensities: Vec<f32> = 10,
    }
}

proto_enum! {
    pub enum NavFixStatus {
        Fix = 0 => "STATUS_FIX",
        NoFix = -1 => "STATUS_NO_FIX",
        SbasFix = 1 => "STATUS_SBAS_FIX",
        GbasFix = 2 => "STATUS_GBAS_FIX",
    }
}

message! {
    pub struct NavSatStatus [TypeDescriptor::ros("sensor_msgs/NavSatStatus")] {
        pub status: NavFixStatus = 1,
        /// Bitmask of the `SERVICE_*` constants.
        pub service: u16 = 2,
    }
}

impl NavSatStatus {
    pub const SERVICE_GPS: u16 = 1;
    pub const SERVICE_GLONASS: u16 = 2;
    pub const SERVICE_COMPASS: u16 = 4;
    pub const SERVICE_GALILEO: u16 = 8;
}

message! {
    pub struct NavSatFix [TypeDescriptor::ros("sensor_msgs/NavSatFix")] {
        pub header: Header = 1,
        pub status: NavSatStatus = 2,
        pub latitude: f64 = 3,
        pub longitude: f64 = 4,
        pub altitude: f64 = 5,
        pub position_covariance: Vec<f64> = 6,
        pub position_covariance_type: u8 = 7,
    }
}

impl NavSatFix {
    pub const COVARIANCE_TYPE_UNKNOWN: u8 = 0;
    pub const COVARIANCE_TYPE_APPROXIMATED: u8 = 1;
    pub const COVARIANCE_TYPE_DIAGONAL_KNOWN: u8 = 2;
    pub const COVARIANCE_TYPE_KNOWN: u8 = 3;
}

message! {
    pub struct PointField [TypeDescriptor::ros("sensor_msgs/PointField")] {
        pub name: String = 1,
        pub offset: u32 = 2,
        pub datatype: u8 = 3,
        pub count: u32 = 4,
    }
}

impl PointField {
    pub const INT8: u8 = 1;
    pub const UINT8: u8 = 2;
    pub const INT16: u8 = 3;
    pub const UINT16: u8 = 4;
    pub const INT32: u8 = 5;
    pub const UINT32: u8 = 6;
    pub const FLOAT32: u8 = 7;
    pub const FLOAT64: u8 = 8;
}

message! {
    pub struct PointCloud2 [TypeDescriptor::ros("sensor_msgs/PointCloud2")] {
        pub header: Header = 1,
        pub height: u32 = 2,
        pub width: u32 = 3,
        pub fields: Vec<PointField> = 4,
        pub is_bigendian: bool = 5,
        pub point_step: u32 = 6,
        pub row_step: u32 = 7,
        pub data: Bytes = 8,
        pub is_dense: bool = 9,
    }
}

message! {
    pub struct Odometry [TypeDescriptor::ros("nav_msgs/Odometry")] {
        pub header: Header = 1,
        pub child_frame_id: String = 2,
        pub pose: PoseWithCovariance = 3,
        pub twist: TwistWithCovariance = 4,
    }
}

message! {
    /// Raw NMEA sentence from the simulated GNSS receiver.
    pub struct Sentence [TypeDescriptor::ros("nmea_msgs/Sentence")] {
        pub header: Header = 1,
        pub sentence: String = 2,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// std_srvs
// ────────────────────────────────────────────────────────────────────────────

message! {
    pub struct EmptyRequest [TypeDescriptor::ros("std_srvs/EmptyRequest")] {}
}

message! {
    pub struct EmptyResponse [TypeDescriptor::ros("std_srvs/EmptyResponse")] {}
}

message! {
    pub struct SetBoolRequest [TypeDescriptor::ros("std_srvs/SetBoolRequest")] {
        pub data: bool = 1,
    }
}

message! {
    pub struct SetBoolResponse [TypeDescriptor::ros("std_srvs/SetBoolResponse")] {
        pub success: bool = 1,
        pub message: String = 2,
    }
}

message! {
    pub struct TriggerRequest [TypeDescriptor::ros("std_srvs/TriggerRequest")] {}
}

message! {
    pub struct TriggerResponse [TypeDescriptor::ros("std_srvs/TriggerResponse")] {
        pub success: bool = 1,
        pub message: String = 2,
    }
}

/// `std_srvs/Empty`.
pub struct EmptySrv;

impl Service for EmptySrv {
    const DESCRIPTOR: TypeDescriptor = TypeDescriptor::ros("std_srvs/Empty");
    type Request = EmptyRequest;
    type Response = EmptyResponse;
}

/// `std_srvs/SetBool`.
pub struct SetBool;

impl Service for SetBool {
    const DESCRIPTOR: TypeDescriptor = TypeDescriptor::ros("std_srvs/SetBool");
    type Request = SetBoolRequest;
    type Response = SetBoolResponse;
}

/// `std_srvs/Trigger`.
pub struct Trigger;

impl Service for Trigger {
    const DESCRIPTOR: TypeDescriptor = TypeDescriptor::ros("std_srvs/Trigger");
    type Request = TriggerRequest;
    type Response = TriggerResponse;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use simbridge_types::wire::json::{from_json, to_json};

    fn header() -> Header {
        Header {
            seq: 7,
            stamp: Time::new(100, 5),
            frame_id: "gps".to_string(),
        }
    }

    #[test]
    fn ros1_header_keeps_seq() {
        assert_eq!(
            to_json(&header().to_record(Dialect::Ros1)),
            json!({"seq": 7, "stamp": {"secs": 100, "nsecs": 5}, "frame_id": "gps"})
        );
    }

    #[test]
    fn ros2_header_drops_seq() {
        assert_eq!(
            to_json(&header().to_record(Dialect::Ros2)),
            json!({"stamp": {"sec": 100, "nanosec": 5}, "frame_id": "gps"})
        );
    }

    #[test]
    fn navsatfix_round_trip_through_ros2_json() {
        let fix = NavSatFix {
            header: header(),
            status: NavSatStatus {
                status: NavFixStatus::NoFix,
                service: NavSatStatus::SERVICE_GPS | NavSatStatus::SERVICE_GALILEO,
            },
            latitude: 37.79,
            longitude: -122.39,
            altitude: 10.5,
            position_covariance: vec![0.0; 9],
            position_covariance_type: NavSatFix::COVARIANCE_TYPE_DIAGONAL_KNOWN,
        };
        let json = to_json(&fix.to_record(Dialect::Ros2));
        assert_eq!(json["status"]["status"], json!(-1));

        let back = NavSatFix::decode(&from_json(&json, Dialect::Ros2).unwrap()).unwrap();
        // seq is not carried on ROS2
        assert_eq!(back.header.seq, 0);
        assert_eq!(back.status, fix.status);
        assert_eq!(back.latitude, fix.latitude);
        assert_eq!(back.position_covariance.len(), 9);
    }

    #[test]
    fn compressed_image_bytes_follow_dialect() {
        let img = CompressedImage {
            header: Header::default(),
            format: "jpeg".to_string(),
            data: Bytes::from_static(&[0xff, 0xd8]),
        };
        assert_eq!(to_json(&img.to_record(Dialect::Ros1))["data"], json!("/9g="));
        assert_eq!(
            to_json(&img.to_record(Dialect::Ros2))["data"],
            json!([255, 216])
        );

        let back = CompressedImage::decode(
            &from_json(&to_json(&img.to_record(Dialect::Ros1)), Dialect::Ros1).unwrap(),
        )
        .unwrap();
        assert_eq!(back, img);
    }

    #[test]
    fn empty_request_is_an_empty_object() {
        assert_eq!(to_json(&EmptyRequest {}.to_record(Dialect::Ros1)), json!({}));
    }

    #[test]
    fn header_stamped_splits_seconds() {
        let h = Header::stamped("base_link", 1.5);
        assert_eq!(h.stamp, Time::new(1, 500_000_000));
        assert_eq!(h.frame_id, "base_link");
    }
}
