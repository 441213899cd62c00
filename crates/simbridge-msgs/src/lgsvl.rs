//! Simulator ground truth and vehicle interface messages (`lgsvl_msgs`).

use simbridge_types::{TypeDescriptor, message, proto_enum};

use crate::ros::{Header, Point, Pose, Quaternion, Twist, Vector3};

proto_enum! {
    pub enum Gear {
        Neutral = 0 => "GEAR_NEUTRAL",
        Drive = 1 => "GEAR_DRIVE",
        Reverse = 2 => "GEAR_REVERSE",
        Parking = 3 => "GEAR_PARKING",
        Low = 4 => "GEAR_LOW",
    }
}

proto_enum! {
    pub enum BlinkerState {
        Off = 0 => "BLINKERS_OFF",
        Left = 1 => "BLINKERS_LEFT",
        Right = 2 => "BLINKERS_RIGHT",
        Hazard = 3 => "BLINKERS_HAZARD",
    }
}

proto_enum! {
    pub enum HeadlightState {
        Off = 0 => "HEADLIGHTS_OFF",
        Low = 1 => "HEADLIGHTS_LOW",
        High = 2 => "HEADLIGHTS_HIGH",
    }
}

proto_enum! {
    pub enum WiperState {
        Off = 0 => "WIPERS_OFF",
        Low = 1 => "WIPERS_LOW",
        Med = 2 => "WIPERS_MED",
        High = 3 => "WIPERS_HIGH",
    }
}

proto_enum! {
    pub enum VehicleMode {
        CompleteManual = 0 => "VEHICLE_MODE_COMPLETE_MANUAL",
        CompleteAutoDrive = 1 => "VEHICLE_MODE_COMPLETE_AUTO_DRIVE",
        AutoSteerOnly = 2 => "VEHICLE_MODE_AUTO_STEER_ONLY",
        AutoSpeedOnly = 3 => "VEHICLE_MODE_AUTO_SPEED_ONLY",
        EmergencyMode = 4 => "VEHICLE_MODE_EMERGENCY_MODE",
    }
}

message! {
    pub struct BoundingBox2D [TypeDescriptor::ros("lgsvl_msgs/BoundingBox2D")] {
        pub x: f32 = 1,
        pub y: f32 = 2,
        pub width: f32 = 3,
        pub height: f32 = 4,
    }
}

message! {
    pub struct BoundingBox3D [TypeDescriptor::ros("lgsvl_msgs/BoundingBox3D")] {
        pub position: Pose = 1,
        pub size: Vector3 = 2,
    }
}

message! {
    pub struct Detection2D [TypeDescriptor::ros("lgsvl_msgs/Detection2D")] {
        pub header: Header = 1,
        pub id: u32 = 2,
        pub label: String = 3,
        pub score: f64 = 4,
        pub bbox: BoundingBox2D = 5,
        pub velocity: Twist = 6,
    }
}

message! {
    pub struct Detection2DArray [TypeDescriptor::ros("lgsvl_msgs/Detection2DArray")] {
        pub header: Header = 1,
        pub detections: Vec<Detection2D> = 2,
    }
}

message! {
    /// Ground-truth 3D object, boxes in the sensor frame.
    pub struct Detection3D [TypeDescriptor::ros("lgsvl_msgs/Detection3D")] {
        pub header: Header = 1,
        pub id: u32 = 2,
        pub label: String = 3,
        pub score: f64 = 4,
        pub bbox: BoundingBox3D = 5,
        pub velocity: Twist = 6,
    }
}

message! {
    pub struct Detection3DArray [TypeDescriptor::ros("lgsvl_msgs/Detection3DArray")] {
        pub header: Header = 1,
        pub detections: Vec<Detection3D> = 2,
    }
}

message! {
    /// Traffic light ground truth.
    pub struct Signal [TypeDescriptor::ros("lgsvl_msgs/Signal")] {
        pub header: Header = 1,
        pub id: u32 = 2,
        pub label: String = 3,
        pub score: f64 = 4,
        pub bbox: BoundingBox3D = 5,
    }
}

message! {
    pub struct SignalArray [TypeDescriptor::ros("lgsvl_msgs/SignalArray")] {
        pub header: Header = 1,
        pub signals: Vec<Signal> = 2,
    }
}

message! {
    pub struct CanBusData [TypeDescriptor::ros("lgsvl_msgs/CanBusData")] {
        pub header: Header = 1,
        pub speed_mps: f32 = 2,
        /// 0 to 1.
        pub throttle_pct: f32 = 3,
        /// 0 to 1.
        pub brake_pct: f32 = 4,
        /// -1 to 1.
        pub steer_pct: f32 = 5,
        pub parking_brake_active: bool = 6,
        pub high_beams_active: bool = 7,
        pub low_beams_active: bool = 8,
        pub hazard_lights_active: bool = 9,
        pub fog_lights_active: bool = 10,
        pub left_turn_signal_active: bool = 11,
        pub right_turn_signal_active: bool = 12,
        pub wipers_active: bool = 13,
        pub reverse_gear_active: bool = 14,
        pub selected_gear: Gear = 15,
        pub engine_active: bool = 16,
        pub engine_rpm: f32 = 17,
        pub gps_latitude: f64 = 18,
        pub gps_longitude: f64 = 19,
        pub gps_altitude: f64 = 20,
        pub orientation: Quaternion = 21,
        pub linear_velocities: Vector3 = 22,
    }
}

message! {
    /// Drive-by-wire command from an external stack.
    pub struct VehicleControlData [TypeDescriptor::ros("lgsvl_msgs/VehicleControlData")] {
        pub header: Header = 1,
        /// 0 to 1.
        pub acceleration_pct: f32 = 2,
        /// 0 to 1.
        pub braking_pct: f32 = 3,
        /// Radians.
        pub target_wheel_angle: f32 = 4,
        /// Radians per second.
        pub target_wheel_angular_rate: f32 = 5,
        pub target_gear: Gear = 6,
    }
}

message! {
    pub struct VehicleStateData [TypeDescriptor::ros("lgsvl_msgs/VehicleStateData")] {
        pub header: Header = 1,
        pub blinker_state: BlinkerState = 2,
        pub headlight_state: HeadlightState = 3,
        pub wiper_state: WiperState = 4,
        pub current_gear: Gear = 5,
        pub vehicle_mode: VehicleMode = 6,
        pub hand_brake_active: bool = 7,
        pub horn_active: bool = 8,
        pub autonomous_mode_active: bool = 9,
    }
}

message! {
    pub struct DetectedRadarObject [TypeDescriptor::ros("lgsvl_msgs/DetectedRadarObject")] {
        pub id: i32 = 1,
        pub sensor_aim: Vector3 = 2,
        pub sensor_right: Vector3 = 3,
        pub sensor_position: Point = 4,
        pub sensor_velocity: Vector3 = 5,
        pub sensor_angle: f64 = 6,
        pub object_position: Point = 7,
        pub object_velocity: Vector3 = 8,
        pub object_relative_position: Point = 9,
        pub object_relative_velocity: Vector3 = 10,
        pub object_collider_size: Vector3 = 11,
        pub object_state: u8 = 12,
        pub new_detection: bool = 13,
    }
}

impl DetectedRadarObject {
    pub const STATE_MOVING: u8 = 0;
    pub const STATE_STATIONARY: u8 = 1;
}

message! {
    pub struct DetectedRadarObjectArray [TypeDescriptor::ros("lgsvl_msgs/DetectedRadarObjectArray")] {
        pub header: Header = 1,
        pub objects: Vec<DetectedRadarObject> = 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use simbridge_types::wire::json::{from_json, to_json};
    use simbridge_types::{Dialect, Message, Time};

    #[test]
    fn detection_array_keeps_detection_order() {
        let array = Detection3DArray {
            header: Header::default(),
            detections: (0..3)
                .map(|id| Detection3D {
                    id,
                    label: format!("car_{id}"),
                    score: 1.0,
                    ..Default::default()
                })
                .collect(),
        };
        let json = to_json(&array.to_record(Dialect::Ros1));
        let labels: Vec<_> = json["detections"]
            .as_array()
            .unwrap()
            .iter()
            .map(|d| d["label"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(labels, ["car_0", "car_1", "car_2"]);
        assert_eq!(json["detections"][1]["bbox"]["position"]["orientation"]["w"], json!(0.0));
    }

    #[test]
    fn vehicle_control_from_rosbridge_json() {
        let json = json!({
            "header": {"seq": 3, "stamp": {"secs": 10, "nsecs": 0}, "frame_id": ""},
            "acceleration_pct": 0.5,
            "braking_pct": 0,
            "target_wheel_angle": -0.1,
            "target_wheel_angular_rate": 0.0,
            "target_gear": 2
        });
        let cmd = VehicleControlData::decode(&from_json(&json, Dialect::Ros1).unwrap()).unwrap();
        assert_eq!(cmd.header.stamp, Time::new(10, 0));
        assert_eq!(cmd.acceleration_pct, 0.5);
        assert_eq!(cmd.braking_pct, 0.0);
        assert_eq!(cmd.target_gear, Gear::Reverse);
    }

    #[test]
    fn unknown_gear_is_a_decode_error() {
        let json = json!({"target_gear": 42});
        let err = VehicleControlData::decode(&from_json(&json, Dialect::Ros1).unwrap()).unwrap_err();
        assert_eq!(err.path(), "target_gear");
    }
}
