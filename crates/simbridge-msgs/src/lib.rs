//! `simbridge-msgs` – Message catalogue
//!
//! Concrete wire messages exchanged between the simulator and the robotics
//! stacks it drives.  Every type here is declared with the schema macros
//! from `simbridge-types`, so the same definition serves rosbridge JSON,
//! Cyber RT protobuf and text export.
//!
//! # Modules
//!
//! - [`ros`] – `std_msgs`, `geometry_msgs`, `sensor_msgs`, `nav_msgs`,
//!   `rosgraph_msgs` and `std_srvs`.
//! - [`lgsvl`] – simulator-specific ground truth and vehicle control
//!   messages (`lgsvl_msgs`).
//! - [`apollo`] – Apollo canbus, control, GNSS, localization and radar
//!   messages.  Usable over Cyber RT and over ROS via `pb_msgs`.
//! - [`hdmap`] – Apollo HD map and its `base_map.txt` / `base_map.bin`
//!   export.
//!
//! # Type names
//!
//! | Family | Protocol | Example |
//! |--------|----------|---------|
//! | ROS    | ROS1     | `sensor_msgs/NavSatFix` |
//! | ROS    | ROS2     | `sensor_msgs/msg/NavSatFix` |
//! | Apollo | ROS1     | `pb_msgs/Chassis` |
//! | Apollo | Cyber RT | `apollo.canbus.Chassis` |

pub mod apollo;
pub mod hdmap;
pub mod lgsvl;
pub mod ros;
