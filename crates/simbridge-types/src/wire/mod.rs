//! Wire encoders over the [`Record`](crate::Record) tree.
//!
//! - [`json`] – rosbridge message bodies (`msg`, `args`, `values`), with
//!   the ROS1/ROS2 differences for time stamps and byte arrays.
//! - [`proto`] – protobuf binary, used for Cyber RT payloads and
//!   `base_map.bin`.
//! - [`text`] – protobuf text format, used for `base_map.txt`.

pub mod json;
pub mod proto;
pub mod text;
