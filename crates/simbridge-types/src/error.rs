//! Error types shared across the bridge crates.

use thiserror::Error;

use crate::endpoint::Protocol;

/// Global error type for every fallible public bridge operation.
///
/// Transient socket failures never appear here; the bridge folds them into
/// [`Status`](crate::Status) transitions instead.
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Unsupported protocol: {0}")]
    UnsupportedProtocol(String),

    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("Message type {type_name} is not supported by the {protocol} bridge")]
    UnsupportedMessage {
        type_name: &'static str,
        protocol: Protocol,
    },

    #[error("{operation} is not supported by the {protocol} bridge")]
    Unsupported {
        operation: &'static str,
        protocol: Protocol,
    },

    #[error("Codec Error: {0}")]
    Codec(String),

    #[error("Decode Error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Transport Error: {0}")]
    Transport(String),

    #[error("Runtime Error: {0}")]
    Runtime(String),

    #[error("Configuration Error: {0}")]
    Config(String),
}

/// Failure to shape a decoded [`Value`](crate::Value) tree into a typed
/// message.  Carries the dotted field path where decoding stopped.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{}{reason}", at_path(.path))]
pub struct DecodeError {
    path: String,
    reason: String,
}

fn at_path(path: &str) -> String {
    if path.is_empty() {
        String::new()
    } else {
        format!("at {path}: ")
    }
}

impl DecodeError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            path: String::new(),
            reason: reason.into(),
        }
    }

    /// A value of the wrong shape was found where `expected` was declared.
    pub fn type_mismatch(expected: &str, found: &crate::Value) -> Self {
        Self::new(format!("expected {expected}, found {}", found.kind()))
    }

    /// Prefix the error path with `field`.
    pub fn at(mut self, field: &str) -> Self {
        self.path = if self.path.is_empty() {
            field.to_string()
        } else {
            format!("{field}.{}", self.path)
        };
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_error_path_is_built_outside_in() {
        let err = DecodeError::new("expected double, found string")
            .at("x")
            .at("point")
            .at("segment");
        assert_eq!(err.path(), "segment.point.x");
        assert_eq!(
            err.to_string(),
            "at segment.point.x: expected double, found string"
        );
    }

    #[test]
    fn decode_error_without_path_displays_reason_only() {
        let err = DecodeError::new("truncated varint");
        assert_eq!(err.to_string(), "truncated varint");
    }

    #[test]
    fn bridge_error_display() {
        let err = BridgeError::UnsupportedMessage {
            type_name: "Chassis",
            protocol: Protocol::Ros2,
        };
        assert!(err.to_string().contains("Chassis"));
        assert!(err.to_string().contains("ROS2"));

        let err = BridgeError::UnsupportedProtocol("zenoh".to_string());
        assert_eq!(err.to_string(), "Unsupported protocol: zenoh");
    }
}
