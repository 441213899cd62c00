//! Bridge settings as they appear in configuration files.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use simbridge_types::{BridgeError, Endpoint, Protocol};

/// Shortest pause between a disconnect and the next connection attempt.
pub const MIN_RECONNECT_BACKOFF: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BridgeConfig {
    /// `ros1`, `ros2` or `cyber`.
    pub protocol: String,
    /// `host[:port]`; the port defaults to 9090.
    pub address: String,
    pub reconnect_backoff_ms: u64,
    pub connect_timeout_ms: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            protocol: "ros1".to_string(),
            address: "localhost:9090".to_string(),
            reconnect_backoff_ms: 1000,
            connect_timeout_ms: 5000,
        }
    }
}

impl BridgeConfig {
    pub fn protocol(&self) -> Result<Protocol, BridgeError> {
        self.protocol.parse()
    }

    pub fn endpoint(&self) -> Result<Endpoint, BridgeError> {
        Endpoint::parse(&self.address, self.protocol()?)
    }

    /// Configured backoff, never shorter than [`MIN_RECONNECT_BACKOFF`].
    pub fn reconnect_backoff(&self) -> Duration {
        Duration::from_millis(self.reconnect_backoff_ms).max(MIN_RECONNECT_BACKOFF)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = BridgeConfig::default();
        assert_eq!(cfg.protocol().unwrap(), Protocol::Ros1);
        let endpoint = cfg.endpoint().unwrap();
        assert_eq!(endpoint.host(), "localhost");
        assert_eq!(endpoint.port(), 9090);
        assert_eq!(cfg.reconnect_backoff(), Duration::from_secs(1));
    }

    #[test]
    fn short_backoff_is_clamped() {
        let cfg = BridgeConfig {
            reconnect_backoff_ms: 10,
            ..Default::default()
        };
        assert_eq!(cfg.reconnect_backoff(), MIN_RECONNECT_BACKOFF);

        let cfg = BridgeConfig {
            reconnect_backoff_ms: 2500,
            ..Default::default()
        };
        assert_eq!(cfg.reconnect_backoff(), Duration::from_millis(2500));
    }

    #[test]
    fn unknown_protocol_is_rejected() {
        let cfg = BridgeConfig {
            protocol: "dds".to_string(),
            ..Default::default()
        };
        assert!(matches!(cfg.protocol(), Err(BridgeError::UnsupportedProtocol(_))));
    }

    #[test]
    fn partial_json_uses_defaults() {
        let cfg: BridgeConfig = serde_json::from_str(r#"{"protocol":"cyber"}"#).unwrap();
        assert_eq!(cfg.protocol().unwrap(), Protocol::Cyber);
        assert_eq!(cfg.address, "localhost:9090");
    }
}
