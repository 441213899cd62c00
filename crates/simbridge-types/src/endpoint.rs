//! Where the middleware lives and how we talk to it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::BridgeError;
use crate::value::Dialect;

/// Port used when an address omits one.
pub const DEFAULT_PORT: u16 = 9090;

/// Wire protocol variant spoken by the remote middleware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// ROS1 through rosbridge v2 (JSON over WebSocket).
    Ros1,
    /// ROS2 through rosbridge v2 (JSON over WebSocket).
    Ros2,
    /// Apollo Cyber RT through the length-prefixed binary bridge (TCP).
    Cyber,
}

impl Protocol {
    /// Short configuration name (`ros1`, `ros2`, `cyber`).
    pub fn name(self) -> &'static str {
        match self {
            Protocol::Ros1 => "ros1",
            Protocol::Ros2 => "ros2",
            Protocol::Cyber => "cyber",
        }
    }

    /// Field-shaping dialect used by this protocol's serializer.
    pub fn dialect(self) -> Dialect {
        match self {
            Protocol::Ros1 => Dialect::Ros1,
            Protocol::Ros2 => Dialect::Ros2,
            Protocol::Cyber => Dialect::Protobuf,
        }
    }

    /// Whether the protocol is one of the rosbridge flavours.
    pub fn is_rosbridge(self) -> bool {
        matches!(self, Protocol::Ros1 | Protocol::Ros2)
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Protocol::Ros1 => "ROS1",
            Protocol::Ros2 => "ROS2",
            Protocol::Cyber => "Cyber RT",
        })
    }
}

impl FromStr for Protocol {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ros" | "ros1" => Ok(Protocol::Ros1),
            "ros2" => Ok(Protocol::Ros2),
            "cyber" | "cyberrt" | "cyber_rt" | "apollo" => Ok(Protocol::Cyber),
            _ => Err(BridgeError::UnsupportedProtocol(s.to_string())),
        }
    }
}

/// Address, port and protocol variant of a middleware endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    host: String,
    port: u16,
    protocol: Protocol,
}

impl Endpoint {
    /// Build an endpoint from parts.  The host is not validated here; an
    /// empty host simply never becomes eligible for a connect attempt.
    pub fn new(host: impl Into<String>, port: u16, protocol: Protocol) -> Self {
        Self {
            host: host.into().trim().to_string(),
            port,
            protocol,
        }
    }

    /// Parse `host[:port]`, defaulting the port to [`DEFAULT_PORT`].
    ///
    /// Bracketed IPv6 literals (`[::1]:9090`) are accepted.  A bare IPv6
    /// literal (`::1`) is taken as a host with the default port.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::InvalidEndpoint`] when the host is empty or the
    /// port is not a valid `u16`.
    pub fn parse(address: &str, protocol: Protocol) -> Result<Self, BridgeError> {
        let address = address.trim();
        let (host, port) = match address.rsplit_once(':') {
            Some((host, port)) if !host.contains(':') || host.ends_with(']') => {
                let port = port.parse::<u16>().map_err(|e| {
                    BridgeError::InvalidEndpoint(format!("bad port in '{address}': {e}"))
                })?;
                (host, port)
            }
            _ => (address, DEFAULT_PORT),
        };
        if host.is_empty() {
            return Err(BridgeError::InvalidEndpoint(format!(
                "missing host in '{address}'"
            )));
        }
        Ok(Self::new(host, port, protocol))
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// `host:port`, suitable for a TCP connect.  IPv6 literals are
    /// bracketed.
    pub fn authority(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    /// `ws://host:port`, the rosbridge server URL.
    pub fn websocket_url(&self) -> String {
        format!("ws://{}", self.authority())
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.authority(), self.protocol)
    }
}

/// Connection status as shown to the host application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Status {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Status::Disconnected => "Disconnected",
            Status::Connecting => "Connecting",
            Status::Connected => "Connected",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_defaults_port() {
        let ep = Endpoint::parse("localhost", Protocol::Ros1).unwrap();
        assert_eq!(ep.host(), "localhost");
        assert_eq!(ep.port(), DEFAULT_PORT);
        assert_eq!(ep.websocket_url(), "ws://localhost:9090");
    }

    #[test]
    fn parse_explicit_port() {
        let ep = Endpoint::parse(" 10.0.0.7:8888 ", Protocol::Cyber).unwrap();
        assert_eq!(ep.host(), "10.0.0.7");
        assert_eq!(ep.port(), 8888);
        assert_eq!(ep.authority(), "10.0.0.7:8888");
    }

    #[test]
    fn parse_bracketed_ipv6() {
        let ep = Endpoint::parse("[::1]:9091", Protocol::Ros2).unwrap();
        assert_eq!(ep.host(), "[::1]");
        assert_eq!(ep.port(), 9091);

        let bare = Endpoint::parse("::1", Protocol::Ros2).unwrap();
        assert_eq!(bare.host(), "::1");
        assert_eq!(bare.port(), DEFAULT_PORT);
        assert_eq!(bare.authority(), "[::1]:9090");
        assert_eq!(bare.websocket_url(), "ws://[::1]:9090");
        assert_eq!(ep.authority(), "[::1]:9091");

        let parts = Endpoint::new("fe80::2", 8888, Protocol::Cyber);
        assert_eq!(parts.authority(), "[fe80::2]:8888");
        assert_eq!(parts.authority().parse::<std::net::SocketAddr>().unwrap().port(), 8888);
    }

    #[test]
    fn parse_rejects_bad_input() {
        assert!(matches!(
            Endpoint::parse("", Protocol::Ros1),
            Err(BridgeError::InvalidEndpoint(_))
        ));
        assert!(matches!(
            Endpoint::parse("host:99999", Protocol::Ros1),
            Err(BridgeError::InvalidEndpoint(_))
        ));
        assert!(matches!(
            Endpoint::parse(":9090", Protocol::Ros1),
            Err(BridgeError::InvalidEndpoint(_))
        ));
    }

    #[test]
    fn protocol_from_str() {
        assert_eq!("ROS".parse::<Protocol>().unwrap(), Protocol::Ros1);
        assert_eq!("ros2".parse::<Protocol>().unwrap(), Protocol::Ros2);
        assert_eq!("Cyber".parse::<Protocol>().unwrap(), Protocol::Cyber);
        let err = "dds".parse::<Protocol>().unwrap_err();
        assert!(matches!(err, BridgeError::UnsupportedProtocol(ref p) if p == "dds"));
    }

    #[test]
    fn status_display_matches_ui_strings() {
        assert_eq!(Status::default().to_string(), "Disconnected");
        assert_eq!(Status::Connecting.to_string(), "Connecting");
        assert_eq!(Status::Connected.to_string(), "Connected");
    }
}
