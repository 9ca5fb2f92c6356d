//! Core data types for tcp-beep
//!
//! This module contains the data model shared by the probes, the event
//! pipeline and the reporters.
//!
//! # Main Types
//!
//! - [`Endpoint`] - A `(host, port)` pair identifying a node
//! - [`StatEvent`] - One timestamped measurement about one peer
//! - [`Measurement`] - Tagged payload of a stat event (timer or error report)
//! - [`StatKind`] - The kind of a measurement, used for sink naming
//! - [`ErrorClass`] - Classification tag of an error report
//!
//! Events are immutable once constructed. Probes create them, the event
//! pipeline moves them to the drain thread, and reporters only ever see a
//! shared reference.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{SocketAddr, ToSocketAddrs};
use std::str::FromStr;

use crate::error::{MonitorError, Result};

/// A node address: host name or IP literal plus TCP port
///
/// Used both as the local bind address and as the identity of a peer.
/// Equality and hashing are by value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Endpoint {
    host: String,
    port: u16,
}

impl Endpoint {
    /// Create a new endpoint
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Host part as configured (not resolved)
    pub fn host(&self) -> &str {
        &self.host
    }

    /// TCP port
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Resolve to socket addresses
    pub fn resolve(&self) -> Result<Vec<SocketAddr>> {
        let addrs: Vec<SocketAddr> = (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|e| MonitorError::address(self.to_string(), e.to_string()))?
            .collect();
        if addrs.is_empty() {
            return Err(MonitorError::address(
                self.to_string(),
                "host resolved to no addresses",
            ));
        }
        Ok(addrs)
    }
}

impl From<SocketAddr> for Endpoint {
    fn from(addr: SocketAddr) -> Self {
        Self::new(addr.ip().to_string(), addr.port())
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

impl FromStr for Endpoint {
    type Err = MonitorError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let (host, port) = s
            .rsplit_once(':')
            .ok_or_else(|| MonitorError::address(s, "expected host:port"))?;
        let host = host.trim_start_matches('[').trim_end_matches(']');
        if host.is_empty() {
            return Err(MonitorError::address(s, "empty host"));
        }
        let port = port
            .parse::<u16>()
            .map_err(|e| MonitorError::address(s, format!("bad port: {}", e)))?;
        Ok(Self::new(host, port))
    }
}

impl TryFrom<String> for Endpoint {
    type Error = MonitorError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Endpoint> for String {
    fn from(endpoint: Endpoint) -> Self {
        endpoint.to_string()
    }
}

/// Kind of a stat event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatKind {
    /// Round-trip latency for one window
    Timer,
    /// A failure talking to the peer
    ErrorReport,
}

impl StatKind {
    /// Short name used in file names and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            StatKind::Timer => "timer",
            StatKind::ErrorReport => "error",
        }
    }
}

impl fmt::Display for StatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification tag carried by an error report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Connect, send, receive or echo failure
    ConnectionError,
}

impl ErrorClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorClass::ConnectionError => "connection_error",
        }
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload of a stat event
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Measurement {
    /// Worst round trip of a window, in milliseconds
    Timer { rtt_ms: f64 },
    /// Failure report
    ErrorReport { class: ErrorClass },
}

impl Measurement {
    pub fn kind(&self) -> StatKind {
        match self {
            Measurement::Timer { .. } => StatKind::Timer,
            Measurement::ErrorReport { .. } => StatKind::ErrorReport,
        }
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Measurement::Timer { rtt_ms } => write!(f, "{}", rtt_ms),
            Measurement::ErrorReport { class } => write!(f, "{}", class),
        }
    }
}

/// One measurement about one peer
#[derive(Debug, Clone, PartialEq)]
pub struct StatEvent {
    /// Wall-clock time the measurement refers to
    pub timestamp: DateTime<Utc>,
    /// The peer that was measured
    pub peer: Endpoint,
    /// What was measured
    pub measurement: Measurement,
}

impl StatEvent {
    /// Timer event for a completed window
    pub fn timer(peer: Endpoint, rtt_ms: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            peer,
            measurement: Measurement::Timer { rtt_ms },
        }
    }

    /// Connection error report stamped with the current time
    pub fn connection_error(peer: Endpoint) -> Self {
        Self {
            timestamp: Utc::now(),
            peer,
            measurement: Measurement::ErrorReport {
                class: ErrorClass::ConnectionError,
            },
        }
    }

    pub fn kind(&self) -> StatKind {
        self.measurement.kind()
    }

    /// Timestamp as fractional unix seconds
    pub fn unix_seconds(&self) -> f64 {
        self.timestamp.timestamp_micros() as f64 / 1_000_000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_endpoint_parse_and_display() {
        let ep: Endpoint = "10.0.0.2:7000".parse().unwrap();
        assert_eq!(ep.host(), "10.0.0.2");
        assert_eq!(ep.port(), 7000);
        assert_eq!(ep.to_string(), "10.0.0.2:7000");
    }

    #[test]
    fn test_endpoint_parse_ipv6() {
        let ep: Endpoint = "[::1]:9000".parse().unwrap();
        assert_eq!(ep.host(), "::1");
        assert_eq!(ep.to_string(), "[::1]:9000");
    }

    #[test]
    fn test_endpoint_parse_rejects_garbage() {
        assert!("no-port".parse::<Endpoint>().is_err());
        assert!(":7000".parse::<Endpoint>().is_err());
        assert!("host:99999".parse::<Endpoint>().is_err());
    }

    #[test]
    fn test_endpoint_value_equality() {
        assert_eq!(Endpoint::new("a", 1), Endpoint::new("a".to_string(), 1));
        assert_ne!(Endpoint::new("a", 1), Endpoint::new("a", 2));
    }

    #[test]
    fn test_endpoint_serde_as_string() {
        let ep = Endpoint::new("node-b", 7001);
        let json = serde_json::to_string(&ep).unwrap();
        assert_eq!(json, "\"node-b:7001\"");
        let back: Endpoint = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ep);
    }

    #[test]
    fn test_endpoint_resolve_loopback() {
        let addrs = Endpoint::new("127.0.0.1", 80).resolve().unwrap();
        assert_eq!(addrs[0].port(), 80);
    }

    #[test]
    fn test_event_kind_and_value() {
        let peer = Endpoint::new("b", 1);
        let t = StatEvent::timer(peer.clone(), 1.5, Utc::now());
        assert_eq!(t.kind(), StatKind::Timer);
        assert_eq!(t.measurement.to_string(), "1.5");

        let e = StatEvent::connection_error(peer);
        assert_eq!(e.kind(), StatKind::ErrorReport);
        assert_eq!(e.measurement.to_string(), "connection_error");
        assert_eq!(e.kind().as_str(), "error");
    }

    #[test]
    fn test_unix_seconds() {
        let ts = Utc.timestamp_opt(1_700_000_000, 250_000_000).unwrap();
        let event = StatEvent::timer(Endpoint::new("b", 1), 0.0, ts);
        assert!((event.unix_seconds() - 1_700_000_000.25).abs() < 1e-6);
    }
}
