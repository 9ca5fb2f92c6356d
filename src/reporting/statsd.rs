//! Minimal statsd client
//!
//! Sends one UDP datagram per measurement, fire-and-forget:
//!
//! ```text
//! <project>.<label>:<value>|<type>
//! ```
//!
//! # Metric Types
//!
//! - **Counter** (`c`): add the value to the bucket
//! - **Timer** (`ms`): a duration in milliseconds
//! - **Gauge** (`g`): an arbitrary current value
//!
//! Labels are lowercased. Float values are truncated to an integer before
//! sending. A client whose target cannot be resolved at construction is
//! never built; send failures are logged and dropped.

use crate::error::{MonitorError, Result};
use crate::types::Endpoint;
use std::fmt;
use std::net::{SocketAddr, UdpSocket};
use std::time::Instant;

/// Statsd metric type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricType {
    Counter,
    Timer,
    Gauge,
}

impl MetricType {
    /// Wire suffix
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricType::Counter => "c",
            MetricType::Timer => "ms",
            MetricType::Gauge => "g",
        }
    }
}

/// Value of one measurement
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricValue {
    Int(i64),
    Float(f64),
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Int(v) => write!(f, "{}", v),
            MetricValue::Float(v) => write!(f, "{}", v.trunc() as i64),
        }
    }
}

impl From<i64> for MetricValue {
    fn from(v: i64) -> Self {
        MetricValue::Int(v)
    }
}

impl From<f64> for MetricValue {
    fn from(v: f64) -> Self {
        MetricValue::Float(v)
    }
}

/// Render one datagram
pub fn format_datagram(project: &str, label: &str, value: MetricValue, kind: MetricType) -> String {
    format!(
        "{}.{}:{}|{}",
        project,
        label.to_lowercase(),
        value,
        kind.as_str()
    )
}

/// UDP statsd client
pub struct StatsdClient {
    socket: UdpSocket,
    target: SocketAddr,
    project: String,
}

impl StatsdClient {
    /// Resolve `endpoint` and bind a local UDP socket
    pub fn new(endpoint: &Endpoint, project: &str) -> Result<Self> {
        let target = endpoint.resolve()?[0];
        let bind_addr: SocketAddr = if target.is_ipv4() {
            SocketAddr::from(([0, 0, 0, 0], 0))
        } else {
            SocketAddr::from(([0u16; 8], 0))
        };
        let socket = UdpSocket::bind(bind_addr).map_err(|e| MonitorError::Bind {
            address: bind_addr.to_string(),
            source: e,
        })?;

        tracing::info!("Statsd client will be sending to {}", target);

        Ok(Self {
            socket,
            target,
            project: project.to_lowercase(),
        })
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }

    /// Send one measurement. Failures are logged, never returned.
    pub fn send(&self, label: &str, value: impl Into<MetricValue>, kind: MetricType) {
        let data = format_datagram(&self.project, label, value.into(), kind);
        tracing::trace!("Statsd client sending {:?} to {}", data, self.target);
        if let Err(e) = self.socket.send_to(data.as_bytes(), self.target) {
            tracing::error!("Statsd client error sending to {}: {}", self.target, e);
        }
    }

    pub fn counter(&self, label: &str, value: i64) {
        self.send(label, value, MetricType::Counter);
    }

    pub fn timer(&self, label: &str, millis: f64) {
        self.send(label, millis, MetricType::Timer);
    }

    pub fn gauge(&self, label: &str, value: f64) {
        self.send(label, value, MetricType::Gauge);
    }

    /// Start timing a block. The elapsed time is sent once, on
    /// [`TimerGuard::stop`] or when the guard is dropped.
    pub fn time(&self, label: impl Into<String>) -> TimerGuard<'_> {
        TimerGuard {
            client: self,
            label: label.into(),
            start: Instant::now(),
            stopped: false,
        }
    }
}

/// Scoped timer created by [`StatsdClient::time`]
pub struct TimerGuard<'a> {
    client: &'a StatsdClient,
    label: String,
    start: Instant,
    stopped: bool,
}

impl TimerGuard<'_> {
    /// Send the elapsed time now. Later calls and the drop are no-ops.
    pub fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        let millis = self.start.elapsed().as_secs_f64() * 1000.0;
        self.client.timer(&self.label, millis);
    }
}

impl Drop for TimerGuard<'_> {
    fn drop(&mut self) {
        self.stop();
    }
}
