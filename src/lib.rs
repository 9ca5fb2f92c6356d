//! # tcp-beep: TCP latency monitor for a mesh of nodes
//!
//! Every node runs an echo server and at the same time keeps a persistent
//! probe connection to every other node. Probes send a one-character line,
//! time the echo and report the worst round trip of each window. Failures
//! are reported as error events rather than stopping anything.
//!
//! ## Architecture
//!
//! - **Responder**: echoes probe lines back, one thread per connection
//! - **Probes**: one auto-reconnecting client thread per peer, started staggered
//! - **Pipeline**: one drain thread fanning stat events out to reporters in order
//! - **Reporting**: append-only stat files and statsd datagrams
//! - **Communication**: crossbeam channels and atomic running flags
//!
//! ## Configuration
//!
//! The monitor reads a TOML (or JSON) file, by default from the
//! platform config directory under `tcp-beep`:
//!
//! - **Linux**: `~/.config/tcp-beep/config.toml`
//! - **macOS**: `~/Library/Application Support/tcp-beep/config.toml`
//! - **Windows**: `%APPDATA%\tcp-beep\config.toml`
//!
//! ## Example
//!
//! ```ignore
//! use tcp_beep::{Endpoint, Monitor, MonitorConfig};
//!
//! fn main() -> tcp_beep::Result<()> {
//!     let mut config = MonitorConfig::default();
//!     config.peers = vec![
//!         "10.0.0.1:7000".parse()?,
//!         "10.0.0.2:7000".parse()?,
//!         "10.0.0.3:7000".parse()?,
//!     ];
//!
//!     // The local node is dropped from the peer list automatically
//!     let mut monitor = Monitor::new(config, Endpoint::new("10.0.0.1", 7000))?;
//!     monitor.start()?;
//!
//!     std::thread::sleep(std::time::Duration::from_secs(60));
//!     monitor.stop();
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod monitor;
pub mod pipeline;
pub mod probe;
pub mod protocol;
pub mod reporting;
pub mod responder;
pub mod shutdown;
pub mod types;

// Re-export commonly used types
pub use config::{MonitorConfig, ProbeSettings, ReportingConfig};
pub use error::{MonitorError, Result};
pub use monitor::Monitor;
pub use pipeline::{EventPipeline, EventPublisher};
pub use probe::{Probe, ProbePool, ProbeState};
pub use reporting::{Reporter, ReporterRegistry};
pub use responder::EchoResponder;
pub use types::{Endpoint, ErrorClass, Measurement, StatEvent, StatKind};
