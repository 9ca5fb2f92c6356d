//! Configuration module for tcp-beep
//!
//! This module handles monitor configuration:
//! - The static peer list shared by every node of the cluster
//! - Probe, responder and pipeline tunables (see [`settings`])
//! - Which stat sinks are enabled and where they write
//!
//! # Config Location
//!
//! Without an explicit `--config`, the monitor looks for
//! `<config_dir>/tcp-beep/config.toml`:
//! - **Linux**: `~/.config/tcp-beep/config.toml`
//! - **macOS**: `~/Library/Application Support/tcp-beep/config.toml`
//! - **Windows**: `%APPDATA%\tcp-beep\config.toml`
//!
//! Files ending in `.json` are parsed as JSON, everything else as TOML.
//!
//! # Example
//!
//! ```toml
//! peers = ["10.0.0.1:7000", "10.0.0.2:7000", "10.0.0.3:7000"]
//!
//! [probe]
//! messages_per_second = 10.0
//! messages_per_report = 10
//!
//! [reporting]
//! write_stats_to_file = true
//! stats_log_dir = "/var/log/tcp-beep"
//! statsd_host = "statsd.internal:8125"
//! ```
//!
//! Every node can share the same file: the local node is dropped from the
//! peer list at startup.

pub mod settings;

pub use settings::*;

use crate::error::{MonitorError, Result};
use crate::types::Endpoint;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application identifier for config directories
pub const APP_ID: &str = "tcp-beep";

/// Default config filename
pub const CONFIG_FILE: &str = "config.toml";

// ==================== Config Directory ====================

/// Get the platform config directory for tcp-beep
pub fn config_dir() -> Option<PathBuf> {
    dirs_next::config_dir().map(|p| p.join(APP_ID))
}

/// Path of the default config file
pub fn default_config_path() -> Option<PathBuf> {
    config_dir().map(|p| p.join(CONFIG_FILE))
}

// ==================== Reporting Config ====================

/// Which stat sinks are enabled and how they are addressed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportingConfig {
    /// Enable the append-only file sink
    pub write_stats_to_file: bool,

    /// Directory for stat files
    pub stats_log_dir: PathBuf,

    /// `host:port` of a statsd daemon. None disables the statsd sink.
    pub statsd_host: Option<String>,

    /// Prefix prepended to every statsd bucket
    pub statsd_project: String,

    /// Bucket stem for latency timers
    pub timer_metric: String,

    /// Bucket stem for error counters
    pub error_metric: String,
}

impl Default for ReportingConfig {
    fn default() -> Self {
        Self {
            write_stats_to_file: true,
            stats_log_dir: PathBuf::from("stats"),
            statsd_host: None,
            statsd_project: "tcp_beep".to_string(),
            timer_metric: "tcp_beep".to_string(),
            error_metric: "tcp_error".to_string(),
        }
    }
}

impl ReportingConfig {
    /// Parsed statsd address, if the sink is enabled
    pub fn statsd_endpoint(&self) -> Result<Option<Endpoint>> {
        self.statsd_host
            .as_deref()
            .filter(|h| !h.trim().is_empty())
            .map(str::parse)
            .transpose()
    }
}

// ==================== Monitor Config ====================

/// Complete monitor configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct MonitorConfig {
    /// Every node of the cluster, the local one may be included
    pub peers: Vec<Endpoint>,

    /// Probe tunables
    pub probe: ProbeSettings,

    /// Echo responder tunables
    pub responder: ResponderSettings,

    /// Event pipeline tunables
    pub pipeline: PipelineSettings,

    /// Stat sinks
    pub reporting: ReportingConfig,
}

impl MonitorConfig {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Load and validate a config file from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            MonitorError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config: Self = if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&content).map_err(|e| {
                MonitorError::Config(format!("Failed to parse config file {:?}: {}", path, e))
            })?
        } else {
            toml::from_str(&content).map_err(|e| {
                MonitorError::Config(format!("Failed to parse config file {:?}: {}", path, e))
            })?
        };

        config.validate()?;
        Ok(config)
    }

    /// Save the config as TOML
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                MonitorError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| MonitorError::Serialization(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content).map_err(|e| {
            MonitorError::Config(format!("Failed to write config file {:?}: {}", path, e))
        })
    }

    /// Reject values the worker threads cannot run with
    pub fn validate(&self) -> Result<()> {
        let probe = &self.probe;
        if !(probe.messages_per_second.is_finite() && probe.messages_per_second > 0.0) {
            return Err(MonitorError::Config(format!(
                "probe.messages_per_second must be positive, got {}",
                probe.messages_per_second
            )));
        }
        if probe.messages_per_report == 0 {
            return Err(MonitorError::Config(
                "probe.messages_per_report must be at least 1".to_string(),
            ));
        }
        if probe.longest_delay().is_none() {
            return Err(MonitorError::Config(format!(
                "probe.messages_per_second {} is too low: window of {} messages has no representable duration",
                probe.messages_per_second, probe.messages_per_report
            )));
        }
        if self.responder.accept_retry_ms == 0 || self.responder.connection_poll_ms == 0 {
            return Err(MonitorError::Config(
                "responder poll intervals must be non-zero".to_string(),
            ));
        }
        if self.pipeline.poll_interval_ms == 0 {
            return Err(MonitorError::Config(
                "pipeline.poll_interval_ms must be non-zero".to_string(),
            ));
        }
        self.reporting
            .statsd_endpoint()
            .map_err(|e| MonitorError::Config(format!("reporting.statsd_host: {}", e)))?;
        Ok(())
    }

    /// Peers to probe from `local`, in configured order, without `local`
    /// itself and without duplicates
    pub fn peers_excluding(&self, local: &Endpoint) -> Vec<Endpoint> {
        let mut peers: Vec<Endpoint> = Vec::with_capacity(self.peers.len());
        for peer in &self.peers {
            if peer != local && !peers.contains(peer) {
                peers.push(peer.clone());
            }
        }
        peers
    }
}
