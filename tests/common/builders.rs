//! Test data builders for creating test objects

use std::path::Path;
use tcp_beep::config::{MonitorConfig, PipelineSettings, ProbeSettings, ResponderSettings};
use tcp_beep::Endpoint;

/// Builder for monitor configs with test-friendly poll intervals
pub struct ConfigBuilder {
    config: MonitorConfig,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        let mut config = MonitorConfig::default();
        config.reporting.write_stats_to_file = false;
        config.responder = fast_responder();
        config.pipeline = fast_pipeline();
        Self { config }
    }

    pub fn peers(mut self, peers: &[Endpoint]) -> Self {
        self.config.peers = peers.to_vec();
        self
    }

    pub fn rate(mut self, messages_per_second: f64, messages_per_report: u32) -> Self {
        self.config.probe.messages_per_second = messages_per_second;
        self.config.probe.messages_per_report = messages_per_report;
        self
    }

    pub fn cooldown_ms(mut self, cooldown_ms: u64) -> Self {
        self.config.probe.cooldown_ms = cooldown_ms;
        self
    }

    pub fn stats_dir(mut self, dir: &Path) -> Self {
        self.config.reporting.write_stats_to_file = true;
        self.config.reporting.stats_log_dir = dir.to_path_buf();
        self
    }

    pub fn build(self) -> MonitorConfig {
        self.config
    }
}

/// Probe settings for tests: fast, short windows, short cool-down
pub fn fast_probe(messages_per_second: f64, messages_per_report: u32) -> ProbeSettings {
    ProbeSettings {
        messages_per_second,
        messages_per_report,
        cooldown_ms: 100,
        read_timeout_ms: Some(2000),
        connect_timeout_ms: Some(500),
    }
}

pub fn fast_responder() -> ResponderSettings {
    ResponderSettings {
        accept_retry_ms: 10,
        connection_poll_ms: 20,
    }
}

pub fn fast_pipeline() -> PipelineSettings {
    PipelineSettings {
        poll_interval_ms: 10,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let peer = Endpoint::new("127.0.0.1", 7000);
        let config = ConfigBuilder::new()
            .peers(&[peer.clone()])
            .rate(20.0, 4)
            .build();

        assert_eq!(config.peers, vec![peer]);
        assert_eq!(config.probe.messages_per_report, 4);
        assert!(!config.reporting.write_stats_to_file);
        assert!(config.validate().is_ok());
    }
}
