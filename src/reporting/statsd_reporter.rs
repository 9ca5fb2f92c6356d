//! Statsd sink
//!
//! Timer events become `<timer_metric>.<local host>.<peer host>` timers in
//! milliseconds. Error reports increment
//! `<error_metric>.<local host>.<peer host>.<error tag>` by one.

use crate::config::ReportingConfig;
use crate::reporting::{Reporter, StatsdClient};
use crate::types::{Endpoint, Measurement, StatEvent};

/// Reporter that forwards events to statsd
pub struct StatsdReporter {
    /// None if the client could not be set up; writes are then dropped
    client: Option<StatsdClient>,
    local_host: String,
    timer_metric: String,
    error_metric: String,
}

impl StatsdReporter {
    /// Create the reporter. A statsd host that cannot be resolved is
    /// logged and leaves the reporter inert rather than failing startup.
    pub fn new(endpoint: &Endpoint, config: &ReportingConfig, local_host: &str) -> Self {
        let client = match StatsdClient::new(endpoint, &config.statsd_project) {
            Ok(client) => Some(client),
            Err(e) => {
                tracing::error!("Statsd client configuration error: {}", e);
                None
            }
        };

        Self {
            client,
            local_host: local_host.to_string(),
            timer_metric: config.timer_metric.clone(),
            error_metric: config.error_metric.clone(),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.client.is_some()
    }

    /// Bucket name for `event`
    pub fn bucket(&self, event: &StatEvent) -> String {
        match event.measurement {
            Measurement::Timer { .. } => format!(
                "{}.{}.{}",
                self.timer_metric,
                self.local_host,
                event.peer.host()
            ),
            Measurement::ErrorReport { class } => format!(
                "{}.{}.{}.{}",
                self.error_metric,
                self.local_host,
                event.peer.host(),
                class
            ),
        }
    }
}

impl Reporter for StatsdReporter {
    fn name(&self) -> &'static str {
        "statsd"
    }

    fn write(&mut self, event: &StatEvent) {
        let Some(client) = &self.client else {
            return;
        };
        let bucket = self.bucket(event);
        match event.measurement {
            Measurement::Timer { rtt_ms } => client.timer(&bucket, rtt_ms),
            Measurement::ErrorReport { .. } => client.counter(&bucket, 1),
        }
    }
}
