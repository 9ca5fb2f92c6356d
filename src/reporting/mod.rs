//! Stat sinks fed by the event pipeline.
//!
//! A [`Reporter`] receives every stat event, one call per event, from the
//! pipeline's single drain thread. Reporters own their I/O handles and deal
//! with their own failures: a write that fails is logged here and never
//! reaches the pipeline, so one broken sink cannot stall the others.
//!
//! # Built-in sinks
//!
//! - [`StatsFileReporter`] - one append-only text file per (kind, local node, peer)
//! - [`StatsdReporter`] - UDP datagrams to a statsd daemon via [`StatsdClient`]
//!
//! [`ReporterRegistry`] holds the active sinks in registration order. It is
//! built once at startup from [`ReportingConfig`] and moved into the drain
//! thread, which is the only thread that ever touches it.

pub mod file;
pub mod statsd;
pub mod statsd_reporter;

pub use file::StatsFileReporter;
pub use statsd::{MetricType, MetricValue, StatsdClient, TimerGuard};
pub use statsd_reporter::StatsdReporter;

use crate::config::ReportingConfig;
use crate::error::Result;
use crate::types::{Endpoint, StatEvent};

/// Destination for stat events
#[cfg_attr(test, mockall::automock)]
pub trait Reporter: Send {
    /// Short sink name for logs
    fn name(&self) -> &'static str;

    /// Record one event. Must not panic; failures stay inside the sink.
    fn write(&mut self, event: &StatEvent);

    /// Called once when the pipeline stops
    fn flush(&mut self) {}
}

/// Ordered set of active reporters
#[derive(Default)]
pub struct ReporterRegistry {
    reporters: Vec<Box<dyn Reporter>>,
}

impl ReporterRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the registry described by `config` for the node `local`.
    ///
    /// The file sink comes first, then statsd. Fails if the stats directory
    /// cannot be created.
    pub fn from_config(config: &ReportingConfig, local: &Endpoint) -> Result<Self> {
        let mut registry = Self::new();

        if config.write_stats_to_file {
            let reporter = StatsFileReporter::new(&config.stats_log_dir, local.host())?;
            tracing::info!("Writing stats to {:?}", config.stats_log_dir);
            registry.push(Box::new(reporter));
        }

        if let Some(endpoint) = config.statsd_endpoint()? {
            tracing::info!("Sending stats to statsd at {}", endpoint);
            registry.push(Box::new(StatsdReporter::new(&endpoint, config, local.host())));
        }

        if registry.is_empty() {
            tracing::warn!("No stat reporters enabled, measurements will only be logged");
        }

        Ok(registry)
    }

    /// Builder-style append
    pub fn with(mut self, reporter: Box<dyn Reporter>) -> Self {
        self.push(reporter);
        self
    }

    pub fn push(&mut self, reporter: Box<dyn Reporter>) {
        self.reporters.push(reporter);
    }

    pub fn len(&self) -> usize {
        self.reporters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reporters.is_empty()
    }

    /// Names in registration order
    pub fn names(&self) -> Vec<&'static str> {
        self.reporters.iter().map(|r| r.name()).collect()
    }

    /// Hand `event` to every reporter in registration order
    pub fn dispatch(&mut self, event: &StatEvent) {
        for reporter in &mut self.reporters {
            reporter.write(event);
        }
    }

    pub fn flush(&mut self) {
        for reporter in &mut self.reporters {
            reporter.flush();
        }
    }
}

impl std::fmt::Debug for ReporterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReporterRegistry")
            .field("reporters", &self.names())
            .finish()
    }
}
