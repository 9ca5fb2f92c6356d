//! Tunables for the probe, responder and pipeline threads
//!
//! These are the per-component sections of [`MonitorConfig`](super::MonitorConfig).
//! Each section knows how to turn its raw numbers into the durations the
//! worker threads sleep for.
//!
//! # Rate Control
//!
//! A probe aims for `messages_per_second` round trips on average. Instead of
//! a fixed spacing it sleeps `U(0,2) × (1 / messages_per_second)` after each
//! round trip, so the mean rate matches the target while probes across the
//! mesh drift apart rather than firing in lockstep.
//!
//! # Startup Stagger
//!
//! The pool starts its probes one after another, separated by
//! `(messages_per_report / messages_per_second / peer_count) × U(0,2)`,
//! spreading the window boundaries of different peers over one window.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Probe session settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeSettings {
    /// Target round trips per second per peer
    pub messages_per_second: f64,

    /// Round trips per emitted timer event (window size)
    pub messages_per_report: u32,

    /// Fixed delay after a connection failure before reconnecting
    pub cooldown_ms: u64,

    /// Optional deadline on each echo read. None blocks indefinitely.
    pub read_timeout_ms: Option<u64>,

    /// Optional deadline on connect. None uses the OS default.
    pub connect_timeout_ms: Option<u64>,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            messages_per_second: 10.0,
            messages_per_report: 10,
            cooldown_ms: 1000,
            read_timeout_ms: None,
            connect_timeout_ms: None,
        }
    }
}

impl ProbeSettings {
    /// Nominal spacing between round trips
    pub fn nominal_interval(&self) -> Duration {
        saturating_secs(1.0 / self.messages_per_second)
    }

    /// Randomized delay after one round trip, uniform in `[0, 2 × nominal)`
    pub fn inter_probe_delay<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        scale(self.nominal_interval(), rng.random::<f64>() * 2.0)
    }

    /// Nominal duration of one full window
    pub fn window_duration(&self) -> Duration {
        saturating_secs(self.messages_per_report as f64 / self.messages_per_second)
    }

    /// Randomized delay between consecutive probe starts for `peer_count` peers
    pub fn stagger_delay<R: Rng + ?Sized>(&self, peer_count: usize, rng: &mut R) -> Duration {
        if peer_count == 0 {
            return Duration::ZERO;
        }
        let slot = saturating_secs(self.window_duration().as_secs_f64() / peer_count as f64);
        scale(slot, rng.random::<f64>() * 2.0)
    }

    /// Longest randomized sleep these settings produce, twice the window.
    /// None if the rate is so low that it has no `Duration`.
    pub fn longest_delay(&self) -> Option<Duration> {
        let secs = 2.0 * self.messages_per_report as f64 / self.messages_per_second;
        Duration::try_from_secs_f64(secs).ok()
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout_ms.map(Duration::from_millis)
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_ms.map(Duration::from_millis)
    }
}

/// `secs` as a duration, clamped to `Duration::MAX` (or zero) when out of range
fn saturating_secs(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs).unwrap_or(if secs > 0.0 {
        Duration::MAX
    } else {
        Duration::ZERO
    })
}

fn scale(duration: Duration, factor: f64) -> Duration {
    saturating_secs(duration.as_secs_f64() * factor)
}

/// Echo responder settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponderSettings {
    /// Back-off after a failed accept (for example, out of file descriptors)
    pub accept_retry_ms: u64,

    /// Read timeout on accepted connections, bounding how long a handler
    /// takes to notice the responder stopping
    pub connection_poll_ms: u64,
}

impl Default for ResponderSettings {
    fn default() -> Self {
        Self {
            accept_retry_ms: 100,
            connection_poll_ms: 200,
        }
    }
}

impl ResponderSettings {
    pub fn accept_retry(&self) -> Duration {
        Duration::from_millis(self.accept_retry_ms)
    }

    pub fn connection_poll(&self) -> Duration {
        Duration::from_millis(self.connection_poll_ms)
    }
}

/// Event pipeline settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// How long the drain thread blocks on an empty queue before
    /// re-checking its running flag
    pub poll_interval_ms: u64,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 100,
        }
    }
}

impl PipelineSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_defaults() {
        let probe = ProbeSettings::default();
        assert_eq!(probe.nominal_interval(), Duration::from_millis(100));
        assert_eq!(probe.window_duration(), Duration::from_secs(1));
        assert_eq!(probe.cooldown(), Duration::from_secs(1));
        assert!(probe.read_timeout().is_none());
        assert!(probe.connect_timeout().is_none());
    }

    #[test]
    fn test_inter_probe_delay_bounds() {
        let probe = ProbeSettings {
            messages_per_second: 20.0,
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(7);
        let max = Duration::from_millis(100);
        let mut total = Duration::ZERO;
        for _ in 0..2000 {
            let d = probe.inter_probe_delay(&mut rng);
            assert!(d < max, "delay {:?} exceeds {:?}", d, max);
            total += d;
        }
        // Mean should sit near the nominal 50ms spacing
        let mean = total / 2000;
        assert!(
            mean > Duration::from_millis(40) && mean < Duration::from_millis(60),
            "mean delay {:?}",
            mean
        );
    }

    #[test]
    fn test_stagger_delay_bounds() {
        let probe = ProbeSettings {
            messages_per_second: 10.0,
            messages_per_report: 5,
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(42);
        // 0.5s window / 4 peers = 125ms nominal, so [0, 250ms)
        for _ in 0..500 {
            let d = probe.stagger_delay(4, &mut rng);
            assert!(d < Duration::from_millis(250));
        }
        assert_eq!(probe.stagger_delay(0, &mut rng), Duration::ZERO);
    }

    #[test]
    fn test_unrepresentable_rate_saturates() {
        let probe = ProbeSettings {
            messages_per_second: 1e-20,
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(probe.nominal_interval(), Duration::MAX);
        assert_eq!(probe.window_duration(), Duration::MAX);
        assert!(probe.longest_delay().is_none());
        // Neither randomized delay may panic
        let _ = probe.inter_probe_delay(&mut rng);
        let _ = probe.stagger_delay(3, &mut rng);

        assert_eq!(
            ProbeSettings::default().longest_delay(),
            Some(Duration::from_secs(2))
        );
    }

    #[test]
    fn test_partial_sections_fill_defaults() {
        let probe: ProbeSettings = toml::from_str("messages_per_second = 2.5").unwrap();
        assert_eq!(probe.messages_per_second, 2.5);
        assert_eq!(probe.messages_per_report, 10);

        let responder: ResponderSettings = toml::from_str("").unwrap();
        assert_eq!(responder, ResponderSettings::default());
    }
}
