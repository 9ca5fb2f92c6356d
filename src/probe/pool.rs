//! Pool of probes, one per peer

use super::Probe;
use crate::config::ProbeSettings;
use crate::error::Result;
use crate::pipeline::EventPublisher;
use crate::types::Endpoint;
use std::time::Duration;

/// Owns every probe of the node
pub struct ProbePool {
    probes: Vec<Probe>,
    settings: ProbeSettings,
    stagger: Option<Duration>,
    running: bool,
}

impl ProbePool {
    /// One probe per peer, in the given order
    pub fn new(peers: Vec<Endpoint>, settings: ProbeSettings, publisher: EventPublisher) -> Self {
        let probes = peers
            .into_iter()
            .map(|peer| Probe::new(peer, settings.clone(), publisher.clone()))
            .collect();
        Self {
            probes,
            settings,
            stagger: None,
            running: false,
        }
    }

    pub fn len(&self) -> usize {
        self.probes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.probes.is_empty()
    }

    pub fn peers(&self) -> Vec<Endpoint> {
        self.probes.iter().map(|p| p.peer().clone()).collect()
    }

    pub fn probes(&self) -> &[Probe] {
        &self.probes
    }

    /// Delay used between consecutive starts, once `start` has run
    pub fn stagger_delay(&self) -> Option<Duration> {
        self.stagger
    }

    /// Start every probe, waiting the stagger delay between starts.
    ///
    /// Blocks for up to `(peers - 1) × stagger`.
    pub fn start(&mut self) -> Result<()> {
        if self.probes.is_empty() {
            tracing::info!("No peers to probe");
            return Ok(());
        }
        if self.running {
            tracing::warn!("Probe pool already started");
            return Ok(());
        }

        let stagger = self
            .settings
            .stagger_delay(self.probes.len(), &mut rand::rng());
        self.stagger = Some(stagger);
        self.running = true;
        tracing::info!(
            "Starting {} probes, {:?} apart",
            self.probes.len(),
            stagger
        );

        let last = self.probes.len() - 1;
        for (i, probe) in self.probes.iter_mut().enumerate() {
            probe.start()?;
            if i < last {
                std::thread::sleep(stagger);
            }
        }
        Ok(())
    }

    /// Signal every probe first, then join them all. Idempotent.
    pub fn stop(&mut self) {
        if !self.running {
            return;
        }
        self.running = false;

        tracing::info!("Stopping probes");
        for probe in &self.probes {
            probe.signal_stop();
        }
        for probe in &mut self.probes {
            probe.join();
        }
        tracing::info!("Probes stopped");
    }
}

impl Drop for ProbePool {
    fn drop(&mut self) {
        self.stop();
    }
}
