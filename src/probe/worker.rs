//! Probe thread main loop
//!
//! Connect, measure windows of round trips, publish one timer per window.
//! Any failure publishes a connection error, waits the cool-down and starts
//! over with a fresh connection.

use super::session::{LatencyWindow, ProbeSession};
use super::ProbeState;
use crate::config::ProbeSettings;
use crate::error::Result;
use crate::pipeline::EventPublisher;
use crate::shutdown::ShutdownSignal;
use crate::types::{Endpoint, StatEvent};
use chrono::Utc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

pub(crate) struct ProbeWorker {
    pub(crate) peer: Endpoint,
    pub(crate) settings: ProbeSettings,
    pub(crate) publisher: EventPublisher,
    pub(crate) shutdown: ShutdownSignal,
    pub(crate) state: Arc<AtomicU8>,
}

impl ProbeWorker {
    pub(crate) fn run(self) {
        tracing::info!("Probe for {} started", self.peer);

        while self.shutdown.is_running() {
            self.set_state(ProbeState::Connecting);
            match self.run_session() {
                Ok(()) => break,
                Err(e) => {
                    tracing::warn!("Connection to {} failed: {}", self.peer, e);
                    // Cool-down counts as reconnecting
                    self.set_state(ProbeState::Connecting);
                    self.publisher
                        .put(StatEvent::connection_error(self.peer.clone()));
                    self.shutdown.sleep(self.settings.cooldown());
                }
            }
        }

        self.set_state(ProbeState::Stopped);
        tracing::info!("Probe for {} stopped", self.peer);
    }

    /// Probe over one connection. Returns `Ok` only when stopped.
    fn run_session(&self) -> Result<()> {
        tracing::debug!("Connecting to {}", self.peer);
        let mut session = ProbeSession::connect(&self.peer, &self.settings)?;
        self.set_state(ProbeState::Probing);
        tracing::info!("Connected to {}", self.peer);

        let mut rng = rand::rng();
        loop {
            let mut window = LatencyWindow::new();
            for _ in 0..self.settings.messages_per_report {
                if !self.shutdown.is_running() {
                    break;
                }
                let sent_at = Utc::now();
                let rtt = session.round_trip()?;
                window.record(rtt, sent_at);
                self.shutdown
                    .sleep(self.settings.inter_probe_delay(&mut rng));
            }

            let stopping = !self.shutdown.is_running();
            if stopping {
                session.send_sentinel();
            }
            if let Some(event) = window.finish(&self.peer) {
                self.publisher.put(event);
            }
            if stopping {
                return Ok(());
            }
        }
    }

    fn set_state(&self, state: ProbeState) {
        self.state.store(state as u8, Ordering::SeqCst);
    }
}
