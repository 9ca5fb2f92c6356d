//! Probes: the client half of every node
//!
//! A [`Probe`] keeps one persistent TCP session to one peer's echo
//! responder and measures round-trip latency over it. Every
//! `messages_per_report` round trips it publishes a single timer event
//! carrying the worst round trip of that window. Failures never stop a
//! probe: each one becomes a connection error event, followed by a fixed
//! cool-down and a reconnect.
//!
//! [`ProbePool`] owns one probe per peer and starts them staggered so that
//! window boundaries of different peers do not line up.
//!
//! # Lifecycle
//!
//! ```text
//! Stopped ──start──► Connecting ──connected──► Probing
//!                        ▲                        │
//!                        └──── error + cooldown ◄─┘
//!        (stop from any state) ──► Stopped
//! ```

pub mod pool;
pub mod session;
mod worker;

pub use pool::ProbePool;
pub use session::{LatencyWindow, ProbeSession};

use crate::config::ProbeSettings;
use crate::error::{MonitorError, Result};
use crate::pipeline::EventPublisher;
use crate::shutdown::ShutdownSignal;
use crate::types::Endpoint;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use worker::ProbeWorker;

/// Observable probe state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ProbeState {
    Stopped = 0,
    Connecting = 1,
    Probing = 2,
}

impl ProbeState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => ProbeState::Connecting,
            2 => ProbeState::Probing,
            _ => ProbeState::Stopped,
        }
    }
}

/// Latency probe for one peer, running on its own thread
pub struct Probe {
    peer: Endpoint,
    settings: ProbeSettings,
    publisher: EventPublisher,
    shutdown: ShutdownSignal,
    state: Arc<AtomicU8>,
    handle: Option<JoinHandle<()>>,
}

impl Probe {
    pub fn new(peer: Endpoint, settings: ProbeSettings, publisher: EventPublisher) -> Self {
        Self {
            peer,
            settings,
            publisher,
            shutdown: ShutdownSignal::new(),
            state: Arc::new(AtomicU8::new(ProbeState::Stopped as u8)),
            handle: None,
        }
    }

    pub fn peer(&self) -> &Endpoint {
        &self.peer
    }

    pub fn state(&self) -> ProbeState {
        ProbeState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Spawn the probe thread. A probe runs at most once.
    pub fn start(&mut self) -> Result<()> {
        if self.handle.is_some() || !self.shutdown.is_running() {
            tracing::warn!("Probe for {} already started", self.peer);
            return Ok(());
        }

        let worker = ProbeWorker {
            peer: self.peer.clone(),
            settings: self.settings.clone(),
            publisher: self.publisher.clone(),
            shutdown: self.shutdown.clone(),
            state: self.state.clone(),
        };
        self.state
            .store(ProbeState::Connecting as u8, Ordering::SeqCst);
        let handle = std::thread::Builder::new()
            .name(format!("probe-{}", self.peer))
            .spawn(move || worker.run())
            .map_err(|e| {
                self.state.store(ProbeState::Stopped as u8, Ordering::SeqCst);
                MonitorError::Thread(format!("Failed to spawn probe for {}: {}", self.peer, e))
            })?;
        self.handle = Some(handle);
        Ok(())
    }

    /// Ask the probe thread to finish without waiting for it
    pub fn signal_stop(&self) {
        self.shutdown.trigger();
    }

    /// Wait for the probe thread to exit. Returns immediately if it was
    /// never started or has already been joined.
    pub fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("Probe thread for {} panicked", self.peer);
            }
        }
    }

    /// Signal and join. Idempotent.
    pub fn stop(&mut self) {
        self.signal_stop();
        self.join();
    }
}

impl Drop for Probe {
    fn drop(&mut self) {
        self.stop();
    }
}
