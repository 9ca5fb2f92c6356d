//! Cooperative stop signal shared between an owner and its worker thread.
//!
//! Every long-running loop in the monitor (probe threads, the accept loop,
//! echo handlers) checks a [`ShutdownSignal`] at its head. The signal is an
//! atomic running flag plus a wake-up channel: triggering it clears the flag
//! and drops the channel's only sender, so any thread parked in
//! [`ShutdownSignal::sleep`] returns immediately instead of finishing its
//! cool-down or jitter delay.

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

struct Inner {
    running: AtomicBool,
    wake_tx: Mutex<Option<Sender<()>>>,
    wake_rx: Receiver<()>,
}

/// Cloneable running flag with interruptible sleeps
#[derive(Clone)]
pub struct ShutdownSignal {
    inner: Arc<Inner>,
}

impl ShutdownSignal {
    /// Create a signal in the running state
    pub fn new() -> Self {
        let (wake_tx, wake_rx) = bounded(0);
        Self {
            inner: Arc::new(Inner {
                running: AtomicBool::new(true),
                wake_tx: Mutex::new(Some(wake_tx)),
                wake_rx,
            }),
        }
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    /// Clear the running flag and wake every sleeper. Idempotent.
    pub fn trigger(&self) {
        self.inner.running.store(false, Ordering::SeqCst);
        self.inner
            .wake_tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    /// Sleep for `duration` unless triggered first.
    ///
    /// Returns `true` if the full duration elapsed while still running.
    pub fn sleep(&self, duration: Duration) -> bool {
        if !self.is_running() {
            return false;
        }
        match self.inner.wake_rx.recv_timeout(duration) {
            Err(RecvTimeoutError::Timeout) => self.is_running(),
            Ok(()) | Err(RecvTimeoutError::Disconnected) => false,
        }
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ShutdownSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShutdownSignal")
            .field("running", &self.is_running())
            .finish()
    }
}
