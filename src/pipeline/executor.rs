//! Event pipeline executor: the drain thread and its lifecycle.
//!
//! The pipeline runs one dedicated thread. Each iteration:
//! 1. Block on the event channel for at most one poll interval.
//! 2. Dispatch the event to every reporter in registration order.
//! 3. Mark the event done so `stop` can see the drain progress.
//! 4. On an empty poll, exit if the running flag has been cleared.
//!
//! Shutdown is graceful: [`EventPipeline::stop`] first waits until every
//! event enqueued so far has reached every reporter, only then clears the
//! running flag and joins the thread.

use crate::config::PipelineSettings;
use crate::error::{MonitorError, Result};
use crate::pipeline::publisher::{EventPublisher, Outstanding};
use crate::reporting::ReporterRegistry;
use crate::types::StatEvent;
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// Ordered stat event queue with a single draining worker
pub struct EventPipeline {
    tx: Sender<StatEvent>,
    outstanding: Arc<Outstanding>,
    running: Arc<AtomicBool>,
    settings: PipelineSettings,
    /// Receiver and reporters waiting for `start` to move them into the worker
    idle: Option<(Receiver<StatEvent>, ReporterRegistry)>,
    handle: Option<JoinHandle<()>>,
}

impl EventPipeline {
    /// Create a stopped pipeline that will dispatch to `reporters`
    pub fn new(reporters: ReporterRegistry, settings: PipelineSettings) -> Self {
        let (tx, rx) = unbounded();
        Self {
            tx,
            outstanding: Arc::new(Outstanding::default()),
            running: Arc::new(AtomicBool::new(false)),
            settings,
            idle: Some((rx, reporters)),
            handle: None,
        }
    }

    /// Spawn the drain thread. Events put before this call are kept.
    pub fn start(&mut self) -> Result<()> {
        let Some((rx, reporters)) = self.idle.take() else {
            tracing::warn!("Event pipeline already started");
            return Ok(());
        };

        tracing::info!(
            "Starting event pipeline with reporters {:?}",
            reporters.names()
        );

        self.running.store(true, Ordering::SeqCst);
        let worker = DrainWorker {
            rx,
            reporters,
            running: self.running.clone(),
            outstanding: self.outstanding.clone(),
            poll_interval: self.settings.poll_interval(),
        };

        let handle = std::thread::Builder::new()
            .name("stats-drain".to_string())
            .spawn(move || worker.run())
            .map_err(|e| {
                self.running.store(false, Ordering::SeqCst);
                MonitorError::Thread(format!("Failed to spawn stats drain thread: {}", e))
            })?;
        self.handle = Some(handle);
        Ok(())
    }

    /// Handle for producers
    pub fn publisher(&self) -> EventPublisher {
        EventPublisher::new(self.tx.clone(), self.outstanding.clone())
    }

    /// Enqueue an event directly
    pub fn put(&self, event: StatEvent) {
        self.publisher().put(event);
    }

    /// Events not yet dispatched to every reporter
    pub fn pending(&self) -> usize {
        self.outstanding.get()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Drain everything enqueued so far, then stop the worker and join it.
    ///
    /// Idempotent. Calling it on a pipeline that was never started drops
    /// whatever was queued.
    pub fn stop(&mut self) {
        let Some(handle) = self.handle.take() else {
            if self.idle.take().is_some() && self.pending() > 0 {
                tracing::warn!(
                    "Event pipeline never started, dropping {} events",
                    self.pending()
                );
            }
            return;
        };

        tracing::info!("Stopping event pipeline");
        let left = self
            .outstanding
            .wait_drained(self.settings.poll_interval(), || handle.is_finished());
        if left > 0 {
            tracing::error!("Event pipeline worker exited with {} events undelivered", left);
        }

        self.running.store(false, Ordering::SeqCst);
        if handle.join().is_err() {
            tracing::error!("Stats drain thread panicked");
        }
        tracing::info!("Event pipeline stopped");
    }
}

impl Drop for EventPipeline {
    fn drop(&mut self) {
        self.stop();
    }
}

/// State moved into the drain thread
struct DrainWorker {
    rx: Receiver<StatEvent>,
    reporters: ReporterRegistry,
    running: Arc<AtomicBool>,
    outstanding: Arc<Outstanding>,
    poll_interval: Duration,
}

impl DrainWorker {
    fn run(mut self) {
        tracing::debug!("Stats drain thread started");

        loop {
            match self.rx.recv_timeout(self.poll_interval) {
                Ok(event) => self.dispatch(event),
                Err(RecvTimeoutError::Timeout) => {
                    if !self.running.load(Ordering::SeqCst) {
                        // Anything that slipped in after the drain wait
                        while let Ok(event) = self.rx.try_recv() {
                            self.dispatch(event);
                        }
                        break;
                    }
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        self.reporters.flush();
        tracing::debug!("Stats drain thread stopped");
    }

    fn dispatch(&mut self, event: StatEvent) {
        tracing::debug!(
            "STATS: {} {} {}",
            event.kind(),
            event.peer,
            event.measurement
        );
        self.reporters.dispatch(&event);
        self.outstanding.decrement();
    }
}
