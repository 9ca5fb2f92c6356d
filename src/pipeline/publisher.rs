//! Producer side of the event pipeline.
//!
//! Probes hold an [`EventPublisher`] clone each. `put` never blocks: it
//! bumps the outstanding counter and pushes onto an unbounded channel. The
//! drain thread decrements the counter only after an event has been handed
//! to every reporter, which is what lets `EventPipeline::stop` wait for a
//! true drain instead of an empty channel.

use crate::types::StatEvent;
use crossbeam_channel::Sender;
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::Duration;

/// Count of events enqueued but not yet dispatched to every reporter
#[derive(Default)]
pub(crate) struct Outstanding {
    count: Mutex<usize>,
    drained: Condvar,
}

impl Outstanding {
    pub(crate) fn increment(&self) {
        *self.count.lock().unwrap_or_else(PoisonError::into_inner) += 1;
    }

    pub(crate) fn decrement(&self) {
        let mut count = self.count.lock().unwrap_or_else(PoisonError::into_inner);
        *count = count.saturating_sub(1);
        if *count == 0 {
            self.drained.notify_all();
        }
    }

    pub(crate) fn get(&self) -> usize {
        *self.count.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Block until the count reaches zero.
    ///
    /// Re-checks `worker_gone` every `poll` and gives up if it returns true,
    /// so a dead drain thread cannot hang the caller. Returns the count left.
    pub(crate) fn wait_drained(&self, poll: Duration, mut worker_gone: impl FnMut() -> bool) -> usize {
        let mut count = self.count.lock().unwrap_or_else(PoisonError::into_inner);
        while *count > 0 {
            if worker_gone() {
                break;
            }
            let (guard, _) = self
                .drained
                .wait_timeout(count, poll)
                .unwrap_or_else(PoisonError::into_inner);
            count = guard;
        }
        *count
    }
}

/// Cloneable handle for enqueueing stat events
#[derive(Clone)]
pub struct EventPublisher {
    tx: Sender<StatEvent>,
    outstanding: Arc<Outstanding>,
}

impl EventPublisher {
    pub(crate) fn new(tx: Sender<StatEvent>, outstanding: Arc<Outstanding>) -> Self {
        Self { tx, outstanding }
    }

    /// Enqueue `event` without blocking.
    ///
    /// Once the pipeline has stopped the event is dropped with a warning.
    pub fn put(&self, event: StatEvent) {
        self.outstanding.increment();
        if let Err(e) = self.tx.send(event) {
            self.outstanding.decrement();
            let event = e.into_inner();
            tracing::warn!(
                "Event pipeline stopped, dropping {} event for {}",
                event.kind(),
                event.peer
            );
        }
    }

    /// Events not yet dispatched to every reporter
    pub fn pending(&self) -> usize {
        self.outstanding.get()
    }
}

impl std::fmt::Debug for EventPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventPublisher")
            .field("pending", &self.pending())
            .finish()
    }
}
