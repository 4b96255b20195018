//! In-memory sink that records every event.

use std::sync::{Mutex, MutexGuard, PoisonError};

use super::{BatchEvent, EventSink, Severity};

/// Collects events behind a mutex, in arrival order.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<(BatchEvent, Severity)>>,
}

impl MemorySink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of everything recorded so far.
    #[must_use]
    pub fn events(&self) -> Vec<(BatchEvent, Severity)> {
        self.lock().clone()
    }

    /// Removes and returns everything recorded so far.
    pub fn take(&self) -> Vec<(BatchEvent, Severity)> {
        std::mem::take(&mut *self.lock())
    }

    /// Returns the number of recorded events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns true if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // A panicking emitter must not make the record unreadable.
    fn lock(&self) -> MutexGuard<'_, Vec<(BatchEvent, Severity)>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl EventSink for MemorySink {
    fn emit(&self, event: &BatchEvent, severity: Severity) {
        self.lock().push((event.clone(), severity));
    }
}
