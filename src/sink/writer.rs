//! Renders events as text lines into any writer (log file, pipe, buffer).

use std::io::Write;
use std::sync::Mutex;

use thiserror::Error;
use tracing::debug;

use super::{BatchEvent, EventSink, Severity};

/// Presentation failures. Always swallowed by the sink that hit them.
#[derive(Debug, Error)]
pub enum SinkError {
    /// Writing the rendered line failed.
    #[error("failed to write event: {0}")]
    Write(#[from] std::io::Error),

    /// A previous writer panicked while holding the lock.
    #[error("sink writer lock poisoned")]
    Poisoned,
}

/// Writes one `[severity] text` line per event.
///
/// Progress events are skipped unless enabled, since they arrive many times a
/// second.
#[derive(Debug)]
pub struct WriterSink<W: Write + Send> {
    writer: Mutex<W>,
    include_progress: bool,
}

impl<W: Write + Send> WriterSink<W> {
    /// Creates a sink over `writer` that skips progress events.
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
            include_progress: false,
        }
    }

    /// Also write progress events.
    #[must_use]
    pub fn with_progress(mut self, enabled: bool) -> Self {
        self.include_progress = enabled;
        self
    }

    /// Consumes the sink and returns the writer.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::Poisoned`] if a writer panicked mid-write.
    pub fn into_inner(self) -> Result<W, SinkError> {
        self.writer.into_inner().map_err(|_| SinkError::Poisoned)
    }

    fn try_emit(&self, event: &BatchEvent, severity: Severity) -> Result<(), SinkError> {
        let mut writer = self.writer.lock().map_err(|_| SinkError::Poisoned)?;
        writeln!(writer, "[{severity}] {event}")?;
        writer.flush()?;
        Ok(())
    }
}

impl<W: Write + Send> EventSink for WriterSink<W> {
    fn emit(&self, event: &BatchEvent, severity: Severity) {
        if severity == Severity::Progress && !self.include_progress {
            return;
        }
        if let Err(e) = self.try_emit(event, severity) {
            debug!(error = %e, "dropping event the writer sink could not store");
        }
    }
}
