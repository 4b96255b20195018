//! Sink that turns events into structured log records.

use tracing::{debug, error, info};

use super::{BatchEvent, EventSink, Severity};

/// Logs every event through `tracing`.
///
/// Progress goes to `debug`, lifecycle to `info`, failures to `error`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl TracingSink {
    /// Creates the sink.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for TracingSink {
    fn emit(&self, event: &BatchEvent, severity: Severity) {
        let job = event.job_index();
        match severity {
            Severity::Progress => debug!(job, "{event}"),
            Severity::Info => info!(job, "{event}"),
            Severity::Error => error!(job, "{event}"),
        }
    }
}
