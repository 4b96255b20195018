//! Hands events to a single consumer over an unbounded channel.

use tokio::sync::mpsc;

use super::{BatchEvent, EventSink, Severity};

/// A sink that forwards events to one receiver.
///
/// `emit` never blocks. Once the receiver is dropped, events are discarded.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<(BatchEvent, Severity)>,
}

impl ChannelSink {
    /// Creates the sink and the receiver its events arrive on.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<(BatchEvent, Severity)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: &BatchEvent, severity: Severity) {
        let _ = self.tx.send((event.clone(), severity));
    }
}
