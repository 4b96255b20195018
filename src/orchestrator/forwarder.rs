//! Drains one job's engine events into the sink.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::warn;

use crate::engine::{EngineEvent, EngineLogLevel};
use crate::progress::ProgressTranslator;
use crate::sink::{BatchEvent, EventSink, Severity};

/// Background task that translates raw engine events for one job.
///
/// Owns the job's [`ProgressTranslator`] and hands it back from
/// [`Forwarder::finish`] once every buffered event was delivered.
pub(crate) struct Forwarder {
    stop: oneshot::Sender<()>,
    handle: JoinHandle<ProgressTranslator>,
}

impl Forwarder {
    pub(crate) fn spawn(
        index: usize,
        mut events: mpsc::UnboundedReceiver<EngineEvent>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        let (stop, mut stopped) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            let mut translator = ProgressTranslator::new();
            loop {
                tokio::select! {
                    biased;
                    event = events.recv() => match event {
                        Some(event) => forward(index, event, &mut translator, sink.as_ref()),
                        None => break,
                    },
                    _ = &mut stopped => {
                        // The engine call returned; deliver what is buffered.
                        events.close();
                        while let Ok(event) = events.try_recv() {
                            forward(index, event, &mut translator, sink.as_ref());
                        }
                        break;
                    }
                }
            }
            translator
        });
        Self { stop, handle }
    }

    /// Stops the forwarder after it delivered every buffered event.
    pub(crate) async fn finish(self) -> ProgressTranslator {
        let _ = self.stop.send(());
        match self.handle.await {
            Ok(translator) => translator,
            Err(e) => {
                warn!(error = %e, "progress forwarder task failed");
                ProgressTranslator::new()
            }
        }
    }
}

fn forward(
    index: usize,
    event: EngineEvent,
    translator: &mut ProgressTranslator,
    sink: &dyn EventSink,
) {
    match event {
        EngineEvent::Progress(raw) => {
            if let Some(progress) = translator.on_raw(&raw) {
                sink.emit(&BatchEvent::Progress { index, progress }, Severity::Progress);
            }
        }
        EngineEvent::Log { level, message } => {
            let severity = match level {
                EngineLogLevel::Debug => Severity::Info,
                EngineLogLevel::Warning | EngineLogLevel::Error => Severity::Error,
            };
            sink.emit(
                &BatchEvent::Log {
                    index,
                    level,
                    message,
                },
                severity,
            );
        }
    }
}
