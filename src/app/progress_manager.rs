//! Progress bar UI for batch runs.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use mediabatch_core::{BatchEvent, EventSink, Phase, Severity};

const BAR_TEMPLATE: &str = "{prefix:.bold} [{bar:30.cyan/blue}] {pos:>3}% {msg}";

/// Renders the current job's progress on a single terminal bar.
///
/// Text output stays with the tracing sink; this only moves the bar.
pub(crate) struct ProgressBarSink {
    bar: ProgressBar,
}

impl ProgressBarSink {
    /// Creates a bar drawn on stderr.
    pub(crate) fn new() -> Self {
        Self::with_bar(ProgressBar::new(100))
    }

    fn with_bar(bar: ProgressBar) -> Self {
        bar.set_style(
            ProgressStyle::with_template(BAR_TEMPLATE)
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        bar.enable_steady_tick(Duration::from_millis(120));
        Self { bar }
    }

    #[cfg(test)]
    fn position(&self) -> u64 {
        self.bar.position()
    }
}

impl EventSink for ProgressBarSink {
    fn emit(&self, event: &BatchEvent, _severity: Severity) {
        match event {
            BatchEvent::Started { index, total, url } => {
                self.bar.set_position(0);
                self.bar.set_prefix(format!("[{index}/{total}]"));
                self.bar.set_message(url.clone());
            }
            BatchEvent::Progress { progress, .. } => {
                self.bar.set_position(percent_position(progress.percent));
                match progress.phase {
                    Phase::Downloading => self.bar.set_message(format!(
                        "{} ETA {}",
                        progress.rate_label, progress.eta_label
                    )),
                    Phase::Merging | Phase::Finished => self.bar.set_message(progress.to_string()),
                }
            }
            BatchEvent::Failed { message, .. } => {
                self.bar.set_message(format!("failed: {message}"));
            }
            BatchEvent::ProgressReset => self.bar.set_position(0),
            BatchEvent::BatchComplete(_) => self.bar.finish_and_clear(),
            BatchEvent::Finished { .. } | BatchEvent::Log { .. } => {}
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn percent_position(percent: f64) -> u64 {
    percent.clamp(0.0, 100.0).round() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use indicatif::ProgressDrawTarget;
    use mediabatch_core::{BatchResult, ProgressEvent};

    fn hidden_sink() -> ProgressBarSink {
        let bar = ProgressBar::with_draw_target(Some(100), ProgressDrawTarget::hidden());
        ProgressBarSink::with_bar(bar)
    }

    fn progress(phase: Phase, percent: f64) -> BatchEvent {
        BatchEvent::Progress {
            index: 1,
            progress: ProgressEvent {
                phase,
                percent,
                rate_label: "1.0MiB/s".to_string(),
                eta_label: "00:10".to_string(),
            },
        }
    }

    #[test]
    fn test_percent_position_rounds_and_clamps() {
        assert_eq!(percent_position(45.4), 45);
        assert_eq!(percent_position(45.6), 46);
        assert_eq!(percent_position(-3.0), 0);
        assert_eq!(percent_position(250.0), 100);
    }

    #[test]
    fn test_bar_follows_job_progress() {
        let sink = hidden_sink();
        sink.emit(
            &BatchEvent::Started {
                index: 1,
                total: 2,
                url: "http://x/1".to_string(),
            },
            Severity::Info,
        );
        assert_eq!(sink.position(), 0);

        sink.emit(&progress(Phase::Downloading, 42.0), Severity::Progress);
        assert_eq!(sink.position(), 42);

        sink.emit(&progress(Phase::Finished, 100.0), Severity::Progress);
        assert_eq!(sink.position(), 100);

        sink.emit(&BatchEvent::ProgressReset, Severity::Progress);
        assert_eq!(sink.position(), 0);

        sink.emit(
            &BatchEvent::BatchComplete(BatchResult::default()),
            Severity::Info,
        );
        assert!(sink.bar.is_finished());
    }
}
