//! Translation of raw engine progress notifications into [`ProgressEvent`]s.
//!
//! The engine reports progress as loosely-typed status maps (see
//! [`RawStatus`]). A [`ProgressTranslator`] is created per job and turns those
//! maps into normalized events:
//!
//! - `downloading` → [`Phase::Downloading`] with percent, rate and ETA labels
//! - `finished` → [`Phase::Merging`] at 100% (post-processing is starting)
//! - anything else → no event
//!
//! Progress display is best-effort: a malformed percent string never fails,
//! it reads as 0. Within one translator the reported percent never decreases.
//!
//! # Example
//!
//! ```
//! use mediabatch_core::engine::RawStatus;
//! use mediabatch_core::progress::{Phase, ProgressTranslator};
//!
//! let mut translator = ProgressTranslator::new();
//! let raw = RawStatus::new()
//!     .with("status", "downloading")
//!     .with("_percent_str", " 45.2%");
//! let event = translator.on_raw(&raw).unwrap();
//! assert_eq!(event.phase, Phase::Downloading);
//! assert_eq!(event.percent, 45.2);
//! ```

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use tracing::trace;

use crate::engine::RawStatus;

/// Rate label used when the engine did not report a speed.
pub const DEFAULT_RATE_LABEL: &str = "0 KB/s";

/// ETA label used when the engine did not report one.
pub const DEFAULT_ETA_LABEL: &str = "N/A";

/// Terminal colour/control sequences some engines embed in their labels.
#[allow(clippy::expect_used)]
static ANSI_ESCAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\x1b\[[0-9;?]*[A-Za-z]").expect("ANSI regex is valid") // Static pattern, safe to panic
});

/// Stage of a single job's transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Bytes are being transferred.
    Downloading,
    /// Streams are downloaded; merging/post-processing is running.
    Merging,
    /// The job completed.
    Finished,
}

impl Phase {
    /// Returns the stable string label.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Downloading => "downloading",
            Self::Merging => "merging",
            Self::Finished => "finished",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A normalized progress record for one job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressEvent {
    /// Current stage.
    pub phase: Phase,
    /// Completion in `[0, 100]`.
    pub percent: f64,
    /// Human-readable transfer rate, e.g. `"1.21MiB/s"`.
    pub rate_label: String,
    /// Human-readable time remaining, e.g. `"00:42"`.
    pub eta_label: String,
}

impl ProgressEvent {
    fn at_full(phase: Phase) -> Self {
        Self {
            phase,
            percent: 100.0,
            rate_label: String::new(),
            eta_label: String::new(),
        }
    }
}

impl fmt::Display for ProgressEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.phase {
            Phase::Downloading => write!(
                f,
                "{:.1}% at {} ETA {}",
                self.percent, self.rate_label, self.eta_label
            ),
            Phase::Merging => write!(f, "Download finished. Processing..."),
            Phase::Finished => write!(f, "Done"),
        }
    }
}

/// Per-job translator from raw engine statuses to [`ProgressEvent`]s.
///
/// Holds the job's high-water percent, so one instance must never be shared
/// between jobs.
#[derive(Debug, Default)]
pub struct ProgressTranslator {
    high_water: f64,
}

impl ProgressTranslator {
    /// Creates a translator starting at 0%.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the highest percent reported so far.
    #[must_use]
    pub fn percent(&self) -> f64 {
        self.high_water
    }

    /// Translates one raw status. Unknown status kinds yield `None`.
    pub fn on_raw(&mut self, raw: &RawStatus) -> Option<ProgressEvent> {
        match raw.status()? {
            "downloading" => {
                let reported = raw
                    .str_field("_percent_str")
                    .and_then(parse_percent_str)
                    .or_else(|| percent_from_bytes(raw))
                    .unwrap_or(0.0);
                let percent = self.advance(reported);
                Some(ProgressEvent {
                    phase: Phase::Downloading,
                    percent,
                    rate_label: label(raw, "_speed_str", DEFAULT_RATE_LABEL),
                    eta_label: label(raw, "_eta_str", DEFAULT_ETA_LABEL),
                })
            }
            "finished" => {
                self.high_water = 100.0;
                Some(ProgressEvent::at_full(Phase::Merging))
            }
            other => {
                trace!(status = other, "ignoring unrecognized engine status");
                None
            }
        }
    }

    /// Produces the terminal event for a job that completed successfully.
    pub fn finish(&mut self) -> ProgressEvent {
        self.high_water = 100.0;
        ProgressEvent::at_full(Phase::Finished)
    }

    fn advance(&mut self, reported: f64) -> f64 {
        if reported > self.high_water {
            self.high_water = reported;
        }
        self.high_water
    }
}

/// Parses an engine percent label such as `" 45.2%"` into `[0, 100]`.
///
/// Malformed input reads as 0.
#[must_use]
pub fn parse_percent(text: &str) -> f64 {
    parse_percent_str(text).unwrap_or(0.0)
}

fn parse_percent_str(text: &str) -> Option<f64> {
    let cleaned = ANSI_ESCAPE.replace_all(text, "");
    let number = cleaned.trim().trim_end_matches('%').trim();
    let value = number.parse::<f64>().ok()?;
    if value.is_finite() {
        Some(value.clamp(0.0, 100.0))
    } else {
        None
    }
}

#[allow(clippy::cast_precision_loss)]
fn percent_from_bytes(raw: &RawStatus) -> Option<f64> {
    let downloaded = raw.number_field("downloaded_bytes")?;
    let total = raw
        .number_field("total_bytes")
        .filter(|total| *total > 0.0)
        .or_else(|| raw.number_field("total_bytes_estimate"))
        .filter(|total| *total > 0.0)?;
    let percent = downloaded / total * 100.0;
    percent.is_finite().then(|| percent.clamp(0.0, 100.0))
}

fn label(raw: &RawStatus, key: &str, default: &str) -> String {
    raw.str_field(key)
        .map(|value| ANSI_ESCAPE.replace_all(value, "").trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| default.to_string())
}
