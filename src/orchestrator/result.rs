//! Batch outcome aggregation.

use serde::Serialize;

use super::{DownloadJob, JobStatus};

/// A failed job, kept so callers can retry the failed subset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobFailure {
    /// The job URL.
    pub url: String,
    /// The recorded failure.
    pub message: String,
}

/// Summary of a finished batch.
///
/// `total == succeeded + failed + skipped` always holds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchResult {
    /// Jobs in the batch (after deduplication).
    pub total: usize,
    /// Jobs that completed.
    pub succeeded: usize,
    /// Jobs that failed.
    pub failed: usize,
    /// Jobs never started because the batch was cancelled.
    pub skipped: usize,
    /// Input lines dropped as duplicates.
    pub duplicates_dropped: usize,
    /// Failures in job order.
    pub errors: Vec<JobFailure>,
}

impl BatchResult {
    /// Tallies final job states, in the order given.
    #[must_use]
    pub fn from_jobs<'a, I>(jobs: I) -> Self
    where
        I: IntoIterator<Item = &'a DownloadJob>,
    {
        let mut result = Self::default();
        for job in jobs {
            result.total += 1;
            match job.status() {
                JobStatus::Succeeded => result.succeeded += 1,
                JobStatus::Failed => {
                    result.failed += 1;
                    result.errors.push(JobFailure {
                        url: job.url().to_string(),
                        message: job.error().unwrap_or_default().to_string(),
                    });
                }
                JobStatus::Pending | JobStatus::Running => result.skipped += 1,
            }
        }
        result
    }

    /// Records how many duplicate lines were dropped when the queue was built.
    #[must_use]
    pub fn with_duplicates_dropped(mut self, count: usize) -> Self {
        self.duplicates_dropped = count;
        self
    }

    /// Returns true if no job failed or was skipped.
    #[must_use]
    pub fn is_complete_success(&self) -> bool {
        self.failed == 0 && self.skipped == 0
    }

    /// Returns true if at least one job ran and none of them succeeded.
    #[must_use]
    pub fn all_failed(&self) -> bool {
        self.failed > 0 && self.succeeded == 0
    }

    /// Returns the failed URLs in job order.
    pub fn failed_urls(&self) -> impl Iterator<Item = &str> {
        self.errors.iter().map(|failure| failure.url.as_str())
    }
}
