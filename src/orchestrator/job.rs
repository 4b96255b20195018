//! Per-item job state.

use std::fmt;

use serde::Serialize;

use crate::queue::DownloadRequest;

/// Lifecycle of a single job. `Succeeded` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Queued, not started.
    Pending,
    /// The engine is working on it.
    Running,
    /// Downloaded.
    Succeeded,
    /// The engine reported a failure.
    Failed,
}

impl JobStatus {
    /// Returns true for `Succeeded` and `Failed`.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        };
        write!(f, "{label}")
    }
}

/// One request within a batch, with its fixed 1-based position.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadJob {
    request: DownloadRequest,
    index: usize,
    status: JobStatus,
    error: Option<String>,
}

impl DownloadJob {
    /// Creates a pending job.
    #[must_use]
    pub fn new(request: DownloadRequest, index: usize) -> Self {
        Self {
            request,
            index,
            status: JobStatus::Pending,
            error: None,
        }
    }

    /// Returns the request.
    #[must_use]
    pub fn request(&self) -> &DownloadRequest {
        &self.request
    }

    /// Returns the job URL.
    #[must_use]
    pub fn url(&self) -> &str {
        self.request.url()
    }

    /// Returns the 1-based position in the batch.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Returns the current status.
    #[must_use]
    pub fn status(&self) -> JobStatus {
        self.status
    }

    /// Returns the failure message of a failed job.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// `Pending -> Running`. Returns false if the job was not pending.
    pub(crate) fn start(&mut self) -> bool {
        if self.status != JobStatus::Pending {
            return false;
        }
        self.status = JobStatus::Running;
        true
    }

    /// `Running -> Succeeded`. Returns false if the job was not running.
    pub(crate) fn succeed(&mut self) -> bool {
        if self.status != JobStatus::Running {
            return false;
        }
        self.status = JobStatus::Succeeded;
        true
    }

    /// `Pending | Running -> Failed`. Terminal jobs are left unchanged.
    pub(crate) fn fail(&mut self, message: impl Into<String>) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = JobStatus::Failed;
        self.error = Some(message.into());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> DownloadJob {
        DownloadJob::new(DownloadRequest::new("http://x/1"), 1)
    }

    #[test]
    fn test_job_success_path() {
        let mut job = job();
        assert_eq!(job.status(), JobStatus::Pending);
        assert!(job.start());
        assert_eq!(job.status(), JobStatus::Running);
        assert!(job.succeed());
        assert_eq!(job.status(), JobStatus::Succeeded);
        assert!(job.error().is_none());
    }

    #[test]
    fn test_job_failure_records_message() {
        let mut job = job();
        job.start();
        assert!(job.fail("Video unavailable"));
        assert_eq!(job.status(), JobStatus::Failed);
        assert_eq!(job.error(), Some("Video unavailable"));
    }

    #[test]
    fn test_terminal_states_are_final() {
        let mut job = job();
        job.start();
        job.succeed();
        assert!(!job.fail("late"));
        assert!(!job.start());
        assert_eq!(job.status(), JobStatus::Succeeded);

        let mut failed = self::job();
        failed.start();
        failed.fail("boom");
        assert!(!failed.succeed());
        assert_eq!(failed.error(), Some("boom"));
    }

    #[test]
    fn test_succeed_requires_running() {
        let mut job = job();
        assert!(!job.succeed());
        assert_eq!(job.status(), JobStatus::Pending);
    }
}
