//! Progress event model for job status notifications.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status reported by the execution engine for one job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatusCode {
    /// Accepted but not started.
    Queued,
    /// Executing on the engine.
    Running,
    /// Completed successfully.
    FinishedOk,
    /// Completed with an execution error.
    FinishedError,
    /// Aborted before completion.
    Aborted,
}

impl JobStatusCode {
    /// Whether this status reports a successful completion.
    #[must_use]
    pub fn is_success(self) -> bool {
        matches!(self, Self::FinishedOk)
    }
}

impl std::fmt::Display for JobStatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::FinishedOk => "finished_ok",
            Self::FinishedError => "finished_error",
            Self::Aborted => "aborted",
        };
        f.write_str(label)
    }
}

/// Kind of a progress notification.
///
/// The engine may emit kinds this crate does not know about; they are carried
/// as [`JobEventKind::Other`] so the delivery path never has to reject an
/// event shape, and the watchdog ignores them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobEventKind {
    /// The job began executing.
    JobStarted,
    /// Intermediate progress for a running job.
    JobProgress,
    /// Terminal: the job will produce no further events.
    JobEnded,
    /// Unrecognized kind, forwarded verbatim.
    Other(String),
}

/// One immutable progress notification for one job.
///
/// Produced at most once per real status change by the engine and consumed
/// exactly once by the watchdog. Events for the same job arrive in emission
/// order; no ordering is assumed across jobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// Identifier of the job this event describes.
    pub job_id: String,
    /// What happened.
    pub kind: JobEventKind,
    /// Job status at the time of the event.
    pub status: JobStatusCode,
    /// When this process first saw the event.
    pub received_at: DateTime<Utc>,
}

impl ProgressEvent {
    /// Build an event, stamping the receive time.
    pub fn new(job_id: impl Into<String>, kind: JobEventKind, status: JobStatusCode) -> Self {
        Self {
            job_id: job_id.into(),
            kind,
            status,
            received_at: Utc::now(),
        }
    }

    /// Build a terminal "job ended" event.
    pub fn ended(job_id: impl Into<String>, status: JobStatusCode) -> Self {
        Self::new(job_id, JobEventKind::JobEnded, status)
    }

    /// Whether this event means the job will produce no further events.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self.kind, JobEventKind::JobEnded)
    }
}

impl std::fmt::Display for ProgressEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}] {} {:?} ({})",
            self.received_at.format("%H:%M:%S"),
            self.job_id,
            self.kind,
            self.status
        )
    }
}
