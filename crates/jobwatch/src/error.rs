//! Error types for session tracking.

use thiserror::Error;

/// Tracker-specific errors.
#[derive(Error, Debug)]
pub enum TrackerError {
    /// Registry insert for an identifier that is already present. A caller
    /// bug; fatal to the session.
    #[error("job {0} is already registered")]
    DuplicateJob(String),

    /// Registry remove for an identifier that is not present. Benign when it
    /// reflects the race between timeout cleanup and a late terminal event.
    #[error("job {0} is not registered")]
    UnknownJob(String),

    /// The execution engine rejected a submission; fatal to the session.
    #[error("job submission failed: {0}")]
    Submission(anyhow::Error),

    /// A blocking wait was cancelled externally.
    #[error("wait interrupted: {0}")]
    Interrupted(String),
}

/// Result type for tracker operations.
pub type Result<T> = std::result::Result<T, TrackerError>;
