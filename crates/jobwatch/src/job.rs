//! Handle for one submitted job.

use serde::{Deserialize, Serialize};

/// Lightweight handle for a job accepted by the execution engine.
///
/// Created at submission time and never mutated afterwards; only its
/// membership in the [`crate::JobRegistry`] changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[must_use]
pub struct TrackedJob {
    /// Engine-assigned identifier, unique per submission.
    pub job_id: String,
    /// Optional caller-supplied display label.
    pub label: Option<String>,
}

impl TrackedJob {
    /// Build a handle from the engine-assigned identifier.
    pub fn new(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            label: None,
        }
    }

    /// Attach a display label to this handle.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}
