//! Thread-safe registry of outstanding jobs.

use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::error::{Result, TrackerError};
use crate::job::TrackedJob;

/// Maps job identifiers to their handles for the lifetime of one session.
///
/// An identifier is present exactly while its terminal event has not yet been
/// observed by the watchdog. All operations take the same lock, so no caller
/// can observe a partial insert or remove.
#[derive(Debug, Default)]
pub struct JobRegistry {
    jobs: RwLock<HashMap<String, TrackedJob>>,
}

impl JobRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a newly submitted job.
    ///
    /// Fails with [`TrackerError::DuplicateJob`] if the identifier is already
    /// present, leaving the registry unchanged.
    pub async fn insert(&self, job: TrackedJob) -> Result<()> {
        let mut jobs = self.jobs.write().await;
        if jobs.contains_key(&job.job_id) {
            return Err(TrackerError::DuplicateJob(job.job_id.clone()));
        }
        jobs.insert(job.job_id.clone(), job);
        Ok(())
    }

    /// Remove a job after its terminal event, returning its handle.
    ///
    /// Fails with [`TrackerError::UnknownJob`] if the identifier is absent.
    pub async fn remove(&self, job_id: &str) -> Result<TrackedJob> {
        self.jobs
            .write()
            .await
            .remove(job_id)
            .ok_or_else(|| TrackerError::UnknownJob(job_id.to_string()))
    }

    /// Whether any job is still outstanding.
    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }

    /// Number of outstanding jobs.
    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    /// Identifiers of all outstanding jobs, in arbitrary order.
    ///
    /// A point-in-time copy for diagnostic reporting; the registry may change
    /// as soon as the lock is released.
    pub async fn snapshot_ids(&self) -> Vec<String> {
        self.jobs.read().await.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn insert_and_remove() {
        let registry = JobRegistry::new();
        registry
            .insert(TrackedJob::new("a"))
            .await
            .expect("insert should succeed");
        assert_eq!(registry.len().await, 1);

        let job = registry.remove("a").await.expect("remove should succeed");
        assert_eq!(job.job_id, "a");
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn duplicate_insert_fails_and_leaves_registry_unchanged() {
        let registry = JobRegistry::new();
        let original = TrackedJob::new("a").with_label("first");
        registry
            .insert(original.clone())
            .await
            .expect("insert should succeed");

        let error = registry
            .insert(TrackedJob::new("a").with_label("second"))
            .await
            .expect_err("duplicate insert should fail");
        assert!(matches!(error, TrackerError::DuplicateJob(id) if id == "a"));

        assert_eq!(registry.len().await, 1);
        let kept = registry.remove("a").await.expect("remove should succeed");
        assert_eq!(kept, original);
    }

    #[tokio::test]
    async fn remove_unknown_fails() {
        let registry = JobRegistry::new();
        let error = registry
            .remove("missing")
            .await
            .expect_err("remove of absent id should fail");
        assert!(matches!(error, TrackerError::UnknownJob(id) if id == "missing"));
    }

    #[tokio::test]
    async fn snapshot_lists_all_outstanding_ids() {
        let registry = JobRegistry::new();
        for id in ["a", "b", "c"] {
            registry
                .insert(TrackedJob::new(id))
                .await
                .expect("insert should succeed");
        }

        let mut ids = registry.snapshot_ids().await;
        ids.sort();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }
}
