//! Session driver: submit, register, and wait for the watchdog's verdict.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::channel::event_channel;
use crate::error::{Result, TrackerError};
use crate::job::TrackedJob;
use crate::listener::{JobListener, QueueListener};
use crate::registry::JobRegistry;
use crate::watchdog::{CountdownPolicy, InactivityWatchdog, WatchdogHandle};

/// Submission seam to the external execution engine.
///
/// `submit` hands the engine the listener it must invoke for every progress
/// event of the accepted job, and returns the engine-assigned handle. The
/// engine is expected not to emit progress before acknowledging the
/// submission; a violation surfaces as the benign unknown-job race in the
/// watchdog, not as a fatal error.
#[async_trait]
pub trait JobSubmitter: Send + Sync {
    /// Submit one job, obtaining its handle.
    async fn submit(&self, listener: Arc<dyn JobListener>) -> anyhow::Result<TrackedJob>;
}

/// Per-session configuration, passed by value. No process-wide state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Inactivity shutdown policy for the watchdog.
    pub countdown: CountdownPolicy,
}

/// Cancels the session: both the watchdog loop and the driver's wait observe
/// the same signal, so one call stops both.
#[derive(Debug, Clone)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelToken {
    fn new() -> (Self, watch::Receiver<bool>) {
        let (tx, rx) = watch::channel(false);
        (Self { tx: Arc::new(tx) }, rx)
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }

    /// Whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Runs one submission/listening session against an execution engine.
pub struct SessionDriver {
    config: SessionConfig,
    cancel: CancelToken,
    cancel_rx: watch::Receiver<bool>,
}

impl SessionDriver {
    /// Build a driver with an explicit per-session configuration.
    #[must_use]
    pub fn new(config: SessionConfig) -> Self {
        let (cancel, cancel_rx) = CancelToken::new();
        Self {
            config,
            cancel,
            cancel_rx,
        }
    }

    /// Token to cancel this driver's session from another task.
    #[must_use]
    pub fn cancel_handle(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Submit `count` jobs and block until the watchdog declares completion.
    ///
    /// The watchdog is listening before the first submission, so no terminal
    /// event can be missed. Returns `Ok(true)` once the session reaches its
    /// finished state; inactivity timeout with stragglers still counts as a
    /// finished session (a liveness decision, not a correctness failure).
    /// A submission failure stops the session and propagates as
    /// [`TrackerError::Submission`]; external cancellation surfaces as
    /// [`TrackerError::Interrupted`].
    pub async fn run(&self, submitter: &dyn JobSubmitter, count: usize) -> Result<bool> {
        let registry = Arc::new(JobRegistry::new());
        let (tx, rx) = event_channel();
        let handle = InactivityWatchdog::spawn(
            Arc::clone(&registry),
            rx,
            self.config.countdown,
            self.cancel_rx.clone(),
        );
        let listener: Arc<dyn JobListener> = Arc::new(QueueListener::new(tx));

        for seq in 1..=count {
            let job = match submitter.submit(Arc::clone(&listener)).await {
                Ok(job) => job,
                Err(error) => {
                    tracing::error!(submitted = seq - 1, total = count, %error, "submission failed; abandoning session");
                    return self.abort(handle, TrackerError::Submission(error)).await;
                }
            };
            tracing::info!(job_id = %job.job_id, submitted = seq, total = count, "job submitted");
            if let Err(error) = registry.insert(job).await {
                tracing::error!(%error, "could not register submitted job; abandoning session");
                return self.abort(handle, error).await;
            }
        }

        let mut finished = handle.finished_flag();
        while !*finished.borrow() {
            if finished.changed().await.is_err() {
                return Err(TrackerError::Interrupted(
                    "watchdog stopped before declaring the session finished".to_string(),
                ));
            }
        }

        let outcome = handle.join().await?;
        if outcome.cancelled {
            return Err(TrackerError::Interrupted("session cancelled".to_string()));
        }
        if !outcome.drained_all {
            tracing::warn!(
                unfinished = outcome.unfinished.len(),
                "session finished by inactivity timeout with jobs outstanding"
            );
        }
        Ok(true)
    }

    async fn abort(&self, handle: WatchdogHandle, error: TrackerError) -> Result<bool> {
        self.cancel.cancel();
        let _ = handle.join().await;
        Err(error)
    }
}
