//! Inactivity watchdog: drains progress events and owns the shutdown decision.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::channel::EventReceiver;
use crate::error::{Result, TrackerError};
use crate::event::{JobEventKind, ProgressEvent};
use crate::registry::JobRegistry;

/// Shutdown policy: the total idle budget split into short polls.
///
/// One long timeout mistakes a slow engine for completion; one short timeout
/// shuts down on a normal inter-event gap. Polling `retries` times for
/// `poll_interval` each, resetting on every event, gives an *inactivity*
/// timeout whose worst-case shutdown latency after the last real event is one
/// full window. Tests tune this down to milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountdownPolicy {
    /// Bounded wait per poll.
    pub poll_interval: Duration,
    /// Number of consecutive empty polls before shutdown.
    pub retries: u32,
}

impl Default for CountdownPolicy {
    fn default() -> Self {
        // 5 s x 12: at most one minute of waiting.
        Self {
            poll_interval: Duration::from_secs(5),
            retries: 12,
        }
    }
}

impl CountdownPolicy {
    /// Total idle time tolerated before shutdown.
    #[must_use]
    pub fn window(&self) -> Duration {
        self.poll_interval.saturating_mul(self.retries)
    }

    fn clamped(mut self) -> Self {
        self.poll_interval = self.poll_interval.max(Duration::from_millis(1));
        self.retries = self.retries.max(1);
        self
    }
}

/// Summary returned by the watchdog task when it stops.
#[derive(Debug, Clone)]
pub struct DrainOutcome {
    /// Every registered job saw its terminal event.
    pub drained_all: bool,
    /// Identifiers still registered at shutdown.
    pub unfinished: Vec<String>,
    /// The loop stopped because of external cancellation, not inactivity.
    pub cancelled: bool,
}

/// Handle to a spawned watchdog.
pub struct WatchdogHandle {
    finished: watch::Receiver<bool>,
    task: JoinHandle<DrainOutcome>,
}

impl WatchdogHandle {
    /// Receiver for the monotonic finished flag; flips to `true` exactly once.
    #[must_use]
    pub fn finished_flag(&self) -> watch::Receiver<bool> {
        self.finished.clone()
    }

    /// Whether the watchdog has already declared the session finished.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        *self.finished.borrow()
    }

    /// Wait for the loop to stop and return its outcome.
    pub async fn join(self) -> Result<DrainOutcome> {
        self.task
            .await
            .map_err(|error| TrackerError::Interrupted(error.to_string()))
    }
}

/// Consumer loop deciding when no further progress will arrive.
///
/// States are `LISTENING` and (terminal) `FINISHED`. While listening, the
/// loop polls the event channel; any event resets the countdown, a terminal
/// event also removes its job from the registry. Countdown exhaustion or
/// cancellation enters `FINISHED`: one diagnostic sweep of the registry, the
/// channel is cleared, and the finished flag is set.
pub struct InactivityWatchdog {
    registry: Arc<JobRegistry>,
    events: EventReceiver,
    policy: CountdownPolicy,
    finished: watch::Sender<bool>,
    cancel: watch::Receiver<bool>,
}

enum Polled {
    Event(ProgressEvent),
    Exhausted,
    Cancelled,
}

impl InactivityWatchdog {
    /// Start the drain loop on a background task.
    ///
    /// Must run before the first submission so an early terminal event cannot
    /// be missed; the caller keeps the registry and the channel's sender.
    pub fn spawn(
        registry: Arc<JobRegistry>,
        events: EventReceiver,
        policy: CountdownPolicy,
        cancel: watch::Receiver<bool>,
    ) -> WatchdogHandle {
        let (finished_tx, finished_rx) = watch::channel(false);
        let watchdog = Self {
            registry,
            events,
            policy: policy.clamped(),
            finished: finished_tx,
            cancel,
        };
        let task = tokio::spawn(watchdog.run());
        WatchdogHandle {
            finished: finished_rx,
            task,
        }
    }

    async fn run(mut self) -> DrainOutcome {
        tracing::debug!(
            poll_interval = ?self.policy.poll_interval,
            retries = self.policy.retries,
            "watchdog listening"
        );

        let mut cancelled = false;
        loop {
            match self.next_event().await {
                Polled::Event(event) => self.process(event).await,
                Polled::Exhausted => {
                    tracing::info!(
                        window = ?self.policy.window(),
                        "no activity within the countdown window; shutting down"
                    );
                    break;
                }
                Polled::Cancelled => {
                    tracing::info!("watchdog cancelled; shutting down");
                    cancelled = true;
                    break;
                }
            }
        }

        self.finish(cancelled).await
    }

    /// One full countdown cycle: up to `retries` polls, fresh budget.
    async fn next_event(&mut self) -> Polled {
        for attempt in 0..self.policy.retries {
            let polled = tokio::select! {
                polled = self.events.recv_timeout(self.policy.poll_interval) => polled,
                () = await_cancel(&mut self.cancel) => return Polled::Cancelled,
            };
            if let Some(event) = polled {
                return Polled::Event(event);
            }
            let remaining = self
                .policy
                .poll_interval
                .saturating_mul(self.policy.retries - attempt - 1);
            if remaining > Duration::ZERO {
                tracing::debug!(remaining = ?remaining, "countdown to shutdown");
            }
        }
        Polled::Exhausted
    }

    async fn process(&self, event: ProgressEvent) {
        match &event.kind {
            JobEventKind::JobEnded => match self.registry.remove(&event.job_id).await {
                Ok(job) => {
                    let outstanding = self.registry.len().await;
                    tracing::info!(
                        job_id = %event.job_id,
                        status = %event.status,
                        label = job.label.as_deref().unwrap_or_default(),
                        outstanding,
                        "job ended; removed from registry"
                    );
                }
                Err(error) => {
                    // Benign race: timeout cleanup vs. late terminal event.
                    tracing::warn!(job_id = %event.job_id, %error, "terminal event for unregistered job; ignoring");
                }
            },
            JobEventKind::JobStarted | JobEventKind::JobProgress => {
                tracing::debug!(job_id = %event.job_id, status = %event.status, "job progress");
            }
            JobEventKind::Other(kind) => {
                tracing::trace!(job_id = %event.job_id, kind = %kind, "ignoring unrecognized event kind");
            }
        }
    }

    async fn finish(mut self, cancelled: bool) -> DrainOutcome {
        let unfinished = self.registry.snapshot_ids().await;
        for job_id in &unfinished {
            tracing::warn!(job_id = %job_id, "job did not finish before timeout");
        }
        self.events.clear();

        // Monotonic: only ever flips false -> true.
        let _ = self.finished.send(true);

        DrainOutcome {
            drained_all: unfinished.is_empty(),
            unfinished,
            cancelled,
        }
    }
}

/// Resolves only on real cancellation; a dropped sender means cancellation
/// can no longer happen, so the future stays pending forever.
async fn await_cancel(cancel: &mut watch::Receiver<bool>) {
    loop {
        if *cancel.borrow() {
            return;
        }
        if cancel.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_clamps_to_sane_minimums() {
        let policy = CountdownPolicy {
            poll_interval: Duration::ZERO,
            retries: 0,
        }
        .clamped();
        assert_eq!(policy.poll_interval, Duration::from_millis(1));
        assert_eq!(policy.retries, 1);
    }

    #[test]
    fn window_is_interval_times_retries() {
        let policy = CountdownPolicy::default();
        assert_eq!(policy.window(), Duration::from_secs(60));
    }
}
