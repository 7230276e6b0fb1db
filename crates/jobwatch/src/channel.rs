//! Unbounded FIFO conduit between progress producers and the watchdog.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::time::Instant;

use crate::event::ProgressEvent;

/// Create the conduit: many cloneable senders, one receiver.
///
/// Capacity is unbounded so a send can never block an engine callback. A
/// producer much faster than the watchdog therefore grows the queue without
/// limit; acceptable for a session-scoped primitive whose producers are
/// throttled by real job execution.
#[must_use]
pub fn event_channel() -> (EventSender, EventReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EventSender { tx }, EventReceiver { rx })
}

/// Producer half; safe to share across any number of delivery threads.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: mpsc::UnboundedSender<ProgressEvent>,
}

impl EventSender {
    /// Enqueue one event without blocking.
    ///
    /// A closed channel means the session already tore down; the event is
    /// dropped silently because a producer must never observe an error.
    pub fn send(&self, event: ProgressEvent) {
        let _ = self.tx.send(event);
    }
}

/// Consumer half, held exclusively by the watchdog.
#[derive(Debug)]
pub struct EventReceiver {
    rx: mpsc::UnboundedReceiver<ProgressEvent>,
}

impl EventReceiver {
    /// Wait up to `wait` for the next event, `None` on timeout.
    ///
    /// An event sent concurrently with a timing-out wait is never lost: the
    /// cancelled receive leaves it queued for the next call. A closed channel
    /// with nothing queued still waits out the full `wait`; the countdown
    /// measures elapsed idle time, not channel state.
    pub async fn recv_timeout(&mut self, wait: Duration) -> Option<ProgressEvent> {
        let deadline = Instant::now() + wait;
        match tokio::time::timeout_at(deadline, self.rx.recv()).await {
            Ok(Some(event)) => Some(event),
            Ok(None) => {
                tokio::time::sleep_until(deadline).await;
                None
            }
            Err(_) => None,
        }
    }

    /// Discard everything currently queued. Session teardown only.
    pub fn clear(&mut self) {
        loop {
            match self.rx.try_recv() {
                Ok(_) => {}
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::JobStatusCode;

    #[tokio::test(start_paused = true)]
    async fn recv_times_out_on_empty_channel() {
        let (_tx, mut rx) = event_channel();
        let polled = rx.recv_timeout(Duration::from_secs(5)).await;
        assert!(polled.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn delivery_wakes_a_waiting_receiver() {
        let (tx, mut rx) = event_channel();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            tx.send(ProgressEvent::ended("a", JobStatusCode::FinishedOk));
        });

        let event = rx
            .recv_timeout(Duration::from_secs(5))
            .await
            .expect("event should arrive before the timeout");
        assert_eq!(event.job_id, "a");
    }

    #[tokio::test(start_paused = true)]
    async fn event_queued_after_timeout_is_not_lost() {
        let (tx, mut rx) = event_channel();
        assert!(rx.recv_timeout(Duration::from_millis(10)).await.is_none());

        tx.send(ProgressEvent::ended("a", JobStatusCode::Aborted));
        let event = rx
            .recv_timeout(Duration::from_millis(10))
            .await
            .expect("queued event should be delivered on the next receive");
        assert_eq!(event.job_id, "a");
    }

    #[tokio::test(start_paused = true)]
    async fn closed_channel_still_waits_out_the_full_timeout() {
        let (tx, mut rx) = event_channel();
        drop(tx);

        let started = Instant::now();
        assert!(rx.recv_timeout(Duration::from_secs(5)).await.is_none());
        assert!(
            started.elapsed() >= Duration::from_secs(5),
            "a closed channel must not shorten the bounded wait"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn queued_events_survive_sender_drop() {
        let (tx, mut rx) = event_channel();
        tx.send(ProgressEvent::ended("a", JobStatusCode::FinishedOk));
        drop(tx);

        let event = rx
            .recv_timeout(Duration::from_secs(5))
            .await
            .expect("queued event should be delivered after the sender is gone");
        assert_eq!(event.job_id, "a");

        // Nothing left: the next poll runs its full interval before giving up.
        let started = Instant::now();
        assert!(rx.recv_timeout(Duration::from_secs(5)).await.is_none());
        assert!(started.elapsed() >= Duration::from_secs(5));
    }

    #[tokio::test]
    async fn clear_discards_queued_events() {
        let (tx, mut rx) = event_channel();
        for id in ["a", "b", "c"] {
            tx.send(ProgressEvent::ended(id, JobStatusCode::FinishedOk));
        }

        rx.clear();
        assert!(rx.recv_timeout(Duration::from_millis(1)).await.is_none());
    }

    #[tokio::test]
    async fn fifo_order_is_preserved() {
        let (tx, mut rx) = event_channel();
        for id in ["a", "b", "c"] {
            tx.send(ProgressEvent::ended(id, JobStatusCode::FinishedOk));
        }

        for expected in ["a", "b", "c"] {
            let event = rx
                .recv_timeout(Duration::from_millis(1))
                .await
                .expect("queued event should be delivered");
            assert_eq!(event.job_id, expected);
        }
    }
}
