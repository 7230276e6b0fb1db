//! Callback surface invoked by the execution engine.

use crate::channel::EventSender;
use crate::event::ProgressEvent;

/// Progress callback the engine invokes, potentially from many delivery
/// threads at once. Implementations must never block the caller.
pub trait JobListener: Send + Sync {
    /// Deliver one progress notification.
    fn on_progress(&self, event: ProgressEvent);
}

/// Listener that forwards every event onto the session's event channel.
///
/// Does exactly one non-blocking send per callback: no filtering (unknown
/// kinds are the watchdog's problem), no retained references, no panics.
#[derive(Debug, Clone)]
pub struct QueueListener {
    tx: EventSender,
}

impl QueueListener {
    /// Wrap the producer half of the session's event channel.
    #[must_use]
    pub fn new(tx: EventSender) -> Self {
        Self { tx }
    }
}

impl JobListener for QueueListener {
    fn on_progress(&self, event: ProgressEvent) {
        self.tx.send(event);
    }
}
