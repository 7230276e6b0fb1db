//! Inactivity-driven completion tracking for asynchronous job submissions.
//!
//! An external execution engine accepts jobs and reports progress through a
//! callback invoked on arbitrary threads. Nothing ever says "all done": this
//! crate decides, from the absence of progress over a bounded window, when no
//! further events will arrive so a waiting caller can stop and release the
//! connection.
//!
//! Flow: [`SessionDriver`] submits jobs through a [`JobSubmitter`] and records
//! each handle in the [`JobRegistry`]; the engine delivers [`ProgressEvent`]s
//! into the [`QueueListener`], which forwards them onto an unbounded channel;
//! the [`InactivityWatchdog`] drains that channel, removes jobs on terminal
//! events, and declares the session finished once a full countdown window
//! passes with no activity.

mod channel;
mod error;
mod event;
mod job;
mod listener;
mod registry;
mod session;
mod watchdog;

pub use channel::{EventReceiver, EventSender, event_channel};
pub use error::{Result, TrackerError};
pub use event::{JobEventKind, JobStatusCode, ProgressEvent};
pub use job::TrackedJob;
pub use listener::{JobListener, QueueListener};
pub use registry::JobRegistry;
pub use session::{CancelToken, JobSubmitter, SessionConfig, SessionDriver};
pub use watchdog::{CountdownPolicy, DrainOutcome, InactivityWatchdog, WatchdogHandle};
