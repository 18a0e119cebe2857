//! Pull-job progress tracking and notification engine.
//!
//! Tracks the lifecycle of long-running pull jobs (fetching a large artifact
//! such as a container image) and fans out live
//! [`ProgressEvent`](types::types::ProgressEvent)s to any
//! number of observers, including observers that disconnect and reattach.
//!
//! Building blocks:
//!
//! - [`job::registry::JobRegistry`]: process-wide table of active jobs;
//!   owns creation, lookup and retirement, and receives the raw
//!   `"State:percent"` signals from the fetch mechanism.
//! - [`job::state_machine::JobStateMachine`]: per-job state and transition
//!   logic (`Idle → Downloading → Extracting → Complete | Failure`).
//! - [`progress::channel::NotificationChannel`]: per-job broadcast of
//!   progress events with ordered delivery to every subscriber.
//! - [`session::observer_session::ObserverSession`]: one observer's view,
//!   starts pulls, resubscribes on reattach from its durable manifest, and
//!   dispatches events to a [`progress::observer::PullObserver`].
//!
//! The actual artifact fetcher and any rendering layer are external
//! collaborators; this crate only deals in job ids, categories and states.

pub mod job;
pub mod progress;
pub mod session;
pub mod types;
