//! Channel primitives between the hub and one worker
//!
//! ```text
//!            WorkerLink ── Frame ──────────────▶ HubLink (worker side)
//! hub inbox ◀── (WorkerId, WorkerEvent) ──────── HubLink / Lifecycle
//! ```
//!
//! Every worker gets its own inbound frame channel. All workers share the
//! hub's inbox; each event is tagged with the sending worker's id. Delivery
//! per worker is reliable and ordered (std `mpsc`); nothing is ordered across
//! workers.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::time::Duration;

/// A serialized envelope (see [`crate::Envelope`])
pub type Frame = Vec<u8>;

/// Stable identifier for a worker slot in the hub's registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorkerId(pub usize);

impl std::fmt::Display for WorkerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Worker({})", self.0)
    }
}

/// An error raised while a worker was running
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct WorkerFailure {
    /// Human-readable description
    pub message: String,
}

impl WorkerFailure {
    /// Create a failure from any message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Everything a worker can tell the hub
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerEvent {
    /// The worker thread started
    Online,
    /// A frame from the worker (protocol or application)
    Frame(Frame),
    /// The worker's entry point failed or panicked
    Failed(WorkerFailure),
    /// The worker finished with this exit code
    Exited(i32),
}

/// Sender side of the hub's inbox
pub type EventSender = Sender<(WorkerId, WorkerEvent)>;

/// Hub-side handle on one worker's inbound channel
#[derive(Debug)]
pub struct WorkerLink {
    tx: Sender<Frame>,
}

impl WorkerLink {
    /// Send a frame to the worker
    ///
    /// Fails with [`Error::Disconnected`] once the worker has dropped its end.
    pub fn send(&self, frame: Frame) -> Result<()> {
        self.tx.send(frame).map_err(|_| Error::Disconnected)
    }
}

/// Worker-side endpoint: receives hub frames, sends events to the hub
#[derive(Debug)]
pub struct HubLink {
    id: WorkerId,
    events: EventSender,
    rx: Receiver<Frame>,
}

impl HubLink {
    /// The worker this link belongs to
    pub fn id(&self) -> WorkerId {
        self.id
    }

    /// Send a frame to the hub
    pub fn send(&self, frame: Frame) -> Result<()> {
        self.events
            .send((self.id, WorkerEvent::Frame(frame)))
            .map_err(|_| Error::Disconnected)
    }

    /// Receive a frame without blocking
    ///
    /// Returns `Ok(None)` when nothing is pending and
    /// [`Error::Disconnected`] once the hub closed the channel and every
    /// pending frame has been read.
    pub fn try_recv(&self) -> Result<Option<Frame>> {
        match self.rx.try_recv() {
            Ok(frame) => Ok(Some(frame)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(Error::Disconnected),
        }
    }

    /// Receive a frame, waiting at most `timeout`
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Option<Frame>> {
        match self.rx.recv_timeout(timeout) {
            Ok(frame) => Ok(Some(frame)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(Error::Disconnected),
        }
    }

    /// Lifecycle notifier sharing this link's ordered event stream
    pub fn lifecycle(&self) -> Lifecycle {
        Lifecycle {
            id: self.id,
            events: self.events.clone(),
        }
    }
}

/// Reports a worker's lifecycle to the hub
///
/// Used by the spawn primitive around a worker's entry point. Events go out
/// on the same sender as the worker's frames, so `Exited` is always seen
/// after everything the worker sent before finishing. Send failures mean the
/// hub is gone and are ignored.
#[derive(Debug, Clone)]
pub struct Lifecycle {
    id: WorkerId,
    events: EventSender,
}

impl Lifecycle {
    /// The worker thread is running
    pub fn online(&self) {
        let _ = self.events.send((self.id, WorkerEvent::Online));
    }

    /// The worker's entry point failed
    pub fn failed(&self, failure: WorkerFailure) {
        let _ = self.events.send((self.id, WorkerEvent::Failed(failure)));
    }

    /// The worker finished
    pub fn exited(&self, code: i32) {
        let _ = self.events.send((self.id, WorkerEvent::Exited(code)));
    }
}

/// Create the hub inbox shared by all workers
pub fn inbox() -> (EventSender, Receiver<(WorkerId, WorkerEvent)>) {
    mpsc::channel()
}

/// Create the channel pair for one worker
///
/// `events` is a clone of the hub inbox sender.
pub fn pair(id: WorkerId, events: EventSender) -> (WorkerLink, HubLink) {
    let (tx, rx) = mpsc::channel();
    (WorkerLink { tx }, HubLink { id, events, rx })
}
