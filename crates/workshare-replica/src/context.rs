//! WorkerContext - everything a spawned worker starts with

use workshare_core::{HubLink, Lifecycle, ShareConfig, Snapshot, Value, WorkerId};

/// Return type of a worker entry point
///
/// `Ok(code)` is reported to the hub as the exit code. An error is reported
/// through the hub's `on_error` callback and the worker exits with code 1.
pub type WorkerResult = std::result::Result<i32, Box<dyn std::error::Error + Send + Sync>>;

/// The initial state handed to a worker when it is hired
///
/// Holds the spawn-time snapshot, the hire input, the configuration the hub
/// was built with, and the worker's end of its channel. Nothing in here is
/// shared with the hub's memory.
#[derive(Debug)]
pub struct WorkerContext {
    snapshot: Snapshot,
    link: HubLink,
    config: ShareConfig,
}

impl WorkerContext {
    /// Bundle a snapshot and a channel endpoint
    pub fn new(snapshot: Snapshot, link: HubLink, config: ShareConfig) -> Self {
        Self {
            snapshot,
            link,
            config,
        }
    }

    /// This worker's registry slot
    pub fn id(&self) -> WorkerId {
        self.link.id()
    }

    /// The hire-time input payload
    pub fn input(&self) -> Option<&Value> {
        self.snapshot.input()
    }

    /// The spawn-time snapshot
    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// Configuration inherited from the hub
    pub fn config(&self) -> &ShareConfig {
        &self.config
    }

    /// Lifecycle notifier for this worker (used by the spawner)
    pub fn lifecycle(&self) -> Lifecycle {
        self.link.lifecycle()
    }

    pub(crate) fn into_parts(self) -> (Snapshot, HubLink, ShareConfig) {
        (self.snapshot, self.link, self.config)
    }
}
