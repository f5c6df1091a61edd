//! Error types for workshare-hub

use thiserror::Error;
use workshare_core::WorkerId;

/// Result type for workshare-hub operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in workshare-hub
///
/// Only explicit requests addressed to one worker (hire, post, terminate)
/// return errors. Replication itself never does: broadcast failures are
/// logged and dropped.
#[derive(Debug, Error)]
pub enum Error {
    /// The worker thread could not be started
    #[error("failed to spawn worker: {0}")]
    Spawn(#[from] std::io::Error),

    /// No worker was ever hired into this slot
    #[error("{0} is not a registered worker")]
    UnknownWorker(WorkerId),

    /// The worker has exited or its channel was closed
    #[error("{0} is no longer reachable")]
    WorkerGone(WorkerId),

    /// Core error
    #[error("core error: {0}")]
    Core(#[from] workshare_core::Error),
}

