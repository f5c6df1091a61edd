//! Error types for workshare-replica

use thiserror::Error;

/// Replica error type
#[derive(Debug, Error)]
pub enum Error {
    /// Core error (snapshot restore, encoding, disconnected channel)
    #[error("core error: {0}")]
    Core(#[from] workshare_core::Error),
}

/// Result type for replica operations
pub type Result<T> = std::result::Result<T, Error>;
