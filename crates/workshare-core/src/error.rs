//! Error types for workshare-core

use thiserror::Error;

/// Core error type
#[derive(Error, Debug)]
pub enum Error {
    /// A payload could not be serialized for the wire
    #[error("Encode error: {0}")]
    Encode(String),

    /// A frame is not valid JSON (or not a representable value)
    #[error("Decode error: {0}")]
    Decode(String),

    /// A frame carries the protocol tag but does not have the message shape
    #[error("Malformed protocol message: {0}")]
    MalformedProtocol(String),

    /// An application payload tried to use the protocol tag
    #[error("Application payload uses the reserved sender tag")]
    ReservedTag,

    /// A snapshot could not be restored
    #[error("Snapshot error: {0}")]
    Snapshot(String),

    /// The other end of the channel is gone
    #[error("Channel disconnected")]
    Disconnected,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("RON parse error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
