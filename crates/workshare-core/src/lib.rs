//! Workshare Core - Shared types for hub/worker state replication
//!
//! This crate provides everything both sides of a replication link agree on:
//! - Keys and dynamic values (`Key`, `Value`, `ValueMap`)
//! - The replicated key/value `Store`
//! - The wire contract (`Message`, `Envelope`) and its JSON codec
//! - The spawn-time `Snapshot` codec
//! - Channel primitives connecting the hub to one worker
//! - `ShareConfig`, passed explicitly to every store and registry
//!
//! ## Protocol Shape
//!
//! ```text
//! Hub (SharedStore)                      Worker (ReplicaStore)
//!  │  set/delete ──▶ Message ──────────────▶ apply directly (no echo)
//!  │
//!  │  apply via set/delete ◀── Message ◀──── set/delete
//!  └─ rebroadcast to all, sender included ─▶ apply directly (loop ends)
//! ```
//!
//! The hub and worker crates build on these types; this crate does NOT know
//! about threads or registries.

pub mod channel;
mod config;
mod error;
mod key;
pub mod message;
mod snapshot;
mod store;
mod value;

pub use channel::{EventSender, Frame, HubLink, Lifecycle, WorkerEvent, WorkerFailure, WorkerId, WorkerLink};
pub use config::ShareConfig;
pub use error::{Error, Result};
pub use key::Key;
pub use message::{Envelope, Message, PROTOCOL_TAG};
pub use snapshot::Snapshot;
pub use store::Store;
pub use value::{Value, ValueMap};

// Re-export for callers building map values
pub use indexmap::IndexMap;
