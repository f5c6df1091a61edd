//! Workshare Replica - the worker side of state replication
//!
//! A spawned worker receives a [`WorkerContext`] and turns it into a
//! [`ReplicaStore`]:
//!
//! ```rust,ignore
//! use workshare_replica::{ReplicaStore, WorkerContext, WorkerResult};
//!
//! fn entry(ctx: WorkerContext) -> WorkerResult {
//!     let mut data = ReplicaStore::receive(ctx)?
//!         .on_message(|msg| println!("from hub: {}", msg));
//!
//!     data.set("status", "started"); // replicated to the hub and every worker
//!     data.poll();                   // apply whatever the hub sent meanwhile
//!     Ok(0)
//! }
//! ```
//!
//! The replica never re-sends what it receives from the hub: inbound
//! messages bypass `set`/`delete`, which is what stops the hub's
//! rebroadcast from looping.

mod context;
mod error;
mod replica;

pub use context::{WorkerContext, WorkerResult};
pub use error::{Error, Result};
pub use replica::ReplicaStore;
