//! Workshare Hub - authoritative shared state for a pool of worker threads
//!
//! The hub owns a [`SharedStore`]. Hiring a worker spawns a thread that
//! starts from a snapshot of the store and keeps a [`ReplicaStore`] in sync
//! with it:
//!
//! ```text
//!  SharedStore::set ──▶ broadcast ──▶ every live ReplicaStore
//!  ReplicaStore::set ──▶ hub ──▶ SharedStore::set ──▶ broadcast (sender too)
//! ```
//!
//! The hub is single-threaded. Worker events queue up in the hub's inbox
//! and are handled, callbacks included, when the owner pumps the store.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use workshare_hub::{HireConfig, ReplicaStore, SharedStore};
//!
//! let mut data = SharedStore::new();
//! data.set("greeting", "hello");
//!
//! let config = HireConfig::new()
//!     .input(2)
//!     .on_message(|hub, msg| {
//!         println!("worker says {}", msg);
//!         hub.post_all("thanks");
//!     });
//!
//! data.hire(
//!     |ctx| {
//!         let mut data = ReplicaStore::receive(ctx)?;
//!         let factor = data.input().and_then(|v| v.as_int()).unwrap_or(1);
//!         data.set("answer", 21 * factor);
//!         data.post("done")?;
//!         Ok(0)
//!     },
//!     config,
//! )
//! .unwrap();
//!
//! assert!(data.wait_for_workers(Duration::from_secs(10)));
//! assert_eq!(data.get("answer").and_then(|v| v.as_int()), Some(42));
//! ```

mod error;
mod hire;
mod hub;
mod registry;
mod shared;
mod spawn;

pub use error::{Error, Result};
pub use hire::HireConfig;
pub use hub::HubContext;
pub use registry::{WorkerInfo, WorkerRegistry};
pub use shared::SharedStore;
pub use spawn::FAILURE_EXIT_CODE;

// Re-export the types callers need on both sides of a link
pub use workshare_core::{Key, Message, ShareConfig, Store, Value, ValueMap, WorkerFailure, WorkerId};
pub use workshare_replica::{ReplicaStore, WorkerContext, WorkerResult};
