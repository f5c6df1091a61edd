//! HubContext - what a worker callback can do to the hub
//!
//! Callbacks fire while the store is pumping events, so they cannot borrow
//! the `SharedStore` itself. Instead each callback gets a `HubContext`:
//! reads see the store as it was when the event arrived, and requested
//! changes are queued and applied, in order, as soon as the callback
//! returns.

use crate::hire::HireConfig;
use std::fmt;
use workshare_core::{Key, Store, Value, WorkerId};
use workshare_replica::{WorkerContext, WorkerResult};

pub(crate) type BoxedEntry = Box<dyn FnOnce(WorkerContext) -> WorkerResult + Send>;

/// A change requested from inside a callback
pub(crate) enum Effect {
    Set(Key, Value),
    Delete(Key),
    Post(WorkerId, Value),
    PostAll(Value),
    Hire(BoxedEntry, HireConfig),
    Terminate(WorkerId),
}

impl fmt::Debug for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Effect::Set(key, value) => f.debug_tuple("Set").field(key).field(value).finish(),
            Effect::Delete(key) => f.debug_tuple("Delete").field(key).finish(),
            Effect::Post(id, value) => f.debug_tuple("Post").field(id).field(value).finish(),
            Effect::PostAll(value) => f.debug_tuple("PostAll").field(value).finish(),
            Effect::Hire(_, config) => f.debug_tuple("Hire").field(config).finish(),
            Effect::Terminate(id) => f.debug_tuple("Terminate").field(id).finish(),
        }
    }
}

/// Handle on the hub passed to every worker callback
///
/// # Example
///
/// ```
/// use workshare_hub::HireConfig;
///
/// // Answer every message from the worker
/// let config = HireConfig::new().on_message(|hub, msg| {
///     let reply = hub.worker();
///     hub.post(reply, format!("got {}", msg));
/// });
/// ```
pub struct HubContext<'a> {
    worker: WorkerId,
    data: &'a Store,
    effects: Vec<Effect>,
}

impl<'a> HubContext<'a> {
    pub(crate) fn new(worker: WorkerId, data: &'a Store) -> Self {
        Self {
            worker,
            data,
            effects: Vec::new(),
        }
    }

    /// The worker whose event is being handled
    ///
    /// For the aggregate-completion callback this is the worker whose exit
    /// brought the active count to zero.
    pub fn worker(&self) -> WorkerId {
        self.worker
    }

    /// The hub's store as of this event (queued changes not included)
    pub fn data(&self) -> &Store {
        self.data
    }

    /// Get a value as of this event
    pub fn get(&self, key: impl Into<Key>) -> Option<&Value> {
        self.data.get(key)
    }

    /// Queue a [`SharedStore::set`](crate::SharedStore::set)
    pub fn set(&mut self, key: impl Into<Key>, value: impl Into<Value>) {
        self.effects.push(Effect::Set(key.into(), value.into()));
    }

    /// Queue a [`SharedStore::delete`](crate::SharedStore::delete)
    pub fn delete(&mut self, key: impl Into<Key>) {
        self.effects.push(Effect::Delete(key.into()));
    }

    /// Queue an application message to one worker
    ///
    /// Delivery failures (worker gone, reserved tag) are logged when the
    /// queue is applied.
    pub fn post(&mut self, id: WorkerId, value: impl Into<Value>) {
        self.effects.push(Effect::Post(id, value.into()));
    }

    /// Queue an application message to every live worker
    pub fn post_all(&mut self, value: impl Into<Value>) {
        self.effects.push(Effect::PostAll(value.into()));
    }

    /// Queue a new hire
    ///
    /// The worker starts from the store as it is once every change queued
    /// before it has been applied.
    pub fn hire<F>(&mut self, entry: F, config: HireConfig)
    where
        F: FnOnce(WorkerContext) -> WorkerResult + Send + 'static,
    {
        self.effects.push(Effect::Hire(Box::new(entry), config));
    }

    /// Queue closing a worker's inbound channel
    pub fn terminate(&mut self, id: WorkerId) {
        self.effects.push(Effect::Terminate(id));
    }

    pub(crate) fn into_effects(self) -> Vec<Effect> {
        self.effects
    }
}

impl fmt::Debug for HubContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HubContext")
            .field("worker", &self.worker)
            .field("entries", &self.data.len())
            .field("effects", &self.effects)
            .finish()
    }
}
