//! SharedStore - the authoritative store living on the hub
//!
//! Every mutation, local or arriving from a worker, goes through [`set`] and
//! [`delete`], which update storage and broadcast to every live worker. A
//! worker's own change therefore comes back to it; the replica applies that
//! echo without re-sending, which ends the cycle.
//!
//! The store is driven by its owner's thread: nothing happens to it until
//! one of the pump methods ([`poll`], [`poll_timeout`], [`run_until`],
//! [`wait_for_workers`]) is called. Worker callbacks fire inside those calls
//! and act on the store through a [`HubContext`]; whatever they queue is
//! applied before the next event is handled.
//!
//! [`set`]: SharedStore::set
//! [`delete`]: SharedStore::delete
//! [`poll`]: SharedStore::poll
//! [`poll_timeout`]: SharedStore::poll_timeout
//! [`run_until`]: SharedStore::run_until
//! [`wait_for_workers`]: SharedStore::wait_for_workers

use crate::error::Result;
use crate::hire::HireConfig;
use crate::hub::{Effect, HubContext};
use crate::registry::{WorkerInfo, WorkerRegistry};
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use workshare_core::{Key, Message, ShareConfig, Store, Value, WorkerEvent, WorkerId};
use workshare_replica::{WorkerContext, WorkerResult};

/// The hub's shared key/value store
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use workshare_hub::{HireConfig, ReplicaStore, SharedStore, Store};
///
/// let mut data = SharedStore::with_data(Store::from_iter([("value", 4)]));
///
/// data.hire(
///     |ctx| {
///         let mut data = ReplicaStore::receive(ctx)?;
///         data.set("value", "England");
///         Ok(0)
///     },
///     HireConfig::new(),
/// )
/// .unwrap();
///
/// assert!(data.wait_for_workers(Duration::from_secs(10)));
/// assert_eq!(data.get("value").and_then(|v| v.as_str()), Some("England"));
/// ```
#[derive(Debug)]
pub struct SharedStore {
    data: Store,
    registry: WorkerRegistry,
}

impl SharedStore {
    /// Create an empty store with the default configuration
    pub fn new() -> Self {
        Self::with_config(Store::new(), ShareConfig::default())
    }

    /// Create a store holding `data`
    pub fn with_data(data: Store) -> Self {
        Self::with_config(data, ShareConfig::default())
    }

    /// Create a store holding `data` with an explicit configuration
    pub fn with_config(data: Store, config: ShareConfig) -> Self {
        Self {
            data,
            registry: WorkerRegistry::new(config),
        }
    }

    /// Configuration shared with every hired worker
    pub fn config(&self) -> &ShareConfig {
        self.registry.config()
    }

    /// Read-only view of the storage
    pub fn data(&self) -> &Store {
        &self.data
    }

    /// Get the value stored under a key
    pub fn get(&self, key: impl Into<Key>) -> Option<&Value> {
        self.data.get(key)
    }

    /// Check if a key is present
    pub fn contains_key(&self, key: impl Into<Key>) -> bool {
        self.data.contains_key(key)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Store a value and broadcast it to every live worker
    pub fn set(&mut self, key: impl Into<Key>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        self.data.insert(key.clone(), value.clone());
        self.registry.broadcast(&Message::Set { key, value });
    }

    /// Remove a key and broadcast the deletion to every live worker
    ///
    /// Deleting a missing key still broadcasts.
    pub fn delete(&mut self, key: impl Into<Key>) {
        let key = key.into();
        self.data.remove(&key);
        self.registry.broadcast(&Message::Delete { key });
    }

    /// Apply a message received from a worker
    ///
    /// Goes through [`set`](Self::set) and [`delete`](Self::delete), so the
    /// change is rebroadcast to every live worker, the sender included.
    pub fn apply_inbound(&mut self, message: Message) {
        match message {
            Message::Set { key, value } => self.set(key, value),
            Message::Delete { key } => self.delete(key),
        }
    }

    /// Spawn a worker with a snapshot of the current storage
    pub fn hire<F>(&mut self, entry: F, config: HireConfig) -> Result<WorkerId>
    where
        F: FnOnce(WorkerContext) -> WorkerResult + Send + 'static,
    {
        self.registry.hire(&self.data, entry, config)
    }

    /// Send an application message to one worker
    pub fn post(&mut self, id: WorkerId, value: impl Into<Value>) -> Result<()> {
        self.registry.post(id, value.into())
    }

    /// Send an application message to every live worker
    ///
    /// Returns the number of workers it was handed to. Payloads carrying
    /// the protocol tag are rejected before anything is sent.
    pub fn post_all(&mut self, value: impl Into<Value>) -> Result<usize> {
        self.registry.post_all(value.into())
    }

    /// Close a worker's inbound channel
    ///
    /// The worker observes a closed channel; its record stays alive until
    /// it exits. Returns false if the channel was already closed.
    pub fn terminate(&mut self, id: WorkerId) -> Result<bool> {
        self.registry.terminate(id)
    }

    /// Number of workers that have not exited yet
    pub fn active_count(&self) -> usize {
        self.registry.active_count()
    }

    /// Look up a worker, dead or alive
    pub fn worker(&self, id: WorkerId) -> Option<&WorkerInfo> {
        self.registry.worker(id)
    }

    /// Iterate over every worker ever hired
    pub fn workers(&self) -> impl Iterator<Item = &WorkerInfo> {
        self.registry.workers()
    }

    /// Set the callback fired each time the last active worker exits
    ///
    /// The callback can hire the next batch through its [`HubContext`].
    pub fn on_all_complete(&mut self, handler: impl FnMut(&mut HubContext<'_>) + 'static) {
        self.registry.on_all_complete(handler);
    }

    /// Read-only view of the worker registry
    pub fn registry(&self) -> &WorkerRegistry {
        &self.registry
    }

    /// Handle every pending worker event without blocking
    ///
    /// Returns the number of events handled.
    pub fn poll(&mut self) -> usize {
        let mut handled = 0;
        while let Some((id, event)) = self.registry.try_next_event() {
            self.handle_event(id, event);
            handled += 1;
        }
        handled
    }

    /// Wait at most `timeout` for a worker event, then drain the rest
    pub fn poll_timeout(&mut self, timeout: Duration) -> usize {
        match self.registry.next_event_timeout(timeout) {
            Some((id, event)) => {
                self.handle_event(id, event);
                1 + self.poll()
            }
            None => 0,
        }
    }

    /// Pump events until `done` holds or `timeout` passes
    ///
    /// Returns whether `done` held.
    pub fn run_until(&mut self, timeout: Duration, mut done: impl FnMut(&Self) -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            self.poll();
            if done(self) {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            self.poll_timeout(deadline - now);
        }
    }

    /// Pump events until every hired worker has exited
    pub fn wait_for_workers(&mut self, timeout: Duration) -> bool {
        self.run_until(timeout, |data| data.active_count() == 0)
    }

    fn handle_event(&mut self, id: WorkerId, event: WorkerEvent) {
        let mut hub = HubContext::new(id, &self.data);
        let message = self.registry.dispatch(id, event, &mut hub);
        let effects = hub.into_effects();

        if let Some(message) = message {
            if self.config().debug() {
                debug!(worker = %id, key = %message.key(), "applying worker change");
            }
            self.apply_inbound(message);
        }
        for effect in effects {
            self.apply_effect(effect);
        }
    }

    fn apply_effect(&mut self, effect: Effect) {
        match effect {
            Effect::Set(key, value) => self.set(key, value),
            Effect::Delete(key) => self.delete(key),
            Effect::Post(id, value) => {
                if let Err(e) = self.post(id, value) {
                    warn!(worker = %id, error = %e, "queued post dropped");
                }
            }
            Effect::PostAll(value) => {
                if let Err(e) = self.post_all(value) {
                    warn!(error = %e, "queued post to all workers dropped");
                }
            }
            Effect::Hire(entry, config) => {
                if let Err(e) = self.hire(entry, config) {
                    warn!(error = %e, "queued hire failed");
                }
            }
            Effect::Terminate(id) => {
                if let Err(e) = self.terminate(id) {
                    warn!(worker = %id, error = %e, "queued terminate failed");
                }
            }
        }
    }

    /// Register a worker without spawning a thread
    #[cfg(test)]
    pub(crate) fn attach(&mut self, config: HireConfig) -> WorkerContext {
        self.registry.register(&self.data, config)
    }
}

impl Default for SharedStore {
    fn default() -> Self {
        Self::new()
    }
}
