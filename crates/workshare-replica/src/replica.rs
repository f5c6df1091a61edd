//! ReplicaStore - per-worker mirror of the hub's store
//!
//! Two write paths touch the replica's storage:
//!
//! - `set` / `delete` are local mutations. They update storage and tell the
//!   hub (except for a `set` that would not change anything).
//! - `apply_inbound` applies a message from the hub. It writes storage
//!   directly and never tells anyone, so the echo of a worker's own change
//!   ends here.

use crate::context::WorkerContext;
use crate::error::Result;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use workshare_core::{
    Envelope, Error as CoreError, Frame, HubLink, Key, Message, ShareConfig, Store, Value, WorkerId,
};

type MessageHandler = Box<dyn FnMut(Value)>;
type MessageErrorHandler = Box<dyn FnMut(CoreError)>;

/// A worker's local replica of the shared store
pub struct ReplicaStore {
    id: WorkerId,
    data: Store,
    input: Option<Value>,
    link: HubLink,
    config: ShareConfig,
    on_message: Option<MessageHandler>,
    on_message_error: Option<MessageErrorHandler>,
    messages_sent: u64,
    closed: bool,
}

impl ReplicaStore {
    /// Build the replica from the context a worker was spawned with
    ///
    /// Fails only if the snapshot cannot be parsed.
    pub fn receive(ctx: WorkerContext) -> Result<Self> {
        let (snapshot, link, config) = ctx.into_parts();
        let data = snapshot.restore()?;
        let id = link.id();

        if config.debug() {
            debug!(worker = %id, entries = data.len(), "replica initialised from snapshot");
        }

        Ok(Self {
            id,
            data,
            input: snapshot.input().cloned(),
            link,
            config,
            on_message: None,
            on_message_error: None,
            messages_sent: 0,
            closed: false,
        })
    }

    /// Handle application (non-protocol) messages from the hub
    pub fn on_message(mut self, handler: impl FnMut(Value) + 'static) -> Self {
        self.on_message = Some(Box::new(handler));
        self
    }

    /// Handle frames that could not be decoded or were malformed
    ///
    /// Without a handler such frames are logged and dropped.
    pub fn on_message_error(mut self, handler: impl FnMut(CoreError) + 'static) -> Self {
        self.on_message_error = Some(Box::new(handler));
        self
    }

    /// This worker's registry slot
    pub fn id(&self) -> WorkerId {
        self.id
    }

    /// The hire-time input payload
    pub fn input(&self) -> Option<&Value> {
        self.input.as_ref()
    }

    /// Configuration inherited from the hub
    pub fn config(&self) -> &ShareConfig {
        &self.config
    }

    /// Read-only view of the replica
    pub fn data(&self) -> &Store {
        &self.data
    }

    /// Get a value
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

    /// Check if the replica is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Protocol messages this replica has sent to the hub
    pub fn messages_sent(&self) -> u64 {
        self.messages_sent
    }

    /// Whether the hub closed this worker's channel
    ///
    /// Becomes true once a poll finds the channel closed and drained.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Set a value (local mutation)
    ///
    /// Setting a key to the value it already holds sends nothing, so
    /// re-asserting an identical value is invisible to the hub. A missing
    /// key never counts as holding the value.
    pub fn set(&mut self, key: impl Into<Key>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();

        if self.data.get(&key) == Some(&value) {
            return;
        }

        self.data.insert(key.clone(), value.clone());
        self.send(Message::Set { key, value });
    }

    /// Delete a key (local mutation)
    ///
    /// Always sends, even when the key is absent.
    pub fn delete(&mut self, key: impl Into<Key>) {
        let key = key.into();
        self.data.remove(&key);
        self.send(Message::Delete { key });
    }

    /// Apply a message from the hub directly to storage
    ///
    /// Produces no outbound message.
    pub fn apply_inbound(&mut self, message: Message) {
        if self.config.debug() {
            debug!(
                worker = %self.id,
                action = message.action(),
                key = %message.key(),
                "hub -> replica"
            );
        }

        match message {
            Message::Set { key, value } => {
                self.data.insert(key, value);
            }
            Message::Delete { key } => {
                self.data.remove(key);
            }
        }
    }

    /// Send an application message to the hub's `on_message` handler
    pub fn post(&self, value: impl Into<Value>) -> Result<()> {
        let frame = Envelope::User(value.into()).encode()?;
        self.link.send(frame)?;
        Ok(())
    }

    /// Process every frame already waiting, without blocking
    ///
    /// Returns the number of frames handled.
    pub fn poll(&mut self) -> usize {
        let mut handled = 0;
        while !self.closed {
            match self.link.try_recv() {
                Ok(Some(frame)) => {
                    self.handle_frame(&frame);
                    handled += 1;
                }
                Ok(None) => break,
                Err(_) => self.mark_closed(),
            }
        }
        handled
    }

    /// Wait at most `timeout` for a frame, then drain whatever is pending
    pub fn poll_timeout(&mut self, timeout: Duration) -> usize {
        if self.closed {
            return 0;
        }
        match self.link.recv_timeout(timeout) {
            Ok(Some(frame)) => {
                self.handle_frame(&frame);
                1 + self.poll()
            }
            Ok(None) => 0,
            Err(_) => {
                self.mark_closed();
                0
            }
        }
    }

    /// Keep polling until `done` holds, the channel closes, or `timeout` passes
    ///
    /// Returns whether `done` held.
    pub fn poll_until(&mut self, timeout: Duration, mut done: impl FnMut(&Self) -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            self.poll();
            if done(self) {
                return true;
            }
            if self.closed {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            self.poll_timeout(deadline - now);
        }
    }

    fn handle_frame(&mut self, frame: &Frame) {
        match Envelope::decode(frame) {
            Ok(Envelope::Share(message)) => self.apply_inbound(message),
            Ok(Envelope::User(value)) => match self.on_message.as_mut() {
                Some(handler) => handler(value),
                None => {
                    if self.config.debug() {
                        debug!(worker = %self.id, "application message dropped, no handler");
                    }
                }
            },
            Err(e) => {
                warn!(worker = %self.id, error = %e, "dropping undeliverable frame from hub");
                if let Some(handler) = self.on_message_error.as_mut() {
                    handler(e);
                }
            }
        }
    }

    fn send(&mut self, message: Message) {
        if self.config.debug() {
            debug!(
                worker = %self.id,
                action = message.action(),
                key = %message.key(),
                "replica -> hub"
            );
        }

        let frame = match Envelope::Share(message).encode() {
            Ok(frame) => frame,
            Err(e) => {
                warn!(worker = %self.id, error = %e, "failed to encode message");
                return;
            }
        };

        match self.link.send(frame) {
            Ok(()) => self.messages_sent += 1,
            Err(e) => debug!(worker = %self.id, error = %e, "hub unreachable, message dropped"),
        }
    }

    fn mark_closed(&mut self) {
        if !self.closed && self.config.debug() {
            debug!(worker = %self.id, "hub closed the channel");
        }
        self.closed = true;
    }
}

impl fmt::Debug for ReplicaStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReplicaStore")
            .field("id", &self.id)
            .field("entries", &self.data.len())
            .field("messages_sent", &self.messages_sent)
            .field("closed", &self.closed)
            .finish()
    }
}
