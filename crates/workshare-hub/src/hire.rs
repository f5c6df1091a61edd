//! HireConfig - per-worker input and lifecycle callbacks
//!
//! Callbacks run on the hub's thread, inside the store's event pump
//! (`SharedStore::poll` and friends), never on a worker thread. Each one
//! receives a [`HubContext`] through which it can act on the hub.

use crate::hub::HubContext;
use std::fmt;
use workshare_core::{Error as CoreError, Value, WorkerFailure};

pub(crate) type MessageHook = Box<dyn FnMut(&mut HubContext<'_>, Value)>;
pub(crate) type ErrorHook = Box<dyn FnMut(&mut HubContext<'_>, WorkerFailure)>;
pub(crate) type CompleteHook = Box<dyn FnMut(&mut HubContext<'_>, i32)>;
pub(crate) type MessageErrorHook = Box<dyn FnMut(&mut HubContext<'_>, CoreError)>;
pub(crate) type OnlineHook = Box<dyn FnMut(&mut HubContext<'_>)>;

/// Configuration for one hired worker
///
/// # Example
///
/// ```
/// use workshare_hub::HireConfig;
///
/// let config = HireConfig::new()
///     .input("Hello")
///     .on_message(|hub, msg| {
///         if msg.as_str() == Some("Hi!") {
///             hub.post(hub.worker(), "Bye");
///         }
///     })
///     .on_complete(|_, code| println!("worker exited with {}", code));
/// ```
#[derive(Default)]
pub struct HireConfig {
    pub(crate) input: Option<Value>,
    pub(crate) hooks: WorkerHooks,
}

/// Callbacks kept in the worker's registry record
#[derive(Default)]
pub(crate) struct WorkerHooks {
    pub(crate) on_message: Option<MessageHook>,
    pub(crate) on_error: Option<ErrorHook>,
    pub(crate) on_complete: Option<CompleteHook>,
    pub(crate) on_message_error: Option<MessageErrorHook>,
    pub(crate) on_online: Option<OnlineHook>,
}

impl HireConfig {
    /// Create a configuration with no input and no callbacks
    pub fn new() -> Self {
        Self::default()
    }

    /// Payload forwarded to the worker with its snapshot
    pub fn input(mut self, input: impl Into<Value>) -> Self {
        self.input = Some(input.into());
        self
    }

    /// Called for every application (non-protocol) message from the worker
    pub fn on_message(mut self, handler: impl FnMut(&mut HubContext<'_>, Value) + 'static) -> Self {
        self.hooks.on_message = Some(Box::new(handler));
        self
    }

    /// Called when the worker's entry point fails or panics
    pub fn on_error(mut self, handler: impl FnMut(&mut HubContext<'_>, WorkerFailure) + 'static) -> Self {
        self.hooks.on_error = Some(Box::new(handler));
        self
    }

    /// Called with the exit code when the worker exits
    pub fn on_complete(mut self, handler: impl FnMut(&mut HubContext<'_>, i32) + 'static) -> Self {
        self.hooks.on_complete = Some(Box::new(handler));
        self
    }

    /// Called when a frame from the worker cannot be decoded or is malformed
    pub fn on_message_error(mut self, handler: impl FnMut(&mut HubContext<'_>, CoreError) + 'static) -> Self {
        self.hooks.on_message_error = Some(Box::new(handler));
        self
    }

    /// Called once the worker thread is running
    pub fn on_online(mut self, handler: impl FnMut(&mut HubContext<'_>) + 'static) -> Self {
        self.hooks.on_online = Some(Box::new(handler));
        self
    }
}

impl fmt::Debug for HireConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HireConfig")
            .field("input", &self.input)
            .field("on_message", &self.hooks.on_message.is_some())
            .field("on_error", &self.hooks.on_error.is_some())
            .field("on_complete", &self.hooks.on_complete.is_some())
            .field("on_message_error", &self.hooks.on_message_error.is_some())
            .field("on_online", &self.hooks.on_online.is_some())
            .finish()
    }
}
