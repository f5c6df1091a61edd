//! WorkerRegistry - spawns workers, tracks liveness, fans out broadcasts
//!
//! Records live in an arena indexed by [`WorkerId`]. A record is never
//! removed: when its worker exits it is marked dead and its link dropped, so
//! ids stay stable and callbacks stay attached to the right worker.
//!
//! The registry does not apply replication messages itself. `dispatch`
//! hands protocol messages back to the hub's `SharedStore`, which applies
//! them through its own mutation path. Everything that changes the registry
//! goes through the `SharedStore`; callers only get read access.

use crate::error::{Error, Result};
use crate::hire::{HireConfig, WorkerHooks};
use crate::hub::HubContext;
use crate::spawn;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::mpsc::Receiver;
use std::time::Duration;
use tracing::{debug, warn};
use workshare_core::channel::{self, EventSender};
use workshare_core::{
    Envelope, Frame, Message, ShareConfig, Snapshot, Store, Value, WorkerEvent, WorkerId,
    WorkerLink,
};
use workshare_replica::{WorkerContext, WorkerResult};

type AllCompleteHook = Box<dyn FnMut(&mut HubContext<'_>)>;

/// Public view of one worker record
///
/// Serializes to JSON for status reporting; timestamps are RFC 3339.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkerInfo {
    /// Registry slot
    pub id: WorkerId,
    /// False once the exit notification has been processed
    pub alive: bool,
    /// True once the worker thread reported it was running
    pub online: bool,
    /// Exit code, once exited
    pub exit_code: Option<i32>,
    /// When the worker was hired
    pub hired_at: DateTime<Utc>,
    /// When the exit notification was processed
    pub exited_at: Option<DateTime<Utc>>,
    /// Frames (broadcasts and posts) handed to the worker's channel
    pub frames_sent: u64,
    /// Protocol messages received from the worker
    pub messages_received: u64,
}

impl WorkerInfo {
    fn new(id: WorkerId) -> Self {
        Self {
            id,
            alive: true,
            online: false,
            exit_code: None,
            hired_at: Utc::now(),
            exited_at: None,
            frames_sent: 0,
            messages_received: 0,
        }
    }
}

struct WorkerRecord {
    info: WorkerInfo,
    /// Handle on the worker's inbound channel; `None` once exited or terminated
    link: Option<WorkerLink>,
    hooks: WorkerHooks,
}

/// Owns every worker record and the hub's inbox
pub struct WorkerRegistry {
    records: Vec<WorkerRecord>,
    active: usize,
    events: EventSender,
    inbox: Receiver<(WorkerId, WorkerEvent)>,
    on_all_complete: Option<AllCompleteHook>,
    config: ShareConfig,
}

impl WorkerRegistry {
    pub(crate) fn new(config: ShareConfig) -> Self {
        let (events, inbox) = channel::inbox();
        Self {
            records: Vec::new(),
            active: 0,
            events,
            inbox,
            on_all_complete: None,
            config,
        }
    }

    /// Configuration handed to every hired worker
    pub fn config(&self) -> &ShareConfig {
        &self.config
    }

    /// Number of workers that have not exited yet
    pub fn active_count(&self) -> usize {
        self.active
    }

    /// Number of slots ever allocated
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if no worker was ever hired
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Look up a worker
    pub fn worker(&self, id: WorkerId) -> Option<&WorkerInfo> {
        self.records.get(id.0).map(|record| &record.info)
    }

    /// Iterate over every record, dead ones included
    pub fn workers(&self) -> impl Iterator<Item = &WorkerInfo> {
        self.records.iter().map(|record| &record.info)
    }

    /// Check if a worker has not exited yet
    pub fn is_alive(&self, id: WorkerId) -> bool {
        self.worker(id).is_some_and(|info| info.alive)
    }

    /// Set the callback fired each time the active count drops to zero
    ///
    /// Not one-shot: hiring again after a zero crossing re-arms it.
    pub(crate) fn on_all_complete(&mut self, handler: impl FnMut(&mut HubContext<'_>) + 'static) {
        self.on_all_complete = Some(Box::new(handler));
    }

    /// Spawn a worker with a snapshot of `store`
    ///
    /// If the thread cannot be started the slot is released again and the
    /// active count is left untouched.
    pub(crate) fn hire<F>(&mut self, store: &Store, entry: F, config: HireConfig) -> Result<WorkerId>
    where
        F: FnOnce(WorkerContext) -> WorkerResult + Send + 'static,
    {
        let ctx = self.register(store, config);
        let id = ctx.id();

        if let Err(e) = spawn::spawn_worker(ctx, entry) {
            warn!(worker = %id, error = %e, "failed to spawn worker");
            self.records.pop();
            self.active -= 1;
            return Err(e);
        }

        Ok(id)
    }

    /// Allocate a slot and build the context its worker starts from
    pub(crate) fn register(&mut self, store: &Store, config: HireConfig) -> WorkerContext {
        let HireConfig { input, hooks } = config;
        let id = WorkerId(self.records.len());
        let snapshot = Snapshot::capture(store, input);
        let (link, hub_link) = channel::pair(id, self.events.clone());

        self.records.push(WorkerRecord {
            info: WorkerInfo::new(id),
            link: Some(link),
            hooks,
        });
        self.active += 1;

        if self.config.debug() {
            debug!(worker = %id, entries = store.len(), active = self.active, "hiring worker");
        }

        WorkerContext::new(snapshot, hub_link, self.config.clone())
    }

    /// Send a replication message to every live worker
    ///
    /// Returns the number of workers the message was handed to.
    pub(crate) fn broadcast(&mut self, message: &Message) -> usize {
        let frame = match Envelope::Share(message.clone()).encode() {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, "failed to encode broadcast");
                return 0;
            }
        };

        let delivered = self.fan_out(&frame);
        if self.config.debug() {
            debug!(
                action = message.action(),
                key = %message.key(),
                workers = delivered,
                "hub -> workers"
            );
        }
        delivered
    }

    /// Send an application message to every live worker
    ///
    /// The payload is encoded once; a payload carrying the protocol tag is
    /// rejected before anything is sent.
    pub(crate) fn post_all(&mut self, value: Value) -> Result<usize> {
        let frame = Envelope::User(value).encode()?;
        let delivered = self.fan_out(&frame);
        if self.config.debug() {
            debug!(workers = delivered, "application message to all workers");
        }
        Ok(delivered)
    }

    /// Hand a frame to every live worker that still has a link
    ///
    /// A worker whose thread already finished (exit not yet processed)
    /// silently misses the frame.
    fn fan_out(&mut self, frame: &Frame) -> usize {
        let mut delivered = 0;
        for record in self.records.iter_mut().filter(|record| record.info.alive) {
            let Some(link) = record.link.as_ref() else {
                continue;
            };
            match link.send(frame.clone()) {
                Ok(()) => {
                    record.info.frames_sent += 1;
                    delivered += 1;
                }
                Err(_) => debug!(worker = %record.info.id, "worker channel closed, frame dropped"),
            }
        }
        delivered
    }

    /// Send an application message to one worker
    pub(crate) fn post(&mut self, id: WorkerId, value: Value) -> Result<()> {
        let record = self
            .records
            .get_mut(id.0)
            .ok_or(Error::UnknownWorker(id))?;
        if !record.info.alive {
            return Err(Error::WorkerGone(id));
        }
        let link = record.link.as_ref().ok_or(Error::WorkerGone(id))?;

        let frame = Envelope::User(value).encode()?;
        link.send(frame).map_err(|_| Error::WorkerGone(id))?;
        record.info.frames_sent += 1;
        Ok(())
    }

    /// Close a worker's inbound channel
    ///
    /// The worker sees its channel closed and is expected to finish; the
    /// record stays alive until the exit notification arrives. Frames
    /// already queued for the worker are still delivered, anything sent
    /// afterwards is not. Returns false if the channel was already closed.
    pub(crate) fn terminate(&mut self, id: WorkerId) -> Result<bool> {
        let record = self
            .records
            .get_mut(id.0)
            .ok_or(Error::UnknownWorker(id))?;
        let closed = record.link.take().is_some();

        if closed && self.config.debug() {
            debug!(worker = %id, "terminating worker channel");
        }
        Ok(closed)
    }

    /// Take the next pending worker event, without blocking
    pub(crate) fn try_next_event(&self) -> Option<(WorkerId, WorkerEvent)> {
        self.inbox.try_recv().ok()
    }

    /// Wait at most `timeout` for the next worker event
    pub(crate) fn next_event_timeout(&self, timeout: Duration) -> Option<(WorkerId, WorkerEvent)> {
        self.inbox.recv_timeout(timeout).ok()
    }

    /// Route one worker event
    ///
    /// Returns the protocol message carried by the event, if any, for the
    /// caller to apply. Everything else is handled here, with `hub` passed
    /// to the callbacks:
    ///
    /// - application messages go to `on_message`
    /// - undecodable or malformed frames go to `on_message_error`
    /// - failures go to `on_error`, online to `on_online`
    /// - exit marks the record dead, calls `on_complete` and, on reaching
    ///   zero active workers, the aggregate-completion callback
    pub(crate) fn dispatch(
        &mut self,
        id: WorkerId,
        event: WorkerEvent,
        hub: &mut HubContext<'_>,
    ) -> Option<Message> {
        let debug_enabled = self.config.debug();
        let Some(record) = self.records.get_mut(id.0) else {
            warn!(worker = %id, "event from unregistered worker ignored");
            return None;
        };

        match event {
            WorkerEvent::Online => {
                record.info.online = true;
                if debug_enabled {
                    debug!(worker = %id, "worker online");
                }
                if let Some(handler) = record.hooks.on_online.as_mut() {
                    handler(hub);
                }
                None
            }
            WorkerEvent::Frame(frame) => match Envelope::decode(&frame) {
                Ok(Envelope::Share(message)) => {
                    record.info.messages_received += 1;
                    if debug_enabled {
                        debug!(
                            worker = %id,
                            action = message.action(),
                            key = %message.key(),
                            "worker -> hub"
                        );
                    }
                    Some(message)
                }
                Ok(Envelope::User(value)) => {
                    match record.hooks.on_message.as_mut() {
                        Some(handler) => handler(hub, value),
                        None => {
                            if debug_enabled {
                                debug!(worker = %id, "application message dropped, no handler");
                            }
                        }
                    }
                    None
                }
                Err(e) => {
                    warn!(worker = %id, error = %e, "dropping undeliverable frame from worker");
                    if let Some(handler) = record.hooks.on_message_error.as_mut() {
                        handler(hub, e);
                    }
                    None
                }
            },
            WorkerEvent::Failed(failure) => {
                match record.hooks.on_error.as_mut() {
                    Some(handler) => handler(hub, failure),
                    None => warn!(worker = %id, error = %failure, "worker failed"),
                }
                None
            }
            WorkerEvent::Exited(code) => {
                if !record.info.alive {
                    warn!(worker = %id, code, "duplicate exit notification ignored");
                    return None;
                }

                record.info.alive = false;
                record.info.exit_code = Some(code);
                record.info.exited_at = Some(Utc::now());
                record.link = None;
                self.active -= 1;

                if debug_enabled {
                    debug!(worker = %id, code, active = self.active, "worker exited");
                }

                if let Some(handler) = record.hooks.on_complete.as_mut() {
                    handler(hub, code);
                }
                if self.active == 0 {
                    if let Some(handler) = self.on_all_complete.as_mut() {
                        handler(hub);
                    }
                }
                None
            }
        }
    }
}

impl fmt::Debug for WorkerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerRegistry")
            .field("slots", &self.records.len())
            .field("active", &self.active)
            .field("debug", &self.config.debug())
            .finish()
    }
}
