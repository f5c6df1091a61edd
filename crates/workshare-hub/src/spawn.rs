//! Spawn primitive - run a worker entry point on its own thread
//!
//! The worker thread owns everything it touches: the context is moved in and
//! nothing of the hub's memory is reachable from it. The hub hears about the
//! thread only through the context's channel:
//!
//! 1. `Online` before the entry point runs
//! 2. whatever the entry point sends
//! 3. `Failed` if it returned an error or panicked
//! 4. `Exited(code)`, always last

use crate::error::Result;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::thread;
use workshare_core::{Lifecycle, WorkerFailure};
use workshare_replica::{WorkerContext, WorkerResult};

/// Exit code reported for a failed or panicked entry point
pub const FAILURE_EXIT_CODE: i32 = 1;

/// Start `entry` on a new named thread
///
/// The thread is detached; the hub follows it through lifecycle events.
pub(crate) fn spawn_worker<F>(ctx: WorkerContext, entry: F) -> Result<()>
where
    F: FnOnce(WorkerContext) -> WorkerResult + Send + 'static,
{
    let config = ctx.config();
    let mut builder = thread::Builder::new().name(format!("{}-{}", config.thread_name(), ctx.id().0));
    if let Some(size) = config.stack_size() {
        builder = builder.stack_size(size);
    }

    let lifecycle = ctx.lifecycle();
    builder.spawn(move || run(ctx, entry, lifecycle))?;
    Ok(())
}

fn run<F>(ctx: WorkerContext, entry: F, lifecycle: Lifecycle)
where
    F: FnOnce(WorkerContext) -> WorkerResult,
{
    lifecycle.online();

    let code = match panic::catch_unwind(AssertUnwindSafe(move || entry(ctx))) {
        Ok(Ok(code)) => code,
        Ok(Err(e)) => {
            lifecycle.failed(WorkerFailure::new(e.to_string()));
            FAILURE_EXIT_CODE
        }
        Err(payload) => {
            lifecycle.failed(WorkerFailure::new(panic_message(payload.as_ref())));
            FAILURE_EXIT_CODE
        }
    };

    lifecycle.exited(code);
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("worker panicked: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("worker panicked: {}", s)
    } else {
        "worker panicked".to_string()
    }
}
