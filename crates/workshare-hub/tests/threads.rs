//! Replication against real worker threads

use pretty_assertions::assert_eq;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;
use workshare_hub::{
    HireConfig, ReplicaStore, ShareConfig, SharedStore, Store, Value, WorkerContext, WorkerResult,
    FAILURE_EXIT_CODE,
};

const TIMEOUT: Duration = Duration::from_secs(10);

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

fn debug_store(data: Store) -> SharedStore {
    init_tracing();
    SharedStore::with_config(data, ShareConfig::default().with_debug(true))
}

/// Shared log filled by hub callbacks
fn log<T>() -> Rc<RefCell<Vec<T>>> {
    Rc::new(RefCell::new(Vec::new()))
}

/// Worker entry point posting its replica as it was received
fn report_snapshot(ctx: WorkerContext) -> WorkerResult {
    let data = ReplicaStore::receive(ctx)?;
    data.post(data.data().to_value())?;
    Ok(0)
}

fn map_of(entries: &[(&str, Value)]) -> Value {
    Value::Map(entries.iter().map(|(k, v)| (k.to_string(), v.clone())).collect())
}

#[test]
fn test_england_round_trip() {
    let mut data = debug_store(Store::from_iter([("value", 4)]));
    let reports = log::<Value>();

    let sink = reports.clone();
    data.hire(
        |ctx| {
            let mut data = ReplicaStore::receive(ctx)?;
            data.set("value", "England");
            // The echo of our own change is the only frame the hub sends
            if data.poll_timeout(TIMEOUT) != 1 {
                return Err("no echo".into());
            }
            data.post(data.data().to_value())?;
            data.post(Value::Int(data.messages_sent() as i64))?;
            Ok(0)
        },
        HireConfig::new().on_message(move |_, msg| sink.borrow_mut().push(msg)),
    )
    .unwrap();

    assert!(data.wait_for_workers(TIMEOUT));
    assert_eq!(data.data(), &Store::from_iter([("value", "England")]));
    assert_eq!(
        *reports.borrow(),
        vec![map_of(&[("value", "England".into())]), Value::Int(1)]
    );
}

#[test]
fn test_aggregate_completion_fires_per_zero_crossing() {
    let mut data = debug_store(Store::new());
    let crossings = Rc::new(RefCell::new(0));
    let codes = log::<i32>();

    let counter = crossings.clone();
    data.on_all_complete(move |_| *counter.borrow_mut() += 1);

    for round in 0..2 {
        for code in 0..3 {
            let sink = codes.clone();
            data.hire(
                move |_ctx| Ok(code),
                HireConfig::new().on_complete(move |_, code| sink.borrow_mut().push(code)),
            )
            .unwrap();
        }
        assert!(data.wait_for_workers(TIMEOUT));
        assert_eq!(*crossings.borrow(), round + 1);
    }

    assert_eq!(data.active_count(), 0);
    assert_eq!(data.workers().count(), 6);
    assert_eq!(codes.borrow().len(), 6);

    let mut exit_codes: Vec<_> = data.workers().filter_map(|w| w.exit_code).collect();
    exit_codes.sort();
    assert_eq!(exit_codes, vec![0, 0, 1, 1, 2, 2]);
}

#[test]
fn test_failing_worker_reports_error() {
    let mut data = debug_store(Store::new());
    let events = log::<String>();

    let (errors, completions) = (events.clone(), events.clone());
    let id = data
        .hire(
            |_ctx| Err("no work today".into()),
            HireConfig::new()
                .on_error(move |_, e| errors.borrow_mut().push(format!("error: {}", e)))
                .on_complete(move |_, code| completions.borrow_mut().push(format!("exit: {}", code))),
        )
        .unwrap();

    assert!(data.wait_for_workers(TIMEOUT));
    assert_eq!(
        *events.borrow(),
        vec![
            "error: no work today".to_string(),
            format!("exit: {}", FAILURE_EXIT_CODE)
        ]
    );
    assert_eq!(data.worker(id).unwrap().exit_code, Some(FAILURE_EXIT_CODE));
}

#[test]
fn test_panicking_worker_is_contained() {
    let mut data = debug_store(Store::new());
    let errors = log::<String>();

    let sink = errors.clone();
    data.hire(
        |_ctx| panic!("worker blew up"),
        HireConfig::new().on_error(move |_, e| sink.borrow_mut().push(e.message)),
    )
    .unwrap();

    assert!(data.wait_for_workers(TIMEOUT));
    assert_eq!(
        *errors.borrow(),
        vec!["worker panicked: worker blew up".to_string()]
    );
}

#[test]
fn test_concurrent_writers_converge() {
    let mut data = debug_store(Store::new());
    let reports = log::<Value>();

    for name in ["A", "B"] {
        let sink = reports.clone();
        data.hire(
            move |ctx| {
                let mut data = ReplicaStore::receive(ctx)?;
                data.set("x", name);
                data.set(name, true);
                // Both flags arriving means both writes to "x" went through the hub
                if !data.poll_until(TIMEOUT, |data| data.contains_key("A") && data.contains_key("B")) {
                    return Err("missing peer write".into());
                }
                data.poll_until(TIMEOUT, |data| data.get("done").is_some());
                data.post(data.data().to_value())?;
                Ok(0)
            },
            HireConfig::new().on_message(move |_, msg| sink.borrow_mut().push(msg)),
        )
        .unwrap();
    }

    assert!(data.run_until(TIMEOUT, |data| data.contains_key("A") && data.contains_key("B")));
    data.set("done", true);
    assert!(data.wait_for_workers(TIMEOUT));

    let winner = data.get("x").and_then(|v| v.as_str()).map(str::to_string);
    assert!(matches!(winner.as_deref(), Some("A") | Some("B")));

    // Every replica ended with the hub's entries, in whatever order they arrived
    let expected = data.data().to_value();
    assert_eq!(*reports.borrow(), vec![expected.clone(), expected]);
}

#[test]
fn test_online_and_input() {
    let mut data = debug_store(Store::from_iter([("base", 10)]));
    let events = log::<String>();

    let (online, messages) = (events.clone(), events.clone());
    data.hire(
        |ctx| {
            let data = ReplicaStore::receive(ctx)?;
            let base = data.get("base").and_then(|v| v.as_int()).unwrap_or(0);
            let input = data.input().and_then(|v| v.as_int()).unwrap_or(0);
            data.post(base + input)?;
            Ok(0)
        },
        HireConfig::new()
            .input(32)
            .on_online(move |_| online.borrow_mut().push("online".to_string()))
            .on_message(move |_, msg| messages.borrow_mut().push(msg.to_string())),
    )
    .unwrap();

    assert!(data.wait_for_workers(TIMEOUT));
    assert_eq!(*events.borrow(), vec!["online".to_string(), "42".to_string()]);
}

#[test]
fn test_terminate_ends_worker() {
    let mut data = debug_store(Store::new());
    let codes = log::<String>();

    let sink = codes.clone();
    let id = data
        .hire(
            |ctx| {
                let mut data = ReplicaStore::receive(ctx)?
                    .on_message(|msg| tracing::info!(%msg, "hub says"));
                // Run until the hub hangs up
                data.poll_until(TIMEOUT, |data| data.is_closed());
                Ok(if data.is_closed() { 7 } else { 0 })
            },
            HireConfig::new().on_complete(move |_, code| sink.borrow_mut().push(code.to_string())),
        )
        .unwrap();

    data.post(id, "keep going").unwrap();
    assert!(data.terminate(id).unwrap());
    assert!(data.wait_for_workers(TIMEOUT));

    assert_eq!(*codes.borrow(), vec!["7".to_string()]);
    let info = data.worker(id).unwrap();
    assert!(!info.alive);
    assert!(info.exited_at.is_some());
    assert_eq!(info.frames_sent, 1);
}

#[test]
fn test_late_hire_starts_from_current_state() {
    let mut data = debug_store(Store::new());
    let reports = log::<Value>();

    data.set("a", 1);
    data.set("b", "two");
    data.delete("a");

    let sink = reports.clone();
    data.hire(
        report_snapshot,
        HireConfig::new().on_message(move |_, msg| sink.borrow_mut().push(msg)),
    )
    .unwrap();

    // Changes after the hire do not rewrite the snapshot
    data.set("c", Value::List(vec![Value::Int(3)]));
    assert!(data.wait_for_workers(TIMEOUT));
    assert_eq!(*reports.borrow(), vec![map_of(&[("b", "two".into())])]);
}

#[test]
fn test_callback_replies_to_worker() {
    let mut data = debug_store(Store::new());
    let replies = log::<Value>();

    let sink = replies.clone();
    data.hire(
        |ctx| {
            let reply = Rc::new(RefCell::new(None));
            let slot = reply.clone();
            let mut data = ReplicaStore::receive(ctx)?
                .on_message(move |msg| *slot.borrow_mut() = Some(msg));

            data.post("Hi!")?;
            if !data.poll_until(TIMEOUT, |_| reply.borrow().is_some()) {
                return Err("no reply".into());
            }
            let answer = reply.borrow_mut().take().unwrap_or_default();
            data.post(answer)?;
            Ok(0)
        },
        HireConfig::new().on_message(move |hub, msg| {
            if msg.as_str() == Some("Hi!") {
                hub.post(hub.worker(), "Bye");
            } else {
                sink.borrow_mut().push(msg);
            }
        }),
    )
    .unwrap();

    assert!(data.wait_for_workers(TIMEOUT));
    assert_eq!(*replies.borrow(), vec![Value::from("Bye")]);
}

#[test]
fn test_message_all_workers() {
    let mut data = debug_store(Store::new());
    let replies = log::<Value>();

    for _ in 0..2 {
        let sink = replies.clone();
        data.hire(
            |ctx| {
                let got = Rc::new(RefCell::new(None));
                let slot = got.clone();
                let mut data = ReplicaStore::receive(ctx)?
                    .on_message(move |msg| *slot.borrow_mut() = Some(msg));
                data.set(data.id().0, "ready");
                if !data.poll_until(TIMEOUT, |_| got.borrow().is_some()) {
                    return Err("no broadcast".into());
                }
                let msg = got.borrow_mut().take().unwrap_or_default();
                data.post(msg)?;
                Ok(0)
            },
            HireConfig::new().on_message(move |_, msg| sink.borrow_mut().push(msg)),
        )
        .unwrap();
    }

    assert!(data.run_until(TIMEOUT, |data| data.len() == 2));
    assert_eq!(data.post_all("go").unwrap(), 2);
    assert!(data.wait_for_workers(TIMEOUT));

    assert_eq!(*replies.borrow(), vec![Value::from("go"), Value::from("go")]);
    assert_eq!(data.post_all("late").unwrap(), 0);
}

#[test]
fn test_all_complete_hires_next_batch() {
    let mut data = debug_store(Store::new());
    let batches = log::<usize>();

    let sink = batches.clone();
    data.on_all_complete(move |hub| {
        let done = sink.borrow().len();
        sink.borrow_mut().push(hub.worker().0);
        if done == 0 {
            // Second batch starts from the first batch's results
            hub.hire(
                |ctx| {
                    let mut data = ReplicaStore::receive(ctx)?;
                    let first = data.get("first").and_then(|v| v.as_int()).unwrap_or(0);
                    data.set("second", first * 2);
                    Ok(0)
                },
                HireConfig::new(),
            );
        }
    });

    data.hire(
        |ctx| {
            let mut data = ReplicaStore::receive(ctx)?;
            data.set("first", 21);
            Ok(0)
        },
        HireConfig::new(),
    )
    .unwrap();

    assert!(data.run_until(TIMEOUT, |data| data.active_count() == 0 && data.workers().count() == 2));
    assert_eq!(*batches.borrow(), vec![0, 1]);
    assert_eq!(data.get("second"), Some(&Value::Int(42)));
}
