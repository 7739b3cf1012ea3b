//! Promise semantics: single assignment, FIFO listener delivery, and
//! interaction with forked strands.

#[macro_use]
mod common;

use common::Recorder;
use std::time::Duration;
use weft::host::VirtualHost;
use weft::sync::Promise;
use weft::Runtime;

fn fixture() -> (VirtualHost, Runtime) {
    let host = VirtualHost::new();
    let rt = Runtime::new(host.clone());
    (host, rt)
}

/// A forked strand awaiting a promise observes the resolved value.
#[test]
fn fork_observes_resolution() {
    let (host, rt) = fixture();
    let rec = Recorder::new();
    let p: Promise<i32> = Promise::new();

    {
        let p = p.clone();
        let rec = rec.clone();
        rt.spawn(move |cx| async move {
            let reader = p.clone();
            let rec = rec.clone();
            cx.fork(move |fcx| async move {
                let value = reader.recv(&fcx).await?;
                rec.record(format!("got {value}"));
                Ok(())
            })
            .await?;
            p.resolve(42)?;
            Ok(())
        });
    }

    rt.run_to_completion(&host);
    assert_trace!(rec, ["got 42"]);
    assert_eq!(rt.live_strands(), 0);
}

/// Listeners attached while pending fire in attachment order, each with
/// the resolved value.
#[test]
fn listeners_fire_in_fifo_order() {
    let (_host, rt) = fixture();
    let rec = Recorder::new();
    let p: Promise<u32> = Promise::new();

    for name in ["l1", "l2", "l3"] {
        let p = p.clone();
        let rec = rec.clone();
        rt.spawn(move |cx| async move {
            let value = p.recv(&cx).await?;
            rec.record(format!("{name} {value}"));
            Ok(())
        });
    }

    rt.run_until_stalled();
    assert!(rec.is_empty());

    p.resolve(9).unwrap();
    rt.run_until_stalled();
    assert_trace!(rec, ["l1 9", "l2 9", "l3 9"]);
}

/// Resolving twice errors; awaiters before and after resolution all see
/// the first value.
#[test]
fn second_resolve_fails_and_value_is_sticky() {
    let (host, rt) = fixture();
    let rec = Recorder::new();
    let p: Promise<u32> = Promise::new();

    {
        let p = p.clone();
        let rec = rec.clone();
        rt.spawn(move |cx| async move {
            let value = p.recv(&cx).await?;
            rec.record(format!("before {value}"));
            Ok(())
        });
    }
    rt.run_until_stalled();

    p.resolve(1).unwrap();
    let err = p.resolve(2).unwrap_err();
    assert!(err.is_already_resolved());

    {
        let p = p.clone();
        let rec = rec.clone();
        rt.spawn(move |cx| async move {
            let value = p.recv(&cx).await?;
            rec.record(format!("after {value}"));
            Ok(())
        });
    }
    rt.run_to_completion(&host);
    assert_trace!(rec, ["before 1", "after 1"]);
}

/// An await on an already-resolved promise completes without touching
/// the host clock.
#[test]
fn resolved_promise_completes_without_timers() {
    let (host, rt) = fixture();
    let rec = Recorder::new();
    let p: Promise<&'static str> = Promise::new();
    p.resolve("ready").unwrap();

    {
        let rec = rec.clone();
        rt.spawn(move |cx| async move {
            let value = p.recv(&cx).await?;
            rec.record(value);
            Ok(())
        });
    }
    rt.run_until_stalled();
    assert_trace!(rec, ["ready"]);
    assert_eq!(host.pending_timers(), 0);
}

/// A cancelled receive leaves the promise intact; the stray listener
/// firing later is dropped by the registry.
#[test]
fn cancelled_receive_is_inert_after_resolution() {
    let (host, rt) = fixture();
    let rec = Recorder::new();
    let p: Promise<u32> = Promise::new();

    {
        let p = p.clone();
        let rec = rec.clone();
        rt.spawn(move |cx| async move {
            let p_inner = p.clone();
            cx.cancelable(|scx| async move {
                let waiter = scx.spawn({
                    let p = p_inner.clone();
                    let rec = rec.clone();
                    move |wcx| async move {
                        match p.recv(&wcx).await {
                            Ok(v) => rec.record(format!("value {v}")),
                            Err(e) if e.is_cancelled() => rec.record("cancelled"),
                            Err(_) => rec.record("failed"),
                        }
                        Ok(())
                    }
                })?;
                scx.yield_now().await?;
                scx.cancel();
                waiter.join(&scx).await
            })
            .await?;
            // The resolve still succeeds; its notification to the
            // cancelled await is dropped silently.
            p.resolve(7)?;
            cx.wait(Duration::ZERO).await?;
            Ok(())
        });
    }
    rt.run_to_completion(&host);
    assert_trace!(rec, ["cancelled"]);
}
