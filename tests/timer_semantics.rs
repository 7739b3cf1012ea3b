//! Deadlines, races, timer hygiene, and the at-most-one-resume rule,
//! all driven on the virtual clock.

#[macro_use]
mod common;

use common::Recorder;
use std::time::Duration;
use weft::host::{TimerHost, VirtualHost};
use weft::{Cx, Runtime};

fn fixture() -> (VirtualHost, Runtime) {
    let host = VirtualHost::new();
    let rt = Runtime::new(host.clone());
    (host, rt)
}

/// An action that finishes inside its deadline yields `Some`.
#[test]
fn timeout_returns_some_when_action_wins() {
    let (host, rt) = fixture();
    let rec = Recorder::new();

    {
        let rec = rec.clone();
        rt.spawn(move |cx| async move {
            let out = cx
                .timeout(Duration::from_millis(100), |c: Cx| async move {
                    c.wait(Duration::from_millis(50)).await?;
                    Ok("ok")
                })
                .await?;
            match out {
                Some(value) => rec.record(value),
                None => rec.record("timed out"),
            }
            Ok(())
        });
    }

    rt.advance(&host, Duration::from_millis(60));
    assert_trace!(rec, ["ok"]);
}

/// An action that overruns its deadline yields `None` and is cancelled.
#[test]
fn timeout_returns_none_on_expiry() {
    let (host, rt) = fixture();
    let rec = Recorder::new();

    {
        let rec = rec.clone();
        rt.spawn(move |cx| async move {
            let out = cx
                .timeout(Duration::from_millis(100), |c: Cx| async move {
                    c.wait(Duration::from_millis(200)).await?;
                    Ok("late")
                })
                .await?;
            match out {
                Some(value) => rec.record(value),
                None => rec.record("timed out"),
            }
            Ok(())
        });
    }

    rt.advance(&host, Duration::from_millis(150));
    assert_trace!(rec, ["timed out"]);
}

/// A failing action never cancels the deadline strand; the race
/// resolves on the timer and reports expiry.
#[test]
fn timeout_reports_expiry_when_action_fails() {
    let (host, rt) = fixture();
    let rec = Recorder::new();

    {
        let rec = rec.clone();
        rt.spawn(move |cx| async move {
            let out = cx
                .timeout(Duration::from_millis(10), |c: Cx| async move {
                    c.yield_now().await?;
                    Err::<&'static str, _>(weft::Error::user("exploded"))
                })
                .await?;
            rec.record(if out.is_some() { "finished" } else { "timed out" });
            Ok(())
        });
    }

    rt.run_to_completion(&host);
    assert_trace!(rec, ["timed out"]);
}

/// A non-Cancel error from the first strand of a race propagates
/// unchanged; the sibling still runs to completion.
#[test]
fn first_of_propagates_first_strand_error() {
    let (host, rt) = fixture();
    let rec = Recorder::new();

    {
        let rec = rec.clone();
        rt.spawn(move |cx| async move {
            let result = cx
                .first_of(
                    |c: Cx| async move {
                        c.yield_now().await?;
                        Err::<&'static str, _>(weft::Error::user("exploded"))
                    },
                    |c: Cx| async move {
                        c.wait(Duration::from_millis(10)).await?;
                        Ok("slow")
                    },
                )
                .await;
            match result {
                Err(e) if !e.is_cancelled() => rec.record(format!("error: {e}")),
                other => rec.record(format!("unexpected: {other:?}")),
            }
            Ok(())
        });
    }

    rt.run_to_completion(&host);
    assert_trace!(rec, ["error: User: exploded"]);
}

/// First success wins; the loser is cancelled and its later timer
/// firing has no observable effect.
#[test]
fn first_of_picks_winner_and_silences_loser() {
    let (host, rt) = fixture();
    let rec = Recorder::new();

    {
        let rec = rec.clone();
        rt.spawn(move |cx| async move {
            let winner = cx
                .first_of(
                    |c: Cx| async move {
                        c.wait(Duration::from_millis(10)).await?;
                        Ok("A")
                    },
                    |c: Cx| async move {
                        c.wait(Duration::from_millis(20)).await?;
                        Ok("B")
                    },
                )
                .await?;
            rec.record(winner);
            Ok(())
        });
    }

    rt.advance(&host, Duration::from_millis(12));
    assert_trace!(rec, ["A"]);

    // The loser's timer still fires, but its delivery is dropped.
    rt.advance(&host, Duration::from_millis(30));
    assert_trace!(rec, ["A"]);
    assert_eq!(rt.live_awaits(), 0);
    assert_eq!(rt.live_strands(), 0);
}

/// After a cancelable wait is cancelled, no host timer attributable to
/// it remains pending.
#[test]
fn cancelled_long_wait_leaves_no_timers() {
    let (host, rt) = fixture();
    let rec = Recorder::new();

    {
        let rec = rec.clone();
        rt.spawn(move |cx| async move {
            let out = cx
                .timeout(Duration::from_millis(100), |c: Cx| async move {
                    // Above the 200 ms threshold: this wait is cancelable.
                    c.wait(Duration::from_millis(500)).await?;
                    Ok(())
                })
                .await?;
            rec.record(if out.is_some() { "finished" } else { "timed out" });
            Ok(())
        });
    }

    rt.advance(&host, Duration::from_millis(120));
    assert_trace!(rec, ["timed out"]);
    assert_eq!(host.pending_timers(), 0, "cancelable wait must clear its timer");
}

/// Only the first delivery resumes an await; later callback firings for
/// the same wid are inert.
#[test]
fn at_most_one_resume() {
    let (host, rt) = fixture();
    let rec = Recorder::new();

    {
        let rec = rec.clone();
        let host = host.clone();
        rt.spawn(move |cx| async move {
            let value = cx
                .await_value::<i32>(move |completer| {
                    for n in [1, 2, 3] {
                        let completer = completer.clone();
                        host.set_immediate(Box::new(move || completer.resolve(n)));
                    }
                })
                .await?;
            rec.record(format!("value {value}"));
            Ok(())
        });
    }

    rt.run_to_completion(&host);
    assert_trace!(rec, ["value 1"]);
}

/// A counted await completes on its final resolution with the last
/// delivered value.
#[test]
fn counted_await_completes_on_final_resolution() {
    let (host, rt) = fixture();
    let rec = Recorder::new();

    {
        let rec = rec.clone();
        let host = host.clone();
        rt.spawn(move |cx| async move {
            let value = cx
                .await_counted::<i32>(2, move |completer| {
                    let ack = completer.clone();
                    host.set_immediate(Box::new(move || ack.resolve(10)));
                    host.set_immediate(Box::new(move || completer.resolve(20)));
                })
                .await?;
            rec.record(format!("value {value}"));
            Ok(())
        });
    }

    rt.run_to_completion(&host);
    assert_trace!(rec, ["value 20"]);
}

/// An explicit-outcome await honors the host's done flag.
#[test]
fn outcome_await_waits_for_done_flag() {
    let (host, rt) = fixture();
    let rec = Recorder::new();

    {
        let rec = rec.clone();
        let host = host.clone();
        rt.spawn(move |cx| async move {
            let value = cx
                .await_outcome::<&'static str>(move |completer| {
                    let progress = completer.clone();
                    host.set_immediate(Box::new(move || progress.settle(Ok("partial"), false)));
                    host.set_immediate(Box::new(move || completer.settle(Ok("final"), true)));
                })
                .await?;
            rec.record(value);
            Ok(())
        });
    }

    rt.run_to_completion(&host);
    assert_trace!(rec, ["final"]);
}

/// Nullable-error host callbacks routed through `finish`: `None`
/// resolves with the value, `Some` rejects with the error.
#[test]
fn finish_maps_nullable_error_to_outcome() {
    let (host, rt) = fixture();
    let rec = Recorder::new();

    {
        let rec = rec.clone();
        let host = host.clone();
        rt.spawn(move |cx| async move {
            let value = cx
                .await_value::<i32>({
                    let host = host.clone();
                    move |completer| {
                        host.set_immediate(Box::new(move || completer.finish(None, 5)));
                    }
                })
                .await?;
            rec.record(format!("ok {value}"));

            let result = cx
                .await_unit(move |completer| {
                    host.set_immediate(Box::new(move || {
                        completer.finish_unit(Some(weft::Error::user("io down")));
                    }));
                })
                .await;
            match result {
                Err(e) if !e.is_cancelled() => rec.record(format!("err {e}")),
                other => rec.record(format!("unexpected: {other:?}")),
            }
            Ok(())
        });
    }

    rt.run_to_completion(&host);
    assert_trace!(rec, ["ok 5", "err User: io down"]);
}

/// `on_cancel` recovers cancellation into the handler's value; other
/// errors pass through.
#[test]
fn on_cancel_recovers_only_cancellation() {
    let (host, rt) = fixture();
    let rec = Recorder::new();

    {
        let rec = rec.clone();
        rt.spawn(move |cx| async move {
            let value = cx
                .cancelable(|scx| async move {
                    scx.on_cancel(
                        |_c: Cx| async move { Ok("fallback") },
                        |c: Cx| async move {
                            let waiter = c.spawn(|wc: Cx| async move {
                                wc.yield_for(Duration::from_millis(10)).await?;
                                Ok("done")
                            })?;
                            c.yield_now().await?;
                            c.cancel();
                            waiter.join(&c).await
                        },
                    )
                    .await
                })
                .await?;
            rec.record(value);
            Ok(())
        });
    }

    rt.run_to_completion(&host);
    assert_trace!(rec, ["fallback"]);
}
