//! Interleaved execution: per-await fairness, strand start order, and
//! per-strand outcome collection.

#[macro_use]
mod common;

use common::Recorder;
use std::time::Duration;
use weft::host::VirtualHost;
use weft::{Cx, Error, Runtime};

fn fixture() -> (VirtualHost, Runtime) {
    let host = VirtualHost::new();
    let rt = Runtime::new(host.clone());
    (host, rt)
}

/// Between any two awaits of one strand, the ready sibling runs.
#[test]
fn strands_alternate_at_each_await() {
    let (host, rt) = fixture();
    let rec = Recorder::new();

    {
        let rec = rec.clone();
        rt.spawn(move |cx| async move {
            let (ra, rb) = cx
                .interleavedx(
                    {
                        let rec = rec.clone();
                        move |c: Cx| async move {
                            for i in 0..3 {
                                rec.record(format!("a{i}"));
                                c.yield_now().await?;
                            }
                            Ok(())
                        }
                    },
                    {
                        let rec = rec.clone();
                        move |c: Cx| async move {
                            for i in 0..3 {
                                rec.record(format!("b{i}"));
                                c.yield_now().await?;
                            }
                            Ok(())
                        }
                    },
                )
                .await;
            ra?;
            rb?;
            Ok(())
        });
    }

    rt.run_to_completion(&host);
    assert_trace!(rec, ["a0", "b0", "a1", "b1", "a2", "b2"]);
}

/// Strands begin executing in spawn order; results come back in strand
/// order regardless of completion order.
#[test]
fn strands_start_in_order_and_results_keep_strand_order() {
    let (host, rt) = fixture();
    let rec = Recorder::new();

    {
        let rec = rec.clone();
        rt.spawn(move |cx| async move {
            let actions: Vec<_> = (0..4u32)
                .map(|i| {
                    let rec = rec.clone();
                    move |c: Cx| async move {
                        rec.record(format!("start{i}"));
                        // Later strands finish earlier.
                        c.yield_for(Duration::from_millis(u64::from(40 - 10 * i))).await?;
                        Ok(i)
                    }
                })
                .collect();
            let results = cx.interleavedx_all(actions).await;
            let values: Vec<u32> = results.into_iter().collect::<Result<_, _>>()?;
            rec.record(format!("joined {values:?}"));
            Ok(())
        });
    }

    rt.run_to_completion(&host);
    assert_trace!(
        rec,
        ["start0", "start1", "start2", "start3", "joined [0, 1, 2, 3]"]
    );
}

/// A forked child runs to its first suspension before the parent
/// resumes.
#[test]
fn fork_starts_child_first() {
    let (host, rt) = fixture();
    let rec = Recorder::new();

    {
        let rec = rec.clone();
        rt.spawn(move |cx| async move {
            rec.record("parent-before");
            let rec2 = rec.clone();
            cx.fork(move |_fcx| async move {
                rec2.record("child");
                Ok(())
            })
            .await?;
            rec.record("parent-after");
            Ok(())
        });
    }

    rt.run_to_completion(&host);
    assert_trace!(rec, ["parent-before", "child", "parent-after"]);
}

/// One strand failing does not abandon its sibling; both outcomes are
/// reported per strand.
#[test]
fn interleavedx_collects_both_outcomes() {
    let (host, rt) = fixture();
    let rec = Recorder::new();

    {
        let rec = rec.clone();
        rt.spawn(move |cx| async move {
            let (ra, rb) = cx
                .interleavedx(
                    |_c: Cx| async move { Err::<i32, Error>(Error::user("E1")) },
                    |c: Cx| async move {
                        c.wait(Duration::from_millis(10)).await?;
                        Ok(7)
                    },
                )
                .await;
            let first = match ra {
                Err(e) if !e.is_cancelled() => format!("first: {e}"),
                other => format!("first unexpected: {other:?}"),
            };
            rec.record(first);
            rec.record(format!("second: {:?}", rb.unwrap()));
            Ok(())
        });
    }

    rt.run_to_completion(&host);
    assert_trace!(rec, ["first: User: E1", "second: 7"]);
}

/// `interleaved` rethrows the first error in strand order.
#[test]
fn interleaved_rethrows_first_error() {
    let (host, rt) = fixture();
    let rec = Recorder::new();

    {
        let rec = rec.clone();
        rt.spawn(move |cx| async move {
            let result = cx
                .interleaved(
                    |c: Cx| async move {
                        c.yield_now().await?;
                        Err::<i32, Error>(Error::user("boom"))
                    },
                    |c: Cx| async move {
                        c.yield_now().await?;
                        Ok(1)
                    },
                )
                .await;
            match result {
                Err(e) => rec.record(format!("error: {e}")),
                Ok(_) => rec.record("unexpected success"),
            }
            Ok(())
        });
    }

    rt.run_to_completion(&host);
    assert_trace!(rec, ["error: User: boom"]);
}
