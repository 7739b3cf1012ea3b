//! First-of: race two actions, cancel the loser.
//!
//! Both actions run as strands under a fresh cancelable scope. The one
//! that succeeds first cancels the scope — reaching only its sibling's
//! pending awaits — and then yields its value. The joining strand
//! observes the winner directly: if the first strand's outcome is the
//! Cancel error, the second strand won.
//!
//! The loser is not abandoned: it is cancelled and runs to completion
//! (releasing timers and other guards) before `first_of` returns.

use crate::cx::Cx;
use crate::error::Result;
use std::future::Future;

impl Cx {
    /// Races `a` against `b`; the first success wins and the sibling is
    /// cancelled.
    ///
    /// # Errors
    ///
    /// A non-Cancel error from the first completion propagates
    /// unchanged; Cancel means the sibling won, so its outcome is
    /// returned instead.
    pub async fn first_of<T, FA, FutA, FB, FutB>(&self, a: FA, b: FB) -> Result<T>
    where
        T: 'static,
        FA: FnOnce(Cx) -> FutA + 'static,
        FutA: Future<Output = Result<T>> + 'static,
        FB: FnOnce(Cx) -> FutB + 'static,
        FutB: Future<Output = Result<T>> + 'static,
    {
        // The scope encloses the racing strands but not the joins below,
        // so a winner's cancel() cannot reach the collector.
        let scoped = self.scoped_child();
        let first = scoped.spawn(move |cx: Cx| async move {
            let value = a(cx.clone()).await?;
            cx.cancel();
            Ok(value)
        })?;
        let second = scoped.spawn(move |cx: Cx| async move {
            let value = b(cx.clone()).await?;
            cx.cancel();
            Ok(value)
        })?;
        let ra = first.join(self).await;
        let rb = second.join(self).await;
        match ra {
            Err(e) if e.is_cancelled() => rb,
            other => other,
        }
    }
}
