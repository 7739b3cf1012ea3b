//! Deadlines and cancellation recovery.

use crate::cx::Cx;
use crate::error::Result;
use std::future::Future;
use std::time::Duration;

impl Cx {
    /// Runs `f` with a deadline.
    ///
    /// Returns `Some(value)` if the action completes within `limit`,
    /// `None` if the deadline expires first — in which case the action
    /// is cancelled and drained before returning.
    ///
    /// # Errors
    ///
    /// A non-Cancel error from the action propagates unchanged.
    pub async fn timeout<T, F, Fut>(&self, limit: Duration, f: F) -> Result<Option<T>>
    where
        T: 'static,
        F: FnOnce(Cx) -> Fut + 'static,
        Fut: Future<Output = Result<T>> + 'static,
    {
        self.first_of(
            move |cx: Cx| async move {
                cx.wait(limit).await?;
                Ok(None)
            },
            move |cx: Cx| async move { f(cx).await.map(Some) },
        )
        .await
    }

    /// Runs `action`; if it fails with the Cancel error, runs `handler`
    /// to produce the result instead.
    ///
    /// Cancellation is recovered into a normal return; any other error
    /// propagates unchanged.
    pub async fn on_cancel<T, H, HFut, F, Fut>(&self, handler: H, action: F) -> Result<T>
    where
        H: FnOnce(Cx) -> HFut,
        HFut: Future<Output = Result<T>>,
        F: FnOnce(Cx) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        match action(self.clone()).await {
            Err(e) if e.is_cancelled() => handler(self.clone()).await,
            other => other,
        }
    }
}
