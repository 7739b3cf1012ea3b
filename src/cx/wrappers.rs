//! Callback-to-direct-style await wrappers.
//!
//! Every wrapper allocates a fresh wid, performs the raw await
//! operation, and returns the stripped outcome. They differ only in how
//! the host is expected to drive the [`Completer`]:
//!
//! - [`await_unit`](Cx::await_unit) — host calls `resolve(())` once.
//! - [`await_value`](Cx::await_value) — host calls `resolve(v)` once.
//! - [`await_counted`](Cx::await_counted) — host resolves `resume_count`
//!   times; the final resolution completes the await.
//! - [`await_outcome`](Cx::await_outcome) — host calls
//!   [`Completer::settle`] with an explicit outcome and done flag.
//!
//! Hosts whose callbacks carry a nullable error use
//! [`Completer::finish`] / [`Completer::finish_unit`] with any of the
//! wrappers above.

use crate::cx::await_op::Completer;
use crate::cx::cx::Cx;
use crate::error::Result;

impl Cx {
    /// Awaits a unit-valued host callback.
    pub async fn await_unit(&self, setup: impl FnOnce(Completer<()>) + 'static) -> Result<()> {
        self.await_with(self.await_id(), 1, setup).await
    }

    /// Awaits a single-valued host callback.
    pub async fn await_value<T: 'static>(
        &self,
        setup: impl FnOnce(Completer<T>) + 'static,
    ) -> Result<T> {
        self.await_with(self.await_id(), 1, setup).await
    }

    /// Awaits a host callback that resolves `resume_count` times before
    /// the await completes.
    ///
    /// Host APIs sometimes invoke their callback more than once — for
    /// instance a synchronous acknowledgement followed by the real
    /// completion. Intermediate resolutions refresh the pending value
    /// without resuming the strand; the final one completes the await.
    pub async fn await_counted<T: 'static>(
        &self,
        resume_count: u32,
        setup: impl FnOnce(Completer<T>) + 'static,
    ) -> Result<T> {
        self.await_with(self.await_id(), resume_count, setup).await
    }

    /// Awaits a host callback that reports an explicit outcome and
    /// completion flag via [`Completer::settle`].
    pub async fn await_outcome<T: 'static>(
        &self,
        setup: impl FnOnce(Completer<T>) + 'static,
    ) -> Result<T> {
        self.await_with(self.await_id(), 1, setup).await
    }
}
