//! Waiting, yielding, and cancelable timers.
//!
//! Three tiers, chosen by [`Cx::wait`]:
//!
//! - zero → one host immediate ([`Cx::yield_now`]);
//! - short → one fire-and-forget timer ([`Cx::yield_for`]) — not worth
//!   the cancel bookkeeping, a late firing is dropped by the registry;
//! - long (above the configured threshold, 200 ms by default) →
//!   [`Cx::cancelable_wait`], which tracks the host timer id and clears
//!   it on every exit path, including cancellation.

use crate::cx::Cx;
use crate::error::Result;
use crate::host::TimerHost;
use crate::types::TimerId;
use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

/// Clears a held host timer when dropped.
///
/// Pairs timer creation with `clear_timeout` so the release runs on
/// every exit path — normal expiry (where clearing is an idempotent
/// no-op), error, and cancellation.
struct TimerGuard {
    host: Rc<dyn TimerHost>,
    slot: Rc<Cell<Option<TimerId>>>,
}

impl TimerGuard {
    fn new(host: Rc<dyn TimerHost>) -> Self {
        Self {
            host,
            slot: Rc::new(Cell::new(None)),
        }
    }

    fn slot(&self) -> Rc<Cell<Option<TimerId>>> {
        Rc::clone(&self.slot)
    }
}

impl Drop for TimerGuard {
    fn drop(&mut self) {
        if let Some(id) = self.slot.take() {
            self.host.clear_timeout(id);
        }
    }
}

impl Cx {
    /// Suspends for one host tick.
    pub async fn yield_now(&self) -> Result<()> {
        let host = Rc::clone(&self.shared()?.host);
        self.await_unit(move |completer| {
            host.set_immediate(Box::new(move || completer.resolve(())));
        })
        .await
    }

    /// Suspends on a one-shot, fire-and-forget host timer.
    ///
    /// The timer is never cleared; if this await is cancelled first,
    /// the eventual firing is dropped by the registry membership test.
    pub async fn yield_for(&self, delay: Duration) -> Result<()> {
        let host = Rc::clone(&self.shared()?.host);
        self.await_unit(move |completer| {
            let _ = host.set_timeout(delay, Box::new(move || completer.resolve(())));
        })
        .await
    }

    /// Suspends on a host timer whose id is tracked for cleanup.
    ///
    /// When the wait ends — expiry, error, or cancellation — the timer
    /// is cleared, so no pending host timer attributable to this call
    /// remains.
    pub async fn cancelable_wait(&self, delay: Duration) -> Result<()> {
        let host = Rc::clone(&self.shared()?.host);
        let guard = TimerGuard::new(Rc::clone(&host));
        let armed = guard.slot();
        let result = self
            .await_unit(move |completer| {
                let id = host.set_timeout(delay, Box::new(move || completer.resolve(())));
                armed.set(Some(id));
            })
            .await;
        drop(guard);
        result
    }

    /// Tiered wait: immediate for zero, plain timer for short delays,
    /// cancelable timer above the configured threshold.
    pub async fn wait(&self, delay: Duration) -> Result<()> {
        let threshold = self.shared()?.config.cancelable_wait_threshold;
        if delay > threshold {
            self.cancelable_wait(delay).await
        } else if delay.is_zero() {
            self.yield_now().await
        } else {
            self.yield_for(delay).await
        }
    }
}
