//! The host timer interface.
//!
//! The runtime builds everything on two host primitives: deferred
//! callback scheduling (`set_timeout` / `set_immediate`) and callback
//! revocation (`clear_timeout`). Anything that can provide these — an
//! event loop, a GUI toolkit, a test clock — can drive the runtime.

mod virtual_host;

pub use virtual_host::VirtualHost;

use crate::types::TimerId;
use std::time::Duration;

/// A deferred callback handed to the host.
///
/// Hosts invoke callbacks at most once, from their event loop, with
/// run-to-completion semantics: a callback executes without being
/// preempted until it returns. Argument-carrying callback variants of
/// other hosts are subsumed by closure capture.
pub type HostCallback = Box<dyn FnOnce() + 'static>;

/// Deferred callback scheduling and revocation.
///
/// This is the seam between the runtime and its environment. The
/// runtime never spins or sleeps; every suspension bottoms out in one
/// of these scheduling calls.
pub trait TimerHost {
    /// Schedules `callback` to fire once after `delay`.
    ///
    /// Returns a handle that [`clear_timeout`](Self::clear_timeout) accepts.
    fn set_timeout(&self, delay: Duration, callback: HostCallback) -> TimerId;

    /// Revokes a pending timeout.
    ///
    /// Idempotent; clearing an already-fired or already-cleared id is a
    /// no-op.
    fn clear_timeout(&self, id: TimerId);

    /// Schedules `callback` to fire on the next tick of the event loop.
    ///
    /// Hosts without a dedicated immediate queue fall back to a
    /// zero-duration timeout, which this default method provides.
    fn set_immediate(&self, callback: HostCallback) {
        let _ = self.set_timeout(Duration::ZERO, callback);
    }
}
