//! The await operation.
//!
//! An [`AwaitFuture`] suspends its strand until a host callback delivers
//! a result through the paired [`Completer`]. Registration, the
//! late-callback drop rule, the sticky done flag, and cancellation
//! delivery all live here; every higher-level suspension in the crate
//! bottoms out in this type.

use crate::cx::scope::{self, CancelScope};
use crate::error::{Error, ErrorKind, Result};
use crate::runtime::RuntimeShared;
use crate::tracing_compat::trace;
use crate::types::Wid;
use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::rc::{Rc, Weak};
use std::task::{Context, Poll, Waker};

/// Shared slot between an [`AwaitFuture`] and its [`Completer`]s.
struct AwaitSlot<T> {
    result: Option<Result<T>>,
    /// Sticky: once set, no further delivery may resume the strand.
    done: bool,
    /// Resolutions remaining before `done` is implied.
    remaining: u32,
    waker: Option<Waker>,
}

/// The host-invocable side of one await.
///
/// A completer may be cloned freely and invoked from any host callback.
/// Every delivery is checked against the runtime's registry first: once
/// the await has completed or been cancelled, further deliveries are
/// dropped silently. The registry membership test is authoritative — a
/// completer's own state is never trusted alone, because several layers
/// may wrap the same logical callback.
pub struct Completer<T> {
    wid: Wid,
    slot: Rc<RefCell<AwaitSlot<T>>>,
    shared: Weak<RuntimeShared>,
}

impl<T> Clone for Completer<T> {
    fn clone(&self) -> Self {
        Self {
            wid: self.wid,
            slot: Rc::clone(&self.slot),
            shared: Weak::clone(&self.shared),
        }
    }
}

impl<T> Completer<T> {
    /// The wid this completer resumes.
    #[must_use]
    pub fn wid(&self) -> Wid {
        self.wid
    }

    /// Delivers a success value, consuming one resumption. The await
    /// completes when the resumption count reaches zero.
    pub fn resolve(&self, value: T) {
        self.deliver(Ok(value), None);
    }

    /// Delivers an error. Errors always force completion.
    pub fn reject(&self, error: Error) {
        self.deliver(Err(error), Some(true));
    }

    /// Delivers an outcome with an explicit done flag, for host APIs
    /// that decide completion themselves. An `Err` outcome forces
    /// `done` regardless of the flag.
    pub fn settle(&self, outcome: Result<T>, done: bool) {
        self.deliver(outcome, Some(done));
    }

    /// Delivers a nullable-error callback result: `Some(error)` rejects,
    /// `None` resolves with `value`.
    pub fn finish(&self, error: Option<Error>, value: T) {
        match error {
            Some(error) => self.reject(error),
            None => self.resolve(value),
        }
    }

    fn deliver(&self, outcome: Result<T>, explicit_done: Option<bool>) {
        let Some(shared) = self.shared.upgrade() else {
            return;
        };
        {
            let state = shared.state.borrow();
            if !state.registry.contains(self.wid) {
                if shared.config.trace_dropped_callbacks {
                    trace!(wid = %self.wid, "late callback dropped");
                }
                return;
            }
        }
        let (done, waker) = {
            let mut slot = self.slot.borrow_mut();
            if slot.done {
                return;
            }
            let counted_out = match explicit_done {
                Some(done) => done,
                None => {
                    slot.remaining = slot.remaining.saturating_sub(1);
                    slot.remaining == 0
                }
            };
            let done = counted_out || outcome.is_err();
            slot.result = Some(outcome);
            slot.done = done;
            let waker = if done {
                slot.waker.take()
            } else {
                slot.waker.clone()
            };
            (done, waker)
        };
        if done {
            shared.state.borrow_mut().registry.remove(self.wid);
        }
        if let Some(waker) = waker {
            waker.wake();
        }
    }
}

impl Completer<()> {
    /// Unit-value form of [`finish`](Self::finish).
    pub fn finish_unit(&self, error: Option<Error>) {
        self.finish(error, ());
    }
}

/// One suspension of a strand, waiting for its callback.
///
/// Created by [`Cx::await_with`](crate::Cx::await_with) and the C8-style
/// wrappers on `Cx`. On first poll it registers the wid, records it in
/// every enclosing cancel scope, and runs the setup function exactly
/// once with a fresh [`Completer`]. It resolves with the final (`done`)
/// outcome; if dropped before completion it deregisters itself.
pub struct AwaitFuture<T> {
    shared: Weak<RuntimeShared>,
    scope: Option<Rc<CancelScope>>,
    wid: Wid,
    setup: Option<Box<dyn FnOnce(Completer<T>)>>,
    slot: Rc<RefCell<AwaitSlot<T>>>,
    started: bool,
    finished: bool,
}

impl<T> AwaitFuture<T> {
    pub(crate) fn new(
        shared: Weak<RuntimeShared>,
        scope: Option<Rc<CancelScope>>,
        wid: Wid,
        resume_count: u32,
        setup: Box<dyn FnOnce(Completer<T>)>,
    ) -> Self {
        Self {
            shared,
            scope,
            wid,
            setup: Some(setup),
            slot: Rc::new(RefCell::new(AwaitSlot {
                result: None,
                done: false,
                remaining: resume_count.max(1),
                waker: None,
            })),
            started: false,
            finished: false,
        }
    }

    /// The wid this await suspends on.
    #[must_use]
    pub fn wid(&self) -> Wid {
        self.wid
    }
}

impl<T: 'static> Future for AwaitFuture<T> {
    type Output = Result<T>;

    fn poll(self: Pin<&mut Self>, task_cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        if this.finished {
            return Poll::Pending;
        }
        if !this.started {
            this.started = true;
            let Some(shared) = this.shared.upgrade() else {
                this.finished = true;
                return Poll::Ready(Err(Error::new(ErrorKind::RuntimeGone)
                    .with_context("await issued after runtime teardown")));
            };
            this.slot.borrow_mut().waker = Some(task_cx.waker().clone());
            let completer = Completer {
                wid: this.wid,
                slot: Rc::clone(&this.slot),
                shared: Rc::downgrade(&shared),
            };
            if !this.wid.is_exit() {
                let canceller: Rc<dyn Fn()> = {
                    let completer = completer.clone();
                    Rc::new(move || completer.deliver(Err(Error::cancel()), Some(true)))
                };
                let scopes = scope::chain(this.scope.as_ref());
                shared
                    .state
                    .borrow_mut()
                    .registry
                    .register(this.wid, canceller, scopes);
            }
            if let Some(setup) = this.setup.take() {
                setup(completer);
            }
        }
        let mut slot = this.slot.borrow_mut();
        if slot.done {
            if let Some(result) = slot.result.take() {
                drop(slot);
                this.finished = true;
                return Poll::Ready(result);
            }
        }
        slot.waker = Some(task_cx.waker().clone());
        Poll::Pending
    }
}

impl<T> Drop for AwaitFuture<T> {
    fn drop(&mut self) {
        if !self.started || self.finished || self.wid.is_exit() {
            return;
        }
        if let Some(shared) = self.shared.upgrade() {
            if let Ok(mut state) = shared.state.try_borrow_mut() {
                state.registry.remove(self.wid);
            }
        }
    }
}
