//! The capability context type.
//!
//! `Cx` is the token that grants a strand access to the runtime's
//! capabilities: minting wids, suspending on awaits, cancelling, forking
//! sibling strands, and exiting. Every effectful operation in the crate
//! flows through a `Cx`; there is no ambient authority.
//!
//! The handler layering of the underlying model is carried as data: a
//! `Cx` holds a weak runtime reference (the root handler) and the
//! innermost cancel scope (the nearest `cancelable` boundary, if any).
//! Cloning is cheap; clones of the same strand's `Cx` share scope and
//! identity.

use crate::cx::await_op::{AwaitFuture, Completer};
use crate::cx::scope::CancelScope;
use crate::error::{Error, ErrorKind, Result};
use crate::runtime::RuntimeShared;
use crate::sync::JoinHandle;
use crate::sync::Promise;
use crate::tracing_compat::{debug, error};
use crate::types::{StrandId, Wid};
use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::rc::{Rc, Weak};
use std::task::{Context, Poll};

/// The capability context for a strand.
///
/// A `Cx` is handed to every strand body by the runtime (or by the
/// combinator that spawned it). It provides:
///
/// - **Awaiting**: [`await_with`](Cx::await_with) and the wrapper
///   family turn host callbacks into direct-style suspensions.
/// - **Cancellation**: [`cancel`](Cx::cancel) delivers the canonical
///   Cancel error to every pending await in the innermost
///   [`cancelable`](Cx::cancelable) scope.
/// - **Forking**: [`fork`](Cx::fork) and [`spawn`](Cx::spawn) start
///   sibling strands on the same single-threaded runtime.
/// - **Exit**: [`exit`](Cx::exit) terminates the strand silently.
pub struct Cx {
    pub(crate) shared: Weak<RuntimeShared>,
    pub(crate) strand: StrandId,
    pub(crate) scope: Option<Rc<CancelScope>>,
}

impl Clone for Cx {
    fn clone(&self) -> Self {
        Self {
            shared: Weak::clone(&self.shared),
            strand: self.strand,
            scope: self.scope.clone(),
        }
    }
}

impl std::fmt::Debug for Cx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cx")
            .field("strand", &self.strand)
            .field("scoped", &self.scope.is_some())
            .finish()
    }
}

impl Cx {
    pub(crate) fn new(
        shared: Weak<RuntimeShared>,
        strand: StrandId,
        scope: Option<Rc<CancelScope>>,
    ) -> Self {
        Self {
            shared,
            strand,
            scope,
        }
    }

    pub(crate) fn shared(&self) -> Result<Rc<RuntimeShared>> {
        self.shared.upgrade().ok_or_else(|| {
            Error::new(ErrorKind::RuntimeGone).with_context("runtime has been dropped")
        })
    }

    /// The id of the strand this context belongs to.
    #[must_use]
    pub fn strand_id(&self) -> StrandId {
        self.strand
    }

    /// Mints a fresh wid. Pure allocation; never suspends.
    ///
    /// After runtime teardown this returns [`Wid::EXIT`], on which no
    /// await can ever resume.
    #[must_use]
    pub fn await_id(&self) -> Wid {
        self.shared
            .upgrade()
            .map_or(Wid::EXIT, |shared| shared.wids.alloc())
    }

    /// The raw await operation.
    ///
    /// Registers `wid` as pending (unless it is [`Wid::EXIT`]), then
    /// calls `setup` exactly once with the [`Completer`] that host code
    /// uses to deliver the result. The returned future resolves with
    /// the final outcome — the first delivery whose done flag is
    /// effectively true. `resume_count` is the number of resolutions
    /// before done is implied; host APIs that flag completion
    /// themselves use [`Completer::settle`].
    pub fn await_with<T: 'static>(
        &self,
        wid: Wid,
        resume_count: u32,
        setup: impl FnOnce(Completer<T>) + 'static,
    ) -> AwaitFuture<T> {
        AwaitFuture::new(
            Weak::clone(&self.shared),
            self.scope.clone(),
            wid,
            resume_count,
            Box::new(setup),
        )
    }

    /// Cancels every pending await in the innermost cancelable scope,
    /// or everything registered in the runtime when no scope encloses
    /// this context.
    ///
    /// Each targeted await is delivered the canonical Cancel error
    /// exactly once; awaits that already completed are unaffected, so
    /// repeated calls are no-ops. `cancel` itself never fails and never
    /// suspends.
    pub fn cancel(&self) {
        let targets = match (&self.scope, self.shared.upgrade()) {
            (Some(scope), _) => scope.snapshot(),
            (None, Some(shared)) => shared.state.borrow().registry.live_wids(),
            (None, None) => Vec::new(),
        };
        self.cancel_wids(&targets);
    }

    /// Cancels exactly the listed wids, pending ones only.
    pub fn cancel_wids(&self, targets: &[Wid]) {
        let Some(shared) = self.shared.upgrade() else {
            return;
        };
        for &wid in targets {
            let canceller = shared.state.borrow().registry.canceller_for(wid);
            if let Some(canceller) = canceller {
                debug!(wid = %wid, "cancelling await");
                canceller();
            }
        }
    }

    /// Runs `f` under a new cancellation boundary.
    ///
    /// Awaits started inside (including by strands forked inside) are
    /// recorded in the new scope; a `cancel()` from within reaches only
    /// them, not work belonging to outer scopes.
    pub fn cancelable<F, Fut>(&self, f: F) -> Fut
    where
        F: FnOnce(Cx) -> Fut,
    {
        f(self.scoped_child())
    }

    pub(crate) fn scoped_child(&self) -> Cx {
        Cx {
            shared: Weak::clone(&self.shared),
            strand: self.strand,
            scope: Some(CancelScope::child(self.scope.clone())),
        }
    }

    /// Starts a sibling strand and returns a handle to its result.
    ///
    /// The strand inherits this context's cancel scope. It begins
    /// running once the current strand next suspends.
    pub fn spawn<T, F, Fut>(&self, f: F) -> Result<JoinHandle<T>>
    where
        T: 'static,
        F: FnOnce(Cx) -> Fut + 'static,
        Fut: Future<Output = Result<T>> + 'static,
    {
        let shared = self.shared()?;
        let cell = Rc::new(RefCell::new(None));
        let done = Promise::new();
        let handle = JoinHandle::new(Rc::clone(&cell), done.clone());
        shared.spawn_strand(self.scope.clone(), move |cx| async move {
            let result = f(cx).await;
            *cell.borrow_mut() = Some(result);
            let _ = done.resolve(());
        });
        Ok(handle)
    }

    /// Splits off a fire-and-forget strand.
    ///
    /// The child starts first: it runs to its first suspension before
    /// the parent resumes on the next host tick. Errors in the child
    /// are traced and swallowed; cancellation ends it quietly.
    pub async fn fork<F, Fut>(&self, f: F) -> Result<()>
    where
        F: FnOnce(Cx) -> Fut + 'static,
        Fut: Future<Output = Result<()>> + 'static,
    {
        let shared = self.shared()?;
        shared.spawn_strand(self.scope.clone(), move |cx| async move {
            if let Err(e) = f(cx).await {
                if e.is_cancelled() {
                    debug!("forked strand cancelled");
                } else {
                    error!(error = %e, "forked strand failed");
                }
            }
        });
        self.yield_now().await
    }

    /// Terminates the current strand silently.
    ///
    /// The returned future suspends on [`Wid::EXIT`] and never resumes;
    /// the runtime reaps the strand on its next turn. Values and errors
    /// are not produced — the strand simply stops.
    #[must_use]
    pub fn exit(&self) -> Exit {
        Exit {
            shared: Weak::clone(&self.shared),
            strand: self.strand,
        }
    }
}

/// Future returned by [`Cx::exit`]. Never resolves.
pub struct Exit {
    shared: Weak<RuntimeShared>,
    strand: StrandId,
}

impl Future for Exit {
    type Output = ();

    fn poll(self: Pin<&mut Self>, _task_cx: &mut Context<'_>) -> Poll<Self::Output> {
        if let Some(shared) = self.shared.upgrade() {
            shared.mark_exited(self.strand);
        }
        Poll::Pending
    }
}
