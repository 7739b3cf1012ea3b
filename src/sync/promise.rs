//! Single-assignment promises.
//!
//! A [`Promise`] is a one-shot cell with any number of listeners. It
//! starts `Pending`, accumulating listeners in arrival order, and moves
//! irreversibly to `Resolved` on the first [`resolve`](Promise::resolve):
//! listeners fire FIFO, from within the resolving call, each receiving
//! the value. Resolving a second time is an error delivered to the
//! resolver — awaiting strands are unaffected and always observe the
//! first value.

use crate::cx::{AwaitFuture, Cx};
use crate::error::{Error, Result};
use std::cell::RefCell;
use std::rc::Rc;

type Listener<T> = Box<dyn FnOnce(&T)>;

enum PromiseInner<T> {
    Pending(Vec<Listener<T>>),
    Resolved(T),
}

/// A single-assignment cell that strands can await.
///
/// Cloning is cheap; clones share the same cell.
///
/// # Example
///
/// ```no_run
/// use weft::{Runtime, sync::Promise, host::VirtualHost};
///
/// let host = VirtualHost::new();
/// let rt = Runtime::new(host.clone());
/// let p: Promise<i32> = Promise::new();
/// let reader = p.clone();
/// rt.spawn(move |cx| async move {
///     let value = reader.recv(&cx).await?;
///     assert_eq!(value, 42);
///     Ok(())
/// });
/// p.resolve(42).unwrap();
/// rt.run_to_completion(&host);
/// ```
pub struct Promise<T> {
    inner: Rc<RefCell<PromiseInner<T>>>,
}

impl<T> Clone for Promise<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> Default for Promise<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Promise<T> {
    /// Creates a pending promise with no listeners.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(PromiseInner::Pending(Vec::new()))),
        }
    }

    /// Returns true once the promise has been resolved.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        matches!(&*self.inner.borrow(), PromiseInner::Resolved(_))
    }
}

impl<T: Clone + 'static> Promise<T> {
    /// Resolves the promise, draining all listeners in FIFO order.
    ///
    /// # Errors
    ///
    /// Returns the already-resolved error if the promise was resolved
    /// before; the stored value is unchanged.
    pub fn resolve(&self, value: T) -> Result<()> {
        let listeners = {
            let mut inner = self.inner.borrow_mut();
            if matches!(&*inner, PromiseInner::Resolved(_)) {
                return Err(Error::already_resolved());
            }
            match std::mem::replace(&mut *inner, PromiseInner::Resolved(value.clone())) {
                PromiseInner::Pending(listeners) => listeners,
                PromiseInner::Resolved(_) => Vec::new(),
            }
        };
        for listener in listeners {
            listener(&value);
        }
        Ok(())
    }

    /// Awaits the promise's value.
    ///
    /// If already resolved, the await completes on the strand's next
    /// turn with the stored value; otherwise the strand suspends until
    /// [`resolve`](Promise::resolve) runs. Multiple strands may await
    /// the same promise; each receives the value.
    pub fn recv(&self, cx: &Cx) -> AwaitFuture<T> {
        let inner = Rc::clone(&self.inner);
        cx.await_with(cx.await_id(), 1, move |completer| {
            let mut guard = inner.borrow_mut();
            match &mut *guard {
                PromiseInner::Resolved(value) => {
                    let value = value.clone();
                    drop(guard);
                    completer.resolve(value);
                }
                PromiseInner::Pending(listeners) => {
                    listeners.push(Box::new(move |value: &T| completer.resolve(value.clone())));
                }
            }
        })
    }
}

impl<T> std::fmt::Debug for Promise<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match &*self.inner.borrow() {
            PromiseInner::Pending(listeners) => format!("Pending({} listeners)", listeners.len()),
            PromiseInner::Resolved(_) => "Resolved".to_string(),
        };
        write!(f, "Promise({state})")
    }
}
