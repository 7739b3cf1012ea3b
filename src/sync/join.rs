//! Join handles for spawned strands.

use crate::cx::Cx;
use crate::error::{Error, ErrorKind, Result};
use crate::sync::Promise;
use std::cell::RefCell;
use std::rc::Rc;

/// A handle to the result of a strand started with [`Cx::spawn`].
///
/// The strand writes its result into a shared cell and resolves a
/// completion promise; `join` awaits that promise and takes the result.
/// Joining is itself an await — it participates in cancellation like
/// any other suspension.
pub struct JoinHandle<T> {
    cell: Rc<RefCell<Option<Result<T>>>>,
    done: Promise<()>,
}

impl<T: 'static> JoinHandle<T> {
    pub(crate) fn new(cell: Rc<RefCell<Option<Result<T>>>>, done: Promise<()>) -> Self {
        Self { cell, done }
    }

    /// Returns true once the strand has finished.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.done.is_resolved()
    }

    /// Waits for the strand to finish and returns its result.
    ///
    /// # Errors
    ///
    /// Propagates the strand's own error, or the Cancel error if this
    /// join await is cancelled while the strand is still running.
    pub async fn join(self, cx: &Cx) -> Result<T> {
        self.done.recv(cx).await?;
        match self.cell.borrow_mut().take() {
            Some(result) => result,
            None => {
                Err(Error::new(ErrorKind::Internal).with_context("strand finished without result"))
            }
        }
    }
}

impl<T> std::fmt::Debug for JoinHandle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "JoinHandle(finished: {})", self.done.is_resolved())
    }
}
