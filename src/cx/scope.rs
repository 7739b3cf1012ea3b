//! Cancellation scopes.
//!
//! A scope records every wid whose await started underneath it. Scopes
//! nest by parent pointers: registering an await records its wid in the
//! whole enclosing chain, so an outer scope's cancel still reaches work
//! started in an inner one, while `cancel()` with no explicit targets
//! narrows to the innermost scope alone.

use crate::types::Wid;
use std::cell::RefCell;
use std::rc::Rc;

/// One level of the cancellation-scope chain.
pub(crate) struct CancelScope {
    parent: Option<Rc<CancelScope>>,
    local: RefCell<Vec<Wid>>,
}

impl CancelScope {
    /// Creates a scope nested under `parent`.
    pub(crate) fn child(parent: Option<Rc<CancelScope>>) -> Rc<Self> {
        Rc::new(Self {
            parent,
            local: RefCell::new(Vec::new()),
        })
    }

    /// Records a wid started under this scope.
    pub(crate) fn record(&self, wid: Wid) {
        self.local.borrow_mut().push(wid);
    }

    /// Forgets a wid whose await has completed.
    pub(crate) fn forget(&self, wid: Wid) {
        self.local.borrow_mut().retain(|w| *w != wid);
    }

    /// Returns the wids currently recorded in this scope.
    pub(crate) fn snapshot(&self) -> Vec<Wid> {
        self.local.borrow().clone()
    }
}

/// Collects a scope chain from innermost to outermost.
pub(crate) fn chain(scope: Option<&Rc<CancelScope>>) -> Vec<Rc<CancelScope>> {
    let mut scopes = Vec::new();
    let mut cursor = scope.cloned();
    while let Some(current) = cursor {
        cursor = current.parent.clone();
        scopes.push(current);
    }
    scopes
}
