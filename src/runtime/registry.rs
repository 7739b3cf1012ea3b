//! The live-await registry.
//!
//! The registry is the root handler's authoritative record of which
//! awaits may still resume. Membership is checked on every callback
//! delivery: a callback arriving for a wid that is no longer present is
//! dropped silently. This is the only safe semantics — a host timer may
//! fire after its owner was cancelled, or after an interleaved sibling
//! already completed the await.

use crate::cx::scope::CancelScope;
use crate::types::Wid;
use std::rc::Rc;

/// One live await: the wid, the closure that delivers cancellation to
/// it, and the scope chain that recorded it.
struct RegistryEntry {
    wid: Wid,
    canceller: Rc<dyn Fn()>,
    scopes: Vec<Rc<CancelScope>>,
}

/// Insertion-ordered set of live awaits.
#[derive(Default)]
pub(crate) struct AwaitRegistry {
    entries: Vec<RegistryEntry>,
}

impl AwaitRegistry {
    pub(crate) fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Returns true if `wid` may still resume.
    pub(crate) fn contains(&self, wid: Wid) -> bool {
        self.entries.iter().any(|e| e.wid == wid)
    }

    /// Registers a live await. [`Wid::EXIT`] is never registered, which
    /// is exactly what makes exited strands unresumable.
    pub(crate) fn register(
        &mut self,
        wid: Wid,
        canceller: Rc<dyn Fn()>,
        scopes: Vec<Rc<CancelScope>>,
    ) {
        if wid.is_exit() {
            return;
        }
        for scope in &scopes {
            scope.record(wid);
        }
        self.entries.push(RegistryEntry {
            wid,
            canceller,
            scopes,
        });
    }

    /// Removes a completed or cancelled await, clearing its scope
    /// recordings along the way.
    pub(crate) fn remove(&mut self, wid: Wid) {
        let Some(index) = self.entries.iter().position(|e| e.wid == wid) else {
            return;
        };
        let entry = self.entries.remove(index);
        for scope in &entry.scopes {
            scope.forget(wid);
        }
    }

    /// Returns the cancellation closure for a live wid.
    pub(crate) fn canceller_for(&self, wid: Wid) -> Option<Rc<dyn Fn()>> {
        self.entries
            .iter()
            .find(|e| e.wid == wid)
            .map(|e| Rc::clone(&e.canceller))
    }

    /// All live wids in insertion order.
    pub(crate) fn live_wids(&self) -> Vec<Wid> {
        self.entries.iter().map(|e| e.wid).collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn noop() -> Rc<dyn Fn()> {
        Rc::new(|| {})
    }

    #[test]
    fn exit_is_never_registered() {
        let mut registry = AwaitRegistry::new();
        registry.register(Wid::EXIT, noop(), Vec::new());
        assert!(!registry.contains(Wid::EXIT));
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn register_records_in_scopes_and_remove_clears() {
        let mut registry = AwaitRegistry::new();
        let outer = CancelScope::child(None);
        let inner = CancelScope::child(Some(Rc::clone(&outer)));
        let wid = Wid::from_raw(1);

        registry.register(wid, noop(), vec![Rc::clone(&inner), Rc::clone(&outer)]);
        assert!(registry.contains(wid));
        assert_eq!(inner.snapshot(), vec![wid]);
        assert_eq!(outer.snapshot(), vec![wid]);

        registry.remove(wid);
        assert!(!registry.contains(wid));
        assert!(inner.snapshot().is_empty());
        assert!(outer.snapshot().is_empty());
    }

    #[test]
    fn canceller_lookup() {
        let mut registry = AwaitRegistry::new();
        let fired = Rc::new(Cell::new(false));
        let canceller = {
            let fired = Rc::clone(&fired);
            Rc::new(move || fired.set(true)) as Rc<dyn Fn()>
        };
        let wid = Wid::from_raw(2);
        registry.register(wid, canceller, Vec::new());

        registry
            .canceller_for(wid)
            .expect("wid should be live")();
        assert!(fired.get());
        assert!(registry.canceller_for(Wid::from_raw(99)).is_none());
    }

    #[test]
    fn live_wids_preserve_insertion_order() {
        let mut registry = AwaitRegistry::new();
        for tag in [5, 1, 3] {
            registry.register(Wid::from_raw(tag), noop(), Vec::new());
        }
        assert_eq!(
            registry.live_wids(),
            vec![Wid::from_raw(5), Wid::from_raw(1), Wid::from_raw(3)]
        );
    }
}
