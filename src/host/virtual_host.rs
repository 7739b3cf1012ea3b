//! Deterministic host with a virtual clock.
//!
//! `VirtualHost` implements [`TimerHost`] over virtual time: nothing
//! fires until the test advances the clock, and expiration order is
//! fully deterministic — by deadline, then by scheduling order. This is
//! what makes the integration suites reproducible.

use super::{HostCallback, TimerHost};
use crate::types::{Time, TimerId};
use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet, VecDeque};
use std::rc::Rc;
use std::time::Duration;

/// A pending virtual timer.
struct TimerEntry {
    deadline: Time,
    seq: u64,
    id: TimerId,
    callback: HostCallback,
}

impl Eq for TimerEntry {}

impl PartialEq for TimerEntry {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.seq == other.seq
    }
}

impl Ord for TimerEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap ordering: earliest deadline first, then scheduling order.
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for TimerEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

struct HostState {
    now: Time,
    next_seq: u64,
    timers: BinaryHeap<TimerEntry>,
    cancelled: HashSet<TimerId>,
    immediates: VecDeque<HostCallback>,
}

impl HostState {
    fn pop_due(&mut self, target: Time) -> Option<TimerEntry> {
        loop {
            let due = self
                .timers
                .peek()
                .is_some_and(|top| top.deadline <= target);
            if !due {
                return None;
            }
            let entry = self.timers.pop()?;
            if self.cancelled.remove(&entry.id) {
                continue;
            }
            self.now = entry.deadline;
            return Some(entry);
        }
    }
}

/// A deterministic [`TimerHost`] driven by a virtual clock.
///
/// Cloning is cheap and clones share the same clock and timer set.
///
/// # Example
///
/// ```
/// use weft::host::{TimerHost, VirtualHost};
/// use std::time::Duration;
///
/// let host = VirtualHost::new();
/// let id = host.set_timeout(Duration::from_millis(5), Box::new(|| {}));
/// assert_eq!(host.pending_timers(), 1);
/// host.clear_timeout(id);
/// assert_eq!(host.pending_timers(), 0);
/// ```
#[derive(Clone)]
pub struct VirtualHost {
    state: Rc<RefCell<HostState>>,
}

impl Default for VirtualHost {
    fn default() -> Self {
        Self::new()
    }
}

impl VirtualHost {
    /// Creates a host with the clock at [`Time::ZERO`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(HostState {
                now: Time::ZERO,
                next_seq: 0,
                timers: BinaryHeap::new(),
                cancelled: HashSet::new(),
                immediates: VecDeque::new(),
            })),
        }
    }

    /// Returns the current virtual time.
    #[must_use]
    pub fn now(&self) -> Time {
        self.state.borrow().now
    }

    /// Returns the number of pending (non-cancelled) timers.
    #[must_use]
    pub fn pending_timers(&self) -> usize {
        let state = self.state.borrow();
        state
            .timers
            .iter()
            .filter(|t| !state.cancelled.contains(&t.id))
            .count()
    }

    /// Returns the number of queued immediates.
    #[must_use]
    pub fn pending_immediates(&self) -> usize {
        self.state.borrow().immediates.len()
    }

    /// Returns the deadline of the earliest pending timer, if any.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Time> {
        let state = self.state.borrow();
        state
            .timers
            .iter()
            .filter(|t| !state.cancelled.contains(&t.id))
            .map(|t| t.deadline)
            .min()
    }

    /// Runs the immediates queued at the time of the call.
    ///
    /// Immediates scheduled by the callbacks themselves land on the next
    /// tick, as a host event loop would have it. Returns the number of
    /// callbacks run.
    pub fn tick(&self) -> usize {
        let batch = std::mem::take(&mut self.state.borrow_mut().immediates);
        let count = batch.len();
        for callback in batch {
            callback();
        }
        count
    }

    /// Advances the clock to `target`, firing every due timer in
    /// deterministic order.
    ///
    /// The clock steps to each due deadline in turn; immediates scheduled
    /// by a fired callback run before the next timer fires.
    pub fn advance_to(&self, target: Time) {
        loop {
            let entry = self.state.borrow_mut().pop_due(target);
            match entry {
                Some(entry) => {
                    (entry.callback)();
                    while self.tick() > 0 {}
                }
                None => break,
            }
        }
        let mut state = self.state.borrow_mut();
        if state.now < target {
            state.now = target;
        }
    }

    /// Advances the clock by `delta`. See [`advance_to`](Self::advance_to).
    pub fn advance(&self, delta: Duration) {
        let target = self.now() + delta;
        self.advance_to(target);
    }
}

impl TimerHost for VirtualHost {
    fn set_timeout(&self, delay: Duration, callback: HostCallback) -> TimerId {
        let mut state = self.state.borrow_mut();
        let seq = state.next_seq;
        state.next_seq += 1;
        let id = TimerId::from_raw(seq);
        let deadline = state.now + delay;
        state.timers.push(TimerEntry {
            deadline,
            seq,
            id,
            callback,
        });
        id
    }

    fn clear_timeout(&self, id: TimerId) {
        let mut state = self.state.borrow_mut();
        let pending = state.timers.iter().any(|t| t.id == id);
        if pending {
            state.cancelled.insert(id);
        }
    }

    fn set_immediate(&self, callback: HostCallback) {
        self.state.borrow_mut().immediates.push_back(callback);
    }
}
