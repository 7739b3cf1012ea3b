//! Strand wakers.
//!
//! Waking a strand pushes its id onto the shared ready queue; the
//! runtime drains that queue on the current thread. The queue is the
//! only piece of state a waker touches, which keeps wakers `Send + Sync`
//! while the rest of the runtime stays single-threaded.

use crate::types::StrandId;
use crossbeam_queue::SegQueue;
use std::sync::Arc;
use std::task::{Wake, Waker};

/// The FIFO queue of strands due for polling.
#[derive(Debug, Default)]
pub(crate) struct ReadyQueue {
    queue: SegQueue<StrandId>,
}

impl ReadyQueue {
    pub(crate) fn new() -> Self {
        Self {
            queue: SegQueue::new(),
        }
    }

    pub(crate) fn push(&self, strand: StrandId) {
        self.queue.push(strand);
    }

    pub(crate) fn pop(&self) -> Option<StrandId> {
        self.queue.pop()
    }
}

struct StrandWaker {
    strand: StrandId,
    ready: Arc<ReadyQueue>,
}

impl Wake for StrandWaker {
    fn wake(self: Arc<Self>) {
        self.ready.push(self.strand);
    }

    fn wake_by_ref(self: &Arc<Self>) {
        self.ready.push(self.strand);
    }
}

/// Builds a waker that re-queues `strand` when woken.
pub(crate) fn waker_for(strand: StrandId, ready: Arc<ReadyQueue>) -> Waker {
    Waker::from(Arc::new(StrandWaker { strand, ready }))
}
