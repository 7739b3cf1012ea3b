//! The single-threaded cooperative runtime.
//!
//! A [`Runtime`] owns the strand table, the live-await registry, and a
//! FIFO ready queue. Strands are plain futures; a strand runs from wake
//! to its next suspension without preemption, exactly as host callbacks
//! do. Nothing here ever runs in parallel with anything else — the
//! entire crate relies on the host's run-to-completion dispatch.

mod config;
mod registry;
mod waker;

pub use config::{
    RuntimeConfig, ENV_CANCELABLE_WAIT_THRESHOLD_MS, ENV_TRACE_DROPPED_CALLBACKS,
};

pub(crate) use registry::AwaitRegistry;

use crate::cx::scope::CancelScope;
use crate::cx::Cx;
use crate::error::Result;
use crate::host::{TimerHost, VirtualHost};
use crate::tracing_compat::{error, trace};
use crate::types::{StrandId, Time, WidAllocator};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::sync::Arc;
use std::task::Context;
use std::time::Duration;
use waker::{waker_for, ReadyQueue};

type StrandFuture = Pin<Box<dyn Future<Output = ()> + 'static>>;

struct StrandSlot {
    /// Taken out while the strand is being polled.
    future: Option<StrandFuture>,
}

pub(crate) struct RuntimeState {
    pub(crate) registry: AwaitRegistry,
    strands: HashMap<StrandId, StrandSlot>,
    exited: HashSet<StrandId>,
    next_strand: u64,
}

/// State shared between the runtime, its contexts, and its completers.
pub(crate) struct RuntimeShared {
    pub(crate) state: RefCell<RuntimeState>,
    pub(crate) host: Rc<dyn TimerHost>,
    pub(crate) ready: Arc<ReadyQueue>,
    pub(crate) config: RuntimeConfig,
    pub(crate) wids: WidAllocator,
}

impl RuntimeShared {
    pub(crate) fn spawn_strand<F, Fut>(self: &Rc<Self>, scope: Option<Rc<CancelScope>>, f: F) -> StrandId
    where
        F: FnOnce(Cx) -> Fut,
        Fut: Future<Output = ()> + 'static,
    {
        let id = {
            let mut state = self.state.borrow_mut();
            let id = StrandId::from_raw(state.next_strand);
            state.next_strand += 1;
            id
        };
        let cx = Cx::new(Rc::downgrade(self), id, scope);
        let future: StrandFuture = Box::pin(f(cx));
        self.state.borrow_mut().strands.insert(
            id,
            StrandSlot {
                future: Some(future),
            },
        );
        self.ready.push(id);
        trace!(strand = %id, "strand spawned");
        id
    }

    pub(crate) fn mark_exited(&self, strand: StrandId) {
        self.state.borrow_mut().exited.insert(strand);
    }

    fn take_future(&self, strand: StrandId) -> Option<StrandFuture> {
        let mut state = self.state.borrow_mut();
        state
            .strands
            .get_mut(&strand)
            .and_then(|slot| slot.future.take())
    }
}

/// The root handler: owns the registry and runs strands.
///
/// Each `Runtime` is an independent world — registry, wid allocator,
/// and strand table are all per-instance, so parallel top-level
/// runtimes never interfere.
///
/// # Driving
///
/// The runtime does not poll the host.
/// [`run_until_stalled`](Runtime::run_until_stalled) drains strands
/// that are already ready; the host fires callbacks (which wake
/// strands) when its clock says so. With a [`VirtualHost`], [`advance`](Runtime::advance) and
/// [`run_to_completion`](Runtime::run_to_completion) interleave the two
/// deterministically.
pub struct Runtime {
    shared: Rc<RuntimeShared>,
}

impl Runtime {
    /// Creates a runtime over `host` with default configuration.
    pub fn new(host: impl TimerHost + 'static) -> Self {
        Self::from_parts(Rc::new(host), RuntimeConfig::default())
    }

    /// Starts building a runtime with explicit configuration.
    #[must_use]
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    fn from_parts(host: Rc<dyn TimerHost>, config: RuntimeConfig) -> Self {
        Self {
            shared: Rc::new(RuntimeShared {
                state: RefCell::new(RuntimeState {
                    registry: AwaitRegistry::new(),
                    strands: HashMap::new(),
                    exited: HashSet::new(),
                    next_strand: 0,
                }),
                host,
                ready: Arc::new(ReadyQueue::new()),
                config,
                wids: WidAllocator::new(),
            }),
        }
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &RuntimeConfig {
        &self.shared.config
    }

    /// Starts a root strand.
    ///
    /// The strand body receives its own [`Cx`] with no enclosing cancel
    /// scope. An error escaping the body is traced and the strand
    /// exits; sibling strands are not disturbed.
    pub fn spawn<F, Fut>(&self, f: F) -> StrandId
    where
        F: FnOnce(Cx) -> Fut,
        Fut: Future<Output = Result<()>> + 'static,
    {
        self.shared.spawn_strand(None, move |cx| {
            let body = f(cx);
            async move {
                if let Err(e) = body.await {
                    if e.is_cancelled() {
                        trace!("root strand cancelled");
                    } else {
                        error!(error = %e, "root strand failed");
                    }
                }
            }
        })
    }

    /// Polls ready strands until none remain ready.
    ///
    /// Returns the number of polls performed. Strands woken during the
    /// drain (by completers or by each other) are polled in FIFO order
    /// within the same call.
    pub fn run_until_stalled(&self) -> usize {
        let mut polls = 0;
        while let Some(id) = self.shared.ready.pop() {
            let Some(mut future) = self.shared.take_future(id) else {
                continue;
            };
            polls += 1;
            let waker = waker_for(id, Arc::clone(&self.shared.ready));
            let mut task_cx = Context::from_waker(&waker);
            let poll = future.as_mut().poll(&mut task_cx);
            let mut state = self.shared.state.borrow_mut();
            let exited = state.exited.remove(&id);
            if exited || poll.is_ready() {
                state.strands.remove(&id);
                drop(state);
                // The future owns awaits that deregister on drop; run
                // those drops with no borrow outstanding.
                drop(future);
                trace!(strand = %id, "strand finished");
            } else if let Some(slot) = state.strands.get_mut(&id) {
                slot.future = Some(future);
            }
        }
        polls
    }

    /// Advances a virtual host by `delta`, interleaving strand polling
    /// with immediate batches and due timers in deterministic order.
    pub fn advance(&self, host: &VirtualHost, delta: Duration) {
        let target = host.now() + delta;
        self.drive(host, Some(target));
        host.advance_to(target);
        self.run_until_stalled();
    }

    /// Drives strands, immediates, and timers until the whole system is
    /// quiescent: no ready strand, no queued immediate, no pending
    /// timer.
    pub fn run_to_completion(&self, host: &VirtualHost) {
        self.drive(host, None);
    }

    fn drive(&self, host: &VirtualHost, until: Option<Time>) {
        loop {
            self.run_until_stalled();
            if host.tick() > 0 {
                continue;
            }
            match host.next_deadline() {
                Some(deadline) if until.map_or(true, |t| deadline <= t) => {
                    host.advance_to(deadline);
                }
                _ => break,
            }
        }
    }

    /// The number of awaits currently registered.
    #[must_use]
    pub fn live_awaits(&self) -> usize {
        self.shared.state.borrow().registry.len()
    }

    /// The number of strands that have not yet finished.
    #[must_use]
    pub fn live_strands(&self) -> usize {
        self.shared.state.borrow().strands.len()
    }
}

/// Builder for a [`Runtime`] with explicit configuration.
///
/// ```
/// use weft::{Runtime, host::VirtualHost};
/// use std::time::Duration;
///
/// let rt = Runtime::builder()
///     .cancelable_wait_threshold(Duration::from_millis(50))
///     .build(VirtualHost::new())
///     .unwrap();
/// assert_eq!(rt.config().cancelable_wait_threshold, Duration::from_millis(50));
/// ```
#[derive(Debug)]
pub struct RuntimeBuilder {
    config: RuntimeConfig,
    env_overrides: bool,
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RuntimeBuilder {
    /// Creates a builder with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: RuntimeConfig::default(),
            env_overrides: true,
        }
    }

    /// Sets the threshold above which [`Cx::wait`] becomes cancelable.
    #[must_use]
    pub fn cancelable_wait_threshold(mut self, threshold: Duration) -> Self {
        self.config.cancelable_wait_threshold = threshold;
        self
    }

    /// Enables tracing of dropped late callbacks.
    #[must_use]
    pub fn trace_dropped_callbacks(mut self, enabled: bool) -> Self {
        self.config.trace_dropped_callbacks = enabled;
        self
    }

    /// Controls whether `WEFT_*` environment overrides are applied at
    /// build time (on by default). Programmatic settings win over the
    /// environment.
    #[must_use]
    pub fn env_overrides(mut self, enabled: bool) -> Self {
        self.env_overrides = enabled;
        self
    }

    /// Builds the runtime over `host`.
    ///
    /// Fails only if an environment override is set but unparseable.
    pub fn build(self, host: impl TimerHost + 'static) -> Result<Runtime> {
        let config = if self.env_overrides {
            let programmatic = self.config.clone();
            let from_env = RuntimeConfig::default().with_env_overrides()?;
            merge(programmatic, from_env)
        } else {
            self.config
        };
        Ok(Runtime::from_parts(Rc::new(host), config))
    }
}

/// Programmatic settings win; env values apply only where the builder
/// kept the default.
fn merge(programmatic: RuntimeConfig, from_env: RuntimeConfig) -> RuntimeConfig {
    let defaults = RuntimeConfig::default();
    RuntimeConfig {
        cancelable_wait_threshold: if programmatic.cancelable_wait_threshold
            == defaults.cancelable_wait_threshold
        {
            from_env.cancelable_wait_threshold
        } else {
            programmatic.cancelable_wait_threshold
        },
        trace_dropped_callbacks: if programmatic.trace_dropped_callbacks
            == defaults.trace_dropped_callbacks
        {
            from_env.trace_dropped_callbacks
        } else {
            programmatic.trace_dropped_callbacks
        },
    }
}
