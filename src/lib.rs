//! Weft: single-threaded structured concurrency over host timer
//! primitives.
//!
//! # Overview
//!
//! Weft layers strands (lightweight cooperative threads), promises,
//! scoped cancellation, timeouts, and interleaved execution on top of a
//! host that provides only two things: deferred callback scheduling
//! (`set_timeout` / `set_immediate`) and callback revocation
//! (`clear_timeout`). Callback-based host APIs become direct-style
//! `async` code through a uniform await abstraction with precise,
//! race-free cancellation semantics.
//!
//! # Core Guarantees
//!
//! - **At-most-one resume**: every await completes at most once; late
//!   host callbacks are dropped by an authoritative registry test
//! - **Scoped cancellation**: `cancel()` reaches exactly the awaits
//!   started in the innermost `cancelable` boundary
//! - **Timer hygiene**: cancelable waits clear their host timer on
//!   every exit path, including cancellation
//! - **Determinism**: the bundled [`VirtualHost`](host::VirtualHost)
//!   drives everything on a virtual clock for reproducible tests
//!
//! # Module Structure
//!
//! - [`types`]: identifiers (wids, strand ids, timer ids) and timestamps
//! - [`error`]: the crate error type and the canonical Cancel error
//! - [`host`]: the [`TimerHost`](host::TimerHost) seam and the virtual host
//! - [`runtime`]: the strand scheduler, registry, and configuration
//! - [`cx`]: the capability context — awaits, cancellation, forking
//! - [`sync`]: promises and join handles
//!
//! # Example
//!
//! ```
//! use weft::{Runtime, host::VirtualHost, sync::Promise};
//!
//! let host = VirtualHost::new();
//! let rt = Runtime::new(host.clone());
//!
//! let p: Promise<i32> = Promise::new();
//! let reader = p.clone();
//! rt.spawn(move |cx| async move {
//!     let value = reader.recv(&cx).await?;
//!     assert_eq!(value, 42);
//!     Ok(())
//! });
//! p.resolve(42).unwrap();
//! rt.run_to_completion(&host);
//! assert_eq!(rt.live_strands(), 0);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

pub mod combinator;
pub mod cx;
pub mod error;
pub mod host;
pub mod runtime;
pub mod sync;
pub mod time;
pub mod tracing_compat;
pub mod types;

pub use cx::{AwaitFuture, Completer, Cx, Exit};
pub use error::{Error, ErrorKind, Result};
pub use runtime::{Runtime, RuntimeBuilder, RuntimeConfig};
pub use sync::{JoinHandle, Promise};
pub use types::{StrandId, Time, TimerId, Wid};
