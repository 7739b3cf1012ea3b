//! Capability context and the await/cancel machinery.

mod await_op;
#[allow(clippy::module_inception)]
mod cx;
pub(crate) mod scope;
mod wrappers;

pub use await_op::{AwaitFuture, Completer};
pub use cx::{Cx, Exit};
