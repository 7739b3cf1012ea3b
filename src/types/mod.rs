//! Core identifier and timestamp types.

mod id;
mod time;

pub use id::{StrandId, TimerId, Wid};
pub use time::Time;

pub(crate) use id::WidAllocator;
