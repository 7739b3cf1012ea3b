//! Strand-aware synchronization primitives.

mod join;
mod promise;

pub use join::JoinHandle;
pub use promise::Promise;
