//! Runtime configuration.
//!
//! Settings are resolved in this order (highest priority first):
//!
//! 1. **Programmatic** — values set via [`RuntimeBuilder`](crate::RuntimeBuilder) methods
//! 2. **Environment variables** — values from `WEFT_*` env vars
//! 3. **Defaults** — [`RuntimeConfig::default()`]
//!
//! | Variable | Type | Maps to |
//! |----------|------|---------|
//! | `WEFT_CANCELABLE_WAIT_THRESHOLD_MS` | `u64` | `cancelable_wait_threshold` |
//! | `WEFT_TRACE_DROPPED_CALLBACKS` | `bool` | `trace_dropped_callbacks` |

use crate::error::{Error, ErrorKind, Result};
use std::time::Duration;

/// Environment variable name for the cancelable-wait threshold.
pub const ENV_CANCELABLE_WAIT_THRESHOLD_MS: &str = "WEFT_CANCELABLE_WAIT_THRESHOLD_MS";
/// Environment variable name for the dropped-callback tracing toggle.
pub const ENV_TRACE_DROPPED_CALLBACKS: &str = "WEFT_TRACE_DROPPED_CALLBACKS";

/// Tunable parameters of a [`Runtime`](crate::Runtime).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Waits longer than this go through the cancelable path (timer id
    /// tracked and cleared on cancellation); shorter waits are
    /// fire-and-forget. The classic policy value is 200 ms.
    pub cancelable_wait_threshold: Duration,
    /// Emit a trace event whenever a late host callback is dropped by
    /// the registry membership test.
    pub trace_dropped_callbacks: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            cancelable_wait_threshold: Duration::from_millis(200),
            trace_dropped_callbacks: false,
        }
    }
}

impl RuntimeConfig {
    /// Applies `WEFT_*` environment variable overrides.
    ///
    /// Only variables that are set are applied. Returns an error if a
    /// variable is set but unparseable.
    pub fn with_env_overrides(mut self) -> Result<Self> {
        if let Some(millis) = env_parse::<u64>(ENV_CANCELABLE_WAIT_THRESHOLD_MS)? {
            self.cancelable_wait_threshold = Duration::from_millis(millis);
        }
        if let Some(flag) = env_bool(ENV_TRACE_DROPPED_CALLBACKS)? {
            self.trace_dropped_callbacks = flag;
        }
        Ok(self)
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match std::env::var(name) {
        Ok(raw) => raw.parse::<T>().map(Some).map_err(|_| {
            Error::new(ErrorKind::Config).with_context(format!("invalid value for {name}: {raw:?}"))
        }),
        Err(_) => Ok(None),
    }
}

fn env_bool(name: &str) -> Result<Option<bool>> {
    match std::env::var(name) {
        Ok(raw) => match raw.as_str() {
            "1" | "true" | "yes" | "on" => Ok(Some(true)),
            "0" | "false" | "no" | "off" => Ok(Some(false)),
            _ => Err(Error::new(ErrorKind::Config)
                .with_context(format!("invalid boolean for {name}: {raw:?}"))),
        },
        Err(_) => Ok(None),
    }
}
