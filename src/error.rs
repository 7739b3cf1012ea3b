//! Error types and error-handling strategy.
//!
//! Two error kinds are first-class: user errors raised inside strands and
//! the distinguished `Cancelled` kind. Combinators that recover locally
//! (`first_of`, `timeout`, `on_cancel`) match on `Cancelled` and translate
//! it into a normal return; everything else propagates up through the
//! strand to its collector.

use core::fmt;
use std::sync::Arc;

/// The kind of error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The await was cancelled.
    Cancelled,
    /// A promise was resolved a second time.
    AlreadyResolved,
    /// The runtime behind a context handle has been dropped.
    RuntimeGone,
    /// The runtime could not make progress (no ready strand, no pending
    /// host callback) while a result was still outstanding.
    Stalled,
    /// A configuration value could not be parsed.
    Config,
    /// User-provided error.
    User,
    /// Internal invariant violation (bug).
    Internal,
}

/// The main error type for strand operations.
#[derive(Debug, Clone)]
pub struct Error {
    kind: ErrorKind,
    context: Option<String>,
    source: Option<Arc<dyn std::error::Error + Send + Sync>>,
}

impl Error {
    /// Creates a new error with the given kind.
    #[must_use]
    pub const fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            context: None,
            source: None,
        }
    }

    /// The canonical cancellation error delivered to every cancelled await.
    #[must_use]
    pub fn cancel() -> Self {
        Self::new(ErrorKind::Cancelled).with_context("Cancel")
    }

    /// The error produced by resolving an already-resolved promise.
    #[must_use]
    pub fn already_resolved() -> Self {
        Self::new(ErrorKind::AlreadyResolved).with_context("promise was already resolved")
    }

    /// Creates a user error with a message.
    #[must_use]
    pub fn user(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::User).with_context(message)
    }

    /// Returns the error kind.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns true if this error represents cancellation.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self.kind, ErrorKind::Cancelled)
    }

    /// Returns true if this error came from a duplicate resolve.
    #[must_use]
    pub const fn is_already_resolved(&self) -> bool {
        matches!(self.kind, ErrorKind::AlreadyResolved)
    }

    /// Adds context text to the error.
    #[must_use]
    pub fn with_context(mut self, ctx: impl Into<String>) -> Self {
        self.context = Some(ctx.into());
        self
    }

    /// Adds a source error to the chain.
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Arc::new(source));
        self
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.kind)?;
        if let Some(ctx) = &self.context {
            write!(f, ": {ctx}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as _)
    }
}

/// A `Result` alias using the crate error type.
pub type Result<T, E = Error> = std::result::Result<T, E>;
