//! Canonical error and result types for the crate.
//!
//! [`StreamError`] is the single error surfaced by stream operations and
//! delivered to callbacks and `error` listeners. It is `Clone` so the same
//! error can be stored on the stream and handed to every pending callback.

use std::sync::Arc;

use thiserror::Error;

/// Errors produced by a [`Writable`](crate::Writable) stream.
#[non_exhaustive]
#[derive(Debug, Clone, Error)]
pub enum StreamError {
    /// A chunk was written after `end()` was requested.
    #[error("write after end")]
    WriteAfterEnd,
    /// The named operation was attempted on a destroyed stream.
    #[error("cannot call {0} after a stream was destroyed")]
    Destroyed(&'static str),
    /// The named operation was attempted on a stream that already finished.
    #[error("cannot call {0} after a stream was finished")]
    AlreadyFinished(&'static str),
    /// A write or final callback was invoked more than once.
    #[error("callback called multiple times")]
    MultipleCallback,
    /// The stream closed before it finished.
    #[error("premature close")]
    PrematureClose,
    /// An error reported by a user-supplied handler.
    #[error("handler error: {0}")]
    Handler(#[source] Arc<dyn std::error::Error + Send + Sync>),
}

impl StreamError {
    /// Wrap an arbitrary error reported by a write, final or destroy handler.
    pub fn handler(e: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Handler(Arc::new(e))
    }

    /// Returns `true` if the error originated in a user handler.
    #[must_use]
    pub fn is_handler(&self) -> bool { matches!(self, Self::Handler(_)) }
}

impl PartialEq for StreamError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::WriteAfterEnd, Self::WriteAfterEnd)
            | (Self::MultipleCallback, Self::MultipleCallback)
            | (Self::PrematureClose, Self::PrematureClose) => true,
            (Self::Destroyed(a), Self::Destroyed(b))
            | (Self::AlreadyFinished(a), Self::AlreadyFinished(b)) => a == b,
            (Self::Handler(a), Self::Handler(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Eq for StreamError {}

/// Errors returned when building a stream.
#[non_exhaustive]
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Neither a `write` nor a `writev` handler was supplied.
    #[error("a write or writev handler is required")]
    MissingWriteHandler,
}

/// Canonical result alias used by stream callbacks.
pub type Result<T = ()> = std::result::Result<T, StreamError>;
