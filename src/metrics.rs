//! Metric helpers for `quillstream`.
//!
//! This module defines metric names and simple helper functions
//! wrapping the [`metrics`](https://docs.rs/metrics) crate. With the
//! `metrics` feature disabled every helper is a no-op.

#[cfg(feature = "metrics")]
use metrics::{counter, gauge};

/// Name of the gauge tracking streams that have not yet closed.
pub const STREAMS_ACTIVE: &str = "quillstream_streams_active";
/// Name of the counter tracking closed streams, labelled by outcome.
pub const STREAMS_CLOSED: &str = "quillstream_streams_closed_total";
/// Name of the counter tracking bytes accepted by `write`.
pub const BYTES_WRITTEN: &str = "quillstream_bytes_written_total";
/// Name of the counter tracking errors reported by handlers.
pub const HANDLER_ERRORS: &str = "quillstream_handler_errors_total";

/// How a stream reached `close`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CloseOutcome {
    /// The stream finished before it was destroyed.
    Finished,
    /// The stream was destroyed without an error before finishing.
    Destroyed,
    /// The stream was destroyed with an error.
    Errored,
}

impl CloseOutcome {
    /// Label value used for [`STREAMS_CLOSED`].
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            CloseOutcome::Finished => "finished",
            CloseOutcome::Destroyed => "destroyed",
            CloseOutcome::Errored => "errored",
        }
    }
}

/// Increment the active streams gauge.
#[cfg(feature = "metrics")]
pub fn inc_streams() { gauge!(STREAMS_ACTIVE).increment(1.0); }

/// Decrement the active streams gauge.
#[cfg(feature = "metrics")]
pub fn dec_streams() { gauge!(STREAMS_ACTIVE).decrement(1.0); }

/// Record a stream closing with the given outcome.
#[cfg(feature = "metrics")]
pub fn inc_closed(outcome: CloseOutcome) {
    counter!(STREAMS_CLOSED, "outcome" => outcome.as_str()).increment(1);
}

/// Record bytes accepted by `write`.
#[cfg(feature = "metrics")]
pub fn add_bytes_written(bytes: usize) {
    counter!(BYTES_WRITTEN).increment(u64::try_from(bytes).unwrap_or(u64::MAX));
}

/// Record an error reported by a write or final handler.
#[cfg(feature = "metrics")]
pub fn inc_handler_errors() { counter!(HANDLER_ERRORS).increment(1); }

#[cfg(not(feature = "metrics"))]
pub fn inc_streams() {}

#[cfg(not(feature = "metrics"))]
pub fn dec_streams() {}

#[cfg(not(feature = "metrics"))]
pub fn inc_closed(_outcome: CloseOutcome) {}

#[cfg(not(feature = "metrics"))]
pub fn add_bytes_written(_bytes: usize) {}

#[cfg(not(feature = "metrics"))]
pub fn inc_handler_errors() {}
