//! Stream identifiers and active stream counting.

use std::{
    fmt,
    sync::atomic::{AtomicU64, Ordering},
};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Global gauge tracking streams that have not yet closed.
static ACTIVE_STREAMS: AtomicU64 = AtomicU64::new(0);

/// Process-unique identifier attached to a stream for logging.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StreamId(u64);

impl StreamId {
    pub(super) fn next() -> Self { Self(NEXT_ID.fetch_add(1, Ordering::Relaxed)) }

    /// Raw numeric value.
    #[must_use]
    pub fn get(self) -> u64 { self.0 }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "#{}", self.0) }
}

/// RAII guard incrementing [`ACTIVE_STREAMS`] on creation and decrementing
/// it on drop. The stream drops its guard when it closes.
pub(super) struct ActiveStream;

impl ActiveStream {
    pub(super) fn new() -> Self {
        ACTIVE_STREAMS.fetch_add(1, Ordering::Relaxed);
        crate::metrics::inc_streams();
        Self
    }
}

impl Drop for ActiveStream {
    fn drop(&mut self) {
        ACTIVE_STREAMS.fetch_sub(1, Ordering::Relaxed);
        crate::metrics::dec_streams();
    }
}

/// Return the number of streams created but not yet closed.
#[must_use]
pub fn active_stream_count() -> u64 { ACTIVE_STREAMS.load(Ordering::Relaxed) }
