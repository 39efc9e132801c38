//! Stream lifecycle state.

use std::collections::VecDeque;

use bytes::Bytes;

use super::{callback::Done, chunk::Encoding, counter::ActiveStream};
use crate::error::StreamError;

/// Externally visible lifecycle of a stream.
///
/// Progression is forward only. [`Lifecycle::Destroyed`] is terminal and
/// overrides every other state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Lifecycle {
    /// Accepting writes.
    Writable,
    /// `end()` was called; buffered writes are draining.
    Ending,
    /// The finalizer is running or `prefinish` has fired.
    Finishing,
    /// `finish` has fired.
    Finished,
    /// `destroy()` was called.
    Destroyed,
}

impl Lifecycle {
    /// Lower-case state name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Lifecycle::Writable => "writable",
            Lifecycle::Ending => "ending",
            Lifecycle::Finishing => "finishing",
            Lifecycle::Finished => "finished",
            Lifecycle::Destroyed => "destroyed",
        }
    }
}

/// A chunk accepted by `write` but not yet handed to the write handler.
pub(super) struct Pending {
    pub(super) data: Bytes,
    pub(super) encoding: Encoding,
    pub(super) done: Option<Done>,
}

/// Mutable bookkeeping for a stream.
#[derive(Default)]
pub(super) struct WritableState {
    pub(super) ending: bool,
    pub(super) final_called: bool,
    pub(super) prefinished: bool,
    pub(super) finished: bool,
    pub(super) destroyed: bool,
    pub(super) closed: bool,
    pub(super) close_emitted: bool,
    pub(super) error_emitted: bool,
    pub(super) errored: Option<StreamError>,
    /// Bytes accepted but not yet acknowledged by the write handler.
    pub(super) length: usize,
    pub(super) need_drain: bool,
    pub(super) writing: bool,
    /// Set while a write handler or the finalizer is on the stack.
    pub(super) sync: bool,
    pub(super) write_len: usize,
    pub(super) in_flight: Vec<Option<Done>>,
    pub(super) buffered: VecDeque<Pending>,
    pub(super) corked: usize,
    /// Writes, the finalizer and a scheduled `finish` still outstanding.
    pub(super) pending_cb: usize,
    pub(super) on_finished: Vec<Done>,
    pub(super) active: Option<ActiveStream>,
}

impl WritableState {
    pub(super) fn new() -> Self {
        Self {
            active: Some(ActiveStream::new()),
            ..Self::default()
        }
    }

    pub(super) fn lifecycle(&self) -> Lifecycle {
        if self.destroyed {
            Lifecycle::Destroyed
        } else if self.finished {
            Lifecycle::Finished
        } else if self.prefinished || self.final_called {
            Lifecycle::Finishing
        } else if self.ending {
            Lifecycle::Ending
        } else {
            Lifecycle::Writable
        }
    }

    /// Whether the graceful completion path may still emit `finish`.
    pub(super) fn need_finish(&self) -> bool {
        self.ending
            && !self.destroyed
            && self.length == 0
            && self.errored.is_none()
            && self.buffered.is_empty()
            && !self.finished
            && !self.writing
            && !self.error_emitted
            && !self.close_emitted
    }

    /// Whether a new chunk must wait in the buffer.
    pub(super) fn must_buffer(&self) -> bool {
        self.writing || self.corked > 0 || self.errored.is_some() || self.sync
    }

    /// Set `errored` unless an earlier error is already stored.
    pub(super) fn record_error(&mut self, err: &StreamError) {
        if self.errored.is_none() {
            self.errored = Some(err.clone());
        }
    }
}
