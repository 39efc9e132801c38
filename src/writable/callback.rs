//! Completion handles passed to stream handlers.
//!
//! Each handle is clonable so a handler can move it into a deferred task.
//! Write and final handles report [`StreamError::MultipleCallback`] when
//! completed twice; the report goes through the stream's error-or-destroy
//! path and is therefore silent once the stream is destroyed.

use std::{cell::Cell, fmt, rc::Rc};

use super::Writable;
use crate::error::{Result, StreamError};

/// Callback supplied by the caller of `write`/`end`.
pub type Done = Box<dyn FnOnce(Result) + 'static>;

/// Completion handle for a `write`/`writev` handler call.
#[derive(Clone)]
pub struct WriteCallback {
    stream: Writable,
    called: Rc<Cell<bool>>,
}

impl WriteCallback {
    pub(super) fn new(stream: Writable) -> Self {
        Self {
            stream,
            called: Rc::new(Cell::new(false)),
        }
    }

    /// Acknowledge the chunk, or report why it could not be written.
    pub fn complete(&self, result: Result) {
        if self.called.replace(true) {
            self.stream.error_or_destroy(StreamError::MultipleCallback, false);
            return;
        }
        self.stream.on_write(result);
    }

    /// Shorthand for `complete(Ok(()))`.
    pub fn ok(&self) { self.complete(Ok(())); }
}

impl fmt::Debug for WriteCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriteCallback")
            .field("stream", &self.stream.id())
            .field("called", &self.called.get())
            .finish()
    }
}

/// Completion handle for the finalizer.
#[derive(Clone)]
pub struct FinalCallback {
    stream: Writable,
    called: Rc<Cell<bool>>,
}

impl FinalCallback {
    pub(super) fn new(stream: Writable) -> Self {
        Self {
            stream,
            called: Rc::new(Cell::new(false)),
        }
    }

    /// Report that finalization completed.
    ///
    /// On success the stream emits `prefinish` and schedules `finish`, unless
    /// it was destroyed in the meantime, in which case nothing is emitted.
    pub fn complete(&self, result: Result) {
        if self.called.replace(true) {
            let err = result.err().unwrap_or(StreamError::MultipleCallback);
            self.stream.error_or_destroy(err, false);
            return;
        }
        self.stream.on_final(result);
    }

    /// Shorthand for `complete(Ok(()))`.
    pub fn ok(&self) { self.complete(Ok(())); }
}

impl fmt::Debug for FinalCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FinalCallback")
            .field("stream", &self.stream.id())
            .field("called", &self.called.get())
            .finish()
    }
}

/// Completion handle for the destroy hook. Only the first call counts.
#[derive(Clone)]
pub struct DestroyCallback {
    stream: Writable,
    called: Rc<Cell<bool>>,
}

impl DestroyCallback {
    pub(super) fn new(stream: Writable) -> Self {
        Self {
            stream,
            called: Rc::new(Cell::new(false)),
        }
    }

    /// Report that resources were released. `error`, if any, is emitted
    /// before `close`.
    pub fn complete(&self, error: Option<StreamError>) {
        if self.called.replace(true) {
            return;
        }
        self.stream.on_destroy(error);
    }
}

impl fmt::Debug for DestroyCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DestroyCallback")
            .field("stream", &self.stream.id())
            .field("called", &self.called.get())
            .finish()
    }
}
