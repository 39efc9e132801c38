//! Writable stream with a graceful and an abrupt shutdown path.
//!
//! A [`Writable`] accepts chunks through [`Writable::write`], hands them one at
//! a time to the configured write handler, and completes in one of two ways:
//!
//! - [`Writable::end`] drains buffered writes, runs the optional finalizer,
//!   then emits `prefinish` and `finish` (and, with `auto_destroy`, `close`).
//! - [`Writable::destroy`] abandons the stream immediately. It is synchronous
//!   and terminal: once it has run, `prefinish` and `finish` never fire, even
//!   if a finalizer completes afterwards. `close` is emitted exactly once on
//!   the next tick.
//!
//! All deferred work runs on the [`TaskQueue`] the stream was built with.

mod builder;
mod callback;
mod chunk;
mod counter;
mod destroy;
mod finish;
mod handlers;
mod state;
mod write;

use std::{
    cell::{RefCell, RefMut},
    fmt,
    rc::Rc,
};

pub use builder::{DEFAULT_HIGH_WATER_MARK, WritableBuilder, WritableOptions};
use bytes::Bytes;
pub use callback::{DestroyCallback, Done, FinalCallback, WriteCallback};
pub use chunk::{Chunk, Encoding};
pub use counter::{StreamId, active_stream_count};
use handlers::Handlers;
pub use handlers::{DestroyHandler, FinalHandler, WriteHandler, WritevHandler};
use log::debug;
pub use state::Lifecycle;
use state::WritableState;

use crate::{
    error::{Result, StreamError},
    events::{self, EventKind, ListenerId, Listeners, StreamEvent},
    scheduler::TaskQueue,
};

struct Shared {
    id: StreamId,
    options: WritableOptions,
    queue: TaskQueue,
    state: RefCell<WritableState>,
    handlers: RefCell<Handlers>,
    listeners: RefCell<Listeners>,
}

/// Handle to a writable stream.
///
/// Cloning the handle is cheap; all clones refer to the same stream.
///
/// # Examples
///
/// ```
/// use std::{cell::Cell, rc::Rc};
///
/// use quillstream::{EventKind, TaskQueue, Writable};
///
/// let queue = TaskQueue::new();
/// let q = queue.clone();
/// let stream = Writable::builder(&queue)
///     .write(|_chunk, _encoding, cb| cb.ok())
///     .finalizer(move |cb| q.queue_microtask(move || cb.ok()))
///     .build()
///     .expect("build stream");
///
/// let finished = Rc::new(Cell::new(false));
/// let f = Rc::clone(&finished);
/// stream.on(EventKind::Finish, move |_| f.set(true));
///
/// stream.end();
/// stream.destroy();
/// queue.run_until_idle().expect("drain");
///
/// assert!(!finished.get());
/// assert!(stream.is_closed());
/// ```
#[derive(Clone)]
pub struct Writable {
    shared: Rc<Shared>,
}

impl Writable {
    /// Start building a stream that schedules its deferred work on `queue`.
    #[must_use]
    pub fn builder(queue: &TaskQueue) -> WritableBuilder { WritableBuilder::new(queue) }

    fn from_parts(queue: TaskQueue, options: WritableOptions, handlers: Handlers) -> Self {
        let id = StreamId::next();
        debug!(
            "writable stream created: id={id}, high_water_mark={}, active_streams={}",
            options.high_water_mark,
            active_stream_count() + 1,
        );
        Self {
            shared: Rc::new(Shared {
                id,
                options,
                queue,
                state: RefCell::new(WritableState::new()),
                handlers: RefCell::new(handlers),
                listeners: RefCell::new(Listeners::new()),
            }),
        }
    }

    /// Write `chunk` with the default encoding.
    ///
    /// Returns `false` when the caller should wait for `drain` before writing
    /// more, or when the write was rejected.
    pub fn write(&self, chunk: impl Into<Bytes>) -> bool {
        self.write_with(chunk.into(), self.shared.options.default_encoding, None)
    }

    /// Write `chunk` and run `done` once it is acknowledged or rejected.
    pub fn write_then(&self, chunk: impl Into<Bytes>, done: impl FnOnce(Result) + 'static) -> bool {
        self.write_with(
            chunk.into(),
            self.shared.options.default_encoding,
            Some(Box::new(done)),
        )
    }

    /// Write `chunk` tagged with `encoding`.
    pub fn write_with(&self, chunk: Bytes, encoding: Encoding, done: Option<Done>) -> bool {
        match self.write_inner(chunk, encoding, done) {
            Ok(accepted) => accepted,
            Err(_) => false,
        }
    }

    /// Request graceful completion.
    pub fn end(&self) { self.end_with(None, None); }

    /// Request graceful completion and run `done` once the stream finishes
    /// or fails.
    pub fn end_then(&self, done: impl FnOnce(Result) + 'static) {
        self.end_with(None, Some(Box::new(done)));
    }

    /// Optionally write a final `chunk`, then request graceful completion.
    pub fn end_with(&self, chunk: Option<Bytes>, done: Option<Done>) { self.end_inner(chunk, done); }

    /// Abandon the stream. Idempotent.
    pub fn destroy(&self) { self.destroy_inner(None); }

    /// Abandon the stream, emitting `err` before `close`.
    pub fn destroy_with_error(&self, err: StreamError) { self.destroy_inner(Some(err)); }

    /// Hold subsequent writes in the buffer until [`Writable::uncork`].
    pub fn cork(&self) { self.state().corked += 1; }

    /// Release one level of corking, flushing the buffer at zero.
    pub fn uncork(&self) {
        let flush = {
            let mut state = self.state();
            if state.corked == 0 {
                return;
            }
            state.corked -= 1;
            !state.writing
        };
        if flush {
            self.clear_buffer();
        }
    }

    /// Register a listener for every emission of `kind`.
    pub fn on(&self, kind: EventKind, f: impl FnMut(&StreamEvent) + 'static) -> ListenerId {
        self.shared.listeners.borrow_mut().on(kind, f)
    }

    /// Register a listener for the next emission of `kind`.
    pub fn once(&self, kind: EventKind, f: impl FnMut(&StreamEvent) + 'static) -> ListenerId {
        self.shared.listeners.borrow_mut().once(kind, f)
    }

    /// Remove a listener.
    pub fn off(&self, id: ListenerId) -> bool { self.shared.listeners.borrow_mut().off(id) }

    /// Number of listeners registered for `kind`.
    #[must_use]
    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.shared.listeners.borrow().listener_count(kind)
    }

    /// Identifier used in log output.
    #[must_use]
    pub fn id(&self) -> StreamId { self.shared.id }

    /// Options the stream was built with.
    #[must_use]
    pub fn options(&self) -> WritableOptions { self.shared.options }

    /// High-water mark in bytes.
    #[must_use]
    pub fn high_water_mark(&self) -> usize { self.shared.options.high_water_mark }

    /// Current lifecycle state.
    #[must_use]
    pub fn lifecycle(&self) -> Lifecycle { self.state().lifecycle() }

    /// Returns `true` while writes are accepted.
    #[must_use]
    pub fn is_writable(&self) -> bool {
        let state = self.state();
        !state.ending && !state.destroyed && state.errored.is_none()
    }

    /// Returns `true` once `end()` has been called.
    #[must_use]
    pub fn is_ended(&self) -> bool { self.state().ending }

    /// Returns `true` once `finish` has fired.
    #[must_use]
    pub fn is_finished(&self) -> bool { self.state().finished }

    /// Returns `true` once `destroy()` has been called.
    #[must_use]
    pub fn is_destroyed(&self) -> bool { self.state().destroyed }

    /// Returns `true` once destruction completed and `close` is scheduled or
    /// delivered.
    #[must_use]
    pub fn is_closed(&self) -> bool { self.state().closed }

    /// The error the stream failed with, if any.
    #[must_use]
    pub fn errored(&self) -> Option<StreamError> { self.state().errored.clone() }

    /// Bytes accepted but not yet acknowledged by the write handler.
    #[must_use]
    pub fn buffered_len(&self) -> usize { self.state().length }

    /// Returns `true` if a `write` reported backpressure and `drain` is
    /// still pending.
    #[must_use]
    pub fn needs_drain(&self) -> bool { self.state().need_drain }

    /// Current cork depth.
    #[must_use]
    pub fn corked(&self) -> usize { self.state().corked }

    fn state(&self) -> RefMut<'_, WritableState> { self.shared.state.borrow_mut() }

    fn queue(&self) -> &TaskQueue { &self.shared.queue }

    fn emit(&self, event: &StreamEvent) -> bool {
        let callbacks = self.shared.listeners.borrow_mut().snapshot(event.kind());
        events::dispatch(&callbacks, event)
    }
}

impl fmt::Debug for Writable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.borrow();
        f.debug_struct("Writable")
            .field("id", &self.shared.id)
            .field("lifecycle", &state.lifecycle())
            .field("buffered_len", &state.length)
            .field("errored", &state.errored)
            .finish_non_exhaustive()
    }
}
