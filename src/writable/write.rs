//! Write path: buffering, handler dispatch and acknowledgement.

use std::mem;

use bytes::Bytes;
use log::trace;

use super::{
    Writable,
    callback::{Done, WriteCallback},
    chunk::{Chunk, Encoding},
    state::Pending,
};
use crate::{
    error::{Result, StreamError},
    events::StreamEvent,
};

impl Writable {
    /// Accept or reject a chunk.
    ///
    /// `Ok(false)` signals backpressure; `Err` carries the rejection that was
    /// also reported to `done`.
    pub(super) fn write_inner(
        &self,
        chunk: Bytes,
        encoding: Encoding,
        done: Option<Done>,
    ) -> Result<bool> {
        let rejection = {
            let state = self.state();
            if state.ending {
                Some(StreamError::WriteAfterEnd)
            } else if state.destroyed {
                Some(StreamError::Destroyed("write"))
            } else {
                None
            }
        };
        if let Some(err) = rejection {
            if let Some(done) = done {
                let e = err.clone();
                self.queue().queue_tick(move || done(Err(e)));
            }
            self.error_or_destroy(err.clone(), true);
            return Err(err);
        }
        Ok(self.write_or_buffer(chunk, encoding, done))
    }

    fn write_or_buffer(&self, data: Bytes, encoding: Encoding, done: Option<Done>) -> bool {
        let len = data.len();
        let pending = Pending {
            data,
            encoding,
            done,
        };
        let (below_mark, buffered) = {
            let mut state = self.state();
            state.length += len;
            let below_mark = state.length < self.shared.options.high_water_mark;
            if !below_mark {
                state.need_drain = true;
            }
            state.pending_cb += 1;
            if state.must_buffer() {
                state.buffered.push_back(pending);
                (below_mark, None)
            } else {
                (below_mark, Some(pending))
            }
        };
        crate::metrics::add_bytes_written(len);

        if let Some(pending) = buffered {
            self.do_write(vec![pending]);
            self.clear_buffer();
        }

        let state = self.state();
        below_mark && state.errored.is_none() && !state.destroyed
    }

    /// Hand a batch of chunks to the write handler. Batches of more than one
    /// chunk are only formed when a `writev` handler exists.
    fn do_write(&self, batch: Vec<Pending>) {
        let mut chunks = Vec::with_capacity(batch.len());
        let mut callbacks = Vec::with_capacity(batch.len());
        for Pending {
            data,
            encoding,
            done,
        } in batch
        {
            chunks.push(Chunk { data, encoding });
            callbacks.push(done);
        }

        {
            let mut state = self.state();
            state.write_len = chunks.iter().map(Chunk::len).sum();
            state.in_flight = callbacks;
            state.writing = true;
            state.sync = true;
        }
        trace!(
            "writable stream dispatching write: id={}, chunks={}",
            self.id(),
            chunks.len()
        );

        self.call_write_handler(chunks, WriteCallback::new(self.clone()));
        self.state().sync = false;
    }

    fn call_write_handler(&self, mut chunks: Vec<Chunk>, cb: WriteCallback) {
        let single = chunks.len() == 1;
        let mut handlers = self.shared.handlers.borrow_mut();
        if single && let Some(mut write) = handlers.write.take() {
            drop(handlers);
            let Chunk { data, encoding } = chunks.remove(0);
            write(data, encoding, cb);
            self.shared.handlers.borrow_mut().write = Some(write);
        } else if let Some(mut writev) = handlers.writev.take() {
            drop(handlers);
            writev(chunks, cb);
            self.shared.handlers.borrow_mut().writev = Some(writev);
        }
    }

    /// Completion of the in-flight write.
    pub(super) fn on_write(&self, result: Result) {
        let (sync, callbacks) = {
            let mut state = self.state();
            state.writing = false;
            state.length = state.length.saturating_sub(state.write_len);
            state.write_len = 0;
            (state.sync, mem::take(&mut state.in_flight))
        };

        match result {
            Err(err) => {
                self.state().record_error(&err);
                crate::metrics::inc_handler_errors();
                if sync {
                    let this = self.clone();
                    self.queue()
                        .queue_tick(move || this.on_write_error(callbacks, err));
                } else {
                    self.on_write_error(callbacks, err);
                }
            }
            Ok(()) if sync => {
                let this = self.clone();
                self.queue().queue_tick(move || this.after_write(callbacks));
            }
            Ok(()) => {
                self.clear_buffer();
                self.after_write(callbacks);
            }
        }
    }

    fn on_write_error(&self, callbacks: Vec<Option<Done>>, err: StreamError) {
        {
            let mut state = self.state();
            state.pending_cb = state.pending_cb.saturating_sub(callbacks.len());
        }
        for done in callbacks.into_iter().flatten() {
            done(Err(err.clone()));
        }
        self.error_buffer();
        self.error_or_destroy(err, false);
    }

    fn after_write(&self, callbacks: Vec<Option<Done>>) {
        let drain = {
            let mut state = self.state();
            let drain =
                state.need_drain && !state.ending && !state.destroyed && state.length == 0;
            if drain {
                state.need_drain = false;
            }
            drain
        };
        if drain {
            self.emit(&StreamEvent::Drain);
        }

        for done in callbacks {
            {
                let mut state = self.state();
                state.pending_cb = state.pending_cb.saturating_sub(1);
            }
            if let Some(done) = done {
                done(Ok(()));
            }
        }

        if self.state().destroyed {
            self.error_buffer();
        }
        self.finish_maybe(false);
    }

    /// Write buffered chunks until one is left in flight or the buffer is
    /// empty. A write completed synchronously by its handler does not recurse
    /// into this loop; the loop picks up the next chunk itself.
    pub(super) fn clear_buffer(&self) {
        loop {
            let batch = {
                let mut state = self.state();
                if state.corked > 0
                    || state.writing
                    || state.sync
                    || state.destroyed
                    || state.errored.is_some()
                    || state.buffered.is_empty()
                {
                    return;
                }
                if state.buffered.len() > 1 && self.shared.handlers.borrow().has_writev() {
                    state.buffered.drain(..).collect()
                } else {
                    state.buffered.pop_front().into_iter().collect()
                }
            };
            self.do_write(batch);
        }
    }

    /// Fail every buffered write and pending end callback.
    pub(super) fn error_buffer(&self) {
        let (buffered, on_finished, write_err, end_err) = {
            let mut state = self.state();
            if state.writing {
                return;
            }
            let buffered: Vec<Pending> = state.buffered.drain(..).collect();
            let dropped: usize = buffered.iter().map(|p| p.data.len()).sum();
            state.length = state.length.saturating_sub(dropped);
            state.pending_cb = state.pending_cb.saturating_sub(buffered.len());
            let write_err = state
                .errored
                .clone()
                .unwrap_or(StreamError::Destroyed("write"));
            let end_err = state
                .errored
                .clone()
                .unwrap_or(StreamError::Destroyed("end"));
            (
                buffered,
                mem::take(&mut state.on_finished),
                write_err,
                end_err,
            )
        };
        for done in buffered.into_iter().filter_map(|p| p.done) {
            done(Err(write_err.clone()));
        }
        for done in on_finished {
            done(Err(end_err.clone()));
        }
    }
}
