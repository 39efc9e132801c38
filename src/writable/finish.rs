//! Graceful completion: `end()`, the finalizer, `prefinish` and `finish`.
//!
//! Every step re-checks [`WritableState::need_finish`] before emitting, so a
//! `destroy()` that lands between two steps suppresses the rest of the
//! sequence.
//!
//! [`WritableState::need_finish`]: super::state::WritableState::need_finish

use std::mem;

use bytes::Bytes;
use log::debug;

use super::{
    Writable,
    callback::{Done, FinalCallback},
};
use crate::{
    error::{Result, StreamError},
    events::StreamEvent,
};

impl Writable {
    pub(super) fn end_inner(&self, chunk: Option<Bytes>, done: Option<Done>) {
        let mut err = None;
        if let Some(chunk) = chunk {
            let encoding = self.shared.options.default_encoding;
            if let Err(e) = self.write_inner(chunk, encoding, None) {
                err = Some(e);
            }
        }

        let corked = self.state().corked > 0;
        if corked {
            self.state().corked = 1;
            self.uncork();
        }

        if err.is_none() {
            let start = {
                let state = self.state();
                if state.finished {
                    err = Some(StreamError::AlreadyFinished("end"));
                } else if state.destroyed {
                    err = Some(StreamError::Destroyed("end"));
                }
                err.is_none() && state.errored.is_none() && !state.ending
            };
            if start {
                self.state().ending = true;
                debug!("writable stream ending: id={}", self.id());
                self.finish_maybe(true);
            }
        }

        let Some(done) = done else {
            return;
        };
        let mut state = self.state();
        let result = match err {
            Some(err) => Err(err),
            None if state.finished => Ok(()),
            None if state.destroyed || state.errored.is_some() => Err(state
                .errored
                .clone()
                .unwrap_or(StreamError::Destroyed("end"))),
            None => {
                state.on_finished.push(done);
                return;
            }
        };
        drop(state);
        self.queue().queue_tick(move || done(result));
    }

    /// Advance the completion sequence if nothing is outstanding.
    ///
    /// A `finish` reached synchronously from `end()` is deferred one tick and
    /// re-checked before it fires.
    pub(super) fn finish_maybe(&self, sync: bool) {
        if !self.state().need_finish() {
            return;
        }
        self.prefinish();

        let mut state = self.state();
        if state.pending_cb != 0 || !state.need_finish() {
            return;
        }
        state.pending_cb += 1;
        drop(state);
        if sync {
            let this = self.clone();
            self.queue().queue_tick(move || this.finish());
        } else {
            self.finish();
        }
    }

    fn prefinish(&self) {
        let call_final = {
            let mut state = self.state();
            if state.prefinished || state.final_called {
                return;
            }
            if self.shared.handlers.borrow().has_finalizer() && !state.destroyed {
                state.final_called = true;
                true
            } else {
                state.prefinished = true;
                false
            }
        };
        if call_final {
            self.call_final();
        } else {
            self.emit(&StreamEvent::Prefinish);
        }
    }

    fn call_final(&self) {
        let finalizer = self.shared.handlers.borrow_mut().finalizer.take();
        {
            let mut state = self.state();
            state.sync = true;
            state.pending_cb += 1;
        }
        debug!("writable stream running finalizer: id={}", self.id());
        if let Some(finalizer) = finalizer {
            finalizer(FinalCallback::new(self.clone()));
        }
        self.state().sync = false;
    }

    /// First completion of the finalizer.
    pub(super) fn on_final(&self, result: Result) {
        {
            let mut state = self.state();
            state.pending_cb = state.pending_cb.saturating_sub(1);
        }
        match result {
            Err(err) => {
                let (callbacks, sync) = {
                    let mut state = self.state();
                    (mem::take(&mut state.on_finished), state.sync)
                };
                for done in callbacks {
                    done(Err(err.clone()));
                }
                crate::metrics::inc_handler_errors();
                self.error_or_destroy(err, sync);
            }
            Ok(()) => {
                let proceed = {
                    let mut state = self.state();
                    let proceed = state.need_finish();
                    if proceed {
                        state.prefinished = true;
                        state.pending_cb += 1;
                    }
                    proceed
                };
                if !proceed {
                    debug!(
                        "finalizer completed on a stream that can no longer finish: id={}, \
                         destroyed={}",
                        self.id(),
                        self.state().destroyed
                    );
                    return;
                }
                self.emit(&StreamEvent::Prefinish);
                let this = self.clone();
                self.queue().queue_tick(move || this.finish());
            }
        }
    }

    /// Emit `finish`, unless the stream was destroyed since it was scheduled.
    fn finish(&self) {
        let callbacks = {
            let mut state = self.state();
            state.pending_cb = state.pending_cb.saturating_sub(1);
            if !state.need_finish() {
                return;
            }
            state.finished = true;
            mem::take(&mut state.on_finished)
        };
        for done in callbacks {
            done(Ok(()));
        }
        debug!("writable stream finished: id={}", self.id());
        self.emit(&StreamEvent::Finish);
        if self.shared.options.auto_destroy {
            self.destroy_inner(None);
        }
    }
}
