//! Abrupt termination: `destroy()`, error routing and `close`.

use log::{debug, info, warn};

use super::{Writable, callback::DestroyCallback};
use crate::{error::StreamError, events::StreamEvent, metrics::CloseOutcome};

impl Writable {
    /// Mark the stream destroyed and run the destroy hook.
    ///
    /// Runs synchronously so that any deferred continuation queued earlier
    /// observes the destroyed flag.
    pub(super) fn destroy_inner(&self, err: Option<StreamError>) {
        let fail_pending = {
            let mut state = self.state();
            if state.destroyed {
                return;
            }
            if let Some(e) = &err {
                state.record_error(e);
            }
            state.destroyed = true;
            !state.buffered.is_empty() || !state.on_finished.is_empty()
        };
        debug!(
            "writable stream destroyed: id={}, error={:?}",
            self.id(),
            err.as_ref().map(ToString::to_string)
        );

        if fail_pending {
            let this = self.clone();
            self.queue().queue_tick(move || this.error_buffer());
        }

        let destroyer = self.shared.handlers.borrow_mut().destroyer.take();
        let cb = DestroyCallback::new(self.clone());
        match destroyer {
            Some(destroyer) => destroyer(err, cb),
            None => cb.complete(err),
        }
    }

    /// Completion of the destroy hook. Schedules `error` (if any) and `close`.
    pub(super) fn on_destroy(&self, err: Option<StreamError>) {
        let outcome = {
            let mut state = self.state();
            if let Some(e) = &err {
                state.record_error(e);
            }
            state.closed = true;
            if state.finished {
                CloseOutcome::Finished
            } else if state.errored.is_some() {
                CloseOutcome::Errored
            } else {
                CloseOutcome::Destroyed
            }
        };
        crate::metrics::inc_closed(outcome);

        let this = self.clone();
        self.queue().queue_tick(move || {
            if let Some(err) = err {
                this.emit_error(err);
            }
            this.emit_close();
        });
    }

    /// Route `err` to `destroy()` or, without `auto_destroy`, to an `error`
    /// event. No-op once the stream is destroyed.
    pub(super) fn error_or_destroy(&self, err: StreamError, sync: bool) {
        if self.state().destroyed {
            debug!(
                "ignoring error on destroyed stream: id={}, error={err}",
                self.id()
            );
            return;
        }
        if self.shared.options.auto_destroy {
            self.destroy_inner(Some(err));
            return;
        }
        self.state().record_error(&err);
        if sync {
            let this = self.clone();
            self.queue().queue_tick(move || this.emit_error(err));
        } else {
            self.emit_error(err);
        }
    }

    fn emit_error(&self, err: StreamError) {
        {
            let mut state = self.state();
            if state.error_emitted {
                return;
            }
            state.error_emitted = true;
        }
        let message = err.to_string();
        if !self.emit(&StreamEvent::Error(err)) {
            warn!(
                "unhandled writable stream error: id={}, error={message}",
                self.id()
            );
        }
    }

    fn emit_close(&self) {
        let active = {
            let mut state = self.state();
            if state.close_emitted {
                return;
            }
            state.close_emitted = true;
            state.active.take()
        };
        drop(active);
        info!(
            "writable stream closed: id={}, active_streams={}",
            self.id(),
            super::active_stream_count()
        );
        if self.shared.options.emit_close {
            self.emit(&StreamEvent::Close);
        }
    }
}
