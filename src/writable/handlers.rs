//! User-supplied handlers invoked by a stream.
//!
//! [`Handlers`] stores the callbacks configured through
//! [`WritableBuilder`](super::WritableBuilder). The stream takes a handler out
//! of its slot while calling it so the handler may freely call back into the
//! stream.

use bytes::Bytes;

use super::{
    callback::{DestroyCallback, FinalCallback, WriteCallback},
    chunk::{Chunk, Encoding},
};
use crate::error::StreamError;

/// Type alias for the `write` handler.
pub type WriteHandler = Box<dyn FnMut(Bytes, Encoding, WriteCallback) + 'static>;

/// Type alias for the `writev` handler.
pub type WritevHandler = Box<dyn FnMut(Vec<Chunk>, WriteCallback) + 'static>;

/// Type alias for the finalizer, invoked at most once before `prefinish`.
pub type FinalHandler = Box<dyn FnOnce(FinalCallback) + 'static>;

/// Type alias for the destroy hook, invoked at most once by `destroy()`.
pub type DestroyHandler = Box<dyn FnOnce(Option<StreamError>, DestroyCallback) + 'static>;

/// Callbacks used by the stream.
#[derive(Default)]
pub(super) struct Handlers {
    pub(super) write: Option<WriteHandler>,
    pub(super) writev: Option<WritevHandler>,
    pub(super) finalizer: Option<FinalHandler>,
    pub(super) destroyer: Option<DestroyHandler>,
}

impl Handlers {
    pub(super) fn has_writev(&self) -> bool { self.writev.is_some() }

    pub(super) fn has_finalizer(&self) -> bool { self.finalizer.is_some() }
}
