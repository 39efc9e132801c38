//! Builder and options for [`Writable`] streams.

use std::fmt;

use bytes::Bytes;

use super::{
    Writable,
    callback::{DestroyCallback, FinalCallback, WriteCallback},
    chunk::{Chunk, Encoding},
    handlers::Handlers,
};
use crate::{
    error::{ConfigError, StreamError},
    scheduler::TaskQueue,
};

/// Default high-water mark in bytes.
pub const DEFAULT_HIGH_WATER_MARK: usize = 16 * 1024;

/// Scalar options controlling stream behaviour.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WritableOptions {
    /// Buffered byte count at which `write` starts reporting backpressure.
    pub high_water_mark: usize,
    /// Emit `close` once the stream is destroyed.
    pub emit_close: bool,
    /// Destroy the stream after `finish` and on errors.
    pub auto_destroy: bool,
    /// Encoding tag used when a write does not supply one.
    pub default_encoding: Encoding,
}

impl Default for WritableOptions {
    fn default() -> Self {
        Self {
            high_water_mark: DEFAULT_HIGH_WATER_MARK,
            emit_close: true,
            auto_destroy: true,
            default_encoding: Encoding::default(),
        }
    }
}

/// Builder for [`Writable`].
///
/// # Examples
///
/// ```
/// use quillstream::{TaskQueue, Writable};
///
/// let queue = TaskQueue::new();
/// let stream = Writable::builder(&queue)
///     .high_water_mark(4)
///     .write(|_chunk, _encoding, cb| cb.ok())
///     .build()
///     .expect("write handler supplied");
/// assert!(stream.write("abc"));
/// ```
pub struct WritableBuilder {
    queue: TaskQueue,
    options: WritableOptions,
    handlers: Handlers,
}

impl WritableBuilder {
    pub(super) fn new(queue: &TaskQueue) -> Self {
        Self {
            queue: queue.clone(),
            options: WritableOptions::default(),
            handlers: Handlers::default(),
        }
    }

    /// Replace all scalar options at once.
    #[must_use]
    pub fn options(mut self, options: WritableOptions) -> Self {
        self.options = options;
        self
    }

    /// Set the high-water mark in bytes.
    #[must_use]
    pub fn high_water_mark(mut self, bytes: usize) -> Self {
        self.options.high_water_mark = bytes;
        self
    }

    /// Control whether `close` is emitted after destruction.
    #[must_use]
    pub fn emit_close(mut self, emit: bool) -> Self {
        self.options.emit_close = emit;
        self
    }

    /// Control whether the stream destroys itself after `finish` or an error.
    #[must_use]
    pub fn auto_destroy(mut self, auto: bool) -> Self {
        self.options.auto_destroy = auto;
        self
    }

    /// Set the encoding tag used by writes that do not supply one.
    #[must_use]
    pub fn default_encoding(mut self, encoding: Encoding) -> Self {
        self.options.default_encoding = encoding;
        self
    }

    /// Handler invoked once per chunk. It must complete the callback before
    /// the next chunk is delivered.
    #[must_use]
    pub fn write<F>(mut self, handler: F) -> Self
    where
        F: FnMut(Bytes, Encoding, WriteCallback) + 'static,
    {
        self.handlers.write = Some(Box::new(handler));
        self
    }

    /// Handler receiving every buffered chunk at once when more than one is
    /// waiting. Also used for single chunks when no `write` handler is set.
    #[must_use]
    pub fn writev<F>(mut self, handler: F) -> Self
    where
        F: FnMut(Vec<Chunk>, WriteCallback) + 'static,
    {
        self.handlers.writev = Some(Box::new(handler));
        self
    }

    /// Finalizer invoked once all writes are acknowledged after `end()`.
    #[must_use]
    pub fn finalizer<F>(mut self, handler: F) -> Self
    where
        F: FnOnce(FinalCallback) + 'static,
    {
        self.handlers.finalizer = Some(Box::new(handler));
        self
    }

    /// Hook invoked by `destroy()` to release resources. Without one the
    /// stream completes destruction immediately.
    #[must_use]
    pub fn destroyer<F>(mut self, handler: F) -> Self
    where
        F: FnOnce(Option<StreamError>, DestroyCallback) + 'static,
    {
        self.handlers.destroyer = Some(Box::new(handler));
        self
    }

    /// Build the stream.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingWriteHandler`] if neither `write` nor
    /// `writev` was supplied.
    pub fn build(self) -> Result<Writable, ConfigError> {
        if self.handlers.write.is_none() && !self.handlers.has_writev() {
            return Err(ConfigError::MissingWriteHandler);
        }
        Ok(Writable::from_parts(self.queue, self.options, self.handlers))
    }
}

impl fmt::Debug for WritableBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WritableBuilder")
            .field("options", &self.options)
            .field("write", &self.handlers.write.is_some())
            .field("writev", &self.handlers.has_writev())
            .field("finalizer", &self.handlers.has_finalizer())
            .field("destroyer", &self.handlers.destroyer.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_requires_a_write_handler() {
        let queue = TaskQueue::new();
        let err = Writable::builder(&queue)
            .finalizer(|cb| cb.ok())
            .build()
            .expect_err("no write handler");
        assert_eq!(err, ConfigError::MissingWriteHandler);
    }

    #[test]
    fn writev_alone_is_enough() {
        let queue = TaskQueue::new();
        let stream = Writable::builder(&queue)
            .writev(|_chunks, cb| cb.ok())
            .build()
            .expect("writev handler supplied");
        assert!(stream.is_writable());
    }

    #[test]
    fn options_default_to_documented_values() {
        let options = WritableOptions::default();
        assert_eq!(options.high_water_mark, DEFAULT_HIGH_WATER_MARK);
        assert!(options.emit_close);
        assert!(options.auto_destroy);
        assert_eq!(options.default_encoding, Encoding::Utf8);
    }

    #[test]
    fn setters_override_options() {
        let queue = TaskQueue::new();
        let stream = Writable::builder(&queue)
            .high_water_mark(1)
            .emit_close(false)
            .auto_destroy(false)
            .default_encoding(Encoding::Buffer)
            .write(|_, _, cb| cb.ok())
            .build()
            .expect("build");
        assert_eq!(
            stream.options(),
            WritableOptions {
                high_water_mark: 1,
                emit_close: false,
                auto_destroy: false,
                default_encoding: Encoding::Buffer,
            }
        );
    }
}
