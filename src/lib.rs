#![doc(html_root_url = "https://docs.rs/quillstream/latest")]
//! Public API for the `quillstream` library.
//!
//! This crate provides a single-threaded writable stream whose shutdown
//! sequence is driven by an explicit deferred-task queue. Graceful
//! completion (`end`) and abrupt termination (`destroy`) are arbitrated in
//! favour of destruction: once a stream is destroyed it never emits
//! `prefinish` or `finish`, and it emits `close` exactly once.

pub mod error;
pub mod events;
pub mod finished;
pub mod metrics;
pub mod scheduler;
pub mod writable;

pub use error::{ConfigError, Result, StreamError};
pub use events::{EventKind, ListenerId, Listeners, StreamEvent};
pub use finished::{Completion, finished};
pub use metrics::{BYTES_WRITTEN, CloseOutcome, HANDLER_ERRORS, STREAMS_ACTIVE, STREAMS_CLOSED};
pub use scheduler::{Lane, SchedulerError, TaskQueue};
pub use writable::{
    Chunk,
    DEFAULT_HIGH_WATER_MARK,
    DestroyCallback,
    Done,
    Encoding,
    FinalCallback,
    Lifecycle,
    StreamId,
    Writable,
    WritableBuilder,
    WritableOptions,
    WriteCallback,
    active_stream_count,
};
