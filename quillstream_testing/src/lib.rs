//! Test utilities for driving [`quillstream`] streams.
//!
//! [`CallTracker`] wraps listeners and completion callbacks in call-count
//! expectations that are checked when the tracker is verified or dropped,
//! and [`EventRecorder`] captures the order in which a stream emits events.
//!
//! ```rust
//! use quillstream::{EventKind, TaskQueue, Writable};
//! use quillstream_testing::CallTracker;
//!
//! let queue = TaskQueue::new();
//! let stream = Writable::builder(&queue)
//!     .write(|_, _, cb| cb.ok())
//!     .build()
//!     .expect("build stream");
//! let tracker = CallTracker::new();
//! stream.on(EventKind::Close, tracker.must_call("close", 1));
//! stream.destroy();
//! queue.run_until_idle().expect("drain");
//! tracker.assert_satisfied();
//! ```

pub mod logging;
pub mod recorder;
pub mod tracker;

pub use logging::{LoggerHandle, logger};
pub use recorder::EventRecorder;
pub use tracker::{CallCounter, CallTracker, Expected};
