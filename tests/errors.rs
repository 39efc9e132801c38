//! Error routing: rejected writes, failing handlers and destroy errors.

mod common;

use std::io;

use common::{drain, sync_sink};
use quillstream::{EventKind, StreamError, StreamEvent, TaskQueue, Writable};
use quillstream_testing::{CallTracker, EventRecorder, LoggerHandle, logger};
use rstest::{fixture, rstest};
use serial_test::serial;

#[fixture]
fn queue() -> TaskQueue { TaskQueue::new() }

fn boom() -> StreamError { StreamError::handler(io::Error::other("boom")) }

#[rstest]
fn write_after_end_is_rejected_and_destroys(queue: TaskQueue) {
    let stream = sync_sink(&queue).build().expect("build stream");
    let recorder = EventRecorder::attach(&stream);
    let tracker = CallTracker::new();

    stream.end();
    let accepted = stream.write_then(
        "late",
        tracker.must_complete("late write", |result| {
            assert_eq!(result, Err(StreamError::WriteAfterEnd));
        }),
    );
    drain(&queue);

    assert!(!accepted);
    assert_eq!(
        recorder.kinds(),
        [EventKind::Prefinish, EventKind::Error, EventKind::Close]
    );
    assert_eq!(stream.errored(), Some(StreamError::WriteAfterEnd));
    tracker.assert_satisfied();
}

#[rstest]
fn write_after_destroy_only_fails_its_callback(queue: TaskQueue) {
    let stream = sync_sink(&queue).build().expect("build stream");
    let recorder = EventRecorder::attach(&stream);
    let tracker = CallTracker::new();

    stream.destroy();
    drain(&queue);
    let accepted = stream.write_then(
        "late",
        tracker.must_complete("late write", |result| {
            assert_eq!(result, Err(StreamError::Destroyed("write")));
        }),
    );
    drain(&queue);

    assert!(!accepted);
    assert_eq!(recorder.kinds(), [EventKind::Close]);
    assert_eq!(stream.errored(), None);
    tracker.assert_satisfied();
}

#[rstest]
fn failing_write_handler_destroys_with_its_error(queue: TaskQueue) {
    let stream = Writable::builder(&queue)
        .write(|_, _, cb| cb.complete(Err(boom())))
        .build()
        .expect("build stream");
    let recorder = EventRecorder::attach(&stream);
    let tracker = CallTracker::new();

    let accepted = stream.write_then(
        "chunk",
        tracker.must_complete("write", |result| {
            assert!(result.is_err_and(|e| e.is_handler()));
        }),
    );
    drain(&queue);

    assert!(!accepted);
    assert_eq!(recorder.kinds(), [EventKind::Error, EventKind::Close]);
    assert!(stream.is_destroyed());
    assert!(stream.errored().is_some_and(|e| e.is_handler()));
    tracker.assert_satisfied();
}

#[rstest]
fn without_auto_destroy_errors_leave_the_stream_open(queue: TaskQueue) {
    let stream = Writable::builder(&queue)
        .write(|_, _, cb| cb.complete(Err(boom())))
        .auto_destroy(false)
        .build()
        .expect("build stream");
    let recorder = EventRecorder::attach(&stream);

    stream.write("chunk");
    drain(&queue);

    assert_eq!(recorder.kinds(), [EventKind::Error]);
    assert!(!stream.is_destroyed());
    assert!(!stream.is_closed());
    assert!(!stream.is_writable());
}

#[rstest]
fn failing_finalizer_fails_end_and_skips_finish(queue: TaskQueue) {
    let stream = sync_sink(&queue)
        .finalizer(|cb| cb.complete(Err(boom())))
        .build()
        .expect("build stream");
    let recorder = EventRecorder::attach(&stream);
    let tracker = CallTracker::new();

    stream.end_then(tracker.must_complete("end", |result| {
        assert!(result.is_err_and(|e| e.is_handler()));
    }));
    drain(&queue);

    assert_eq!(recorder.kinds(), [EventKind::Error, EventKind::Close]);
    assert!(!stream.is_finished());
    tracker.assert_satisfied();
}

#[rstest]
fn late_failing_finalizer_fails_pending_end_callback(queue: TaskQueue) {
    let deferred = queue.clone();
    let stream = sync_sink(&queue)
        .finalizer(move |cb| deferred.queue_microtask(move || cb.complete(Err(boom()))))
        .build()
        .expect("build stream");
    let recorder = EventRecorder::attach(&stream);
    let tracker = CallTracker::new();

    stream.end_then(tracker.must_complete("end", |result| {
        assert!(result.is_err_and(|e| e.is_handler()));
    }));
    drain(&queue);

    assert_eq!(recorder.kinds(), [EventKind::Error, EventKind::Close]);
    tracker.assert_satisfied();
}

#[rstest]
fn destroy_with_error_emits_error_then_close(queue: TaskQueue) {
    let stream = sync_sink(&queue).build().expect("build stream");
    let recorder = EventRecorder::attach(&stream);

    stream.destroy_with_error(StreamError::PrematureClose);
    stream.destroy_with_error(boom());
    drain(&queue);

    assert_eq!(
        recorder.events(),
        [
            StreamEvent::Error(StreamError::PrematureClose),
            StreamEvent::Close
        ]
    );
    assert_eq!(stream.errored(), Some(StreamError::PrematureClose));
}

#[rstest]
fn async_destroyer_delays_close_and_may_supply_the_error(queue: TaskQueue) {
    let deferred = queue.clone();
    let stream = sync_sink(&queue)
        .destroyer(move |err, cb| {
            assert!(err.is_none());
            deferred.queue_microtask(move || cb.complete(Some(StreamError::PrematureClose)));
        })
        .build()
        .expect("build stream");
    let recorder = EventRecorder::attach(&stream);

    stream.destroy();
    assert!(stream.is_destroyed());
    assert!(!stream.is_closed());

    drain(&queue);
    assert!(stream.is_closed());
    assert_eq!(recorder.kinds(), [EventKind::Error, EventKind::Close]);
    assert_eq!(stream.errored(), Some(StreamError::PrematureClose));
}

#[rstest]
fn double_write_acknowledgement_destroys(queue: TaskQueue) {
    let stream = Writable::builder(&queue)
        .write(|_, _, cb| {
            cb.ok();
            cb.ok();
        })
        .build()
        .expect("build stream");
    let recorder = EventRecorder::attach(&stream);

    stream.write("chunk");
    drain(&queue);

    assert_eq!(recorder.kinds(), [EventKind::Error, EventKind::Close]);
    assert_eq!(stream.errored(), Some(StreamError::MultipleCallback));
}

#[rstest]
#[serial]
fn unhandled_error_is_logged(queue: TaskQueue, mut logger: LoggerHandle) {
    let stream = sync_sink(&queue).build().expect("build stream");
    let closes = CallTracker::new();
    stream.on(EventKind::Close, closes.must_call("close", 1));

    stream.destroy_with_error(StreamError::PrematureClose);
    drain(&queue);

    let messages = logger.messages();
    assert!(
        messages
            .iter()
            .any(|m| m.starts_with("unhandled writable stream error")),
        "missing warning in {messages:?}"
    );
    closes.assert_satisfied();
}
