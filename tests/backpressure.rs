//! Buffering, the high-water mark and corking.

mod common;

use std::{cell::RefCell, rc::Rc};

use common::{drain, parked_sink, release_next, sync_sink};
use quillstream::{EventKind, TaskQueue, Writable};
use quillstream_testing::{CallTracker, EventRecorder};
use rstest::{fixture, rstest};

#[fixture]
fn queue() -> TaskQueue { TaskQueue::new() }

#[rstest]
fn write_reports_backpressure_at_high_water_mark(queue: TaskQueue) {
    let (builder, _parked, _) = parked_sink(&queue);
    let stream = builder.high_water_mark(4).build().expect("build stream");

    assert!(stream.write("ab"));
    assert!(!stream.write("cd"));
    assert!(stream.needs_drain());
    assert_eq!(stream.buffered_len(), 4);
}

#[rstest]
fn drain_fires_once_the_buffer_empties(queue: TaskQueue) {
    let (builder, parked, _) = parked_sink(&queue);
    let stream = builder.high_water_mark(4).build().expect("build stream");
    let recorder = EventRecorder::attach(&stream);

    stream.write("ab");
    stream.write("cd");
    release_next(&parked);
    assert_eq!(recorder.count(EventKind::Drain), 0, "two bytes still pending");

    release_next(&parked);
    drain(&queue);
    assert_eq!(recorder.kinds(), [EventKind::Drain]);
    assert!(!stream.needs_drain());
    assert!(stream.write("ef"));
}

#[rstest]
fn writes_queue_behind_the_one_in_flight(queue: TaskQueue) {
    let (builder, parked, seen) = parked_sink(&queue);
    let stream = builder.build().expect("build stream");

    for chunk in ["a", "b", "c"] {
        stream.write(chunk);
    }
    assert_eq!(*seen.borrow(), ["a"]);

    release_next(&parked);
    assert_eq!(*seen.borrow(), ["a", "b"]);
    release_next(&parked);
    release_next(&parked);
    drain(&queue);

    assert_eq!(*seen.borrow(), ["a", "b", "c"]);
    assert_eq!(stream.buffered_len(), 0);
}

#[rstest]
fn write_callbacks_run_in_write_order(queue: TaskQueue) {
    let stream = sync_sink(&queue).build().expect("build stream");
    let order = Rc::new(RefCell::new(Vec::new()));
    for label in ["first", "second", "third"] {
        let o = Rc::clone(&order);
        stream.write_then(label, move |result| {
            assert!(result.is_ok());
            o.borrow_mut().push(label);
        });
    }
    drain(&queue);
    assert_eq!(*order.borrow(), ["first", "second", "third"]);
}

fn writev_sink(queue: &TaskQueue, batches: &Rc<RefCell<Vec<usize>>>) -> Writable {
    let b = Rc::clone(batches);
    Writable::builder(queue)
        .writev(move |chunks, cb| {
            b.borrow_mut().push(chunks.len());
            cb.ok();
        })
        .build()
        .expect("build stream")
}

#[rstest]
fn uncork_flushes_buffered_chunks_as_one_batch(queue: TaskQueue) {
    let batches = Rc::new(RefCell::new(Vec::new()));
    let stream = writev_sink(&queue, &batches);

    stream.cork();
    for chunk in ["a", "b", "c"] {
        assert!(stream.write(chunk));
    }
    assert!(batches.borrow().is_empty());
    assert_eq!(stream.corked(), 1);

    stream.uncork();
    drain(&queue);
    assert_eq!(*batches.borrow(), [3]);
    assert_eq!(stream.buffered_len(), 0);
}

#[rstest]
fn nested_cork_needs_matching_uncorks(queue: TaskQueue) {
    let batches = Rc::new(RefCell::new(Vec::new()));
    let stream = writev_sink(&queue, &batches);

    stream.cork();
    stream.cork();
    stream.write("a");
    stream.write("b");
    stream.uncork();
    assert!(batches.borrow().is_empty());
    stream.uncork();
    assert_eq!(*batches.borrow(), [2]);
}

#[rstest]
fn end_flushes_a_corked_stream(queue: TaskQueue) {
    let batches = Rc::new(RefCell::new(Vec::new()));
    let stream = writev_sink(&queue, &batches);
    let tracker = CallTracker::new();
    stream.on(EventKind::Finish, tracker.must_call("finish", 1));

    stream.cork();
    stream.write("a");
    stream.write("b");
    stream.end();
    drain(&queue);

    assert_eq!(*batches.borrow(), [2]);
    assert!(stream.is_finished());
    tracker.assert_satisfied();
}

#[rstest]
fn single_chunk_prefers_the_write_handler(queue: TaskQueue) {
    let batches = Rc::new(RefCell::new(Vec::new()));
    let singles = Rc::new(RefCell::new(0));
    let b = Rc::clone(&batches);
    let s = Rc::clone(&singles);
    let stream = Writable::builder(&queue)
        .write(move |_, _, cb| {
            *s.borrow_mut() += 1;
            cb.ok();
        })
        .writev(move |chunks, cb| {
            b.borrow_mut().push(chunks.len());
            cb.ok();
        })
        .build()
        .expect("build stream");

    stream.write("solo");
    stream.cork();
    stream.write("x");
    stream.write("y");
    stream.uncork();
    drain(&queue);

    assert_eq!(*singles.borrow(), 1);
    assert_eq!(*batches.borrow(), [2]);
}
