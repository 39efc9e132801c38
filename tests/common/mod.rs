//! Stream builders shared by the integration tests.

#![allow(dead_code, reason = "each test binary uses a different subset")]

use std::{cell::RefCell, rc::Rc};

use quillstream::{TaskQueue, Writable, WritableBuilder, WriteCallback};

/// Builder with a write handler that acknowledges every chunk synchronously.
pub fn sync_sink(queue: &TaskQueue) -> WritableBuilder {
    Writable::builder(queue).write(|_chunk, _encoding, cb| cb.ok())
}

/// Builder whose finalizer completes on the microtask lane.
pub fn deferred_final_sink(queue: &TaskQueue) -> WritableBuilder {
    let deferred = queue.clone();
    sync_sink(queue).finalizer(move |cb| deferred.queue_microtask(move || cb.ok()))
}

/// Write handler that parks every callback so the test decides when a write
/// completes. Returns the builder together with the parked callbacks and the
/// chunks seen so far.
pub fn parked_sink(
    queue: &TaskQueue,
) -> (WritableBuilder, Rc<RefCell<Vec<WriteCallback>>>, Rc<RefCell<Vec<String>>>) {
    let parked = Rc::new(RefCell::new(Vec::new()));
    let seen = Rc::new(RefCell::new(Vec::new()));
    let p = Rc::clone(&parked);
    let s = Rc::clone(&seen);
    let builder = Writable::builder(queue).write(move |chunk, _encoding, cb| {
        s.borrow_mut()
            .push(String::from_utf8_lossy(&chunk).into_owned());
        p.borrow_mut().push(cb);
    });
    (builder, parked, seen)
}

/// Complete the oldest parked write.
pub fn release_next(parked: &Rc<RefCell<Vec<WriteCallback>>>) {
    let cb = parked.borrow_mut().remove(0);
    cb.ok();
}

/// Drain `queue`, failing the test on scheduler errors.
pub fn drain(queue: &TaskQueue) -> usize { queue.run_until_idle().expect("task queue drain") }
