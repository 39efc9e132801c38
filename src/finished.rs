//! Future resolving when a stream completes.
//!
//! [`finished`] mirrors the usual "end of stream" helper: it resolves with
//! `Ok(())` once `finish` fires, with the stream's error if `error` fires,
//! and with [`StreamError::PrematureClose`] if `close` arrives first.

use std::{
    cell::RefCell,
    future::Future,
    pin::Pin,
    rc::Rc,
    task::{Context, Poll},
};

use tokio::sync::oneshot;

use crate::{
    error::{Result, StreamError},
    events::{EventKind, StreamEvent},
    writable::Writable,
};

/// Future returned by [`finished`].
#[derive(Debug)]
#[must_use = "futures do nothing unless awaited"]
pub struct Completion {
    rx: oneshot::Receiver<Result>,
}

impl Future for Completion {
    type Output = Result;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        // A dropped sender means the stream went away without reporting.
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(StreamError::PrematureClose)))
    }
}

/// Observe `stream` until it finishes, fails or closes.
///
/// A stream that already failed resolves at once with its stored error.
///
/// The future only makes progress while the stream's task queue is driven.
///
/// # Examples
///
/// ```
/// use quillstream::{TaskQueue, Writable, finished};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let queue = TaskQueue::new();
/// let stream = Writable::builder(&queue)
///     .write(|_, _, cb| cb.ok())
///     .build()
///     .expect("build stream");
/// let done = finished(&stream);
/// stream.end();
/// queue.run_until_idle().expect("drain");
/// assert!(done.await.is_ok());
/// # }
/// ```
pub fn finished(stream: &Writable) -> Completion {
    let (tx, rx) = oneshot::channel();

    if stream.is_finished() {
        let _ = tx.send(Ok(()));
        return Completion { rx };
    }
    if stream.is_closed() {
        let _ = tx.send(Err(stream.errored().unwrap_or(StreamError::PrematureClose)));
        return Completion { rx };
    }
    if let Some(err) = stream.errored() {
        let _ = tx.send(Err(err));
        return Completion { rx };
    }

    let slot = Rc::new(RefCell::new(Some(tx)));
    let resolve = move |slot: &Rc<RefCell<Option<oneshot::Sender<Result>>>>, result: Result| {
        if let Some(tx) = slot.borrow_mut().take() {
            let _ = tx.send(result);
        }
    };

    let s = Rc::clone(&slot);
    stream.once(EventKind::Finish, move |_| resolve(&s, Ok(())));
    let s = Rc::clone(&slot);
    stream.once(EventKind::Error, move |event| {
        if let StreamEvent::Error(err) = event {
            resolve(&s, Err(err.clone()));
        }
    });
    // `error` always precedes `close`, so a close reaching this listener
    // unresolved never saw an error.
    stream.once(EventKind::Close, move |_| {
        resolve(&slot, Err(StreamError::PrematureClose));
    });

    Completion { rx }
}
