//! Observer lists for stream notifications.
//!
//! [`Listeners`] keeps an ordered list of callbacks per [`EventKind`]. An
//! emission snapshots the list before invoking anything, so listeners may
//! register or remove listeners, or call back into the stream, while the
//! emission is in progress.

use std::{cell::RefCell, fmt, rc::Rc};

use log::warn;

use crate::error::StreamError;

/// Names of the notifications a stream emits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Graceful completion has committed; precedes [`EventKind::Finish`].
    Prefinish,
    /// All data has been flushed and the finalizer completed.
    Finish,
    /// The stream released its resources. Fires at most once.
    Close,
    /// The buffer emptied after a write reported backpressure.
    Drain,
    /// The stream failed. Fires at most once, before `close`.
    Error,
}

impl EventKind {
    /// Every kind, in declaration order.
    pub const ALL: [EventKind; 5] = [
        EventKind::Prefinish,
        EventKind::Finish,
        EventKind::Close,
        EventKind::Drain,
        EventKind::Error,
    ];

    /// Lower-case event name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Prefinish => "prefinish",
            EventKind::Finish => "finish",
            EventKind::Close => "close",
            EventKind::Drain => "drain",
            EventKind::Error => "error",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// A notification delivered to listeners.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StreamEvent {
    /// See [`EventKind::Prefinish`].
    Prefinish,
    /// See [`EventKind::Finish`].
    Finish,
    /// See [`EventKind::Close`].
    Close,
    /// See [`EventKind::Drain`].
    Drain,
    /// See [`EventKind::Error`].
    Error(StreamError),
}

impl StreamEvent {
    /// Kind of this event.
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            StreamEvent::Prefinish => EventKind::Prefinish,
            StreamEvent::Finish => EventKind::Finish,
            StreamEvent::Close => EventKind::Close,
            StreamEvent::Drain => EventKind::Drain,
            StreamEvent::Error(_) => EventKind::Error,
        }
    }
}

/// Identifier returned on registration and accepted by [`Listeners::off`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Callback = Rc<RefCell<dyn FnMut(&StreamEvent)>>;

struct Entry {
    id: ListenerId,
    kind: EventKind,
    once: bool,
    callback: Callback,
}

/// Ordered listener registry.
#[derive(Default)]
pub struct Listeners {
    entries: Vec<Entry>,
    next_id: u64,
}

impl Listeners {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Register `f` for every emission of `kind`.
    pub fn on(&mut self, kind: EventKind, f: impl FnMut(&StreamEvent) + 'static) -> ListenerId {
        self.register(kind, false, f)
    }

    /// Register `f` for the next emission of `kind` only.
    pub fn once(&mut self, kind: EventKind, f: impl FnMut(&StreamEvent) + 'static) -> ListenerId {
        self.register(kind, true, f)
    }

    fn register(
        &mut self,
        kind: EventKind,
        once: bool,
        f: impl FnMut(&StreamEvent) + 'static,
    ) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.entries.push(Entry {
            id,
            kind,
            once,
            callback: Rc::new(RefCell::new(f)),
        });
        id
    }

    /// Remove a listener. Returns `false` if it was not registered.
    pub fn off(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.id != id);
        self.entries.len() != before
    }

    /// Number of listeners registered for `kind`.
    #[must_use]
    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.entries.iter().filter(|entry| entry.kind == kind).count()
    }

    /// Take the callbacks that should observe an emission of `kind`,
    /// removing `once` listeners from the registry.
    pub(crate) fn snapshot(&mut self, kind: EventKind) -> Vec<Callback> {
        let callbacks = self
            .entries
            .iter()
            .filter(|entry| entry.kind == kind)
            .map(|entry| Rc::clone(&entry.callback))
            .collect();
        self.entries.retain(|entry| !(entry.once && entry.kind == kind));
        callbacks
    }

    /// Emit `event` to every listener registered for its kind.
    ///
    /// Returns `true` if at least one listener was registered.
    pub fn emit(&mut self, event: &StreamEvent) -> bool {
        let callbacks = self.snapshot(event.kind());
        dispatch(&callbacks, event)
    }
}

/// Invoke a previously taken snapshot.
///
/// A listener that is already running further up the stack is skipped
/// rather than re-entered.
pub(crate) fn dispatch(callbacks: &[Callback], event: &StreamEvent) -> bool {
    for callback in callbacks {
        match callback.try_borrow_mut() {
            Ok(mut f) => (&mut *f)(event),
            Err(_) => warn!("skipping re-entrant listener: event={}", event.kind()),
        }
    }
    !callbacks.is_empty()
}

impl fmt::Debug for Listeners {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for kind in EventKind::ALL {
            map.entry(&kind.as_str(), &self.listener_count(kind));
        }
        map.finish()
    }
}

#[cfg(test)]
mod tests {
    use std::{
        cell::Cell,
        rc::{Rc, Weak},
    };

    use quillstream_testing::{LoggerHandle, logger};
    use rstest::rstest;
    use serial_test::serial;

    use super::*;

    /// Emit the way a stream does: snapshot under the borrow, dispatch after
    /// releasing it, so listeners may reach the registry.
    fn emit_shared(listeners: &Rc<RefCell<Listeners>>, event: &StreamEvent) -> bool {
        let callbacks = listeners.borrow_mut().snapshot(event.kind());
        dispatch(&callbacks, event)
    }

    fn upgrade(weak: &Weak<RefCell<Listeners>>) -> Rc<RefCell<Listeners>> {
        weak.upgrade().expect("registry alive")
    }

    fn counter(listeners: &mut Listeners, kind: EventKind, once: bool) -> Rc<Cell<usize>> {
        let count = Rc::new(Cell::new(0));
        let c = Rc::clone(&count);
        let f = move |_: &StreamEvent| c.set(c.get() + 1);
        if once {
            listeners.once(kind, f);
        } else {
            listeners.on(kind, f);
        }
        count
    }

    #[rstest]
    #[case(false, 3)]
    #[case(true, 1)]
    fn listener_call_count_depends_on_registration(#[case] once: bool, #[case] expected: usize) {
        let mut listeners = Listeners::new();
        let count = counter(&mut listeners, EventKind::Drain, once);
        for _ in 0..3 {
            listeners.emit(&StreamEvent::Drain);
        }
        assert_eq!(count.get(), expected);
    }

    #[test]
    fn emit_only_reaches_matching_kind() {
        let mut listeners = Listeners::new();
        let close = counter(&mut listeners, EventKind::Close, false);
        let finish = counter(&mut listeners, EventKind::Finish, false);

        assert!(listeners.emit(&StreamEvent::Close));
        assert!(!listeners.emit(&StreamEvent::Prefinish));
        assert_eq!((close.get(), finish.get()), (1, 0));
    }

    #[test]
    fn off_removes_listener() {
        let mut listeners = Listeners::new();
        let count = Rc::new(Cell::new(0));
        let c = Rc::clone(&count);
        let id = listeners.on(EventKind::Finish, move |_| c.set(c.get() + 1));

        assert!(listeners.off(id));
        assert!(!listeners.off(id));
        listeners.emit(&StreamEvent::Finish);
        assert_eq!(count.get(), 0);
        assert_eq!(listeners.listener_count(EventKind::Finish), 0);
    }

    #[test]
    fn listeners_run_in_registration_order() {
        let mut listeners = Listeners::new();
        let order = Rc::new(RefCell::new(Vec::new()));
        for label in ["first", "second", "third"] {
            let o = Rc::clone(&order);
            listeners.on(EventKind::Close, move |_| o.borrow_mut().push(label));
        }
        listeners.emit(&StreamEvent::Close);
        assert_eq!(*order.borrow(), ["first", "second", "third"]);
    }

    #[test]
    fn error_event_carries_payload() {
        let mut listeners = Listeners::new();
        let seen = Rc::new(RefCell::new(None));
        let s = Rc::clone(&seen);
        listeners.on(EventKind::Error, move |event| {
            if let StreamEvent::Error(e) = event {
                *s.borrow_mut() = Some(e.clone());
            }
        });
        listeners.emit(&StreamEvent::Error(StreamError::PrematureClose));
        assert_eq!(*seen.borrow(), Some(StreamError::PrematureClose));
    }

    #[test]
    fn listener_added_during_emission_waits_for_the_next_one() {
        let shared = Rc::new(RefCell::new(Listeners::new()));
        let hits = Rc::new(RefCell::new(Vec::new()));
        let weak = Rc::downgrade(&shared);
        let h = Rc::clone(&hits);
        shared.borrow_mut().on(EventKind::Close, move |_| {
            h.borrow_mut().push("outer");
            let inner = Rc::clone(&h);
            upgrade(&weak)
                .borrow_mut()
                .once(EventKind::Close, move |_| inner.borrow_mut().push("inner"));
        });

        emit_shared(&shared, &StreamEvent::Close);
        assert_eq!(*hits.borrow(), ["outer"]);
        assert_eq!(shared.borrow().listener_count(EventKind::Close), 2);

        emit_shared(&shared, &StreamEvent::Close);
        assert_eq!(*hits.borrow(), ["outer", "outer", "inner"]);
    }

    #[test]
    fn once_listener_is_removed_before_it_runs() {
        let shared = Rc::new(RefCell::new(Listeners::new()));
        let count = Rc::new(Cell::new(0));
        let weak = Rc::downgrade(&shared);
        let c = Rc::clone(&count);
        shared.borrow_mut().once(EventKind::Drain, move |event| {
            c.set(c.get() + 1);
            let registry = upgrade(&weak);
            assert_eq!(registry.borrow().listener_count(EventKind::Drain), 0);
            assert!(!emit_shared(&registry, event));
        });

        assert!(emit_shared(&shared, &StreamEvent::Drain));
        assert_eq!(count.get(), 1);
    }

    #[rstest]
    #[serial]
    fn reentrant_listener_is_skipped_with_a_warning(mut logger: LoggerHandle) {
        let shared = Rc::new(RefCell::new(Listeners::new()));
        let count = Rc::new(Cell::new(0));
        let weak = Rc::downgrade(&shared);
        let c = Rc::clone(&count);
        shared.borrow_mut().on(EventKind::Drain, move |event| {
            c.set(c.get() + 1);
            emit_shared(&upgrade(&weak), event);
        });

        emit_shared(&shared, &StreamEvent::Drain);

        assert_eq!(count.get(), 1);
        let messages = logger.messages();
        assert!(
            messages
                .iter()
                .any(|m| m == "skipping re-entrant listener: event=drain"),
            "missing warning in {messages:?}"
        );
    }
}
