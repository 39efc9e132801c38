//! Ordered capture of stream emissions.

use std::{cell::RefCell, rc::Rc};

use quillstream::{EventKind, StreamEvent, Writable};

/// Records every event a stream emits, in order.
#[derive(Clone, Debug, Default)]
pub struct EventRecorder {
    events: Rc<RefCell<Vec<StreamEvent>>>,
}

impl EventRecorder {
    /// Attach a recorder to every event kind of `stream`.
    #[must_use]
    pub fn attach(stream: &Writable) -> Self {
        let recorder = Self::default();
        for kind in EventKind::ALL {
            let events = Rc::clone(&recorder.events);
            stream.on(kind, move |event| events.borrow_mut().push(event.clone()));
        }
        recorder
    }

    /// Recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<StreamEvent> { self.events.borrow().clone() }

    /// Kinds of the recorded events.
    #[must_use]
    pub fn kinds(&self) -> Vec<EventKind> {
        self.events.borrow().iter().map(StreamEvent::kind).collect()
    }

    /// Number of recorded events of `kind`.
    #[must_use]
    pub fn count(&self, kind: EventKind) -> usize {
        self.events
            .borrow()
            .iter()
            .filter(|event| event.kind() == kind)
            .count()
    }

    /// Returns `true` if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.events.borrow().is_empty() }
}
