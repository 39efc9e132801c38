//! Call-count expectations for listeners and callbacks.
//!
//! Each wrapper produced by a [`CallTracker`] shares a counter with the
//! tracker. [`CallTracker::verify`] compares every counter with its
//! expectation; dropping the last tracker handle without verifying asserts
//! the same thing, so a forgotten check still fails the test.

use std::{
    cell::{Cell, RefCell},
    fmt,
    rc::Rc,
};

use quillstream::{Result, StreamEvent};

/// Expected number of calls.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Expected {
    /// Exactly this many calls.
    Exactly(usize),
    /// At least this many calls.
    AtLeast(usize),
}

impl Expected {
    fn is_met(self, calls: usize) -> bool {
        match self {
            Expected::Exactly(n) => calls == n,
            Expected::AtLeast(n) => calls >= n,
        }
    }
}

impl fmt::Display for Expected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expected::Exactly(n) => write!(f, "exactly {n}"),
            Expected::AtLeast(n) => write!(f, "at least {n}"),
        }
    }
}

/// Shared counter handed out by [`CallTracker::counter`].
#[derive(Clone, Debug)]
pub struct CallCounter {
    label: Rc<str>,
    calls: Rc<Cell<usize>>,
    forbidden: bool,
}

impl CallCounter {
    /// Record one call.
    ///
    /// # Panics
    ///
    /// Panics immediately if the counter was created by
    /// [`CallTracker::must_not_call`].
    pub fn hit(&self) {
        self.calls.set(self.calls.get() + 1);
        assert!(!self.forbidden, "`{}` must not be called", self.label);
    }

    /// Calls recorded so far.
    #[must_use]
    pub fn calls(&self) -> usize { self.calls.get() }
}

struct Entry {
    counter: CallCounter,
    expected: Expected,
}

#[derive(Default)]
struct TrackerState {
    entries: RefCell<Vec<Entry>>,
    verified: Cell<bool>,
}

impl TrackerState {
    fn mismatches(&self) -> Vec<String> {
        self.entries
            .borrow()
            .iter()
            .filter(|entry| !entry.expected.is_met(entry.counter.calls()))
            .map(|entry| {
                format!(
                    "`{}` expected {} call(s), got {}",
                    entry.counter.label,
                    entry.expected,
                    entry.counter.calls()
                )
            })
            .collect()
    }
}

impl Drop for TrackerState {
    fn drop(&mut self) {
        if self.verified.get() || std::thread::panicking() {
            return;
        }
        let mismatches = self.mismatches();
        assert!(
            mismatches.is_empty(),
            "unverified call expectations failed:\n{}",
            mismatches.join("\n")
        );
    }
}

/// Registry of call-count expectations.
#[derive(Clone, Default)]
pub struct CallTracker {
    state: Rc<TrackerState>,
}

impl CallTracker {
    /// Create an empty tracker.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Register an expectation and return its counter.
    #[must_use]
    pub fn counter(&self, label: &str, expected: Expected) -> CallCounter {
        let counter = CallCounter {
            label: Rc::from(label),
            calls: Rc::new(Cell::new(0)),
            forbidden: false,
        };
        self.push(counter.clone(), expected);
        counter
    }

    fn push(&self, counter: CallCounter, expected: Expected) {
        self.state.entries.borrow_mut().push(Entry { counter, expected });
        self.state.verified.set(false);
    }

    /// Listener that must run exactly `times` times.
    pub fn must_call(&self, label: &str, times: usize) -> impl FnMut(&StreamEvent) + 'static {
        self.must_call_with(label, times, |_| {})
    }

    /// Wrap `f` in a listener that must run exactly `times` times.
    pub fn must_call_with(
        &self,
        label: &str,
        times: usize,
        mut f: impl FnMut(&StreamEvent) + 'static,
    ) -> impl FnMut(&StreamEvent) + 'static {
        let counter = self.counter(label, Expected::Exactly(times));
        move |event| {
            counter.hit();
            f(event);
        }
    }

    /// Listener that fails the test as soon as it runs.
    pub fn must_not_call(&self, label: &str) -> impl FnMut(&StreamEvent) + 'static {
        let counter = CallCounter {
            label: Rc::from(label),
            calls: Rc::new(Cell::new(0)),
            forbidden: true,
        };
        self.push(counter.clone(), Expected::Exactly(0));
        move |_| counter.hit()
    }

    /// Completion callback that must run exactly once; `check` inspects the
    /// outcome.
    pub fn must_complete(
        &self,
        label: &str,
        check: impl FnOnce(Result) + 'static,
    ) -> impl FnOnce(Result) + 'static {
        let counter = self.counter(label, Expected::Exactly(1));
        move |result| {
            counter.hit();
            check(result);
        }
    }

    /// Describe every unmet expectation and mark the tracker verified.
    #[must_use]
    pub fn verify(&self) -> Vec<String> {
        self.state.verified.set(true);
        self.state.mismatches()
    }

    /// Verify and panic with every unmet expectation.
    ///
    /// # Panics
    ///
    /// Panics if any expectation is unmet.
    pub fn assert_satisfied(&self) {
        let mismatches = self.verify();
        assert!(
            mismatches.is_empty(),
            "call expectations failed:\n{}",
            mismatches.join("\n")
        );
    }
}

impl fmt::Debug for CallTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallTracker")
            .field("expectations", &self.state.entries.borrow().len())
            .field("verified", &self.state.verified.get())
            .finish()
    }
}
