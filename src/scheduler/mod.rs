//! Deferred-task queue driving stream callbacks.
//!
//! [`TaskQueue`] holds two FIFO lanes of zero-argument continuations. The
//! [`Lane::Tick`] lane is drained completely before the [`Lane::Microtask`]
//! lane, and the two alternate until both are empty. Streams use the tick
//! lane for their own deferred notifications; handlers typically defer
//! their completions onto the microtask lane.
//!
//! Everything runs on the calling thread: a task only executes when the
//! owner calls [`TaskQueue::run_until_idle`], so state mutated by a
//! synchronous call is always visible to tasks queued before it.

mod error;

use std::{
    cell::{Cell, RefCell},
    collections::VecDeque,
    fmt,
    rc::Rc,
};

pub use error::SchedulerError;
use log::trace;

type Task = Box<dyn FnOnce() + 'static>;

/// Lane a deferred task is queued on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lane {
    /// High-priority lane drained first on every pass.
    Tick,
    /// Low-priority lane drained once the tick lane is empty.
    Microtask,
}

#[derive(Default)]
struct Lanes {
    tick: VecDeque<Task>,
    microtask: VecDeque<Task>,
}

impl Lanes {
    fn lane(&self, lane: Lane) -> &VecDeque<Task> {
        match lane {
            Lane::Tick => &self.tick,
            Lane::Microtask => &self.microtask,
        }
    }

    fn lane_mut(&mut self, lane: Lane) -> &mut VecDeque<Task> {
        match lane {
            Lane::Tick => &mut self.tick,
            Lane::Microtask => &mut self.microtask,
        }
    }
}

#[derive(Default)]
struct Inner {
    lanes: RefCell<Lanes>,
    draining: Cell<bool>,
    budget: Option<usize>,
}

/// Single-threaded handle to a deferred-task queue.
///
/// Cloning the handle is cheap; all clones share the same lanes.
///
/// # Examples
///
/// ```
/// use std::{cell::RefCell, rc::Rc};
///
/// use quillstream::TaskQueue;
///
/// let queue = TaskQueue::new();
/// let order = Rc::new(RefCell::new(Vec::new()));
///
/// let o = Rc::clone(&order);
/// queue.queue_microtask(move || o.borrow_mut().push("microtask"));
/// let o = Rc::clone(&order);
/// queue.queue_tick(move || o.borrow_mut().push("tick"));
///
/// assert_eq!(queue.run_until_idle().expect("drain"), 2);
/// assert_eq!(*order.borrow(), ["tick", "microtask"]);
/// ```
#[derive(Clone, Default)]
pub struct TaskQueue {
    inner: Rc<Inner>,
}

impl TaskQueue {
    /// Create an unbounded queue.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Create a queue whose drains stop after `budget` tasks.
    ///
    /// A drain that would exceed the budget returns
    /// [`SchedulerError::BudgetExhausted`] and leaves the remaining tasks
    /// queued.
    #[must_use]
    pub fn with_budget(budget: usize) -> Self {
        Self {
            inner: Rc::new(Inner {
                budget: Some(budget),
                ..Inner::default()
            }),
        }
    }

    /// Queue `task` on the given lane.
    pub fn queue(&self, lane: Lane, task: impl FnOnce() + 'static) {
        self.inner
            .lanes
            .borrow_mut()
            .lane_mut(lane)
            .push_back(Box::new(task));
    }

    /// Queue `task` on the tick lane.
    pub fn queue_tick(&self, task: impl FnOnce() + 'static) { self.queue(Lane::Tick, task); }

    /// Queue `task` on the microtask lane.
    pub fn queue_microtask(&self, task: impl FnOnce() + 'static) {
        self.queue(Lane::Microtask, task);
    }

    /// Number of queued tasks across both lanes.
    #[must_use]
    pub fn pending(&self) -> usize {
        let lanes = self.inner.lanes.borrow();
        lanes.tick.len() + lanes.microtask.len()
    }

    /// Number of queued tasks on one lane.
    #[must_use]
    pub fn pending_in(&self, lane: Lane) -> usize {
        self.inner.lanes.borrow().lane(lane).len()
    }

    /// Returns `true` when no task is queued.
    #[must_use]
    pub fn is_idle(&self) -> bool { self.pending() == 0 }

    /// Returns `true` while a drain is in progress.
    #[must_use]
    pub fn is_draining(&self) -> bool { self.inner.draining.get() }

    /// Run queued tasks until both lanes are empty.
    ///
    /// Tasks queued by running tasks execute in the same call. Returns the
    /// number of tasks run.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Reentrant`] when called from inside a
    /// running task and [`SchedulerError::BudgetExhausted`] when the queue's
    /// budget is spent before it becomes idle.
    pub fn run_until_idle(&self) -> Result<usize, SchedulerError> {
        if self.inner.draining.replace(true) {
            return Err(SchedulerError::Reentrant);
        }
        let _guard = DrainGuard(&self.inner.draining);

        let mut ran = 0;
        loop {
            let before = ran;
            while let Some(task) = self.next_task(Lane::Tick, ran)? {
                task();
                ran += 1;
            }
            while let Some(task) = self.next_task(Lane::Microtask, ran)? {
                task();
                ran += 1;
            }
            if ran == before {
                break;
            }
        }
        trace!("task queue idle: tasks_run={ran}");
        Ok(ran)
    }

    fn next_task(&self, lane: Lane, ran: usize) -> Result<Option<Task>, SchedulerError> {
        let mut lanes = self.inner.lanes.borrow_mut();
        let queue = lanes.lane_mut(lane);
        if queue.is_empty() {
            return Ok(None);
        }
        if let Some(budget) = self.inner.budget
            && ran >= budget
        {
            return Err(SchedulerError::BudgetExhausted {
                budget,
                remaining: lanes.tick.len() + lanes.microtask.len(),
            });
        }
        Ok(queue.pop_front())
    }
}

impl fmt::Debug for TaskQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lanes = self.inner.lanes.borrow();
        f.debug_struct("TaskQueue")
            .field("tick", &lanes.tick.len())
            .field("microtask", &lanes.microtask.len())
            .field("budget", &self.inner.budget)
            .finish()
    }
}

/// Clears the draining flag even if a task panics.
struct DrainGuard<'a>(&'a Cell<bool>);

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) { self.0.set(false); }
}
