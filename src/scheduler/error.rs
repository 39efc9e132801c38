//! Error types for draining a [`TaskQueue`](super::TaskQueue).

use thiserror::Error;

/// Errors returned by [`TaskQueue::run_until_idle`](super::TaskQueue::run_until_idle).
#[non_exhaustive]
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerError {
    /// The drain was requested from inside a running task.
    #[error("task queue is already draining")]
    Reentrant,
    /// The configured task budget was spent before the queue went idle.
    #[error("task budget of {budget} exhausted with {remaining} tasks still queued")]
    BudgetExhausted {
        /// Budget configured for the queue.
        budget: usize,
        /// Tasks left in the queue when the drain stopped.
        remaining: usize,
    },
}
