//! Single-assignment promise cell.
//!
//! The first task to resolve a cell computes the value; every other task
//! blocks until it is available and receives a clone of the same result.
//! Blocking goes through the run's wait graph, so a task that would end up
//! waiting on itself gets [`PromiseError::Cycle`] instead of deadlocking.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

use crate::wait_graph::PromiseId;
use crate::{PromiseError, Task, TaskId};

/// How often blocked waiters re-check cancellation.
const CANCEL_POLL: Duration = Duration::from_millis(50);

static NEXT_PROMISE: AtomicU64 = AtomicU64::new(1);

enum State<T> {
    Empty,
    Running { owner: TaskId },
    Done(T),
    /// The computing task panicked.
    Failed,
}

/// A value computed at most once, on first request.
pub struct Once<T> {
    id: PromiseId,
    state: Mutex<State<T>>,
    ready: Condvar,
}

impl<T: Clone> Once<T> {
    pub fn new() -> Self {
        Once {
            id: PromiseId(NEXT_PROMISE.fetch_add(1, Ordering::Relaxed)),
            state: Mutex::new(State::Empty),
            ready: Condvar::new(),
        }
    }

    /// The stored value, if the cell has been resolved.
    pub fn get(&self) -> Option<T> {
        match &*self.state.lock() {
            State::Done(value) => Some(value.clone()),
            State::Empty | State::Running { .. } | State::Failed => None,
        }
    }

    /// Resolve the cell on behalf of `task`, running `compute` if nobody
    /// has claimed it yet.
    ///
    /// `name` identifies the cell in cycle reports.
    pub fn resolve<F>(&self, task: &Task, name: impl fmt::Display, compute: F) -> Result<T, PromiseError>
    where
        F: FnOnce() -> T,
    {
        let graph = task.runtime().graph();
        let mut state = self.state.lock();
        loop {
            match &*state {
                State::Done(value) => return Ok(value.clone()),
                State::Failed => return Err(PromiseError::Unresolved),
                State::Empty => {
                    if task.is_cancelled() {
                        return Err(PromiseError::Cancelled);
                    }
                    *state = State::Running { owner: task.id() };
                    // Registered before unlocking so waiters always find an owner.
                    graph.claim(self.id, task.id(), name.to_string());
                    drop(state);
                    tracing::trace!(promise = %name, task = %task.id(), "claimed");

                    let claim = Claim { once: self, task };
                    let value = compute();
                    return claim.complete(value);
                }
                State::Running { owner } => {
                    let owner = *owner;
                    if let Err(cycle) = graph.begin_wait(task.id(), self.id) {
                        tracing::warn!(promise = %name, ?cycle, "reference cycle detected");
                        return Err(PromiseError::Cycle(cycle));
                    }
                    tracing::trace!(promise = %name, %owner, task = %task.id(), "waiting");
                    while matches!(*state, State::Running { .. }) {
                        self.ready.wait_for(&mut state, CANCEL_POLL);
                        if task.is_cancelled() && matches!(*state, State::Running { .. }) {
                            graph.end_wait(task.id());
                            return Err(PromiseError::Cancelled);
                        }
                    }
                    graph.end_wait(task.id());
                }
            }
        }
    }
}

impl<T: Clone> Default for Once<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Once<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &*self.state.lock() {
            State::Empty => "empty",
            State::Running { .. } => "running",
            State::Done(_) => "done",
            State::Failed => "failed",
        };
        f.debug_struct("Once")
            .field("id", &self.id)
            .field("state", &state)
            .finish()
    }
}

/// An in-progress computation. Dropping it without completing marks the
/// cell failed, which is what happens when `compute` panics.
struct Claim<'a, T> {
    once: &'a Once<T>,
    task: &'a Task,
}

impl<T: Clone> Claim<'_, T> {
    fn complete(self, value: T) -> Result<T, PromiseError> {
        let once = self.once;
        let task = self.task;
        std::mem::forget(self);

        task.runtime().graph().release(once.id);
        let mut state = once.state.lock();
        if task.is_cancelled() {
            // Leave the cell unclaimed; every waiter sees the cancellation.
            *state = State::Empty;
            once.ready.notify_all();
            return Err(PromiseError::Cancelled);
        }
        *state = State::Done(value.clone());
        once.ready.notify_all();
        Ok(value)
    }
}

impl<T> Drop for Claim<'_, T> {
    fn drop(&mut self) {
        self.task.runtime().graph().release(self.once.id);
        *self.once.state.lock() = State::Failed;
        self.once.ready.notify_all();
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
mod tests;
