//! Who computes what, and who waits for whom.
//!
//! Every running promise has an owning task; every blocked task waits on
//! exactly one promise. Before a task blocks it asks the graph whether the
//! chain `promise -> owner -> promise the owner waits on -> ...` leads back
//! to itself. If it does, waiting would never end, and the chain is
//! reported as a cycle instead.

use std::fmt;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::TaskId;

/// Identity of a promise cell.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct PromiseId(pub(crate) u64);

#[derive(Default)]
struct GraphState {
    /// Running promises: owner and display name.
    running: FxHashMap<PromiseId, (TaskId, String)>,
    /// Promises each task is computing, innermost last.
    held: FxHashMap<TaskId, Vec<PromiseId>>,
    /// The promise each blocked task waits on.
    waiting: FxHashMap<TaskId, PromiseId>,
}

#[derive(Default)]
pub struct WaitGraph {
    state: Mutex<GraphState>,
}

impl WaitGraph {
    /// Record that `owner` started computing `promise`.
    pub(crate) fn claim(&self, promise: PromiseId, owner: TaskId, name: String) {
        let mut state = self.state.lock();
        state.running.insert(promise, (owner, name));
        state.held.entry(owner).or_default().push(promise);
    }

    /// Record that `promise` is no longer running.
    pub(crate) fn release(&self, promise: PromiseId) {
        let mut state = self.state.lock();
        if let Some((owner, _)) = state.running.remove(&promise) {
            if let Some(held) = state.held.get_mut(&owner) {
                held.retain(|p| *p != promise);
                if held.is_empty() {
                    state.held.remove(&owner);
                }
            }
        }
    }

    /// Register that `waiter` is about to block on `promise`.
    ///
    /// Fails with the names along the cycle if waiting would deadlock; no
    /// edge is recorded in that case.
    pub(crate) fn begin_wait(&self, waiter: TaskId, promise: PromiseId) -> Result<(), Vec<String>> {
        let mut state = self.state.lock();
        if let Some(cycle) = state.find_cycle(waiter, promise) {
            return Err(canonical_cycle(cycle));
        }
        state.waiting.insert(waiter, promise);
        Ok(())
    }

    pub(crate) fn end_wait(&self, waiter: TaskId) {
        self.state.lock().waiting.remove(&waiter);
    }
}

impl GraphState {
    fn find_cycle(&self, waiter: TaskId, start: PromiseId) -> Option<Vec<String>> {
        let mut chain = Vec::new();
        let mut current = start;
        // Each hop visits a distinct blocked task, so the walk is bounded.
        for _ in 0..=self.waiting.len() {
            let (owner, _) = self.running.get(&current)?;
            self.push_held_from(&mut chain, *owner, current);
            if *owner == waiter {
                return Some(chain);
            }
            current = *self.waiting.get(owner)?;
        }
        None
    }

    /// Names of the promises `owner` holds, from `from` to the innermost.
    fn push_held_from(&self, chain: &mut Vec<String>, owner: TaskId, from: PromiseId) {
        let Some(held) = self.held.get(&owner) else {
            return;
        };
        let start = held.iter().position(|p| *p == from).unwrap_or(0);
        for promise in &held[start..] {
            if let Some((_, name)) = self.running.get(promise) {
                chain.push(name.clone());
            }
        }
    }
}

/// Rotate the cycle to start at its smallest name and close it, so the same
/// cycle found from different entry points reads identically.
fn canonical_cycle(mut names: Vec<String>) -> Vec<String> {
    if let Some(min) = names
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| a.cmp(b))
        .map(|(i, _)| i)
    {
        names.rotate_left(min);
    }
    if let Some(first) = names.first().cloned() {
        names.push(first);
    }
    names
}

impl fmt::Debug for WaitGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("WaitGraph")
            .field("running", &state.running.len())
            .field("waiting", &state.waiting.len())
            .finish()
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
