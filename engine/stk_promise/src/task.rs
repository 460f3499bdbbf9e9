//! Tasks and the per-run promise runtime.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::wait_graph::WaitGraph;
use crate::CancellationToken;

/// Identity of a task for wait-graph bookkeeping.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct TaskId(pub(crate) u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task#{}", self.0)
    }
}

/// Shared state of one evaluation run: the wait graph every promise
/// reports to and the run's cancellation token.
#[derive(Debug)]
pub struct Runtime {
    graph: WaitGraph,
    next_task: AtomicU64,
    cancel: CancellationToken,
}

impl Runtime {
    pub fn new(cancel: CancellationToken) -> Arc<Self> {
        Arc::new(Runtime {
            graph: WaitGraph::default(),
            next_task: AtomicU64::new(1),
            cancel,
        })
    }

    /// A fresh task. Each thread of work needs its own.
    pub fn new_task(self: &Arc<Self>) -> Task {
        Task {
            id: TaskId(self.next_task.fetch_add(1, Ordering::Relaxed)),
            runtime: Arc::clone(self),
        }
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub(crate) fn graph(&self) -> &WaitGraph {
        &self.graph
    }
}

/// A unit of sequential work.
///
/// Passed explicitly to everything that may resolve a promise. A task must
/// not be shared between threads that run concurrently: the wait graph
/// assumes a task blocks on at most one promise at a time.
pub struct Task {
    id: TaskId,
    runtime: Arc<Runtime>,
}

impl Task {
    #[inline]
    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn runtime(&self) -> &Arc<Runtime> {
        &self.runtime
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.runtime.cancel.is_cancelled()
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task").field("id", &self.id).finish()
    }
}
