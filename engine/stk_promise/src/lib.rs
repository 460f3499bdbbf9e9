//! Phase-scoped promise cache.
//!
//! Evaluation is lazy and demand-driven: a declaration's value is computed
//! the first time someone asks for it, by whichever task asks first, and
//! then shared. This crate provides the pieces for that:
//!
//! - [`Once`]: a single-assignment cell that runs its computation at most once
//! - [`PerPhase`]: one cell per [`EvalPhase`], so plan and apply never share
//! - [`Task`] and [`Runtime`]: the identity of a unit of work, and the
//!   per-run wait graph used to turn would-be deadlocks into
//!   [`PromiseError::Cycle`]
//! - [`CancellationToken`]: cooperative cancellation of a whole run

mod cancel;
mod error;
mod once;
mod phase;
mod task;
mod wait_graph;

pub use cancel::CancellationToken;
pub use error::PromiseError;
pub use once::Once;
pub use phase::{EvalPhase, PerPhase};
pub use task::{Runtime, Task, TaskId};
pub use wait_graph::PromiseId;
