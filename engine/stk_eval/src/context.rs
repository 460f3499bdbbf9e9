//! Per-request evaluation context and the bridge from promise cells to
//! diagnostics.

use std::fmt;

use stk_diagnostic::{Diagnostic, Diagnostics, ErrorCode};
use stk_promise::{Once, PromiseError, Task};

use crate::main::Main;
use crate::stack_guard::ensure_sufficient_stack;

/// What every evaluation step needs: the run's registry and the task on
/// whose behalf promise cells are resolved.
#[derive(Copy, Clone, Debug)]
pub struct EvalContext<'a> {
    pub main: &'a Main,
    pub task: &'a Task,
}

impl<'a> EvalContext<'a> {
    pub fn new(main: &'a Main, task: &'a Task) -> Self {
        EvalContext { main, task }
    }
}

/// A memo cell holding a result together with the diagnostics produced
/// while computing it.
pub(crate) type DiagCell<T> = Once<(T, Diagnostics)>;

/// Resolve `cell`, turning promise failures into diagnostics and the
/// `placeholder` value.
pub(crate) fn resolve_cell<T, F>(
    cx: &EvalContext<'_>,
    cell: &DiagCell<T>,
    name: &dyn fmt::Display,
    placeholder: impl FnOnce() -> T,
    compute: F,
) -> (T, Diagnostics)
where
    T: Clone,
    F: FnOnce() -> (T, Diagnostics),
{
    match cell.resolve(cx.task, name, || ensure_sufficient_stack(compute)) {
        Ok(result) => result,
        Err(err) => (placeholder(), promise_error_diagnostic(&err, name).into()),
    }
}

pub(crate) fn promise_error_diagnostic(err: &PromiseError, name: &dyn fmt::Display) -> Diagnostic {
    match err {
        // No range: every participant reports the same cycle, and the walks
        // merge identical diagnostics.
        PromiseError::Cycle(_) => Diagnostic::error(ErrorCode::E3001)
            .with_summary("Reference cycle")
            .with_detail(format!("{err}.")),
        PromiseError::Cancelled => Diagnostic::error(ErrorCode::E4001)
            .with_summary("Evaluation cancelled")
            .with_detail(format!(
                "The evaluation of {name} was cancelled before it completed."
            )),
        PromiseError::Unresolved => Diagnostic::error(ErrorCode::E9001)
            .with_summary("Incomplete evaluation")
            .with_detail(format!(
                "The evaluation of {name} was abandoned without producing a result."
            )),
    }
}
