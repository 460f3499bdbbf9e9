//! Promise resolution failures.

/// Why a promise could not produce its value for the requesting task.
#[derive(Clone, Eq, PartialEq, Hash, Debug, thiserror::Error)]
pub enum PromiseError {
    /// Resolving would wait on itself. Holds the names of the promises in
    /// the cycle, starting from the smallest and ending where it began.
    #[error("reference cycle detected involving {}", .0.join(" -> "))]
    Cycle(Vec<String>),
    /// The run was cancelled before the value became available.
    #[error("evaluation cancelled")]
    Cancelled,
    /// The computing task stopped without producing a value.
    #[error("promise was abandoned without a result")]
    Unresolved,
}
