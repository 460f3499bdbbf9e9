//! Evaluation phases and per-phase storage.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

/// The phase an evaluation is performed for.
///
/// Each phase has its own promise cells, so a declaration may legitimately
/// produce different values during plan and apply.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum EvalPhase {
    Validate,
    Plan,
    Apply,
}

impl EvalPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            EvalPhase::Validate => "validate",
            EvalPhase::Plan => "plan",
            EvalPhase::Apply => "apply",
        }
    }
}

impl fmt::Display for EvalPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One lazily created `T` per phase.
///
/// `for_phase` always returns the same `Arc` for the same phase.
pub struct PerPhase<T> {
    cells: Mutex<FxHashMap<EvalPhase, Arc<T>>>,
}

impl<T: Default> PerPhase<T> {
    pub fn new() -> Self {
        PerPhase {
            cells: Mutex::new(FxHashMap::default()),
        }
    }

    pub fn for_phase(&self, phase: EvalPhase) -> Arc<T> {
        let mut cells = self.cells.lock();
        Arc::clone(cells.entry(phase).or_default())
    }
}

impl<T: Default> Default for PerPhase<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for PerPhase<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PerPhase")
            .field("phases", &self.cells.lock().len())
            .finish()
    }
}
