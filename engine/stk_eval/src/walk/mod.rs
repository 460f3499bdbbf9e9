//! Plan, apply, and validate walks.
//!
//! A walk visits every declaration of every live stack instance and runs
//! one phase hook on it. Declarations run in parallel on a scoped rayon
//! pool, each on its own task; ordering between dependent declarations
//! comes from the promise cells they resolve, not from the walk.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

use rayon::prelude::*;
use rustc_hash::FxHashSet;
use stk_diagnostic::{Diagnostic, Diagnostics, ErrorCode};
use stk_promise::EvalPhase;

use crate::context::EvalContext;
use crate::decl::{AnyDeclaration, AppliedChange, Declaration, PlannedChange};
use crate::main::Main;

/// How a walk schedules its work.
#[derive(Clone, Debug)]
pub struct WalkConfig {
    /// Run declarations on a worker pool. When false, everything runs on
    /// the calling thread.
    pub parallel: bool,
    /// Worker thread stack size in bytes.
    pub stack_size: usize,
}

impl Default for WalkConfig {
    fn default() -> Self {
        WalkConfig {
            parallel: true,
            stack_size: 32 * 1024 * 1024,
        }
    }
}

impl WalkConfig {
    pub fn sequential() -> Self {
        WalkConfig {
            parallel: false,
            ..Self::default()
        }
    }
}

/// Plan every declaration.
#[tracing::instrument(level = "debug", skip_all)]
pub fn plan(main: &Main, config: &WalkConfig) -> (Vec<PlannedChange>, Diagnostics) {
    let results = run_each(main, EvalPhase::Plan, config, |decl, cx| decl.plan_changes(cx));
    let (mut changes, diags) = merge(results);
    changes.sort_by(|a, b| a.order_key().cmp(&b.order_key()));
    (changes, diags)
}

/// Apply every declaration.
#[tracing::instrument(level = "debug", skip_all)]
pub fn apply(main: &Main, config: &WalkConfig) -> (Vec<AppliedChange>, Diagnostics) {
    let results = run_each(main, EvalPhase::Apply, config, |decl, cx| decl.check_apply(cx));
    let (mut changes, diags) = merge(results);
    changes.sort_by(|a, b| a.order_key().cmp(&b.order_key()));
    (changes, diags)
}

/// Validate every declaration.
#[tracing::instrument(level = "debug", skip_all)]
pub fn validate(main: &Main, config: &WalkConfig) -> Diagnostics {
    let results = run_each(main, EvalPhase::Validate, config, |decl, cx| {
        (Vec::<()>::new(), decl.validate(cx))
    });
    merge(results).1
}

fn run_each<C, F>(
    main: &Main,
    phase: EvalPhase,
    config: &WalkConfig,
    hook: F,
) -> Vec<(Vec<C>, Diagnostics)>
where
    C: Send,
    F: Fn(&AnyDeclaration, &EvalContext<'_>) -> (Vec<C>, Diagnostics) + Sync,
{
    let decls = {
        let task = main.new_task();
        main.all_declarations(&task, phase)
    };
    tracing::debug!(%phase, declarations = decls.len(), "walking");

    let run_one = |decl: &AnyDeclaration| {
        let task = main.new_task();
        let cx = EvalContext::new(main, &task);
        catch_unwind(AssertUnwindSafe(|| hook(decl, &cx))).unwrap_or_else(|payload| {
            let message = panic_message(&*payload);
            tracing::error!(addr = %decl.addr(), %message, "evaluation panicked");
            let diag = Diagnostic::error(ErrorCode::E9002)
                .with_summary("Evaluation panicked")
                .with_detail(format!(
                    "The evaluation of {} stopped unexpectedly: {message}.",
                    decl.addr()
                ));
            (Vec::new(), diag.into())
        })
    };

    if !config.parallel {
        return decls.iter().map(&run_one).collect();
    }
    rayon::ThreadPoolBuilder::new()
        .stack_size(config.stack_size)
        .build_scoped(rayon::ThreadBuilder::run, |pool| {
            pool.install(|| decls.par_iter().map(&run_one).collect::<Vec<_>>())
        })
        .unwrap_or_else(|e| {
            tracing::warn!("failed to create thread pool ({e}), running sequentially");
            decls.iter().map(&run_one).collect()
        })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_owned()
    }
}

/// Concatenate changes and merge diagnostics, keeping the first copy of
/// identical diagnostics: a cycle is reported by each of its participants.
fn merge<C>(results: Vec<(Vec<C>, Diagnostics)>) -> (Vec<C>, Diagnostics) {
    let mut changes = Vec::new();
    let mut seen = FxHashSet::default();
    let mut diags = Diagnostics::new();
    for (more_changes, more_diags) in results {
        changes.extend(more_changes);
        for diag in more_diags {
            if seen.insert(diag.clone()) {
                diags.push(diag);
            }
        }
    }
    (changes, diags)
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
