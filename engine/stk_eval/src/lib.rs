//! STK Eval - lazy, memoized, phase-aware evaluation of stack declarations.
//!
//! A run starts by building a [`Main`] from the root [`StackConfig`]. From
//! there, any declaration can be evaluated by address with
//! [`Main::check_value`], or every declaration at once with the [`plan`],
//! [`apply`], and [`validate`] walks.
//!
//! # Architecture
//!
//! - [`Main`]: the run's registry. Maps addresses to live stacks and
//!   declarations, created on first request.
//! - [`Declaration`]: the contract every declaration kind implements.
//!   Results are memoized per phase in `stk_promise` cells, so each
//!   declaration is evaluated at most once per phase no matter how many
//!   tasks ask for it.
//! - [`eval_expr`]: expression evaluation against a scope.
//! - [`references_in_expr`]: static reference analysis.
//!
//! Problems never abort a run. They are returned as [`Diagnostics`] beside
//! a value, which degrades to [`Value::Dynamic`] when nothing better is
//! available.
//!
//! [`StackConfig`]: stk_ir::StackConfig
//! [`Diagnostics`]: stk_diagnostic::Diagnostics
//! [`Value::Dynamic`]: stk_value::Value::Dynamic

mod context;
mod decl;
mod eval;
mod main;
mod resolver;
mod stack;
mod stack_guard;
mod walk;

pub use context::EvalContext;
pub use decl::{
    required_components, AnyDeclaration, AppliedChange, Component, ComponentInstance, Declaration,
    InputVariable, InstanceResult, Instances, LocalValue, OutputValue, PlannedChange, StackCall,
};
pub use eval::{eval_expr, EvalError, EvalScope};
pub use main::{ComponentProvider, Main, MainBuilder, PassthroughProvider, ProviderError};
pub use resolver::references_in_expr;
pub use stack::{EachBinding, Stack};
pub use walk::{apply, plan, validate, WalkConfig};

use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Install a tree-shaped tracing subscriber.
///
/// Only does anything when `RUST_LOG` is set; safe to call repeatedly.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            let tree = tracing_tree::HierarchicalLayer::new(2)
                .with_targets(true)
                .with_indent_lines(true);
            // Another subscriber may already be installed by the host.
            let _ = tracing_subscriber::registry()
                .with(filter)
                .with(tree)
                .try_init();
        }
    });
}
