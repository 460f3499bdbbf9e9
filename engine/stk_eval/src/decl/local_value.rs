use std::sync::Arc;

use stk_diagnostic::{Diagnostic, Diagnostics, ErrorCode};
use stk_ir::{make_references_absolute, Address, LocalValueDecl};
use stk_promise::{EvalPhase, PerPhase};
use stk_value::{convert, Type, Value};

use super::Declaration;
use crate::context::{resolve_cell, DiagCell, EvalContext};
use crate::resolver::references_in_expr;

/// A `local` value: a named expression, evaluated in its stack without
/// type narrowing.
#[derive(Debug)]
pub struct LocalValue {
    addr: Address,
    decl: LocalValueDecl,
    source: Arc<str>,
    values: PerPhase<DiagCell<Value>>,
}

impl LocalValue {
    pub(crate) fn new(addr: Address, decl: LocalValueDecl, source: Arc<str>) -> Self {
        LocalValue {
            addr,
            decl,
            source,
            values: PerPhase::new(),
        }
    }

    #[tracing::instrument(level = "debug", skip_all, fields(addr = %self.addr, %phase))]
    fn compute(&self, cx: &EvalContext<'_>, phase: EvalPhase) -> (Value, Diagnostics) {
        // A stack instance that does not exist in this phase is not an
        // error; there is simply no value here.
        let Some(stack) = cx.main.stack(cx.task, &self.addr.stack, phase) else {
            return (Value::Dynamic, Diagnostics::new());
        };
        let (value, mut diags) = stack.eval(cx, phase, &self.decl.value, None);
        if diags.has_errors() {
            return (Value::Dynamic, diags);
        }
        match convert(&value, &Type::Dynamic) {
            Ok(value) => (value, diags),
            Err(err) => {
                diags.push(
                    Diagnostic::error(ErrorCode::E2001)
                        .with_summary("Invalid local value")
                        .with_detail(format!(
                            "Unsuitable value for local \"{}\": {err}.",
                            self.decl.name
                        ))
                        .with_range(self.decl.range.clone()),
                );
                (Value::Dynamic, diags)
            }
        }
    }
}

impl Declaration for LocalValue {
    fn addr(&self) -> &Address {
        &self.addr
    }

    #[tracing::instrument(level = "trace", skip_all, fields(addr = %self.addr, %phase))]
    fn check_value(&self, cx: &EvalContext<'_>, phase: EvalPhase) -> (Value, Diagnostics) {
        let cell = self.values.for_phase(phase);
        resolve_cell(cx, &cell, &self.addr, || Value::Dynamic, || self.compute(cx, phase))
    }

    fn references(&self) -> Vec<Address> {
        let (refs, _) = references_in_expr(&self.decl.value, &self.source);
        make_references_absolute(&refs, &self.addr.stack)
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
mod tests;
