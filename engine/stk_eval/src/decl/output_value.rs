use std::sync::Arc;

use stk_diagnostic::{Diagnostic, Diagnostics, ErrorCode};
use stk_ir::{make_references_absolute, Address, OutputValueDecl};
use stk_promise::{EvalPhase, PerPhase};
use stk_value::{convert, Value};

use super::{AppliedChange, Declaration, PlannedChange};
use crate::context::{resolve_cell, DiagCell, EvalContext};
use crate::resolver::references_in_expr;

/// An `output`: a typed value a stack exposes to its caller.
#[derive(Debug)]
pub struct OutputValue {
    addr: Address,
    decl: OutputValueDecl,
    source: Arc<str>,
    values: PerPhase<DiagCell<Value>>,
}

impl OutputValue {
    pub(crate) fn new(addr: Address, decl: OutputValueDecl, source: Arc<str>) -> Self {
        OutputValue {
            addr,
            decl,
            source,
            values: PerPhase::new(),
        }
    }

    #[tracing::instrument(level = "debug", skip_all, fields(addr = %self.addr, %phase))]
    fn compute(&self, cx: &EvalContext<'_>, phase: EvalPhase) -> (Value, Diagnostics) {
        let Some(stack) = cx.main.stack(cx.task, &self.addr.stack, phase) else {
            return (Value::Unknown(self.decl.ty.clone()), Diagnostics::new());
        };
        let (value, mut diags) = stack.eval(cx, phase, &self.decl.value, None);
        if diags.has_errors() {
            return (Value::Dynamic, diags);
        }
        match convert(&value, &self.decl.ty) {
            Ok(value) => (value, diags),
            Err(err) => {
                diags.push(
                    Diagnostic::error(ErrorCode::E2003)
                        .with_summary("Invalid output value")
                        .with_detail(format!(
                            "Unsuitable value for output \"{}\": {err}.",
                            self.decl.name
                        ))
                        .with_range(self.decl.range.clone()),
                );
                (Value::Dynamic, diags)
            }
        }
    }
}

impl Declaration for OutputValue {
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

    #[tracing::instrument(level = "debug", skip_all, fields(addr = %self.addr))]
    fn plan_changes(&self, cx: &EvalContext<'_>) -> (Vec<PlannedChange>, Diagnostics) {
        let (value, diags) = self.check_value(cx, EvalPhase::Plan);
        if !self.addr.stack.is_root() {
            return (Vec::new(), diags);
        }
        let change = PlannedChange::OutputValue {
            addr: self.addr.clone(),
            value,
        };
        (vec![change], diags)
    }

    #[tracing::instrument(level = "debug", skip_all, fields(addr = %self.addr))]
    fn check_apply(&self, cx: &EvalContext<'_>) -> (Vec<AppliedChange>, Diagnostics) {
        let (value, diags) = self.check_value(cx, EvalPhase::Apply);
        if !self.addr.stack.is_root() {
            return (Vec::new(), diags);
        }
        let change = AppliedChange::OutputValue {
            addr: self.addr.clone(),
            value,
        };
        (vec![change], diags)
    }
}
