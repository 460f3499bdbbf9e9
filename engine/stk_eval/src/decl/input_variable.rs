use stk_diagnostic::{Diagnostic, Diagnostics, ErrorCode};
use stk_ir::{Address, InputVariableDecl};
use stk_promise::{EvalPhase, PerPhase};
use stk_value::{convert, Value};

use super::Declaration;
use crate::context::{resolve_cell, DiagCell, EvalContext};
use crate::stack::Stack;

/// A `var`: set by the run's caller for the root stack, or by the calling
/// stack's `inputs` object for an embedded one.
#[derive(Debug)]
pub struct InputVariable {
    addr: Address,
    decl: InputVariableDecl,
    /// What the calling stack's `inputs` and `for_each` mention. Empty in
    /// the root stack.
    caller_references: Vec<Address>,
    values: PerPhase<DiagCell<Value>>,
}

impl InputVariable {
    pub(crate) fn new(
        addr: Address,
        decl: InputVariableDecl,
        caller_references: Vec<Address>,
    ) -> Self {
        InputVariable {
            addr,
            decl,
            caller_references,
            values: PerPhase::new(),
        }
    }

    fn missing(&self) -> Diagnostic {
        Diagnostic::error(ErrorCode::E1004)
            .with_summary("No value for required variable")
            .with_detail(format!(
                "The input variable \"{}\" is required, so a value must be provided.",
                self.decl.name
            ))
            .with_range(self.decl.range.clone())
    }

    /// The raw value before conversion, or `None` when the caller set
    /// nothing.
    fn given(
        &self,
        cx: &EvalContext<'_>,
        stack: &Stack,
        phase: EvalPhase,
        diags: &mut Diagnostics,
    ) -> Option<Value> {
        if stack.addr().is_root() {
            if phase == EvalPhase::Validate {
                return Some(Value::Unknown(self.decl.ty.clone()));
            }
            return cx.main.root_input(&self.decl.name, phase).cloned();
        }
        let (inputs, more) = stack.caller_inputs(cx, phase);
        diags.append(more);
        match &inputs {
            Value::Dynamic => Some(Value::Dynamic),
            Value::Unknown(_) => Some(Value::Unknown(self.decl.ty.clone())),
            other => other.get_attr(&self.decl.name).cloned(),
        }
    }

    #[tracing::instrument(level = "debug", skip_all, fields(addr = %self.addr, %phase))]
    fn compute(&self, cx: &EvalContext<'_>, phase: EvalPhase) -> (Value, Diagnostics) {
        let Some(stack) = cx.main.stack(cx.task, &self.addr.stack, phase) else {
            return (Value::Unknown(self.decl.ty.clone()), Diagnostics::new());
        };
        let mut diags = Diagnostics::new();
        let value = match self.given(cx, &stack, phase, &mut diags) {
            Some(value) if value.is_placeholder() => return (Value::Dynamic, diags),
            Some(value) if value.is_null() && self.decl.default.is_some() => {
                self.decl.default.clone().unwrap_or(value)
            }
            Some(value) => value,
            None => match &self.decl.default {
                Some(default) => default.clone(),
                None => {
                    diags.push(self.missing());
                    return (Value::Dynamic, diags);
                }
            },
        };
        match convert(&value, &self.decl.ty) {
            Ok(value) => (value, diags),
            Err(err) => {
                diags.push(
                    Diagnostic::error(ErrorCode::E2002)
                        .with_summary("Invalid value for input variable")
                        .with_detail(format!(
                            "Unsuitable value for var.{}: {err}.",
                            self.decl.name
                        ))
                        .with_range(self.decl.range.clone()),
                );
                (Value::Dynamic, diags)
            }
        }
    }
}

impl Declaration for InputVariable {
    fn addr(&self) -> &Address {
        &self.addr
    }

    #[tracing::instrument(level = "trace", skip_all, fields(addr = %self.addr, %phase))]
    fn check_value(&self, cx: &EvalContext<'_>, phase: EvalPhase) -> (Value, Diagnostics) {
        let cell = self.values.for_phase(phase);
        resolve_cell(cx, &cell, &self.addr, || Value::Dynamic, || self.compute(cx, phase))
    }

    fn references(&self) -> Vec<Address> {
        self.caller_references.clone()
    }
}
