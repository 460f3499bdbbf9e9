//! Live stack instances and the expression scope they provide.

use std::sync::Arc;

use stk_diagnostic::{Diagnostic, Diagnostics, ErrorCode};
use stk_ir::{Expr, InstanceKey, LocalAddr, RefTarget, SourceRange, Span, StackConfig, StackInstance};
use stk_promise::{EvalPhase, PerPhase};
use stk_value::{Type, Value};

use crate::context::{resolve_cell, DiagCell, EvalContext};
use crate::decl::Declaration;
use crate::eval::{eval_expr, EvalScope};

/// The `each` object visible inside a `for_each` block.
#[derive(Clone, PartialEq, Debug)]
pub struct EachBinding {
    pub key: InstanceKey,
    pub value: Value,
}

/// One instance of a stack configuration.
///
/// A stack knows its own address, not its parent: the parent is looked up
/// through [`Main`](crate::Main) by address when needed.
#[derive(Debug)]
pub struct Stack {
    addr: StackInstance,
    config: Arc<StackConfig>,
    /// The inputs object the calling stack passes to this instance.
    caller_inputs: PerPhase<DiagCell<Value>>,
}

impl Stack {
    pub(crate) fn new(addr: StackInstance, config: Arc<StackConfig>) -> Self {
        Stack {
            addr,
            config,
            caller_inputs: PerPhase::new(),
        }
    }

    pub fn addr(&self) -> &StackInstance {
        &self.addr
    }

    pub fn config(&self) -> &Arc<StackConfig> {
        &self.config
    }

    pub fn source(&self) -> &Arc<str> {
        &self.config.source
    }

    /// Evaluate `expr` as written in this stack.
    pub(crate) fn eval(
        &self,
        cx: &EvalContext<'_>,
        phase: EvalPhase,
        expr: &Expr,
        each: Option<&EachBinding>,
    ) -> (Value, Diagnostics) {
        let scope = StackScope {
            stack: self,
            cx: *cx,
            phase,
            each,
        };
        eval_expr(expr, &scope)
    }

    /// The inputs object this instance's caller evaluated for it.
    ///
    /// The root stack has no caller; its variables come from the run.
    pub(crate) fn caller_inputs(&self, cx: &EvalContext<'_>, phase: EvalPhase) -> (Value, Diagnostics) {
        let Some((parent, step)) = self.addr.parent() else {
            return (Value::empty_object(), Diagnostics::new());
        };
        let cell = self.caller_inputs.for_phase(phase);
        let name = format!("{} inputs", self.addr);
        resolve_cell(cx, &cell, &name, || Value::Dynamic, || {
            let call_addr = LocalAddr::stack_call(step.name.as_str()).absolute(&parent);
            match cx.main.stack_call(&call_addr) {
                Some(call) => call.instance_inputs(cx, phase, step.key.as_ref()),
                None => (Value::Dynamic, Diagnostics::new()),
            }
        })
    }

    /// Object of this instance's output values.
    pub(crate) fn output_values(&self, cx: &EvalContext<'_>, phase: EvalPhase) -> (Value, Diagnostics) {
        let mut diags = Diagnostics::new();
        let mut outputs = Vec::with_capacity(self.config.outputs.len());
        for name in self.config.outputs.keys() {
            let addr = LocalAddr::output(name.as_str()).absolute(&self.addr);
            let value = match cx.main.declaration(&addr) {
                Some(decl) => {
                    let (value, more) = decl.check_value(cx, phase);
                    diags.append(more);
                    value
                }
                None => Value::Dynamic,
            };
            outputs.push((name.clone(), value));
        }
        (Value::object(outputs), diags)
    }
}

/// What an expression written in a stack can see.
struct StackScope<'a> {
    stack: &'a Stack,
    cx: EvalContext<'a>,
    phase: EvalPhase,
    each: Option<&'a EachBinding>,
}

impl StackScope<'_> {
    fn range(&self, span: Span) -> SourceRange {
        SourceRange::new(Arc::clone(self.stack.source()), span)
    }

    fn undeclared(&self, item: &LocalAddr, span: Span) -> Diagnostic {
        let noun = item.kind.noun();
        Diagnostic::error(ErrorCode::E1003)
            .with_summary(format!("Reference to undeclared {noun}"))
            .with_detail(format!(
                "There is no {noun} named \"{}\" declared in this stack.",
                item.name
            ))
            .with_range(self.range(span))
    }
}

impl EvalScope for StackScope<'_> {
    fn phase(&self) -> EvalPhase {
        self.phase
    }

    fn source(&self) -> &Arc<str> {
        self.stack.source()
    }

    fn resolve(&self, target: &RefTarget, span: Span) -> (Value, Diagnostics) {
        match target {
            RefTarget::Item(item) => {
                if !self.stack.config.declares(item) {
                    return (Value::Dynamic, self.undeclared(item, span).into());
                }
                let addr = item.absolute(&self.stack.addr);
                match self.cx.main.declaration(&addr) {
                    Some(decl) => decl.check_value(&self.cx, self.phase),
                    None => (Value::Dynamic, self.undeclared(item, span).into()),
                }
            }
            RefTarget::EachKey | RefTarget::EachValue => match self.each {
                Some(each) if *target == RefTarget::EachKey => (each.key.to_value(), Diagnostics::new()),
                Some(each) => (each.value.clone(), Diagnostics::new()),
                None => (
                    Value::Dynamic,
                    Diagnostic::error(ErrorCode::E1002)
                        .with_summary("Invalid reference")
                        .with_detail(
                            "The \"each\" object can be used only in blocks that set for_each.",
                        )
                        .with_range(self.range(span))
                        .into(),
                ),
            },
            RefTarget::Applying => {
                let value = match self.phase {
                    EvalPhase::Validate => Value::Unknown(Type::Bool),
                    EvalPhase::Plan => Value::Bool(false),
                    EvalPhase::Apply => Value::Bool(true),
                };
                (value, Diagnostics::new())
            }
        }
    }
}
