//! Embedded stack calls.

use std::sync::Arc;

use stk_diagnostic::{Diagnostic, Diagnostics, ErrorCode};
use stk_ir::{make_references_absolute, Address, InstanceKey, StackCallDecl, StackInstance};
use stk_promise::{EvalPhase, PerPhase};
use stk_value::{convert, Type, Value};

use super::for_each::{eval_for_each, Instances};
use super::Declaration;
use crate::context::{resolve_cell, DiagCell, EvalContext};
use crate::resolver::references_in_exprs;

/// A `stack` block: decides which instances of the embedded stack exist,
/// and what each of them is passed.
#[derive(Debug)]
pub struct StackCall {
    addr: Address,
    decl: StackCallDecl,
    source: Arc<str>,
    instances: PerPhase<DiagCell<Instances>>,
}

impl StackCall {
    pub(crate) fn new(addr: Address, decl: StackCallDecl, source: Arc<str>) -> Self {
        StackCall {
            addr,
            decl,
            source,
            instances: PerPhase::new(),
        }
    }

    /// Instances of the embedded stack in `phase`.
    pub fn instances(&self, cx: &EvalContext<'_>, phase: EvalPhase) -> (Instances, Diagnostics) {
        let cell = self.instances.for_phase(phase);
        let name = format!("{}.for_each", self.addr);
        resolve_cell(cx, &cell, &name, || Instances::Unknown, || {
            let Some(stack) = cx.main.stack(cx.task, &self.addr.stack, phase) else {
                return (Instances::Unknown, Diagnostics::new());
            };
            match &self.decl.for_each {
                Some(for_each) => eval_for_each(cx, &stack, phase, for_each, &self.decl.range),
                None => (Instances::Single, Diagnostics::new()),
            }
        })
    }

    pub(crate) fn has_instance(
        &self,
        cx: &EvalContext<'_>,
        phase: EvalPhase,
        key: Option<&InstanceKey>,
    ) -> bool {
        self.instances(cx, phase).0.contains(key)
    }

    /// Addresses of the child stack instances that exist in `phase`.
    pub fn child_addrs(&self, cx: &EvalContext<'_>, phase: EvalPhase) -> Vec<StackInstance> {
        let (instances, _) = self.instances(cx, phase);
        instances
            .keys()
            .into_iter()
            .map(|key| self.child_addr(key))
            .collect()
    }

    fn child_addr(&self, key: Option<InstanceKey>) -> StackInstance {
        self.addr.stack.child(self.decl.name.as_str(), key)
    }

    /// Evaluate the `inputs` object passed to the instance with `key`.
    ///
    /// Attributes that do not name an input variable of the embedded stack
    /// are errors.
    pub(crate) fn instance_inputs(
        &self,
        cx: &EvalContext<'_>,
        phase: EvalPhase,
        key: Option<&InstanceKey>,
    ) -> (Value, Diagnostics) {
        let Some(stack) = cx.main.stack(cx.task, &self.addr.stack, phase) else {
            return (Value::Unknown(Type::Dynamic), Diagnostics::new());
        };
        let (instances, _) = self.instances(cx, phase);
        let each = instances.binding(key);
        let (value, mut diags) = stack.eval(cx, phase, &self.decl.inputs, each.as_ref());
        if diags.has_errors() {
            return (Value::Dynamic, diags);
        }
        let invalid = |detail: String| {
            Diagnostic::error(ErrorCode::E2004)
                .with_summary("Invalid inputs for embedded stack")
                .with_detail(detail)
                .with_range(self.decl.range.clone())
        };
        match &value {
            Value::Object(_) | Value::Map { .. } => {}
            Value::Unknown(_) | Value::Dynamic => return (value, diags),
            other => {
                diags.push(invalid(format!(
                    "The inputs for {} must be an object, not {}.",
                    self.addr,
                    other.ty()
                )));
                return (Value::Dynamic, diags);
            }
        }
        let mut undeclared = false;
        for name in value.entries().into_iter().flat_map(|e| e.keys()) {
            if !self.decl.config.inputs.contains_key(name) {
                undeclared = true;
                diags.push(
                    Diagnostic::error(ErrorCode::E1003)
                        .with_summary("Unsupported argument")
                        .with_detail(format!(
                            "An input variable named \"{name}\" is not declared by the embedded stack {}.",
                            self.decl.name
                        ))
                        .with_range(self.decl.range.clone()),
                );
            }
        }
        if undeclared {
            return (Value::Dynamic, diags);
        }
        match convert(&value, &Type::Dynamic) {
            Ok(value) => (value, diags),
            Err(err) => {
                diags.push(invalid(format!("Unsuitable inputs for {}: {err}.", self.addr)));
                (Value::Dynamic, diags)
            }
        }
    }
}

impl Declaration for StackCall {
    fn addr(&self) -> &Address {
        &self.addr
    }

    /// The outputs of the embedded stack: one object for a single instance,
    /// or an object of them keyed by instance key.
    #[tracing::instrument(level = "trace", skip_all, fields(addr = %self.addr, %phase))]
    fn check_value(&self, cx: &EvalContext<'_>, phase: EvalPhase) -> (Value, Diagnostics) {
        if cx.main.stack(cx.task, &self.addr.stack, phase).is_none() {
            return (Value::Unknown(Type::Dynamic), Diagnostics::new());
        }
        let (instances, mut diags) = self.instances(cx, phase);
        let mut children = Vec::new();
        for key in instances.keys() {
            let child_addr = self.child_addr(key.clone());
            let Some(child) = cx.main.stack(cx.task, &child_addr, phase) else {
                continue;
            };
            let (_, more) = child.caller_inputs(cx, phase);
            diags.append(more);
            let (outputs, more) = child.output_values(cx, phase);
            diags.append(more);
            children.push((key, outputs));
        }
        let value = match instances {
            Instances::Unknown => Value::Unknown(Type::Dynamic),
            Instances::Single => children
                .pop()
                .map_or(Value::Dynamic, |(_, outputs)| outputs),
            Instances::Keyed(_) => Value::object(children.into_iter().filter_map(
                |(key, outputs)| Some((key?.as_str().to_owned(), outputs)),
            )),
        };
        (value, diags)
    }

    fn references(&self) -> Vec<Address> {
        let exprs = self.decl.for_each.iter().chain([&self.decl.inputs]);
        let refs = references_in_exprs(exprs, &self.source);
        make_references_absolute(&refs, &self.addr.stack)
    }
}
