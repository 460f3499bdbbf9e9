//! Components and their instances.
//!
//! A component expands to one instance per `for_each` key (or a single
//! unkeyed instance). Each instance evaluates its `inputs` and hands them
//! to the run's [`ComponentProvider`](crate::ComponentProvider), which
//! plans or applies it and returns the instance's result values.

use std::sync::Arc;

use stk_diagnostic::{Diagnostic, Diagnostics, ErrorCode};
use stk_ir::{make_references_absolute, Address, ComponentDecl, ComponentInstanceAddr, InstanceKey};
use stk_promise::{EvalPhase, PerPhase};
use stk_value::{convert, Type, Value};

use super::for_each::{eval_for_each, Instances};
use super::{AppliedChange, Declaration, PlannedChange};
use crate::context::{resolve_cell, DiagCell, EvalContext};
use crate::resolver::references_in_exprs;
use crate::stack::EachBinding;

#[derive(Debug)]
pub struct Component {
    addr: Address,
    decl: Arc<ComponentDecl>,
    source: Arc<str>,
    instances: PerPhase<DiagCell<Instances>>,
}

impl Component {
    pub(crate) fn new(addr: Address, decl: ComponentDecl, source: Arc<str>) -> Self {
        Component {
            addr,
            decl: Arc::new(decl),
            source,
            instances: PerPhase::new(),
        }
    }

    /// The instances this component expands to in `phase`.
    ///
    /// Unknown when the stack instance does not exist in `phase` or the
    /// `for_each` value is not known yet.
    pub fn instances(&self, cx: &EvalContext<'_>, phase: EvalPhase) -> (Instances, Diagnostics) {
        let Some(for_each) = &self.decl.for_each else {
            return (Instances::Single, Diagnostics::new());
        };
        let cell = self.instances.for_phase(phase);
        let name = format!("{}.for_each", self.addr);
        resolve_cell(cx, &cell, &name, || Instances::Unknown, || {
            match cx.main.stack(cx.task, &self.addr.stack, phase) {
                Some(stack) => eval_for_each(cx, &stack, phase, for_each, &self.decl.range),
                None => (Instances::Unknown, Diagnostics::new()),
            }
        })
    }

    fn instance(&self, cx: &EvalContext<'_>, key: Option<InstanceKey>) -> Arc<ComponentInstance> {
        let addr = ComponentInstanceAddr {
            component: self.addr.clone(),
            key,
        };
        cx.main.component_instance(&addr, &self.decl)
    }

    /// Result of every known instance, in key order.
    fn results(
        &self,
        cx: &EvalContext<'_>,
        phase: EvalPhase,
    ) -> (Option<Vec<(Arc<ComponentInstance>, InstanceResult)>>, Diagnostics) {
        let (instances, mut diags) = self.instances(cx, phase);
        if matches!(instances, Instances::Unknown) {
            return (None, diags);
        }
        let mut results = Vec::new();
        for key in instances.keys() {
            let each = instances.binding(key.as_ref());
            let instance = self.instance(cx, key);
            let (result, more) = instance.check_result(cx, phase, each.as_ref());
            diags.append(more);
            results.push((instance, result));
        }
        (Some(results), diags)
    }
}

impl Declaration for Component {
    fn addr(&self) -> &Address {
        &self.addr
    }

    /// The single instance's result, an object of results keyed by
    /// instance key, or an unknown while the instances are not known.
    #[tracing::instrument(level = "trace", skip_all, fields(addr = %self.addr, %phase))]
    fn check_value(&self, cx: &EvalContext<'_>, phase: EvalPhase) -> (Value, Diagnostics) {
        if cx.main.stack(cx.task, &self.addr.stack, phase).is_none() {
            return (Value::Unknown(Type::Dynamic), Diagnostics::new());
        }
        let (results, diags) = self.results(cx, phase);
        let Some(results) = results else {
            return (Value::Unknown(Type::Dynamic), diags);
        };
        if self.decl.for_each.is_none() {
            let value = results
                .into_iter()
                .next()
                .map_or(Value::Dynamic, |(_, result)| result.value);
            return (value, diags);
        }
        let entries = results.into_iter().filter_map(|(instance, result)| {
            let key = instance.addr.key.as_ref()?;
            Some((key.as_str().to_owned(), result.value))
        });
        (Value::object(entries), diags)
    }

    fn references(&self) -> Vec<Address> {
        let exprs = self.decl.for_each.iter().chain([&self.decl.inputs]);
        let refs = references_in_exprs(exprs, &self.source);
        make_references_absolute(&refs, &self.addr.stack)
    }

    #[tracing::instrument(level = "debug", skip_all, fields(addr = %self.addr))]
    fn plan_changes(&self, cx: &EvalContext<'_>) -> (Vec<PlannedChange>, Diagnostics) {
        let (results, diags) = self.results(cx, EvalPhase::Plan);
        let changes = results
            .unwrap_or_default()
            .into_iter()
            .map(|(instance, result)| PlannedChange::ComponentInstance {
                addr: instance.addr.clone(),
                inputs: result.inputs,
                planned: result.value,
            })
            .collect();
        (changes, diags)
    }

    #[tracing::instrument(level = "debug", skip_all, fields(addr = %self.addr))]
    fn check_apply(&self, cx: &EvalContext<'_>) -> (Vec<AppliedChange>, Diagnostics) {
        let (results, diags) = self.results(cx, EvalPhase::Apply);
        let changes = results
            .unwrap_or_default()
            .into_iter()
            .map(|(instance, result)| AppliedChange::ComponentInstance {
                addr: instance.addr.clone(),
                result: result.value,
            })
            .collect();
        (changes, diags)
    }
}

/// Evaluated inputs of an instance and what the provider made of them.
#[derive(Clone, PartialEq, Debug)]
pub struct InstanceResult {
    pub inputs: Value,
    pub value: Value,
}

impl InstanceResult {
    fn placeholder() -> Self {
        InstanceResult {
            inputs: Value::Dynamic,
            value: Value::Dynamic,
        }
    }
}

/// One instance of a component.
#[derive(Debug)]
pub struct ComponentInstance {
    addr: ComponentInstanceAddr,
    decl: Arc<ComponentDecl>,
    results: PerPhase<DiagCell<InstanceResult>>,
}

impl ComponentInstance {
    pub(crate) fn new(addr: ComponentInstanceAddr, decl: Arc<ComponentDecl>) -> Self {
        ComponentInstance {
            addr,
            decl,
            results: PerPhase::new(),
        }
    }

    pub fn addr(&self) -> &ComponentInstanceAddr {
        &self.addr
    }

    /// Evaluate the inputs and ask the provider for this instance's result.
    ///
    /// The provider is called at most once per phase.
    pub fn check_result(
        &self,
        cx: &EvalContext<'_>,
        phase: EvalPhase,
        each: Option<&EachBinding>,
    ) -> (InstanceResult, Diagnostics) {
        let cell = self.results.for_phase(phase);
        resolve_cell(cx, &cell, &self.addr, InstanceResult::placeholder, || {
            self.compute(cx, phase, each)
        })
    }

    #[tracing::instrument(level = "debug", skip_all, fields(addr = %self.addr, %phase))]
    fn compute(
        &self,
        cx: &EvalContext<'_>,
        phase: EvalPhase,
        each: Option<&EachBinding>,
    ) -> (InstanceResult, Diagnostics) {
        let unknown = InstanceResult {
            inputs: Value::Unknown(Type::Dynamic),
            value: Value::Unknown(Type::Dynamic),
        };
        let Some(stack) = cx.main.stack(cx.task, &self.addr.component.stack, phase) else {
            return (unknown, Diagnostics::new());
        };
        let (inputs, mut diags) = stack.eval(cx, phase, &self.decl.inputs, each);
        if diags.has_errors() || inputs.is_placeholder() {
            return (InstanceResult::placeholder(), diags);
        }
        let inputs = match self.check_inputs(&inputs) {
            Ok(inputs) => inputs,
            Err(diag) => {
                diags.push(diag);
                return (InstanceResult::placeholder(), diags);
            }
        };

        let provided = match phase {
            EvalPhase::Validate => {
                return (
                    InstanceResult {
                        inputs,
                        value: Value::Unknown(Type::Dynamic),
                    },
                    diags,
                );
            }
            EvalPhase::Plan => cx.main.provider().plan(&self.addr, &inputs),
            EvalPhase::Apply => cx.main.provider().apply(&self.addr, &inputs),
        };
        match provided {
            Ok(value) => {
                tracing::debug!(addr = %self.addr, %phase, "provider returned result");
                (InstanceResult { inputs, value }, diags)
            }
            Err(err) => {
                tracing::debug!(addr = %self.addr, %phase, error = %err, "provider failed");
                diags.push(
                    Diagnostic::error(ErrorCode::E5001)
                        .with_summary("Component provider failed")
                        .with_detail(format!(
                            "The provider could not {} {}: {err}.",
                            phase.as_str(),
                            self.addr
                        ))
                        .with_range(self.decl.range.clone()),
                );
                (
                    InstanceResult {
                        inputs,
                        value: Value::Dynamic,
                    },
                    diags,
                )
            }
        }
    }

    /// Inputs must be an object (or not known yet).
    fn check_inputs(&self, inputs: &Value) -> Result<Value, Diagnostic> {
        let invalid = |detail: String| {
            Diagnostic::error(ErrorCode::E2004)
                .with_summary("Invalid component inputs")
                .with_detail(detail)
                .with_range(self.decl.range.clone())
        };
        match inputs {
            Value::Object(_) | Value::Map { .. } | Value::Unknown(_) => convert(inputs, &Type::Dynamic)
                .map_err(|err| invalid(format!("Unsuitable inputs for {}: {err}.", self.addr))),
            other => Err(invalid(format!(
                "The inputs for {} must be an object, not {}.",
                self.addr,
                other.ty()
            ))),
        }
    }
}
