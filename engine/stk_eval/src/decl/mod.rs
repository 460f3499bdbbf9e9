//! Declarations: the named, evaluable items of a stack.
//!
//! Every kind implements [`Declaration`]. [`AnyDeclaration`] is the closed
//! set of kinds the registry hands out, dispatched by address kind.

mod change;
mod component;
mod for_each;
mod input_variable;
mod local_value;
mod output_value;
mod required;
mod stack_call;

pub use change::{AppliedChange, PlannedChange};
pub use component::{Component, ComponentInstance, InstanceResult};
pub use for_each::Instances;
pub use input_variable::InputVariable;
pub use local_value::LocalValue;
pub use output_value::OutputValue;
pub use required::required_components;
pub use stack_call::StackCall;

use std::sync::Arc;

use stk_diagnostic::Diagnostics;
use stk_ir::{make_references_absolute, Address, DeclKind, StackCallDecl, StackConfig, StackInstance};
use stk_promise::EvalPhase;
use stk_value::Value;

use crate::context::EvalContext;
use crate::resolver::references_in_exprs;

/// The capabilities every declaration kind provides.
pub trait Declaration {
    fn addr(&self) -> &Address;

    /// Value and diagnostics for `phase`, computed at most once per phase.
    fn check_value(&self, cx: &EvalContext<'_>, phase: EvalPhase) -> (Value, Diagnostics);

    /// Best-effort value; diagnostics are dropped.
    fn value(&self, cx: &EvalContext<'_>, phase: EvalPhase) -> Value {
        self.check_value(cx, phase).0
    }

    /// Absolute addresses of the declarations this one depends on.
    fn references(&self) -> Vec<Address>;

    /// Evaluate for planning. Pure declarations produce no changes.
    fn plan_changes(&self, cx: &EvalContext<'_>) -> (Vec<PlannedChange>, Diagnostics) {
        let (_, diags) = self.check_value(cx, EvalPhase::Plan);
        (Vec::new(), diags)
    }

    /// Evaluate for applying. Pure declarations produce no changes.
    fn check_apply(&self, cx: &EvalContext<'_>) -> (Vec<AppliedChange>, Diagnostics) {
        let (_, diags) = self.check_value(cx, EvalPhase::Apply);
        (Vec::new(), diags)
    }

    /// Evaluate without caller inputs or provider calls.
    fn validate(&self, cx: &EvalContext<'_>) -> Diagnostics {
        self.check_value(cx, EvalPhase::Validate).1
    }
}

#[derive(Clone, Debug)]
pub enum AnyDeclaration {
    LocalValue(Arc<LocalValue>),
    InputVariable(Arc<InputVariable>),
    OutputValue(Arc<OutputValue>),
    Component(Arc<Component>),
    StackCall(Arc<StackCall>),
}

impl AnyDeclaration {
    /// Build the declaration `addr` names in `config`, the configuration
    /// of its stack. `caller` is the calling stack instance and its call
    /// block, for declarations of embedded stacks.
    pub(crate) fn new(
        addr: &Address,
        config: &StackConfig,
        caller: Option<(StackInstance, StackCallDecl)>,
    ) -> Option<Self> {
        let name = addr.item.name.as_str();
        let source = Arc::clone(&config.source);
        let decl = match addr.kind() {
            DeclKind::LocalValue => {
                let decl = config.locals.get(name)?.clone();
                AnyDeclaration::LocalValue(Arc::new(LocalValue::new(addr.clone(), decl, source)))
            }
            DeclKind::InputVariable => {
                let decl = config.inputs.get(name)?.clone();
                let caller_references = match &caller {
                    Some((parent, call)) => {
                        let exprs = call.for_each.iter().chain([&call.inputs]);
                        let refs = references_in_exprs(exprs, &call.range.file);
                        make_references_absolute(&refs, parent)
                    }
                    None => Vec::new(),
                };
                AnyDeclaration::InputVariable(Arc::new(InputVariable::new(
                    addr.clone(),
                    decl,
                    caller_references,
                )))
            }
            DeclKind::OutputValue => {
                let decl = config.outputs.get(name)?.clone();
                AnyDeclaration::OutputValue(Arc::new(OutputValue::new(addr.clone(), decl, source)))
            }
            DeclKind::Component => {
                let decl = config.components.get(name)?.clone();
                AnyDeclaration::Component(Arc::new(Component::new(addr.clone(), decl, source)))
            }
            DeclKind::StackCall => {
                let decl = config.stack_calls.get(name)?.clone();
                AnyDeclaration::StackCall(Arc::new(StackCall::new(addr.clone(), decl, source)))
            }
        };
        Some(decl)
    }

    fn as_dyn(&self) -> &dyn Declaration {
        match self {
            AnyDeclaration::LocalValue(d) => &**d,
            AnyDeclaration::InputVariable(d) => &**d,
            AnyDeclaration::OutputValue(d) => &**d,
            AnyDeclaration::Component(d) => &**d,
            AnyDeclaration::StackCall(d) => &**d,
        }
    }
}

impl Declaration for AnyDeclaration {
    fn addr(&self) -> &Address {
        self.as_dyn().addr()
    }

    fn check_value(&self, cx: &EvalContext<'_>, phase: EvalPhase) -> (Value, Diagnostics) {
        self.as_dyn().check_value(cx, phase)
    }

    fn value(&self, cx: &EvalContext<'_>, phase: EvalPhase) -> Value {
        self.as_dyn().value(cx, phase)
    }

    fn references(&self) -> Vec<Address> {
        self.as_dyn().references()
    }

    fn plan_changes(&self, cx: &EvalContext<'_>) -> (Vec<PlannedChange>, Diagnostics) {
        self.as_dyn().plan_changes(cx)
    }

    fn check_apply(&self, cx: &EvalContext<'_>) -> (Vec<AppliedChange>, Diagnostics) {
        self.as_dyn().check_apply(cx)
    }

    fn validate(&self, cx: &EvalContext<'_>) -> Diagnostics {
        self.as_dyn().validate(cx)
    }
}
