//! The run-level registry.
//!
//! One [`Main`] exists per evaluation run. It owns everything shared by the
//! run's tasks: the configuration, caller inputs, the component provider,
//! the promise runtime, and the identity maps from addresses to live
//! stacks and declarations. Nothing here is global; dropping the `Main`
//! ends the run.

mod provider;

pub use provider::{ComponentProvider, PassthroughProvider, ProviderError};

use std::collections::BTreeMap;
use std::sync::Arc;

use dashmap::DashMap;
use stk_diagnostic::{Diagnostic, Diagnostics, ErrorCode};
use stk_ir::{Address, ComponentDecl, ComponentInstanceAddr, LocalAddr, StackConfig, StackInstance};
use stk_promise::{CancellationToken, EvalPhase, Runtime, Task};
use stk_value::Value;

use crate::context::EvalContext;
use crate::decl::{AnyDeclaration, ComponentInstance, Declaration, StackCall};
use crate::stack::Stack;

/// Values the caller supplies for the root stack's input variables.
#[derive(Clone, Default, Debug)]
struct RunInputs {
    plan: BTreeMap<String, Value>,
    /// Apply-only overrides; anything missing falls back to `plan`.
    apply: BTreeMap<String, Value>,
}

pub struct Main {
    config: Arc<StackConfig>,
    inputs: RunInputs,
    provider: Arc<dyn ComponentProvider>,
    runtime: Arc<Runtime>,
    root: Arc<Stack>,
    stacks: DashMap<StackInstance, Arc<Stack>>,
    declarations: DashMap<Address, AnyDeclaration>,
    component_instances: DashMap<ComponentInstanceAddr, Arc<ComponentInstance>>,
}

impl Main {
    pub fn builder(config: impl Into<Arc<StackConfig>>) -> MainBuilder {
        MainBuilder {
            config: config.into(),
            inputs: RunInputs::default(),
            provider: None,
            cancel: None,
        }
    }

    pub fn config(&self) -> &Arc<StackConfig> {
        &self.config
    }

    pub fn runtime(&self) -> &Arc<Runtime> {
        &self.runtime
    }

    /// A fresh task for an independent top-level request.
    pub fn new_task(&self) -> Task {
        self.runtime.new_task()
    }

    pub fn cancellation(&self) -> &CancellationToken {
        self.runtime.cancellation()
    }

    pub fn provider(&self) -> &dyn ComponentProvider {
        &*self.provider
    }

    /// Caller-supplied value of a root input variable.
    ///
    /// Validation never sees caller inputs.
    pub fn root_input(&self, name: &str, phase: EvalPhase) -> Option<&Value> {
        match phase {
            EvalPhase::Validate => None,
            EvalPhase::Plan => self.inputs.plan.get(name),
            EvalPhase::Apply => self
                .inputs
                .apply
                .get(name)
                .or_else(|| self.inputs.plan.get(name)),
        }
    }

    pub fn root_stack(&self) -> &Arc<Stack> {
        &self.root
    }

    /// The live stack instance at `addr`, if it exists in `phase`.
    ///
    /// The root always exists. An embedded instance exists when its parent
    /// does and the parent's call to it has an instance with its key.
    pub fn stack(&self, task: &Task, addr: &StackInstance, phase: EvalPhase) -> Option<Arc<Stack>> {
        let Some((parent_addr, step)) = addr.parent() else {
            return Some(Arc::clone(&self.root));
        };
        let parent = self.stack(task, &parent_addr, phase)?;
        let call = self.stack_call(&Address::new(
            parent_addr,
            LocalAddr::stack_call(step.name.as_str()),
        ))?;
        let cx = EvalContext::new(self, task);
        if !call.has_instance(&cx, phase, step.key.as_ref()) {
            return None;
        }
        if let Some(stack) = self.stacks.get(addr) {
            return Some(Arc::clone(stack.value()));
        }
        let config = Arc::clone(&parent.config().stack_calls.get(&step.name)?.config);
        let stack = self
            .stacks
            .entry(addr.clone())
            .or_insert_with(|| Arc::new(Stack::new(addr.clone(), config)));
        Some(Arc::clone(stack.value()))
    }

    /// The declaration at `addr`, created on first request.
    ///
    /// `None` when the static configuration declares nothing there. Whether
    /// the enclosing stack instance exists is decided per phase by the
    /// declaration itself.
    pub fn declaration(&self, addr: &Address) -> Option<AnyDeclaration> {
        if let Some(decl) = self.declarations.get(addr) {
            return Some(decl.value().clone());
        }
        let config = self.config.descendant(&addr.stack.config_addr())?;
        let caller = match addr.stack.parent() {
            Some((parent, step)) => {
                let parent_config = self.config.descendant(&parent.config_addr())?;
                let call = parent_config.stack_calls.get(&step.name)?;
                Some((parent, call.clone()))
            }
            None => None,
        };
        let decl = AnyDeclaration::new(addr, &config, caller)?;
        let entry = self.declarations.entry(addr.clone()).or_insert(decl);
        Some(entry.value().clone())
    }

    pub(crate) fn stack_call(&self, addr: &Address) -> Option<Arc<StackCall>> {
        match self.declaration(addr)? {
            AnyDeclaration::StackCall(call) => Some(call),
            _ => None,
        }
    }

    pub(crate) fn component_instance(
        &self,
        addr: &ComponentInstanceAddr,
        decl: &Arc<ComponentDecl>,
    ) -> Arc<ComponentInstance> {
        if let Some(instance) = self.component_instances.get(addr) {
            return Arc::clone(instance.value());
        }
        let instance = self
            .component_instances
            .entry(addr.clone())
            .or_insert_with(|| {
                Arc::new(ComponentInstance::new(addr.clone(), Arc::clone(decl)))
            });
        Arc::clone(instance.value())
    }

    /// Every declaration of every stack instance that exists in `phase`,
    /// parents before children.
    pub fn all_declarations(&self, task: &Task, phase: EvalPhase) -> Vec<AnyDeclaration> {
        let cx = EvalContext::new(self, task);
        let mut out = Vec::new();
        let mut pending = vec![Arc::clone(&self.root)];
        while let Some(stack) = pending.pop() {
            for item in stack.config().declarations() {
                let addr = item.absolute(stack.addr());
                let Some(decl) = self.declaration(&addr) else {
                    continue;
                };
                if let AnyDeclaration::StackCall(call) = &decl {
                    for child in call.child_addrs(&cx, phase) {
                        if let Some(child) = self.stack(task, &child, phase) {
                            pending.push(child);
                        }
                    }
                }
                out.push(decl);
            }
        }
        out
    }

    /// Evaluate one declaration on a fresh task.
    ///
    /// An address with no declaration yields the placeholder and an error.
    pub fn check_value(&self, addr: &Address, phase: EvalPhase) -> (Value, Diagnostics) {
        let task = self.new_task();
        let cx = EvalContext::new(self, &task);
        match self.declaration(addr) {
            Some(decl) => decl.check_value(&cx, phase),
            None => (
                Value::Dynamic,
                Diagnostic::error(ErrorCode::E1003)
                    .with_summary(format!("Reference to undeclared {}", addr.kind().noun()))
                    .with_detail(format!("There is no declaration at {addr}."))
                    .into(),
            ),
        }
    }
}

impl std::fmt::Debug for Main {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Main")
            .field("source", &self.config.source)
            .field("stacks", &(self.stacks.len() + 1))
            .field("declarations", &self.declarations.len())
            .finish_non_exhaustive()
    }
}

/// Builder for [`Main`].
#[must_use]
pub struct MainBuilder {
    config: Arc<StackConfig>,
    inputs: RunInputs,
    provider: Option<Arc<dyn ComponentProvider>>,
    cancel: Option<CancellationToken>,
}

impl MainBuilder {
    /// Set a root input variable for every phase.
    pub fn input(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.inputs.plan.insert(name.to_owned(), value.into());
        self
    }

    /// Set a root input variable for the apply phase only.
    pub fn apply_input(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.inputs.apply.insert(name.to_owned(), value.into());
        self
    }

    /// Defaults to [`PassthroughProvider`].
    pub fn provider(mut self, provider: Arc<dyn ComponentProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn build(self) -> Main {
        let root = Arc::new(Stack::new(StackInstance::root(), Arc::clone(&self.config)));
        Main {
            config: self.config,
            inputs: self.inputs,
            provider: self
                .provider
                .unwrap_or_else(|| Arc::new(PassthroughProvider)),
            runtime: Runtime::new(self.cancel.unwrap_or_default()),
            root,
            stacks: DashMap::new(),
            declarations: DashMap::new(),
            component_instances: DashMap::new(),
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
