//! Static stack configuration.
//!
//! A [`StackConfig`] is the decoded form of one stack's configuration
//! files: its declarations keyed by name, plus the configurations of the
//! stacks it embeds. Configuration is immutable once built; evaluation
//! shares it behind `Arc`.

use std::collections::BTreeMap;
use std::sync::Arc;

use stk_value::{Type, Value};

use crate::addr::{DeclKind, LocalAddr, StackConfigAddr};
use crate::expr::Expr;
use crate::{SourceRange, Span};

#[derive(Clone, PartialEq, Debug)]
pub struct LocalValueDecl {
    pub name: String,
    pub value: Expr,
    pub range: SourceRange,
}

#[derive(Clone, PartialEq, Debug)]
pub struct InputVariableDecl {
    pub name: String,
    pub ty: Type,
    /// Used when the caller does not set the variable. `None` makes it required.
    pub default: Option<Value>,
    pub range: SourceRange,
}

#[derive(Clone, PartialEq, Debug)]
pub struct OutputValueDecl {
    pub name: String,
    pub ty: Type,
    pub value: Expr,
    pub range: SourceRange,
}

/// A component: one provider call per instance.
#[derive(Clone, PartialEq, Debug)]
pub struct ComponentDecl {
    pub name: String,
    /// Map or set of strings; one instance per key.
    pub for_each: Option<Expr>,
    /// Object expression passed to the provider.
    pub inputs: Expr,
    pub range: SourceRange,
}

/// An embedded stack.
#[derive(Clone, PartialEq, Debug)]
pub struct StackCallDecl {
    pub name: String,
    pub for_each: Option<Expr>,
    /// Object expression whose attributes set the child's input variables.
    pub inputs: Expr,
    pub config: Arc<StackConfig>,
    pub range: SourceRange,
}

/// All declarations of one stack.
#[derive(Clone, PartialEq, Debug)]
pub struct StackConfig {
    pub source: Arc<str>,
    pub locals: BTreeMap<String, LocalValueDecl>,
    pub inputs: BTreeMap<String, InputVariableDecl>,
    pub outputs: BTreeMap<String, OutputValueDecl>,
    pub components: BTreeMap<String, ComponentDecl>,
    pub stack_calls: BTreeMap<String, StackCallDecl>,
}

impl StackConfig {
    pub fn new(source: impl Into<Arc<str>>) -> Self {
        StackConfig {
            source: source.into(),
            locals: BTreeMap::new(),
            inputs: BTreeMap::new(),
            outputs: BTreeMap::new(),
            components: BTreeMap::new(),
            stack_calls: BTreeMap::new(),
        }
    }

    fn range(&self, span: Span) -> SourceRange {
        SourceRange::new(Arc::clone(&self.source), span)
    }

    #[must_use]
    pub fn with_local(mut self, name: &str, value: Expr) -> Self {
        let range = self.range(value.span);
        self.locals.insert(
            name.to_owned(),
            LocalValueDecl {
                name: name.to_owned(),
                value,
                range,
            },
        );
        self
    }

    #[must_use]
    pub fn with_input(mut self, name: &str, ty: Type, default: Option<Value>) -> Self {
        let range = self.range(Span::DUMMY);
        self.inputs.insert(
            name.to_owned(),
            InputVariableDecl {
                name: name.to_owned(),
                ty,
                default,
                range,
            },
        );
        self
    }

    #[must_use]
    pub fn with_output(mut self, name: &str, ty: Type, value: Expr) -> Self {
        let range = self.range(value.span);
        self.outputs.insert(
            name.to_owned(),
            OutputValueDecl {
                name: name.to_owned(),
                ty,
                value,
                range,
            },
        );
        self
    }

    #[must_use]
    pub fn with_component(self, name: &str, inputs: Expr) -> Self {
        self.with_component_decl(name, None, inputs)
    }

    #[must_use]
    pub fn with_component_for_each(self, name: &str, for_each: Expr, inputs: Expr) -> Self {
        self.with_component_decl(name, Some(for_each), inputs)
    }

    fn with_component_decl(mut self, name: &str, for_each: Option<Expr>, inputs: Expr) -> Self {
        let range = self.range(inputs.span);
        self.components.insert(
            name.to_owned(),
            ComponentDecl {
                name: name.to_owned(),
                for_each,
                inputs,
                range,
            },
        );
        self
    }

    #[must_use]
    pub fn with_stack_call(self, name: &str, config: StackConfig, inputs: Expr) -> Self {
        self.with_stack_call_decl(name, None, config, inputs)
    }

    #[must_use]
    pub fn with_stack_call_for_each(
        self,
        name: &str,
        for_each: Expr,
        config: StackConfig,
        inputs: Expr,
    ) -> Self {
        self.with_stack_call_decl(name, Some(for_each), config, inputs)
    }

    fn with_stack_call_decl(
        mut self,
        name: &str,
        for_each: Option<Expr>,
        config: StackConfig,
        inputs: Expr,
    ) -> Self {
        let range = self.range(inputs.span);
        self.stack_calls.insert(
            name.to_owned(),
            StackCallDecl {
                name: name.to_owned(),
                for_each,
                inputs,
                config: Arc::new(config),
                range,
            },
        );
        self
    }

    /// Whether a declaration with this kind and name exists.
    pub fn declares(&self, addr: &LocalAddr) -> bool {
        let name = addr.name.as_str();
        match addr.kind {
            DeclKind::LocalValue => self.locals.contains_key(name),
            DeclKind::InputVariable => self.inputs.contains_key(name),
            DeclKind::OutputValue => self.outputs.contains_key(name),
            DeclKind::Component => self.components.contains_key(name),
            DeclKind::StackCall => self.stack_calls.contains_key(name),
        }
    }

    /// Every declaration in this stack, ordered by kind then name.
    pub fn declarations(&self) -> Vec<LocalAddr> {
        let mut addrs = Vec::new();
        addrs.extend(self.locals.keys().map(LocalAddr::local));
        addrs.extend(self.inputs.keys().map(LocalAddr::var));
        addrs.extend(self.outputs.keys().map(LocalAddr::output));
        addrs.extend(self.components.keys().map(LocalAddr::component));
        addrs.extend(self.stack_calls.keys().map(LocalAddr::stack_call));
        addrs
    }

    /// Configuration of a (transitively) embedded stack.
    pub fn descendant(self: &Arc<Self>, addr: &StackConfigAddr) -> Option<Arc<StackConfig>> {
        let mut current = Arc::clone(self);
        for name in addr.steps() {
            let next = Arc::clone(&current.stack_calls.get(name)?.config);
            current = next;
        }
        Some(current)
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
