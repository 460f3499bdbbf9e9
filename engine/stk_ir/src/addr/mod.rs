//! Address algebra.
//!
//! Every declaration is identified by an [`Address`]: the path of stack
//! instances enclosing it plus a kind-tagged local name. Addresses are the
//! memoization keys of the evaluator and the node identities of the
//! reference graph, so they are cheap to compare, hash and order.
//!
//! Static (configuration) addresses drop the instance keys:
//!
//! ```text
//! stack.app["eu"].component.db     Address / ComponentInstanceAddr
//! stack.app.component.db           ConfigAddress
//! ```

use std::fmt;

use smallvec::SmallVec;
use stk_value::Value;

/// Instance key of a repeated (`for_each`) stack call or component.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct InstanceKey(String);

impl InstanceKey {
    pub fn new(key: impl Into<String>) -> Self {
        InstanceKey(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The value `each.key` evaluates to for this instance.
    pub fn to_value(&self) -> Value {
        Value::string(self.0.as_str())
    }
}

impl fmt::Display for InstanceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}]", self.0)
    }
}

/// One step of a stack instance path: a stack call name and, for repeated
/// calls, the instance key.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct StackStep {
    pub name: String,
    pub key: Option<InstanceKey>,
}

/// Absolute address of a stack instance. The root stack has no steps.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct StackInstance(SmallVec<[StackStep; 2]>);

impl StackInstance {
    pub fn root() -> Self {
        StackInstance(SmallVec::new())
    }

    #[inline]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn steps(&self) -> &[StackStep] {
        &self.0
    }

    /// Address of the child instance created by stack call `name`.
    #[must_use]
    pub fn child(&self, name: impl Into<String>, key: Option<InstanceKey>) -> Self {
        let mut steps = self.0.clone();
        steps.push(StackStep {
            name: name.into(),
            key,
        });
        StackInstance(steps)
    }

    /// The enclosing stack instance and the step leading from it to `self`.
    pub fn parent(&self) -> Option<(StackInstance, &StackStep)> {
        let (last, rest) = self.0.split_last()?;
        Some((StackInstance(rest.iter().cloned().collect()), last))
    }

    /// The static stack this instance belongs to.
    pub fn config_addr(&self) -> StackConfigAddr {
        StackConfigAddr(self.0.iter().map(|step| step.name.clone()).collect())
    }
}

impl fmt::Display for StackInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            write!(f, "stack.{}", step.name)?;
            if let Some(key) = &step.key {
                write!(f, "{key}")?;
            }
        }
        Ok(())
    }
}

/// Static address of a stack in the configuration tree.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct StackConfigAddr(SmallVec<[String; 2]>);

impl StackConfigAddr {
    pub fn root() -> Self {
        StackConfigAddr(SmallVec::new())
    }

    #[inline]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn steps(&self) -> &[String] {
        &self.0
    }

    #[must_use]
    pub fn child(&self, name: impl Into<String>) -> Self {
        let mut steps = self.0.clone();
        steps.push(name.into());
        StackConfigAddr(steps)
    }
}

impl fmt::Display for StackConfigAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, name) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            write!(f, "stack.{name}")?;
        }
        Ok(())
    }
}

/// Kind tag of a declaration.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub enum DeclKind {
    LocalValue,
    InputVariable,
    OutputValue,
    Component,
    StackCall,
}

impl DeclKind {
    /// Keyword used in references and printed addresses.
    pub fn keyword(self) -> &'static str {
        match self {
            DeclKind::LocalValue => "local",
            DeclKind::InputVariable => "var",
            DeclKind::OutputValue => "output",
            DeclKind::Component => "component",
            DeclKind::StackCall => "stack",
        }
    }

    /// Singular noun for messages ("local value", "input variable", ...).
    pub fn noun(self) -> &'static str {
        match self {
            DeclKind::LocalValue => "local value",
            DeclKind::InputVariable => "input variable",
            DeclKind::OutputValue => "output value",
            DeclKind::Component => "component",
            DeclKind::StackCall => "embedded stack",
        }
    }
}

/// Kind-tagged name of a declaration, relative to its stack.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct LocalAddr {
    pub kind: DeclKind,
    pub name: String,
}

impl LocalAddr {
    pub fn new(kind: DeclKind, name: impl Into<String>) -> Self {
        LocalAddr {
            kind,
            name: name.into(),
        }
    }

    pub fn local(name: impl Into<String>) -> Self {
        Self::new(DeclKind::LocalValue, name)
    }

    pub fn var(name: impl Into<String>) -> Self {
        Self::new(DeclKind::InputVariable, name)
    }

    pub fn output(name: impl Into<String>) -> Self {
        Self::new(DeclKind::OutputValue, name)
    }

    pub fn component(name: impl Into<String>) -> Self {
        Self::new(DeclKind::Component, name)
    }

    pub fn stack_call(name: impl Into<String>) -> Self {
        Self::new(DeclKind::StackCall, name)
    }

    /// Qualify with the stack instance this name is declared in.
    pub fn absolute(&self, stack: &StackInstance) -> Address {
        Address {
            stack: stack.clone(),
            item: self.clone(),
        }
    }
}

impl fmt::Display for LocalAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.kind.keyword(), self.name)
    }
}

/// Globally unique identity of a declaration within one evaluation run.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct Address {
    pub stack: StackInstance,
    pub item: LocalAddr,
}

impl Address {
    pub fn new(stack: StackInstance, item: LocalAddr) -> Self {
        Address { stack, item }
    }

    /// Address of a declaration in the root stack.
    pub fn in_root(item: LocalAddr) -> Self {
        Address {
            stack: StackInstance::root(),
            item,
        }
    }

    #[inline]
    pub fn kind(&self) -> DeclKind {
        self.item.kind
    }

    pub fn config_addr(&self) -> ConfigAddress {
        ConfigAddress {
            stack: self.stack.config_addr(),
            item: self.item.clone(),
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.stack.is_root() {
            write!(f, "{}", self.item)
        } else {
            write!(f, "{}.{}", self.stack, self.item)
        }
    }
}

/// Static counterpart of [`Address`].
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct ConfigAddress {
    pub stack: StackConfigAddr,
    pub item: LocalAddr,
}

impl fmt::Display for ConfigAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.stack.is_root() {
            write!(f, "{}", self.item)
        } else {
            write!(f, "{}.{}", self.stack, self.item)
        }
    }
}

/// One instance of a (possibly repeated) component.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct ComponentInstanceAddr {
    pub component: Address,
    pub key: Option<InstanceKey>,
}

impl fmt::Display for ComponentInstanceAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.component)?;
        if let Some(key) = &self.key {
            write!(f, "{key}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
