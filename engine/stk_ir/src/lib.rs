//! Intermediate representation for the stack evaluation engine.
//!
//! This crate holds everything that is known before evaluation starts:
//! addresses, source locations, expression trees, the static references
//! between declarations, and the decoded configuration of each stack.

pub mod addr;
pub mod config;
pub mod expr;
pub mod reference;
mod span;
pub mod visitor;

pub use addr::{
    Address, ComponentInstanceAddr, ConfigAddress, DeclKind, InstanceKey, LocalAddr,
    StackConfigAddr, StackInstance, StackStep,
};
pub use config::{
    ComponentDecl, InputVariableDecl, LocalValueDecl, OutputValueDecl, StackCallDecl, StackConfig,
};
pub use expr::{BinaryOp, Expr, ExprKind, TraverseStep, UnaryOp};
pub use reference::{
    collect_references, make_references_absolute, parse_ref, RefErrorKind, RefParseError, RefTarget,
    Reference,
};
pub use span::{SourceRange, Span};
