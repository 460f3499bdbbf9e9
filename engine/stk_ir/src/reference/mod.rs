//! Static references between declarations.
//!
//! References are found by scanning an expression's traversals without
//! evaluating it. Special symbols (`each.key`, `each.value`,
//! `deploy.applying`) are recognized here but never name a declaration.

use std::fmt;

use crate::addr::{Address, LocalAddr, StackInstance};
use crate::expr::{Expr, TraverseStep};
use crate::visitor::Visitor;
use crate::Span;

/// What a traversal root refers to.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub enum RefTarget {
    /// A declaration in the same stack.
    Item(LocalAddr),
    /// `each.key` in a repeated block.
    EachKey,
    /// `each.value` in a repeated block.
    EachValue,
    /// `deploy.applying`: true during apply, false otherwise.
    Applying,
}

/// A reference found in an expression.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct Reference {
    pub target: RefTarget,
    pub span: Span,
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum RefErrorKind {
    /// A known symbol used the wrong way, e.g. `each.index`.
    Malformed,
    /// A root symbol that does not exist, e.g. `resource.x`.
    UnknownSymbol,
}

impl RefErrorKind {
    pub fn summary(self) -> &'static str {
        match self {
            RefErrorKind::Malformed => "Invalid reference",
            RefErrorKind::UnknownSymbol => "Reference to unknown symbol",
        }
    }
}

/// A traversal that does not form a valid reference.
#[derive(Clone, Eq, PartialEq, Hash, Debug, thiserror::Error)]
#[error("{}: {detail}", .kind.summary())]
pub struct RefParseError {
    pub kind: RefErrorKind,
    pub detail: String,
    pub span: Span,
}

impl fmt::Display for RefTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefTarget::Item(addr) => write!(f, "{addr}"),
            RefTarget::EachKey => f.write_str("each.key"),
            RefTarget::EachValue => f.write_str("each.value"),
            RefTarget::Applying => f.write_str("deploy.applying"),
        }
    }
}

/// Interpret a traversal root and its leading steps.
///
/// Returns the target and the steps that remain to be applied to the
/// target's value.
pub fn parse_ref<'a>(
    root: &str,
    steps: &'a [TraverseStep],
    span: Span,
) -> Result<(RefTarget, &'a [TraverseStep]), RefParseError> {
    let invalid = |detail: String| RefParseError {
        kind: RefErrorKind::Malformed,
        detail,
        span,
    };
    let (first, rest) = match steps.split_first() {
        Some((TraverseStep::Attr(name), rest)) => (name.as_str(), rest),
        Some((TraverseStep::Index(_), _)) | None => {
            return Err(invalid(format!(
                "The \"{root}\" symbol must be followed by an attribute name."
            )));
        }
    };
    let target = match root {
        "local" => RefTarget::Item(LocalAddr::local(first)),
        "var" => RefTarget::Item(LocalAddr::var(first)),
        "component" => RefTarget::Item(LocalAddr::component(first)),
        "stack" => RefTarget::Item(LocalAddr::stack_call(first)),
        "each" => match first {
            "key" => RefTarget::EachKey,
            "value" => RefTarget::EachValue,
            other => {
                return Err(invalid(format!(
                    "The \"each\" object has no attribute named \"{other}\"; use each.key or each.value."
                )));
            }
        },
        "deploy" => match first {
            "applying" => RefTarget::Applying,
            other => {
                return Err(invalid(format!(
                    "The \"deploy\" object has no attribute named \"{other}\"."
                )));
            }
        },
        "output" => {
            return Err(invalid(
                "Output values cannot be referenced from inside the stack that declares them."
                    .to_owned(),
            ));
        }
        other => {
            return Err(RefParseError {
                kind: RefErrorKind::UnknownSymbol,
                detail: format!("There is no symbol named \"{other}\"."),
                span,
            });
        }
    };
    Ok((target, rest))
}

/// All references in `expr`, in source order, plus any malformed ones.
pub fn collect_references(expr: &Expr) -> (Vec<Reference>, Vec<RefParseError>) {
    let mut collector = Collector::default();
    collector.visit_expr(expr);
    (collector.refs, collector.errors)
}

#[derive(Default)]
struct Collector {
    refs: Vec<Reference>,
    errors: Vec<RefParseError>,
}

impl<'ast> Visitor<'ast> for Collector {
    fn visit_traversal(&mut self, root: &'ast str, steps: &'ast [TraverseStep], span: Span) {
        match parse_ref(root, steps, span) {
            Ok((target, _)) => self.refs.push(Reference { target, span }),
            Err(err) => self.errors.push(err),
        }
    }
}

/// Qualify declaration references with the stack they were made from.
///
/// Special symbols are dropped. The result is sorted and deduplicated.
pub fn make_references_absolute(refs: &[Reference], stack: &StackInstance) -> Vec<Address> {
    let mut addrs: Vec<Address> = refs
        .iter()
        .filter_map(|r| match &r.target {
            RefTarget::Item(item) => Some(item.absolute(stack)),
            RefTarget::EachKey | RefTarget::EachValue | RefTarget::Applying => None,
        })
        .collect();
    addrs.sort();
    addrs.dedup();
    addrs
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
mod tests;
