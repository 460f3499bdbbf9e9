//! Expression visitor.
//!
//! Default implementations call `walk_*` functions that traverse children.
//! Override `visit_*` methods to add custom behavior at specific nodes.
//!
//! # Example
//!
//! ```text
//! struct CountTraversals {
//!     count: usize,
//! }
//!
//! impl<'ast> Visitor<'ast> for CountTraversals {
//!     fn visit_traversal(&mut self, _: &'ast str, _: &'ast [TraverseStep], _: Span) {
//!         self.count += 1;
//!     }
//! }
//! ```

use crate::expr::{Expr, ExprKind, TraverseStep};
use crate::Span;

/// Expression visitor trait.
///
/// The visitor can mutate its own state; the tree stays immutable.
pub trait Visitor<'ast> {
    fn visit_expr(&mut self, expr: &'ast Expr) {
        walk_expr(self, expr);
    }

    /// Visit a root traversal such as `var.name`.
    fn visit_traversal(&mut self, root: &'ast str, steps: &'ast [TraverseStep], span: Span) {
        let _ = (root, steps, span);
    }

    /// Visit a node that failed to parse.
    fn visit_invalid(&mut self, source: &'ast str, span: Span) {
        let _ = (source, span);
    }
}

/// Walk the children of an expression.
pub fn walk_expr<'ast, V: Visitor<'ast> + ?Sized>(visitor: &mut V, expr: &'ast Expr) {
    match &expr.kind {
        ExprKind::Literal(_) => {}
        ExprKind::Template(parts) | ExprKind::List(parts) => {
            for part in parts {
                visitor.visit_expr(part);
            }
        }
        ExprKind::Call { args, .. } => {
            for arg in args {
                visitor.visit_expr(arg);
            }
        }
        ExprKind::Object(attrs) => {
            for (_, value) in attrs {
                visitor.visit_expr(value);
            }
        }
        ExprKind::Traversal { root, steps } => visitor.visit_traversal(root, steps, expr.span),
        ExprKind::GetAttr { base, .. } => visitor.visit_expr(base),
        ExprKind::Index { base, key } => {
            visitor.visit_expr(base);
            visitor.visit_expr(key);
        }
        ExprKind::Unary { operand, .. } => visitor.visit_expr(operand),
        ExprKind::Binary { left, right, .. } => {
            visitor.visit_expr(left);
            visitor.visit_expr(right);
        }
        ExprKind::Conditional {
            cond,
            then_expr,
            else_expr,
        } => {
            visitor.visit_expr(cond);
            visitor.visit_expr(then_expr);
            visitor.visit_expr(else_expr);
        }
        ExprKind::Invalid(source) => visitor.visit_invalid(source, expr.span),
    }
}
