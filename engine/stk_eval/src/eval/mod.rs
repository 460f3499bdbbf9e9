//! Expression evaluation.
//!
//! An expression is evaluated against an [`EvalScope`], which supplies the
//! values of the references it mentions. Problems become diagnostics and
//! the offending subexpression evaluates to the placeholder; evaluation
//! itself never fails.
//!
//! Placeholders are contagious: any operation on [`Value::Dynamic`] yields
//! the placeholder without a new diagnostic, since whoever produced it has
//! already reported why. Unknown values propagate as unknown results of the
//! operation's result type.

mod builtins;
mod operators;

use std::sync::Arc;

use stk_diagnostic::{Diagnostic, Diagnostics, ErrorCode};
use stk_ir::{parse_ref, Expr, ExprKind, RefTarget, SourceRange, Span, TraverseStep};
use stk_promise::EvalPhase;
use stk_value::{convert, Type, Value};

use crate::resolver::{invalid_expression_diagnostic, ref_error_diagnostic};
use crate::stack_guard::ensure_sufficient_stack;

/// What an expression can see while it is evaluated.
pub trait EvalScope {
    fn phase(&self) -> EvalPhase;

    /// File the expression came from, for diagnostic ranges.
    fn source(&self) -> &Arc<str>;

    /// Value of a reference target, with any diagnostics its evaluation
    /// produced.
    fn resolve(&self, target: &RefTarget, span: Span) -> (Value, Diagnostics);
}

/// An operation could not be applied to its operands.
#[derive(Clone, Eq, PartialEq, Debug, thiserror::Error)]
#[error("{summary}: {detail}")]
pub struct EvalError {
    pub code: ErrorCode,
    pub summary: &'static str,
    pub detail: String,
}

impl EvalError {
    pub(crate) fn new(code: ErrorCode, summary: &'static str, detail: impl Into<String>) -> Self {
        EvalError {
            code,
            summary,
            detail: detail.into(),
        }
    }

    fn into_diagnostic(self, range: SourceRange) -> Diagnostic {
        Diagnostic::error(self.code)
            .with_summary(self.summary)
            .with_detail(self.detail)
            .with_range(range)
    }
}

/// Evaluate `expr` in `scope`.
pub fn eval_expr(expr: &Expr, scope: &dyn EvalScope) -> (Value, Diagnostics) {
    let mut evaluator = Evaluator {
        scope,
        diags: Diagnostics::new(),
    };
    let value = evaluator.eval(expr);
    (value, evaluator.diags)
}

struct Evaluator<'a> {
    scope: &'a dyn EvalScope,
    diags: Diagnostics,
}

impl Evaluator<'_> {
    fn eval(&mut self, expr: &Expr) -> Value {
        ensure_sufficient_stack(|| self.eval_kind(expr))
    }

    fn range(&self, span: Span) -> SourceRange {
        SourceRange::new(Arc::clone(self.scope.source()), span)
    }

    /// Record the error of a failed operation and degrade to the placeholder.
    fn lift(&mut self, result: Result<Value, EvalError>, span: Span) -> Value {
        match result {
            Ok(value) => value,
            Err(err) => {
                let range = self.range(span);
                self.diags.push(err.into_diagnostic(range));
                Value::Dynamic
            }
        }
    }

    fn eval_all(&mut self, exprs: &[Expr]) -> Vec<Value> {
        exprs.iter().map(|e| self.eval(e)).collect()
    }

    fn eval_kind(&mut self, expr: &Expr) -> Value {
        let span = expr.span;
        match &expr.kind {
            ExprKind::Literal(value) => value.clone(),
            ExprKind::Template(parts) => {
                let values = self.eval_all(parts);
                let result = operators::template(&values);
                self.lift(result, span)
            }
            ExprKind::List(items) => Value::tuple(self.eval_all(items)),
            ExprKind::Object(attrs) => {
                let mut values = Vec::with_capacity(attrs.len());
                for (name, value) in attrs {
                    values.push((name.clone(), self.eval(value)));
                }
                Value::object(values)
            }
            ExprKind::Traversal { root, steps } => match parse_ref(root, steps, span) {
                Ok((target, rest)) => {
                    let (value, diags) = self.scope.resolve(&target, span);
                    self.diags.append(diags);
                    self.traverse(value, rest, span)
                }
                Err(err) => {
                    let diag = ref_error_diagnostic(&err, self.scope.source());
                    self.diags.push(diag);
                    Value::Dynamic
                }
            },
            ExprKind::GetAttr { base, name } => {
                let base = self.eval(base);
                self.lift(operators::get_attr(&base, name), span)
            }
            ExprKind::Index { base, key } => {
                let base = self.eval(base);
                let key = self.eval(key);
                self.lift(operators::index(&base, &key), span)
            }
            ExprKind::Unary { op, operand } => {
                let operand = self.eval(operand);
                self.lift(operators::unary(*op, &operand), span)
            }
            ExprKind::Binary { op, left, right } => {
                let left = self.eval(left);
                let right = self.eval(right);
                self.lift(operators::binary(*op, &left, &right), span)
            }
            ExprKind::Conditional {
                cond,
                then_expr,
                else_expr,
            } => self.eval_conditional(cond, then_expr, else_expr),
            ExprKind::Call { func, args } => {
                let args = self.eval_all(args);
                self.lift(builtins::call(func, &args), span)
            }
            ExprKind::Invalid(text) => {
                let diag = invalid_expression_diagnostic(text, span, self.scope.source());
                self.diags.push(diag);
                Value::Dynamic
            }
        }
    }

    fn traverse(&mut self, mut value: Value, steps: &[TraverseStep], span: Span) -> Value {
        for step in steps {
            let result = match step {
                TraverseStep::Attr(name) => operators::get_attr(&value, name),
                TraverseStep::Index(key) => operators::index(&value, key),
            };
            value = self.lift(result, span);
            if value.is_placeholder() {
                break;
            }
        }
        value
    }

    /// Only the selected branch is evaluated once the condition is known.
    fn eval_conditional(&mut self, cond: &Expr, then_expr: &Expr, else_expr: &Expr) -> Value {
        let value = self.eval(cond);
        let cond_value = match &value {
            Value::Dynamic => return Value::Dynamic,
            Value::Null(_) => {
                return self.lift(
                    Err(EvalError::new(
                        ErrorCode::E1006,
                        "Null condition",
                        "The condition value is null. Conditions must either be true or false.",
                    )),
                    cond.span,
                );
            }
            other => convert(other, &Type::Bool),
        };
        match cond_value {
            Ok(Value::Bool(true)) => self.eval(then_expr),
            Ok(Value::Bool(false)) => self.eval(else_expr),
            Ok(_) => {
                let then_value = self.eval(then_expr);
                let else_value = self.eval(else_expr);
                if then_value.is_placeholder() || else_value.is_placeholder() {
                    return Value::Dynamic;
                }
                let ty = Type::unify([&then_value.ty(), &else_value.ty()]).unwrap_or_default();
                Value::Unknown(ty)
            }
            Err(err) => self.lift(
                Err(EvalError::new(
                    ErrorCode::E1006,
                    "Incorrect condition type",
                    format!("The condition expression must be of type bool: {err}."),
                )),
                cond.span,
            ),
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
mod tests;
