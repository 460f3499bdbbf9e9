//! Reference resolver.
//!
//! Static analysis over an expression: which declarations does it mention?
//! Nothing is evaluated. Malformed references and unparseable fragments are
//! reported as diagnostics and skipped, so resolution always terminates
//! with whatever references could be recognized.

use std::sync::Arc;

use stk_diagnostic::{Diagnostic, Diagnostics, ErrorCode};
use stk_ir::visitor::Visitor;
use stk_ir::{
    collect_references, Expr, RefErrorKind, RefParseError, Reference, SourceRange, Span,
};

/// Scope-relative references in `expr`, plus diagnostics for anything that
/// could not be understood.
pub fn references_in_expr(expr: &Expr, source: &Arc<str>) -> (Vec<Reference>, Diagnostics) {
    let (refs, errors) = collect_references(expr);
    let mut diags: Diagnostics = errors
        .iter()
        .map(|err| ref_error_diagnostic(err, source))
        .collect();

    let mut invalid = InvalidFragments::default();
    invalid.visit_expr(expr);
    diags.extend(
        invalid
            .found
            .into_iter()
            .map(|(text, span)| invalid_expression_diagnostic(text, span, source)),
    );
    (refs, diags)
}

/// References across several expressions, ignoring diagnostics; evaluating
/// the same expressions reports them.
pub(crate) fn references_in_exprs<'a, I>(exprs: I, source: &Arc<str>) -> Vec<Reference>
where
    I: IntoIterator<Item = &'a Expr>,
{
    exprs
        .into_iter()
        .flat_map(|expr| references_in_expr(expr, source).0)
        .collect()
}

pub(crate) fn ref_error_diagnostic(err: &RefParseError, source: &Arc<str>) -> Diagnostic {
    let code = match err.kind {
        RefErrorKind::Malformed => ErrorCode::E1002,
        RefErrorKind::UnknownSymbol => ErrorCode::E1003,
    };
    Diagnostic::error(code)
        .with_summary(err.kind.summary())
        .with_detail(err.detail.clone())
        .with_range(SourceRange::new(Arc::clone(source), err.span))
}

pub(crate) fn invalid_expression_diagnostic(text: &str, span: Span, source: &Arc<str>) -> Diagnostic {
    Diagnostic::error(ErrorCode::E1001)
        .with_summary("Invalid expression")
        .with_detail(format!("Could not parse {text:?} as an expression."))
        .with_range(SourceRange::new(Arc::clone(source), span))
}

#[derive(Default)]
struct InvalidFragments<'ast> {
    found: Vec<(&'ast str, Span)>,
}

impl<'ast> Visitor<'ast> for InvalidFragments<'ast> {
    fn visit_invalid(&mut self, source: &'ast str, span: Span) {
        self.found.push((source, span));
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
