use super::*;
use pretty_assertions::assert_eq;
use rustc_hash::FxHashMap;
use stk_ir::{BinaryOp, LocalAddr, UnaryOp};
use std::cell::RefCell;

/// Scope backed by a fixed table; records which targets were resolved.
struct TableScope {
    phase: EvalPhase,
    source: Arc<str>,
    values: FxHashMap<RefTarget, Value>,
    resolved: RefCell<Vec<RefTarget>>,
}

impl TableScope {
    fn new(values: impl IntoIterator<Item = (RefTarget, Value)>) -> Self {
        TableScope {
            phase: EvalPhase::Plan,
            source: Arc::from("main.stk"),
            values: values.into_iter().collect(),
            resolved: RefCell::new(Vec::new()),
        }
    }
}

impl EvalScope for TableScope {
    fn phase(&self) -> EvalPhase {
        self.phase
    }

    fn source(&self) -> &Arc<str> {
        &self.source
    }

    fn resolve(&self, target: &RefTarget, _span: Span) -> (Value, Diagnostics) {
        self.resolved.borrow_mut().push(target.clone());
        match self.values.get(target) {
            Some(value) => (value.clone(), Diagnostics::new()),
            None => (
                Value::Dynamic,
                Diagnostic::error(ErrorCode::E1003)
                    .with_summary("Reference to undeclared symbol")
                    .into(),
            ),
        }
    }
}

fn var(name: &str) -> RefTarget {
    RefTarget::Item(LocalAddr::var(name))
}

#[test]
fn greeting_concatenates_variable() {
    let scope = TableScope::new([(var("name"), Value::from("world"))]);
    let expr = Expr::binary(BinaryOp::Add, Expr::lit("hello "), Expr::var("name"));
    let (value, diags) = eval_expr(&expr, &scope);
    assert_eq!(value, Value::from("hello world"));
    assert!(diags.is_empty());
}

#[test]
fn literal_collections_build_tuples_and_objects() {
    let scope = TableScope::new([]);
    let expr = Expr::object([
        ("n", Expr::lit(1.0)),
        ("tags", Expr::list(vec![Expr::lit("a"), Expr::lit(true)])),
    ]);
    let (value, diags) = eval_expr(&expr, &scope);
    assert!(diags.is_empty());
    assert_eq!(
        value,
        Value::object([
            ("n", Value::from(1.0)),
            ("tags", Value::tuple(vec![Value::from("a"), Value::from(true)])),
        ])
    );
}

#[test]
fn traversal_applies_remaining_steps() {
    let db = Value::object([("endpoint", Value::from("db.internal"))]);
    let scope = TableScope::new([(RefTarget::Item(LocalAddr::component("db")), db)]);
    let (value, diags) = eval_expr(&Expr::traversal("component", &["db", "endpoint"]), &scope);
    assert!(diags.is_empty());
    assert_eq!(value, Value::from("db.internal"));
}

#[test]
fn missing_attribute_is_reported_with_range() {
    let scope = TableScope::new([(var("cfg"), Value::empty_object())]);
    let expr = Expr::attr(Expr::var("cfg"), "port").with_span(Span::new(10, 18));
    let (value, diags) = eval_expr(&expr, &scope);
    assert_eq!(value, Value::Dynamic);
    assert_eq!(diags.len(), 1);
    let diag = diags.iter().next().unwrap();
    assert_eq!(diag.code, ErrorCode::E1007);
    assert_eq!(diag.range.as_ref().unwrap().to_string(), "main.stk:10..18");
}

#[test]
fn placeholders_do_not_cascade_diagnostics() {
    // The scope reports the undeclared reference once; the operators that
    // consume the placeholder stay quiet.
    let scope = TableScope::new([]);
    let expr = Expr::unary(
        UnaryOp::Neg,
        Expr::binary(BinaryOp::Mul, Expr::var("missing"), Expr::lit(2.0)),
    );
    let (value, diags) = eval_expr(&expr, &scope);
    assert_eq!(value, Value::Dynamic);
    assert_eq!(diags.len(), 1);
}

#[test]
fn unknown_operands_yield_typed_unknowns() {
    let scope = TableScope::new([(var("count"), Value::unknown(Type::Number))]);
    let expr = Expr::binary(BinaryOp::Gt, Expr::var("count"), Expr::lit(3.0));
    let (value, diags) = eval_expr(&expr, &scope);
    assert!(diags.is_empty());
    assert_eq!(value, Value::unknown(Type::Bool));
}

#[test]
fn conditional_evaluates_only_the_selected_branch() {
    let scope = TableScope::new([(RefTarget::Applying, Value::from(false))]);
    let expr = Expr::conditional(
        Expr::traversal("deploy", &["applying"]),
        Expr::var("applied"),
        Expr::lit("planning"),
    );
    let (value, diags) = eval_expr(&expr, &scope);
    assert_eq!(value, Value::from("planning"));
    assert!(diags.is_empty());
    assert_eq!(*scope.resolved.borrow(), vec![RefTarget::Applying]);
}

#[test]
fn conditional_with_unknown_condition_unifies_branches() {
    let scope = TableScope::new([(var("flag"), Value::unknown(Type::Bool))]);
    let expr = Expr::conditional(Expr::var("flag"), Expr::lit("a"), Expr::lit("b"));
    let (value, _) = eval_expr(&expr, &scope);
    assert_eq!(value, Value::unknown(Type::String));
}

#[test]
fn conditional_errors() {
    let scope = TableScope::new([
        (var("nothing"), Value::null(Type::Bool)),
        (var("list"), Value::empty_object()),
    ]);

    let expr = Expr::conditional(Expr::var("nothing"), Expr::lit(1.0), Expr::lit(2.0));
    let (value, diags) = eval_expr(&expr, &scope);
    assert_eq!(value, Value::Dynamic);
    assert_eq!(diags.iter().next().unwrap().summary, "Null condition");

    let expr = Expr::conditional(Expr::var("list"), Expr::lit(1.0), Expr::lit(2.0));
    let (_, diags) = eval_expr(&expr, &scope);
    assert_eq!(
        diags.iter().next().unwrap().summary,
        "Incorrect condition type"
    );
}

#[test]
fn malformed_references_and_invalid_fragments() {
    let scope = TableScope::new([]);
    let expr = Expr::list(vec![
        Expr::traversal("each", &["index"]),
        Expr::invalid("${"),
        Expr::call("nope", vec![]),
    ]);
    let (value, diags) = eval_expr(&expr, &scope);
    assert_eq!(
        value,
        Value::tuple(vec![Value::Dynamic, Value::Dynamic, Value::Dynamic])
    );
    let codes: Vec<ErrorCode> = diags.iter().map(|d| d.code).collect();
    assert_eq!(codes, vec![ErrorCode::E1002, ErrorCode::E1001, ErrorCode::E1008]);
    assert!(scope.resolved.borrow().is_empty());
}

#[test]
fn template_and_function_calls() {
    let scope = TableScope::new([(var("env"), Value::from("prod"))]);
    let expr = Expr::template(vec![
        Expr::lit("app-"),
        Expr::call("upper", vec![Expr::var("env")]),
        Expr::lit("-"),
        Expr::lit(2.0),
    ]);
    let (value, diags) = eval_expr(&expr, &scope);
    assert!(diags.is_empty());
    assert_eq!(value, Value::from("app-PROD-2"));
}

#[test]
fn deeply_nested_expressions_do_not_overflow() {
    let scope = TableScope::new([]);
    let mut expr = Expr::lit(0.0);
    for _ in 0..5_000 {
        expr = Expr::binary(BinaryOp::Add, expr, Expr::lit(1.0));
    }
    let (value, diags) = eval_expr(&expr, &scope);
    assert!(diags.is_empty());
    assert_eq!(value, Value::from(5_000.0));
}
