use super::*;
use crate::addr::InstanceKey;
use crate::expr::BinaryOp;
use pretty_assertions::assert_eq;

fn targets(expr: &Expr) -> Vec<RefTarget> {
    let (refs, errors) = collect_references(expr);
    assert!(errors.is_empty(), "unexpected errors: {errors:?}");
    refs.into_iter().map(|r| r.target).collect()
}

#[test]
fn finds_references_in_nested_expressions() {
    let expr = Expr::template(vec![
        Expr::local("greeting"),
        Expr::lit(" "),
        Expr::conditional(
            Expr::traversal("deploy", &["applying"]),
            Expr::traversal("component", &["db", "endpoint"]),
            Expr::var("fallback"),
        ),
    ]);
    assert_eq!(
        targets(&expr),
        vec![
            RefTarget::Item(LocalAddr::local("greeting")),
            RefTarget::Applying,
            RefTarget::Item(LocalAddr::component("db")),
            RefTarget::Item(LocalAddr::var("fallback")),
        ]
    );
}

#[test]
fn parse_ref_returns_remaining_steps() {
    let steps = vec![
        TraverseStep::Attr("db".to_owned()),
        TraverseStep::Attr("endpoint".to_owned()),
    ];
    let (target, rest) = parse_ref("component", &steps, Span::DUMMY).unwrap();
    assert_eq!(target, RefTarget::Item(LocalAddr::component("db")));
    assert_eq!(rest, &[TraverseStep::Attr("endpoint".to_owned())]);
}

#[test]
fn unknown_roots_and_bare_symbols_are_errors() {
    let (_, errors) = collect_references(&Expr::traversal("resource", &["x"]));
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, RefErrorKind::UnknownSymbol);
    assert_eq!(
        errors[0].to_string(),
        "Reference to unknown symbol: There is no symbol named \"resource\"."
    );

    let (_, errors) = collect_references(&Expr::traversal("local", &[]));
    assert_eq!(errors[0].kind, RefErrorKind::Malformed);

    let (_, errors) = collect_references(&Expr::traversal("each", &["index"]));
    assert!(errors[0].detail.contains("each.key or each.value"));
}

#[test]
fn absolute_references_skip_special_symbols_and_dedupe() {
    let expr = Expr::binary(
        BinaryOp::Add,
        Expr::binary(BinaryOp::Add, Expr::local("b"), Expr::local("a")),
        Expr::binary(
            BinaryOp::Add,
            Expr::local("a"),
            Expr::traversal("each", &["key"]),
        ),
    );
    let (refs, _) = collect_references(&expr);
    let stack = StackInstance::root().child("app", Some(InstanceKey::new("eu")));
    let addrs = make_references_absolute(&refs, &stack);
    assert_eq!(
        addrs,
        vec![
            LocalAddr::local("a").absolute(&stack),
            LocalAddr::local("b").absolute(&stack),
        ]
    );
}
