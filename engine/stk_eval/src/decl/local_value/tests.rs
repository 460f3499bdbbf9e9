use super::*;
use crate::main::{ComponentProvider, Main, ProviderError};
use crate::stack::Stack;
use pretty_assertions::assert_eq;
use stk_ir::{BinaryOp, ComponentInstanceAddr, Expr, LocalAddr, StackConfig, StackInstance};

fn greeting_config() -> StackConfig {
    StackConfig::new("main.stk")
        .with_input("name", Type::String, None)
        .with_local(
            "greeting",
            Expr::binary(BinaryOp::Add, Expr::lit("hello "), Expr::var("name")),
        )
}

fn local(main: &Main, addr: &Address) -> Arc<LocalValue> {
    match main.declaration(addr).unwrap() {
        crate::decl::AnyDeclaration::LocalValue(local) => local,
        other => panic!("expected a local value, got {other:?}"),
    }
}

#[test]
fn evaluates_in_its_stack() {
    let main = Main::builder(greeting_config()).input("name", "world").build();
    let addr = Address::in_root(LocalAddr::local("greeting"));
    let task = main.new_task();
    let cx = EvalContext::new(&main, &task);

    let (value, diags) = local(&main, &addr).check_value(&cx, EvalPhase::Plan);
    assert_eq!(value, Value::from("hello world"));
    assert!(diags.is_empty());
    assert_eq!(local(&main, &addr).value(&cx, EvalPhase::Apply), Value::from("hello world"));
}

#[test]
fn upstream_errors_short_circuit_conversion() {
    let config = StackConfig::new("main.stk").with_local("broken", Expr::local("missing"));
    let main = Main::builder(config).build();
    let (value, diags) = main.check_value(&Address::in_root(LocalAddr::local("broken")), EvalPhase::Plan);
    assert_eq!(value, Value::Dynamic);
    let codes: Vec<_> = diags.iter().map(|d| d.code).collect();
    assert_eq!(codes, vec![ErrorCode::E1003]);
}

/// Returns a list whose items do not match its element type.
struct InconsistentProvider;

impl ComponentProvider for InconsistentProvider {
    fn plan(&self, _: &ComponentInstanceAddr, _: &Value) -> Result<Value, ProviderError> {
        Ok(Value::list_unchecked(Type::Number, vec![Value::from("nope")]))
    }

    fn apply(&self, addr: &ComponentInstanceAddr, inputs: &Value) -> Result<Value, ProviderError> {
        self.plan(addr, inputs)
    }
}

#[test]
fn conversion_failure_names_the_local() {
    let config = StackConfig::new("main.stk")
        .with_component("db", Expr::object([("size", Expr::lit(1.0))]))
        .with_local("ports", Expr::traversal("component", &["db"]));
    let main = Main::builder(config)
        .provider(Arc::new(InconsistentProvider))
        .build();

    let (value, diags) = main.check_value(&Address::in_root(LocalAddr::local("ports")), EvalPhase::Plan);
    assert_eq!(value, Value::Dynamic);
    assert_eq!(diags.len(), 1);
    let diag = diags.iter().next().unwrap();
    assert_eq!(diag.code, ErrorCode::E2001);
    assert_eq!(
        diag.to_string(),
        "error[E2001]: Invalid local value: Unsuitable value for local \"ports\": \
         [0]: element has type string, but the collection holds number."
    );
}

#[test]
fn absent_stack_gives_placeholder_without_diagnostics() {
    let child = StackConfig::new("child.stk").with_local("x", Expr::lit(1.0));
    let config = StackConfig::new("main.stk")
        .with_input("regions", Type::list(Type::String), None)
        .with_stack_call_for_each("app", Expr::var("regions"), child, Expr::object::<_, &str>([]));
    // `regions` is not known until apply, so no instance exists at plan.
    let main = Main::builder(config)
        .input("regions", Value::unknown(Type::list(Type::String)))
        .build();

    let stack = StackInstance::root().child("app", Some(stk_ir::InstanceKey::new("eu")));
    let addr = LocalAddr::local("x").absolute(&stack);
    let (value, diags) = main.check_value(&addr, EvalPhase::Plan);
    assert_eq!(value, Value::Dynamic);
    assert!(diags.is_empty());
}

#[test]
fn references_are_absolute() {
    let child = greeting_config();
    let config =
        StackConfig::new("main.stk").with_stack_call("app", child, Expr::object([("name", Expr::lit("x"))]));
    let main = Main::builder(config).build();

    let stack = StackInstance::root().child("app", None);
    let addr = LocalAddr::local("greeting").absolute(&stack);
    assert_eq!(
        local(&main, &addr).references(),
        vec![LocalAddr::var("name").absolute(&stack)]
    );

    let stack_value: Option<Arc<Stack>> = main.stack(&main.new_task(), &stack, EvalPhase::Plan);
    assert!(stack_value.is_some());
}
