//! End-to-end evaluation of small stack configurations.
//!
//! Every test builds a `Main` from an in-memory configuration and asks for
//! values by address, the way a host would.

#![allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use stk_diagnostic::{Diagnostics, ErrorCode};
use stk_eval::{
    plan, required_components, validate, ComponentProvider, Main, ProviderError, WalkConfig,
};
use stk_ir::{
    Address, BinaryOp, ComponentInstanceAddr, Expr, InstanceKey, LocalAddr, StackConfig,
    StackInstance,
};
use stk_promise::{CancellationToken, EvalPhase};
use stk_value::{Type, Value};

fn codes(diags: &Diagnostics) -> Vec<ErrorCode> {
    diags.iter().map(|d| d.code).collect()
}

fn root(item: LocalAddr) -> Address {
    Address::in_root(item)
}

/// Echoes inputs back, counting calls per phase.
#[derive(Default)]
struct CountingProvider {
    plans: AtomicUsize,
    applies: AtomicUsize,
}

impl ComponentProvider for CountingProvider {
    fn plan(&self, _: &ComponentInstanceAddr, inputs: &Value) -> Result<Value, ProviderError> {
        self.plans.fetch_add(1, Ordering::SeqCst);
        // Long enough for concurrent callers to pile up on the same cell.
        std::thread::sleep(Duration::from_millis(20));
        Ok(inputs.clone())
    }

    fn apply(&self, _: &ComponentInstanceAddr, inputs: &Value) -> Result<Value, ProviderError> {
        self.applies.fetch_add(1, Ordering::SeqCst);
        Ok(inputs.clone())
    }
}

// =============================================================================
// Values
// =============================================================================

fn greeting_config() -> StackConfig {
    StackConfig::new("main.stk")
        .with_input("name", Type::String, None)
        .with_local(
            "greeting",
            Expr::binary(BinaryOp::Add, Expr::lit("hello, "), Expr::var("name")),
        )
        .with_output("greeting", Type::String, Expr::local("greeting"))
}

#[test]
fn greeting_follows_the_phase_inputs() {
    let main = Main::builder(greeting_config())
        .input("name", "plan")
        .apply_input("name", "apply")
        .build();
    let output = root(LocalAddr::output("greeting"));

    let (value, diags) = main.check_value(&output, EvalPhase::Plan);
    assert!(diags.is_empty(), "{diags:?}");
    assert_eq!(value, Value::from("hello, plan"));

    let (value, diags) = main.check_value(&output, EvalPhase::Apply);
    assert!(diags.is_empty(), "{diags:?}");
    assert_eq!(value, Value::from("hello, apply"));

    let (value, diags) = main.check_value(&output, EvalPhase::Validate);
    assert!(diags.is_empty(), "{diags:?}");
    assert!(!value.is_known());
}

#[test]
fn missing_required_variable() {
    let main = Main::builder(greeting_config()).build();
    let (value, diags) = main.check_value(&root(LocalAddr::var("name")), EvalPhase::Plan);
    assert_eq!(value, Value::Dynamic);
    assert_eq!(codes(&diags), vec![ErrorCode::E1004]);
}

#[test]
fn defaults_fill_missing_and_null_inputs() {
    let config = StackConfig::new("main.stk")
        .with_input("size", Type::Number, Some(Value::from(3.0)))
        .with_input("zone", Type::String, Some(Value::from("a")));
    let main = Main::builder(config)
        .input("zone", Value::null(Type::String))
        .build();

    let (size, diags) = main.check_value(&root(LocalAddr::var("size")), EvalPhase::Plan);
    assert!(diags.is_empty());
    assert_eq!(size, Value::from(3.0));
    let (zone, diags) = main.check_value(&root(LocalAddr::var("zone")), EvalPhase::Plan);
    assert!(diags.is_empty());
    assert_eq!(zone, Value::from("a"));
}

#[test]
fn unsuitable_values_are_reported_by_kind() {
    let config = StackConfig::new("main.stk")
        .with_input("count", Type::Number, None)
        .with_output("count", Type::Number, Expr::lit("many"));
    let main = Main::builder(config).input("count", "lots").build();

    let (value, diags) = main.check_value(&root(LocalAddr::var("count")), EvalPhase::Plan);
    assert_eq!(value, Value::Dynamic);
    assert_eq!(codes(&diags), vec![ErrorCode::E2002]);

    let (value, diags) = main.check_value(&root(LocalAddr::output("count")), EvalPhase::Plan);
    assert_eq!(value, Value::Dynamic);
    assert_eq!(codes(&diags), vec![ErrorCode::E2003]);
}

// =============================================================================
// Memoization and phases
// =============================================================================

fn db_config() -> StackConfig {
    StackConfig::new("main.stk")
        .with_component(
            "db",
            Expr::object([
                ("size", Expr::lit(2.0)),
                ("applying", Expr::traversal("deploy", &["applying"])),
            ]),
        )
        .with_local("size", Expr::traversal("component", &["db", "size"]))
        .with_output("applying", Type::Bool, Expr::traversal("component", &["db", "applying"]))
}

#[test]
fn concurrent_requests_share_one_evaluation() {
    let provider = Arc::new(CountingProvider::default());
    let main = Main::builder(db_config()).provider(provider.clone()).build();
    let size = root(LocalAddr::local("size"));

    let results: Vec<(Value, Diagnostics)> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|_| s.spawn(|| main.check_value(&size, EvalPhase::Plan)))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    for (value, diags) in &results {
        assert!(diags.is_empty(), "{diags:?}");
        assert_eq!(value, &Value::from(2.0));
    }
    assert_eq!(provider.plans.load(Ordering::SeqCst), 1);
    assert_eq!(provider.applies.load(Ordering::SeqCst), 0);
}

#[test]
fn phases_are_evaluated_independently() {
    let provider = Arc::new(CountingProvider::default());
    let main = Main::builder(db_config()).provider(provider.clone()).build();
    let applying = root(LocalAddr::output("applying"));

    assert_eq!(main.check_value(&applying, EvalPhase::Plan).0, Value::from(false));
    assert_eq!(main.check_value(&applying, EvalPhase::Apply).0, Value::from(true));
    assert_eq!(main.check_value(&applying, EvalPhase::Plan).0, Value::from(false));
    // Validation never reaches the provider.
    assert!(!main.check_value(&applying, EvalPhase::Validate).0.is_known());

    assert_eq!(provider.plans.load(Ordering::SeqCst), 1);
    assert_eq!(provider.applies.load(Ordering::SeqCst), 1);
}

// =============================================================================
// Cycles
// =============================================================================

fn cyclic_config() -> StackConfig {
    StackConfig::new("main.stk")
        .with_local("a", Expr::local("b"))
        .with_local("b", Expr::local("a"))
        .with_local("c", Expr::local("a"))
}

#[test]
fn cycles_terminate_with_a_diagnostic() {
    let main = Main::builder(cyclic_config()).build();
    for name in ["a", "b", "c"] {
        let (value, diags) = main.check_value(&root(LocalAddr::local(name)), EvalPhase::Plan);
        assert_eq!(value, Value::Dynamic);
        assert_eq!(codes(&diags), vec![ErrorCode::E3001], "local.{name}");
        assert_eq!(
            diags.iter().next().unwrap().detail,
            "reference cycle detected involving local.a -> local.b -> local.a."
        );
    }
}

#[test]
fn cycles_entered_from_both_ends_concurrently_terminate() {
    for _ in 0..20 {
        let main = Main::builder(cyclic_config()).build();
        let a = root(LocalAddr::local("a"));
        let b = root(LocalAddr::local("b"));
        let (from_a, from_b) = std::thread::scope(|s| {
            let ha = s.spawn(|| main.check_value(&a, EvalPhase::Plan));
            let hb = s.spawn(|| main.check_value(&b, EvalPhase::Plan));
            (ha.join().unwrap(), hb.join().unwrap())
        });
        assert_eq!(codes(&from_a.1), vec![ErrorCode::E3001]);
        assert_eq!(codes(&from_b.1), vec![ErrorCode::E3001]);
    }
}

// =============================================================================
// Embedded stacks
// =============================================================================

fn regional_config() -> StackConfig {
    let child = StackConfig::new("app.stk")
        .with_input("region", Type::String, None)
        .with_input("replicas", Type::Number, Some(Value::from(1.0)))
        .with_component("server", Expr::object([("region", Expr::var("region"))]))
        .with_output("endpoint", Type::String, Expr::traversal("component", &["server", "region"]));
    StackConfig::new("main.stk")
        .with_input("regions", Type::map(Type::Number), None)
        .with_stack_call_for_each(
            "app",
            Expr::var("regions"),
            child,
            Expr::object([
                ("region", Expr::traversal("each", &["key"])),
                ("replicas", Expr::traversal("each", &["value"])),
            ]),
        )
}

#[test]
fn unknown_instances_defer_embedded_stacks() {
    let main = Main::builder(regional_config())
        .input("regions", Value::unknown(Type::map(Type::Number)))
        .build();
    let (value, diags) = main.check_value(&root(LocalAddr::stack_call("app")), EvalPhase::Plan);
    assert!(diags.is_empty(), "{diags:?}");
    assert_eq!(value, Value::unknown(Type::Dynamic));

    // Declarations of a stack that may not exist are unknown, not errors.
    let eu = StackInstance::root().child("app", Some(InstanceKey::new("eu")));
    let (value, diags) = main.check_value(&LocalAddr::var("replicas").absolute(&eu), EvalPhase::Plan);
    assert!(diags.is_empty(), "{diags:?}");
    assert_eq!(value, Value::unknown(Type::Number));
}

#[test]
fn unknown_instances_are_an_error_at_apply() {
    let main = Main::builder(regional_config())
        .input("regions", Value::unknown(Type::map(Type::Number)))
        .build();
    let (_, diags) = main.check_value(&root(LocalAddr::stack_call("app")), EvalPhase::Apply);
    assert_eq!(codes(&diags), vec![ErrorCode::E1005]);
}

#[test]
fn unexpected_stack_inputs_are_rejected() {
    let child = StackConfig::new("app.stk").with_input("region", Type::String, None);
    let config = StackConfig::new("main.stk").with_stack_call(
        "app",
        child,
        Expr::object([("region", Expr::lit("eu")), ("zone", Expr::lit("a"))]),
    );
    let main = Main::builder(config).build();
    let (_, diags) = main.check_value(&root(LocalAddr::stack_call("app")), EvalPhase::Plan);
    assert_eq!(codes(&diags), vec![ErrorCode::E1003]);
    assert_eq!(diags.iter().next().unwrap().summary, "Unsupported argument");
}

#[test]
fn plan_walk_covers_every_instance() {
    let provider = Arc::new(CountingProvider::default());
    let main = Main::builder(regional_config())
        .input(
            "regions",
            Value::object([("eu", Value::from(2.0)), ("us", Value::from(3.0))]),
        )
        .provider(provider.clone())
        .build();

    let (changes, diags) = plan(&main, &WalkConfig::default());
    assert!(diags.is_empty(), "{diags:?}");
    // One component instance per embedded stack; embedded outputs are not changes.
    assert_eq!(changes.len(), 2);
    assert_eq!(provider.plans.load(Ordering::SeqCst), 2);

    let (value, _) = main.check_value(&root(LocalAddr::stack_call("app")), EvalPhase::Plan);
    assert_eq!(
        value,
        Value::object([
            ("eu", Value::object([("endpoint", Value::from("eu"))])),
            ("us", Value::object([("endpoint", Value::from("us"))])),
        ])
    );
    // Already planned by the walk.
    assert_eq!(provider.plans.load(Ordering::SeqCst), 2);
}

// =============================================================================
// Cancellation and providers
// =============================================================================

#[test]
fn cancelled_runs_report_cancellation() {
    let token = CancellationToken::new();
    token.cancel();
    let main = Main::builder(greeting_config())
        .input("name", "world")
        .cancellation(token)
        .build();
    let (value, diags) = main.check_value(&root(LocalAddr::local("greeting")), EvalPhase::Plan);
    assert_eq!(value, Value::Dynamic);
    assert!(diags.iter().all(|d| d.code == ErrorCode::E4001), "{diags:?}");
    assert!(!diags.is_empty());

    // A new run over the same configuration is unaffected.
    let main = Main::builder(greeting_config()).input("name", "world").build();
    let (value, diags) = main.check_value(&root(LocalAddr::local("greeting")), EvalPhase::Plan);
    assert!(diags.is_empty());
    assert_eq!(value, Value::from("hello, world"));
}

/// Rejects every call, counting them.
#[derive(Default)]
struct FailingProvider {
    calls: AtomicUsize,
}

impl ComponentProvider for FailingProvider {
    fn plan(&self, _: &ComponentInstanceAddr, _: &Value) -> Result<Value, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(20));
        Err(ProviderError::new("credentials expired"))
    }

    fn apply(&self, addr: &ComponentInstanceAddr, inputs: &Value) -> Result<Value, ProviderError> {
        self.plan(addr, inputs)
    }
}

#[test]
fn provider_failures_surface_at_the_referrer() {
    let main = Main::builder(db_config())
        .provider(Arc::new(FailingProvider::default()))
        .build();
    let (value, diags) = main.check_value(&root(LocalAddr::local("size")), EvalPhase::Plan);
    assert_eq!(value, Value::Dynamic);
    assert_eq!(codes(&diags), vec![ErrorCode::E5001]);
    assert!(diags.iter().next().unwrap().detail.contains("credentials expired"));

    // Validation does not call providers, so it cannot fail this way.
    assert!(validate(&main, &WalkConfig::sequential()).is_empty());
}

#[test]
fn concurrent_requests_share_one_failure() {
    let provider = Arc::new(FailingProvider::default());
    let main = Main::builder(db_config()).provider(provider.clone()).build();
    let size = root(LocalAddr::local("size"));

    let results: Vec<(Value, Diagnostics)> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|_| s.spawn(|| main.check_value(&size, EvalPhase::Plan)))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let (_, first) = &results[0];
    assert_eq!(codes(first), vec![ErrorCode::E5001]);
    for (value, diags) in &results {
        assert_eq!(value, &Value::Dynamic);
        assert_eq!(diags, first);
    }
    assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
}

// =============================================================================
// Dependencies
// =============================================================================

#[test]
fn required_components_follow_references() {
    let config = StackConfig::new("main.stk")
        .with_component("db", Expr::object::<_, &str>([]))
        .with_component("cache", Expr::object([("db", Expr::traversal("component", &["db"]))]))
        .with_component("unused", Expr::object::<_, &str>([]))
        .with_local("cache", Expr::traversal("component", &["cache"]))
        .with_local(
            "both",
            Expr::list(vec![Expr::local("cache"), Expr::traversal("component", &["db", "id"])]),
        )
        .with_output("both", Type::Dynamic, Expr::local("both"))
        .with_local("loop_a", Expr::list(vec![Expr::local("loop_b"), Expr::local("cache")]))
        .with_local("loop_b", Expr::local("loop_a"));
    let main = Main::builder(config).build();

    let component = |name: &str| root(LocalAddr::component(name));
    assert_eq!(
        required_components(&main, &root(LocalAddr::output("both"))),
        BTreeSet::from([component("cache"), component("db")])
    );
    // Stops at the cache component rather than following it to db.
    assert_eq!(
        required_components(&main, &root(LocalAddr::local("loop_a"))),
        BTreeSet::from([component("cache")])
    );
    assert!(required_components(&main, &component("unused")).is_empty());
}
