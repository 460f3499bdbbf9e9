//! `for_each` expansion shared by components and embedded stacks.

use std::collections::BTreeMap;
use std::sync::Arc;

use stk_diagnostic::{Diagnostic, Diagnostics, ErrorCode};
use stk_ir::{Expr, InstanceKey, SourceRange};
use stk_promise::EvalPhase;
use stk_value::Value;

use crate::context::EvalContext;
use crate::stack::{EachBinding, Stack};

/// The instances a repeatable block expands to in one phase.
#[derive(Clone, PartialEq, Debug)]
pub enum Instances {
    /// No `for_each`: exactly one instance, without a key.
    Single,
    /// One instance per key, with the value `each.value` is bound to.
    Keyed(Arc<BTreeMap<InstanceKey, Value>>),
    /// The `for_each` value is not known yet, or could not be evaluated.
    Unknown,
}

impl Instances {
    /// Keys of every instance; empty when unknown.
    pub fn keys(&self) -> Vec<Option<InstanceKey>> {
        match self {
            Instances::Single => vec![None],
            Instances::Keyed(map) => map.keys().cloned().map(Some).collect(),
            Instances::Unknown => Vec::new(),
        }
    }

    pub fn contains(&self, key: Option<&InstanceKey>) -> bool {
        match (self, key) {
            (Instances::Single, None) => true,
            (Instances::Keyed(map), Some(key)) => map.contains_key(key),
            _ => false,
        }
    }

    /// The `each` binding for the instance with `key`.
    ///
    /// `None` for a single instance or a key that does not exist.
    pub fn binding(&self, key: Option<&InstanceKey>) -> Option<EachBinding> {
        let (Instances::Keyed(map), Some(key)) = (self, key) else {
            return None;
        };
        map.get(key).map(|value| EachBinding {
            key: key.clone(),
            value: value.clone(),
        })
    }
}

fn invalid_for_each(detail: impl Into<String>, range: &SourceRange) -> Diagnostic {
    Diagnostic::error(ErrorCode::E1005)
        .with_summary("Invalid for_each argument")
        .with_detail(detail)
        .with_range(range.clone())
}

/// Evaluate a `for_each` expression in `stack`.
///
/// Maps and objects give one instance per key; sets (lists or tuples of
/// strings) one instance per distinct element, bound to itself. A value
/// that is not yet known defers the expansion, except during apply, when
/// every instance must be known.
pub(crate) fn eval_for_each(
    cx: &EvalContext<'_>,
    stack: &Stack,
    phase: EvalPhase,
    expr: &Expr,
    range: &SourceRange,
) -> (Instances, Diagnostics) {
    let (value, mut diags) = stack.eval(cx, phase, expr, None);
    if diags.has_errors() || value.is_placeholder() {
        return (Instances::Unknown, diags);
    }
    match expand(&value) {
        Ok(Some(map)) => (Instances::Keyed(Arc::new(map)), diags),
        Ok(None) if phase == EvalPhase::Apply => {
            diags.push(invalid_for_each(
                "The for_each value is not known during apply. Every instance must be known before it can be applied.",
                range,
            ));
            (Instances::Unknown, diags)
        }
        Ok(None) => (Instances::Unknown, diags),
        Err(detail) => {
            diags.push(invalid_for_each(detail, range));
            (Instances::Unknown, diags)
        }
    }
}

/// `Ok(None)` when the keys are not known.
fn expand(value: &Value) -> Result<Option<BTreeMap<InstanceKey, Value>>, String> {
    match value {
        Value::Unknown(_) | Value::Dynamic => Ok(None),
        Value::Null(_) => Err(
            "The given for_each argument value is null. A map, or set of strings is allowed."
                .to_owned(),
        ),
        Value::Map { entries, .. } | Value::Object(entries) => Ok(Some(
            entries
                .iter()
                .map(|(k, v)| (InstanceKey::new(k.as_str()), v.clone()))
                .collect(),
        )),
        Value::List { items, .. } | Value::Tuple(items) => {
            let mut map = BTreeMap::new();
            for item in items.iter() {
                match item {
                    Value::String(s) => {
                        map.insert(InstanceKey::new(&**s), item.clone());
                    }
                    Value::Unknown(_) | Value::Dynamic => return Ok(None),
                    Value::Null(_) => {
                        return Err(
                            "for_each sets must not contain null values.".to_owned()
                        );
                    }
                    other => {
                        return Err(format!(
                            "for_each supports maps and sets of strings, but the set contains an element of type {}.",
                            other.ty()
                        ));
                    }
                }
            }
            Ok(Some(map))
        }
        other => Err(format!(
            "The for_each argument must be a map, or set of strings, and you have provided a value of type {}.",
            other.ty()
        )),
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use stk_value::Type;

    #[test]
    fn sets_and_maps_expand_to_keys() {
        let set = Value::tuple(vec![Value::from("b"), Value::from("a"), Value::from("b")]);
        let keys: Vec<_> = expand(&set).unwrap().unwrap().into_keys().collect();
        assert_eq!(keys, vec![InstanceKey::new("a"), InstanceKey::new("b")]);

        let map = Value::object([("eu", Value::from(1.0))]);
        let expanded = expand(&map).unwrap().unwrap();
        assert_eq!(expanded.get(&InstanceKey::new("eu")), Some(&Value::from(1.0)));
    }

    #[test]
    fn unknown_values_defer_expansion() {
        assert_eq!(expand(&Value::unknown(Type::map(Type::String))), Ok(None));
        let partly = Value::tuple(vec![Value::from("a"), Value::unknown(Type::String)]);
        assert_eq!(expand(&partly), Ok(None));
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(expand(&Value::null(Type::Dynamic)).is_err());
        assert!(expand(&Value::from("a")).is_err());
        assert!(expand(&Value::tuple(vec![Value::from(1.0)]))
            .unwrap_err()
            .contains("type number"));
    }

    #[test]
    fn instance_membership_and_bindings() {
        let keyed = Instances::Keyed(Arc::new(BTreeMap::from([(
            InstanceKey::new("a"),
            Value::from(1.0),
        )])));
        assert!(keyed.contains(Some(&InstanceKey::new("a"))));
        assert!(!keyed.contains(None));
        assert!(Instances::Single.contains(None));
        assert!(!Instances::Unknown.contains(None));
        assert_eq!(
            keyed.binding(Some(&InstanceKey::new("a"))),
            Some(EachBinding {
                key: InstanceKey::new("a"),
                value: Value::from(1.0),
            })
        );
        assert_eq!(Instances::Unknown.keys(), Vec::<Option<InstanceKey>>::new());
    }
}
