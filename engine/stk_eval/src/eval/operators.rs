//! Operator semantics.

use stk_diagnostic::ErrorCode;
use stk_ir::{BinaryOp, UnaryOp};
use stk_value::{convert, Type, Value};

use super::EvalError;

fn invalid_operand(detail: impl Into<String>) -> EvalError {
    EvalError::new(ErrorCode::E1006, "Invalid operand", detail)
}

fn unsupported_attribute(detail: impl Into<String>) -> EvalError {
    EvalError::new(ErrorCode::E1007, "Unsupported attribute", detail)
}

fn invalid_index(detail: impl Into<String>) -> EvalError {
    EvalError::new(ErrorCode::E1007, "Invalid index", detail)
}

/// Convert an operand, naming the operator in the error.
fn operand(value: &Value, ty: &Type, op: &str) -> Result<Value, EvalError> {
    if value.is_null() {
        return Err(invalid_operand(format!(
            "Unsuitable value for operand of \"{op}\": a null value cannot be used."
        )));
    }
    convert(value, ty).map_err(|err| {
        invalid_operand(format!(
            "Unsuitable value for operand of \"{op}\": {err}."
        ))
    })
}

fn number_operand(value: &Value, op: &str) -> Result<Option<f64>, EvalError> {
    Ok(operand(value, &Type::Number, op)?.as_number())
}

fn bool_operand(value: &Value, op: &str) -> Result<Option<bool>, EvalError> {
    Ok(operand(value, &Type::Bool, op)?.as_bool())
}

pub(super) fn binary(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, EvalError> {
    if left.is_placeholder() || right.is_placeholder() {
        return Ok(Value::Dynamic);
    }
    match op {
        BinaryOp::Add => add(left, right),
        BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
            arithmetic(op, left, right)
        }
        BinaryOp::Eq | BinaryOp::NotEq => {
            if !left.is_wholly_known() || !right.is_wholly_known() {
                return Ok(Value::Unknown(Type::Bool));
            }
            let equal = values_equal(left, right);
            Ok(Value::Bool(if op == BinaryOp::Eq { equal } else { !equal }))
        }
        BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq => {
            let symbol = op.as_symbol();
            let (Some(l), Some(r)) = (number_operand(left, symbol)?, number_operand(right, symbol)?)
            else {
                return Ok(Value::Unknown(Type::Bool));
            };
            let result = match op {
                BinaryOp::Lt => l < r,
                BinaryOp::LtEq => l <= r,
                BinaryOp::Gt => l > r,
                _ => l >= r,
            };
            Ok(Value::Bool(result))
        }
        BinaryOp::And | BinaryOp::Or => {
            let symbol = op.as_symbol();
            let (Some(l), Some(r)) = (bool_operand(left, symbol)?, bool_operand(right, symbol)?) else {
                return Ok(Value::Unknown(Type::Bool));
            };
            Ok(Value::Bool(if op == BinaryOp::And { l && r } else { l || r }))
        }
    }
}

/// `+` adds numbers and concatenates when either side is a string.
fn add(left: &Value, right: &Value) -> Result<Value, EvalError> {
    let concat = left.ty() == Type::String || right.ty() == Type::String;
    if !concat {
        return arithmetic(BinaryOp::Add, left, right);
    }
    let l = operand(left, &Type::String, "+")?;
    let r = operand(right, &Type::String, "+")?;
    match (l.as_str(), r.as_str()) {
        (Some(l), Some(r)) => Ok(Value::string(format!("{l}{r}"))),
        _ => Ok(Value::Unknown(Type::String)),
    }
}

fn arithmetic(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, EvalError> {
    let symbol = op.as_symbol();
    let (Some(l), Some(r)) = (number_operand(left, symbol)?, number_operand(right, symbol)?) else {
        return Ok(Value::Unknown(Type::Number));
    };
    let result = match op {
        BinaryOp::Add => l + r,
        BinaryOp::Sub => l - r,
        BinaryOp::Mul => l * r,
        BinaryOp::Div | BinaryOp::Mod if r == 0.0 => {
            return Err(EvalError::new(
                ErrorCode::E1006,
                "Division by zero",
                format!("The right operand of \"{symbol}\" is zero."),
            ));
        }
        BinaryOp::Div => l / r,
        _ => l % r,
    };
    Ok(Value::Number(result))
}

/// Structural equality; lists and tuples compare by items, maps and
/// objects by entries, regardless of the declared element type.
fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Null(_), Value::Null(_)) => true,
        (
            Value::List { items: a, .. } | Value::Tuple(a),
            Value::List { items: b, .. } | Value::Tuple(b),
        ) => a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| values_equal(x, y)),
        (
            Value::Map { entries: a, .. } | Value::Object(a),
            Value::Map { entries: b, .. } | Value::Object(b),
        ) => {
            a.len() == b.len()
                && a.iter()
                    .zip(b.iter())
                    .all(|((ka, va), (kb, vb))| ka == kb && values_equal(va, vb))
        }
        _ => left == right,
    }
}

pub(super) fn unary(op: UnaryOp, value: &Value) -> Result<Value, EvalError> {
    if value.is_placeholder() {
        return Ok(Value::Dynamic);
    }
    match op {
        UnaryOp::Not => Ok(bool_operand(value, "!")?
            .map_or(Value::Unknown(Type::Bool), |b| Value::Bool(!b))),
        UnaryOp::Neg => Ok(number_operand(value, "-")?
            .map_or(Value::Unknown(Type::Number), |n| Value::Number(-n))),
    }
}

/// Render template parts as strings and concatenate them.
pub(super) fn template(parts: &[Value]) -> Result<Value, EvalError> {
    let mut out = String::new();
    let mut known = true;
    for part in parts {
        if part.is_placeholder() {
            return Ok(Value::Dynamic);
        }
        if part.is_null() {
            return Err(EvalError::new(
                ErrorCode::E1006,
                "Invalid template interpolation value",
                "The expression result is null. Cannot include a null value in a string template.",
            ));
        }
        let rendered = convert(part, &Type::String).map_err(|err| {
            EvalError::new(
                ErrorCode::E1006,
                "Invalid template interpolation value",
                format!("Cannot include the given value in a string template: {err}."),
            )
        })?;
        match rendered.as_str() {
            Some(s) => out.push_str(s),
            None => known = false,
        }
    }
    if known {
        Ok(Value::string(out))
    } else {
        Ok(Value::Unknown(Type::String))
    }
}

pub(super) fn get_attr(base: &Value, name: &str) -> Result<Value, EvalError> {
    match base {
        Value::Dynamic => Ok(Value::Dynamic),
        Value::Unknown(ty) => Ok(Value::Unknown(attr_type(ty, name))),
        Value::Null(_) => Err(unsupported_attribute(format!(
            "Attempt to get attribute \"{name}\" from a null value."
        ))),
        Value::Object(_) | Value::Map { .. } => base.get_attr(name).cloned().ok_or_else(|| {
            unsupported_attribute(format!(
                "This object does not have an attribute named \"{name}\"."
            ))
        }),
        other => Err(unsupported_attribute(format!(
            "Can't access attributes on a value of type {}.",
            other.ty()
        ))),
    }
}

fn attr_type(ty: &Type, name: &str) -> Type {
    match ty {
        Type::Object(attrs) => attrs.get(name).cloned().unwrap_or_default(),
        Type::Map(elem) => (**elem).clone(),
        _ => Type::Dynamic,
    }
}

pub(super) fn index(base: &Value, key: &Value) -> Result<Value, EvalError> {
    if base.is_placeholder() || key.is_placeholder() {
        return Ok(Value::Dynamic);
    }
    if key.is_null() {
        return Err(invalid_index("Can't use a null value as an indexing key."));
    }
    match base {
        Value::Unknown(_) => Ok(Value::Unknown(Type::Dynamic)),
        Value::Null(_) => Err(invalid_index("Can't index a null value.")),
        Value::List { items, .. } | Value::Tuple(items) => {
            let Some(n) = convert(key, &Type::Number)
                .map_err(|err| invalid_index(format!("The index must be a number: {err}.")))?
                .as_number()
            else {
                return Ok(Value::Unknown(Type::Dynamic));
            };
            if n < 0.0 || n.fract() != 0.0 {
                return Err(invalid_index(format!(
                    "The index must be a non-negative whole number, not {n}."
                )));
            }
            #[allow(
                clippy::cast_possible_truncation,
                clippy::cast_sign_loss,
                reason = "checked non-negative and integral above"
            )]
            let i = n as usize;
            items.get(i).cloned().ok_or_else(|| {
                invalid_index(format!(
                    "The given index is greater than or equal to the length of the collection ({}).",
                    items.len()
                ))
            })
        }
        Value::Map { entries, .. } | Value::Object(entries) => {
            let Some(k) = convert(key, &Type::String)
                .map_err(|err| invalid_index(format!("The key must be a string: {err}.")))?
                .as_str()
                .map(str::to_owned)
            else {
                return Ok(Value::Unknown(Type::Dynamic));
            };
            entries.get(&k).cloned().ok_or_else(|| {
                invalid_index(format!("The given key {k:?} does not identify an element in this collection."))
            })
        }
        other => Err(invalid_index(format!(
            "This value does not have any indices: a value of type {} can't be indexed.",
            other.ty()
        ))),
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

    #[test]
    fn plus_adds_numbers_and_concatenates_strings() {
        assert_eq!(
            binary(BinaryOp::Add, &Value::from(1.0), &Value::from(2.0)),
            Ok(Value::from(3.0))
        );
        assert_eq!(
            binary(BinaryOp::Add, &Value::from("hello "), &Value::from("world")),
            Ok(Value::from("hello world"))
        );
        assert_eq!(
            binary(BinaryOp::Add, &Value::from("port "), &Value::from(8080.0)),
            Ok(Value::from("port 8080"))
        );
    }

    #[test]
    fn unknowns_and_placeholders_propagate() {
        assert_eq!(
            binary(BinaryOp::Add, &Value::unknown(Type::String), &Value::from("x")),
            Ok(Value::unknown(Type::String))
        );
        assert_eq!(
            binary(BinaryOp::Mul, &Value::unknown(Type::Dynamic), &Value::from(2.0)),
            Ok(Value::unknown(Type::Number))
        );
        assert_eq!(
            binary(BinaryOp::Eq, &Value::Dynamic, &Value::from(2.0)),
            Ok(Value::Dynamic)
        );
        assert_eq!(unary(UnaryOp::Not, &Value::unknown(Type::Bool)), Ok(Value::unknown(Type::Bool)));
    }

    #[test]
    fn arithmetic_errors() {
        let err = binary(BinaryOp::Div, &Value::from(1.0), &Value::from(0.0)).unwrap_err();
        assert_eq!(err.summary, "Division by zero");

        let err = binary(BinaryOp::Sub, &Value::from(true), &Value::from(1.0)).unwrap_err();
        assert_eq!(err.code, ErrorCode::E1006);
        assert_eq!(
            err.detail,
            "Unsuitable value for operand of \"-\": number required."
        );
    }

    #[test]
    fn equality_is_structural() {
        let list = Value::list_unchecked(Type::Number, vec![Value::from(1.0)]);
        let tuple = Value::tuple(vec![Value::from(1.0)]);
        assert_eq!(binary(BinaryOp::Eq, &list, &tuple), Ok(Value::from(true)));
        assert_eq!(
            binary(BinaryOp::NotEq, &Value::from("1"), &Value::from(1.0)),
            Ok(Value::from(true))
        );
    }

    #[test]
    fn attribute_and_index_access() {
        let obj = Value::object([("a", Value::tuple(vec![Value::from("x"), Value::from("y")]))]);
        let a = get_attr(&obj, "a").unwrap();
        assert_eq!(index(&a, &Value::from(1.0)), Ok(Value::from("y")));
        assert_eq!(index(&obj, &Value::from("a")), Ok(a.clone()));
        assert!(index(&a, &Value::from(2.0)).is_err());
        assert!(index(&a, &Value::from(0.5)).is_err());

        let err = get_attr(&obj, "b").unwrap_err();
        assert_eq!(err.summary, "Unsupported attribute");

        let unknown = Value::unknown(Type::object([("a", Type::String)]));
        assert_eq!(get_attr(&unknown, "a"), Ok(Value::unknown(Type::String)));
    }

    #[test]
    fn template_renders_parts() {
        assert_eq!(
            template(&[Value::from("n="), Value::from(3.0), Value::from(true)]),
            Ok(Value::from("n=3true"))
        );
        assert_eq!(
            template(&[Value::from("x"), Value::unknown(Type::Number)]),
            Ok(Value::unknown(Type::String))
        );
        assert!(template(&[Value::null(Type::String)]).is_err());
        assert!(template(&[Value::empty_object()]).is_err());
    }
}
