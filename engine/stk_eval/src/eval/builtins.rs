//! Built-in functions callable from expressions.

use stk_diagnostic::ErrorCode;
use stk_value::{convert, Type, Value};

use super::EvalError;

type Builtin = fn(&[Value]) -> Result<Value, EvalError>;

/// Name, arity (`None` for variadic), implementation.
const BUILTINS: &[(&str, Option<usize>, Builtin)] = &[
    ("upper", Some(1), upper),
    ("lower", Some(1), lower),
    ("length", Some(1), length),
    ("join", Some(2), join),
    ("concat", None, concat),
    ("tostring", Some(1), tostring),
    ("tonumber", Some(1), tonumber),
    ("coalesce", None, coalesce),
];

fn invalid_arguments(detail: impl Into<String>) -> EvalError {
    EvalError::new(ErrorCode::E1006, "Invalid function arguments", detail)
}

/// Call the built-in `name`.
///
/// A placeholder argument makes the result a placeholder; how other
/// unknown arguments propagate is up to each function.
pub(super) fn call(name: &str, args: &[Value]) -> Result<Value, EvalError> {
    let Some((_, arity, func)) = BUILTINS.iter().find(|(n, _, _)| *n == name) else {
        return Err(EvalError::new(
            ErrorCode::E1008,
            "Call to unknown function",
            format!("There is no function named \"{name}\"."),
        ));
    };
    if let Some(arity) = arity {
        if args.len() != *arity {
            return Err(invalid_arguments(format!(
                "Function \"{name}\" expects {arity} argument(s), got {}.",
                args.len()
            )));
        }
    }
    if args.iter().any(Value::is_placeholder) {
        return Ok(Value::Dynamic);
    }
    func(args)
}

fn string_arg(value: &Value, func: &str) -> Result<Option<String>, EvalError> {
    if value.is_null() {
        return Err(invalid_arguments(format!(
            "Function \"{func}\" does not accept a null argument."
        )));
    }
    let converted = convert(value, &Type::String)
        .map_err(|err| invalid_arguments(format!("Invalid argument to \"{func}\": {err}.")))?;
    Ok(converted.as_str().map(str::to_owned))
}

fn upper(args: &[Value]) -> Result<Value, EvalError> {
    Ok(string_arg(&args[0], "upper")?
        .map_or(Value::Unknown(Type::String), |s| Value::string(s.to_uppercase())))
}

fn lower(args: &[Value]) -> Result<Value, EvalError> {
    Ok(string_arg(&args[0], "lower")?
        .map_or(Value::Unknown(Type::String), |s| Value::string(s.to_lowercase())))
}

#[allow(clippy::cast_precision_loss, reason = "collection lengths fit in f64")]
fn length(args: &[Value]) -> Result<Value, EvalError> {
    let value = &args[0];
    if !value.is_known() {
        return Ok(Value::Unknown(Type::Number));
    }
    value
        .length()
        .map(|n| Value::Number(n as f64))
        .ok_or_else(|| {
            invalid_arguments(format!(
                "Function \"length\" requires a string or collection, not {}.",
                value.ty()
            ))
        })
}

fn join(args: &[Value]) -> Result<Value, EvalError> {
    let Some(sep) = string_arg(&args[0], "join")? else {
        return Ok(Value::Unknown(Type::String));
    };
    let list = &args[1];
    if !list.is_known() {
        return Ok(Value::Unknown(Type::String));
    }
    let Some(items) = list.elements() else {
        return Err(invalid_arguments(format!(
            "Function \"join\" requires a list of strings, not {}.",
            list.ty()
        )));
    };
    let mut parts = Vec::with_capacity(items.len());
    for item in items {
        match string_arg(item, "join")? {
            Some(s) => parts.push(s),
            None => return Ok(Value::Unknown(Type::String)),
        }
    }
    Ok(Value::string(parts.join(&sep)))
}

/// Concatenate sequences into one tuple.
fn concat(args: &[Value]) -> Result<Value, EvalError> {
    let mut out = Vec::new();
    for arg in args {
        if !arg.is_known() {
            return Ok(Value::Unknown(Type::Dynamic));
        }
        let Some(items) = arg.elements() else {
            return Err(invalid_arguments(format!(
                "Function \"concat\" requires lists, not {}.",
                arg.ty()
            )));
        };
        out.extend(items.iter().cloned());
    }
    Ok(Value::tuple(out))
}

fn tostring(args: &[Value]) -> Result<Value, EvalError> {
    Ok(string_arg(&args[0], "tostring")?.map_or(Value::Unknown(Type::String), Value::string))
}

fn tonumber(args: &[Value]) -> Result<Value, EvalError> {
    let value = &args[0];
    if value.is_null() {
        return Ok(Value::Null(Type::Number));
    }
    convert(value, &Type::Number)
        .map_err(|err| invalid_arguments(format!("Invalid argument to \"tonumber\": {err}.")))
}

/// First argument that is neither null nor the empty string.
fn coalesce(args: &[Value]) -> Result<Value, EvalError> {
    for arg in args {
        if !arg.is_known() {
            return Ok(Value::Unknown(Type::Dynamic));
        }
        if arg.is_null() || arg.as_str() == Some("") {
            continue;
        }
        return Ok(arg.clone());
    }
    Err(invalid_arguments(
        "No non-null, non-empty-string arguments to \"coalesce\".",
    ))
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn strings(items: &[&str]) -> Value {
        Value::tuple(items.iter().map(|s| Value::from(*s)).collect())
    }

    #[test]
    fn string_functions() {
        assert_eq!(call("upper", &[Value::from("web")]), Ok(Value::from("WEB")));
        assert_eq!(call("lower", &[Value::from("WeB")]), Ok(Value::from("web")));
        assert_eq!(
            call("join", &[Value::from(","), strings(&["a", "b", "c"])]),
            Ok(Value::from("a,b,c"))
        );
        assert_eq!(call("tostring", &[Value::from(2.5)]), Ok(Value::from("2.5")));
        assert_eq!(call("tonumber", &[Value::from(" 42 ")]), Ok(Value::from(42.0)));
    }

    #[test]
    fn collection_functions() {
        assert_eq!(call("length", &[strings(&["a", "b"])]), Ok(Value::from(2.0)));
        assert_eq!(call("length", &[Value::from("héllo")]), Ok(Value::from(5.0)));
        assert_eq!(
            call("concat", &[strings(&["a"]), strings(&["b", "c"])]),
            Ok(strings(&["a", "b", "c"]))
        );
        assert_eq!(
            call(
                "coalesce",
                &[Value::null(Type::String), Value::from(""), Value::from("x")]
            ),
            Ok(Value::from("x"))
        );
    }

    #[test]
    fn unknown_arguments_give_unknown_results() {
        assert_eq!(
            call("upper", &[Value::unknown(Type::String)]),
            Ok(Value::unknown(Type::String))
        );
        assert_eq!(
            call("length", &[Value::unknown(Type::list(Type::String))]),
            Ok(Value::unknown(Type::Number))
        );
        assert_eq!(call("join", &[Value::from(","), Value::Dynamic]), Ok(Value::Dynamic));
    }

    #[test]
    fn bad_calls() {
        let err = call("nope", &[]).unwrap_err();
        assert_eq!(err.code, ErrorCode::E1008);

        let err = call("upper", &[]).unwrap_err();
        assert_eq!(err.summary, "Invalid function arguments");
        assert_eq!(err.detail, "Function \"upper\" expects 1 argument(s), got 0.");

        assert!(call("length", &[Value::from(true)]).is_err());
        assert!(call("coalesce", &[Value::null(Type::String)]).is_err());
    }
}
