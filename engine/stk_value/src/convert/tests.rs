use super::*;
use pretty_assertions::assert_eq;

#[test]
fn dynamic_target_keeps_value() {
    let v = Value::object([("a", Value::from(1.0))]);
    assert_eq!(convert(&v, &Type::Dynamic), Ok(v));
}

#[test]
fn dynamic_target_rejects_inconsistent_list() {
    let v = Value::list_unchecked(Type::Number, vec![Value::from(1.0), Value::from("two")]);
    let err = convert(&v, &Type::Dynamic).unwrap_err();
    assert_eq!(err.path.steps(), &[PathStep::Index(1)]);
    assert_eq!(
        err.to_string(),
        "[1]: element has type string, but the collection holds number"
    );
}

#[test]
fn primitives_convert_both_ways() {
    assert_eq!(
        convert(&Value::from(8080.0), &Type::String),
        Ok(Value::from("8080"))
    );
    assert_eq!(
        convert(&Value::from(" 42 "), &Type::Number),
        Ok(Value::from(42.0))
    );
    assert_eq!(
        convert(&Value::from("true"), &Type::Bool),
        Ok(Value::from(true))
    );
    assert!(convert(&Value::from("yes"), &Type::Bool).is_err());
    assert!(convert(&Value::from(true), &Type::Number).is_err());
}

#[test]
fn placeholder_and_unknown_take_target_type() {
    assert_eq!(
        convert(&Value::Dynamic, &Type::String),
        Ok(Value::unknown(Type::String))
    );
    assert_eq!(
        convert(&Value::unknown(Type::Number), &Type::String),
        Ok(Value::unknown(Type::String))
    );
    assert!(convert(&Value::unknown(Type::Number), &Type::list(Type::String)).is_err());
    assert_eq!(
        convert(&Value::null(Type::Dynamic), &Type::Number),
        Ok(Value::null(Type::Number))
    );
}

#[test]
fn tuple_to_list_unifies_element_type() {
    let v = Value::tuple(vec![Value::from(1.0), Value::from("b")]);
    let converted = convert(&v, &Type::list(Type::Dynamic)).unwrap();
    assert_eq!(converted.ty(), Type::list(Type::String));
    assert_eq!(
        converted.elements().unwrap(),
        &[Value::from("1"), Value::from("b")]
    );
}

#[test]
fn tuple_to_list_rejects_mixed_structures() {
    let v = Value::tuple(vec![Value::from(1.0), Value::empty_object()]);
    let err = convert(&v, &Type::list(Type::Dynamic)).unwrap_err();
    assert_eq!(err.message, "all elements must have the same type");
}

#[test]
fn object_conversion_reports_nested_path() {
    let target = Type::object([(
        "ports",
        Type::list(Type::Number),
    )]);
    let v = Value::object([(
        "ports",
        Value::tuple(vec![Value::from(80.0), Value::from("http")]),
    )]);
    let err = convert(&v, &target).unwrap_err();
    assert_eq!(err.to_string(), ".ports[1]: cannot convert \"http\" to number");
}

#[test]
fn object_conversion_fills_missing_and_rejects_extra() {
    let target = Type::object([("a", Type::String), ("b", Type::Number)]);
    let partial = Value::object([("a", Value::from("x"))]);
    let converted = convert(&partial, &target).unwrap();
    assert_eq!(converted.get_attr("b"), Some(&Value::null(Type::Number)));

    let extra = Value::object([("a", Value::from("x")), ("z", Value::from(true))]);
    let err = convert(&extra, &target).unwrap_err();
    assert_eq!(err.to_string(), "unsupported attribute \"z\"");
}

#[test]
fn tuple_length_must_match() {
    let target = Type::Tuple(vec![Type::String, Type::String]);
    let err = convert(&Value::tuple(vec![Value::from("a")]), &target).unwrap_err();
    assert!(err.message.contains("exactly 2 elements"));
}
