use super::*;
use pretty_assertions::assert_eq;

#[test]
fn object_type_is_structural() {
    let v = Value::object([("name", Value::from("web")), ("port", Value::from(80.0))]);
    assert_eq!(
        v.ty(),
        Type::object([("name", Type::String), ("port", Type::Number)])
    );
}

#[test]
fn placeholder_is_not_a_typed_unknown() {
    assert!(Value::Dynamic.is_placeholder());
    assert!(!Value::unknown(Type::Dynamic).is_placeholder());
    assert!(!Value::Dynamic.is_known());
    assert!(!Value::unknown(Type::String).is_known());
}

#[test]
fn wholly_known_looks_inside_collections() {
    let v = Value::tuple(vec![Value::from(1.0), Value::unknown(Type::Number)]);
    assert!(v.is_known());
    assert!(!v.is_wholly_known());
}

#[test]
fn display_renders_config_syntax() {
    assert_eq!(Value::from(3.0).to_string(), "3");
    assert_eq!(Value::from(1.5).to_string(), "1.5");
    assert_eq!(Value::from("hi").to_string(), "\"hi\"");
    assert_eq!(
        Value::object([("a", Value::from(true))]).to_string(),
        "{a = true}"
    );
    assert_eq!(Value::unknown(Type::String).to_string(), "(known after apply)");
}

#[test]
fn length_counts_chars_and_elements() {
    assert_eq!(Value::from("héllo").length(), Some(5));
    assert_eq!(
        Value::list_unchecked(Type::Number, vec![Value::from(1.0)]).length(),
        Some(1)
    );
    assert_eq!(Value::from(true).length(), None);
}

#[cfg(feature = "cache")]
#[test]
fn planned_values_survive_the_cache_encoding() {
    let value = Value::object([
        ("name", Value::from("web")),
        (
            "ports",
            Value::list_unchecked(Type::Number, vec![Value::from(80.0), Value::from(443.0)]),
        ),
        ("zone", Value::null(Type::String)),
        ("id", Value::unknown(Type::String)),
        ("extra", Value::Dynamic),
        ("tags", Value::tuple(vec![Value::from(true), Value::from("a")])),
    ]);
    let bytes = bincode::serialize(&value).unwrap();
    let decoded: Value = bincode::deserialize(&bytes).unwrap();
    assert_eq!(decoded, value);
}
