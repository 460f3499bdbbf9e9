//! Lossless conversion between value types.
//!
//! Conversion walks the value and the target type together, recording the
//! path so a failure deep inside a structure can be reported precisely.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::value::format_number;
use crate::{Type, Value};

/// One step of a path into a nested value.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub enum PathStep {
    /// Attribute of an object or key of a map.
    Attr(String),
    /// Index into a list or tuple.
    Index(usize),
}

/// Path from the root of a value to the element a conversion failed on.
#[derive(Clone, Eq, PartialEq, Hash, Debug, Default)]
pub struct ValuePath(Vec<PathStep>);

impl ValuePath {
    pub fn steps(&self) -> &[PathStep] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ValuePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for step in &self.0 {
            match step {
                PathStep::Attr(name) => write!(f, ".{name}")?,
                PathStep::Index(i) => write!(f, "[{i}]")?,
            }
        }
        Ok(())
    }
}

/// A value could not be converted to the requested type.
///
/// Displays as `message` at the root and `.path: message` below it.
#[derive(Clone, Eq, PartialEq, Hash, Debug, thiserror::Error)]
#[error("{}{}", path_prefix(.path), .message)]
pub struct ConvertError {
    pub path: ValuePath,
    pub message: String,
}

fn path_prefix(path: &ValuePath) -> String {
    if path.is_root() {
        String::new()
    } else {
        format!("{path}: ")
    }
}

/// Convert `value` to `target`.
///
/// Converting to [`Type::Dynamic`] performs no narrowing but still rejects
/// internally inconsistent values, such as a list whose items do not match
/// its element type.
pub fn convert(value: &Value, target: &Type) -> Result<Value, ConvertError> {
    let mut path = Vec::new();
    convert_at(value, target, &mut path)
}

fn error(path: &[PathStep], message: impl Into<String>) -> ConvertError {
    ConvertError {
        path: ValuePath(path.to_vec()),
        message: message.into(),
    }
}

fn required(path: &[PathStep], target: &Type) -> ConvertError {
    error(path, format!("{} required", target.friendly_name()))
}

fn convert_at(
    value: &Value,
    target: &Type,
    path: &mut Vec<PathStep>,
) -> Result<Value, ConvertError> {
    match (value, target) {
        (_, Type::Dynamic) => {
            validate(value, path)?;
            Ok(value.clone())
        }
        (Value::Dynamic, _) => Ok(Value::Unknown(target.clone())),
        (Value::Unknown(ty), _) => {
            if conversion_possible(ty, target) {
                Ok(Value::Unknown(target.clone()))
            } else {
                Err(required(path, target))
            }
        }
        (Value::Null(_), _) => Ok(Value::Null(target.clone())),
        (_, Type::String) => match value {
            Value::String(_) => Ok(value.clone()),
            Value::Number(n) => Ok(Value::string(format_number(*n))),
            Value::Bool(b) => Ok(Value::string(b.to_string())),
            _ => Err(required(path, target)),
        },
        (_, Type::Number) => match value {
            Value::Number(_) => Ok(value.clone()),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .map(Value::Number)
                .map_err(|_| error(path, format!("cannot convert {s:?} to number"))),
            _ => Err(required(path, target)),
        },
        (_, Type::Bool) => match value {
            Value::Bool(_) => Ok(value.clone()),
            Value::String(s) if &**s == "true" => Ok(Value::Bool(true)),
            Value::String(s) if &**s == "false" => Ok(Value::Bool(false)),
            Value::String(s) => Err(error(path, format!("cannot convert {s:?} to bool"))),
            _ => Err(required(path, target)),
        },
        (Value::List { items, .. } | Value::Tuple(items), Type::List(elem)) => {
            let elem = resolve_element_type(items.iter(), elem, path)?;
            let items = convert_each(items, &elem, path)?;
            Ok(Value::List {
                elem,
                items: items.into(),
            })
        }
        (Value::Map { entries, .. } | Value::Object(entries), Type::Map(elem)) => {
            let elem = resolve_element_type(entries.values(), elem, path)?;
            let mut converted = BTreeMap::new();
            for (key, v) in entries.iter() {
                path.push(PathStep::Attr(key.clone()));
                let result = convert_at(v, &elem, path);
                path.pop();
                converted.insert(key.clone(), result?);
            }
            Ok(Value::Map {
                elem,
                entries: Arc::new(converted),
            })
        }
        (Value::Map { entries, .. } | Value::Object(entries), Type::Object(attrs)) => {
            if let Some(extra) = entries.keys().find(|k| !attrs.contains_key(*k)) {
                return Err(error(path, format!("unsupported attribute {extra:?}")));
            }
            let mut converted = BTreeMap::new();
            for (name, ty) in attrs {
                path.push(PathStep::Attr(name.clone()));
                let result = match entries.get(name) {
                    Some(v) => convert_at(v, ty, path),
                    None => Ok(Value::Null(ty.clone())),
                };
                path.pop();
                converted.insert(name.clone(), result?);
            }
            Ok(Value::Object(Arc::new(converted)))
        }
        (Value::List { items, .. } | Value::Tuple(items), Type::Tuple(elems)) => {
            if items.len() != elems.len() {
                return Err(error(
                    path,
                    format!(
                        "tuple required with exactly {} elements, found {}",
                        elems.len(),
                        items.len()
                    ),
                ));
            }
            let mut converted = Vec::with_capacity(items.len());
            for (i, (item, ty)) in items.iter().zip(elems).enumerate() {
                path.push(PathStep::Index(i));
                let result = convert_at(item, ty, path);
                path.pop();
                converted.push(result?);
            }
            Ok(Value::Tuple(converted.into()))
        }
        _ => Err(required(path, target)),
    }
}

fn convert_each(
    items: &[Value],
    elem: &Type,
    path: &mut Vec<PathStep>,
) -> Result<Vec<Value>, ConvertError> {
    let mut converted = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        path.push(PathStep::Index(i));
        let result = convert_at(item, elem, path);
        path.pop();
        converted.push(result?);
    }
    Ok(converted)
}

/// A `Dynamic` element type is refined to the unified type of the items.
fn resolve_element_type<'a, I>(
    items: I,
    elem: &Type,
    path: &[PathStep],
) -> Result<Type, ConvertError>
where
    I: Iterator<Item = &'a Value>,
{
    if !elem.is_dynamic() {
        return Ok(elem.clone());
    }
    let types: Vec<Type> = items.map(Value::ty).collect();
    Type::unify(&types).ok_or_else(|| error(path, "all elements must have the same type"))
}

/// Check that collection items conform to their declared element types.
fn validate(value: &Value, path: &mut Vec<PathStep>) -> Result<(), ConvertError> {
    match value {
        Value::List { elem, items } => {
            for (i, item) in items.iter().enumerate() {
                path.push(PathStep::Index(i));
                let result = validate_element(elem, item, path);
                path.pop();
                result?;
            }
            Ok(())
        }
        Value::Map { elem, entries } => {
            for (key, item) in entries.iter() {
                path.push(PathStep::Attr(key.clone()));
                let result = validate_element(elem, item, path);
                path.pop();
                result?;
            }
            Ok(())
        }
        Value::Object(attrs) => {
            for (key, item) in attrs.iter() {
                path.push(PathStep::Attr(key.clone()));
                let result = validate(item, path);
                path.pop();
                result?;
            }
            Ok(())
        }
        Value::Tuple(items) => {
            for (i, item) in items.iter().enumerate() {
                path.push(PathStep::Index(i));
                let result = validate(item, path);
                path.pop();
                result?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

fn validate_element(
    elem: &Type,
    item: &Value,
    path: &mut Vec<PathStep>,
) -> Result<(), ConvertError> {
    let actual = item.ty();
    if !elem.accepts(&actual) {
        return Err(error(
            path,
            format!(
                "element has type {actual}, but the collection holds {}",
                elem.friendly_name()
            ),
        ));
    }
    validate(item, path)
}

/// Whether some value of type `from` could convert to `to`.
fn conversion_possible(from: &Type, to: &Type) -> bool {
    match (from, to) {
        (Type::Dynamic, _) | (_, Type::Dynamic) => true,
        (a, b) if a.is_primitive() && b.is_primitive() => true,
        (Type::List(a) | Type::Map(a), Type::List(b) | Type::Map(b))
            if std::mem::discriminant(from) == std::mem::discriminant(to) =>
        {
            conversion_possible(a, b)
        }
        (Type::Tuple(items), Type::List(elem)) => {
            items.iter().all(|item| conversion_possible(item, elem))
        }
        (Type::Object(attrs), Type::Map(elem)) => {
            attrs.values().all(|ty| conversion_possible(ty, elem))
        }
        (Type::Object(from_attrs), Type::Object(to_attrs)) => from_attrs.iter().all(|(name, ty)| {
            to_attrs
                .get(name)
                .is_some_and(|target| conversion_possible(ty, target))
        }),
        (Type::Tuple(a), Type::Tuple(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| conversion_possible(x, y))
        }
        (Type::Map(_), Type::Object(_)) | (Type::List(_), Type::Tuple(_)) => true,
        _ => false,
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
mod tests;
