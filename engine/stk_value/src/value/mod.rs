//! Runtime values.
//!
//! Heap payloads are behind `Arc` so values can be cloned freely across the
//! evaluator threads that share a memoized result.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::Type;

/// A typed, possibly-unknown datum.
#[derive(Clone, PartialEq, Debug)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub enum Value {
    /// Placeholder for "no concrete value could be determined".
    ///
    /// Distinct from `Unknown(Type::Dynamic)`, which is a legitimate
    /// plan-time unknown of unconstrained type.
    Dynamic,
    /// A value that will only be known after apply.
    Unknown(Type),
    /// A typed null.
    Null(Type),
    Bool(bool),
    Number(f64),
    String(Arc<str>),
    /// Homogeneous list. Items are expected to conform to `elem`.
    List { elem: Type, items: Arc<[Value]> },
    /// Homogeneous string-keyed map. Entries are expected to conform to `elem`.
    Map {
        elem: Type,
        entries: Arc<BTreeMap<String, Value>>,
    },
    Object(Arc<BTreeMap<String, Value>>),
    Tuple(Arc<[Value]>),
}

impl Value {
    pub fn string(s: impl Into<Arc<str>>) -> Self {
        Value::String(s.into())
    }

    pub fn number(n: f64) -> Self {
        Value::Number(n)
    }

    pub fn bool(b: bool) -> Self {
        Value::Bool(b)
    }

    pub fn null(ty: Type) -> Self {
        Value::Null(ty)
    }

    pub fn unknown(ty: Type) -> Self {
        Value::Unknown(ty)
    }

    /// Object from `(attribute, value)` pairs.
    pub fn object<I, S>(attrs: I) -> Self
    where
        I: IntoIterator<Item = (S, Value)>,
        S: Into<String>,
    {
        Value::Object(Arc::new(
            attrs.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        ))
    }

    pub fn tuple(items: Vec<Value>) -> Self {
        Value::Tuple(items.into())
    }

    pub fn empty_object() -> Self {
        Value::Object(Arc::new(BTreeMap::new()))
    }

    /// List with a declared element type, without checking the items.
    ///
    /// Values built this way come from outside the expression language
    /// (component providers, caller-supplied inputs) and are validated when
    /// they cross a conversion boundary.
    pub fn list_unchecked(elem: Type, items: Vec<Value>) -> Self {
        Value::List {
            elem,
            items: items.into(),
        }
    }

    /// Map with a declared element type, without checking the entries.
    pub fn map_unchecked(elem: Type, entries: BTreeMap<String, Value>) -> Self {
        Value::Map {
            elem,
            entries: Arc::new(entries),
        }
    }

    /// The structural type of this value.
    pub fn ty(&self) -> Type {
        match self {
            Value::Dynamic => Type::Dynamic,
            Value::Unknown(ty) | Value::Null(ty) => ty.clone(),
            Value::Bool(_) => Type::Bool,
            Value::Number(_) => Type::Number,
            Value::String(_) => Type::String,
            Value::List { elem, .. } => Type::list(elem.clone()),
            Value::Map { elem, .. } => Type::map(elem.clone()),
            Value::Object(attrs) => Type::Object(
                attrs
                    .iter()
                    .map(|(name, v)| (name.clone(), v.ty()))
                    .collect(),
            ),
            Value::Tuple(items) => Type::Tuple(items.iter().map(Value::ty).collect()),
        }
    }

    /// Is this the evaluator placeholder?
    #[inline]
    pub fn is_placeholder(&self) -> bool {
        matches!(self, Value::Dynamic)
    }

    /// Is the top level of this value known? Placeholders are not known.
    #[inline]
    pub fn is_known(&self) -> bool {
        !matches!(self, Value::Unknown(_) | Value::Dynamic)
    }

    /// Is this value, including every nested element, known?
    pub fn is_wholly_known(&self) -> bool {
        match self {
            Value::Unknown(_) | Value::Dynamic => false,
            Value::List { items, .. } | Value::Tuple(items) => {
                items.iter().all(Value::is_wholly_known)
            }
            Value::Map { entries, .. } | Value::Object(entries) => {
                entries.values().all(Value::is_wholly_known)
            }
            _ => true,
        }
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(&**s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Look up an attribute of an object or a key of a map.
    pub fn get_attr(&self, name: &str) -> Option<&Value> {
        match self {
            Value::Object(attrs) | Value::Map { entries: attrs, .. } => attrs.get(name),
            _ => None,
        }
    }

    /// Elements of a list or tuple.
    pub fn elements(&self) -> Option<&[Value]> {
        match self {
            Value::List { items, .. } | Value::Tuple(items) => Some(&**items),
            _ => None,
        }
    }

    /// Entries of an object or map, in key order.
    pub fn entries(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Object(attrs) | Value::Map { entries: attrs, .. } => Some(&**attrs),
            _ => None,
        }
    }

    /// Number of elements in a collection or characters in a string.
    pub fn length(&self) -> Option<usize> {
        match self {
            Value::String(s) => Some(s.chars().count()),
            Value::List { items, .. } | Value::Tuple(items) => Some(items.len()),
            Value::Map { entries, .. } | Value::Object(entries) => Some(entries.len()),
            _ => None,
        }
    }
}

/// Render a number the way configuration authors write it: integral values
/// without a fractional part.
#[allow(
    clippy::cast_possible_truncation,
    reason = "guarded by the fract/magnitude check"
)]
pub(crate) fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Dynamic => write!(f, "(unavailable)"),
            Value::Unknown(_) => write!(f, "(known after apply)"),
            Value::Null(_) => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{}", format_number(*n)),
            Value::String(s) => write!(f, "{s:?}"),
            Value::List { items, .. } | Value::Tuple(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Value::Map { entries, .. } | Value::Object(entries) => {
                write!(f, "{{")?;
                for (i, (name, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{name} = {v}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::string(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
mod tests;
