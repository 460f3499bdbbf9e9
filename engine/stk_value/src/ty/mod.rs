//! Structural type descriptors.

use std::collections::BTreeMap;
use std::fmt;

/// Structural type of a [`Value`](crate::Value).
///
/// `Dynamic` is the unconstrained type: it accepts any value and is the
/// target type of local values.
#[derive(Clone, Eq, PartialEq, Hash, Debug, Default)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub enum Type {
    #[default]
    Dynamic,
    String,
    Number,
    Bool,
    List(Box<Type>),
    Map(Box<Type>),
    Object(BTreeMap<String, Type>),
    Tuple(Vec<Type>),
}

impl Type {
    /// List whose elements all have type `elem`.
    pub fn list(elem: Type) -> Self {
        Type::List(Box::new(elem))
    }

    /// Map whose values all have type `elem`.
    pub fn map(elem: Type) -> Self {
        Type::Map(Box::new(elem))
    }

    /// Object type from `(attribute, type)` pairs.
    pub fn object<I, S>(attrs: I) -> Self
    where
        I: IntoIterator<Item = (S, Type)>,
        S: Into<String>,
    {
        Type::Object(attrs.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    #[inline]
    pub fn is_dynamic(&self) -> bool {
        matches!(self, Type::Dynamic)
    }

    #[inline]
    pub fn is_primitive(&self) -> bool {
        matches!(self, Type::String | Type::Number | Type::Bool)
    }

    /// Check whether a value of type `actual` conforms to `self` without
    /// any conversion.
    ///
    /// `Dynamic` on either side conforms: on the left it is the unconstrained
    /// type, on the right it stands for a not-yet-known type.
    pub fn accepts(&self, actual: &Type) -> bool {
        match (self, actual) {
            (Type::Dynamic, _) | (_, Type::Dynamic) => true,
            (Type::String, Type::String)
            | (Type::Number, Type::Number)
            | (Type::Bool, Type::Bool) => true,
            (Type::List(a), Type::List(b)) | (Type::Map(a), Type::Map(b)) => a.accepts(b),
            (Type::Object(a), Type::Object(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .all(|(name, ty)| b.get(name).is_some_and(|other| ty.accepts(other)))
            }
            (Type::Tuple(a), Type::Tuple(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.accepts(y))
            }
            _ => false,
        }
    }

    /// Find a single type every member of `types` can convert to.
    ///
    /// Identical types unify to themselves, `Dynamic` members are ignored,
    /// and a mix of primitives unifies to `String`. Anything else has no
    /// common type.
    pub fn unify<'a, I>(types: I) -> Option<Type>
    where
        I: IntoIterator<Item = &'a Type>,
    {
        let mut unified: Option<Type> = None;
        for ty in types {
            if ty.is_dynamic() {
                continue;
            }
            unified = match unified {
                None => Some(ty.clone()),
                Some(current) if current == *ty => Some(current),
                Some(current) if current.is_primitive() && ty.is_primitive() => Some(Type::String),
                Some(_) => return None,
            };
        }
        Some(unified.unwrap_or(Type::Dynamic))
    }

    /// Human-readable name used in conversion error messages.
    pub fn friendly_name(&self) -> String {
        match self {
            Type::Dynamic => "any type".to_string(),
            Type::String => "string".to_string(),
            Type::Number => "number".to_string(),
            Type::Bool => "bool".to_string(),
            Type::List(elem) => format!("list of {}", elem.friendly_name()),
            Type::Map(elem) => format!("map of {}", elem.friendly_name()),
            Type::Object(_) => "object".to_string(),
            Type::Tuple(_) => "tuple".to_string(),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Dynamic => write!(f, "any"),
            Type::String => write!(f, "string"),
            Type::Number => write!(f, "number"),
            Type::Bool => write!(f, "bool"),
            Type::List(elem) => write!(f, "list({elem})"),
            Type::Map(elem) => write!(f, "map({elem})"),
            Type::Object(attrs) => {
                write!(f, "object({{")?;
                for (i, (name, ty)) in attrs.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{name} = {ty}")?;
                }
                write!(f, "}})")
            }
            Type::Tuple(elems) => {
                write!(f, "tuple([")?;
                for (i, ty) in elems.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{ty}")?;
                }
                write!(f, "])")
            }
        }
    }
}
