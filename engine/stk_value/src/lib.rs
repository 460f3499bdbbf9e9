//! STK Value - dynamically-typed data for the stack evaluation engine.
//!
//! Every declaration in a stack configuration evaluates to a [`Value`]. Values
//! carry a structural [`Type`] and may be partially unknown while planning.
//!
//! # Placeholders vs Unknowns
//!
//! Two distinct "no concrete value" states exist:
//!
//! - [`Value::Unknown`]: a real value that will only be known after apply.
//!   It has a type and flows through expressions normally.
//! - [`Value::Dynamic`]: the placeholder an evaluator returns when it could
//!   not produce any value at all (errors, cycles, absent scope). It must be
//!   accompanied by diagnostics unless the caller opted into placeholders.
//!
//! # Conversion
//!
//! [`convert`] is the only way values cross type boundaries. It never mutates;
//! it either produces a new value of the target type or a path-qualified
//! [`ConvertError`].

mod convert;
mod ty;
mod value;

pub use convert::{convert, ConvertError, PathStep, ValuePath};
pub use ty::Type;
pub use value::Value;
