//! Diagnostics for the stack evaluation engine.
//!
//! Problems found while evaluating configuration are never Rust errors:
//! they are [`Diagnostic`] values accumulated in [`Diagnostics`] and
//! returned beside results. Every diagnostic carries an [`ErrorCode`]
//! whose [`Category`] separates configuration mistakes from the engine
//! giving up (cycles, cancellation).

mod diagnostic;
pub mod emitter;
mod error_code;

pub use diagnostic::{Diagnostic, Diagnostics, Severity};
pub use error_code::{Category, ErrorCode};
