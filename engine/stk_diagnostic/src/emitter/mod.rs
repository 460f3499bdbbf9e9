//! Rendering diagnostics for people.
//!
//! Drivers report a run's [`Diagnostics`] through a [`DiagnosticEmitter`].
//! Write failures are returned, not swallowed: a driver writing to a closed
//! pipe decides for itself whether that matters.

mod terminal;

pub use terminal::{ColorMode, TerminalEmitter};

use std::io;

use crate::{Diagnostic, Diagnostics};

pub trait DiagnosticEmitter {
    fn emit(&mut self, diagnostic: &Diagnostic) -> io::Result<()>;

    /// A closing line describing the whole collection.
    fn emit_summary(&mut self, diagnostics: &Diagnostics) -> io::Result<()>;

    /// Every diagnostic, then the summary.
    fn report(&mut self, diagnostics: &Diagnostics) -> io::Result<()> {
        for diagnostic in diagnostics {
            self.emit(diagnostic)?;
        }
        self.emit_summary(diagnostics)
    }
}
