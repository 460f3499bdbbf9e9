//! Plain-text diagnostics, optionally colored with ANSI escapes.
//!
//! ```text
//! error[E2001]: Invalid local value
//!   --> main.stk:10..15
//!   = Unsuitable value for local "x": number required.
//! ```

use std::io::{self, Write};

use crate::{Category, Diagnostic, Diagnostics, Severity};

use super::DiagnosticEmitter;

const RED: &str = "\x1b[1;31m";
const YELLOW: &str = "\x1b[1;33m";
const BLUE: &str = "\x1b[1;34m";
const RESET: &str = "\x1b[0m";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ColorMode {
    /// Color when writing to a terminal.
    #[default]
    Auto,
    Always,
    Never,
}

impl ColorMode {
    /// `is_tty` only matters for `Auto`.
    pub fn should_use_colors(self, is_tty: bool) -> bool {
        match self {
            ColorMode::Auto => is_tty,
            ColorMode::Always => true,
            ColorMode::Never => false,
        }
    }
}

pub struct TerminalEmitter<W: Write> {
    writer: W,
    colors: bool,
}

impl<W: Write> TerminalEmitter<W> {
    pub fn new(writer: W, mode: ColorMode, is_tty: bool) -> Self {
        TerminalEmitter {
            writer,
            colors: mode.should_use_colors(is_tty),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn paint(&mut self, color: &str, text: &dyn std::fmt::Display) -> io::Result<()> {
        if self.colors {
            write!(self.writer, "{color}{text}{RESET}")
        } else {
            write!(self.writer, "{text}")
        }
    }
}

impl TerminalEmitter<io::Stderr> {
    pub fn stderr(mode: ColorMode, is_tty: bool) -> Self {
        TerminalEmitter::new(io::stderr(), mode, is_tty)
    }
}

fn severity_color(severity: Severity) -> &'static str {
    match severity {
        Severity::Error => RED,
        Severity::Warning => YELLOW,
    }
}

/// Extra line for problems that are not the configuration's fault.
fn category_note(category: Category) -> Option<&'static str> {
    match category {
        Category::Cancellation => Some("the run was cancelled; results are incomplete"),
        Category::Internal => Some("this is a bug in the evaluation engine"),
        Category::Configuration | Category::Conversion | Category::Cycle | Category::Provider => None,
    }
}

fn count(n: usize, noun: &str) -> String {
    if n == 1 {
        format!("1 {noun}")
    } else {
        format!("{n} {noun}s")
    }
}

impl<W: Write> DiagnosticEmitter for TerminalEmitter<W> {
    fn emit(&mut self, diagnostic: &Diagnostic) -> io::Result<()> {
        let header = format!("{}[{}]", diagnostic.severity, diagnostic.code);
        self.paint(severity_color(diagnostic.severity), &header)?;
        writeln!(self.writer, ": {}", diagnostic.summary)?;
        if let Some(range) = &diagnostic.range {
            write!(self.writer, "  --> ")?;
            self.paint(BLUE, range)?;
            writeln!(self.writer)?;
        }
        if !diagnostic.detail.is_empty() {
            writeln!(self.writer, "  = {}", diagnostic.detail)?;
        }
        if let Some(note) = category_note(diagnostic.code.category()) {
            writeln!(self.writer, "  = note: {note}")?;
        }
        writeln!(self.writer)
    }

    fn emit_summary(&mut self, diagnostics: &Diagnostics) -> io::Result<()> {
        let errors = diagnostics.error_count();
        let warnings = diagnostics.warning_count();
        match (errors, warnings) {
            (0, 0) => Ok(()),
            (0, w) => {
                self.paint(YELLOW, &"warning")?;
                writeln!(self.writer, ": {} emitted", count(w, "warning"))
            }
            (e, 0) => {
                self.paint(RED, &"error")?;
                writeln!(self.writer, ": evaluation failed with {}", count(e, "error"))
            }
            (e, w) => {
                self.paint(RED, &"error")?;
                writeln!(
                    self.writer,
                    ": evaluation failed with {} and {}",
                    count(e, "error"),
                    count(w, "warning")
                )
            }
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
mod tests;
