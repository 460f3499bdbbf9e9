//! Source locations.
//!
//! Expressions carry compact byte-offset [`Span`]s; declarations know which
//! file they came from, and the two combine into a [`SourceRange`] when a
//! diagnostic needs a printable location.

use std::fmt;
use std::sync::Arc;

/// Byte range within a single configuration file.
///
/// Layout: 8 bytes total
/// - start: u32 - byte offset from file start
/// - end: u32 - byte offset (exclusive)
#[derive(Copy, Clone, Eq, PartialEq, Hash, Default)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    /// Span for synthesized expressions with no source text.
    pub const DUMMY: Span = Span { start: 0, end: 0 };

    #[inline]
    pub const fn new(start: u32, end: u32) -> Self {
        Span { start, end }
    }

    #[inline]
    pub const fn len(&self) -> u32 {
        self.end - self.start
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Merge two spans to create one covering both.
    #[inline]
    #[must_use]
    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// A span anchored to a named configuration file.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct SourceRange {
    pub file: Arc<str>,
    pub span: Span,
}

impl SourceRange {
    pub fn new(file: impl Into<Arc<str>>, span: Span) -> Self {
        SourceRange {
            file: file.into(),
            span,
        }
    }

    /// Same file, different span.
    #[must_use]
    pub fn with_span(&self, span: Span) -> Self {
        SourceRange {
            file: Arc::clone(&self.file),
            span,
        }
    }
}

impl fmt::Display for SourceRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.span)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_covers_both() {
        let merged = Span::new(10, 20).merge(Span::new(15, 30));
        assert_eq!(merged, Span::new(10, 30));
        assert_eq!(merged.len(), 20);
    }

    #[test]
    fn source_range_display() {
        let range = SourceRange::new("main.stk", Span::new(4, 9));
        assert_eq!(range.to_string(), "main.stk:4..9");
        assert_eq!(range.with_span(Span::DUMMY).to_string(), "main.stk:0..0");
    }
}
