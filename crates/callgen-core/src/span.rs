//! Source positions attached to call sites and diagnostics.

use std::fmt;

/// Where a call expression starts in its source unit.
///
/// Only the starting line and column of the call are tracked; diagnostics for
/// call lowering point at the call, not at individual arguments.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    /// Line number (1-indexed).
    pub line: u32,
    /// Column number (1-indexed, byte-based).
    pub col: u32,
}

impl Span {
    #[inline]
    pub fn new(line: u32, col: u32) -> Self {
        Self { line, col }
    }

    /// A span that carries no position (synthesized calls).
    #[inline]
    pub fn synthetic() -> Self {
        Self::default()
    }

    #[inline]
    pub fn is_synthetic(&self) -> bool {
        self.line == 0
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}
