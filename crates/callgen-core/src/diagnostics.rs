//! Diagnostics sink for errors that must not stop lowering.
//!
//! A fingerprint collision poisons the enclosing class but sibling call
//! sites are still lowered, so the error is reported here instead of being
//! returned.

use std::fmt;

use crate::CompilationError;

/// Receives compile errors that don't abort lowering.
pub trait DiagnosticSink {
    fn report_error(&mut self, error: CompilationError);
}

/// Collecting sink.
#[derive(Debug, Default, Clone)]
pub struct Diagnostics {
    errors: Vec<CompilationError>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    pub fn errors(&self) -> &[CompilationError] {
        &self.errors
    }

    /// Drain collected errors.
    pub fn take(&mut self) -> Vec<CompilationError> {
        std::mem::take(&mut self.errors)
    }
}

impl DiagnosticSink for Diagnostics {
    fn report_error(&mut self, error: CompilationError) {
        self.errors.push(error);
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for error in &self.errors {
            writeln!(f, "error: {error}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Span;

    #[test]
    fn collects_in_order() {
        let mut diagnostics = Diagnostics::new();
        assert!(!diagnostics.has_errors());

        diagnostics.report_error(CompilationError::internal("first"));
        diagnostics.report_error(CompilationError::UnknownType {
            name: "Missing".into(),
            span: Span::new(2, 1),
        });

        assert_eq!(diagnostics.error_count(), 2);
        assert_eq!(
            diagnostics.to_string(),
            "error: internal error: first\nerror: at 2:1: unknown type 'Missing'\n"
        );
        assert_eq!(diagnostics.take().len(), 2);
        assert!(!diagnostics.has_errors());
    }
}
