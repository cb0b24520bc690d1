//! Structured diagnostic messages with severity, codes and notes.

use crate::code::DiagnosticCode;
use crate::severity::Severity;
use crate::source::Span;
use serde::{Deserialize, Serialize};

/// A structured diagnostic reported by a build pass.
///
/// Diagnostics are never thrown: the build engine collects them and the
/// driver renders them to the diagnostic channel.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Diagnostic {
    /// The severity level of this diagnostic.
    pub severity: Severity,
    /// The code identifying the kind of diagnostic.
    pub code: DiagnosticCode,
    /// The main diagnostic message.
    pub message: String,
    /// Where the problem was detected, or [`Span::DUMMY`].
    pub primary_span: Span,
    /// Explanatory footnotes.
    pub notes: Vec<String>,
    /// Actionable suggestions.
    pub help: Vec<String>,
}

impl Diagnostic {
    /// Creates a new error diagnostic.
    pub fn error(code: DiagnosticCode, message: impl Into<String>, span: Span) -> Self {
        Self::with_severity(Severity::Error, code, message, span)
    }

    /// Creates a new warning diagnostic.
    pub fn warning(code: DiagnosticCode, message: impl Into<String>, span: Span) -> Self {
        Self::with_severity(Severity::Warning, code, message, span)
    }

    fn with_severity(
        severity: Severity,
        code: DiagnosticCode,
        message: impl Into<String>,
        span: Span,
    ) -> Self {
        Self {
            severity,
            code,
            message: message.into(),
            primary_span: span,
            notes: Vec::new(),
            help: Vec::new(),
        }
    }

    /// Adds a note to this diagnostic.
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Adds a help message to this diagnostic.
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help.push(help.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::Category;

    #[test]
    fn create_error() {
        let code = DiagnosticCode::new(Category::Syntax, 1);
        let diag = Diagnostic::error(code, "Unexpected token", Span::DUMMY);
        assert_eq!(diag.severity, Severity::Error);
        assert_eq!(diag.message, "Unexpected token");
        assert_eq!(format!("{}", diag.code), "E001");
    }

    #[test]
    fn builder_methods() {
        let code = DiagnosticCode::new(Category::Config, 2);
        let diag = Diagnostic::warning(code, "unknown option", Span::DUMMY)
            .with_note("option `foo` is ignored")
            .with_help("remove it from tsconfig.json");
        assert_eq!(diag.severity, Severity::Warning);
        assert_eq!(diag.notes.len(), 1);
        assert_eq!(diag.help.len(), 1);
    }
}
