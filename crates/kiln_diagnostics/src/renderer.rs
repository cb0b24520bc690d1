//! Diagnostic rendering for the terminal.

use crate::diagnostic::Diagnostic;
use crate::source::SourceDb;

const BOLD: &str = "\x1b[1m";
const BLUE: &str = "\x1b[34m";
const RESET: &str = "\x1b[0m";

/// Trait for rendering diagnostics into formatted output strings.
pub trait DiagnosticRenderer {
    /// Renders a single diagnostic into a formatted string.
    fn render(&self, diag: &Diagnostic, source_db: &SourceDb) -> String;
}

/// Renders diagnostics in a rustc-style terminal format with source context:
///
/// ```text
/// error[E001]: Expected a semicolon or an implicit semicolon after a statement
///   --> src/main.ts:2:11
///    |
///  2 | const b = 1 2;
///    |           ^
/// ```
pub struct TerminalRenderer {
    /// Whether to use ANSI color codes in output.
    pub color: bool,
}

impl TerminalRenderer {
    /// Creates a new terminal renderer.
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    fn paint(&self, style: &str, text: &str) -> String {
        if self.color {
            format!("{style}{text}{RESET}")
        } else {
            text.to_string()
        }
    }
}

impl DiagnosticRenderer for TerminalRenderer {
    fn render(&self, diag: &Diagnostic, source_db: &SourceDb) -> String {
        let mut out = String::new();

        let header = format!("{}[{}]", diag.severity, diag.code);
        out.push_str(&format!(
            "{}: {}\n",
            self.paint(diag.severity.ansi_color(), &header),
            self.paint(BOLD, &diag.message)
        ));

        if let Some(file) = source_db.get_file(diag.primary_span.file) {
            let span = diag.primary_span;
            let (line, col) = file.line_col(span.start);
            let line_num = line.to_string();
            let padding = " ".repeat(line_num.len());
            let gutter = self.paint(BLUE, &format!("{padding} |"));

            out.push_str(&format!(
                "{padding}{} {}:{line}:{col}\n",
                self.paint(BLUE, "-->"),
                file.path.display()
            ));
            out.push_str(&format!("{gutter}\n"));
            let text = file.line_text(span.start);
            out.push_str(&format!(
                "{} {text}\n",
                self.paint(BLUE, &format!("{line_num} |"))
            ));

            // Carets stop at the end of the first line of the span.
            let col_offset = (col as usize).saturating_sub(1);
            let span_len = (span.end.saturating_sub(span.start) as usize)
                .min(text.len().saturating_sub(col_offset))
                .max(1);
            let col_padding = " ".repeat(col_offset);
            let carets = self.paint(diag.severity.ansi_color(), &"^".repeat(span_len));
            out.push_str(&format!("{gutter} {col_padding}{carets}\n"));
        }

        for note in &diag.notes {
            out.push_str(&format!("   = note: {note}\n"));
        }
        for help in &diag.help {
            out.push_str(&format!("   = help: {help}\n"));
        }

        out
    }
}
