//! Diagnostic creation and terminal rendering.
//!
//! Build passes report problems as structured [`Diagnostic`]s. The
//! [`TerminalRenderer`] formats them with source context using the
//! [`SourceDb`] of the pass that produced them.

#![warn(missing_docs)]

pub mod code;
pub mod diagnostic;
pub mod renderer;
pub mod severity;
pub mod source;

pub use code::{Category, DiagnosticCode};
pub use diagnostic::Diagnostic;
pub use renderer::{DiagnosticRenderer, TerminalRenderer};
pub use severity::Severity;
pub use source::{FileId, SourceDb, SourceFile, Span};
