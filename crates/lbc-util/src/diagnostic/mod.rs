//! Diagnostics - source-location-aware error reporting with an error
//! counter (`spec.md` §4, component 1).
//!
//! The engine is deliberately not exception-based (`spec.md` §9): a fatal
//! diagnostic just increments a counter and returns control to the caller,
//! which is expected to check [`DiagnosticEngine::has_errors`] at the next
//! phase boundary and stop (`spec.md` §5, "`hasErrors()` after a phase gates
//! subsequent phases"). The one true "abort the process" case is reserved
//! for internal compiler errors (`crate::ice!`), not user diagnostics.

mod codes;

pub use codes::*;

use crate::span::{SourceMap, Span};
use std::fmt;

/// Diagnostic severity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    Error,
    Warning,
    Note,
    Help,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Level::Error => "error",
            Level::Warning => "warning",
            Level::Note => "note",
            Level::Help => "help",
        };
        write!(f, "{s}")
    }
}

/// One reported diagnostic: a level, a formatted message, the code it came
/// from (if any), the primary span, and any attached notes.
#[derive(Clone, Debug)]
pub struct Diagnostic {
    pub level: Level,
    pub message: String,
    pub code: Option<DiagnosticCode>,
    pub span: Span,
    pub notes: Vec<String>,
}

impl Diagnostic {
    pub fn new(level: Level, code: DiagnosticCode, span: Span, args: &[String]) -> Self {
        Self { level, message: code.format(args), code: Some(code), span, notes: Vec::new() }
    }

    pub fn freeform(level: Level, message: impl Into<String>, span: Span) -> Self {
        Self { level, message: message.into(), code: None, span, notes: Vec::new() }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Renders as `<file>:<line>:<col>: <level>: <message>` (`spec.md` §6),
    /// with the offending source line underlined when a [`SourceMap`] is
    /// available.
    pub fn render(&self, sources: Option<&SourceMap>) -> String {
        let mut out = String::new();
        if let Some(sources) = sources {
            if self.span.file != crate::span::FileId::DUMMY {
                let path = sources.path(self.span.file).display();
                out.push_str(&format!(
                    "{}:{}:{}: {}: {}\n",
                    path, self.span.line, self.span.column, self.level, self.message
                ));
                let file = sources.file(self.span.file);
                let line_text = file.line_text(self.span.line);
                out.push_str(&format!("  {line_text}\n"));
                let underline_len = self.span.len().max(1) as usize;
                out.push_str(&format!(
                    "  {}{}\n",
                    " ".repeat(self.span.column.saturating_sub(1) as usize),
                    "^".repeat(underline_len)
                ));
            } else {
                out.push_str(&format!("{}: {}\n", self.level, self.message));
            }
        } else {
            out.push_str(&format!(
                "{}:{}: {}: {}\n",
                self.span.line, self.span.column, self.level, self.message
            ));
        }
        for note in &self.notes {
            out.push_str(&format!("  note: {note}\n"));
        }
        out
    }
}

/// Collects diagnostics for one compilation and tracks whether any are
/// fatal. `spec.md` §5: "a monotonically-increasing error counter;
/// `hasErrors()` after a phase gates subsequent phases."
#[derive(Default)]
pub struct DiagnosticEngine {
    diagnostics: Vec<Diagnostic>,
    error_count: u32,
}

impl DiagnosticEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, diag: Diagnostic) {
        if diag.level == Level::Error {
            self.error_count += 1;
        }
        self.diagnostics.push(diag);
    }

    pub fn error(&mut self, code: DiagnosticCode, span: Span, args: &[String]) {
        self.emit(Diagnostic::new(Level::Error, code, span, args));
    }

    pub fn warning(&mut self, code: DiagnosticCode, span: Span, args: &[String]) {
        self.emit(Diagnostic::new(Level::Warning, code, span, args));
    }

    pub fn has_errors(&self) -> bool {
        self.error_count > 0
    }

    pub fn error_count(&self) -> u32 {
        self.error_count
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Renders every collected diagnostic, in emission order.
    pub fn render_all(&self, sources: Option<&SourceMap>) -> String {
        self.diagnostics.iter().map(|d| d.render(sources)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::FileId;

    #[test]
    fn has_errors_only_counts_error_level() {
        let mut engine = DiagnosticEngine::new();
        engine.warning(WARN_ZERO_STEP, Span::point(0, 1, 1, FileId::DUMMY), &[]);
        assert!(!engine.has_errors());
        engine.error(SEM_UNDEFINED_IDENT, Span::point(0, 1, 1, FileId::DUMMY), &["X".into()]);
        assert!(engine.has_errors());
        assert_eq!(engine.error_count(), 1);
    }

    #[test]
    fn render_includes_message() {
        let mut engine = DiagnosticEngine::new();
        engine.error(SEM_REDEFINITION, Span::point(0, 3, 5, FileId::DUMMY), &["X".into()]);
        let rendered = engine.render_all(None);
        assert!(rendered.contains("X"));
        assert!(rendered.contains("error"));
    }
}
