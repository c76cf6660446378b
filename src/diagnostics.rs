//! Compiler diagnostics.
//!
//! Both pipeline stages report problems with the same [`Diagnostic`] type: the
//! frontend for syntax and binding problems, the backend for constructs that
//! cannot be lowered for the selected Lua target. The harness never filters
//! by category; any diagnostic at all fails a run.

use std::fmt;

/// Severity of a diagnostic, mirroring the categories a TypeScript frontend reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticCategory {
    Warning,
    Error,
    Suggestion,
    Message,
}

impl DiagnosticCategory {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Suggestion => "suggestion",
            Self::Message => "message",
        }
    }
}

/// 1-based position of a diagnostic inside a source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub file_name: String,
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub category: DiagnosticCategory,
    pub code: u32,
    pub message_text: String,
    pub location: Option<Location>,
}

impl Diagnostic {
    pub fn error(code: u32, message_text: impl Into<String>) -> Self {
        Self {
            category: DiagnosticCategory::Error,
            code,
            message_text: message_text.into(),
            location: None,
        }
    }

    /// An informational diagnostic. Still counts as a failure for the harness.
    pub fn message(code: u32, message_text: impl Into<String>) -> Self {
        Self {
            category: DiagnosticCategory::Message,
            code,
            message_text: message_text.into(),
            location: None,
        }
    }

    /// Attach a location computed from a byte offset into `text`.
    pub fn at(mut self, file_name: &str, text: &str, offset: usize) -> Self {
        let (line, column) = line_column(text, offset);
        self.location = Some(Location {
            file_name: file_name.to_string(),
            line,
            column,
        });
        self
    }

    pub fn is_error(&self) -> bool {
        self.category == DiagnosticCategory::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(location) = &self.location {
            write!(
                f,
                "{}({},{}): ",
                location.file_name, location.line, location.column
            )?;
        }
        write!(
            f,
            "{} TS{}: {}",
            self.category.as_str(),
            self.code,
            self.message_text
        )
    }
}

/// Convert a byte offset into a 1-based (line, column) pair.
pub fn line_column(text: &str, offset: usize) -> (usize, usize) {
    let offset = offset.min(text.len());
    let before = &text[..offset];
    let line = before.matches('\n').count() + 1;
    let column = match before.rfind('\n') {
        Some(newline) => before[newline + 1..].chars().count() + 1,
        None => before.chars().count() + 1,
    };
    (line, column)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_column_is_one_based() {
        let text = "const a = 1;\nfoo();";
        assert_eq!(line_column(text, 0), (1, 1));
        assert_eq!(line_column(text, 13), (2, 1));
        assert_eq!(line_column(text, 16), (2, 4));
    }

    #[test]
    fn display_includes_location_and_code() {
        let diagnostic = Diagnostic::error(2304, "Cannot find name 'foo'.").at(
            "input.ts",
            "const a = 1;\nfoo();",
            13,
        );
        assert_eq!(
            diagnostic.to_string(),
            "input.ts(2,1): error TS2304: Cannot find name 'foo'."
        );
    }

    #[test]
    fn informational_diagnostics_are_not_errors() {
        let diagnostic = Diagnostic::message(6000, "note");
        assert!(!diagnostic.is_error());
        assert_eq!(diagnostic.to_string(), "message TS6000: note");
    }
}
