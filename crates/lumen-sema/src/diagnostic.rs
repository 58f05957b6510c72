//! Diagnostic rendering
//!
//! Wraps accumulated `SemError`s into codespan-reporting diagnostics with
//! source context and stable error codes, for the surrounding tooling to
//! present. Rendering is presentation only; success/failure is decided by
//! the error count in the sink.

use codespan_reporting::diagnostic::{Diagnostic as CsDiagnostic, Label, Severity};
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use lumen_ast::Span;
use termcolor::{ColorChoice, StandardStream};

use crate::error::SemError;

/// A diagnostic message with source code context.
pub struct Diagnostic {
    inner: CsDiagnostic<usize>,
}

impl Diagnostic {
    /// Create an error diagnostic.
    pub fn error(message: impl Into<String>) -> Self {
        Diagnostic {
            inner: CsDiagnostic::new(Severity::Error).with_message(message),
        }
    }

    /// Set the error code.
    pub fn with_code(mut self, code: &'static str) -> Self {
        self.inner = self.inner.with_code(code);
        self
    }

    /// Add the primary label (main error location).
    pub fn with_primary_label(
        mut self,
        file_id: usize,
        span: Span,
        message: impl Into<String>,
    ) -> Self {
        let label = Label::primary(file_id, span.start as usize..span.end as usize)
            .with_message(message);
        self.inner = self.inner.with_labels(vec![label]);
        self
    }

    /// Add a note (additional context).
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.inner.notes.push(note.into());
        self
    }

    /// Create a diagnostic from a semantic error.
    pub fn from_sem_error(error: &SemError, file_id: usize) -> Self {
        let span = error.span();
        let diag = Diagnostic::error(error.to_string()).with_code(error_code(error));

        match error {
            SemError::DuplicateLabel { .. } => {
                diag.with_primary_label(file_id, span, "label redeclared here")
            }
            SemError::UnresolvedLabel { .. } => {
                diag.with_primary_label(file_id, span, "no enclosing statement with this label")
            }
            SemError::BreakOutsideLoopOrSwitch { .. } => {
                diag.with_primary_label(file_id, span, "not inside a loop or switch")
            }
            SemError::ContinueOutsideLoop { .. } => {
                diag.with_primary_label(file_id, span, "not inside a loop")
            }
            SemError::ContinueTargetNotLoop { .. } => diag
                .with_primary_label(file_id, span, "labeled statement is not a loop")
                .with_note("'continue' can only target a loop; 'break' accepts any label"),
            SemError::InvalidAssignmentTarget { .. } => diag.with_primary_label(
                file_id,
                span,
                "only variables and properties can be assigned",
            ),
            SemError::InvalidDeclarationName { .. } => {
                diag.with_primary_label(file_id, span, "restricted name in strict mode")
            }
            SemError::DuplicateStrictParam { .. } => {
                diag.with_primary_label(file_id, span, "parameter repeated")
            }
            SemError::DeleteOfIdentifier { .. } => {
                diag.with_primary_label(file_id, span, "operand must be a property reference")
            }
            SemError::ReturnOutsideFunction { .. } => {
                diag.with_primary_label(file_id, span, "top-level return")
            }
        }
    }

    /// Emit the diagnostic to stderr with colors.
    pub fn emit(
        &self,
        files: &SimpleFiles<String, String>,
    ) -> Result<(), codespan_reporting::files::Error> {
        let mut writer = StandardStream::stderr(ColorChoice::Auto);
        let config = term::Config::default();
        term::emit(&mut writer, &config, files, &self.inner)
    }

    /// The underlying codespan diagnostic (for testing/custom rendering).
    pub fn inner(&self) -> &CsDiagnostic<usize> {
        &self.inner
    }
}

/// Stable error code for a semantic error.
pub fn error_code(error: &SemError) -> &'static str {
    match error {
        SemError::DuplicateLabel { .. } => "E1001",
        SemError::UnresolvedLabel { .. } => "E1002",
        SemError::BreakOutsideLoopOrSwitch { .. } => "E1003",
        SemError::ContinueOutsideLoop { .. } => "E1004",
        SemError::ContinueTargetNotLoop { .. } => "E1005",
        SemError::InvalidAssignmentTarget { .. } => "E1006",
        SemError::InvalidDeclarationName { .. } => "E1007",
        SemError::DuplicateStrictParam { .. } => "E1008",
        SemError::DeleteOfIdentifier { .. } => "E1009",
        SemError::ReturnOutsideFunction { .. } => "E1010",
    }
}

/// Helper to create a `SimpleFiles` instance from one source buffer.
pub fn create_files(name: impl Into<String>, source: impl Into<String>) -> SimpleFiles<String, String> {
    let mut files = SimpleFiles::new();
    files.add(name.into(), source.into());
    files
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_sem_error() {
        let err = SemError::DuplicateLabel {
            name: "outer".to_string(),
            span: Span::new(4, 9),
        };
        let diag = Diagnostic::from_sem_error(&err, 0);
        assert_eq!(diag.inner().severity, Severity::Error);
        assert_eq!(diag.inner().code.as_deref(), Some("E1001"));
        assert!(diag.inner().message.contains("outer"));
        assert_eq!(diag.inner().labels[0].range, 4..9);
    }

    #[test]
    fn test_error_codes_are_distinct() {
        let errors = [
            SemError::DuplicateLabel {
                name: String::new(),
                span: Span::DUMMY,
            },
            SemError::UnresolvedLabel {
                name: String::new(),
                span: Span::DUMMY,
            },
            SemError::BreakOutsideLoopOrSwitch { span: Span::DUMMY },
            SemError::ContinueOutsideLoop { span: Span::DUMMY },
            SemError::ContinueTargetNotLoop {
                name: String::new(),
                span: Span::DUMMY,
            },
            SemError::InvalidAssignmentTarget { span: Span::DUMMY },
            SemError::InvalidDeclarationName {
                name: String::new(),
                span: Span::DUMMY,
            },
            SemError::DuplicateStrictParam {
                name: String::new(),
                span: Span::DUMMY,
            },
            SemError::DeleteOfIdentifier { span: Span::DUMMY },
            SemError::ReturnOutsideFunction { span: Span::DUMMY },
        ];
        let mut codes: Vec<_> = errors.iter().map(error_code).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }
}
