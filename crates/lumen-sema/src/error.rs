//! Semantic errors and the accumulating diagnostic sink

use lumen_ast::Span;
use thiserror::Error;

/// A semantic error found during validation.
///
/// These describe invalid user source; they are recorded and traversal
/// continues, so one run surfaces as many independent errors as possible.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SemError {
    /// Two labels with the same name in the same function scope.
    #[error("label '{name}' is already declared")]
    DuplicateLabel {
        /// The label name.
        name: String,
        /// Location of the duplicate.
        span: Span,
    },

    /// break/continue names a label that is not in scope.
    #[error("label '{name}' is not defined")]
    UnresolvedLabel {
        /// The label name.
        name: String,
        /// Location of the reference.
        span: Span,
    },

    /// Unlabeled break with no enclosing loop or switch.
    #[error("'break' must be inside a loop or switch")]
    BreakOutsideLoopOrSwitch {
        /// Location of the statement.
        span: Span,
    },

    /// Unlabeled continue with no enclosing loop.
    #[error("'continue' must be inside a loop")]
    ContinueOutsideLoop {
        /// Location of the statement.
        span: Span,
    },

    /// `continue label` where the label does not target a loop.
    #[error("'continue' label '{name}' must name a loop")]
    ContinueTargetNotLoop {
        /// The label name.
        name: String,
        /// Location of the statement.
        span: Span,
    },

    /// Assignment, update or for-in target is not assignable.
    #[error("invalid assignment target")]
    InvalidAssignmentTarget {
        /// Location of the target expression.
        span: Span,
    },

    /// `eval`/`arguments` used as a declaration target in strict mode.
    #[error("cannot declare '{name}' in strict mode")]
    InvalidDeclarationName {
        /// The offending name.
        name: String,
        /// Location of the declaration.
        span: Span,
    },

    /// Duplicate parameter name in a strict-mode function.
    #[error("duplicate parameter name '{name}' not allowed in strict mode")]
    DuplicateStrictParam {
        /// The parameter name.
        name: String,
        /// Location of the duplicate parameter.
        span: Span,
    },

    /// `delete` applied to a bare identifier in strict mode.
    #[error("cannot delete a variable in strict mode")]
    DeleteOfIdentifier {
        /// Location of the expression.
        span: Span,
    },

    /// `return` at the top level, outside any function.
    #[error("'return' must be inside a function")]
    ReturnOutsideFunction {
        /// Location of the statement.
        span: Span,
    },
}

impl SemError {
    /// The source range the error points at.
    pub fn span(&self) -> Span {
        match self {
            SemError::DuplicateLabel { span, .. }
            | SemError::UnresolvedLabel { span, .. }
            | SemError::BreakOutsideLoopOrSwitch { span }
            | SemError::ContinueOutsideLoop { span }
            | SemError::ContinueTargetNotLoop { span, .. }
            | SemError::InvalidAssignmentTarget { span }
            | SemError::InvalidDeclarationName { span, .. }
            | SemError::DuplicateStrictParam { span, .. }
            | SemError::DeleteOfIdentifier { span }
            | SemError::ReturnOutsideFunction { span } => *span,
        }
    }
}

/// Accumulates semantic errors across a validation run.
///
/// Callers determine success by comparing error counts before and after,
/// never via an unwinding error path.
#[derive(Debug, Default)]
pub struct DiagnosticSink {
    errors: Vec<SemError>,
}

impl DiagnosticSink {
    /// Create an empty sink.
    pub fn new() -> Self {
        DiagnosticSink { errors: Vec::new() }
    }

    /// Record an error; traversal continues.
    pub fn error(&mut self, err: SemError) {
        self.errors.push(err);
    }

    /// Number of errors recorded so far.
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// The accumulated errors, in discovery order.
    pub fn errors(&self) -> &[SemError] {
        &self.errors
    }

    /// True if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sink_accumulates() {
        let mut sink = DiagnosticSink::new();
        assert!(sink.is_empty());
        sink.error(SemError::ReturnOutsideFunction {
            span: Span::new(1, 7),
        });
        sink.error(SemError::DeleteOfIdentifier {
            span: Span::new(9, 17),
        });
        assert_eq!(sink.error_count(), 2);
        assert_eq!(sink.errors()[0].span(), Span::new(1, 7));
    }

    #[test]
    fn test_error_display() {
        let err = SemError::UnresolvedLabel {
            name: "outer".to_string(),
            span: Span::DUMMY,
        };
        assert_eq!(format!("{}", err), "label 'outer' is not defined");
    }
}
