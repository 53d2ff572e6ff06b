use std::ops::Range;

use codespan_reporting::diagnostic::{Diagnostic, Label};

/// Faults raised while evaluating a program.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RuntimeError {
    #[error("type error: expected {expected}, got {got}")]
    TypeError { expected: String, got: String },
    #[error("undefined variable: {0}")]
    UndefinedVariable(String),
    #[error("unknown function: {0}")]
    UnknownFunction(String),
    #[error("{name} expects {expected} argument(s), got {got}")]
    Arity {
        name: String,
        expected: usize,
        got: usize,
    },
    #[error("division by zero")]
    DivisionByZero,
    #[error("I/O error: {0}")]
    IoError(String),
    #[error("stack overflow")]
    StackOverflow,
    /// Raised by the program itself through `error(..)`.
    #[error("{0}")]
    Custom(String),
}

/// Parse errors with source location information.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct ParseError {
    pub message: String,
    pub span: Range<usize>,
    pub notes: Vec<String>,
}

impl ParseError {
    pub fn error(message: impl Into<String>, span: Range<usize>) -> Self {
        ParseError {
            message: message.into(),
            span,
            notes: Vec::new(),
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }
}

/// Anything that stops a code block: a parse error or a runtime fault,
/// both located in the block's text when possible.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("runtime error: {error}")]
    Runtime {
        error: RuntimeError,
        span: Option<Range<usize>>,
    },
}

impl Error {
    pub fn runtime(error: RuntimeError, span: Range<usize>) -> Self {
        Error::Runtime {
            error,
            span: Some(span),
        }
    }

    pub fn span(&self) -> Option<Range<usize>> {
        match self {
            Error::Parse(e) => Some(e.span.clone()),
            Error::Runtime { span, .. } => span.clone(),
        }
    }

    /// Convert to a codespan-reporting Diagnostic for display.
    pub fn to_diagnostic<FileId: Copy>(&self, file_id: FileId) -> Diagnostic<FileId> {
        let (message, notes) = match self {
            Error::Parse(e) => (e.message.clone(), e.notes.clone()),
            Error::Runtime { error, .. } => (error.to_string(), Vec::new()),
        };
        let labels = self
            .span()
            .map(|span| vec![Label::primary(file_id, span)])
            .unwrap_or_default();
        Diagnostic::error()
            .with_message(message)
            .with_labels(labels)
            .with_notes(notes)
    }
}

impl From<RuntimeError> for Error {
    fn from(error: RuntimeError) -> Self {
        Error::Runtime { error, span: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostic_points_at_span() {
        let err = Error::runtime(RuntimeError::UndefinedVariable("x".to_string()), 4..5);
        let diagnostic = err.to_diagnostic(0usize);
        assert_eq!(diagnostic.message, "undefined variable: x");
        assert_eq!(diagnostic.labels.len(), 1);
        assert_eq!(diagnostic.labels[0].range, 4..5);
    }

    #[test]
    fn unlocated_runtime_error_has_no_label() {
        let err = Error::from(RuntimeError::DivisionByZero);
        assert!(err.to_diagnostic(0usize).labels.is_empty());
        assert_eq!(err.to_string(), "runtime error: division by zero");
    }
}
