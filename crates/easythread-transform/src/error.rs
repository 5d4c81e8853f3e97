//! Errors raised while transforming a module.

use easythread_diagnostics::{Diagnostic, DiagnosticCode, FileId, Span};
use easythread_parser::HostError;
use thiserror::Error;

/// A fatal transform failure. Nothing is written for the module.
#[derive(Debug, Clone, Error)]
pub enum TransformError {
    #[error("failed to parse module: {0}")]
    Parse(HostError),

    #[error("failed to strip types from `{binding}`: {source}")]
    TypeStrip {
        binding: String,
        /// Offset of the declaration in the original module
        offset: usize,
        source: HostError,
    },

    #[error("`{binding}` does not reduce to a function literal: `{fragment}`")]
    NotAFunction {
        binding: String,
        offset: usize,
        fragment: String,
    },

    #[error("generated module failed to parse: {0}")]
    Regenerate(HostError),

    #[error("failed to print module: {0}")]
    Print(HostError),

    #[error("template `{template}` has no value for placeholder `{key}`")]
    Template { template: &'static str, key: String },

    #[error("replacement at byte {start} overlaps the previous one ending at {previous_end}")]
    OverlappingReplacement { start: usize, previous_end: usize },

    #[error("replacement {start}..{end} is outside the {len}-byte module")]
    ReplacementOutOfBounds { start: usize, end: usize, len: usize },
}

impl TransformError {
    pub fn code(&self) -> DiagnosticCode {
        match self {
            Self::Parse(_) => DiagnosticCode::ParseError,
            Self::Regenerate(_) => DiagnosticCode::OutputParseError,
            Self::TypeStrip { .. } => DiagnosticCode::TypeStripFailed,
            Self::NotAFunction { .. } => DiagnosticCode::NotAFunctionLiteral,
            Self::Print(_)
            | Self::Template { .. }
            | Self::OverlappingReplacement { .. }
            | Self::ReplacementOutOfBounds { .. } => DiagnosticCode::InternalError,
        }
    }

    /// Byte offset into the original module, when one is known.
    ///
    /// Offsets inside regenerated text are not reported since they do not
    /// point into the file the user wrote.
    pub fn offset(&self) -> Option<usize> {
        match self {
            Self::Parse(e) => e.offset,
            Self::TypeStrip { offset, .. } | Self::NotAFunction { offset, .. } => Some(*offset),
            _ => None,
        }
    }

    /// Render as a diagnostic against `file`.
    pub fn to_diagnostic(&self, file: FileId) -> Diagnostic {
        let mut builder = Diagnostic::new(self.code(), self.to_string());
        if let Some(offset) = self.offset() {
            builder = builder.with_span(Span::point(file, offset));
        }
        match self {
            Self::NotAFunction { .. } => builder
                .with_help("annotate a function declaration, a variable bound to a function, or a zero-argument IIFE")
                .build(),
            Self::Regenerate(_) => builder
                .with_help("this is a bug in the transform, please report it with the input file")
                .build(),
            _ => builder.build(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        let parse = TransformError::Parse(HostError::at("Unexpected token", 4));
        assert_eq!(parse.code(), DiagnosticCode::ParseError);
        assert_eq!(parse.offset(), Some(4));

        let template = TransformError::Template {
            template: "worker",
            key: "args".into(),
        };
        assert_eq!(template.code(), DiagnosticCode::InternalError);
        assert_eq!(template.offset(), None);
    }

    #[test]
    fn test_to_diagnostic_span() {
        let err = TransformError::NotAFunction {
            binding: "task".into(),
            offset: 12,
            fragment: "42".into(),
        };
        let diag = err.to_diagnostic(FileId(0));
        assert_eq!(diag.code, DiagnosticCode::NotAFunctionLiteral);
        assert_eq!(diag.span.start, 12);
        assert!(diag.message.contains("`task`"));
        assert!(diag.help.is_some());
    }
}
