//! Diagnostic codes and the diagnostic record itself.

use crate::span::Span;
use serde::{Deserialize, Serialize};

/// Severity level of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    /// Informational, e.g. which variables a worker receives per call
    Hint,
    /// The file was transformed but an annotation was ignored
    Warning,
    /// The file could not be transformed
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Hint => "hint",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Diagnostic codes, grouped by the stage that raises them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticCode {
    // Parsing (P001-P099)
    /// Input source failed to parse
    ParseError,
    /// Source assembled after splicing failed to parse
    OutputParseError,

    // Sanitization (S001-S099)
    /// Type stripping failed on an extracted function
    TypeStripFailed,
    /// Extracted text did not normalize to a function literal
    NotAFunctionLiteral,

    // Annotations (A001-A099)
    /// Marked declaration has a shape that cannot be relocated
    UnclassifiedDeclaration,
    /// Marker attached to a statement kind the locator ignores
    UnsupportedMarkerTarget,
    /// Relocated function reads variables from enclosing scopes
    CapturedVariables,

    // Internal (I001-I099)
    /// Internal transform error (template or splice bookkeeping)
    InternalError,
}

impl DiagnosticCode {
    /// Every code, in explain order.
    pub const ALL: &'static [DiagnosticCode] = &[
        Self::ParseError,
        Self::OutputParseError,
        Self::TypeStripFailed,
        Self::NotAFunctionLiteral,
        Self::UnclassifiedDeclaration,
        Self::UnsupportedMarkerTarget,
        Self::CapturedVariables,
        Self::InternalError,
    ];

    /// The stable code string (e.g. "A001").
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ParseError => "P001",
            Self::OutputParseError => "P002",
            Self::TypeStripFailed => "S001",
            Self::NotAFunctionLiteral => "S002",
            Self::UnclassifiedDeclaration => "A001",
            Self::UnsupportedMarkerTarget => "A002",
            Self::CapturedVariables => "A003",
            Self::InternalError => "I001",
        }
    }

    /// Look up a code by its string form, case-insensitively.
    pub fn parse(code: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(code))
    }

    pub fn default_severity(&self) -> Severity {
        match self {
            Self::ParseError
            | Self::OutputParseError
            | Self::TypeStripFailed
            | Self::NotAFunctionLiteral
            | Self::InternalError => Severity::Error,

            Self::UnclassifiedDeclaration | Self::UnsupportedMarkerTarget => Severity::Warning,

            Self::CapturedVariables => Severity::Hint,
        }
    }
}

impl std::fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single reported problem or note.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub code: DiagnosticCode,
    pub severity: Severity,
    /// Single-line message
    pub message: String,
    /// Primary location; `Span::DUMMY` when unknown
    pub span: Span,
    /// Optional help line
    pub help: Option<String>,
    /// Extra notes rendered after the snippet
    pub notes: Vec<String>,
}

impl Diagnostic {
    pub fn error(code: DiagnosticCode, message: impl Into<String>) -> DiagnosticBuilder {
        DiagnosticBuilder::new(code, Severity::Error, message)
    }

    pub fn warning(code: DiagnosticCode, message: impl Into<String>) -> DiagnosticBuilder {
        DiagnosticBuilder::new(code, Severity::Warning, message)
    }

    pub fn hint(code: DiagnosticCode, message: impl Into<String>) -> DiagnosticBuilder {
        DiagnosticBuilder::new(code, Severity::Hint, message)
    }

    /// Create a diagnostic with the code's default severity.
    pub fn new(code: DiagnosticCode, message: impl Into<String>) -> DiagnosticBuilder {
        DiagnosticBuilder::new(code, code.default_severity(), message)
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    pub fn is_warning(&self) -> bool {
        self.severity == Severity::Warning
    }
}

/// Builder for constructing diagnostics fluently.
pub struct DiagnosticBuilder {
    inner: Diagnostic,
}

impl DiagnosticBuilder {
    pub fn new(code: DiagnosticCode, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            inner: Diagnostic {
                code,
                severity,
                message: message.into(),
                span: Span::DUMMY,
                help: None,
                notes: Vec::new(),
            },
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.inner.span = span;
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.inner.help = Some(help.into());
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.inner.notes.push(note.into());
        self
    }

    pub fn build(self) -> Diagnostic {
        self.inner
    }
}

/// An ordered collection of diagnostics.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    pub items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.items.push(diagnostic);
    }

    pub fn extend(&mut self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        self.items.extend(diagnostics);
    }

    pub fn has_errors(&self) -> bool {
        self.items.iter().any(|d| d.is_error())
    }

    pub fn error_count(&self) -> usize {
        self.items.iter().filter(|d| d.is_error()).count()
    }

    pub fn warning_count(&self) -> usize {
        self.items.iter().filter(|d| d.is_warning()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
