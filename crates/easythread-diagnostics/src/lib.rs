//! Diagnostic reporting for the easythread transform.
//!
//! Diagnostics carry a stable code (`P001`, `A002`, ...), a severity, a
//! message and an optional byte span into a file held by a [`SourceCache`].
//! Emitters render them for terminals or as line-delimited JSON.
//!
//! # Example
//!
//! ```
//! use easythread_diagnostics::{
//!     Diagnostic, DiagnosticCode, DiagnosticEmitter, SourceCache, Span, TerminalEmitter,
//! };
//!
//! let mut cache = SourceCache::new();
//! let file_id = cache.add_file("worker.ts", "// @easythread\nclass Heavy {}".to_string());
//!
//! let diag = Diagnostic::new(
//!     DiagnosticCode::UnsupportedMarkerTarget,
//!     "marker is attached to a class declaration",
//! )
//! .with_span(Span::new(file_id, 15, 29))
//! .with_help("only functions, function variables and zero-argument IIFEs can move to a worker")
//! .build();
//!
//! let mut emitter = TerminalEmitter::new(std::io::sink(), false);
//! emitter.emit(&diag, &cache).unwrap();
//! ```

pub mod diagnostic;
pub mod emitter;
pub mod source_cache;
pub mod span;

pub use diagnostic::{Diagnostic, DiagnosticBuilder, DiagnosticCode, Diagnostics, Severity};
pub use emitter::{DiagnosticEmitter, JsonEmitter, TerminalEmitter};
pub use source_cache::{SourceCache, SourceFile};
pub use span::{FileId, Location, Span};
