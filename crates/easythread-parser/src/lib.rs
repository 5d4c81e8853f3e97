//! Parse, print and type-strip capability backed by SWC.
//!
//! The transform engine never talks to SWC's lexer, emitter or passes
//! directly. It goes through [`SyntaxHost`], which this crate implements
//! with [`SwcHost`]. A parse produces a [`ParsedSource`]: the original text,
//! its module tree and its comment table, plus helpers to map SWC byte
//! positions back to offsets in the text.

use std::ops::Range;
use std::path::Path;

use swc_common::comments::{Comment, Comments, SingleThreadedComments};
use swc_common::{input::StringInput, sync::Lrc, FileName, Globals, Mark, SourceMap, GLOBALS};
use swc_ecma_ast::{EsVersion, Module, Program};
use swc_ecma_codegen::{text_writer::JsWriter, Emitter};
use swc_ecma_parser::{lexer::Lexer, Parser, Syntax, TsSyntax};
use thiserror::Error;

// Re-export AST types for consumers that need to inspect the AST
pub use swc_ecma_ast;

pub use swc_common::{BytePos, Spanned};

/// Failure reported by a [`SyntaxHost`] operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct HostError {
    pub message: String,
    /// Byte offset into the text that was handed to the host
    pub offset: Option<usize>,
}

impl HostError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            offset: None,
        }
    }

    pub fn at(message: impl Into<String>, offset: usize) -> Self {
        Self {
            message: message.into(),
            offset: Some(offset),
        }
    }
}

/// Source flavour accepted by the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    /// TypeScript without JSX (`.ts`, `.mts`, `.cts`)
    TypeScript,
    /// TypeScript with JSX. Plain JavaScript and JSX parse this way too.
    #[default]
    Tsx,
}

impl Dialect {
    /// Pick the dialect from a file path or bundler module id.
    ///
    /// `.ts` files must not enable JSX because `<T>expr` casts would then
    /// be read as elements.
    pub fn for_path(path: impl AsRef<Path>) -> Self {
        match path.as_ref().extension().and_then(|e| e.to_str()) {
            Some("ts" | "mts" | "cts") => Dialect::TypeScript,
            _ => Dialect::Tsx,
        }
    }

    fn syntax(self) -> Syntax {
        Syntax::Typescript(TsSyntax {
            tsx: self == Dialect::Tsx,
            decorators: true,
            dts: false,
            no_early_errors: false,
            disallow_ambiguous_jsx_like: false,
        })
    }
}

/// A parsed module together with the text it came from.
pub struct ParsedSource {
    text: String,
    module: Module,
    comments: SingleThreadedComments,
    cm: Lrc<SourceMap>,
    base: BytePos,
}

impl std::fmt::Debug for ParsedSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParsedSource")
            .field("text", &self.text)
            .field("module", &self.module)
            .finish_non_exhaustive()
    }
}

impl ParsedSource {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn module(&self) -> &Module {
        &self.module
    }

    pub fn comments(&self) -> &SingleThreadedComments {
        &self.comments
    }

    /// Byte offset of an SWC position within [`Self::text`].
    pub fn offset(&self, pos: BytePos) -> usize {
        pos.0.saturating_sub(self.base.0) as usize
    }

    /// Byte range of an SWC span within [`Self::text`].
    pub fn range(&self, span: swc_common::Span) -> Range<usize> {
        self.offset(span.lo)..self.offset(span.hi)
    }

    /// The original text covered by `span`.
    pub fn slice(&self, span: swc_common::Span) -> &str {
        let range = self.range(span);
        self.text.get(range).unwrap_or_default()
    }

    /// Comments that end immediately before `pos`, in source order.
    pub fn leading_comments(&self, pos: BytePos) -> Vec<Comment> {
        self.comments.get_leading(pos).unwrap_or_default()
    }
}

/// The parse/print/strip capability the transform is written against.
pub trait SyntaxHost {
    /// Parse a whole module. Recoverable parser errors are fatal.
    fn parse(&self, text: &str) -> Result<ParsedSource, HostError>;

    /// Print a parsed module back to text, keeping comments.
    fn print(&self, parsed: &ParsedSource) -> Result<String, HostError>;

    /// Remove type annotations from a standalone fragment.
    fn strip_types(&self, fragment: &str) -> Result<String, HostError>;
}

/// [`SyntaxHost`] implementation on top of SWC.
#[derive(Debug, Clone, Copy, Default)]
pub struct SwcHost {
    dialect: Dialect,
}

impl SwcHost {
    pub fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }
}

impl SyntaxHost for SwcHost {
    fn parse(&self, text: &str) -> Result<ParsedSource, HostError> {
        let cm: Lrc<SourceMap> = Default::default();
        let source_file =
            cm.new_source_file(Lrc::new(FileName::Anon), text.to_string());
        let base = source_file.start_pos;
        let comments = SingleThreadedComments::default();

        let lexer = Lexer::new(
            self.dialect.syntax(),
            EsVersion::Es2022,
            StringInput::from(&*source_file),
            Some(&comments as &dyn Comments),
        );
        let mut parser = Parser::new_from(lexer);

        let to_error = |e: swc_ecma_parser::error::Error| {
            HostError::at(
                e.kind().msg().to_string(),
                e.span().lo.0.saturating_sub(base.0) as usize,
            )
        };

        let module = parser.parse_module().map_err(to_error)?;
        let recovered = parser.take_errors();
        if let Some(error) = recovered.first() {
            log::debug!("parser recovered from {} error(s)", recovered.len());
            return Err(to_error(error.clone()));
        }
        log::trace!("parsed {} module items", module.body.len());

        Ok(ParsedSource {
            text: text.to_string(),
            module,
            comments,
            cm,
            base,
        })
    }

    fn print(&self, parsed: &ParsedSource) -> Result<String, HostError> {
        emit(&parsed.cm, &parsed.module, Some(&parsed.comments))
    }

    fn strip_types(&self, fragment: &str) -> Result<String, HostError> {
        let parsed = self.parse(fragment)?;
        log::trace!("stripping types from {} byte fragment", fragment.len());
        let ParsedSource {
            module,
            comments,
            cm,
            ..
        } = parsed;

        let stripped = GLOBALS.set(&Globals::new(), || {
            let unresolved_mark = Mark::new();
            let top_level_mark = Mark::new();
            Program::Module(module)
                .apply(swc_ecma_transforms_base::resolver(
                    unresolved_mark,
                    top_level_mark,
                    true,
                ))
                .apply(swc_ecma_transforms_typescript::strip(
                    unresolved_mark,
                    top_level_mark,
                ))
        });

        match stripped {
            Program::Module(module) => emit(&cm, &module, Some(&comments)),
            _ => Err(HostError::new("type stripping did not produce a module")),
        }
    }
}

fn emit(
    cm: &Lrc<SourceMap>,
    module: &Module,
    comments: Option<&SingleThreadedComments>,
) -> Result<String, HostError> {
    let mut buf = Vec::new();
    {
        let mut emitter = Emitter {
            cfg: swc_ecma_codegen::Config::default(),
            cm: cm.clone(),
            comments: comments.map(|c| c as &dyn Comments),
            wr: JsWriter::new(cm.clone(), "\n", &mut buf, None),
        };
        emitter
            .emit_module(module)
            .map_err(|e| HostError::new(format!("failed to print module: {}", e)))?;
    }
    String::from_utf8(buf).map_err(|e| HostError::new(format!("printer produced invalid UTF-8: {}", e)))
}
