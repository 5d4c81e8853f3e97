//! Moves annotated functions into Web Workers.
//!
//! A function marked with `// @easythread` (or `/* @easythread */`,
//! `/** @easythread */`) is rewritten into a proxy with the same name. Each
//! call to the proxy starts a worker running a copy of the original
//! function, posts the arguments, and resolves with the worker's reply.
//!
//! The pipeline for one module:
//!
//! 1. locate marked statements (`locate`)
//! 2. classify their shape (`classify`)
//! 3. strip types and cut each function down to a literal (`sanitize`)
//! 4. find the outer variables each function reads (`freevars`)
//! 5. render worker script and proxy from [`templates`]
//! 6. splice the replacements into the original text and reprint
//!
//! Parsing, printing and type stripping go through an injected
//! [`SyntaxHost`].

pub mod builtins;
mod classify;
pub mod error;
mod freevars;
pub mod hook;
mod locate;
pub mod names;
pub mod options;
pub mod protocol;
mod sanitize;
mod scope;
mod splice;
mod synth;
pub mod templates;
#[cfg(test)]
mod worker_runtime;

use std::ops::Range;

use easythread_diagnostics::{Diagnostic, DiagnosticCode, Diagnostics, FileId, Span};
use easythread_parser::SyntaxHost;
use serde::Serialize;

use crate::classify::Classified;
use crate::freevars::FreeVariables;
use crate::names::NameGenerator;
use crate::synth::{Relocation, Synthesizer};

pub use classify::{ExportedShape, Shape};
pub use error::TransformError;
pub use hook::{transform_module, HookOutput};
pub use options::{CaptureMode, TransformOptions};
pub use splice::{splice, ReplacementSpan};

/// What happened to one marked declaration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeclarationReport {
    pub shape: Shape,
    /// Byte range of the declaration in the original module
    pub range: Range<usize>,
    pub functions: Vec<FunctionReport>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionReport {
    /// Proxy name; `None` for an immediately-invoked function
    pub binding: Option<String>,
    /// Outer variables forwarded with every call
    pub captured: Vec<String>,
}

#[derive(Debug)]
pub struct TransformOutput {
    pub code: String,
    pub declarations: Vec<DeclarationReport>,
    /// Warnings and hints; errors are returned as [`TransformError`]
    pub diagnostics: Diagnostics,
}

/// Runs the transform over whole modules.
pub struct Transformer<'h> {
    host: &'h dyn SyntaxHost,
    options: TransformOptions,
}

impl<'h> Transformer<'h> {
    pub fn new(host: &'h dyn SyntaxHost, options: TransformOptions) -> Self {
        Self { host, options }
    }

    pub fn options(&self) -> &TransformOptions {
        &self.options
    }

    /// Transform a module that is not tracked in a source cache.
    pub fn transform(&self, source: &str) -> Result<TransformOutput, TransformError> {
        self.transform_file(source, FileId::DUMMY)
    }

    /// Transform a module; diagnostics point into `file`.
    pub fn transform_file(
        &self,
        source: &str,
        file: FileId,
    ) -> Result<TransformOutput, TransformError> {
        let parsed = self.host.parse(source).map_err(TransformError::Parse)?;
        let marker = self.options.marker.as_str();
        let located = locate::locate(&parsed, marker);
        let mut diagnostics = Diagnostics::new();

        for misplaced in &located.misplaced {
            diagnostics.push(
                Diagnostic::new(
                    DiagnosticCode::UnsupportedMarkerTarget,
                    format!("`{}` on a {} is ignored", marker, misplaced.kind),
                )
                .with_span(Span::from_range(file, parsed.range(misplaced.span)))
                .with_help("mark a function declaration, a variable bound to a function, or a zero-argument IIFE")
                .build(),
            );
        }

        let mut declarations = Vec::new();
        for marked in &located.marked {
            match classify::classify(&parsed, marked) {
                Classified::Declaration(decl) => {
                    log::debug!("{} at {:?}", decl.shape, decl.range);
                    declarations.push(decl);
                }
                Classified::Miss { range, reason } => {
                    log::warn!("skipping marked statement at {:?}: {}", range, reason);
                    diagnostics.push(
                        Diagnostic::new(DiagnosticCode::UnclassifiedDeclaration, reason)
                            .with_span(Span::from_range(file, range))
                            .with_note("the statement is left unchanged")
                            .build(),
                    );
                }
            }
        }

        if declarations.is_empty() {
            let code = self.host.print(&parsed).map_err(TransformError::Print)?;
            return Ok(TransformOutput {
                code,
                declarations: Vec::new(),
                diagnostics,
            });
        }

        let captures = match self.options.capture {
            CaptureMode::Forward => freevars::analyze(
                parsed.module(),
                declarations.iter().flat_map(|d| d.functions()),
            ),
            CaptureMode::Disabled => FreeVariables::new(),
        };

        let mut names = NameGenerator::for_module(parsed.module());
        let mut synthesizer = Synthesizer::new(&mut names);
        let mut replacements = Vec::with_capacity(declarations.len());
        let mut reports = Vec::with_capacity(declarations.len());

        for decl in &declarations {
            let mut relocations = Vec::new();
            let mut functions = Vec::new();
            for function in decl.functions() {
                let literal = sanitize::sanitize(self.host, function)?;
                let captured = captures.get(&function.key).cloned().unwrap_or_default();
                if !captured.is_empty() {
                    diagnostics.push(
                        Diagnostic::new(
                            DiagnosticCode::CapturedVariables,
                            format!(
                                "`{}` reads {} from enclosing scopes",
                                function.display_name(),
                                captured
                                    .iter()
                                    .map(|n| format!("`{}`", n))
                                    .collect::<Vec<_>>()
                                    .join(", ")
                            ),
                        )
                        .with_span(Span::from_range(file, decl.range.clone()))
                        .with_note("their values are copied into the worker on every call")
                        .build(),
                    );
                }
                functions.push(FunctionReport {
                    binding: function.binding.clone(),
                    captured: captured.clone(),
                });
                relocations.push(Relocation {
                    function,
                    literal,
                    captured,
                });
            }

            let text = synthesizer.declaration(decl, relocations)?;
            replacements.push(ReplacementSpan {
                range: decl.range.clone(),
                text,
            });
            reports.push(DeclarationReport {
                shape: decl.shape,
                range: decl.range.clone(),
                functions,
            });
        }

        let assembled = splice::splice(source, &replacements)?;
        let code = splice::regenerate(self.host, &assembled)?;
        Ok(TransformOutput {
            code,
            declarations: reports,
            diagnostics,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use easythread_parser::{Dialect, SwcHost};

    fn run(source: &str) -> TransformOutput {
        let host = SwcHost::default();
        Transformer::new(&host, TransformOptions::default())
            .transform(source)
            .unwrap()
    }

    fn run_ts(source: &str, options: TransformOptions) -> Result<TransformOutput, TransformError> {
        let host = SwcHost::new(Dialect::TypeScript);
        Transformer::new(&host, options).transform(source)
    }

    fn reparses(code: &str) {
        if let Err(e) = SwcHost::default().parse(code) {
            panic!("output does not parse: {}\n{}", e, code);
        }
    }

    #[test]
    fn test_pass_through_without_markers() {
        let source = "import { a } from './a';\n// plain comment\nexport function add(x, y) {\n  return x + y;\n}\n";
        let host = SwcHost::default();
        let out = run(source);

        assert!(out.declarations.is_empty());
        assert!(out.diagnostics.is_empty());
        let expected = host.print(&host.parse(source).unwrap()).unwrap();
        assert_eq!(out.code, expected);
        assert!(!out.code.contains("Worker"));
    }

    #[test]
    fn test_named_function() {
        let out = run("// @easythread\nfunction heavy(n) {\n  let s = 0;\n  for (let i = 0; i < n; i++) s += i;\n  return s;\n}\nheavy(10).then(console.log);\n");

        assert_eq!(out.declarations.len(), 1);
        assert_eq!(out.declarations[0].shape, Shape::NamedFunction);
        assert!(out.code.contains("function heavy(...__easythread_args)"));
        assert!(out.code.contains("new Worker("));
        assert!(out.code.contains("heavy(10).then(console.log)"));
        assert!(out.code.contains("// @easythread"));
        reparses(&out.code);
    }

    #[test]
    fn test_all_shapes_in_one_module() {
        let out = run(
            "const base = 2;\n\
             // @easythread\nconst square = (x) => x * x;\n\
             /* @easythread */\nexport function cube(x) { return x * x * x; }\n\
             /** @easythread */\nexport let scaled = function (x) { return x * base; };\n\
             // @easythread\n(async () => { await Promise.resolve(1); })();\n",
        );

        let shapes: Vec<Shape> = out.declarations.iter().map(|d| d.shape).collect();
        assert_eq!(
            shapes,
            [
                Shape::NamedVariableFunction,
                Shape::Exported(ExportedShape::NamedFunction),
                Shape::Exported(ExportedShape::NamedVariableFunction),
                Shape::AnonymousInvocation,
            ]
        );
        assert!(out.code.contains("const square = (...__easythread_args)=>"));
        assert!(out.code.contains("export function cube(...__easythread_args)"));
        assert!(out.code.contains("export let scaled = (...__easythread_args)=>"));
        assert!(out.code.contains("(function(...__easythread_args) {"));
        assert_eq!(out.declarations[2].functions[0].captured, ["base"]);
        assert!(out.code.contains("externalVars: {\n"));
        reparses(&out.code);
    }

    #[test]
    fn test_correlation_prefixes_are_unique_per_function() {
        let out = run(
            "// @easythread\nfunction a() { return 1; }\n// @easythread\nfunction b() { return 2; }\n",
        );
        assert!(out.code.contains("\"a:0:\""));
        assert!(out.code.contains("\"b:1:\""));
        assert!(out.code.contains("__easythread_a_calls"));
        assert!(out.code.contains("__easythread_b_calls"));
    }

    #[test]
    fn test_captures_exclude_shadowed_params() {
        let out = run(
            "const x = 1;\nlet y = 2;\n// @easythread\nfunction f(x) { return x + y + y; }\n",
        );
        assert_eq!(out.declarations[0].functions[0].captured, ["y"]);
        assert_eq!(out.diagnostics.len(), 1);
        assert_eq!(
            out.diagnostics.items[0].code,
            DiagnosticCode::CapturedVariables
        );
    }

    #[test]
    fn test_capture_disabled() {
        let options = TransformOptions {
            capture: CaptureMode::Disabled,
            ..Default::default()
        };
        let out = run_ts(
            "let y = 2;\n// @easythread\nfunction f(x: number): number { return x + y; }\n",
            options,
        )
        .unwrap();
        assert!(out.declarations[0].functions[0].captured.is_empty());
        assert!(!out.code.contains("externalVars: {"));
        assert!(out.diagnostics.is_empty());
    }

    #[test]
    fn test_types_are_stripped_from_worker_only() {
        let out = run_ts(
            "interface Point { x: number }\nconst origin: Point = { x: 0 };\n\
             // @easythread\nexport async function norm(p: Point): Promise<number> { return Math.abs(p.x); }\n",
            TransformOptions::default(),
        )
        .unwrap();
        assert!(out.code.contains("interface Point"));
        assert!(out.code.contains("const origin: Point"));
        assert!(out.code.contains("async function(p) {"));
        assert!(!out.code.contains("p: Point"));
    }

    #[test]
    fn test_classification_miss_keeps_statement() {
        let out = run("// @easythread\n(function (a) { return a; })(5);\nexport class Kept {}\n");
        assert!(out.declarations.is_empty());
        assert!(out.code.contains("(function(a) {"));
        assert!(out.code.contains("})(5);"));
        assert_eq!(
            out.diagnostics.items[0].code,
            DiagnosticCode::UnclassifiedDeclaration
        );
    }

    #[test]
    fn test_misplaced_marker_warns() {
        let out = run("// @easythread\nclass Heavy {}\n");
        assert_eq!(out.diagnostics.len(), 1);
        assert_eq!(
            out.diagnostics.items[0].code,
            DiagnosticCode::UnsupportedMarkerTarget
        );
        assert!(out.code.contains("class Heavy"));
    }

    #[test]
    fn test_parse_error() {
        let host = SwcHost::default();
        let err = Transformer::new(&host, TransformOptions::default())
            .transform("function (")
            .unwrap_err();
        assert!(matches!(err, TransformError::Parse(_)));
        assert_eq!(err.code(), DiagnosticCode::ParseError);
    }

    #[test]
    fn test_generated_names_avoid_collisions() {
        let out = run(
            "const __easythread_args = \"mine\";\n// @easythread\nfunction f(a) { return a; }\n",
        );
        assert!(out.code.contains("function f(...__easythread_args_1)"));
        assert!(out.code.contains("const __easythread_args = \"mine\""));
    }

    #[test]
    fn test_output_is_deterministic() {
        let source = "// @easythread\nconst a = () => 1;\n// @easythread\n(() => 2)();\n";
        assert_eq!(run(source).code, run(source).code);
    }

    #[test]
    fn test_nested_declaration() {
        let out = run(
            "export function setup(scale) {\n  // @easythread\n  function work(v) { return v * scale; }\n  return work;\n}\n",
        );
        assert_eq!(out.declarations[0].functions[0].captured, ["scale"]);
        assert!(out.code.contains("export function setup(scale)"));
        reparses(&out.code);
    }

    #[test]
    fn test_custom_marker() {
        let options = TransformOptions {
            marker: "@offload".into(),
            ..Default::default()
        };
        let out = run_ts("// @offload\nfunction f() {}\n// @easythread\nfunction g() {}\n", options).unwrap();
        assert_eq!(out.declarations.len(), 1);
        assert_eq!(out.declarations[0].functions[0].binding.as_deref(), Some("f"));
    }
}
