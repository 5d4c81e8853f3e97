//! Builds the replacement text for one annotated declaration.

use crate::classify::{AnnotatedDeclaration, ExportedShape, Piece, RelocatedFunction, Shape};
use crate::error::TransformError;
use crate::names::NameGenerator;
use crate::templates::{
    CALL_BODY, CAPTURE_ASSIGNMENT, CAPTURE_DECLARATIONS, EXTERNAL_VARS, FUNCTION_PROXY,
    INVOCATION_PROXY, KEPT_DECLARATOR, VARIABLE_PROXY, WORKER_SCRIPT,
};

/// Local names used inside every generated proxy and worker script.
///
/// They are drawn once per run from the module's [`NameGenerator`], so
/// they can never shadow a variable the relocated code refers to.
#[derive(Debug, Clone)]
pub(crate) struct RuntimeNames {
    args: String,
    message_id: String,
    external: String,
    event: String,
    reply: String,
    worker: String,
    handler: String,
    url: String,
    resolve: String,
    reject: String,
    failure: String,
}

impl RuntimeNames {
    pub fn generate(names: &mut NameGenerator) -> Self {
        Self {
            args: names.fresh("args"),
            message_id: names.fresh("message_id"),
            external: names.fresh("external"),
            event: names.fresh("event"),
            reply: names.fresh("reply"),
            worker: names.fresh("worker"),
            handler: names.fresh("handler"),
            url: names.fresh("url"),
            resolve: names.fresh("resolve"),
            reject: names.fresh("reject"),
            failure: names.fresh("failure"),
        }
    }
}

/// A relocated function ready to be emitted.
pub(crate) struct Relocation<'a> {
    pub function: &'a RelocatedFunction,
    /// Sanitized function literal
    pub literal: String,
    /// Captured names to forward; empty when capture is disabled
    pub captured: Vec<String>,
}

pub(crate) struct Synthesizer<'n> {
    names: &'n mut NameGenerator,
    runtime: RuntimeNames,
}

impl<'n> Synthesizer<'n> {
    pub fn new(names: &'n mut NameGenerator) -> Self {
        let runtime = RuntimeNames::generate(names);
        Self { names, runtime }
    }

    /// Replacement text for `decl`. `relocations` follow the order of
    /// `decl.functions()`.
    pub fn declaration(
        &mut self,
        decl: &AnnotatedDeclaration,
        relocations: Vec<Relocation<'_>>,
    ) -> Result<String, TransformError> {
        let export = if decl.exported { "export " } else { "" };
        let kind = decl.var_kind.unwrap_or("const");
        let mut relocations = relocations.into_iter();
        let mut out = String::new();

        for piece in &decl.pieces {
            match piece {
                Piece::Keep(declarator) => out.push_str(&KEPT_DECLARATOR.render(&[
                    ("export", export),
                    ("kind", kind),
                    ("declarator", declarator),
                ])?),
                Piece::Relocate(_) => {
                    let Some(relocation) = relocations.next() else {
                        break;
                    };
                    out.push_str(&self.proxy(decl.shape, export, kind, &relocation)?);
                }
            }
        }
        Ok(out.trim_end().to_string())
    }

    fn proxy(
        &mut self,
        shape: Shape,
        export: &str,
        kind: &str,
        relocation: &Relocation<'_>,
    ) -> Result<String, TransformError> {
        let binding = relocation.function.binding.as_deref();
        let function_name = match binding {
            Some(name) => name.to_string(),
            None => self.names.fresh("task"),
        };
        let counter = self.names.fresh(&format!("{}_calls", binding.unwrap_or("task")));
        let prefix = self.names.correlation_prefix(binding);

        let script = self.worker_script(&function_name, relocation)?;
        let script_literal = json_string(&script);
        let prefix_literal = json_string(&prefix);
        let external_vars = if relocation.captured.is_empty() {
            String::new()
        } else {
            EXTERNAL_VARS.render(&[("names", &relocation.captured.join(", "))])?
        };

        let rt = &self.runtime;
        let body = CALL_BODY.render(&[
            ("counter", &counter),
            ("message_id", &rt.message_id),
            ("prefix", &prefix_literal),
            ("resolve", &rt.resolve),
            ("reject", &rt.reject),
            ("failure", &rt.failure),
            ("url", &rt.url),
            ("script", &script_literal),
            ("worker", &rt.worker),
            ("handler", &rt.handler),
            ("event", &rt.event),
            ("reply", &rt.reply),
            ("args", &rt.args),
            ("external_vars", &external_vars),
        ])?;

        let values = [
            ("counter", counter.as_str()),
            ("export", export),
            ("kind", kind),
            ("name", function_name.as_str()),
            ("args", rt.args.as_str()),
            ("body", body.as_str()),
        ];
        match shape {
            Shape::NamedFunction | Shape::Exported(ExportedShape::NamedFunction) => {
                FUNCTION_PROXY.render(&values)
            }
            Shape::NamedVariableFunction
            | Shape::Exported(ExportedShape::NamedVariableFunction) => {
                VARIABLE_PROXY.render(&values)
            }
            Shape::AnonymousInvocation => INVOCATION_PROXY.render(&values),
        }
    }

    fn worker_script(
        &self,
        function_name: &str,
        relocation: &Relocation<'_>,
    ) -> Result<String, TransformError> {
        let rt = &self.runtime;
        let (declarations, assignment) = if relocation.captured.is_empty() {
            (String::new(), String::new())
        } else {
            let names = relocation.captured.join(", ");
            (
                CAPTURE_DECLARATIONS.render(&[("names", &names)])?,
                CAPTURE_ASSIGNMENT.render(&[("names", &names), ("external", &rt.external)])?,
            )
        };

        WORKER_SCRIPT.render(&[
            ("function", function_name),
            ("literal", &relocation.literal),
            ("capture_declarations", &declarations),
            ("capture_assignment", &assignment),
            ("event", &rt.event),
            ("args", &rt.args),
            ("message_id", &rt.message_id),
            ("external", &rt.external),
        ])
    }
}

/// A JavaScript string literal with the same contents as `text`.
fn json_string(text: &str) -> String {
    serde_json::Value::String(text.to_string()).to_string()
}
