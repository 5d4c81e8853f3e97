//! Turns extracted declaration text into a bare, type-free function literal
//! that can be embedded in a worker script.

use easythread_parser::swc_ecma_ast::{Expr, ModuleItem, Stmt};
use easythread_parser::SyntaxHost;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::classify::{FragmentKind, RelocatedFunction};
use crate::error::TransformError;

/// `export async function name` / `function* name` heads.
static FUNCTION_HEAD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:export\s+)?(?:default\s+)?(async\s+)?function\s*(\*)?\s*[\w$]+")
        .expect("function head pattern")
});

/// `export const name =` binding prefixes.
static DECLARATOR_HEAD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:export\s+)?(?:const|let|var)\s+[\w$]+\s*=\s*")
        .expect("declarator head pattern")
});

/// `(<literal>)();`
static CALL_OUTSIDE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^\((.*)\)\s*\(\s*\)\s*;?$").expect("outer call pattern")
});

/// `(<literal>());`
static CALL_INSIDE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^\((.*)\(\s*\)\)\s*;?$").expect("inner call pattern")
});

/// Strip types from the function's text and reduce it to a literal.
pub(crate) fn sanitize(
    host: &dyn SyntaxHost,
    function: &RelocatedFunction,
) -> Result<String, TransformError> {
    let stripped = host
        .strip_types(&function.fragment)
        .map_err(|source| TransformError::TypeStrip {
            binding: function.display_name().to_string(),
            offset: function.offset,
            source,
        })?;

    let literal = normalize(&stripped, function.kind);
    if !is_function_literal(host, &literal) {
        return Err(TransformError::NotAFunction {
            binding: function.display_name().to_string(),
            offset: function.offset,
            fragment: literal,
        });
    }
    Ok(literal)
}

/// Remove the declaration scaffolding around a printed, type-free fragment.
pub(crate) fn normalize(stripped: &str, kind: FragmentKind) -> String {
    let text = stripped.trim();
    let text = match kind {
        FragmentKind::Declaration => FUNCTION_HEAD.replace(text, "${1}function${2}").into_owned(),
        FragmentKind::Declarator => DECLARATOR_HEAD.replace(text, "").into_owned(),
        FragmentKind::Invocation => CALL_OUTSIDE
            .captures(text)
            .or_else(|| CALL_INSIDE.captures(text))
            .and_then(|c| c.get(1))
            .map_or_else(|| text.to_string(), |m| m.as_str().trim().to_string()),
    };
    text.trim_end().trim_end_matches(';').trim_end().to_string()
}

fn is_function_literal(host: &dyn SyntaxHost, literal: &str) -> bool {
    let Ok(parsed) = host.parse(&format!("({});", literal)) else {
        return false;
    };
    let [ModuleItem::Stmt(Stmt::Expr(stmt))] = parsed.module().body.as_slice() else {
        return false;
    };
    let mut expr = &*stmt.expr;
    while let Expr::Paren(p) = expr {
        expr = &p.expr;
    }
    matches!(expr, Expr::Fn(_) | Expr::Arrow(_))
}
