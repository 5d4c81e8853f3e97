//! Decides what shape a marked statement has and which functions in it move
//! to a worker.

use std::ops::Range;

use easythread_parser::swc_ecma_ast::{
    Callee, Decl, Expr, ExprStmt, FnDecl, Pat, VarDecl, VarDeclKind,
};
use easythread_parser::ParsedSource;
use serde::Serialize;
use swc_common::Span;

use crate::locate::{Candidate, Marked};

/// Syntactic shape of a marked declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "inner")]
pub enum Shape {
    /// `function name(...) { ... }`
    NamedFunction,
    /// `const name = (...) => ...` or `let name = function (...) { ... }`
    NamedVariableFunction,
    /// `export` in front of one of the two named shapes
    Exported(ExportedShape),
    /// `(function () { ... })();` or `(() => { ... })();`
    AnonymousInvocation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExportedShape {
    NamedFunction,
    NamedVariableFunction,
}

impl std::fmt::Display for Shape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Shape::NamedFunction => f.write_str("function declaration"),
            Shape::NamedVariableFunction => f.write_str("function variable"),
            Shape::Exported(ExportedShape::NamedFunction) => {
                f.write_str("exported function declaration")
            }
            Shape::Exported(ExportedShape::NamedVariableFunction) => {
                f.write_str("exported function variable")
            }
            Shape::AnonymousInvocation => f.write_str("immediately-invoked function"),
        }
    }
}

/// Identity of a function node, shared between the classifier and the
/// free-variable analyzer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct FunctionKey {
    lo: u32,
    hi: u32,
}

impl From<Span> for FunctionKey {
    fn from(span: Span) -> Self {
        Self {
            lo: span.lo.0,
            hi: span.hi.0,
        }
    }
}

/// How the extracted text has to be cut down to a bare literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FragmentKind {
    /// `function name() {}`: the name is dropped from the head
    Declaration,
    /// `const name = <literal>`: the binding prefix is dropped
    Declarator,
    /// `(<literal>)();`: the call and parentheses are dropped
    Invocation,
}

/// One function that moves into a worker.
#[derive(Debug, Clone)]
pub(crate) struct RelocatedFunction {
    /// Name the proxy is bound to; `None` for an invocation
    pub binding: Option<String>,
    /// Names the function may use to refer to itself
    pub self_names: Vec<String>,
    pub fragment: String,
    pub kind: FragmentKind,
    pub key: FunctionKey,
    /// Start of the function in the original module
    pub offset: usize,
}

impl RelocatedFunction {
    pub fn display_name(&self) -> &str {
        self.binding.as_deref().unwrap_or("<anonymous invocation>")
    }
}

/// A piece of the replacement, in source order.
#[derive(Debug, Clone)]
pub(crate) enum Piece {
    Relocate(RelocatedFunction),
    /// Declarator text emitted unchanged as its own statement
    Keep(String),
}

#[derive(Debug, Clone)]
pub(crate) struct AnnotatedDeclaration {
    pub range: Range<usize>,
    pub shape: Shape,
    pub exported: bool,
    /// Declaration keyword for variable shapes
    pub var_kind: Option<&'static str>,
    pub pieces: Vec<Piece>,
}

impl AnnotatedDeclaration {
    pub fn functions(&self) -> impl Iterator<Item = &RelocatedFunction> {
        self.pieces.iter().filter_map(|p| match p {
            Piece::Relocate(f) => Some(f),
            Piece::Keep(_) => None,
        })
    }
}

#[derive(Debug, Clone)]
pub(crate) enum Classified {
    Declaration(AnnotatedDeclaration),
    /// The statement is left as it is
    Miss { range: Range<usize>, reason: String },
}

pub(crate) fn classify(parsed: &ParsedSource, marked: &Marked) -> Classified {
    let range = parsed.range(marked.span);
    let result = match &marked.candidate {
        Candidate::Function(f) => function_declaration(parsed, f).map(|piece| AnnotatedDeclaration {
            range: range.clone(),
            shape: Shape::NamedFunction,
            exported: false,
            var_kind: None,
            pieces: vec![piece],
        }),
        Candidate::Variables(v) => variables(parsed, v).map(|pieces| AnnotatedDeclaration {
            range: range.clone(),
            shape: Shape::NamedVariableFunction,
            exported: false,
            var_kind: Some(var_keyword(v.kind)),
            pieces,
        }),
        Candidate::Export(export) => match &export.decl {
            Decl::Fn(f) => function_declaration(parsed, f).map(|piece| AnnotatedDeclaration {
                range: range.clone(),
                shape: Shape::Exported(ExportedShape::NamedFunction),
                exported: true,
                var_kind: None,
                pieces: vec![piece],
            }),
            Decl::Var(v) => variables(parsed, v).map(|pieces| AnnotatedDeclaration {
                range: range.clone(),
                shape: Shape::Exported(ExportedShape::NamedVariableFunction),
                exported: true,
                var_kind: Some(var_keyword(v.kind)),
                pieces,
            }),
            Decl::Class(_) => Err("an exported class cannot move to a worker".to_string()),
            _ => Err("only exported functions and function variables can move to a worker".to_string()),
        },
        Candidate::Expression(stmt) => invocation(parsed, stmt).map(|piece| AnnotatedDeclaration {
            range: range.clone(),
            shape: Shape::AnonymousInvocation,
            exported: false,
            var_kind: None,
            pieces: vec![piece],
        }),
    };

    match result {
        Ok(decl) => Classified::Declaration(decl),
        Err(reason) => Classified::Miss { range, reason },
    }
}

fn function_declaration(parsed: &ParsedSource, f: &FnDecl) -> Result<Piece, String> {
    let name = f.ident.sym.to_string();
    if f.declare || f.function.body.is_none() {
        return Err(format!(
            "`{}` has no body (ambient declaration or overload signature)",
            name
        ));
    }
    Ok(Piece::Relocate(RelocatedFunction {
        self_names: vec![name.clone()],
        binding: Some(name),
        fragment: parsed.slice(f.function.span).to_string(),
        kind: FragmentKind::Declaration,
        key: f.function.span.into(),
        offset: parsed.offset(f.function.span.lo),
    }))
}

fn variables(parsed: &ParsedSource, v: &VarDecl) -> Result<Vec<Piece>, String> {
    if v.declare {
        return Err("ambient variable declarations have no value to move".to_string());
    }

    let pieces: Vec<Piece> = v
        .decls
        .iter()
        .map(|declarator| {
            let text = parsed.slice(declarator.span);
            match (&declarator.name, declarator.init.as_deref().and_then(function_literal)) {
                (Pat::Ident(name), Some((span, expr_name))) => {
                    let binding = name.id.sym.to_string();
                    let mut self_names = vec![binding.clone()];
                    self_names.extend(expr_name);
                    Piece::Relocate(RelocatedFunction {
                        binding: Some(binding),
                        self_names,
                        fragment: format!("const {}", text),
                        kind: FragmentKind::Declarator,
                        key: span.into(),
                        offset: parsed.offset(declarator.span.lo),
                    })
                }
                _ => Piece::Keep(text.to_string()),
            }
        })
        .collect();

    if pieces.iter().any(|p| matches!(p, Piece::Relocate(_))) {
        Ok(pieces)
    } else {
        Err("no declarator is initialised with a function or arrow expression".to_string())
    }
}

fn invocation(parsed: &ParsedSource, stmt: &ExprStmt) -> Result<Piece, String> {
    let Expr::Call(call) = unwrap_parens(&stmt.expr) else {
        return Err("expression is not an immediately-invoked function".to_string());
    };
    let Callee::Expr(callee) = &call.callee else {
        return Err("expression is not an immediately-invoked function".to_string());
    };
    let Some((span, expr_name)) = function_literal(callee) else {
        return Err("expression is not an immediately-invoked function".to_string());
    };
    if !call.args.is_empty() {
        return Err(format!(
            "immediately-invoked function is called with {} argument(s); only zero-argument invocations can move to a worker",
            call.args.len()
        ));
    }

    Ok(Piece::Relocate(RelocatedFunction {
        binding: None,
        self_names: expr_name.into_iter().collect(),
        fragment: parsed.slice(stmt.span).to_string(),
        kind: FragmentKind::Invocation,
        key: span.into(),
        offset: parsed.offset(stmt.span.lo),
    }))
}

/// The span of a function or arrow literal, looking through parentheses,
/// plus the function expression's own name if it has one.
fn function_literal(expr: &Expr) -> Option<(Span, Option<String>)> {
    match unwrap_parens(expr) {
        Expr::Fn(f) => Some((
            f.function.span,
            f.ident.as_ref().map(|id| id.sym.to_string()),
        )),
        Expr::Arrow(a) => Some((a.span, None)),
        _ => None,
    }
}

fn unwrap_parens(mut expr: &Expr) -> &Expr {
    while let Expr::Paren(p) = expr {
        expr = &p.expr;
    }
    expr
}

fn var_keyword(kind: VarDeclKind) -> &'static str {
    match kind {
        VarDeclKind::Var => "var",
        VarDeclKind::Let => "let",
        VarDeclKind::Const => "const",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locate::locate;
    use easythread_parser::{SwcHost, SyntaxHost};

    fn classify_all(source: &str) -> Vec<Classified> {
        let parsed = SwcHost::default().parse(source).unwrap();
        locate(&parsed, "@easythread")
            .marked
            .iter()
            .map(|m| classify(&parsed, m))
            .collect()
    }

    fn declaration(source: &str) -> AnnotatedDeclaration {
        match classify_all(source).remove(0) {
            Classified::Declaration(d) => d,
            Classified::Miss { reason, .. } => panic!("unexpected miss: {}", reason),
        }
    }

    fn miss_reason(source: &str) -> String {
        match classify_all(source).remove(0) {
            Classified::Miss { reason, .. } => reason,
            Classified::Declaration(d) => panic!("unexpected declaration: {:?}", d.shape),
        }
    }

    #[test]
    fn test_named_function() {
        let src = "// @easythread\nasync function fetchAll(n: number) { return n; }\n";
        let decl = declaration(src);
        assert_eq!(decl.shape, Shape::NamedFunction);
        assert_eq!(decl.range, 15..src.len() - 1);

        let f = decl.functions().next().unwrap();
        assert_eq!(f.binding.as_deref(), Some("fetchAll"));
        assert_eq!(f.kind, FragmentKind::Declaration);
        assert!(f.fragment.starts_with("async function fetchAll(n: number)"));
    }

    #[test]
    fn test_variable_function() {
        let decl = declaration("// @easythread\nlet double = (x: number): number => x * 2;\n");
        assert_eq!(decl.shape, Shape::NamedVariableFunction);
        assert_eq!(decl.var_kind, Some("let"));

        let f = decl.functions().next().unwrap();
        assert_eq!(f.fragment, "const double = (x: number): number => x * 2");
        assert_eq!(f.kind, FragmentKind::Declarator);
    }

    #[test]
    fn test_mixed_declarators_keep_order() {
        let decl = declaration(
            "// @easythread\nconst limit = 10, work = function inner() { return inner; }, label = \"x\";\n",
        );
        assert_eq!(decl.pieces.len(), 3);
        assert!(matches!(&decl.pieces[0], Piece::Keep(t) if t == "limit = 10"));
        assert!(matches!(&decl.pieces[1], Piece::Relocate(f) if f.self_names == ["work", "inner"]));
        assert!(matches!(&decl.pieces[2], Piece::Keep(t) if t == "label = \"x\""));
    }

    #[test]
    fn test_exported_shapes() {
        let decl = declaration("// @easythread\nexport function run() {}\n");
        assert_eq!(decl.shape, Shape::Exported(ExportedShape::NamedFunction));
        assert!(decl.exported);

        let decl = declaration("// @easythread\nexport const run = async () => 1;\n");
        assert_eq!(
            decl.shape,
            Shape::Exported(ExportedShape::NamedVariableFunction)
        );
        assert_eq!(decl.var_kind, Some("const"));
    }

    #[test]
    fn test_invocations() {
        let decl = declaration("// @easythread\n(function () { heavy(); })();\n");
        assert_eq!(decl.shape, Shape::AnonymousInvocation);
        let f = decl.functions().next().unwrap();
        assert!(f.binding.is_none());
        assert_eq!(f.fragment, "(function () { heavy(); })();");

        let decl = declaration("// @easythread\n(async () => { await heavy(); })();\n");
        assert_eq!(decl.shape, Shape::AnonymousInvocation);

        let decl = declaration("// @easythread\n(function named() { heavy(); }());\n");
        let f = decl.functions().next().unwrap();
        assert_eq!(f.self_names, ["named"]);
    }

    #[test]
    fn test_misses() {
        assert!(miss_reason("// @easythread\ndeclare function f(): void;\n").contains("no body"));
        assert!(miss_reason("// @easythread\n(function (a) {})(1);\n").contains("1 argument"));
        assert!(miss_reason("// @easythread\nconst a = 1, b = [];\n").contains("no declarator"));
        assert!(miss_reason("// @easythread\nexport class Worker {}\n").contains("class"));
        assert!(miss_reason("// @easythread\nconsole.log(1);\n").contains("not an immediately-invoked"));
    }

    #[test]
    fn test_destructured_declarator_is_kept() {
        let decl = declaration("// @easythread\nconst { a } = obj, f = () => a;\n");
        assert!(matches!(&decl.pieces[0], Piece::Keep(t) if t == "{ a } = obj"));
        assert!(matches!(&decl.pieces[1], Piece::Relocate(_)));
    }
}
