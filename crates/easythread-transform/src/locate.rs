//! Finds statements that carry the marker comment.

use easythread_parser::swc_ecma_ast::{
    Decl, ExportDecl, ExprStmt, FnDecl, ModuleDecl, ModuleItem, Stmt, VarDecl,
};
use easythread_parser::{ParsedSource, Spanned};
use swc_common::Span;
use swc_ecma_visit::{Visit, VisitWith};

/// A marked statement of a kind the classifier understands.
#[derive(Debug, Clone)]
pub(crate) enum Candidate {
    Function(FnDecl),
    Variables(VarDecl),
    Export(ExportDecl),
    Expression(ExprStmt),
}

#[derive(Debug, Clone)]
pub(crate) struct Marked {
    pub candidate: Candidate,
    pub span: Span,
}

/// A marker on a statement the transform never relocates.
#[derive(Debug, Clone)]
pub(crate) struct Misplaced {
    pub span: Span,
    pub kind: &'static str,
}

#[derive(Debug, Default)]
pub(crate) struct Located {
    /// Marked statements in document order
    pub marked: Vec<Marked>,
    pub misplaced: Vec<Misplaced>,
}

/// Whether a comment body is the marker.
///
/// Accepts `// @easythread`, `/* @easythread */` and the doc-comment form
/// `/** @easythread */`, whose body starts with `*`.
pub(crate) fn is_marker(text: &str, marker: &str) -> bool {
    let text = text.trim();
    text == marker || text.strip_prefix('*').map(str::trim) == Some(marker)
}

pub(crate) fn locate(parsed: &ParsedSource, marker: &str) -> Located {
    let mut locator = Locator {
        parsed,
        marker,
        found: Located::default(),
    };
    parsed.module().visit_with(&mut locator);
    locator.found
}

struct Locator<'a> {
    parsed: &'a ParsedSource,
    marker: &'a str,
    found: Located,
}

impl Locator<'_> {
    fn has_marker(&self, span: Span) -> bool {
        self.parsed
            .leading_comments(span.lo)
            .iter()
            .any(|c| is_marker(&c.text, self.marker))
    }

    /// Record a marked statement. Returns true when it must not be walked.
    fn record(&mut self, span: Span, candidate: Result<Candidate, &'static str>) -> bool {
        match candidate {
            Ok(candidate) => {
                log::debug!("marker at {}..{}", span.lo.0, span.hi.0);
                self.found.marked.push(Marked { candidate, span });
                true
            }
            Err(kind) => {
                self.found.misplaced.push(Misplaced { span, kind });
                false
            }
        }
    }
}

impl Visit for Locator<'_> {
    fn visit_module_items(&mut self, items: &[ModuleItem]) {
        for item in items {
            let span = item.span();
            if self.has_marker(span) {
                let candidate = match item {
                    ModuleItem::Stmt(stmt) => stmt_candidate(stmt),
                    ModuleItem::ModuleDecl(ModuleDecl::ExportDecl(export)) => {
                        Ok(Candidate::Export(export.clone()))
                    }
                    ModuleItem::ModuleDecl(decl) => Err(module_decl_kind(decl)),
                };
                if self.record(span, candidate) {
                    continue;
                }
            }
            item.visit_with(self);
        }
    }

    fn visit_stmts(&mut self, stmts: &[Stmt]) {
        for stmt in stmts {
            let span = stmt.span();
            if self.has_marker(span) && self.record(span, stmt_candidate(stmt)) {
                continue;
            }
            stmt.visit_with(self);
        }
    }
}

fn stmt_candidate(stmt: &Stmt) -> Result<Candidate, &'static str> {
    match stmt {
        Stmt::Decl(Decl::Fn(f)) => Ok(Candidate::Function(f.clone())),
        Stmt::Decl(Decl::Var(v)) => Ok(Candidate::Variables((**v).clone())),
        Stmt::Expr(e) => Ok(Candidate::Expression(e.clone())),
        Stmt::Decl(Decl::Class(_)) => Err("class declaration"),
        Stmt::Decl(Decl::Using(_)) => Err("using declaration"),
        Stmt::Decl(_) => Err("type declaration"),
        Stmt::Return(_) => Err("return statement"),
        Stmt::Block(_) => Err("block"),
        _ => Err("control-flow statement"),
    }
}

fn module_decl_kind(decl: &ModuleDecl) -> &'static str {
    match decl {
        ModuleDecl::Import(_) => "import declaration",
        ModuleDecl::ExportDefaultDecl(_) | ModuleDecl::ExportDefaultExpr(_) => "default export",
        ModuleDecl::ExportNamed(_) | ModuleDecl::ExportAll(_) => "re-export",
        _ => "module declaration",
    }
}
