//! Lexical scope stack and hoisted-binding collection.
//!
//! Each frame is filled with every name it binds before its body is walked,
//! so a reference resolves correctly whether it appears before or after the
//! declaration.

use std::collections::HashSet;

use easythread_parser::swc_ecma_ast::{
    ArrowExpr, Class, Constructor, Decl, DefaultDecl, Function, GetterProp, ImportSpecifier,
    ModuleDecl, ModuleItem, ObjectPatProp, Pat, SetterProp, Stmt, TsModuleName, VarDecl,
    VarDeclKind,
};
use swc_ecma_visit::{Visit, VisitWith};

#[derive(Debug)]
struct Frame {
    names: HashSet<String>,
}

/// Marker returned by [`ScopeStack::enter`]. Exiting truncates back to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ScopeMark(usize);

impl ScopeMark {
    /// Index of the frame that was entered.
    pub fn depth(self) -> usize {
        self.0
    }
}

#[derive(Debug, Default)]
pub(crate) struct ScopeStack {
    frames: Vec<Frame>,
}

impl ScopeStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enter(&mut self, names: impl IntoIterator<Item = String>) -> ScopeMark {
        let mark = ScopeMark(self.frames.len());
        self.frames.push(Frame {
            names: names.into_iter().collect(),
        });
        mark
    }

    pub fn exit(&mut self, mark: ScopeMark) {
        self.frames.truncate(mark.0);
    }

    /// Index of the innermost frame binding `name`.
    pub fn resolve(&self, name: &str) -> Option<usize> {
        self.frames.iter().rposition(|f| f.names.contains(name))
    }
}

/// Names bound by a binding pattern, in source order.
pub(crate) fn pat_names(pat: &Pat, out: &mut Vec<String>) {
    match pat {
        Pat::Ident(id) => out.push(id.id.sym.to_string()),
        Pat::Array(array) => {
            for elem in array.elems.iter().flatten() {
                pat_names(elem, out);
            }
        }
        Pat::Object(object) => {
            for prop in &object.props {
                match prop {
                    ObjectPatProp::KeyValue(kv) => pat_names(&kv.value, out),
                    ObjectPatProp::Assign(assign) => out.push(assign.key.id.sym.to_string()),
                    ObjectPatProp::Rest(rest) => pat_names(&rest.arg, out),
                }
            }
        }
        Pat::Rest(rest) => pat_names(&rest.arg, out),
        Pat::Assign(assign) => pat_names(&assign.left, out),
        _ => {}
    }
}

/// Names a `let`/`const` declaration binds in its block. `var` yields none.
pub(crate) fn block_binding_names(decl: &VarDecl) -> Vec<String> {
    let mut out = Vec::new();
    if decl.kind != VarDeclKind::Var {
        var_decl_names(decl, &mut out);
    }
    out
}

fn var_decl_names(decl: &VarDecl, out: &mut Vec<String>) {
    for declarator in &decl.decls {
        pat_names(&declarator.name, out);
    }
}

fn decl_names(decl: &Decl, include_var: bool, out: &mut Vec<String>) {
    match decl {
        Decl::Fn(f) => out.push(f.ident.sym.to_string()),
        Decl::Class(c) => out.push(c.ident.sym.to_string()),
        Decl::Var(v) if include_var || v.kind != VarDeclKind::Var => var_decl_names(v, out),
        Decl::Using(u) => {
            for declarator in &u.decls {
                pat_names(&declarator.name, out);
            }
        }
        Decl::TsEnum(e) => out.push(e.id.sym.to_string()),
        // `namespace Geometry {}` binds a runtime object; ambient and
        // string-named modules do not.
        Decl::TsModule(m) if !m.declare => {
            if let TsModuleName::Ident(id) = &m.id {
                out.push(id.sym.to_string());
            }
        }
        _ => {}
    }
}

/// Block-scoped names declared directly in a statement list.
pub(crate) fn lexical_names(stmts: &[Stmt]) -> Vec<String> {
    let mut out = Vec::new();
    for stmt in stmts {
        if let Stmt::Decl(decl) = stmt {
            decl_names(decl, false, &mut out);
        }
    }
    out
}

/// `var` names hoisted to the function that contains `node`.
pub(crate) fn var_names<N: VisitWith<VarCollector> + ?Sized>(node: &N) -> Vec<String> {
    let mut collector = VarCollector::default();
    node.visit_with(&mut collector);
    collector.names
}

/// Names bound at module level: imports, top-level declarations, named
/// default exports and hoisted `var`s.
pub(crate) fn module_names(items: &[ModuleItem]) -> Vec<String> {
    let mut out = Vec::new();
    for item in items {
        match item {
            ModuleItem::ModuleDecl(ModuleDecl::Import(import)) => {
                for spec in &import.specifiers {
                    let local = match spec {
                        ImportSpecifier::Named(s) => &s.local,
                        ImportSpecifier::Default(s) => &s.local,
                        ImportSpecifier::Namespace(s) => &s.local,
                    };
                    out.push(local.sym.to_string());
                }
            }
            ModuleItem::ModuleDecl(ModuleDecl::ExportDecl(export)) => {
                decl_names(&export.decl, true, &mut out)
            }
            ModuleItem::ModuleDecl(ModuleDecl::ExportDefaultDecl(export)) => {
                let ident = match &export.decl {
                    DefaultDecl::Fn(f) => f.ident.as_ref(),
                    DefaultDecl::Class(c) => c.ident.as_ref(),
                    _ => None,
                };
                out.extend(ident.map(|i| i.sym.to_string()));
            }
            ModuleItem::Stmt(Stmt::Decl(decl)) => decl_names(decl, false, &mut out),
            _ => {}
        }
    }
    out.extend(var_names(items));
    out
}

/// Collects `var` declarations without entering nested functions or classes.
#[derive(Default)]
pub(crate) struct VarCollector {
    names: Vec<String>,
}

impl Visit for VarCollector {
    fn visit_var_decl(&mut self, decl: &VarDecl) {
        if decl.kind == VarDeclKind::Var {
            var_decl_names(decl, &mut self.names);
        }
        for declarator in &decl.decls {
            declarator.init.visit_with(self);
        }
    }

    fn visit_function(&mut self, _: &Function) {}
    fn visit_arrow_expr(&mut self, _: &ArrowExpr) {}
    fn visit_constructor(&mut self, _: &Constructor) {}
    fn visit_getter_prop(&mut self, _: &GetterProp) {}
    fn visit_setter_prop(&mut self, _: &SetterProp) {}
    fn visit_class(&mut self, _: &Class) {}
}
