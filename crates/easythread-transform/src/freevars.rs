//! Finds the variables a relocated function reads from enclosing scopes.
//!
//! The whole module is walked once with a [`ScopeStack`]. While inside a
//! target function, every identifier reference that resolves to a frame
//! outside the function is recorded, skipping worker built-ins and the
//! function's own names. References that resolve nowhere are globals of
//! whichever context runs the code and are never forwarded.

use std::collections::{HashMap, HashSet};

use easythread_parser::swc_ecma_ast::{
    ArrowExpr, BlockStmt, BlockStmtOrExpr, BreakStmt, CatchClause, ClassDecl, ClassExpr,
    Constructor, ContinueStmt, FnDecl, FnExpr, ForHead, ForInStmt, ForOfStmt, ForStmt, Function,
    GetterProp, Ident, ImportDecl, JSXElementName, LabeledStmt, Module, ObjectPatProp,
    ParamOrTsParamProp, Pat, SetterProp, SwitchStmt, TsEnumDecl, TsExprWithTypeArgs,
    TsImportEqualsDecl, TsInterfaceDecl, TsModuleDecl, TsParamPropParam, TsType, TsTypeAliasDecl,
    TsTypeAnn, TsTypeParamDecl, TsTypeParamInstantiation, VarDeclOrExpr, VarDeclarator,
};
use swc_ecma_visit::{Visit, VisitWith};

use crate::builtins::is_builtin;
use crate::classify::{FunctionKey, RelocatedFunction};
use crate::scope::{
    block_binding_names, lexical_names, module_names, pat_names, var_names, ScopeMark,
    ScopeStack,
};

/// Captured names per relocated function, in first-reference order.
pub(crate) type FreeVariables = HashMap<FunctionKey, Vec<String>>;

pub(crate) fn analyze<'a>(
    module: &Module,
    functions: impl IntoIterator<Item = &'a RelocatedFunction>,
) -> FreeVariables {
    let mut analyzer = Analyzer {
        scopes: ScopeStack::new(),
        targets: functions
            .into_iter()
            .map(|f| (f.key, f.self_names.as_slice()))
            .collect(),
        active: None,
        found: FreeVariables::new(),
    };
    module.visit_with(&mut analyzer);
    analyzer.found
}

struct Analyzer<'a> {
    scopes: ScopeStack,
    targets: HashMap<FunctionKey, &'a [String]>,
    active: Option<Active<'a>>,
    found: FreeVariables,
}

/// Capture state for the target function currently being walked.
struct Active<'a> {
    key: FunctionKey,
    /// Frame index of the target's own function scope
    depth: usize,
    self_names: &'a [String],
    captured: Vec<String>,
    seen: HashSet<String>,
}

impl<'a> Analyzer<'a> {
    fn reference(&mut self, name: &str) {
        let Some(active) = self.active.as_mut() else {
            return;
        };
        let Some(depth) = self.scopes.resolve(name) else {
            return;
        };
        if depth >= active.depth
            || is_builtin(name)
            || active.self_names.iter().any(|n| n == name)
        {
            return;
        }
        if active.seen.insert(name.to_string()) {
            active.captured.push(name.to_string());
        }
    }

    fn enter_function(&mut self, key: Option<FunctionKey>, names: Vec<String>) -> (ScopeMark, bool) {
        let mark = self.scopes.enter(names);
        let target = key.and_then(|k| self.targets.get(&k).map(|names| (k, *names)));
        match target {
            Some((key, self_names)) if self.active.is_none() => {
                self.active = Some(Active {
                    key,
                    depth: mark.depth(),
                    self_names,
                    captured: Vec::new(),
                    seen: HashSet::new(),
                });
                (mark, true)
            }
            _ => (mark, false),
        }
    }

    fn exit_function(&mut self, mark: ScopeMark, started: bool) {
        if started {
            if let Some(active) = self.active.take() {
                log::trace!("captured {:?}", active.captured);
                self.found.insert(active.key, active.captured);
            }
        }
        self.scopes.exit(mark);
    }

    fn enter_block(&mut self, names: Vec<String>) -> ScopeMark {
        self.scopes.enter(names)
    }

    /// Walk a declaration pattern: bound names are not references, but
    /// default values and computed keys are.
    fn visit_binding(&mut self, pat: &Pat) {
        match pat {
            Pat::Array(array) => {
                for elem in array.elems.iter().flatten() {
                    self.visit_binding(elem);
                }
            }
            Pat::Object(object) => {
                for prop in &object.props {
                    match prop {
                        ObjectPatProp::KeyValue(kv) => {
                            kv.key.visit_with(self);
                            self.visit_binding(&kv.value);
                        }
                        ObjectPatProp::Assign(assign) => assign.value.visit_with(self),
                        ObjectPatProp::Rest(rest) => self.visit_binding(&rest.arg),
                    }
                }
            }
            Pat::Rest(rest) => self.visit_binding(&rest.arg),
            Pat::Assign(assign) => {
                self.visit_binding(&assign.left);
                assign.right.visit_with(self);
            }
            Pat::Expr(expr) => expr.visit_with(self),
            _ => {}
        }
    }
}

fn body_names(body: &BlockStmt, out: &mut Vec<String>) {
    out.extend(var_names(body.stmts.as_slice()));
    out.extend(lexical_names(&body.stmts));
}

impl Visit for Analyzer<'_> {
    fn visit_module(&mut self, module: &Module) {
        let mark = self.scopes.enter(module_names(&module.body));
        module.body.visit_with(self);
        self.scopes.exit(mark);
    }

    fn visit_function(&mut self, function: &Function) {
        let mut names = vec!["arguments".to_string()];
        for param in &function.params {
            pat_names(&param.pat, &mut names);
        }
        if let Some(body) = &function.body {
            body_names(body, &mut names);
        }

        let (mark, started) = self.enter_function(Some(function.span.into()), names);
        function.decorators.visit_with(self);
        for param in &function.params {
            param.decorators.visit_with(self);
            self.visit_binding(&param.pat);
        }
        if let Some(body) = &function.body {
            body.stmts.visit_with(self);
        }
        self.exit_function(mark, started);
    }

    fn visit_arrow_expr(&mut self, arrow: &ArrowExpr) {
        let mut names = Vec::new();
        for param in &arrow.params {
            pat_names(param, &mut names);
        }
        if let BlockStmtOrExpr::BlockStmt(body) = &*arrow.body {
            body_names(body, &mut names);
        }

        let (mark, started) = self.enter_function(Some(arrow.span.into()), names);
        for param in &arrow.params {
            self.visit_binding(param);
        }
        match &*arrow.body {
            BlockStmtOrExpr::BlockStmt(body) => body.stmts.visit_with(self),
            BlockStmtOrExpr::Expr(expr) => expr.visit_with(self),
        }
        self.exit_function(mark, started);
    }

    fn visit_constructor(&mut self, ctor: &Constructor) {
        let mut names = vec!["arguments".to_string()];
        for param in &ctor.params {
            match param {
                ParamOrTsParamProp::Param(p) => pat_names(&p.pat, &mut names),
                ParamOrTsParamProp::TsParamProp(prop) => match &prop.param {
                    TsParamPropParam::Ident(id) => names.push(id.id.sym.to_string()),
                    TsParamPropParam::Assign(assign) => pat_names(&assign.left, &mut names),
                },
            }
        }
        if let Some(body) = &ctor.body {
            body_names(body, &mut names);
        }

        ctor.key.visit_with(self);
        let (mark, started) = self.enter_function(None, names);
        for param in &ctor.params {
            match param {
                ParamOrTsParamProp::Param(p) => {
                    p.decorators.visit_with(self);
                    self.visit_binding(&p.pat);
                }
                ParamOrTsParamProp::TsParamProp(prop) => {
                    prop.decorators.visit_with(self);
                    if let TsParamPropParam::Assign(assign) = &prop.param {
                        assign.right.visit_with(self);
                    }
                }
            }
        }
        if let Some(body) = &ctor.body {
            body.stmts.visit_with(self);
        }
        self.exit_function(mark, started);
    }

    fn visit_getter_prop(&mut self, getter: &GetterProp) {
        getter.key.visit_with(self);
        let mut names = vec!["arguments".to_string()];
        if let Some(body) = &getter.body {
            body_names(body, &mut names);
        }
        let (mark, started) = self.enter_function(None, names);
        if let Some(body) = &getter.body {
            body.stmts.visit_with(self);
        }
        self.exit_function(mark, started);
    }

    fn visit_setter_prop(&mut self, setter: &SetterProp) {
        setter.key.visit_with(self);
        let mut names = vec!["arguments".to_string()];
        pat_names(&setter.param, &mut names);
        if let Some(body) = &setter.body {
            body_names(body, &mut names);
        }
        let (mark, started) = self.enter_function(None, names);
        self.visit_binding(&setter.param);
        if let Some(body) = &setter.body {
            body.stmts.visit_with(self);
        }
        self.exit_function(mark, started);
    }

    fn visit_block_stmt(&mut self, block: &BlockStmt) {
        let mark = self.enter_block(lexical_names(&block.stmts));
        block.stmts.visit_with(self);
        self.scopes.exit(mark);
    }

    fn visit_for_stmt(&mut self, stmt: &ForStmt) {
        let names = match &stmt.init {
            Some(VarDeclOrExpr::VarDecl(decl)) => block_binding_names(decl),
            _ => Vec::new(),
        };
        let mark = self.enter_block(names);
        stmt.init.visit_with(self);
        stmt.test.visit_with(self);
        stmt.update.visit_with(self);
        stmt.body.visit_with(self);
        self.scopes.exit(mark);
    }

    fn visit_for_in_stmt(&mut self, stmt: &ForInStmt) {
        let mark = self.enter_block(head_names(&stmt.left));
        stmt.left.visit_with(self);
        stmt.right.visit_with(self);
        stmt.body.visit_with(self);
        self.scopes.exit(mark);
    }

    fn visit_for_of_stmt(&mut self, stmt: &ForOfStmt) {
        let mark = self.enter_block(head_names(&stmt.left));
        stmt.left.visit_with(self);
        stmt.right.visit_with(self);
        stmt.body.visit_with(self);
        self.scopes.exit(mark);
    }

    fn visit_catch_clause(&mut self, clause: &CatchClause) {
        let mut names = Vec::new();
        if let Some(param) = &clause.param {
            pat_names(param, &mut names);
        }
        names.extend(lexical_names(&clause.body.stmts));

        let mark = self.enter_block(names);
        if let Some(param) = &clause.param {
            self.visit_binding(param);
        }
        clause.body.stmts.visit_with(self);
        self.scopes.exit(mark);
    }

    fn visit_switch_stmt(&mut self, stmt: &SwitchStmt) {
        stmt.discriminant.visit_with(self);
        let names = stmt
            .cases
            .iter()
            .flat_map(|case| lexical_names(&case.cons))
            .collect();
        let mark = self.enter_block(names);
        stmt.cases.visit_with(self);
        self.scopes.exit(mark);
    }

    fn visit_var_declarator(&mut self, declarator: &VarDeclarator) {
        self.visit_binding(&declarator.name);
        declarator.init.visit_with(self);
    }

    fn visit_fn_decl(&mut self, decl: &FnDecl) {
        decl.function.visit_with(self);
    }

    fn visit_fn_expr(&mut self, expr: &FnExpr) {
        match &expr.ident {
            Some(ident) => {
                let mark = self.enter_block(vec![ident.sym.to_string()]);
                expr.function.visit_with(self);
                self.scopes.exit(mark);
            }
            None => expr.function.visit_with(self),
        }
    }

    fn visit_class_decl(&mut self, decl: &ClassDecl) {
        decl.class.visit_with(self);
    }

    fn visit_class_expr(&mut self, expr: &ClassExpr) {
        match &expr.ident {
            Some(ident) => {
                let mark = self.enter_block(vec![ident.sym.to_string()]);
                expr.class.visit_with(self);
                self.scopes.exit(mark);
            }
            None => expr.class.visit_with(self),
        }
    }

    fn visit_labeled_stmt(&mut self, stmt: &LabeledStmt) {
        stmt.body.visit_with(self);
    }

    fn visit_break_stmt(&mut self, _: &BreakStmt) {}
    fn visit_continue_stmt(&mut self, _: &ContinueStmt) {}
    fn visit_import_decl(&mut self, _: &ImportDecl) {}

    fn visit_ident(&mut self, ident: &Ident) {
        self.reference(&ident.sym);
    }

    fn visit_jsx_element_name(&mut self, name: &JSXElementName) {
        match name {
            // <div>, <span>: intrinsic elements, not bindings
            JSXElementName::Ident(ident)
                if ident.sym.starts_with(|c: char| c.is_ascii_lowercase()) => {}
            other => other.visit_children_with(self),
        }
    }

    fn visit_ts_enum_decl(&mut self, decl: &TsEnumDecl) {
        for member in &decl.members {
            member.init.visit_with(self);
        }
    }

    // Type positions never reach the worker.
    fn visit_ts_type(&mut self, _: &TsType) {}
    fn visit_ts_type_ann(&mut self, _: &TsTypeAnn) {}
    fn visit_ts_type_param_decl(&mut self, _: &TsTypeParamDecl) {}
    fn visit_ts_type_param_instantiation(&mut self, _: &TsTypeParamInstantiation) {}
    fn visit_ts_interface_decl(&mut self, _: &TsInterfaceDecl) {}
    fn visit_ts_type_alias_decl(&mut self, _: &TsTypeAliasDecl) {}
    fn visit_ts_module_decl(&mut self, _: &TsModuleDecl) {}
    fn visit_ts_expr_with_type_args(&mut self, _: &TsExprWithTypeArgs) {}
    fn visit_ts_import_equals_decl(&mut self, _: &TsImportEqualsDecl) {}
}

fn head_names(head: &ForHead) -> Vec<String> {
    match head {
        ForHead::VarDecl(decl) => block_binding_names(decl),
        ForHead::UsingDecl(decl) => {
            let mut names = Vec::new();
            for declarator in &decl.decls {
                pat_names(&declarator.name, &mut names);
            }
            names
        }
        ForHead::Pat(_) => Vec::new(),
    }
}
