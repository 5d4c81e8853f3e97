//! Collision-free names for generated bindings.

use std::collections::HashSet;

use easythread_parser::swc_ecma_ast::{Ident, Module};
use swc_ecma_visit::{Visit, VisitWith};

const PREFIX: &str = "__easythread_";

/// Hands out identifiers that do not clash with anything in the module or
/// with each other. One generator is created per transform run so output is
/// stable for a given input.
#[derive(Debug, Default)]
pub struct NameGenerator {
    taken: HashSet<String>,
    declarations: usize,
}

impl NameGenerator {
    /// Reserve every identifier that appears in `module`.
    pub fn for_module(module: &Module) -> Self {
        let mut collector = IdentCollector::default();
        module.visit_with(&mut collector);
        Self {
            taken: collector.names,
            declarations: 0,
        }
    }

    /// `__easythread_<hint>`, suffixed with `_1`, `_2`, ... when taken.
    pub fn fresh(&mut self, hint: &str) -> String {
        let base = format!("{}{}", PREFIX, hint);
        let mut candidate = base.clone();
        let mut n = 0;
        while self.taken.contains(&candidate) {
            n += 1;
            candidate = format!("{}_{}", base, n);
        }
        self.taken.insert(candidate.clone());
        candidate
    }

    /// Prefix for the correlation ids of one relocated function, unique
    /// within the run: `<binding>:<index>:`.
    pub fn correlation_prefix(&mut self, binding: Option<&str>) -> String {
        let index = self.declarations;
        self.declarations += 1;
        format!("{}:{}:", binding.unwrap_or("anonymous"), index)
    }
}

#[derive(Default)]
struct IdentCollector {
    names: HashSet<String>,
}

impl Visit for IdentCollector {
    fn visit_ident(&mut self, ident: &Ident) {
        self.names.insert(ident.sym.to_string());
    }
}
