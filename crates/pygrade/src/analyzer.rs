//! Structural queries over the submitted source.
//!
//! The grader only asks a few questions about how a function is written (does it loop,
//! what does it call, can it return a value), so [`AstAnalyzer`] computes per-function
//! facts once from the ruff syntax tree and answers queries from that table.

use std::fmt;

use indexmap::{IndexMap, IndexSet};
use log::warn;
use ruff_python_ast::{
    self as ast, Expr, Stmt,
    visitor::{Visitor, walk_expr, walk_stmt},
};
use ruff_python_parser::parse_module;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

/// Kind of loop looked for by the no-loop assertion.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum LoopKind {
    For,
    While,
}

impl LoopKind {
    /// Both kinds, the default for the no-loop assertion.
    pub const ALL: [Self; 2] = [Self::While, Self::For];
}

/// Static questions the grader asks about the submitted source.
pub trait StaticAnalyzer: fmt::Debug {
    /// Whether the body of `function` (nested definitions included) contains a loop of one of `kinds`.
    fn has_loop(&self, function: &str, kinds: &[LoopKind]) -> bool;

    /// Whether a function named `function` is defined anywhere in the source.
    fn defines_function(&self, function: &str) -> bool;

    /// Names of the functions and methods called inside `function`.
    fn calls_list(&self, function: &str) -> IndexSet<String>;

    /// Whether `function` can only return `None`.
    fn returns_none(&self, function: &str) -> bool;
}

/// What the analyzer knows about one function definition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct FunctionFacts {
    loops: IndexSet<LoopKind>,
    calls: IndexSet<String>,
    /// A `return` with a value other than a literal `None` exists in the function itself.
    returns_value: bool,
}

/// [`StaticAnalyzer`] backed by the ruff parser.
#[derive(Debug, Clone, Default)]
pub struct AstAnalyzer {
    functions: IndexMap<String, FunctionFacts>,
}

impl AstAnalyzer {
    /// Analyzes `code`. Source that does not parse yields an analyzer that knows no function.
    #[must_use]
    pub fn new(code: &str) -> Self {
        let parsed = match parse_module(code) {
            Ok(parsed) => parsed,
            Err(error) => {
                warn!("static analysis skipped, submission does not parse: {error}");
                return Self::default();
            }
        };
        let mut finder = DefinitionFinder::default();
        finder.visit_body(&parsed.syntax().body);
        Self {
            functions: finder.functions,
        }
    }

    /// Names of every function defined in the source, in definition order.
    pub fn function_names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }
}

impl StaticAnalyzer for AstAnalyzer {
    fn has_loop(&self, function: &str, kinds: &[LoopKind]) -> bool {
        self.functions
            .get(function)
            .is_some_and(|facts| kinds.iter().any(|kind| facts.loops.contains(kind)))
    }

    fn defines_function(&self, function: &str) -> bool {
        self.functions.contains_key(function)
    }

    fn calls_list(&self, function: &str) -> IndexSet<String> {
        self.functions
            .get(function)
            .map(|facts| facts.calls.clone())
            .unwrap_or_default()
    }

    fn returns_none(&self, function: &str) -> bool {
        self.functions.get(function).is_some_and(|facts| !facts.returns_value)
    }
}

/// Finds every `def`, at any depth, and collects its facts.
#[derive(Default)]
struct DefinitionFinder {
    functions: IndexMap<String, FunctionFacts>,
}

impl<'a> Visitor<'a> for DefinitionFinder {
    fn visit_stmt(&mut self, stmt: &'a Stmt) {
        if let Stmt::FunctionDef(def) = stmt {
            let mut collector = FactCollector::default();
            collector.visit_body(&def.body);
            // a later definition replaces an earlier one, as it does at run time
            self.functions.insert(def.name.id.to_string(), collector.facts);
        }
        walk_stmt(self, stmt);
    }
}

/// Collects the facts of one function body.
#[derive(Default)]
struct FactCollector {
    facts: FunctionFacts,
    /// Depth of nested `def`s below the analyzed function.
    nested: usize,
}

impl<'a> Visitor<'a> for FactCollector {
    fn visit_stmt(&mut self, stmt: &'a Stmt) {
        match stmt {
            Stmt::For(_) => {
                self.facts.loops.insert(LoopKind::For);
            }
            Stmt::While(_) => {
                self.facts.loops.insert(LoopKind::While);
            }
            Stmt::Return(ast::StmtReturn { value: Some(value), .. })
                if self.nested == 0 && !matches!(value.as_ref(), Expr::NoneLiteral(_)) =>
            {
                self.facts.returns_value = true;
            }
            Stmt::FunctionDef(_) => {
                self.nested += 1;
                walk_stmt(self, stmt);
                self.nested -= 1;
                return;
            }
            _ => {}
        }
        walk_stmt(self, stmt);
    }

    fn visit_expr(&mut self, expr: &'a Expr) {
        match expr {
            Expr::Call(ast::ExprCall { func, .. }) => match func.as_ref() {
                Expr::Name(name) => {
                    self.facts.calls.insert(name.id.to_string());
                }
                Expr::Attribute(attribute) => {
                    self.facts.calls.insert(attribute.attr.id.to_string());
                }
                _ => {}
            },
            Expr::ListComp(_) | Expr::SetComp(_) | Expr::DictComp(_) | Expr::Generator(_) => {
                self.facts.loops.insert(LoopKind::For);
            }
            _ => {}
        }
        walk_expr(self, expr);
    }
}
