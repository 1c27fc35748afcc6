use std::{borrow::Cow, fmt, rc::Rc};

use ahash::AHashSet;
use num_bigint::BigInt;
use ruff_python_ast::{
    self as ast, BoolOp, CmpOp, ConversionFlag as RuffConversionFlag, ElifElseClause, Expr as AstExpr,
    InterpolatedStringElement, Number, Operator as AstOperator, Stmt as AstStmt, UnaryOp,
};
use ruff_python_parser::parse_module;
use ruff_text_size::{Ranged, TextRange};

use crate::{
    exception::{ExcType, Exception},
    expressions::{
        CallArg, CmpOperator, ComprehensionKind, ExceptHandler, Expr, FStringPart, FunctionDef, FunctionScope,
        Generator, Node, Operator, Param, Stmt, Target, UnaryOperator,
    },
    object::Object,
};

/// Maximum nesting depth for AST structures during parsing.
/// Matches CPython's limit of ~200 for nested parentheses.
/// This prevents stack overflow from deeply nested structures like `((((x,),),),)`.
#[cfg(not(debug_assertions))]
pub const MAX_NESTING_DEPTH: u16 = 200;
/// In debug builds, we use a lower limit because stack frame sizes are much larger
/// (no inlining, no optimizations). The recursive conversion functions have large
/// enum types that consume significant stack space per call.
#[cfg(debug_assertions)]
pub const MAX_NESTING_DEPTH: u16 = 35;

/// Parses a whole program.
pub(crate) fn parse_program(code: &str) -> Result<Vec<Stmt>, ParseError> {
    let mut parser = Parser::new(code);
    let parsed = parse_module(code).map_err(|e| ParseError::syntax(e.to_string(), parser.line_of(e.range())))?;
    let module = parsed.into_syntax();
    parser.parse_statements(module.body.into())
}

/// Parses a single expression such as `f(9)` or `a + b`.
pub(crate) fn parse_expression(code: &str) -> Result<Expr, ParseError> {
    let mut parser = Parser::new(code);
    let parsed = parse_module(code).map_err(|e| ParseError::syntax(e.to_string(), parser.line_of(e.range())))?;
    let mut body = parsed.into_syntax().body;
    match (body.pop(), body.is_empty()) {
        (Some(AstStmt::Expr(ast::StmtExpr { value, .. })), true) => parser.parse_expression(*value),
        _ => Err(ParseError::syntax("expected a single expression", 1)),
    }
}

/// Names declared `global`/`nonlocal` in the function body being converted.
#[derive(Debug, Default)]
struct Declarations {
    globals: AHashSet<String>,
    nonlocals: AHashSet<String>,
}

/// Body of a function being converted: statements for `def`, one expression for `lambda`.
enum FunctionBody {
    Statements(Vec<AstStmt>),
    Lambda(AstExpr),
}

/// Converts ruff's AST into the interpreter's owned tree.
struct Parser<'a> {
    code: &'a str,
    /// Byte offset of the first character of each line.
    line_starts: Vec<usize>,
    /// Remaining nesting depth budget for recursive structures.
    depth_remaining: u16,
    /// One entry per function body currently being converted.
    declarations: Vec<Declarations>,
}

impl<'a> Parser<'a> {
    fn new(code: &'a str) -> Self {
        let line_starts = std::iter::once(0)
            .chain(code.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self {
            code,
            line_starts,
            depth_remaining: MAX_NESTING_DEPTH,
            declarations: Vec::new(),
        }
    }

    /// 1-based line of the start of `range`.
    fn line_of(&self, range: TextRange) -> u32 {
        let offset: usize = range.start().into();
        let line = self.line_starts.partition_point(|start| *start <= offset);
        u32::try_from(line).unwrap_or(u32::MAX)
    }

    fn parse_statements(&mut self, statements: Vec<AstStmt>) -> Result<Vec<Stmt>, ParseError> {
        statements.into_iter().map(|s| self.parse_statement(s)).collect()
    }

    fn parse_statement(&mut self, statement: AstStmt) -> Result<Stmt, ParseError> {
        self.decr_depth_remaining(statement.range())?;
        let result = self.parse_statement_impl(statement);
        self.depth_remaining += 1;
        result
    }

    fn parse_statement_impl(&mut self, statement: AstStmt) -> Result<Stmt, ParseError> {
        let line = self.line_of(statement.range());
        let node = match statement {
            AstStmt::Expr(ast::StmtExpr { value, .. }) => Node::Expr(self.parse_expression(*value)?),
            AstStmt::Assign(ast::StmtAssign { targets, value, .. }) => Node::Assign {
                targets: targets
                    .into_iter()
                    .map(|t| self.parse_target(t))
                    .collect::<Result<_, _>>()?,
                value: self.parse_expression(*value)?,
            },
            AstStmt::AnnAssign(ast::StmtAnnAssign { target, value, .. }) => match value {
                Some(value) => Node::Assign {
                    targets: vec![self.parse_target(*target)?],
                    value: self.parse_expression(*value)?,
                },
                None => Node::Pass,
            },
            AstStmt::AugAssign(ast::StmtAugAssign { target, op, value, .. }) => Node::AugAssign {
                target: self.parse_target(*target)?,
                op: convert_op(op, line)?,
                value: self.parse_expression(*value)?,
            },
            AstStmt::FunctionDef(function) => {
                if function.is_async {
                    return Err(ParseError::not_implemented("async functions", line));
                }
                if !function.decorator_list.is_empty() {
                    return Err(ParseError::not_implemented("decorators", line));
                }
                let def = self.parse_function(
                    function.name.id.as_str().to_owned(),
                    Some(*function.parameters),
                    FunctionBody::Statements(function.body.into()),
                    line,
                )?;
                Node::FunctionDef(Rc::new(def))
            }
            AstStmt::Return(ast::StmtReturn { value, .. }) => {
                Node::Return(value.map(|v| self.parse_expression(*v)).transpose()?)
            }
            AstStmt::If(ast::StmtIf {
                test,
                body,
                elif_else_clauses,
                ..
            }) => Node::If {
                test: self.parse_expression(*test)?,
                body: self.parse_statements(body.into())?,
                orelse: self.parse_elif_else_clauses(elif_else_clauses)?,
            },
            AstStmt::While(ast::StmtWhile { test, body, orelse, .. }) => Node::While {
                test: self.parse_expression(*test)?,
                body: self.parse_statements(body.into())?,
                orelse: self.parse_statements(orelse.into())?,
            },
            AstStmt::For(ast::StmtFor {
                is_async,
                target,
                iter,
                body,
                orelse,
                ..
            }) => {
                if is_async {
                    return Err(ParseError::not_implemented("async for loops", line));
                }
                Node::For {
                    target: self.parse_target(*target)?,
                    iter: self.parse_expression(*iter)?,
                    body: self.parse_statements(body.into())?,
                    orelse: self.parse_statements(orelse.into())?,
                }
            }
            AstStmt::Break(_) => Node::Break,
            AstStmt::Continue(_) => Node::Continue,
            AstStmt::Pass(_) => Node::Pass,
            AstStmt::Raise(ast::StmtRaise { exc, .. }) => Node::Raise(exc.map(|e| self.parse_expression(*e)).transpose()?),
            AstStmt::Try(ast::StmtTry {
                body,
                handlers,
                orelse,
                finalbody,
                is_star,
                ..
            }) => {
                if is_star {
                    return Err(ParseError::not_implemented("except* clauses", line));
                }
                Node::Try {
                    body: self.parse_statements(body.into())?,
                    handlers: handlers
                        .into_iter()
                        .map(|h| self.parse_except_handler(h))
                        .collect::<Result<_, _>>()?,
                    orelse: self.parse_statements(orelse.into())?,
                    finalbody: self.parse_statements(finalbody.into())?,
                }
            }
            AstStmt::Assert(ast::StmtAssert { test, msg, .. }) => Node::Assert {
                test: self.parse_expression(*test)?,
                msg: msg.map(|m| self.parse_expression(*m)).transpose()?,
            },
            AstStmt::Import(ast::StmtImport { names, .. }) => Node::Import(
                names
                    .into_iter()
                    .map(|alias| {
                        let module = alias.name.id.as_str().to_owned();
                        let binding = match alias.asname {
                            Some(asname) => asname.id.as_str().to_owned(),
                            None => module.split('.').next().unwrap_or_default().to_owned(),
                        };
                        (module, binding)
                    })
                    .collect(),
            ),
            AstStmt::ImportFrom(ast::StmtImportFrom {
                module, names, level, ..
            }) => {
                if level > 0 {
                    return Err(ParseError::not_implemented("relative imports", line));
                }
                let Some(module) = module else {
                    return Err(ParseError::syntax("missing module name in import", line));
                };
                let mut bindings = Vec::with_capacity(names.len());
                for alias in names {
                    let name = alias.name.id.as_str().to_owned();
                    if name == "*" {
                        return Err(ParseError::not_implemented("star imports", line));
                    }
                    let binding = alias.asname.map_or_else(|| name.clone(), |a| a.id.as_str().to_owned());
                    bindings.push((name, binding));
                }
                Node::ImportFrom {
                    module: module.id.as_str().to_owned(),
                    names: bindings,
                }
            }
            AstStmt::Global(ast::StmtGlobal { names, .. }) => {
                if let Some(declarations) = self.declarations.last_mut() {
                    declarations
                        .globals
                        .extend(names.iter().map(|n| n.id.as_str().to_owned()));
                }
                Node::Pass
            }
            AstStmt::Nonlocal(ast::StmtNonlocal { names, .. }) => {
                let Some(declarations) = self.declarations.last_mut() else {
                    return Err(ParseError::syntax(
                        "nonlocal declaration not allowed at module level",
                        line,
                    ));
                };
                declarations
                    .nonlocals
                    .extend(names.iter().map(|n| n.id.as_str().to_owned()));
                Node::Pass
            }
            AstStmt::Delete(ast::StmtDelete { targets, .. }) => Node::Delete(
                targets
                    .into_iter()
                    .map(|t| self.parse_target(t))
                    .collect::<Result<_, _>>()?,
            ),
            AstStmt::ClassDef(_) => return Err(ParseError::not_implemented("class definitions", line)),
            AstStmt::With(_) => return Err(ParseError::not_implemented("with statements", line)),
            AstStmt::Match(_) => return Err(ParseError::not_implemented("match statements", line)),
            _ => return Err(ParseError::not_implemented("this kind of statement", line)),
        };
        Ok(Stmt { line, node })
    }

    /// Folds `elif`/`else` clauses into nested `If` nodes.
    fn parse_elif_else_clauses(&mut self, clauses: Vec<ElifElseClause>) -> Result<Vec<Stmt>, ParseError> {
        let mut tail: Vec<Stmt> = Vec::new();
        for clause in clauses.into_iter().rev() {
            let line = self.line_of(clause.range);
            match clause.test {
                Some(test) => {
                    let test = self.parse_expression(test)?;
                    let body = self.parse_statements(clause.body.into())?;
                    let orelse = tail;
                    tail = vec![Stmt {
                        line,
                        node: Node::If { test, body, orelse },
                    }];
                }
                None => {
                    tail = self.parse_statements(clause.body.into())?;
                }
            }
        }
        Ok(tail)
    }

    /// Handles `except:`, `except ExcType:`, and `except ExcType as name:` forms.
    fn parse_except_handler(&mut self, handler: ast::ExceptHandler) -> Result<ExceptHandler, ParseError> {
        let ast::ExceptHandler::ExceptHandler(h) = handler;
        let exc_type = h.type_.map(|e| self.parse_expression(*e)).transpose()?;
        let name = h.name.map(|n| n.id.as_str().to_owned());
        let body = self.parse_statements(h.body.into())?;
        Ok(ExceptHandler { exc_type, name, body })
    }

    /// Converts a `def` or `lambda`, resolving which names are local to its body.
    fn parse_function(
        &mut self,
        name: String,
        parameters: Option<ast::Parameters>,
        body: FunctionBody,
        line: u32,
    ) -> Result<FunctionDef, ParseError> {
        let mut params = Vec::new();
        let mut varargs = None;
        let mut kwargs = None;
        // defaults are evaluated in the enclosing scope, so they are converted first
        if let Some(parameters) = parameters {
            for p in parameters.posonlyargs.into_iter().chain(parameters.args) {
                params.push(Param {
                    name: p.parameter.name.id.as_str().to_owned(),
                    default: p.default.map(|d| self.parse_expression(*d)).transpose()?,
                    keyword_only: false,
                });
            }
            for p in parameters.kwonlyargs {
                params.push(Param {
                    name: p.parameter.name.id.as_str().to_owned(),
                    default: p.default.map(|d| self.parse_expression(*d)).transpose()?,
                    keyword_only: true,
                });
            }
            varargs = parameters.vararg.map(|p| p.name.id.as_str().to_owned());
            kwargs = parameters.kwarg.map(|p| p.name.id.as_str().to_owned());
        }

        self.declarations.push(Declarations::default());
        let body = match body {
            FunctionBody::Statements(statements) => self.parse_statements(statements),
            FunctionBody::Lambda(expr) => self.parse_expression(expr).map(|e| {
                vec![Stmt {
                    line,
                    node: Node::Return(Some(e)),
                }]
            }),
        };
        let declarations = self.declarations.pop().unwrap_or_default();
        let body = body?;

        let mut locals: AHashSet<String> = params.iter().map(|p| p.name.clone()).collect();
        locals.extend(varargs.iter().cloned());
        locals.extend(kwargs.iter().cloned());
        collect_bindings(&body, &mut locals);
        locals.retain(|n| !declarations.globals.contains(n) && !declarations.nonlocals.contains(n));

        Ok(FunctionDef {
            name,
            params,
            varargs,
            kwargs,
            body,
            scope: FunctionScope {
                locals,
                globals: declarations.globals,
                nonlocals: declarations.nonlocals,
            },
            line,
        })
    }

    fn parse_target(&mut self, target: AstExpr) -> Result<Target, ParseError> {
        let line = self.line_of(target.range());
        match target {
            AstExpr::Name(ast::ExprName { id, .. }) => Ok(Target::Name(id.as_str().to_owned())),
            AstExpr::Tuple(ast::ExprTuple { elts, .. }) | AstExpr::List(ast::ExprList { elts, .. }) => {
                let mut targets = Vec::with_capacity(elts.len());
                let mut starred = None;
                for (i, elt) in elts.into_iter().enumerate() {
                    if let AstExpr::Starred(ast::ExprStarred { value, .. }) = elt {
                        if starred.is_some() {
                            return Err(ParseError::syntax("multiple starred expressions in assignment", line));
                        }
                        starred = Some(i);
                        targets.push(self.parse_target(*value)?);
                    } else {
                        targets.push(self.parse_target(elt)?);
                    }
                }
                Ok(Target::Unpack { targets, starred })
            }
            AstExpr::Subscript(ast::ExprSubscript { value, slice, .. }) => Ok(Target::Subscript {
                value: self.parse_expression(*value)?,
                index: self.parse_expression(*slice)?,
            }),
            AstExpr::Attribute(_) => Err(ParseError::not_implemented("attribute assignment", line)),
            _ => Err(ParseError::syntax("cannot assign to expression", line)),
        }
    }

    fn parse_expression(&mut self, expression: AstExpr) -> Result<Expr, ParseError> {
        self.decr_depth_remaining(expression.range())?;
        let result = self.parse_expression_impl(expression);
        self.depth_remaining += 1;
        result
    }

    fn parse_expressions(&mut self, expressions: Vec<AstExpr>) -> Result<Vec<Expr>, ParseError> {
        expressions.into_iter().map(|e| self.parse_expression(e)).collect()
    }

    fn parse_expression_impl(&mut self, expression: AstExpr) -> Result<Expr, ParseError> {
        let line = self.line_of(expression.range());
        match expression {
            AstExpr::BoolOp(ast::ExprBoolOp { op, values, .. }) => Ok(Expr::BoolOp {
                and: matches!(op, BoolOp::And),
                values: self.parse_expressions(values)?,
            }),
            AstExpr::Named(_) => Err(ParseError::not_implemented("assignment expressions (:=)", line)),
            AstExpr::BinOp(ast::ExprBinOp { left, op, right, .. }) => Ok(Expr::BinOp {
                left: Box::new(self.parse_expression(*left)?),
                op: convert_op(op, line)?,
                right: Box::new(self.parse_expression(*right)?),
            }),
            AstExpr::UnaryOp(ast::ExprUnaryOp { op, operand, .. }) => Ok(Expr::UnaryOp {
                op: match op {
                    UnaryOp::Not => UnaryOperator::Not,
                    UnaryOp::USub => UnaryOperator::Neg,
                    UnaryOp::UAdd => UnaryOperator::Pos,
                    UnaryOp::Invert => UnaryOperator::Invert,
                },
                operand: Box::new(self.parse_expression(*operand)?),
            }),
            AstExpr::Lambda(ast::ExprLambda { parameters, body, .. }) => {
                let def = self.parse_function(
                    "<lambda>".to_owned(),
                    parameters.map(|p| *p),
                    FunctionBody::Lambda(*body),
                    line,
                )?;
                Ok(Expr::Lambda(Rc::new(def)))
            }
            AstExpr::If(ast::ExprIf { test, body, orelse, .. }) => Ok(Expr::IfExp {
                test: Box::new(self.parse_expression(*test)?),
                body: Box::new(self.parse_expression(*body)?),
                orelse: Box::new(self.parse_expression(*orelse)?),
            }),
            AstExpr::Dict(ast::ExprDict { items, .. }) => {
                let mut pairs = Vec::with_capacity(items.len());
                for ast::DictItem { key, value } in items {
                    let Some(key) = key else {
                        return Err(ParseError::not_implemented("dict unpacking (**)", line));
                    };
                    pairs.push((self.parse_expression(key)?, self.parse_expression(value)?));
                }
                Ok(Expr::Dict(pairs))
            }
            AstExpr::Set(ast::ExprSet { elts, .. }) => Ok(Expr::Set(self.parse_sequence_items(elts, line)?)),
            AstExpr::List(ast::ExprList { elts, .. }) => Ok(Expr::List(self.parse_sequence_items(elts, line)?)),
            AstExpr::Tuple(ast::ExprTuple { elts, .. }) => Ok(Expr::Tuple(self.parse_sequence_items(elts, line)?)),
            AstExpr::ListComp(ast::ExprListComp { elt, generators, .. }) => {
                self.parse_comprehension(ComprehensionKind::List, *elt, None, generators, line)
            }
            AstExpr::SetComp(ast::ExprSetComp { elt, generators, .. }) => {
                self.parse_comprehension(ComprehensionKind::Set, *elt, None, generators, line)
            }
            AstExpr::Generator(ast::ExprGenerator { elt, generators, .. }) => {
                self.parse_comprehension(ComprehensionKind::Generator, *elt, None, generators, line)
            }
            AstExpr::DictComp(ast::ExprDictComp {
                key, value, generators, ..
            }) => self.parse_comprehension(ComprehensionKind::Dict, *value, key.map(|k| *k), generators, line),
            AstExpr::Compare(ast::ExprCompare {
                left,
                ops,
                comparators,
                ..
            }) => {
                let left = Box::new(self.parse_expression(*left)?);
                let comparisons = ops
                    .into_vec()
                    .into_iter()
                    .zip(comparators.into_vec())
                    .map(|(op, right)| Ok((convert_compare_op(op), self.parse_expression(right)?)))
                    .collect::<Result<_, ParseError>>()?;
                Ok(Expr::Compare { left, comparisons })
            }
            AstExpr::Call(ast::ExprCall { func, arguments, .. }) => {
                let ast::Arguments { args, keywords, .. } = arguments;
                let mut call_args = Vec::with_capacity(args.len() + keywords.len());
                for arg in args.into_vec() {
                    call_args.push(match arg {
                        AstExpr::Starred(ast::ExprStarred { value, .. }) => CallArg::Unpack(self.parse_expression(*value)?),
                        other => CallArg::Positional(self.parse_expression(other)?),
                    });
                }
                for keyword in Vec::from(keywords) {
                    let value = self.parse_expression(keyword.value)?;
                    call_args.push(match keyword.arg {
                        Some(name) => CallArg::Keyword(name.id.as_str().to_owned(), value),
                        None => CallArg::UnpackMapping(value),
                    });
                }
                Ok(Expr::Call {
                    func: Box::new(self.parse_expression(*func)?),
                    args: call_args,
                })
            }
            AstExpr::FString(ast::ExprFString { value, .. }) => self.parse_fstring(&value),
            AstExpr::StringLiteral(ast::ExprStringLiteral { value, .. }) => {
                Ok(Expr::Constant(Object::from(value.to_string())))
            }
            AstExpr::NumberLiteral(ast::ExprNumberLiteral { value, .. }) => match value {
                Number::Int(i) => {
                    if let Some(i) = i.as_i64() {
                        Ok(Expr::Constant(Object::Int(i)))
                    } else {
                        let big = parse_int_literal(&i.to_string())
                            .ok_or_else(|| ParseError::syntax(format!("invalid integer literal: {i}"), line))?;
                        Ok(Expr::Constant(Object::from_bigint(big)))
                    }
                }
                Number::Float(f) => Ok(Expr::Constant(Object::Float(f))),
                Number::Complex { .. } => Err(ParseError::not_implemented("complex numbers", line)),
            },
            AstExpr::BooleanLiteral(ast::ExprBooleanLiteral { value, .. }) => Ok(Expr::Constant(Object::Bool(value))),
            AstExpr::NoneLiteral(_) | AstExpr::EllipsisLiteral(_) => Ok(Expr::Constant(Object::None)),
            AstExpr::Attribute(ast::ExprAttribute { value, attr, .. }) => Ok(Expr::Attribute {
                value: Box::new(self.parse_expression(*value)?),
                attr: attr.id.as_str().to_owned(),
            }),
            AstExpr::Subscript(ast::ExprSubscript { value, slice, .. }) => Ok(Expr::Subscript {
                value: Box::new(self.parse_expression(*value)?),
                index: Box::new(self.parse_expression(*slice)?),
            }),
            AstExpr::Slice(ast::ExprSlice { lower, upper, step, .. }) => Ok(Expr::Slice {
                lower: lower.map(|e| self.parse_expression(*e)).transpose()?.map(Box::new),
                upper: upper.map(|e| self.parse_expression(*e)).transpose()?.map(Box::new),
                step: step.map(|e| self.parse_expression(*e)).transpose()?.map(Box::new),
            }),
            AstExpr::Name(ast::ExprName { id, .. }) => Ok(Expr::Name(id.as_str().to_owned())),
            AstExpr::Starred(_) => Err(ParseError::not_implemented("starred expressions (*expr)", line)),
            AstExpr::BytesLiteral(_) => Err(ParseError::not_implemented("bytes literals", line)),
            AstExpr::Await(_) | AstExpr::Yield(_) | AstExpr::YieldFrom(_) => {
                Err(ParseError::not_implemented("generators and coroutines", line))
            }
            _ => Err(ParseError::not_implemented("this kind of expression", line)),
        }
    }

    /// List, tuple and set displays; `*x` inside a display is not supported.
    fn parse_sequence_items(&mut self, elts: Vec<AstExpr>, line: u32) -> Result<Vec<Expr>, ParseError> {
        if elts.iter().any(|e| matches!(e, AstExpr::Starred(_))) {
            return Err(ParseError::not_implemented("unpacking inside displays", line));
        }
        self.parse_expressions(elts)
    }

    fn parse_comprehension(
        &mut self,
        kind: ComprehensionKind,
        elt: AstExpr,
        key: Option<AstExpr>,
        generators: Vec<ast::Comprehension>,
        line: u32,
    ) -> Result<Expr, ParseError> {
        let generators = generators
            .into_iter()
            .map(|comp| {
                if comp.is_async {
                    return Err(ParseError::not_implemented("async comprehensions", line));
                }
                Ok(Generator {
                    target: self.parse_target(comp.target)?,
                    iter: self.parse_expression(comp.iter)?,
                    ifs: self.parse_expressions(comp.ifs)?,
                })
            })
            .collect::<Result<_, _>>()?;
        Ok(Expr::Comprehension {
            kind,
            elt: Box::new(self.parse_expression(elt)?),
            key: key.map(|k| self.parse_expression(k)).transpose()?.map(Box::new),
            generators,
        })
    }

    fn parse_fstring(&mut self, value: &ast::FStringValue) -> Result<Expr, ParseError> {
        let mut parts = Vec::new();
        for fstring_part in value {
            match fstring_part {
                ast::FStringPart::Literal(lit) => {
                    let text = lit.value.to_string();
                    if !text.is_empty() {
                        parts.push(FStringPart::Literal(text));
                    }
                }
                ast::FStringPart::FString(fstring) => {
                    for element in &fstring.elements {
                        parts.push(self.parse_fstring_element(element)?);
                    }
                }
            }
        }
        Ok(Expr::FString(parts))
    }

    fn parse_fstring_element(&mut self, element: &InterpolatedStringElement) -> Result<FStringPart, ParseError> {
        match element {
            InterpolatedStringElement::Literal(lit) => Ok(FStringPart::Literal(lit.value.to_string())),
            InterpolatedStringElement::Interpolation(interp) => {
                let line = self.line_of(interp.range());
                let expr = self.parse_expression((*interp.expression).clone())?;
                let conversion = match interp.conversion {
                    RuffConversionFlag::None => None,
                    RuffConversionFlag::Str => Some('s'),
                    RuffConversionFlag::Repr => Some('r'),
                    RuffConversionFlag::Ascii => Some('a'),
                };
                let mut format_spec = String::new();
                if let Some(spec) = &interp.format_spec {
                    for element in &spec.elements {
                        match element {
                            InterpolatedStringElement::Literal(lit) => format_spec.push_str(&lit.value),
                            InterpolatedStringElement::Interpolation(_) => {
                                return Err(ParseError::not_implemented("nested format specifications", line));
                            }
                        }
                    }
                }
                let debug_text = interp
                    .debug_text
                    .as_ref()
                    .map(|dt| format!("{}{}{}", dt.leading(), &self.code[interp.expression.range()], dt.trailing()));
                Ok(FStringPart::Interpolation {
                    expr,
                    conversion,
                    format_spec,
                    debug_text,
                })
            }
        }
    }

    fn decr_depth_remaining(&mut self, range: TextRange) -> Result<(), ParseError> {
        if let Some(depth_remaining) = self.depth_remaining.checked_sub(1) {
            self.depth_remaining = depth_remaining;
            Ok(())
        } else {
            Err(ParseError::syntax("too many nested parentheses", self.line_of(range)))
        }
    }
}

/// Adds every name bound directly in `body` (not inside nested functions) to `names`.
fn collect_bindings(body: &[Stmt], names: &mut AHashSet<String>) {
    for stmt in body {
        match &stmt.node {
            Node::Assign { targets, .. } => {
                for target in targets {
                    collect_target_names(target, names);
                }
            }
            Node::AugAssign { target, .. } => collect_target_names(target, names),
            Node::Delete(targets) => {
                for target in targets {
                    collect_target_names(target, names);
                }
            }
            Node::FunctionDef(def) => {
                names.insert(def.name.clone());
            }
            Node::If { body, orelse, .. } | Node::While { body, orelse, .. } => {
                collect_bindings(body, names);
                collect_bindings(orelse, names);
            }
            Node::For {
                target, body, orelse, ..
            } => {
                collect_target_names(target, names);
                collect_bindings(body, names);
                collect_bindings(orelse, names);
            }
            Node::Try {
                body,
                handlers,
                orelse,
                finalbody,
            } => {
                collect_bindings(body, names);
                for handler in handlers {
                    if let Some(name) = &handler.name {
                        names.insert(name.clone());
                    }
                    collect_bindings(&handler.body, names);
                }
                collect_bindings(orelse, names);
                collect_bindings(finalbody, names);
            }
            Node::Import(modules) => names.extend(modules.iter().map(|(_, binding)| binding.clone())),
            Node::ImportFrom { names: imported, .. } => {
                names.extend(imported.iter().map(|(_, binding)| binding.clone()));
            }
            Node::Expr(_)
            | Node::Return(_)
            | Node::Break
            | Node::Continue
            | Node::Pass
            | Node::Raise(_)
            | Node::Assert { .. } => {}
        }
    }
}

fn collect_target_names(target: &Target, names: &mut AHashSet<String>) {
    match target {
        Target::Name(name) => {
            names.insert(name.clone());
        }
        Target::Unpack { targets, .. } => {
            for target in targets {
                collect_target_names(target, names);
            }
        }
        Target::Subscript { .. } => {}
    }
}

fn convert_op(op: AstOperator, line: u32) -> Result<Operator, ParseError> {
    Ok(match op {
        AstOperator::Add => Operator::Add,
        AstOperator::Sub => Operator::Sub,
        AstOperator::Mult => Operator::Mult,
        AstOperator::Div => Operator::Div,
        AstOperator::Mod => Operator::Mod,
        AstOperator::Pow => Operator::Pow,
        AstOperator::LShift => Operator::LShift,
        AstOperator::RShift => Operator::RShift,
        AstOperator::BitOr => Operator::BitOr,
        AstOperator::BitXor => Operator::BitXor,
        AstOperator::BitAnd => Operator::BitAnd,
        AstOperator::FloorDiv => Operator::FloorDiv,
        AstOperator::MatMult => return Err(ParseError::not_implemented("the @ operator", line)),
    })
}

fn convert_compare_op(op: CmpOp) -> CmpOperator {
    match op {
        CmpOp::Eq => CmpOperator::Eq,
        CmpOp::NotEq => CmpOperator::NotEq,
        CmpOp::Lt => CmpOperator::Lt,
        CmpOp::LtE => CmpOperator::LtE,
        CmpOp::Gt => CmpOperator::Gt,
        CmpOp::GtE => CmpOperator::GtE,
        CmpOp::Is => CmpOperator::Is,
        CmpOp::IsNot => CmpOperator::IsNot,
        CmpOp::In => CmpOperator::In,
        CmpOp::NotIn => CmpOperator::NotIn,
    }
}

/// Parses an integer literal string into a `BigInt`, handling radix prefixes and underscores.
fn parse_int_literal(s: &str) -> Option<BigInt> {
    let cleaned: String = s.chars().filter(|c| *c != '_').collect();
    if cleaned.len() >= 2 {
        let (prefix, digits) = cleaned.split_at(2);
        match prefix.to_ascii_lowercase().as_str() {
            "0x" => return BigInt::parse_bytes(digits.as_bytes(), 16),
            "0o" => return BigInt::parse_bytes(digits.as_bytes(), 8),
            "0b" => return BigInt::parse_bytes(digits.as_bytes(), 2),
            _ => {}
        }
    }
    cleaned.parse::<BigInt>().ok()
}

/// Error converting source code into the interpreter's tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Error in syntax
    Syntax { msg: Cow<'static, str>, line: u32 },
    /// Valid Python the interpreter does not support.
    /// Message gets prefixed with "pygrade does not support ".
    NotImplemented { msg: Cow<'static, str>, line: u32 },
}

impl ParseError {
    pub(crate) fn syntax(msg: impl Into<Cow<'static, str>>, line: u32) -> Self {
        Self::Syntax { msg: msg.into(), line }
    }

    pub(crate) fn not_implemented(msg: impl Into<Cow<'static, str>>, line: u32) -> Self {
        Self::NotImplemented { msg: msg.into(), line }
    }

    #[must_use]
    pub fn line(&self) -> u32 {
        match self {
            Self::Syntax { line, .. } | Self::NotImplemented { line, .. } => *line,
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Syntax { msg, line } => write!(f, "line {line}: {msg}"),
            Self::NotImplemented { msg, line } => write!(f, "line {line}: pygrade does not support {msg}"),
        }
    }
}

impl std::error::Error for ParseError {}

impl From<ParseError> for Exception {
    /// Parse errors surface in the submission as `SyntaxError` or `NotImplementedError`.
    fn from(error: ParseError) -> Self {
        let line = error.line();
        let exception = match error {
            ParseError::Syntax { msg, .. } => ExcType::SyntaxError.msg(msg),
            ParseError::NotImplemented { msg, .. } => {
                ExcType::NotImplementedError.msg(format!("pygrade does not support {msg}"))
            }
        };
        exception.at_line(line)
    }
}
