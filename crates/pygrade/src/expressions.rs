//! Owned syntax tree evaluated by the interpreter.
//!
//! The parser converts ruff's AST into these types once per source string. The tree only
//! covers the subset of Python the interpreter supports, so unsupported syntax is rejected
//! at parse time with a clear error instead of failing halfway through a run.

use std::rc::Rc;

use ahash::AHashSet;

use crate::object::Object;

/// Binary operators, shared by `BinOp` and augmented assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Operator {
    Add,
    Sub,
    Mult,
    Div,
    FloorDiv,
    Mod,
    Pow,
    LShift,
    RShift,
    BitOr,
    BitXor,
    BitAnd,
}

impl Operator {
    /// Source symbol, used in `TypeError` messages.
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mult => "*",
            Self::Div => "/",
            Self::FloorDiv => "//",
            Self::Mod => "%",
            Self::Pow => "**",
            Self::LShift => "<<",
            Self::RShift => ">>",
            Self::BitOr => "|",
            Self::BitXor => "^",
            Self::BitAnd => "&",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UnaryOperator {
    Not,
    Neg,
    Pos,
    Invert,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CmpOperator {
    Eq,
    NotEq,
    Lt,
    LtE,
    Gt,
    GtE,
    Is,
    IsNot,
    In,
    NotIn,
}

impl CmpOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::NotEq => "!=",
            Self::Lt => "<",
            Self::LtE => "<=",
            Self::Gt => ">",
            Self::GtE => ">=",
            Self::Is => "is",
            Self::IsNot => "is not",
            Self::In => "in",
            Self::NotIn => "not in",
        }
    }
}

/// One argument at a call site.
#[derive(Debug, Clone)]
pub(crate) enum CallArg {
    Positional(Expr),
    /// `*iterable`
    Unpack(Expr),
    Keyword(String, Expr),
    /// `**mapping`
    UnpackMapping(Expr),
}

/// A piece of an f-string.
#[derive(Debug, Clone)]
pub(crate) enum FStringPart {
    Literal(String),
    Interpolation {
        expr: Expr,
        /// `!r` / `!s` / `!a`
        conversion: Option<char>,
        /// Static format spec after `:`; nested replacement fields are not supported.
        format_spec: String,
        /// Text emitted before the value for the `{x=}` debug form.
        debug_text: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ComprehensionKind {
    List,
    Set,
    /// Generator expressions are materialized as lists.
    Generator,
    Dict,
}

#[derive(Debug, Clone)]
pub(crate) struct Generator {
    pub target: Target,
    pub iter: Expr,
    pub ifs: Vec<Expr>,
}

#[derive(Debug, Clone)]
pub(crate) enum Expr {
    /// Immutable literal value.
    Constant(Object),
    FString(Vec<FStringPart>),
    Name(String),
    List(Vec<Expr>),
    Tuple(Vec<Expr>),
    Set(Vec<Expr>),
    Dict(Vec<(Expr, Expr)>),
    BinOp {
        left: Box<Expr>,
        op: Operator,
        right: Box<Expr>,
    },
    UnaryOp {
        op: UnaryOperator,
        operand: Box<Expr>,
    },
    /// `and` is `true`, `or` is `false`.
    BoolOp {
        and: bool,
        values: Vec<Expr>,
    },
    Compare {
        left: Box<Expr>,
        comparisons: Vec<(CmpOperator, Expr)>,
    },
    Call {
        func: Box<Expr>,
        args: Vec<CallArg>,
    },
    Attribute {
        value: Box<Expr>,
        attr: String,
    },
    Subscript {
        value: Box<Expr>,
        index: Box<Expr>,
    },
    Slice {
        lower: Option<Box<Expr>>,
        upper: Option<Box<Expr>>,
        step: Option<Box<Expr>>,
    },
    IfExp {
        test: Box<Expr>,
        body: Box<Expr>,
        orelse: Box<Expr>,
    },
    Lambda(Rc<FunctionDef>),
    Comprehension {
        kind: ComprehensionKind,
        /// Value expression; for dict comprehensions this is the value and `key` is set.
        elt: Box<Expr>,
        key: Option<Box<Expr>>,
        generators: Vec<Generator>,
    },
}

/// Assignment target.
#[derive(Debug, Clone)]
pub(crate) enum Target {
    Name(String),
    /// Tuple or list unpacking; `starred` is the index of a `*rest` element.
    Unpack {
        targets: Vec<Target>,
        starred: Option<usize>,
    },
    Subscript {
        value: Expr,
        index: Expr,
    },
}

#[derive(Debug, Clone)]
pub(crate) struct ExceptHandler {
    pub exc_type: Option<Expr>,
    pub name: Option<String>,
    pub body: Vec<Stmt>,
}

/// A statement together with its 1-based source line.
#[derive(Debug, Clone)]
pub(crate) struct Stmt {
    pub line: u32,
    pub node: Node,
}

#[derive(Debug, Clone)]
pub(crate) enum Node {
    Expr(Expr),
    Assign {
        targets: Vec<Target>,
        value: Expr,
    },
    AugAssign {
        target: Target,
        op: Operator,
        value: Expr,
    },
    FunctionDef(Rc<FunctionDef>),
    Return(Option<Expr>),
    If {
        test: Expr,
        body: Vec<Stmt>,
        orelse: Vec<Stmt>,
    },
    While {
        test: Expr,
        body: Vec<Stmt>,
        orelse: Vec<Stmt>,
    },
    For {
        target: Target,
        iter: Expr,
        body: Vec<Stmt>,
        orelse: Vec<Stmt>,
    },
    Break,
    Continue,
    Pass,
    Raise(Option<Expr>),
    Try {
        body: Vec<Stmt>,
        handlers: Vec<ExceptHandler>,
        orelse: Vec<Stmt>,
        finalbody: Vec<Stmt>,
    },
    Assert {
        test: Expr,
        msg: Option<Expr>,
    },
    /// `import module [as binding], ...` as `(module, binding)` pairs.
    Import(Vec<(String, String)>),
    /// `from module import name [as binding], ...`
    ImportFrom {
        module: String,
        names: Vec<(String, String)>,
    },
    Delete(Vec<Target>),
}

#[derive(Debug, Clone)]
pub(crate) struct Param {
    pub name: String,
    pub default: Option<Expr>,
    pub keyword_only: bool,
}

/// Names resolved statically for one function body.
#[derive(Debug, Clone, Default)]
pub(crate) struct FunctionScope {
    /// Names bound anywhere in the body (parameters included) that are not declared
    /// `global` or `nonlocal`.
    pub locals: AHashSet<String>,
    pub globals: AHashSet<String>,
    pub nonlocals: AHashSet<String>,
}

/// A `def` or `lambda` definition. Its address is the function's code identity.
#[derive(Debug)]
pub(crate) struct FunctionDef {
    pub name: String,
    pub params: Vec<Param>,
    pub varargs: Option<String>,
    pub kwargs: Option<String>,
    pub body: Vec<Stmt>,
    pub scope: FunctionScope,
    pub line: u32,
}

impl FunctionDef {
    /// Names of the positional parameters, in declaration order.
    pub fn positional_names(&self) -> impl Iterator<Item = &str> {
        self.params.iter().filter(|p| !p.keyword_only).map(|p| p.name.as_str())
    }

    /// Number of parameters carrying a default value.
    pub fn defaults_count(&self) -> usize {
        self.params.iter().filter(|p| p.default.is_some()).count()
    }
}
