//! Tree-walking interpreter for the Python subset used by submissions.
//!
//! [`Interpreter`] is the default [`Sandbox`]: it owns the submitted source, parses it once
//! and runs units of work against a caller-provided [`Namespace`]. The evaluation state of
//! a single run lives in [`Machine`], which borrows the namespace, the streams and the
//! tracer for the duration of the run and is dropped afterwards.

mod call;
mod eval;
mod exec;
pub(crate) mod format;
pub(crate) mod ops;

use std::{fmt, mem, rc::Rc};

use indexmap::IndexMap;

use crate::{
    args::ArgValues,
    builtins::Builtin,
    exception::{ExcType, Exception, RunResult},
    expressions::Stmt,
    function::{Function, Scope},
    io::Streams,
    namespace::Namespace,
    object::Object,
    parse::{ParseError, parse_expression, parse_program},
    resource::ResourceLimits,
    sandbox::{Sandbox, Unit},
    tracer::CallTracer,
    types::Type,
};

/// Default sandbox: evaluates the submission in-process with the tree-walking interpreter.
pub struct Interpreter {
    code: String,
    /// Parsed once so that function definitions keep their identity across reloads.
    program: Option<Result<Rc<[Stmt]>, ParseError>>,
    streams: Streams,
    limits: ResourceLimits,
}

impl Interpreter {
    #[must_use]
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            program: None,
            streams: Streams::default(),
            limits: ResourceLimits::default(),
        }
    }

    #[must_use]
    pub fn with_limits(mut self, limits: ResourceLimits) -> Self {
        self.limits = limits;
        self
    }

    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    fn program(&mut self) -> RunResult<Rc<[Stmt]>> {
        let code = &self.code;
        let parsed = self
            .program
            .get_or_insert_with(|| parse_program(code).map(Rc::from));
        match parsed {
            Ok(program) => Ok(Rc::clone(program)),
            Err(error) => Err(error.clone().into()),
        }
    }
}

impl fmt::Debug for Interpreter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interpreter")
            .field("code_len", &self.code.len())
            .field("limits", &self.limits)
            .field("streams", &self.streams.to_string())
            .finish_non_exhaustive()
    }
}

impl Sandbox for Interpreter {
    fn run(&mut self, unit: &Unit<'_>, namespace: &mut Namespace, tracer: &mut dyn CallTracer) -> RunResult<Object> {
        match unit {
            Unit::Program => {
                let program = self.program()?;
                namespace.insert("__name__", Object::str("__main__"));
                let mut machine = Machine::new(namespace, &mut self.streams, tracer, self.limits);
                machine.exec_module(&program).map(|()| Object::None)
            }
            Unit::Snippet(code) => {
                let program: Rc<[Stmt]> = parse_program(code).map_err(Exception::from)?.into();
                let mut machine = Machine::new(namespace, &mut self.streams, tracer, self.limits);
                machine.exec_module(&program).map(|()| Object::None)
            }
            Unit::Expression(code) => {
                let expr = parse_expression(code).map_err(Exception::from)?;
                let mut machine = Machine::new(namespace, &mut self.streams, tracer, self.limits);
                let mut frame = Frame::module();
                machine.eval(&mut frame, &expr)
            }
            Unit::Call { function, args, kwargs } => {
                let callee = namespace
                    .get(function)
                    .cloned()
                    .ok_or_else(|| name_error(function))?;
                let mut machine = Machine::new(namespace, &mut self.streams, tracer, self.limits);
                machine.call_object(&callee, ArgValues::new(args.to_vec(), kwargs.to_vec()))
            }
        }
    }

    fn install_streams(&mut self, streams: Streams) -> Streams {
        mem::replace(&mut self.streams, streams)
    }

    fn streams(&self) -> &Streams {
        &self.streams
    }
}

pub(crate) fn name_error(name: &str) -> Exception {
    ExcType::NameError.msg(format!("name '{name}' is not defined"))
}

/// Control flow produced by executing a statement.
#[derive(Debug)]
pub(crate) enum Flow {
    Normal,
    Break,
    Continue,
    Return(Object),
}

/// Name resolution context for the code currently executing.
#[derive(Debug)]
pub(crate) struct Frame {
    /// Function being executed, `None` for module-level code.
    pub function: Option<Rc<Function>>,
    /// Local variables; unused at module level, where names live in the globals.
    pub locals: Scope,
    /// Variables of the comprehensions being evaluated, innermost last.
    pub comprehensions: Vec<IndexMap<String, Object>>,
}

impl Frame {
    pub fn module() -> Self {
        Self {
            function: None,
            locals: Scope::default(),
            comprehensions: Vec::new(),
        }
    }

    pub fn function(function: Rc<Function>, locals: IndexMap<String, Object>) -> Self {
        Self {
            function: Some(function),
            locals: Rc::new(locals.into()),
            comprehensions: Vec::new(),
        }
    }
}

/// Evaluation state of one run.
pub(crate) struct Machine<'a> {
    pub globals: &'a mut Namespace,
    pub streams: &'a mut Streams,
    pub tracer: &'a mut dyn CallTracer,
    limits: ResourceLimits,
    /// Number of user-function frames currently active.
    depth: usize,
    /// Exceptions being handled by enclosing `except` blocks, for bare `raise`.
    handling: Vec<Exception>,
}

impl<'a> Machine<'a> {
    pub fn new(
        globals: &'a mut Namespace,
        streams: &'a mut Streams,
        tracer: &'a mut dyn CallTracer,
        limits: ResourceLimits,
    ) -> Self {
        Self {
            globals,
            streams,
            tracer,
            limits,
            depth: 0,
            handling: Vec::new(),
        }
    }

    fn exec_module(&mut self, program: &[Stmt]) -> RunResult<()> {
        let mut frame = Frame::module();
        match self.exec_block(&mut frame, program)? {
            Flow::Normal => Ok(()),
            Flow::Return(_) => Err(ExcType::SyntaxError.msg("'return' outside function")),
            Flow::Break | Flow::Continue => Err(ExcType::SyntaxError.msg("'break' outside loop")),
        }
    }

    /// Resolves a name for reading.
    pub fn load_name(&self, frame: &Frame, name: &str) -> RunResult<Object> {
        for layer in frame.comprehensions.iter().rev() {
            if let Some(value) = layer.get(name) {
                return Ok(value.clone());
            }
        }
        if let Some(function) = &frame.function {
            let scope = &function.def.scope;
            if scope.locals.contains(name) {
                return frame.locals.borrow().get(name).cloned().ok_or_else(|| {
                    ExcType::UnboundLocalError.msg(format!(
                        "cannot access local variable '{name}' where it is not associated with a value"
                    ))
                });
            }
            if !scope.globals.contains(name) {
                for enclosing in &function.closure {
                    if let Some(value) = enclosing.borrow().get(name) {
                        return Ok(value.clone());
                    }
                }
            }
        }
        self.globals
            .get(name)
            .cloned()
            .or_else(|| builtin_global(name))
            .ok_or_else(|| name_error(name))
    }

    /// Binds a name in the scope it belongs to.
    pub fn store_name(&mut self, frame: &mut Frame, name: &str, value: Object) {
        for layer in frame.comprehensions.iter_mut().rev() {
            if let Some(slot) = layer.get_mut(name) {
                *slot = value;
                return;
            }
        }
        if let Some(function) = &frame.function {
            let scope = &function.def.scope;
            if scope.nonlocals.contains(name) {
                let target = function
                    .closure
                    .iter()
                    .find(|enclosing| enclosing.borrow().contains_key(name))
                    .or_else(|| function.closure.first());
                if let Some(target) = target {
                    target.borrow_mut().insert(name.to_owned(), value);
                    return;
                }
            }
            if !scope.globals.contains(name) {
                frame.locals.borrow_mut().insert(name.to_owned(), value);
                return;
            }
        }
        self.globals.insert(name, value);
    }

    /// Unbinds a name for `del`.
    pub fn delete_name(&mut self, frame: &mut Frame, name: &str) -> RunResult<()> {
        if let Some(function) = &frame.function {
            let scope = &function.def.scope;
            if scope.nonlocals.contains(name) {
                for enclosing in &function.closure {
                    if enclosing.borrow_mut().shift_remove(name).is_some() {
                        return Ok(());
                    }
                }
                return Err(name_error(name));
            }
            if !scope.globals.contains(name) {
                return frame
                    .locals
                    .borrow_mut()
                    .shift_remove(name)
                    .map(|_| ())
                    .ok_or_else(|| {
                        ExcType::UnboundLocalError.msg(format!(
                            "cannot access local variable '{name}' where it is not associated with a value"
                        ))
                    });
            }
        }
        self.globals.remove(name).map(|_| ()).ok_or_else(|| name_error(name))
    }

    /// Scopes captured by a function defined while `frame` is executing.
    ///
    /// Comprehension variables are captured by value, as a snapshot of the current iteration.
    pub fn closure_for(frame: &Frame) -> Vec<Scope> {
        let mut closure = Vec::new();
        if !frame.comprehensions.is_empty() {
            let mut snapshot = IndexMap::new();
            for layer in &frame.comprehensions {
                snapshot.extend(layer.iter().map(|(name, value)| (name.clone(), value.clone())));
            }
            closure.push(Rc::new(snapshot.into()));
        }
        if let Some(function) = &frame.function {
            closure.push(Rc::clone(&frame.locals));
            closure.extend(function.closure.iter().cloned());
        }
        closure
    }
}

/// Value of a builtin name such as `len`, `int` or `ValueError`.
pub(crate) fn builtin_global(name: &str) -> Option<Object> {
    if let Some(builtin) = Builtin::from_global_name(name) {
        return Some(Object::Builtin(builtin));
    }
    if let Ok(t) = name.parse::<Type>()
        && t.is_constructor()
    {
        return Some(Object::Type(t));
    }
    name.parse::<ExcType>().ok().map(Object::ExcType)
}
