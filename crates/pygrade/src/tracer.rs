//! Call tracing for the interpreter.
//!
//! The interpreter notifies a [`CallTracer`] every time a user-defined function is entered
//! or left. Builtins are not reported. A tracer may end the run from [`CallTracer::on_call`];
//! the interpreter then unwinds with an exception that no `except` clause catches.
//!
//! | Tracer | Purpose |
//! |--------|---------|
//! | [`NoopTracer`] | No-op, used for ordinary controlled runs |
//! | [`RecursionTracer`] | Detects re-entrant invocation of the same function |
//! | [`RecordingTracer`] | Full event recording for post-mortem inspection |
//!
//! # Usage
//!
//! ```ignore
//! let mut tracer = RecursionTracer::default();
//! // the run is cut short at the first recursive call
//! let _ = sandbox.run(&Unit::Expression("fact(5)"), &mut namespace, &mut tracer);
//! assert!(tracer.detected());
//! ```

use std::{fmt, ops::ControlFlow, rc::Rc};

use crate::expressions::FunctionDef;

/// Identity of a function's code.
///
/// Every function value created from the same `def` statement shares one id, including
/// values re-created when the submitted module is run again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FunctionId(usize);

impl FunctionId {
    pub(crate) fn of(def: &Rc<FunctionDef>) -> Self {
        Self(Rc::as_ptr(def) as usize)
    }
}

/// Trace event captured by [`RecordingTracer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceEvent {
    /// A user function was entered.
    Call {
        name: String,
        /// Call depth after entering, 1 for a call made from module level.
        depth: usize,
    },
    /// A user function returned or raised.
    Return {
        /// Call depth after leaving.
        depth: usize,
    },
}

/// Hooks called by the interpreter around user-function calls.
///
/// All methods have default no-op implementations.
pub trait CallTracer: fmt::Debug {
    /// Called after a new frame is pushed, before the body runs.
    ///
    /// Returning [`ControlFlow::Break`] ends the whole run: the frame is popped again
    /// (with a matching [`CallTracer::on_return`]) and the run fails with a halt exception.
    ///
    /// # Arguments
    /// * `function` - Code identity of the callee
    /// * `name` - Function name (`<lambda>` for lambdas)
    /// * `depth` - Call stack depth after the push
    #[inline]
    fn on_call(&mut self, _function: FunctionId, _name: &str, _depth: usize) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }

    /// Called when a frame is popped, whether by `return` or by an exception.
    #[inline]
    fn on_return(&mut self, _depth: usize) {}
}

/// Tracer that does nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTracer;

impl CallTracer for NoopTracer {}

/// Detects a function being entered while an activation of the same function is still live.
///
/// The run is stopped at the first such call.
#[derive(Debug, Default)]
pub struct RecursionTracer {
    stack: Vec<FunctionId>,
    recursive: Option<String>,
}

impl RecursionTracer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn detected(&self) -> bool {
        self.recursive.is_some()
    }

    /// Name of the first function seen recursing.
    #[must_use]
    pub fn recursive_function(&self) -> Option<&str> {
        self.recursive.as_deref()
    }
}

impl CallTracer for RecursionTracer {
    fn on_call(&mut self, function: FunctionId, name: &str, _depth: usize) -> ControlFlow<()> {
        let reentered = self.stack.contains(&function);
        self.stack.push(function);
        if reentered {
            self.recursive = Some(name.to_owned());
            return ControlFlow::Break(());
        }
        ControlFlow::Continue(())
    }

    fn on_return(&mut self, _depth: usize) {
        self.stack.pop();
    }
}

/// Records every call and return.
#[derive(Debug, Default)]
pub struct RecordingTracer {
    events: Vec<TraceEvent>,
}

impl RecordingTracer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn events(&self) -> &[TraceEvent] {
        &self.events
    }

    /// Names of the called functions, in call order.
    pub fn called_names(&self) -> impl Iterator<Item = &str> {
        self.events.iter().filter_map(|event| match event {
            TraceEvent::Call { name, .. } => Some(name.as_str()),
            TraceEvent::Return { .. } => None,
        })
    }

    #[must_use]
    pub fn max_depth(&self) -> usize {
        self.events
            .iter()
            .map(|event| match event {
                TraceEvent::Call { depth, .. } | TraceEvent::Return { depth } => *depth,
            })
            .max()
            .unwrap_or(0)
    }
}

impl CallTracer for RecordingTracer {
    fn on_call(&mut self, _function: FunctionId, name: &str, depth: usize) -> ControlFlow<()> {
        self.events.push(TraceEvent::Call {
            name: name.to_owned(),
            depth,
        });
        ControlFlow::Continue(())
    }

    fn on_return(&mut self, depth: usize) {
        self.events.push(TraceEvent::Return { depth });
    }
}
