//! The seam between the grader and whatever executes the submission.

use std::fmt::{self, Write as _};

use crate::{exception::RunResult, io::Streams, namespace::Namespace, object::Object, tracer::CallTracer};

/// One unit of work run against the submission's namespace.
#[derive(Debug, Clone, Copy)]
pub enum Unit<'a> {
    /// The whole submitted program, run as `__main__`.
    Program,
    /// Extra statements, e.g. an instructor preamble.
    Snippet(&'a str),
    /// A single expression whose value is the result.
    Expression(&'a str),
    /// A call of a function defined in the namespace.
    Call {
        function: &'a str,
        args: &'a [Object],
        kwargs: &'a [(String, Object)],
    },
}

impl Unit<'_> {
    /// Source-like rendering of expressions and calls, e.g. `f(1, 'a', key=2)`.
    #[must_use]
    pub fn source(&self) -> Option<String> {
        match self {
            Self::Program | Self::Snippet(_) => None,
            Self::Expression(code) => Some((*code).to_owned()),
            Self::Call { function, args, kwargs } => Some(render_call(function, args, kwargs)),
        }
    }
}

/// Renders a call expression with `repr()` arguments.
#[must_use]
pub fn render_call(function: &str, args: &[Object], kwargs: &[(String, Object)]) -> String {
    let mut out = format!("{function}(");
    let mut first = true;
    for arg in args {
        if !first {
            out.push_str(", ");
        }
        first = false;
        out.push_str(&arg.py_repr());
    }
    for (name, value) in kwargs {
        if !first {
            out.push_str(", ");
        }
        first = false;
        let _ = write!(out, "{name}={}", value.py_repr());
    }
    out.push(')');
    out
}

/// Executes submitted code.
///
/// Implementations hold the streams of the current run (input queue, argv and captured
/// output). The grader swaps them around every run with a [`StreamGuard`], so a sandbox
/// never sees the streams of another run.
pub trait Sandbox: fmt::Debug {
    /// Runs `unit` against `namespace`, reporting user-function calls to `tracer`.
    ///
    /// Errors raised by the submission are returned, never panicked.
    fn run(&mut self, unit: &Unit<'_>, namespace: &mut Namespace, tracer: &mut dyn CallTracer) -> RunResult<Object>;

    /// Replaces the current streams, returning the previous ones.
    fn install_streams(&mut self, streams: Streams) -> Streams;

    fn streams(&self) -> &Streams;

    /// Values the current streams expose as `sys.argv`.
    fn argv(&self) -> &[String] {
        self.streams().argv()
    }
}

/// Installs fresh streams into a sandbox for one run and puts the previous ones back.
///
/// The previous streams are restored on every exit path: explicitly with
/// [`StreamGuard::finish`], which hands back the streams of the run, or on drop.
pub struct StreamGuard<'a> {
    sandbox: &'a mut dyn Sandbox,
    saved: Option<Streams>,
}

impl<'a> StreamGuard<'a> {
    pub fn install(sandbox: &'a mut dyn Sandbox, streams: Streams) -> Self {
        let saved = sandbox.install_streams(streams);
        Self {
            sandbox,
            saved: Some(saved),
        }
    }

    pub fn run(&mut self, unit: &Unit<'_>, namespace: &mut Namespace, tracer: &mut dyn CallTracer) -> RunResult<Object> {
        self.sandbox.run(unit, namespace, tracer)
    }

    #[must_use]
    pub fn streams(&self) -> &Streams {
        self.sandbox.streams()
    }

    /// Restores the previous streams and returns the ones used by the run.
    #[must_use]
    pub fn finish(mut self) -> Streams {
        let saved = self.saved.take().unwrap_or_default();
        self.sandbox.install_streams(saved)
    }
}

impl Drop for StreamGuard<'_> {
    fn drop(&mut self) {
        if let Some(saved) = self.saved.take() {
            self.sandbox.install_streams(saved);
        }
    }
}

impl fmt::Debug for StreamGuard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamGuard")
            .field("restored", &self.saved.is_none())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{interp::Interpreter, tracer::NoopTracer};

    #[test]
    fn guard_restores_streams_on_drop() {
        let mut sandbox = Interpreter::new("print('hi')");
        let mut namespace = Namespace::new();
        {
            let mut guard = StreamGuard::install(&mut sandbox, Streams::new(vec![], vec!["run".into()], false));
            assert_eq!(guard.streams().argv(), ["run".to_owned()]);
            guard.run(&Unit::Program, &mut namespace, &mut NoopTracer).unwrap();
        }
        assert!(sandbox.argv().is_empty());
        assert_eq!(sandbox.streams().stdout(), "");
    }

    #[test]
    fn finish_hands_back_run_streams() {
        let mut sandbox = Interpreter::new("print('hi')");
        let mut namespace = Namespace::new();
        let mut guard = StreamGuard::install(&mut sandbox, Streams::default());
        guard.run(&Unit::Program, &mut namespace, &mut NoopTracer).unwrap();
        let streams = guard.finish();
        assert_eq!(streams.stdout(), "hi\n");
    }

    #[test]
    fn call_rendering() {
        let args = [Object::Int(1), Object::from("a")];
        let kwargs = [("key".to_owned(), Object::Bool(true))];
        assert_eq!(render_call("f", &args, &kwargs), "f(1, 'a', key=True)");
    }
}
