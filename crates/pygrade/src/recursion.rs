//! Recursion detection for the recursion assertion.

use std::fmt;

use crate::tracer::{CallTracer, RecursionTracer};

/// Decides whether running some code makes a function call itself, directly or not.
pub trait RecursionDetector: fmt::Debug {
    /// Runs `run` once, handing it the tracer to pass to the sandbox.
    fn performs_recursion(&self, run: &mut dyn FnMut(&mut dyn CallTracer)) -> bool;
}

/// Detector built on [`RecursionTracer`]: reports a recursion as soon as a function is
/// entered while an activation of the same definition is still on the call stack, and
/// stops the run there.
#[derive(Debug, Default, Clone, Copy)]
pub struct TraceRecursionDetector;

impl RecursionDetector for TraceRecursionDetector {
    fn performs_recursion(&self, run: &mut dyn FnMut(&mut dyn CallTracer)) -> bool {
        let mut tracer = RecursionTracer::new();
        run(&mut tracer);
        if let Some(function) = tracer.recursive_function() {
            log::debug!("recursive call detected in {function}()");
        }
        tracer.detected()
    }
}
