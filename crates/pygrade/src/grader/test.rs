//! A single test: its state, the effect of its last run and its assertions.

use std::fmt::Write as _;

use log::debug;

use crate::{
    exception::Exception,
    grader::{
        assertion::{Assert, backquoted, visible_text},
        effect::{ArgSnapshot, Effect},
        error::{GradeResult, StopGrader},
        params::{ParamOverrides, Params},
    },
    io::Streams,
    namespace::{Namespace, diff},
    object::Object,
    recursion::RecursionDetector,
    sandbox::{Sandbox, StreamGuard, Unit},
    tracer::NoopTracer,
};

/// Settings of a new test. Everything is optional.
#[derive(Debug, Clone, Default)]
pub struct TestOptions {
    pub title: Option<String>,
    pub descr: String,
    pub hint: String,
    /// Defaults to 1.
    pub weight: Option<f64>,
    /// Entries layered over the inherited state.
    pub state: Namespace,
    pub inputs: Vec<String>,
    /// Program arguments, without the script name.
    pub argv: Vec<String>,
    pub params: ParamOverrides,
}

impl TestOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    #[must_use]
    pub fn descr(mut self, descr: impl Into<String>) -> Self {
        self.descr = descr.into();
        self
    }

    #[must_use]
    pub fn hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = hint.into();
        self
    }

    #[must_use]
    pub fn weight(mut self, weight: f64) -> Self {
        self.weight = Some(weight);
        self
    }

    #[must_use]
    pub fn state<K: Into<String>>(mut self, state: impl IntoIterator<Item = (K, Object)>) -> Self {
        for (name, value) in state {
            self.state.insert(name, value);
        }
        self
    }

    #[must_use]
    pub fn inputs<S: Into<String>>(mut self, inputs: impl IntoIterator<Item = S>) -> Self {
        self.inputs = inputs.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn argv<S: Into<String>>(mut self, argv: impl IntoIterator<Item = S>) -> Self {
        self.argv = argv.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn params(mut self, params: ParamOverrides) -> Self {
        self.params = params;
        self
    }

    #[must_use]
    pub fn keep_state(mut self, keep_state: bool) -> Self {
        self.params.keep_state = Some(keep_state);
        self
    }

    #[must_use]
    pub fn fail_fast(mut self, fail_fast: bool) -> Self {
        self.params.test_fail_fast = Some(fail_fast);
        self
    }
}

#[derive(Debug, Clone)]
pub struct Test {
    number: usize,
    title: String,
    has_title: bool,
    descr: String,
    hint: String,
    weight: f64,
    params: Params,
    script_name: String,
    /// Live namespace the runs of this test execute against.
    state: Namespace,
    /// Snapshot taken just before the last run.
    previous_state: Namespace,
    inputs: Vec<String>,
    /// Inputs served to the last run.
    previous_inputs: Vec<String>,
    argv: Vec<String>,
    expression: Option<String>,
    effect: Effect,
    recursion: Option<bool>,
    assertions: Vec<Assert>,
    status: bool,
    ran: bool,
}

impl Test {
    /// Creates test `number` starting from `state`, with the explicit option state layered on top.
    pub(crate) fn new(number: usize, options: TestOptions, params: Params, mut state: Namespace, script_name: &str) -> Self {
        state.update(options.state);
        let has_title = options.title.is_some();
        Self {
            number,
            title: options.title.unwrap_or_else(|| format!("Test {number}")),
            has_title,
            descr: options.descr,
            hint: options.hint,
            weight: options.weight.unwrap_or(1.0),
            params,
            script_name: script_name.to_owned(),
            previous_state: state.deep_copy(),
            state,
            previous_inputs: options.inputs.clone(),
            inputs: options.inputs,
            argv: options.argv,
            expression: None,
            effect: Effect::default(),
            recursion: None,
            assertions: Vec::new(),
            status: true,
            ran: false,
        }
    }

    #[must_use]
    pub fn number(&self) -> usize {
        self.number
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn descr(&self) -> &str {
        &self.descr
    }

    #[must_use]
    pub fn hint(&self) -> &str {
        &self.hint
    }

    #[must_use]
    pub fn weight(&self) -> f64 {
        self.weight
    }

    #[must_use]
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Conjunction of every recorded assertion status; true for a test without assertions.
    #[must_use]
    pub fn status(&self) -> bool {
        self.status
    }

    #[must_use]
    pub fn state(&self) -> &Namespace {
        &self.state
    }

    #[must_use]
    pub fn previous_state(&self) -> &Namespace {
        &self.previous_state
    }

    /// Input lines not read yet; each run consumes from the front.
    #[must_use]
    pub fn inputs(&self) -> &[String] {
        &self.inputs
    }

    #[must_use]
    pub fn argv(&self) -> &[String] {
        &self.argv
    }

    /// Source of the last evaluated expression or call.
    #[must_use]
    pub fn expression(&self) -> Option<&str> {
        self.expression.as_deref()
    }

    #[must_use]
    pub fn effect(&self) -> &Effect {
        &self.effect
    }

    /// Outcome of the last recursion detection, if one ran.
    #[must_use]
    pub fn recursion(&self) -> Option<bool> {
        self.recursion
    }

    #[must_use]
    pub fn assertions(&self) -> &[Assert] {
        &self.assertions
    }

    /// `(weight if passed else 0, weight)`.
    #[must_use]
    pub fn get_grade(&self) -> (f64, f64) {
        (if self.status { self.weight } else { 0.0 }, self.weight)
    }

    pub(crate) fn has_title(&self) -> bool {
        self.has_title
    }

    pub(crate) fn set_title(&mut self, title: String) {
        self.title = title;
        self.has_title = true;
    }

    pub(crate) fn set_state(&mut self, state: Namespace) {
        self.state = state;
        self.refresh_context();
    }

    pub(crate) fn update_state(&mut self, state: Namespace) {
        self.state.update(state);
        self.refresh_context();
    }

    pub(crate) fn set_inputs(&mut self, inputs: Vec<String>) {
        self.inputs = inputs;
        self.refresh_context();
    }

    pub(crate) fn set_argv(&mut self, argv: Vec<String>) {
        self.argv = argv;
    }

    /// Until the first run, the context describes the configured state and inputs.
    fn refresh_context(&mut self) {
        if !self.ran {
            self.previous_state = self.state.deep_copy();
            self.previous_inputs.clone_from(&self.inputs);
        }
    }

    fn full_argv(&self) -> Vec<String> {
        let mut argv = Vec::with_capacity(self.argv.len() + 1);
        argv.push(self.script_name.clone());
        argv.extend(self.argv.iter().cloned());
        argv
    }

    /// Runs the submitted program against the test state.
    pub(crate) fn execute_source(&mut self, sandbox: &mut dyn Sandbox) {
        self.run(sandbox, &Unit::Program);
    }

    pub(crate) fn evaluate(&mut self, sandbox: &mut dyn Sandbox, expression: &str) {
        self.expression = Some(expression.to_owned());
        self.run(sandbox, &Unit::Expression(expression));
    }

    pub(crate) fn call_function(
        &mut self,
        sandbox: &mut dyn Sandbox,
        function: &str,
        args: &[Object],
        kwargs: &[(String, Object)],
    ) {
        let unit = Unit::Call { function, args, kwargs };
        self.expression = unit.source();
        self.run(sandbox, &unit);
    }

    /// Runs instructor statements in the test state, outside of any recorded effect.
    pub(crate) fn exec_preamble(&mut self, sandbox: &mut dyn Sandbox, code: &str) -> Result<(), Exception> {
        let mut guard = StreamGuard::install(sandbox, Streams::new(Vec::new(), self.full_argv(), false));
        guard.run(&Unit::Snippet(code), &mut self.state, &mut NoopTracer)?;
        self.refresh_context();
        Ok(())
    }

    /// Controlled run: snapshots the state, substitutes the streams, captures every effect.
    fn run(&mut self, sandbox: &mut dyn Sandbox, unit: &Unit<'_>) {
        self.previous_state = self.state.deep_copy();
        self.previous_inputs.clone_from(&self.inputs);
        self.ran = true;
        let arg_names = self.argument_names(unit);
        let args_before = arg_names.as_ref().map(|names| argument_copies(names, unit));

        let streams = Streams::new(self.inputs.clone(), self.full_argv(), self.params.verbose_inputs);
        let mut guard = StreamGuard::install(sandbox, streams);
        let outcome = guard.run(unit, &mut self.state, &mut NoopTracer);
        let (stdout, stderr, remaining) = guard.finish().into_captured();

        let consumed = self.inputs.len().saturating_sub(remaining.len());
        let (result, exception) = match outcome {
            Ok(value) => (Some(value), None),
            Err(exception) => (None, Some(exception)),
        };
        let result = match unit {
            Unit::Program | Unit::Snippet(_) => None,
            Unit::Expression(_) | Unit::Call { .. } => result,
        };
        let args = args_before.zip(arg_names).map(|(before, names)| ArgSnapshot {
            before,
            after: argument_copies(&names, unit),
        });
        debug!(
            "test {}: ran {}, {} bytes of output, {} inputs read{}",
            self.number,
            unit.source().as_deref().unwrap_or("program"),
            stdout.len(),
            consumed,
            exception.as_ref().map(|e| format!(", raised {e}")).unwrap_or_default()
        );
        let consumed_inputs = self.inputs[..consumed].to_vec();
        self.inputs = remaining;
        self.effect = Effect {
            stdout,
            stderr,
            result,
            exception,
            consumed_inputs,
            args,
        };
    }

    /// Keeps an exception raised while loading the program when the run that followed raised none.
    pub(crate) fn carry_exception(&mut self, exception: Option<Exception>) {
        if self.effect.exception.is_none() {
            self.effect.exception = exception;
        }
    }

    /// Parameter names the arguments of a call are recorded under.
    fn argument_names(&self, unit: &Unit<'_>) -> Option<Vec<String>> {
        let Unit::Call { function, .. } = unit else {
            return None;
        };
        Some(match self.state.get(function) {
            Some(Object::Function(f)) => f.parameter_names(),
            _ => Vec::new(),
        })
    }

    /// Runs `unit` on a copy of the state with discarded streams and records whether it recursed.
    ///
    /// Input is served from the lines the last run started with.
    pub(crate) fn detect_recursion(
        &mut self,
        sandbox: &mut dyn Sandbox,
        detector: &dyn RecursionDetector,
        unit: &Unit<'_>,
    ) -> bool {
        let mut namespace = self.state.deep_copy();
        let copied_args: Vec<Object>;
        let copied_kwargs: Vec<(String, Object)>;
        let unit = match *unit {
            Unit::Call { function, args, kwargs } => {
                copied_args = args.iter().map(Object::deep_copy).collect();
                copied_kwargs = kwargs.iter().map(|(k, v)| (k.clone(), v.deep_copy())).collect();
                Unit::Call {
                    function,
                    args: &copied_args,
                    kwargs: &copied_kwargs,
                }
            }
            other => other,
        };
        let streams = Streams::new(self.previous_inputs.clone(), self.full_argv(), false);
        let mut guard = StreamGuard::install(sandbox, streams);
        let detected = detector.performs_recursion(&mut |tracer| {
            // the outcome of this run is not part of the test's effect
            let _ = guard.run(&unit, &mut namespace, tracer);
        });
        self.recursion = Some(detected);
        detected
    }

    /// Appends an assertion and signals a stop when a fail-fast test has failed.
    pub(crate) fn record(&mut self, assert: Assert) -> GradeResult {
        debug!(
            "test {}: assertion {} ({}) {}",
            self.number,
            assert.number(),
            assert.kind_name(),
            if assert.status() { "passed" } else { "failed" }
        );
        self.status &= assert.status();
        self.assertions.push(assert);
        if self.params.test_fail_fast && !self.status {
            Err(StopGrader.into())
        } else {
            Ok(())
        }
    }

    /// What the last run started from: global names, available inputs and arguments.
    #[must_use]
    pub fn describe_context(&self) -> String {
        let mut lines = Vec::new();
        let names: Vec<&str> = self.previous_state.user_names().collect();
        if !names.is_empty() {
            lines.push(format!("Global variables: {}", backquoted(names.into_iter())));
        }
        if !self.previous_inputs.is_empty() {
            lines.push(format!(
                "Input lines: {}",
                backquoted(self.previous_inputs.iter().map(String::as_str))
            ));
        }
        if !self.argv.is_empty() {
            lines.push(format!("Program arguments: {}", backquoted(self.argv.iter().map(String::as_str))));
        }
        if lines.is_empty() {
            "No global variables, inputs or arguments".to_owned()
        } else {
            lines.join("\n")
        }
    }

    /// What the last run did: result, variable changes, inputs read, output and exception.
    #[must_use]
    pub fn describe_results(&self) -> String {
        let mut lines = Vec::new();
        if self.expression.is_some()
            && let Some(result) = &self.effect.result
            && !matches!(result, Object::None)
        {
            lines.push(format!("Result: {}", result.py_repr()));
        }
        let changes = diff(&self.previous_state, &self.state);
        if !changes.added.is_empty() {
            lines.push(format!(
                "Created variables: {}",
                backquoted(changes.added.iter().map(String::as_str))
            ));
        }
        if !changes.modified.is_empty() {
            let mut line = "Modified variables:".to_owned();
            for (i, change) in changes.modified.iter().enumerate() {
                let sep = if i == 0 { " " } else { ", " };
                let _ = write!(
                    line,
                    "{sep}`{}` ({} before, {} after)",
                    change.name,
                    change.before.py_repr(),
                    change.after.py_repr()
                );
            }
            lines.push(line);
        }
        if !changes.deleted.is_empty() {
            lines.push(format!(
                "Deleted variables: {}",
                backquoted(changes.deleted.iter().map(String::as_str))
            ));
        }
        if !self.effect.consumed_inputs.is_empty() {
            lines.push(format!(
                "Input lines read: {}",
                backquoted(self.effect.consumed_inputs.iter().map(String::as_str))
            ));
        }
        if !self.effect.stdout.is_empty() {
            lines.push(format!("Printed text:\n{}", visible_text(&self.effect.stdout)));
        }
        if let Some(exception) = &self.effect.exception {
            lines.push(format!("Exception raised: {}", exception.summary()));
        }
        if lines.is_empty() {
            "No observable effect".to_owned()
        } else {
            lines.join("\n")
        }
    }
}

/// Independent copies of the call arguments: positional ones under the parameter names, keyword ones
/// under their own names. Each argument is copied on its own, so aliases compare independently.
fn argument_copies(names: &[String], unit: &Unit<'_>) -> Namespace {
    let mut copies = Namespace::new();
    if let Unit::Call { args, kwargs, .. } = unit {
        for (name, value) in names.iter().zip(args.iter()) {
            copies.insert(name.clone(), value.deep_copy());
        }
        for (name, value) in *kwargs {
            copies.insert(name.clone(), value.deep_copy());
        }
    }
    copies
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{exception::ExcType, interp::Interpreter};

    fn new_test(code: &str, options: TestOptions) -> (Interpreter, Test) {
        let test = Test::new(1, options, Params::default(), Namespace::new(), "submission.py");
        (Interpreter::new(code), test)
    }

    #[test]
    fn default_title_uses_number() {
        let (_, test) = new_test("", TestOptions::new());
        assert_eq!(test.title(), "Test 1");
        assert!(!test.has_title());
    }

    #[test]
    fn program_run_captures_output_and_inputs() {
        let (mut sandbox, mut test) = new_test(
            "name = input('Name? ')\nprint('Hello', name)",
            TestOptions::new().inputs(["Ada", "unused"]),
        );
        test.execute_source(&mut sandbox);
        assert_eq!(test.effect().stdout, "Name? Ada\nHello Ada\n");
        assert_eq!(test.effect().consumed_inputs, vec!["Ada".to_owned()]);
        assert_eq!(test.effect().result, None);
        assert_eq!(test.state().get("name"), Some(&Object::str("Ada")));
    }

    #[test]
    fn later_runs_read_the_remaining_inputs() {
        let (mut sandbox, mut test) = new_test("x = input()\n", TestOptions::new().inputs(["a", "b"]));
        test.execute_source(&mut sandbox);
        assert_eq!(test.inputs(), ["b".to_owned()]);
        test.evaluate(&mut sandbox, "input()");
        assert_eq!(test.effect().result, Some(Object::str("b")));
        assert_eq!(test.effect().consumed_inputs, vec!["b".to_owned()]);
        assert!(test.inputs().is_empty());
    }

    #[test]
    fn exhausted_inputs_raise_eof() {
        let (mut sandbox, mut test) = new_test("input()", TestOptions::new());
        test.execute_source(&mut sandbox);
        let exception = test.effect().exception.as_ref().unwrap();
        assert_eq!(exception.exc_type(), ExcType::EOFError);
        assert_eq!(exception.message(), Some("No input to be read"));
    }

    #[test]
    fn call_snapshots_arguments() {
        let (mut sandbox, mut test) = new_test("def push(items, x):\n    items.append(x)\n", TestOptions::new());
        test.execute_source(&mut sandbox);
        let items = Object::list(vec![Object::Int(1)]);
        test.call_function(&mut sandbox, "push", &[items, Object::Int(2)], &[]);
        let args = test.effect().args.as_ref().unwrap();
        assert_eq!(args.before.get("items").unwrap().py_repr(), "[1]");
        assert_eq!(args.after.get("items").unwrap().py_repr(), "[1, 2]");
        assert_eq!(test.expression(), Some("push([1], 2)"));
    }

    #[test]
    fn context_and_results_descriptions() {
        let (mut sandbox, mut test) = new_test(
            "x = x + 1\nprint('x is', x)",
            TestOptions::new().state([("x", Object::Int(1))]).argv(["-v"]),
        );
        assert_eq!(test.describe_context(), "Global variables: `x`\nProgram arguments: `-v`");
        test.execute_source(&mut sandbox);
        assert_eq!(
            test.describe_results(),
            "Modified variables: `x` (1 before, 2 after)\nPrinted text:\nx⎵is⎵2↲\n"
        );
    }

    #[test]
    fn nothing_to_describe() {
        let (mut sandbox, mut test) = new_test("pass", TestOptions::new());
        assert_eq!(test.describe_context(), "No global variables, inputs or arguments");
        test.execute_source(&mut sandbox);
        assert_eq!(test.describe_results(), "No observable effect");
    }
}
