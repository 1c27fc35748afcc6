//! The authoring API: tests, groups, state handling and assertions.

use std::mem;

use log::debug;

use crate::{
    analyzer::{AstAnalyzer, LoopKind, StaticAnalyzer},
    exception::ExcType,
    grader::{
        assertion::{Assert, AssertKind},
        error::{AuthoringError, GradeResult, absorb_stop},
        group::{GroupOptions, Node, TestGroup, sum_grades},
        params::Params,
        report::Report,
        test::{Test, TestOptions},
    },
    interp::Interpreter,
    namespace::{Namespace, diff},
    object::Object,
    recursion::{RecursionDetector, TraceRecursionDetector},
    sandbox::{Sandbox, Unit},
    types::Type,
};

/// Comparison of an expected value (first) with an actual one (second).
pub type ValueCmp = Box<dyn Fn(&Object, &Object) -> bool>;
/// Comparison of an expected text (first) with an actual one (second).
pub type TextCmp = Box<dyn Fn(&str, &str) -> bool>;
/// Pure reference implementation computing the expected result of a call.
pub type ReferenceFn = Box<dyn Fn(&[Object], &[(String, Object)]) -> Object>;

/// A function call run by a test.
#[derive(Debug, Clone, PartialEq)]
pub struct CallTarget {
    pub function: String,
    pub args: Vec<Object>,
    pub kwargs: Vec<(String, Object)>,
}

/// Everything [`TestSession::test`] runs and checks. Unset checks are skipped.
pub struct TestSpec {
    pub options: TestOptions,
    /// Re-run the program even when the module is already loaded.
    pub force_reload: bool,
    pub expression: Option<String>,
    pub call: Option<CallTarget>,
    /// Expected exception type; without one, the test checks that nothing was raised.
    pub exception: Option<ExcType>,
    pub result: Option<Object>,
    pub result_cmp: Option<ValueCmp>,
    pub output: Option<String>,
    pub output_cmp: Option<TextCmp>,
    pub values: Option<Vec<(String, Object)>>,
    pub values_cmp: Option<ValueCmp>,
    pub types: Option<Vec<(String, Type)>>,
    pub allow_global_change: bool,
    pub allow_arg_change: bool,
    pub detect_recursion: bool,
}

impl Default for TestSpec {
    fn default() -> Self {
        Self {
            options: TestOptions::default(),
            force_reload: false,
            expression: None,
            call: None,
            exception: None,
            result: None,
            result_cmp: None,
            output: None,
            output_cmp: None,
            values: None,
            values_cmp: None,
            types: None,
            allow_global_change: true,
            allow_arg_change: true,
            detect_recursion: false,
        }
    }
}

impl TestSpec {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn options(mut self, options: TestOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn force_reload(mut self) -> Self {
        self.force_reload = true;
        self
    }

    #[must_use]
    pub fn expression(mut self, expression: impl Into<String>) -> Self {
        self.expression = Some(expression.into());
        self
    }

    #[must_use]
    pub fn call(mut self, function: impl Into<String>, args: Vec<Object>) -> Self {
        self.call = Some(CallTarget {
            function: function.into(),
            args,
            kwargs: Vec::new(),
        });
        self
    }

    #[must_use]
    pub fn call_with_kwargs(mut self, function: impl Into<String>, args: Vec<Object>, kwargs: Vec<(String, Object)>) -> Self {
        self.call = Some(CallTarget {
            function: function.into(),
            args,
            kwargs,
        });
        self
    }

    #[must_use]
    pub fn exception(mut self, exc_type: ExcType) -> Self {
        self.exception = Some(exc_type);
        self
    }

    #[must_use]
    pub fn result(mut self, expected: impl Into<Object>) -> Self {
        self.result = Some(expected.into());
        self
    }

    #[must_use]
    pub fn result_with(mut self, expected: impl Into<Object>, cmp: impl Fn(&Object, &Object) -> bool + 'static) -> Self {
        self.result = Some(expected.into());
        self.result_cmp = Some(Box::new(cmp));
        self
    }

    #[must_use]
    pub fn output(mut self, expected: impl Into<String>) -> Self {
        self.output = Some(expected.into());
        self
    }

    #[must_use]
    pub fn output_with(mut self, expected: impl Into<String>, cmp: impl Fn(&str, &str) -> bool + 'static) -> Self {
        self.output = Some(expected.into());
        self.output_cmp = Some(Box::new(cmp));
        self
    }

    #[must_use]
    pub fn values<K: Into<String>>(mut self, expected: impl IntoIterator<Item = (K, Object)>) -> Self {
        self.values = Some(expected.into_iter().map(|(k, v)| (k.into(), v)).collect());
        self
    }

    #[must_use]
    pub fn values_with<K: Into<String>>(
        mut self,
        expected: impl IntoIterator<Item = (K, Object)>,
        cmp: impl Fn(&Object, &Object) -> bool + 'static,
    ) -> Self {
        self = self.values(expected);
        self.values_cmp = Some(Box::new(cmp));
        self
    }

    #[must_use]
    pub fn types<K: Into<String>>(mut self, expected: impl IntoIterator<Item = (K, Type)>) -> Self {
        self.types = Some(expected.into_iter().map(|(k, t)| (k.into(), t)).collect());
        self
    }

    #[must_use]
    pub fn allow_global_change(mut self, allow: bool) -> Self {
        self.allow_global_change = allow;
        self
    }

    #[must_use]
    pub fn allow_arg_change(mut self, allow: bool) -> Self {
        self.allow_arg_change = allow;
        self
    }

    #[must_use]
    pub fn detect_recursion(mut self) -> Self {
        self.detect_recursion = true;
        self
    }
}

/// A function call test checked against a known result or a reference implementation.
pub struct TestCall {
    pub function: String,
    pub args: Vec<Object>,
    pub kwargs: Vec<(String, Object)>,
    /// Takes precedence over `result` when both are set.
    pub reference: Option<ReferenceFn>,
    pub result: Option<Object>,
    /// Further checks; its target, result and change permissions are overwritten.
    pub spec: TestSpec,
}

impl TestCall {
    #[must_use]
    pub fn new(function: impl Into<String>, args: Vec<Object>) -> Self {
        Self {
            function: function.into(),
            args,
            kwargs: Vec::new(),
            reference: None,
            result: None,
            spec: TestSpec::default(),
        }
    }

    #[must_use]
    pub fn kwargs(mut self, kwargs: Vec<(String, Object)>) -> Self {
        self.kwargs = kwargs;
        self
    }

    #[must_use]
    pub fn result(mut self, expected: impl Into<Object>) -> Self {
        self.result = Some(expected.into());
        self
    }

    #[must_use]
    pub fn reference(mut self, reference: impl Fn(&[Object], &[(String, Object)]) -> Object + 'static) -> Self {
        self.reference = Some(Box::new(reference));
        self
    }

    #[must_use]
    pub fn spec(mut self, spec: TestSpec) -> Self {
        self.spec = spec;
        self
    }
}

/// Grading session over one submission.
///
/// The session is either between tests or has one open test, which every assertion and
/// state setter applies to. Groups nest through an explicit stack.
#[derive(Debug)]
pub struct TestSession {
    code: String,
    script_name: String,
    sandbox: Box<dyn Sandbox>,
    /// Built on first use, the submission is only parsed for it when a structural check runs.
    analyzer: Option<Box<dyn StaticAnalyzer>>,
    detector: Box<dyn RecursionDetector>,
    params: Params,
    history: Vec<Node>,
    groups: Vec<TestGroup>,
    current_test: Option<Test>,
    /// State of the last finished test.
    previous_state: Option<Namespace>,
    module_loaded: bool,
    test_counter: usize,
    group_counter: usize,
    assert_counter: usize,
}

impl TestSession {
    /// Session running `code` with the default interpreter.
    #[must_use]
    pub fn new(code: impl Into<String>) -> Self {
        let code = code.into();
        let sandbox = Box::new(Interpreter::new(code.clone()));
        Self::with_sandbox(code, sandbox)
    }

    #[must_use]
    pub fn with_sandbox(code: impl Into<String>, sandbox: Box<dyn Sandbox>) -> Self {
        Self {
            code: code.into(),
            script_name: "submission.py".to_owned(),
            sandbox,
            analyzer: None,
            detector: Box::new(TraceRecursionDetector),
            params: Params::default(),
            history: Vec::new(),
            groups: Vec::new(),
            current_test: None,
            previous_state: None,
            module_loaded: false,
            test_counter: 0,
            group_counter: 0,
            assert_counter: 0,
        }
    }

    #[must_use]
    pub fn params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    #[must_use]
    pub fn analyzer(mut self, analyzer: Box<dyn StaticAnalyzer>) -> Self {
        self.analyzer = Some(analyzer);
        self
    }

    #[must_use]
    pub fn detector(mut self, detector: Box<dyn RecursionDetector>) -> Self {
        self.detector = detector;
        self
    }

    /// Name the submission sees as `sys.argv[0]`.
    #[must_use]
    pub fn script_name(mut self, script_name: impl Into<String>) -> Self {
        self.script_name = script_name.into();
        self
    }

    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Finished top-level tests and groups, in order.
    #[must_use]
    pub fn history(&self) -> &[Node] {
        &self.history
    }

    #[must_use]
    pub fn current_test(&self) -> Option<&Test> {
        self.current_test.as_ref()
    }

    // ---------------------------------------------------------------------
    // Groups and tests
    // ---------------------------------------------------------------------

    pub fn begin_test_group(&mut self, title: impl Into<String>) {
        self.begin_test_group_with(title, GroupOptions::default());
    }

    /// Closes the open test and every open group, then opens a top-level group.
    pub fn begin_test_group_with(&mut self, title: impl Into<String>, options: GroupOptions) {
        self.cleanup();
        self.push_group(title.into(), options);
    }

    /// Opens a group inside the innermost open group.
    pub fn begin_nested_group(&mut self, title: impl Into<String>, options: GroupOptions) -> Result<(), AuthoringError> {
        if self.groups.is_empty() {
            return Err(AuthoringError::NoOpenGroup);
        }
        self.close_test();
        self.push_group(title.into(), options);
        Ok(())
    }

    fn push_group(&mut self, title: String, options: GroupOptions) {
        self.group_counter += 1;
        let params = self.enclosing_params().with(&options.params);
        debug!("begin group {}: {title}", self.group_counter);
        self.groups
            .push(TestGroup::new(self.group_counter, title, options.weight, params));
    }

    /// Closes the innermost open group.
    pub fn end_test_group(&mut self) -> Result<(), AuthoringError> {
        self.close_test();
        let group = self.groups.pop().ok_or(AuthoringError::NoOpenGroup)?;
        debug!(
            "end group {}: {}",
            group.number(),
            if group.status() { "passed" } else { "failed" }
        );
        self.append(Node::Group(group));
        Ok(())
    }

    pub fn begin_test(&mut self) {
        self.begin_test_with(TestOptions::default());
    }

    /// Closes the open test and opens a new one.
    ///
    /// With `keep_state`, the new test starts from a copy of the last finished test's state;
    /// the option state is layered on top either way.
    pub fn begin_test_with(&mut self, options: TestOptions) {
        self.close_test();
        self.test_counter += 1;
        let params = self.enclosing_params().with(&options.params);
        let state = match &self.previous_state {
            Some(previous) if params.keep_state => previous.deep_copy(),
            _ => Namespace::new(),
        };
        let test = Test::new(self.test_counter, options, params, state, &self.script_name);
        debug!("begin test {}: {}", test.number(), test.title());
        self.current_test = Some(test);
    }

    pub fn end_test(&mut self) -> Result<(), AuthoringError> {
        let test = self.current_test.take().ok_or(AuthoringError::NoCurrentTest)?;
        debug!(
            "end test {}: {} after {} assertions",
            test.number(),
            if test.status() { "passed" } else { "failed" },
            test.assertions().len()
        );
        self.previous_state = Some(test.state().clone());
        self.append(Node::Test(test));
        Ok(())
    }

    /// Closes the open test and every open group.
    pub fn cleanup(&mut self) {
        self.close_test();
        while !self.groups.is_empty() {
            // cannot fail, the stack is not empty
            let _ = self.end_test_group();
        }
    }

    /// Runs `body` in a new test, absorbing a fail-fast stop, then closes the test.
    pub fn with_test(
        &mut self,
        options: TestOptions,
        body: impl FnOnce(&mut Self) -> GradeResult,
    ) -> Result<(), AuthoringError> {
        self.begin_test_with(options);
        absorb_stop(body(self))?;
        self.close_test();
        Ok(())
    }

    fn close_test(&mut self) {
        if self.current_test.is_some() {
            let _ = self.end_test();
        }
    }

    fn append(&mut self, node: Node) {
        match self.groups.last_mut() {
            Some(group) => group.push(node),
            None => self.history.push(node),
        }
    }

    fn enclosing_params(&self) -> Params {
        self.groups.last().map_or(self.params, |group| *group.params())
    }

    // ---------------------------------------------------------------------
    // Predefined tests
    // ---------------------------------------------------------------------

    /// Runs a complete test: context, execution, then the requested checks in a fixed order.
    ///
    /// A failed check in a fail-fast test skips the remaining checks.
    pub fn test(&mut self, mut spec: TestSpec) -> Result<(), AuthoringError> {
        if spec.expression.is_some() && spec.call.is_some() {
            return Err(AuthoringError::AmbiguousTarget);
        }
        if (spec.result.is_some() || spec.detect_recursion) && spec.expression.is_none() && spec.call.is_none() {
            return Err(AuthoringError::NothingEvaluated);
        }
        self.begin_test_with(mem::take(&mut spec.options));
        let keep_state = self.current()?.params().keep_state;
        let program_only = spec.expression.is_none() && spec.call.is_none();
        let mut load_exception = None;
        if spec.force_reload || !self.module_loaded || !keep_state || program_only {
            self.execute_source();
            load_exception = self.current()?.effect().exception.clone();
        }
        if let Some(expression) = &spec.expression {
            self.evaluate(expression);
        } else if let Some(call) = &spec.call {
            self.call_function(&call.function, &call.args, &call.kwargs);
        }
        let test = self.current_mut()?;
        if !program_only {
            test.carry_exception(load_exception);
        }
        if !test.has_title()
            && let Some(source) = test.expression()
        {
            let title = format!("Evaluating `{source}`");
            test.set_title(title);
        }
        absorb_stop(self.apply_checks(spec))
    }

    fn apply_checks(&mut self, spec: TestSpec) -> GradeResult {
        let TestSpec {
            expression,
            call,
            exception,
            result,
            result_cmp,
            output,
            output_cmp,
            values,
            values_cmp,
            types,
            allow_global_change,
            allow_arg_change,
            detect_recursion,
            ..
        } = spec;
        match exception {
            Some(exc_type) => self.assert_exception(exc_type)?,
            None => self.assert_no_exception()?,
        }
        if let Some(expected) = result {
            match &result_cmp {
                Some(cmp) => self.assert_result_with(expected, cmp)?,
                None => self.assert_result(expected)?,
            }
        }
        if let Some(expected) = &output {
            match &output_cmp {
                Some(cmp) => self.assert_output_with(expected, cmp)?,
                None => self.assert_output(expected)?,
            }
        }
        if let Some(expected) = values {
            match &values_cmp {
                Some(cmp) => self.assert_variable_values_with(expected, cmp)?,
                None => self.assert_variable_values(expected)?,
            }
        }
        if let Some(expected) = types {
            self.assert_variable_types(expected)?;
        }
        if !allow_global_change {
            self.assert_no_global_change()?;
        }
        if call.is_some() && !allow_arg_change {
            self.assert_no_arg_change()?;
        }
        if detect_recursion {
            let unit = match (&expression, &call) {
                (Some(expression), _) => Unit::Expression(expression),
                (None, Some(call)) => Unit::Call {
                    function: &call.function,
                    args: &call.args,
                    kwargs: &call.kwargs,
                },
                (None, None) => return Err(AuthoringError::NothingEvaluated.into()),
            };
            self.detect_recursion(&unit)?;
            self.assert_previous_recursion()?;
        }
        Ok(())
    }

    /// Tests a call against an expected result, requiring that neither globals nor
    /// arguments change.
    pub fn test_call(&mut self, call: TestCall) -> Result<(), AuthoringError> {
        let TestCall {
            function,
            args,
            kwargs,
            reference,
            result,
            spec,
        } = call;
        let expected = match (reference, result) {
            (Some(reference), _) => {
                let args: Vec<Object> = args.iter().map(Object::deep_copy).collect();
                let kwargs: Vec<(String, Object)> = kwargs.iter().map(|(k, v)| (k.clone(), v.deep_copy())).collect();
                reference(&args, &kwargs)
            }
            (None, Some(result)) => result,
            (None, None) => return Err(AuthoringError::NoExpectedResult),
        };
        let spec = TestSpec {
            expression: None,
            call: Some(CallTarget { function, args, kwargs }),
            result: Some(expected),
            allow_global_change: false,
            allow_arg_change: false,
            ..spec
        };
        self.test(spec)
    }

    // ---------------------------------------------------------------------
    // Execution context
    // ---------------------------------------------------------------------

    fn current(&self) -> Result<&Test, AuthoringError> {
        self.current_test.as_ref().ok_or(AuthoringError::NoCurrentTest)
    }

    fn current_mut(&mut self) -> Result<&mut Test, AuthoringError> {
        self.current_test.as_mut().ok_or(AuthoringError::NoCurrentTest)
    }

    /// Replaces the state of the open test.
    pub fn set_globals<K: Into<String>>(&mut self, variables: impl IntoIterator<Item = (K, Object)>) -> Result<(), AuthoringError> {
        let state = variables.into_iter().map(|(k, v)| (k.into(), v)).collect();
        self.set_state(state)
    }

    pub fn set_state(&mut self, state: Namespace) -> Result<(), AuthoringError> {
        self.current_mut()?.set_state(state);
        Ok(())
    }

    /// Adds or replaces entries of the open test's state.
    pub fn update_state(&mut self, state: Namespace) -> Result<(), AuthoringError> {
        self.current_mut()?.update_state(state);
        Ok(())
    }

    pub fn set_inputs<S: Into<String>>(&mut self, inputs: impl IntoIterator<Item = S>) -> Result<(), AuthoringError> {
        self.current_mut()?.set_inputs(inputs.into_iter().map(Into::into).collect());
        Ok(())
    }

    pub fn set_argv<S: Into<String>>(&mut self, argv: impl IntoIterator<Item = S>) -> Result<(), AuthoringError> {
        self.current_mut()?.set_argv(argv.into_iter().map(Into::into).collect());
        Ok(())
    }

    /// Independent copy of the open test's state.
    pub fn get_state(&self) -> Result<Namespace, AuthoringError> {
        Ok(self.current()?.state().deep_copy())
    }

    /// Runs instructor statements in the open test's state. Their output is discarded.
    pub fn exec_preamble(&mut self, code: &str) -> Result<(), AuthoringError> {
        let test = self.current_test.as_mut().ok_or(AuthoringError::NoCurrentTest)?;
        test.exec_preamble(self.sandbox.as_mut(), code)
            .map_err(AuthoringError::Preamble)
    }

    // ---------------------------------------------------------------------
    // Execution
    // ---------------------------------------------------------------------

    fn ensure_test(&mut self) {
        if self.current_test.is_none() {
            self.begin_test();
        }
    }

    /// Runs the submitted program in the open test's state, opening a test if needed.
    ///
    /// The first run creates the module; later runs reload it over the current state, so
    /// variables set by the grader survive unless the program reassigns them.
    pub fn execute_source(&mut self) {
        self.ensure_test();
        if let Some(test) = self.current_test.as_mut() {
            test.execute_source(self.sandbox.as_mut());
        }
        self.module_loaded = true;
    }

    /// Evaluates `expression` in the open test's state, opening a test if needed.
    pub fn evaluate(&mut self, expression: &str) {
        self.ensure_test();
        if let Some(test) = self.current_test.as_mut() {
            test.evaluate(self.sandbox.as_mut(), expression);
        }
    }

    /// Calls a function of the submission, opening a test if needed.
    pub fn call_function(&mut self, function: &str, args: &[Object], kwargs: &[(String, Object)]) {
        self.ensure_test();
        if let Some(test) = self.current_test.as_mut() {
            test.call_function(self.sandbox.as_mut(), function, args, kwargs);
        }
    }

    fn detect_recursion(&mut self, unit: &Unit<'_>) -> Result<bool, AuthoringError> {
        let test = self.current_test.as_mut().ok_or(AuthoringError::NoCurrentTest)?;
        Ok(test.detect_recursion(self.sandbox.as_mut(), self.detector.as_ref(), unit))
    }

    fn static_analyzer(&mut self) -> &dyn StaticAnalyzer {
        let code = &self.code;
        &**self
            .analyzer
            .get_or_insert_with(|| Box::new(AstAnalyzer::new(code)) as Box<dyn StaticAnalyzer>)
    }

    // ---------------------------------------------------------------------
    // Assertions
    // ---------------------------------------------------------------------

    fn record(&mut self, status: bool, kind: AssertKind) -> GradeResult {
        let test = self.current_test.as_mut().ok_or(AuthoringError::NoCurrentTest)?;
        self.assert_counter += 1;
        test.record(Assert::new(self.assert_counter, status, kind))
    }

    /// Checks the output of the last run.
    pub fn assert_output(&mut self, expected: &str) -> GradeResult {
        self.assert_output_with(expected, |expected, actual| expected == actual)
    }

    pub fn assert_output_with(&mut self, expected: &str, cmp: impl Fn(&str, &str) -> bool) -> GradeResult {
        let actual = self.current()?.effect().stdout.clone();
        let status = cmp(expected, &actual);
        self.record(status, AssertKind::Output {
            expected: expected.to_owned(),
            actual,
        })
    }

    /// Checks the value of the last evaluated expression or call.
    ///
    /// A run that raised has no value and is compared as `None`.
    pub fn assert_result(&mut self, expected: impl Into<Object>) -> GradeResult {
        self.assert_result_with(expected, |expected, actual| expected == actual)
    }

    pub fn assert_result_with(&mut self, expected: impl Into<Object>, cmp: impl Fn(&Object, &Object) -> bool) -> GradeResult {
        let expected = expected.into();
        let test = self.current()?;
        let expression = test.expression().ok_or(AuthoringError::NoExpression)?.to_owned();
        let actual = test.effect().result.clone();
        let status = cmp(&expected, actual.as_ref().unwrap_or(&Object::None));
        self.record(status, AssertKind::Result {
            expression,
            expected,
            actual,
        })
    }

    /// Checks the values of some global variables.
    pub fn assert_variable_values<K: Into<String>>(&mut self, expected: impl IntoIterator<Item = (K, Object)>) -> GradeResult {
        self.assert_variable_values_with(expected, |expected, actual| expected == actual)
    }

    pub fn assert_variable_values_with<K: Into<String>>(
        &mut self,
        expected: impl IntoIterator<Item = (K, Object)>,
        cmp: impl Fn(&Object, &Object) -> bool,
    ) -> GradeResult {
        let expected: Vec<(String, Object)> = expected.into_iter().map(|(k, v)| (k.into(), v)).collect();
        let state = self.current()?.state();
        if expected.is_empty() {
            return Err(AuthoringError::NoExpectedValues.into());
        }
        let mut missing = Vec::new();
        let mut incorrect = Vec::new();
        for (name, value) in expected {
            match state.get(&name) {
                None => missing.push(name),
                Some(actual) if !cmp(&value, actual) => incorrect.push((name, value, actual.clone())),
                Some(_) => {}
            }
        }
        let status = missing.is_empty() && incorrect.is_empty();
        self.record(status, AssertKind::VariableValues { missing, incorrect })
    }

    /// Checks the exact types of some global variables.
    pub fn assert_variable_types<K: Into<String>>(&mut self, expected: impl IntoIterator<Item = (K, Type)>) -> GradeResult {
        let expected: Vec<(String, Type)> = expected.into_iter().map(|(k, t)| (k.into(), t)).collect();
        let state = self.current()?.state();
        if expected.is_empty() {
            return Err(AuthoringError::NoExpectedValues.into());
        }
        let mut missing = Vec::new();
        let mut incorrect = Vec::new();
        for (name, expected_type) in expected {
            match state.get(&name).map(Object::type_of) {
                None => missing.push(name),
                Some(actual) if actual != expected_type => incorrect.push((name, expected_type, actual)),
                Some(_) => {}
            }
        }
        let status = missing.is_empty() && incorrect.is_empty();
        self.record(status, AssertKind::VariableTypes { missing, incorrect })
    }

    /// Checks that the last run left the global variables as it found them.
    pub fn assert_no_global_change(&mut self) -> GradeResult {
        let test = self.current()?;
        let diff = diff(test.previous_state(), test.state());
        self.record(diff.is_empty(), AssertKind::NoGlobalChange { diff })
    }

    /// Checks that the last function call did not mutate its arguments.
    pub fn assert_no_arg_change(&mut self) -> GradeResult {
        let args = self
            .current()?
            .effect()
            .args
            .as_ref()
            .ok_or(AuthoringError::NothingEvaluated)?;
        let diff = diff(&args.before, &args.after);
        self.record(diff.is_empty(), AssertKind::NoArgChange { diff })
    }

    /// Checks that the last run raised `expected` or one of its subclasses.
    pub fn assert_exception(&mut self, expected: ExcType) -> GradeResult {
        let actual = self.current()?.effect().exception.clone();
        let status = actual
            .as_ref()
            .is_some_and(|exception| exception.exc_type().is_subclass_of(expected));
        self.record(status, AssertKind::ExceptionExpected { expected, actual })
    }

    pub fn assert_no_exception(&mut self) -> GradeResult {
        let actual = self.current()?.effect().exception.clone();
        self.record(actual.is_none(), AssertKind::NoException { actual })
    }

    /// Checks that `function` contains neither `while` nor `for` loops.
    pub fn assert_no_loop(&mut self, function: &str) -> GradeResult {
        self.assert_no_loop_kinds(function, &LoopKind::ALL)
    }

    pub fn assert_no_loop_kinds(&mut self, function: &str, kinds: &[LoopKind]) -> GradeResult {
        self.current()?;
        let status = !self.static_analyzer().has_loop(function, kinds);
        self.record(status, AssertKind::NoLoop {
            function: function.to_owned(),
            kinds: kinds.to_vec(),
        })
    }

    /// Checks that evaluating `expression` in the current state makes a recursive call.
    ///
    /// The expression runs on a copy of the state and its effects are discarded.
    pub fn assert_recursion(&mut self, expression: &str) -> GradeResult {
        let status = self.detect_recursion(&Unit::Expression(expression))?;
        self.record(status, AssertKind::Recursion {
            expression: expression.to_owned(),
        })
    }

    /// Records the outcome of the recursion detection already run for this test's expression.
    pub fn assert_previous_recursion(&mut self) -> GradeResult {
        let test = self.current()?;
        let expression = test.expression().ok_or(AuthoringError::NoExpression)?.to_owned();
        let status = test.recursion().ok_or(AuthoringError::NothingEvaluated)?;
        self.record(status, AssertKind::Recursion { expression })
    }

    pub fn assert_defines_function(&mut self, function: &str) -> GradeResult {
        self.current()?;
        let status = self.static_analyzer().defines_function(function);
        self.record(status, AssertKind::DefinesFunction {
            function: function.to_owned(),
        })
    }

    /// Checks that `caller` contains a call to `callee`.
    pub fn assert_calls_function(&mut self, caller: &str, callee: &str) -> GradeResult {
        self.current()?;
        let status = self.static_analyzer().calls_list(caller).contains(callee);
        self.record(status, AssertKind::CallsFunction {
            caller: caller.to_owned(),
            callee: callee.to_owned(),
        })
    }

    pub fn assert_returns_none(&mut self, function: &str) -> GradeResult {
        self.current()?;
        let status = self.static_analyzer().returns_none(function);
        self.record(status, AssertKind::ReturnsNone {
            function: function.to_owned(),
        })
    }

    // ---------------------------------------------------------------------
    // Grading
    // ---------------------------------------------------------------------

    /// Grade of the finished history, in `[0, 100]`.
    pub fn get_grade(&self) -> Result<f64, AuthoringError> {
        let (total, weight) = sum_grades(&self.history)?;
        if weight <= 0.0 {
            return Err(AuthoringError::EmptySession);
        }
        Ok(total / weight * 100.0)
    }

    /// Renderer-facing tree of the finished history.
    pub fn report(&self) -> Result<Report, AuthoringError> {
        Report::new(self.get_grade()?, &self.history)
    }
}
