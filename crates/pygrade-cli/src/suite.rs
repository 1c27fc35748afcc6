//! JSON test suites.
//!
//! A suite lists groups and tests; each test maps onto one [`TestSession::test`] (or
//! [`TestSession::test_call`] for pure calls) followed by optional structural checks:
//!
//! ```json
//! {
//!   "params": {"test_fail_fast": true},
//!   "items": [
//!     {"group": "Tripling", "weight": 2, "items": [
//!       {"call": {"function": "triple", "args": [3]}, "pure": true, "result": 9,
//!        "checks": [{"no_loop": {"function": "triple"}}]}
//!     ]},
//!     {"title": "Greeting", "inputs": ["Ada"], "output": "Name? Ada\nHello Ada\n"}
//!   ]
//! }
//! ```
//!
//! Values use the JSON conventions of [`Object::from_json_value`].

use std::str::FromStr;

use indexmap::IndexMap;
use pygrade::{
    AuthoringError, ExcType, GradeResult, GroupOptions, Interpreter, Interrupt, JsonValueError, LoopKind, Namespace,
    NoopTracer, Object, ParamOverrides, Params, Sandbox, TestCall, TestOptions, TestSession, TestSpec, Type, Unit,
    compare::{float_close, unordered_items, unordered_lines},
};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value as JV};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SuiteError {
    #[error("invalid suite JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid value for `{field}`: {source}")]
    Value {
        field: String,
        #[source]
        source: JsonValueError,
    },
    #[error("unknown type `{0}`")]
    UnknownType(String),
    #[error("unknown exception `{0}`")]
    UnknownException(String),
    #[error(transparent)]
    Authoring(#[from] AuthoringError),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Suite {
    #[serde(default)]
    pub params: Params,
    /// `sys.argv[0]` of the submission; defaults to the submission's file name.
    #[serde(default)]
    pub script_name: Option<String>,
    pub items: Vec<SuiteItem>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum SuiteItem {
    Group(GroupEntry),
    Test(Box<TestEntry>),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GroupEntry {
    pub group: String,
    #[serde(default = "default_weight")]
    pub weight: f64,
    #[serde(default)]
    pub params: ParamOverrides,
    pub items: Vec<SuiteItem>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TestEntry {
    pub title: Option<String>,
    pub descr: String,
    pub hint: String,
    pub weight: Option<f64>,
    pub state: Map<String, JV>,
    pub inputs: Vec<String>,
    pub argv: Vec<String>,
    pub params: ParamOverrides,
    pub force_reload: bool,
    pub expression: Option<String>,
    pub call: Option<CallEntry>,
    /// Run the call as a pure function test: no global or argument change allowed.
    pub pure: bool,
    /// Python source of a reference implementation of the called function.
    pub reference: Option<String>,
    pub exception: Option<String>,
    #[serde(deserialize_with = "present")]
    pub result: Option<JV>,
    pub result_cmp: ValueComparator,
    pub output: Option<String>,
    pub output_cmp: OutputComparator,
    pub values: Option<Map<String, JV>>,
    pub values_cmp: ValueComparator,
    pub types: Option<IndexMap<String, String>>,
    pub allow_global_change: Option<bool>,
    pub allow_arg_change: Option<bool>,
    pub detect_recursion: bool,
    pub checks: Vec<Check>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CallEntry {
    pub function: String,
    #[serde(default)]
    pub args: Vec<JV>,
    #[serde(default)]
    pub kwargs: Map<String, JV>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueComparator {
    #[default]
    Equal,
    UnorderedItems,
    FloatClose {
        tolerance: f64,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputComparator {
    #[default]
    Equal,
    UnorderedLines,
}

/// Assertion run after the test itself.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Check {
    NoLoop {
        function: String,
        #[serde(default = "all_loops")]
        kinds: Vec<LoopKind>,
    },
    DefinesFunction(String),
    CallsFunction {
        caller: String,
        callee: String,
    },
    ReturnsNone(String),
    Recursion(String),
}

fn default_weight() -> f64 {
    1.0
}

fn all_loops() -> Vec<LoopKind> {
    LoopKind::ALL.to_vec()
}

/// A present field is `Some`, even when it holds `null`.
fn present<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<JV>, D::Error> {
    JV::deserialize(deserializer).map(Some)
}

impl Suite {
    pub fn from_json(text: &str) -> Result<Self, SuiteError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Converts every entry into session calls, failing on the first invalid value.
    pub fn compile(&self) -> Result<Plan, SuiteError> {
        Ok(Plan {
            steps: compile_items(&self.items)?,
        })
    }
}

/// A suite ready to replay: every value converted, every name resolved.
pub struct Plan {
    steps: Vec<Step>,
}

enum Step {
    Group {
        title: String,
        options: GroupOptions,
        steps: Vec<Step>,
    },
    Test {
        target: Target,
        checks: Vec<Check>,
    },
}

enum Target {
    Spec(TestSpec),
    Call(TestCall),
}

impl Plan {
    /// Replays the suite through the authoring API.
    pub fn replay(self, session: &mut TestSession) -> GradeResult {
        replay_steps(session, self.steps, 0)
    }
}

fn replay_steps(session: &mut TestSession, steps: Vec<Step>, depth: usize) -> GradeResult {
    for step in steps {
        match step {
            Step::Group { title, options, steps } => {
                if depth == 0 {
                    session.begin_test_group_with(title, options);
                } else {
                    session.begin_nested_group(title, options)?;
                }
                replay_steps(session, steps, depth + 1)?;
                session.end_test_group()?;
            }
            Step::Test { target, checks } => {
                match target {
                    Target::Spec(spec) => session.test(spec)?,
                    Target::Call(call) => session.test_call(call)?,
                }
                let checks_apply = session
                    .current_test()
                    .is_some_and(|test| test.status() || !test.params().test_fail_fast);
                if checks_apply {
                    match run_checks(session, &checks) {
                        Ok(()) | Err(Interrupt::Stop(_)) => {}
                        Err(error) => return Err(error),
                    }
                }
            }
        }
    }
    Ok(())
}

fn run_checks(session: &mut TestSession, checks: &[Check]) -> GradeResult {
    for check in checks {
        match check {
            Check::NoLoop { function, kinds } => session.assert_no_loop_kinds(function, kinds)?,
            Check::DefinesFunction(function) => session.assert_defines_function(function)?,
            Check::CallsFunction { caller, callee } => session.assert_calls_function(caller, callee)?,
            Check::ReturnsNone(function) => session.assert_returns_none(function)?,
            Check::Recursion(expression) => session.assert_recursion(expression)?,
        }
    }
    Ok(())
}

fn compile_items(items: &[SuiteItem]) -> Result<Vec<Step>, SuiteError> {
    items
        .iter()
        .map(|item| match item {
            SuiteItem::Group(group) => Ok(Step::Group {
                title: group.group.clone(),
                options: GroupOptions {
                    weight: group.weight,
                    params: group.params,
                },
                steps: compile_items(&group.items)?,
            }),
            SuiteItem::Test(test) => compile_test(test),
        })
        .collect()
}

fn compile_test(entry: &TestEntry) -> Result<Step, SuiteError> {
    let mut options = TestOptions::new()
        .descr(entry.descr.clone())
        .hint(entry.hint.clone())
        .state(convert_map("state", &entry.state)?)
        .inputs(entry.inputs.iter().cloned())
        .argv(entry.argv.iter().cloned())
        .params(entry.params);
    options.title.clone_from(&entry.title);
    options.weight = entry.weight;

    let mut spec = TestSpec::new().options(options);
    spec.force_reload = entry.force_reload;
    spec.expression.clone_from(&entry.expression);
    spec.detect_recursion = entry.detect_recursion;
    if let Some(name) = &entry.exception {
        spec.exception = Some(ExcType::from_str(name).map_err(|_| SuiteError::UnknownException(name.clone()))?);
    }
    let result = entry.result.as_ref().map(|value| convert("result", value)).transpose()?;
    if let Some(expected) = result.clone() {
        spec = match entry.result_cmp {
            ValueComparator::Equal => spec.result(expected),
            ValueComparator::UnorderedItems => spec.result_with(expected, unordered_items),
            ValueComparator::FloatClose { tolerance } => spec.result_with(expected, float_close(tolerance)),
        };
    }
    if let Some(expected) = &entry.output {
        spec = match entry.output_cmp {
            OutputComparator::Equal => spec.output(expected.clone()),
            OutputComparator::UnorderedLines => spec.output_with(expected.clone(), unordered_lines),
        };
    }
    if let Some(values) = &entry.values {
        let values = convert_map("values", values)?;
        spec = match entry.values_cmp {
            ValueComparator::Equal => spec.values(values),
            ValueComparator::UnorderedItems => spec.values_with(values, unordered_items),
            ValueComparator::FloatClose { tolerance } => spec.values_with(values, float_close(tolerance)),
        };
    }
    if let Some(types) = &entry.types {
        let types = types
            .iter()
            .map(|(name, type_name)| {
                Type::from_str(type_name)
                    .map(|t| (name.clone(), t))
                    .map_err(|_| SuiteError::UnknownType(type_name.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        spec = spec.types(types);
    }
    if let Some(allow) = entry.allow_global_change {
        spec.allow_global_change = allow;
    }
    if let Some(allow) = entry.allow_arg_change {
        spec.allow_arg_change = allow;
    }

    let target = match &entry.call {
        Some(call) => {
            let args = call
                .args
                .iter()
                .map(|value| convert("call.args", value))
                .collect::<Result<Vec<_>, _>>()?;
            let kwargs = convert_map("call.kwargs", &call.kwargs)?;
            if entry.pure {
                let mut test_call = TestCall::new(call.function.clone(), args).kwargs(kwargs);
                if let Some(reference) = &entry.reference {
                    test_call = test_call.reference(reference_function(reference.clone(), call.function.clone()));
                }
                test_call.result = result;
                spec.result = None;
                spec.result_cmp = None;
                Target::Call(test_call.spec(spec))
            } else {
                Target::Spec(spec.call_with_kwargs(call.function.clone(), args, kwargs))
            }
        }
        None => Target::Spec(spec),
    };
    Ok(Step::Test {
        target,
        checks: entry.checks.clone(),
    })
}

fn convert(field: &str, value: &JV) -> Result<Object, SuiteError> {
    Object::from_json_value(value).map_err(|source| SuiteError::Value {
        field: field.to_owned(),
        source,
    })
}

fn convert_map(field: &str, map: &Map<String, JV>) -> Result<Vec<(String, Object)>, SuiteError> {
    map.iter()
        .map(|(name, value)| Ok((name.clone(), convert(&format!("{field}.{name}"), value)?)))
        .collect()
}

/// Computes expected results by running `function` from the reference `source` in a
/// sandbox of its own. A reference that raises yields `None`.
fn reference_function(source: String, function: String) -> impl Fn(&[Object], &[(String, Object)]) -> Object {
    move |args, kwargs| {
        let mut sandbox = Interpreter::new(source.clone());
        let mut namespace = Namespace::new();
        let outcome = sandbox
            .run(&Unit::Program, &mut namespace, &mut NoopTracer)
            .and_then(|_| {
                let call = Unit::Call {
                    function: &function,
                    args,
                    kwargs,
                };
                sandbox.run(&call, &mut namespace, &mut NoopTracer)
            });
        outcome.unwrap_or_else(|exception| {
            log::warn!("reference implementation of {function} raised {exception}");
            Object::None
        })
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use pygrade::{ReportItem, grade};

    use super::*;

    const TRIPLE: &str = "def triple(n):\n    return 3 * n\n\nname = input('Name? ')\nprint('Hello', name)\n";

    fn run_suite(code: &str, suite: &str) -> pygrade::Report {
        let suite = Suite::from_json(suite).unwrap();
        let plan = suite.compile().unwrap();
        let mut session = TestSession::new(code).params(suite.params);
        grade(&mut session, move |session| plan.replay(session)).unwrap()
    }

    #[test]
    fn groups_and_tests_replay() {
        let report = run_suite(
            TRIPLE,
            r#"{
                "items": [
                    {"title": "Greeting", "inputs": ["Ada"], "output": "Name? Ada\nHello Ada\n"},
                    {"group": "Tripling", "weight": 2, "items": [
                        {"call": {"function": "triple", "args": [3]}, "pure": true, "result": 9},
                        {"expression": "triple('ab')", "result": "ababab",
                         "checks": [{"no_loop": {"function": "triple"}}, {"defines_function": "triple"}]}
                    ]}
                ]
            }"#,
        );
        assert_eq!(report.grade, 100.0);
        let ReportItem::Group(group) = &report.items[1] else {
            panic!("expected a group, got {:?}", report.items[1]);
        };
        assert_eq!(group.items.len(), 2);
        let ReportItem::Test(test) = &group.items[1] else {
            panic!("expected a test");
        };
        assert_eq!(test.title, "Evaluating `triple('ab')`");
        let kinds: Vec<&str> = test.assertions.iter().map(|a| a.kind).collect();
        assert_eq!(kinds, ["no-exception", "result", "no-loop", "defines-function"]);
    }

    #[test]
    fn reference_implementation_gives_expected_result() {
        let report = run_suite(
            TRIPLE,
            r#"{"items": [
                {"inputs": ["x"], "call": {"function": "triple", "args": [4]}, "pure": true,
                 "reference": "def triple(n):\n    return n + n + n\n"}
            ]}"#,
        );
        assert_eq!(report.grade, 100.0);
    }

    #[test]
    fn checks_are_skipped_after_a_fail_fast_failure() {
        let report = run_suite(
            TRIPLE,
            r#"{"items": [
                {"inputs": ["x"], "expression": "triple(2)", "result": 7,
                 "checks": [{"returns_none": "triple"}]}
            ]}"#,
        );
        let ReportItem::Test(test) = &report.items[0] else {
            panic!("expected a test");
        };
        assert_eq!(test.assertions.len(), 2, "{:?}", test.assertions);
        assert_eq!(report.grade, 0.0);
    }

    #[test]
    fn unknown_names_are_rejected() {
        let suite = Suite::from_json(r#"{"items": [{"expression": "1", "types": {"x": "integer"}}]}"#).unwrap();
        assert!(matches!(suite.compile(), Err(SuiteError::UnknownType(name)) if name == "integer"));
        let suite = Suite::from_json(r#"{"items": [{"expression": "1", "exception": "Oops"}]}"#).unwrap();
        assert!(matches!(suite.compile(), Err(SuiteError::UnknownException(name)) if name == "Oops"));
    }

    #[test]
    fn null_result_is_an_expected_none() {
        let suite = Suite::from_json(r#"{"items": [{"expression": "print()", "result": null}]}"#).unwrap();
        let SuiteItem::Test(test) = &suite.items[0] else {
            panic!("expected a test");
        };
        assert_eq!(test.result, Some(JV::Null));
    }
}
