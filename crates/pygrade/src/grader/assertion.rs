//! Typed assertion records and their feedback.

use std::fmt::Write as _;

use similar::TextDiff;
use strum::IntoStaticStr;

use crate::{
    analyzer::LoopKind,
    exception::{ExcType, Exception},
    namespace::NamespaceDiff,
    object::Object,
    types::Type,
};

/// What an assertion checked, with the data needed to explain its outcome.
#[derive(Debug, Clone, PartialEq, IntoStaticStr)]
#[strum(serialize_all = "kebab-case")]
pub enum AssertKind {
    Output {
        expected: String,
        actual: String,
    },
    Result {
        expression: String,
        expected: Object,
        actual: Option<Object>,
    },
    VariableValues {
        missing: Vec<String>,
        /// Name, expected value and actual value of each mismatch.
        incorrect: Vec<(String, Object, Object)>,
    },
    VariableTypes {
        missing: Vec<String>,
        /// Name, expected type and actual type of each mismatch.
        incorrect: Vec<(String, Type, Type)>,
    },
    NoGlobalChange {
        diff: NamespaceDiff,
    },
    NoArgChange {
        diff: NamespaceDiff,
    },
    ExceptionExpected {
        expected: ExcType,
        actual: Option<Exception>,
    },
    NoException {
        actual: Option<Exception>,
    },
    NoLoop {
        function: String,
        kinds: Vec<LoopKind>,
    },
    Recursion {
        expression: String,
    },
    DefinesFunction {
        function: String,
    },
    CallsFunction {
        caller: String,
        callee: String,
    },
    ReturnsNone {
        function: String,
    },
}

/// One checked property. Never changes once recorded.
#[derive(Debug, Clone, PartialEq)]
pub struct Assert {
    number: usize,
    status: bool,
    kind: AssertKind,
}

impl Assert {
    #[must_use]
    pub fn new(number: usize, status: bool, kind: AssertKind) -> Self {
        Self { number, status, kind }
    }

    #[must_use]
    pub fn number(&self) -> usize {
        self.number
    }

    #[must_use]
    pub fn status(&self) -> bool {
        self.status
    }

    #[must_use]
    pub fn kind(&self) -> &AssertKind {
        &self.kind
    }

    /// Kebab-case name of the kind, e.g. `no-global-change`.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        (&self.kind).into()
    }

    /// Human-readable feedback for the recorded outcome.
    #[must_use]
    pub fn explanation(&self) -> String {
        let status = self.status;
        match &self.kind {
            AssertKind::Output { expected, actual } => output_explanation(status, expected, actual),
            AssertKind::Result {
                expression,
                expected,
                actual,
            } => {
                if status {
                    format!("`{expression}` returned the expected result")
                } else {
                    let mut out = format!("Expected result of `{expression}`: {}", expected.py_repr());
                    match actual {
                        Some(actual) => {
                            let _ = write!(out, ", got {}", actual.py_repr());
                        }
                        None => out.push_str(", but no value was produced"),
                    }
                    out
                }
            }
            AssertKind::VariableValues { missing, incorrect } => {
                if status {
                    "Global variables have the expected values".to_owned()
                } else {
                    let mut problems = missing_problems(missing);
                    problems.extend(incorrect.iter().map(|(name, expected, actual)| {
                        format!("`{name}` should be {}, not {}", expected.py_repr(), actual.py_repr())
                    }));
                    format!("Incorrect global variables: {}", problems.join("; "))
                }
            }
            AssertKind::VariableTypes { missing, incorrect } => {
                if status {
                    "Global variables have the expected types".to_owned()
                } else {
                    let mut problems = missing_problems(missing);
                    problems.extend(
                        incorrect
                            .iter()
                            .map(|(name, expected, actual)| format!("`{name}` should be of type `{expected}`, not `{actual}`")),
                    );
                    format!("Incorrectly typed global variables: {}", problems.join("; "))
                }
            }
            AssertKind::NoGlobalChange { diff } => {
                if status {
                    "Global variables unchanged".to_owned()
                } else {
                    format!("Global variables modified: {}", describe_diff(diff))
                }
            }
            AssertKind::NoArgChange { diff } => {
                if status {
                    "Arguments unchanged".to_owned()
                } else {
                    format!("Arguments modified: {}", describe_diff(diff))
                }
            }
            AssertKind::ExceptionExpected { expected, actual } => {
                if status {
                    format!("Expected exception `{expected}` raised")
                } else {
                    let mut out = format!("An exception of type `{expected}` was expected");
                    match actual {
                        Some(actual) => {
                            let _ = write!(out, ", got {}", actual.summary());
                        }
                        None => out.push_str(", but none was raised"),
                    }
                    out
                }
            }
            AssertKind::NoException { actual } => match actual {
                Some(actual) if !status => format!("An unexpected exception was raised: {}", actual.summary()),
                _ => "No exception raised".to_owned(),
            },
            AssertKind::NoLoop { function, kinds } => {
                let kinds = kinds.iter().map(ToString::to_string).collect::<Vec<_>>().join(" or ");
                if status {
                    format!("No {kinds} loop in function `{function}`")
                } else {
                    format!("Function `{function}` contains a {kinds} loop")
                }
            }
            AssertKind::Recursion { expression } => {
                if status {
                    format!("Evaluating `{expression}` makes recursive calls")
                } else {
                    format!("Evaluating `{expression}` makes no recursive call")
                }
            }
            AssertKind::DefinesFunction { function } => {
                if status {
                    format!("Function `{function}` is defined")
                } else {
                    format!("Function `{function}` is not defined")
                }
            }
            AssertKind::CallsFunction { caller, callee } => {
                if status {
                    format!("Function `{caller}` calls `{callee}`")
                } else {
                    format!("Function `{caller}` never calls `{callee}`")
                }
            }
            AssertKind::ReturnsNone { function } => {
                if status {
                    format!("Function `{function}` always returns None")
                } else {
                    format!("Function `{function}` may return a value other than None")
                }
            }
        }
    }
}

fn output_explanation(status: bool, expected: &str, actual: &str) -> String {
    match (status, expected.is_empty()) {
        (true, true) => "No output, as expected".to_owned(),
        (true, false) => "Correct output".to_owned(),
        (false, true) => format!("No output was expected, got:\n{}", visible_text(actual)),
        (false, false) => {
            let diff = TextDiff::from_lines(actual, expected);
            let unified = diff
                .unified_diff()
                .context_radius(3)
                .header("actual output", "expected output")
                .to_string();
            format!("Expected output:\n{}\n{unified}", visible_text(expected))
        }
    }
}

fn missing_problems(missing: &[String]) -> Vec<String> {
    missing.iter().map(|name| format!("`{name}` is missing")).collect()
}

fn describe_diff(diff: &NamespaceDiff) -> String {
    let mut parts = Vec::new();
    if !diff.added.is_empty() {
        parts.push(format!("created {}", backquoted(diff.added.iter().map(String::as_str))));
    }
    if !diff.modified.is_empty() {
        parts.push(format!("modified {}", backquoted(diff.modified_names())));
    }
    if !diff.deleted.is_empty() {
        parts.push(format!("deleted {}", backquoted(diff.deleted.iter().map(String::as_str))));
    }
    parts.join(", ")
}

pub(crate) fn backquoted<'a>(names: impl Iterator<Item = &'a str>) -> String {
    names.map(|name| format!("`{name}`")).collect::<Vec<_>>().join(", ")
}

/// Makes line ends and spaces visible: `↲` before each newline and `⎵` for each space.
pub(crate) fn visible_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\n' => out.push_str("↲\n"),
            ' ' => out.push('⎵'),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::namespace::Modification;

    #[test]
    fn kind_names() {
        let assert = Assert::new(1, true, AssertKind::NoGlobalChange {
            diff: NamespaceDiff::default(),
        });
        assert_eq!(assert.kind_name(), "no-global-change");
    }

    #[test]
    fn output_failure_shows_diff() {
        let assert = Assert::new(1, false, AssertKind::Output {
            expected: "1 2\n".to_owned(),
            actual: "2 1\n".to_owned(),
        });
        let explanation = assert.explanation();
        assert!(explanation.starts_with("Expected output:\n1⎵2↲\n"), "{explanation}");
        assert!(explanation.contains("-2 1\n+1 2\n"), "{explanation}");
    }

    #[test]
    fn modified_globals_are_listed() {
        let diff = NamespaceDiff {
            added: vec!["y".to_owned()],
            deleted: vec![],
            modified: vec![Modification {
                name: "x".to_owned(),
                before: Object::Int(1),
                after: Object::Int(2),
            }],
        };
        let assert = Assert::new(3, false, AssertKind::NoGlobalChange { diff });
        assert_eq!(assert.explanation(), "Global variables modified: created `y`, modified `x`");
    }

    #[test]
    fn variable_values_explain_each_problem() {
        let assert = Assert::new(2, false, AssertKind::VariableValues {
            missing: vec!["a".to_owned()],
            incorrect: vec![("b".to_owned(), Object::Int(3), Object::str("3"))],
        });
        assert_eq!(
            assert.explanation(),
            "Incorrect global variables: `a` is missing; `b` should be 3, not '3'"
        );
    }

    #[test]
    fn no_loop_lists_kinds() {
        let assert = Assert::new(1, true, AssertKind::NoLoop {
            function: "f".to_owned(),
            kinds: LoopKind::ALL.to_vec(),
        });
        assert_eq!(assert.explanation(), "No while or for loop in function `f`");
    }
}
