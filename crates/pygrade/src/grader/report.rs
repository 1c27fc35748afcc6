//! Renderer-facing view of a finished session.

use std::fmt;

use serde::Serialize;

use crate::grader::{
    assertion::Assert,
    error::AuthoringError,
    group::{Node, TestGroup},
    test::Test,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    /// Percentage in `[0, 100]`.
    pub grade: f64,
    pub items: Vec<ReportItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ReportItem {
    Test(TestReport),
    Group(GroupReport),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestReport {
    pub number: usize,
    pub title: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub descr: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub hint: String,
    pub weight: f64,
    pub status: bool,
    pub grade: f64,
    pub context: String,
    pub results: String,
    pub assertions: Vec<AssertReport>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssertReport {
    pub number: usize,
    pub status: bool,
    pub kind: &'static str,
    pub explanation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupReport {
    pub number: usize,
    pub title: String,
    pub weight: f64,
    pub status: bool,
    pub grade: f64,
    pub items: Vec<ReportItem>,
}

impl Report {
    pub(crate) fn new(grade: f64, history: &[Node]) -> Result<Self, AuthoringError> {
        Ok(Self {
            grade,
            items: items(history)?,
        })
    }
}

fn items(nodes: &[Node]) -> Result<Vec<ReportItem>, AuthoringError> {
    nodes
        .iter()
        .map(|node| match node {
            Node::Test(test) => Ok(ReportItem::Test(TestReport::from(test))),
            Node::Group(group) => group_report(group).map(ReportItem::Group),
        })
        .collect()
}

fn group_report(group: &TestGroup) -> Result<GroupReport, AuthoringError> {
    let (grade, weight) = group.get_grade()?;
    Ok(GroupReport {
        number: group.number(),
        title: group.title().to_owned(),
        weight,
        status: group.status(),
        grade,
        items: items(group.children())?,
    })
}

impl From<&Test> for TestReport {
    fn from(test: &Test) -> Self {
        let (grade, weight) = test.get_grade();
        let report_success = test.params().report_success;
        Self {
            number: test.number(),
            title: test.title().to_owned(),
            descr: test.descr().to_owned(),
            hint: test.hint().to_owned(),
            weight,
            status: test.status(),
            grade,
            context: test.describe_context(),
            results: test.describe_results(),
            assertions: test
                .assertions()
                .iter()
                .filter(|assert| report_success || !assert.status())
                .map(AssertReport::from)
                .collect(),
        }
    }
}

impl From<&Assert> for AssertReport {
    fn from(assert: &Assert) -> Self {
        Self {
            number: assert.number(),
            status: assert.status(),
            kind: assert.kind_name(),
            explanation: assert.explanation(),
        }
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for item in &self.items {
            write_item(f, item, 0)?;
        }
        write!(f, "Grade: {:.1}/100", self.grade)
    }
}

fn write_item(f: &mut fmt::Formatter<'_>, item: &ReportItem, depth: usize) -> fmt::Result {
    let indent = "    ".repeat(depth);
    match item {
        ReportItem::Group(group) => {
            writeln!(
                f,
                "{indent}Group {}: {} ({}/{})",
                group.number,
                group.title,
                score(group.grade),
                score(group.weight)
            )?;
            for child in &group.items {
                write_item(f, child, depth + 1)?;
            }
        }
        ReportItem::Test(test) => {
            writeln!(
                f,
                "{indent}[{}] {} ({}/{})",
                if test.status { "PASS" } else { "FAIL" },
                test.title,
                score(test.grade),
                score(test.weight)
            )?;
            for line in test.descr.lines().chain(test.context.lines()).chain(test.results.lines()) {
                writeln!(f, "{indent}    {line}")?;
            }
            for assert in &test.assertions {
                let mark = if assert.status { '✓' } else { '✗' };
                let mut lines = assert.explanation.lines();
                if let Some(first) = lines.next() {
                    writeln!(f, "{indent}  {mark} {first}")?;
                }
                for line in lines {
                    writeln!(f, "{indent}      {line}")?;
                }
            }
            if !test.status && !test.hint.is_empty() {
                writeln!(f, "{indent}    Hint: {}", test.hint)?;
            }
        }
    }
    Ok(())
}

/// Weights and grades without a trailing `.0` when whole.
fn score(value: f64) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    if rounded.fract().abs() < f64::EPSILON {
        format!("{rounded:.0}")
    } else {
        format!("{rounded}")
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn scores_drop_trailing_zero() {
        assert_eq!(score(2.0), "2");
        assert_eq!(score(0.666_666), "0.67");
    }

    #[test]
    fn serializes_items_with_type_tag() {
        let report = Report {
            grade: 100.0,
            items: vec![ReportItem::Group(GroupReport {
                number: 1,
                title: "empty".to_owned(),
                weight: 1.0,
                status: true,
                grade: 1.0,
                items: vec![],
            })],
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["items"][0]["type"], "group");
        assert_eq!(json["grade"], 100.0);
    }
}
