//! Tests for the report tree: text rendering and its JSON form.

use pretty_assertions::assert_eq;
use pygrade::{Object, ReportItem, TestOptions, TestSession, TestSpec, grade};

fn graded(code: &str, spec: TestSpec) -> pygrade::Report {
    let mut session = TestSession::new(code);
    grade(&mut session, |session| {
        session.begin_test_group("Sum");
        session.test(spec)?;
        Ok(())
    })
    .unwrap()
}

// =============================================================================
// 1. Text
// =============================================================================

/// A passing program test shows its context, its effects and each assertion.
#[test]
fn passing_test_text() {
    let options = TestOptions::new()
        .title("Adds two inputs")
        .inputs(["1", "2"]);
    let report = graded(
        "a = int(input())\nb = int(input())\nprint(a + b)\n",
        TestSpec::new().options(options).output("1\n2\n3\n"),
    );
    assert_eq!(
        report.to_string(),
        "\
Group 1: Sum (1/1)
    [PASS] Adds two inputs (1/1)
        Input lines: `1`, `2`
        Created variables: `a`, `b`
        Input lines read: `1`, `2`
        Printed text:
        1↲
        2↲
        3↲
      ✓ No exception raised
      ✓ Correct output
Grade: 100.0/100"
    );
}

/// A failing test shows its hint.
#[test]
fn failing_test_shows_hint() {
    let options = TestOptions::new()
        .state([("a", Object::Int(1))])
        .hint("Use the variable `a`");
    let report = graded("print(2)\n", TestSpec::new().options(options).output("1\n"));
    let text = report.to_string();
    assert!(text.contains("[FAIL]"), "{text}");
    assert!(text.contains("    Hint: Use the variable `a`"), "{text}");
    assert!(text.ends_with("Grade: 0.0/100"), "{text}");
}

// =============================================================================
// 2. JSON
// =============================================================================

/// Items are tagged by type and assertions carry their kind.
#[test]
fn json_shape() {
    let report = graded("x = 2\n", TestSpec::new().values([("x", Object::Int(2))]));
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["grade"], 100.0);
    assert_eq!(json["items"][0]["type"], "group");
    let test = &json["items"][0]["items"][0];
    assert_eq!(test["type"], "test");
    assert_eq!(test["assertions"][1]["kind"], "variable-values");
    assert!(test.get("hint").is_none(), "empty hints are omitted");

    let ReportItem::Group(group) = &report.items[0] else {
        panic!("expected a group");
    };
    assert_eq!(group.items.len(), 1);
}
