//! Tests for the grading session: test lifecycle, state carried between tests, fail-fast
//! behaviour and grade computation.

use pretty_assertions::assert_eq;
use pygrade::{
    AuthoringError, GroupOptions, Node, Object, ParamOverrides, Params, TestOptions, TestSession, TestSpec, grade,
};

const SORT3: &str = "\
if a <= b and a <= c:
    print(a, min(b, c), max(b, c))
elif b <= a and b <= c:
    print(b, min(a, c), max(a, c))
else:
    print(c, min(a, b), max(a, b))
";

const TIMES_A: &str = "def f(x):\n    return x * a\n";

fn test_at(session: &TestSession, index: usize) -> &pygrade::Test {
    match &session.history()[index] {
        Node::Test(test) => test,
        Node::Group(group) => panic!("expected a test, found group {}", group.title()),
    }
}

// =============================================================================
// 1. Program tests
// =============================================================================

/// A program test passes on the expected output and unchanged globals.
#[test]
fn sorted_triple_passes() {
    let mut session = TestSession::new(SORT3);
    let options = TestOptions::new().state([("a", Object::Int(2)), ("b", Object::Int(1)), ("c", Object::Int(3))]);
    session
        .test(TestSpec::new().options(options).output("1 2 3\n").allow_global_change(false))
        .unwrap();
    session.cleanup();
    let test = test_at(&session, 0);
    assert!(test.status());
    assert_eq!(test.assertions().len(), 3, "no-exception, output and no-global-change");
    assert_eq!(session.get_grade().unwrap(), 100.0);
}

/// A wrong output fails the test and the diff names both sides.
#[test]
fn wrong_output_fails() {
    let mut session = TestSession::new("print(a + b)\n");
    let options = TestOptions::new().state([("a", Object::Int(2)), ("b", Object::Int(2))]);
    session.test(TestSpec::new().options(options).output("5\n")).unwrap();
    session.cleanup();
    let test = test_at(&session, 0);
    assert!(!test.status());
    let explanation = test.assertions()[1].explanation();
    assert!(explanation.contains("-4"), "diff should show the actual line: {explanation}");
    assert!(explanation.contains("+5"), "diff should show the expected line: {explanation}");
    assert_eq!(session.get_grade().unwrap(), 0.0);
}

/// A program that reassigns a preset global fails the no-global-change check.
#[test]
fn modified_global_fails_no_global_change() {
    let mut session = TestSession::new("x = x + 1\n");
    session.begin_test_with(TestOptions::new().state([("x", Object::Int(1))]));
    session.execute_source();
    session.assert_no_global_change().unwrap_err();
    session.cleanup();
    let test = test_at(&session, 0);
    assert!(!test.status());
    assert_eq!(test.assertions()[0].explanation(), "Global variables modified: modified `x`");
}

/// Inputs are consumed and reported; running out raises `EOFError`.
#[test]
fn inputs_and_eof() {
    let code = "n = int(input())\nprint(n * 2)\nextra = input()\n";
    let mut session = TestSession::new(code);
    session
        .test(
            TestSpec::new()
                .options(TestOptions::new().inputs(["21"]))
                .exception(pygrade::ExcType::EOFError)
                .output("21\n42\n"),
        )
        .unwrap();
    session.cleanup();
    let test = test_at(&session, 0);
    assert!(test.status(), "{:?}", test.assertions());
    assert_eq!(test.effect().consumed_inputs, vec!["21".to_owned()]);
    let exception = test.effect().exception.as_ref().unwrap();
    assert_eq!(exception.message(), Some("No input to be read"));
}

// =============================================================================
// 2. Expressions and calls
// =============================================================================

/// A call reads a global set by the test.
#[test]
fn call_reads_test_global() {
    let mut session = TestSession::new(TIMES_A);
    let options = TestOptions::new().state([("a", Object::Int(3))]);
    session
        .test(TestSpec::new().options(options).call("f", vec![Object::Int(9)]).result(27))
        .unwrap();
    session.cleanup();
    let test = test_at(&session, 0);
    assert!(test.status());
    assert_eq!(test.title(), "Evaluating `f(9)`");
    assert_eq!(test.effect().result, Some(Object::Int(27)));
}

/// A function mutating its argument fails the no-arg-change check.
#[test]
fn mutated_argument_fails() {
    let mut session = TestSession::new("def add(items):\n    items.append(1)\n    return len(items)\n");
    session
        .test_call(pygrade::TestCall::new("add", vec![Object::list(vec![])]).result(1))
        .unwrap();
    session.cleanup();
    let test = test_at(&session, 0);
    assert!(!test.status());
    let last = test.assertions().last().unwrap();
    assert_eq!(last.kind_name(), "no-arg-change");
    assert!(!last.status());
}

/// A reference implementation supplies the expected result.
#[test]
fn reference_implementation() {
    let mut session = TestSession::new("def double(x):\n    return x + x\n");
    let call = pygrade::TestCall::new("double", vec![Object::Int(21)]).reference(|args, _| match &args[0] {
        Object::Int(n) => Object::Int(n * 2),
        _ => Object::None,
    });
    session.test_call(call).unwrap();
    session.cleanup();
    assert!(test_at(&session, 0).status());
}

/// An exception raised while loading the program fails the test even when the expression succeeds.
#[test]
fn load_exception_fails_expression_test() {
    let mut session = TestSession::new("def f(n):\n    return n * 3\nprint(undefined_name)\n");
    session.test(TestSpec::new().expression("f(9)").result(27)).unwrap();
    session.cleanup();
    let test = test_at(&session, 0);
    assert!(!test.status());
    assert_eq!(test.effect().result, Some(Object::Int(27)));
    let exception = test.effect().exception.as_ref().unwrap();
    assert_eq!(exception.exc_type(), pygrade::ExcType::NameError);
    let first = &test.assertions()[0];
    assert_eq!(first.kind_name(), "no-exception");
    assert!(!first.status());
}

/// The expression reads the input lines the program left unread.
#[test]
fn expression_reads_remaining_inputs() {
    let mut session = TestSession::new("x = input()\n");
    let options = TestOptions::new().inputs(["a", "b"]);
    session.test(TestSpec::new().options(options).expression("input()").result("b")).unwrap();
    session.cleanup();
    let test = test_at(&session, 0);
    assert!(test.status(), "{:?}", test.assertions());
    assert_eq!(test.effect().consumed_inputs, vec!["b".to_owned()]);
    assert_eq!(test.state().get("x"), Some(&Object::str("a")));
}

/// An expression that raises has no result and is compared as `None`.
#[test]
fn raising_expression_compares_as_none() {
    let mut session = TestSession::new("def f():\n    return 1 / 0\n");
    session.begin_test();
    session.execute_source();
    session.evaluate("f()");
    session.assert_exception(pygrade::ExcType::ArithmeticError).unwrap();
    session.assert_result(Object::None).unwrap();
    session.cleanup();
    assert!(test_at(&session, 0).status());
}

/// `assert_result` without an evaluated expression is an authoring error.
#[test]
fn result_without_expression() {
    let mut session = TestSession::new("x = 1\n");
    session.execute_source();
    let error = session.assert_result(1).unwrap_err();
    assert!(matches!(error, pygrade::Interrupt::Authoring(AuthoringError::NoExpression)));
}

// =============================================================================
// 3. State between tests
// =============================================================================

/// With `keep_state`, a test starts from the state the previous test left.
#[test]
fn keep_state_carries_globals() {
    let mut session = TestSession::new("total = 0\ndef add(n):\n    global total\n    total += n\n");
    session.execute_source();
    session.call_function("add", &[Object::Int(5)], &[]);
    session.begin_test();
    session.evaluate("total");
    session.assert_result(5).unwrap();
    session.cleanup();
    assert!(test_at(&session, 1).status());
}

/// Without `keep_state`, a test starts from an empty namespace.
#[test]
fn fresh_state_without_keep_state() {
    let mut session = TestSession::new("x = 1\n");
    session.execute_source();
    session.begin_test_with(TestOptions::new().keep_state(false));
    assert!(session.get_state().unwrap().is_empty());
    session.evaluate("x");
    session.assert_exception(pygrade::ExcType::NameError).unwrap();
    session.cleanup();
}

/// The snapshot returned by `get_state` is independent of the live state.
#[test]
fn get_state_is_a_copy() {
    let mut session = TestSession::new("items = [1]\n");
    session.execute_source();
    let mut snapshot = session.get_state().unwrap();
    snapshot.insert("items", Object::Int(0));
    session.evaluate("items");
    session.assert_result(Object::list(vec![Object::Int(1)])).unwrap();
}

/// State setters need an open test.
#[test]
fn setters_need_a_test() {
    let mut session = TestSession::new("");
    assert_eq!(session.set_inputs(["1"]), Err(AuthoringError::NoCurrentTest));
    assert_eq!(session.get_state().unwrap_err(), AuthoringError::NoCurrentTest);
}

/// A preamble runs in the test state and becomes part of the context.
#[test]
fn preamble_sets_context() {
    let mut session = TestSession::new("print(len(data))\n");
    session.begin_test();
    session.exec_preamble("data = [1, 2, 3]\nprint('hidden')").unwrap();
    session.execute_source();
    session.assert_output("3\n").unwrap();
    let test = session.current_test().unwrap();
    assert!(test.describe_context().contains("`data`"), "{}", test.describe_context());
}

// =============================================================================
// 4. Fail-fast and grading
// =============================================================================

/// After a failed assertion in a fail-fast test, later assertions do not run.
#[test]
fn fail_fast_stops_test() {
    let mut session = TestSession::new("x = 1\n");
    session
        .with_test(TestOptions::new(), |session| {
            session.execute_source();
            session.assert_variable_values([("x", Object::Int(2))])?;
            session.assert_variable_values([("x", Object::Int(1))])?;
            Ok(())
        })
        .unwrap();
    let test = test_at(&session, 0);
    assert!(!test.status());
    assert_eq!(test.assertions().len(), 1);
}

/// Without fail-fast, every assertion is recorded.
#[test]
fn no_fail_fast_records_all() {
    let mut session = TestSession::new("x = 1\n");
    session
        .with_test(TestOptions::new().fail_fast(false), |session| {
            session.execute_source();
            session.assert_variable_values([("x", Object::Int(2))])?;
            session.assert_variable_values([("x", Object::Int(1))])?;
            Ok(())
        })
        .unwrap();
    let test = test_at(&session, 0);
    assert_eq!(test.assertions().len(), 2);
    assert!(test.assertions()[1].status());
}

/// A failing test contributes nothing and a passing group contributes its weight.
#[test]
fn weighted_grade() {
    let mut session = TestSession::new("x = 1\n");
    session.begin_test_group_with("passing", GroupOptions::weight(3.0));
    session.test(TestSpec::new().values([("x", Object::Int(1))])).unwrap();
    session.test(TestSpec::new().values([("x", Object::Int(1))])).unwrap();
    session.begin_test_group("failing");
    session.test(TestSpec::new().values([("x", Object::Int(5))])).unwrap();
    session.cleanup();

    let Node::Group(passing) = &session.history()[0] else {
        panic!("expected a group");
    };
    assert_eq!(passing.get_grade().unwrap(), (3.0, 3.0));
    assert_eq!(session.get_grade().unwrap(), 75.0);
}

/// Nested groups close innermost first.
#[test]
fn nested_groups() {
    let mut session = TestSession::new("x = 1\n");
    assert_eq!(
        session.begin_nested_group("orphan", GroupOptions::default()),
        Err(AuthoringError::NoOpenGroup)
    );
    session.begin_test_group("outer");
    session.begin_nested_group("inner", GroupOptions::default()).unwrap();
    session.test(TestSpec::new()).unwrap();
    session.end_test_group().unwrap();
    session.test(TestSpec::new()).unwrap();
    session.end_test_group().unwrap();

    let Node::Group(outer) = &session.history()[0] else {
        panic!("expected a group");
    };
    assert_eq!(outer.children().len(), 2);
    assert!(matches!(outer.children()[0], Node::Group(_)));
    assert_eq!(session.end_test_group(), Err(AuthoringError::NoOpenGroup));
}

/// A session with no test cannot be graded.
#[test]
fn empty_session() {
    let session = TestSession::new("");
    assert_eq!(session.get_grade(), Err(AuthoringError::EmptySession));
}

/// `grade` closes what the script left open and renders the report.
#[test]
fn grade_runs_script() {
    let mut session = TestSession::new(TIMES_A).params(Params::default().with(&ParamOverrides {
        report_success: Some(false),
        ..ParamOverrides::default()
    }));
    let report = grade(&mut session, |session| {
        session.begin_test_group("f");
        for (a, x) in [(3, 9), (2, 5)] {
            let options = TestOptions::new().state([("a", Object::Int(a))]);
            session.test(TestSpec::new().options(options).call("f", vec![Object::Int(x)]).result(a * x))?;
        }
        Ok(())
    })
    .unwrap();
    assert_eq!(report.grade, 100.0);
    let text = report.to_string();
    assert!(text.contains("[PASS] Evaluating `f(9)` (1/1)"), "{text}");
    assert!(text.ends_with("Grade: 100.0/100"), "{text}");
    assert!(!text.contains('✓'), "successful assertions are hidden: {text}");
}

/// A fail-fast stop escaping the script skips the rest of it but the recorded tests are graded.
#[test]
fn escaped_stop_grades_recorded_tests() {
    let mut session = TestSession::new("x = 1\n");
    let report = grade(&mut session, |session| {
        session.test(TestSpec::new().values([("x", Object::Int(1))]))?;
        session.begin_test();
        session.execute_source();
        session.assert_variable_values([("x", Object::Int(2))])?;
        session.test(TestSpec::new().values([("x", Object::Int(1))]))?;
        Ok(())
    })
    .unwrap();
    assert_eq!(report.items.len(), 2);
    assert_eq!(report.grade, 50.0);
}
