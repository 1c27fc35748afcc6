//! Tests for recursion detection: the trace-based detector on its own and the
//! recursion assertions of the session.

use pygrade::{
    Interpreter, Namespace, NoopTracer, Object, RecursionDetector, ResourceLimits, Sandbox, TestSession, TestSpec,
    TraceRecursionDetector, Unit,
};

const FACT: &str = "\
def fact(n):
    if n <= 1:
        return 1
    return n * fact(n - 1)

def fact_loop(n):
    result = 1
    for i in range(2, n + 1):
        result *= i
    return result

def is_even(n):
    return True if n == 0 else is_odd(n - 1)

def is_odd(n):
    return False if n == 0 else is_even(n - 1)
";

fn loaded(code: &str) -> (Interpreter, Namespace) {
    let mut interpreter = Interpreter::new(code);
    let mut namespace = Namespace::new();
    interpreter.run(&Unit::Program, &mut namespace, &mut NoopTracer).unwrap();
    (interpreter, namespace)
}

fn recurses(expression: &str) -> bool {
    let (mut interpreter, mut namespace) = loaded(FACT);
    TraceRecursionDetector.performs_recursion(&mut |tracer| {
        let _ = interpreter.run(&Unit::Expression(expression), &mut namespace, tracer);
    })
}

// =============================================================================
// 1. Detector
// =============================================================================

/// Direct recursion is detected.
#[test]
fn direct_recursion() {
    assert!(recurses("fact(5)"));
}

/// A base case reached immediately makes no recursive call.
#[test]
fn base_case_only() {
    assert!(!recurses("fact(1)"));
}

/// Iterative code is not recursive.
#[test]
fn iteration_is_not_recursion() {
    assert!(!recurses("fact_loop(5)"));
}

/// Mutual recursion counts once a function re-enters itself.
#[test]
fn mutual_recursion() {
    assert!(recurses("is_even(4)"));
    assert!(!recurses("is_even(1)"), "is_even -> is_odd returns before re-entering");
}

/// Calling a function twice in sequence is not recursion.
#[test]
fn sequential_calls() {
    assert!(!recurses("fact_loop(2) + fact_loop(3)"));
}

/// A run stopped by the recursion limit is still reported as recursive.
#[test]
fn runaway_recursion_is_detected() {
    let mut interpreter = Interpreter::new("def f(n):\n    return f(n + 1)\n")
        .with_limits(ResourceLimits::new().max_recursion_depth(20));
    let mut namespace = Namespace::new();
    interpreter.run(&Unit::Program, &mut namespace, &mut NoopTracer).unwrap();
    let detected = TraceRecursionDetector.performs_recursion(&mut |tracer| {
        let outcome = interpreter.run(&Unit::Expression("f(0)"), &mut namespace, tracer);
        assert!(outcome.is_err());
    });
    assert!(detected);
}

/// Detection stops the run at the first recursive call, before the code that follows it.
#[test]
fn detection_stops_at_first_recursive_call() {
    let (mut interpreter, mut namespace) = loaded("def f(n):\n    if n > 0:\n        f(n - 1)\n    while True:\n        pass\n");
    let detected = TraceRecursionDetector.performs_recursion(&mut |tracer| {
        let outcome = interpreter.run(&Unit::Expression("f(1)"), &mut namespace, tracer);
        assert!(outcome.unwrap_err().is_halt());
    });
    assert!(detected);
}

/// Neither `except` nor `finally` in the submission can resume a stopped run.
#[test]
fn stopped_run_ignores_handlers() {
    let code = "\
def g(n):
    try:
        return g(n - 1)
    except:
        while True:
            pass
    finally:
        while True:
            pass
";
    let (mut interpreter, mut namespace) = loaded(code);
    let detected = TraceRecursionDetector.performs_recursion(&mut |tracer| {
        let outcome = interpreter.run(&Unit::Expression("g(3)"), &mut namespace, tracer);
        assert!(outcome.unwrap_err().is_halt());
    });
    assert!(detected);
}

// =============================================================================
// 2. Session assertions
// =============================================================================

/// `assert_recursion` runs on a copy of the state and leaves no trace.
#[test]
fn assert_recursion_has_no_effect() {
    let mut session = TestSession::new("calls = []\ndef f(n):\n    calls.append(n)\n    return 0 if n == 0 else f(n - 1)\n");
    session.execute_source();
    session.assert_recursion("f(3)").unwrap();
    session.evaluate("len(calls)");
    session.assert_result(0).unwrap();
    session.cleanup();
}

/// A predefined test with recursion detection checks the tested call itself.
#[test]
fn detect_recursion_in_test() {
    let mut session = TestSession::new(FACT);
    session
        .test(TestSpec::new().call("fact", vec![Object::Int(4)]).result(24).detect_recursion())
        .unwrap();
    session
        .test(
            TestSpec::new()
                .call("fact_loop", vec![Object::Int(4)])
                .result(24)
                .detect_recursion(),
        )
        .unwrap();
    session.cleanup();

    let statuses: Vec<bool> = session.history().iter().map(pygrade::Node::status).collect();
    assert_eq!(statuses, vec![true, false]);
    let pygrade::Node::Test(iterative) = &session.history()[1] else {
        panic!("expected a test");
    };
    assert_eq!(iterative.recursion(), Some(false));
    assert_eq!(
        iterative.assertions().last().unwrap().explanation(),
        "Evaluating `fact_loop(4)` makes no recursive call"
    );
}

/// Recursion detection needs something to evaluate.
#[test]
fn detect_recursion_needs_a_target() {
    let mut session = TestSession::new(FACT);
    assert_eq!(
        session.test(TestSpec::new().detect_recursion()),
        Err(pygrade::AuthoringError::NothingEvaluated)
    );
}
