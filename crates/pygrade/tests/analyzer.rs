//! Tests for the structural queries of `AstAnalyzer` and the assertions built on them.

use pygrade::{AstAnalyzer, LoopKind, Node, StaticAnalyzer, TestSession};

const SOURCE: &str = "\
def total(items):
    result = 0
    for item in items:
        result += item
    return result

def countdown(n):
    while n > 0:
        print(n)
        n -= 1

def squares(n):
    return [i * i for i in range(n)]

def largest(items):
    return max(items)

def report(items):
    print(total(items))
    items.sort()

def outer():
    def inner():
        return 1
    return None
";

// =============================================================================
// 1. Loops
// =============================================================================

/// `for`, `while` and comprehension loops are told apart.
#[test]
fn loop_kinds() {
    let analyzer = AstAnalyzer::new(SOURCE);
    assert!(analyzer.has_loop("total", &[LoopKind::For]));
    assert!(!analyzer.has_loop("total", &[LoopKind::While]));
    assert!(analyzer.has_loop("countdown", &[LoopKind::While]));
    assert!(analyzer.has_loop("squares", &LoopKind::ALL), "a comprehension is a for loop");
    assert!(!analyzer.has_loop("largest", &LoopKind::ALL));
}

/// An unknown function has no loop.
#[test]
fn unknown_function_has_no_loop() {
    assert!(!AstAnalyzer::new(SOURCE).has_loop("missing", &LoopKind::ALL));
}

// =============================================================================
// 2. Definitions and calls
// =============================================================================

/// Nested definitions are found too.
#[test]
fn defined_functions() {
    let analyzer = AstAnalyzer::new(SOURCE);
    assert!(analyzer.defines_function("inner"));
    assert!(!analyzer.defines_function("print"));
    assert_eq!(
        analyzer.function_names().collect::<Vec<_>>(),
        vec!["total", "countdown", "squares", "largest", "report", "outer", "inner"]
    );
}

/// Calls include builtins and method names.
#[test]
fn calls_list() {
    let calls = AstAnalyzer::new(SOURCE).calls_list("report");
    assert_eq!(calls.iter().map(String::as_str).collect::<Vec<_>>(), vec!["print", "total", "sort"]);
}

/// Only a `return` with a value in the function itself counts.
#[test]
fn returns_none() {
    let analyzer = AstAnalyzer::new(SOURCE);
    assert!(analyzer.returns_none("countdown"));
    assert!(analyzer.returns_none("outer"), "the nested return belongs to inner");
    assert!(!analyzer.returns_none("largest"));
    assert!(!analyzer.returns_none("missing"));
}

/// Source that does not parse yields an analyzer knowing nothing.
#[test]
fn unparsable_source() {
    let analyzer = AstAnalyzer::new("def broken(:\n");
    assert!(!analyzer.defines_function("broken"));
    assert_eq!(analyzer.function_names().count(), 0);
}

// =============================================================================
// 3. Structural assertions
// =============================================================================

/// The structural assertions read the submission source, not the state.
#[test]
fn structural_assertions() {
    let mut session = TestSession::new(SOURCE);
    session.begin_test();
    session.assert_defines_function("largest").unwrap();
    session.assert_no_loop("largest").unwrap();
    session.assert_calls_function("report", "total").unwrap();
    session.assert_returns_none("report").unwrap();
    session.assert_no_loop_kinds("countdown", &[LoopKind::For]).unwrap();
    session.assert_no_loop("total").unwrap_err();
    session.cleanup();

    let Node::Test(test) = &session.history()[0] else {
        panic!("expected a test");
    };
    assert!(!test.status());
    let last = test.assertions().last().unwrap();
    assert_eq!(last.explanation(), "Function `total` contains a while or for loop");
}
