//! Tests for running submissions through the `Sandbox` interface of `Interpreter`.
//!
//! Every run goes through a `StreamGuard`, the way the grader drives the interpreter, so
//! these tests also cover stream substitution: inputs, `sys.argv` and captured output.

use pretty_assertions::assert_eq;
use pygrade::{
    ExcType, Exception, Interpreter, Namespace, NoopTracer, Object, RecordingTracer, ResourceLimits, Sandbox,
    StreamGuard, Streams, Unit,
};

/// Outcome of one run: the value or exception, then stdout and stderr.
struct Run {
    outcome: Result<Object, Exception>,
    stdout: String,
    stderr: String,
}

fn run_with(interpreter: &mut Interpreter, unit: &Unit<'_>, namespace: &mut Namespace, inputs: &[&str]) -> Run {
    let inputs = inputs.iter().map(|s| (*s).to_owned()).collect();
    let streams = Streams::new(inputs, vec!["submission.py".to_owned()], false);
    let mut guard = StreamGuard::install(interpreter, streams);
    let outcome = guard.run(unit, namespace, &mut NoopTracer);
    let (stdout, stderr, _) = guard.finish().into_captured();
    Run {
        outcome,
        stdout,
        stderr,
    }
}

fn run_program(code: &str, namespace: &mut Namespace) -> Run {
    run_with(&mut Interpreter::new(code), &Unit::Program, namespace, &[])
}

fn evaluate(code: &str, expression: &str) -> Object {
    let mut interpreter = Interpreter::new(code);
    let mut namespace = Namespace::new();
    run_with(&mut interpreter, &Unit::Program, &mut namespace, &[])
        .outcome
        .unwrap();
    run_with(&mut interpreter, &Unit::Expression(expression), &mut namespace, &[])
        .outcome
        .unwrap()
}

// =============================================================================
// 1. Programs and output
// =============================================================================

/// The program reads the globals the grader placed in the namespace.
#[test]
fn program_sees_preset_globals() {
    let code = "\
if a <= b and a <= c:
    print(a, min(b, c), max(b, c))
elif b <= a and b <= c:
    print(b, min(a, c), max(a, c))
else:
    print(c, min(a, b), max(a, b))
";
    let mut namespace: Namespace = [("a", Object::Int(2)), ("b", Object::Int(1)), ("c", Object::Int(3))]
        .into_iter()
        .collect();
    let run = run_program(code, &mut namespace);
    assert!(run.outcome.is_ok());
    assert_eq!(run.stdout, "1 2 3\n");
}

/// Programs run as `__main__`.
#[test]
fn program_runs_as_main() {
    let mut namespace = Namespace::new();
    let run = run_program("if __name__ == '__main__':\n    print('main')\n", &mut namespace);
    assert_eq!(run.stdout, "main\n");
}

/// `print` honours `sep`, `end` and `file`.
#[test]
fn print_keywords() {
    let code = "import sys\nprint(1, 2, sep='-', end='!')\nprint('oops', file=sys.stderr)\n";
    let run = run_program(code, &mut Namespace::new());
    assert_eq!(run.stdout, "1-2!");
    assert_eq!(run.stderr, "oops\n");
}

/// f-strings and `str.format` render values like CPython.
#[test]
fn string_formatting() {
    let code = "x = 3\ny = 0.5\nprint(f'{x} / {y:.2f} / {x!r:>3}')\nprint('{} and {}'.format('a', [1, 'b']))\n";
    let run = run_program(code, &mut Namespace::new());
    assert_eq!(run.stdout, "3 / 0.50 /   3\na and [1, 'b']\n");
}

// =============================================================================
// 2. Functions, expressions and calls
// =============================================================================

/// A function reads a global at call time.
#[test]
fn function_reads_global() {
    let mut interpreter = Interpreter::new("def f(x):\n    return x * a\n");
    let mut namespace = Namespace::new();
    run_with(&mut interpreter, &Unit::Program, &mut namespace, &[]).outcome.unwrap();
    namespace.insert("a", Object::Int(3));
    let run = run_with(
        &mut interpreter,
        &Unit::Call {
            function: "f",
            args: &[Object::Int(9)],
            kwargs: &[],
        },
        &mut namespace,
        &[],
    );
    assert_eq!(run.outcome.unwrap(), Object::Int(27));
}

/// Calls accept keyword arguments and fill in defaults.
#[test]
fn call_with_keywords_and_defaults() {
    let mut interpreter = Interpreter::new("def greet(name, greeting='Hello'):\n    return greeting + ', ' + name\n");
    let mut namespace = Namespace::new();
    run_with(&mut interpreter, &Unit::Program, &mut namespace, &[]).outcome.unwrap();
    let kwargs = [("greeting".to_owned(), Object::from("Hi"))];
    let run = run_with(
        &mut interpreter,
        &Unit::Call {
            function: "greet",
            args: &[Object::from("Ada")],
            kwargs: &kwargs,
        },
        &mut namespace,
        &[],
    );
    assert_eq!(run.outcome.unwrap(), Object::from("Hi, Ada"));
}

/// A call mutates a list argument in place.
#[test]
fn call_mutates_argument() {
    let mut interpreter = Interpreter::new("def add(items):\n    items.append(len(items))\n");
    let mut namespace = Namespace::new();
    run_with(&mut interpreter, &Unit::Program, &mut namespace, &[]).outcome.unwrap();
    let items = Object::list(vec![Object::Int(0)]);
    let args = [items.clone()];
    let run = run_with(
        &mut interpreter,
        &Unit::Call {
            function: "add",
            args: &args,
            kwargs: &[],
        },
        &mut namespace,
        &[],
    );
    assert_eq!(run.outcome.unwrap(), Object::None);
    assert_eq!(items.py_repr(), "[0, 1]");
}

/// Comprehensions, slicing and builtins compose in expressions.
#[test]
fn expressions_and_builtins() {
    let code = "words = ['pear', 'fig', 'apple']\n";
    assert_eq!(
        evaluate(code, "sorted(w.upper() for w in words if len(w) > 3)").py_repr(),
        "['APPLE', 'PEAR']"
    );
    assert_eq!(evaluate(code, "{w: len(w) for w in words[1:]}").py_repr(), "{'fig': 3, 'apple': 5}");
    assert_eq!(evaluate(code, "words[::-1][0]"), Object::from("apple"));
    assert_eq!(evaluate(code, "2 ** 100").py_repr(), "1267650600228229401496703205376");
    assert_eq!(evaluate(code, "7 // -2, 7 % -2, 1 / 4").py_repr(), "(-4, -1, 0.25)");
}

/// A function defined later replaces an earlier one of the same name.
#[test]
fn later_definition_wins() {
    let code = "def f():\n    return 1\ndef f():\n    return 2\n";
    assert_eq!(evaluate(code, "f()"), Object::Int(2));
}

/// Closures see the enclosing scope through `nonlocal`.
#[test]
fn nonlocal_counter() {
    let code = "\
def counter():
    count = 0
    def step():
        nonlocal count
        count += 1
        return count
    return step
tick = counter()
tick()
";
    assert_eq!(evaluate(code, "tick()"), Object::Int(2));
}

// =============================================================================
// 3. Inputs and arguments
// =============================================================================

/// `input()` consumes the queued lines in order.
#[test]
fn input_reads_queue() {
    let code = "a = int(input('a? '))\nb = int(input('b? '))\nprint(a + b)\n";
    let mut namespace = Namespace::new();
    let run = run_with(&mut Interpreter::new(code), &Unit::Program, &mut namespace, &["2", "40"]);
    assert!(run.outcome.is_ok());
    assert_eq!(run.stdout, "42\n");
    assert_eq!(namespace.get("a"), Some(&Object::Int(2)));
}

/// Reading past the end of the queue raises `EOFError`.
#[test]
fn input_exhausted_raises_eof() {
    let mut namespace = Namespace::new();
    let run = run_with(&mut Interpreter::new("x = input()\ny = input()\n"), &Unit::Program, &mut namespace, &["1"]);
    let exception = run.outcome.unwrap_err();
    assert_eq!(exception.exc_type(), ExcType::EOFError);
    assert_eq!(exception.message(), Some("No input to be read"));
    assert_eq!(exception.line(), Some(2));
    assert_eq!(namespace.get("x"), Some(&Object::from("1")));
}

/// With echo on, prompts and consumed lines appear in the output.
#[test]
fn echoed_inputs() {
    let mut interpreter = Interpreter::new("name = input('Name: ')\nprint('Hi', name)\n");
    let streams = Streams::new(vec!["Bob".to_owned()], vec![], true);
    let mut guard = StreamGuard::install(&mut interpreter, streams);
    guard.run(&Unit::Program, &mut Namespace::new(), &mut NoopTracer).unwrap();
    assert_eq!(guard.finish().stdout(), "Name: Bob\nHi Bob\n");
}

/// `sys.argv` exposes the installed argument vector.
#[test]
fn sys_argv() {
    let mut interpreter = Interpreter::new("import sys\nprint(sys.argv[1:], len(sys.argv))\n");
    let streams = Streams::new(vec![], vec!["prog.py".to_owned(), "-v".to_owned()], false);
    let mut guard = StreamGuard::install(&mut interpreter, streams);
    guard.run(&Unit::Program, &mut Namespace::new(), &mut NoopTracer).unwrap();
    assert_eq!(guard.finish().stdout(), "['-v'] 2\n");
}

// =============================================================================
// 4. Exceptions and limits
// =============================================================================

/// Uncaught exceptions carry their type, message and line.
#[test]
fn uncaught_exception() {
    let mut namespace = Namespace::new();
    let run = run_program("x = 1\ny = x / 0\n", &mut namespace);
    let exception = run.outcome.unwrap_err();
    assert_eq!(exception.exc_type(), ExcType::ZeroDivisionError);
    assert_eq!(exception.line(), Some(2));
    assert_eq!(namespace.get("x"), Some(&Object::Int(1)));
    assert!(!namespace.contains("y"));
}

/// `try`/`except` catches subclasses and binds the exception.
#[test]
fn handled_exception() {
    let code = "\
try:
    int('abc')
except Exception as e:
    print('caught', e)
finally:
    print('done')
";
    let run = run_program(code, &mut Namespace::new());
    assert!(run.outcome.is_ok());
    assert_eq!(run.stdout, "caught invalid literal for int() with base 10: 'abc'\ndone\n");
}

/// Source that does not parse fails every program run with a `SyntaxError`.
#[test]
fn syntax_error() {
    let run = run_program("def f(:\n", &mut Namespace::new());
    assert_eq!(run.outcome.unwrap_err().exc_type(), ExcType::SyntaxError);
}

/// Unbounded recursion stops at the configured depth.
#[test]
fn recursion_limit() {
    let mut interpreter =
        Interpreter::new("def down(n):\n    return down(n + 1)\n").with_limits(ResourceLimits::new().max_recursion_depth(25));
    let mut namespace = Namespace::new();
    run_with(&mut interpreter, &Unit::Program, &mut namespace, &[]).outcome.unwrap();
    let run = run_with(&mut interpreter, &Unit::Expression("down(0)"), &mut namespace, &[]);
    let exception = run.outcome.unwrap_err();
    assert_eq!(exception.exc_type(), ExcType::RecursionError);
    assert_eq!(exception.message(), Some("maximum recursion depth exceeded"));
}

/// The tracer sees every user-function call with its depth.
#[test]
fn tracer_sees_calls() {
    let mut interpreter = Interpreter::new("def fact(n):\n    return 1 if n <= 1 else n * fact(n - 1)\n");
    let mut namespace = Namespace::new();
    run_with(&mut interpreter, &Unit::Program, &mut namespace, &[]).outcome.unwrap();
    let mut tracer = RecordingTracer::new();
    let result = interpreter.run(&Unit::Expression("fact(4)"), &mut namespace, &mut tracer);
    assert_eq!(result.unwrap(), Object::Int(24));
    assert_eq!(tracer.called_names().collect::<Vec<_>>(), vec!["fact"; 4]);
    assert_eq!(tracer.max_depth(), 4);
}
