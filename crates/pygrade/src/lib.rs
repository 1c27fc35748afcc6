#![doc = include_str!("../../../README.md")]
#![expect(clippy::cast_possible_truncation, reason = "numeric narrowing is checked")]
#![expect(clippy::cast_sign_loss, reason = "sign-changing casts are intentional")]
#![expect(clippy::cast_possible_wrap, reason = "wrap behavior mirrors CPython")]
#![expect(clippy::needless_pass_by_value, reason = "builtins take their arguments by value")]
#![expect(clippy::float_cmp, reason = "Python equality on floats is exact")]
mod analyzer;
mod args;
mod builtins;
pub mod compare;
mod exception;
mod expressions;
mod function;
mod grader;
mod interp;
mod io;
mod json;
mod modules;
mod namespace;
mod object;
mod parse;
mod recursion;
mod resource;
mod sandbox;
pub mod tracer;
mod types;

pub use crate::{
    analyzer::{AstAnalyzer, LoopKind, StaticAnalyzer},
    builtins::Builtin,
    exception::{ExcType, Exception, RunResult},
    function::Function,
    grader::{
        ArgSnapshot, Assert, AssertKind, AssertReport, AuthoringError, CallTarget, Effect, GradeResult, GroupOptions,
        GroupReport, Interrupt, Node, ParamOverrides, Params, ReferenceFn, Report, ReportItem, StopGrader, Test,
        TestCall, TestGroup, TestOptions, TestReport, TestSession, TestSpec, TextCmp, ValueCmp, grade,
    },
    interp::Interpreter,
    io::{CollectStringPrint, InputQueue, PrintWriter, Stream, Streams},
    json::JsonValueError,
    modules::Module,
    namespace::{EXCLUDED_GLOBALS, Modification, Namespace, NamespaceDiff, diff, is_user_name},
    object::{BoundMethod, Object, Range},
    parse::ParseError,
    recursion::{RecursionDetector, TraceRecursionDetector},
    resource::{DEFAULT_MAX_RECURSION_DEPTH, ResourceError, ResourceLimits},
    sandbox::{Sandbox, StreamGuard, Unit, render_call},
    tracer::{CallTracer, FunctionId, NoopTracer, RecordingTracer, RecursionTracer, TraceEvent},
    types::Type,
};
