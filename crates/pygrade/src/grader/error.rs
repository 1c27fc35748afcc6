use thiserror::Error;

use crate::exception::Exception;

/// Mistakes in the grading script itself. They always abort the grading run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AuthoringError {
    #[error("no current test, assertion impossible")]
    NoCurrentTest,
    #[error("a test runs either an expression or a function call, not both")]
    AmbiguousTarget,
    #[error("nothing was evaluated: the test has no expression or function call")]
    NothingEvaluated,
    #[error("no expression was evaluated, a result check is impossible")]
    NoExpression,
    #[error("no expected values provided")]
    NoExpectedValues,
    #[error("a function call test needs a reference function or an expected result")]
    NoExpectedResult,
    #[error("test group `{0}` has a total weight of zero")]
    EmptyGroup(String),
    #[error("the session has no weighted test to grade")]
    EmptySession,
    #[error("no open test group")]
    NoOpenGroup,
    #[error("the preamble raised {0}")]
    Preamble(Exception),
}

/// Signal raised by a failed assertion in a fail-fast test.
///
/// It stops the rest of the current test and is absorbed by the session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Error)]
#[error("assertion failed in a fail-fast test")]
pub struct StopGrader;

/// Everything that can cut a grading script short.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Interrupt {
    #[error(transparent)]
    Authoring(#[from] AuthoringError),
    #[error(transparent)]
    Stop(#[from] StopGrader),
}

pub type GradeResult<T = ()> = Result<T, Interrupt>;

/// Turns a fail-fast signal into a normal return, keeping authoring errors.
pub(crate) fn absorb_stop(result: GradeResult) -> Result<(), AuthoringError> {
    match result {
        Ok(()) | Err(Interrupt::Stop(_)) => Ok(()),
        Err(Interrupt::Authoring(error)) => Err(error),
    }
}
