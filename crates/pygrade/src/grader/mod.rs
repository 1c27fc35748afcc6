//! The execution-and-assertion engine.
//!
//! A [`TestSession`] runs the submission through a [`crate::Sandbox`], records [`Test`]s
//! and [`TestGroup`]s in its history and turns them into a weighted grade. Grading
//! scripts are plain closures over the session, see [`grade`].

mod assertion;
mod effect;
mod error;
mod group;
mod params;
mod report;
mod session;
mod test;

use log::{info, warn};

pub use assertion::{Assert, AssertKind};
pub use effect::{ArgSnapshot, Effect};
pub use error::{AuthoringError, GradeResult, Interrupt, StopGrader};
pub use group::{GroupOptions, Node, TestGroup};
pub use params::{ParamOverrides, Params};
pub use report::{AssertReport, GroupReport, Report, ReportItem, TestReport};
pub use session::{CallTarget, ReferenceFn, TestCall, TestSession, TestSpec, TextCmp, ValueCmp};
pub use test::{Test, TestOptions};

/// Runs a grading script and reports the result.
///
/// Open tests and groups are closed before grading.
///
/// Wrap hand-written tests in [`TestSession::with_test`] so that a fail-fast stop ends only
/// the failing test. A stop that escapes the script skips everything after it; the tests
/// recorded so far are still graded and a warning is logged.
pub fn grade(session: &mut TestSession, script: impl FnOnce(&mut TestSession) -> GradeResult) -> Result<Report, AuthoringError> {
    match script(session) {
        Ok(()) => {}
        Err(Interrupt::Stop(StopGrader)) => {
            warn!("a fail-fast stop escaped the grading script, the rest of the script was skipped");
        }
        Err(Interrupt::Authoring(error)) => return Err(error),
    }
    session.cleanup();
    let report = session.report()?;
    info!(
        "graded {} items: {:.1}/100",
        report.items.len(),
        report.grade
    );
    Ok(report)
}
