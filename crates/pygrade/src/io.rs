use std::{borrow::Cow, collections::VecDeque, fmt, mem};

use strum::{Display, IntoStaticStr};

use crate::exception::{ExcType, RunResult};

/// Trait for handling text written by the submission (`print()`, `sys.stdout.write()`).
pub trait PrintWriter {
    /// Called once for each formatted argument passed to `print()`.
    ///
    /// Must not add separators or a trailing newline; those are emitted via
    /// [`PrintWriter::stdout_push`].
    fn stdout_write(&mut self, output: Cow<'_, str>);

    /// Add a single character, generally a separator or the line terminator.
    fn stdout_push(&mut self, end: char);
}

/// A `PrintWriter` that collects all output into a string.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CollectStringPrint(String);

impl CollectStringPrint {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn output(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_output(self) -> String {
        self.0
    }
}

impl PrintWriter for CollectStringPrint {
    fn stdout_write(&mut self, output: Cow<'_, str>) {
        self.0.push_str(&output);
    }

    fn stdout_push(&mut self, end: char) {
        self.0.push(end);
    }
}

/// Queue of input lines served to `input()`.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct InputQueue(VecDeque<String>);

impl InputQueue {
    #[must_use]
    pub fn new(lines: Vec<String>) -> Self {
        Self(lines.into())
    }

    /// Pops the next line, raising `EOFError` once the queue is exhausted.
    pub fn read_line(&mut self) -> RunResult<String> {
        self.0
            .pop_front()
            .ok_or_else(|| ExcType::EOFError.msg("No input to be read"))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn into_lines(self) -> Vec<String> {
        self.0.into()
    }
}

/// Standard streams reachable from submitted code through `sys`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum Stream {
    Stdout,
    Stderr,
}

/// Everything a run can read from or write to outside its namespace.
///
/// A fresh `Streams` is installed into the sandbox for every controlled run and taken
/// back afterwards; see [`crate::sandbox::StreamGuard`].
#[derive(Debug, Default, Clone)]
pub struct Streams {
    pub(crate) inputs: InputQueue,
    pub(crate) argv: Vec<String>,
    pub(crate) stdout: CollectStringPrint,
    pub(crate) stderr: CollectStringPrint,
    /// Echo prompts and consumed lines to stdout, the way a terminal shows them.
    pub(crate) echo_inputs: bool,
}

impl Streams {
    #[must_use]
    pub fn new(inputs: Vec<String>, argv: Vec<String>, echo_inputs: bool) -> Self {
        Self {
            inputs: InputQueue::new(inputs),
            argv,
            echo_inputs,
            ..Self::default()
        }
    }

    /// Serves `input(prompt)`.
    pub(crate) fn read_input(&mut self, prompt: &str) -> RunResult<String> {
        let line = self.inputs.read_line()?;
        if self.echo_inputs {
            self.stdout.stdout_write(Cow::Borrowed(prompt));
            self.stdout.stdout_write(Cow::Borrowed(&line));
            self.stdout.stdout_push('\n');
        }
        Ok(line)
    }

    pub(crate) fn writer(&mut self, stream: Stream) -> &mut dyn PrintWriter {
        match stream {
            Stream::Stdout => &mut self.stdout,
            Stream::Stderr => &mut self.stderr,
        }
    }

    #[must_use]
    pub fn stdout(&self) -> &str {
        self.stdout.output()
    }

    #[must_use]
    pub fn stderr(&self) -> &str {
        self.stderr.output()
    }

    #[must_use]
    pub fn argv(&self) -> &[String] {
        &self.argv
    }

    /// Splits the streams into captured `(stdout, stderr, unread input lines)`.
    #[must_use]
    pub fn into_captured(mut self) -> (String, String, Vec<String>) {
        let stdout = mem::take(&mut self.stdout).into_output();
        let stderr = mem::take(&mut self.stderr).into_output();
        (stdout, stderr, self.inputs.into_lines())
    }
}

impl fmt::Display for Streams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "streams(argv={:?}, pending inputs={}, stdout={} bytes, stderr={} bytes)",
            self.argv,
            self.inputs.len(),
            self.stdout.output().len(),
            self.stderr.output().len()
        )
    }
}
