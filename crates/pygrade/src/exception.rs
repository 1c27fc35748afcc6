use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

/// Result type alias for operations that can raise a Python exception inside the sandbox.
pub type RunResult<T> = Result<T, Exception>;

/// Python exception types supported by the interpreter.
///
/// Uses strum derives for automatic `Display`, `FromStr`, and `Into<&'static str>` implementations.
/// The string representation matches the variant name exactly (e.g., `ValueError` -> "ValueError").
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr, Serialize, Deserialize,
)]
pub enum ExcType {
    /// Root of the exception hierarchy.
    BaseException,
    /// Base class for all non-exit exceptions.
    Exception,
    ArithmeticError,
    OverflowError,
    ZeroDivisionError,
    AssertionError,
    AttributeError,
    EOFError,
    ImportError,
    ModuleNotFoundError,
    LookupError,
    IndexError,
    KeyError,
    NameError,
    UnboundLocalError,
    RuntimeError,
    NotImplementedError,
    RecursionError,
    StopIteration,
    SyntaxError,
    TypeError,
    ValueError,
}

impl ExcType {
    /// Direct parent in the builtin exception hierarchy, `None` for `BaseException`.
    #[must_use]
    pub fn parent(self) -> Option<Self> {
        match self {
            Self::BaseException => None,
            Self::Exception => Some(Self::BaseException),
            Self::OverflowError | Self::ZeroDivisionError => Some(Self::ArithmeticError),
            Self::ModuleNotFoundError => Some(Self::ImportError),
            Self::IndexError | Self::KeyError => Some(Self::LookupError),
            Self::UnboundLocalError => Some(Self::NameError),
            Self::NotImplementedError | Self::RecursionError => Some(Self::RuntimeError),
            _ => Some(Self::Exception),
        }
    }

    /// Checks if this exception type is the same as, or a subclass of, `handler_type`.
    ///
    /// Used by `except` clauses and by exception assertions so that catching
    /// `LookupError` also catches `KeyError` and `IndexError`.
    #[must_use]
    pub fn is_subclass_of(self, handler_type: Self) -> bool {
        let mut current = Some(self);
        while let Some(exc_type) = current {
            if exc_type == handler_type {
                return true;
            }
            current = exc_type.parent();
        }
        false
    }

    /// Creates an exception of this type with the given message.
    #[must_use]
    pub fn msg(self, message: impl Into<String>) -> Exception {
        Exception::new(self, Some(message.into()))
    }

    /// Creates an exception of this type with no message.
    #[must_use]
    pub fn bare(self) -> Exception {
        Exception::new(self, None)
    }
}

/// A Python exception raised by submitted code.
///
/// Exceptions are values on the submission side: the interpreter returns them as the `Err`
/// variant of [`RunResult`] and the grader stores them on the test instead of propagating them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exception {
    exc_type: ExcType,
    message: Option<String>,
    /// 1-based source line of the innermost statement that raised, when known.
    line: Option<u32>,
    /// Set when a call tracer ended the run; no `except` clause can catch it.
    #[serde(skip)]
    halted: bool,
}

impl Exception {
    #[must_use]
    pub fn new(exc_type: ExcType, message: Option<String>) -> Self {
        Self {
            exc_type,
            message,
            line: None,
            halted: false,
        }
    }

    /// The exception unwinding a run that a call tracer asked to stop.
    #[must_use]
    pub(crate) fn halt() -> Self {
        Self {
            halted: true,
            ..ExcType::BaseException.msg("execution stopped by the call tracer")
        }
    }

    /// Whether this exception ends the run regardless of `try` statements.
    #[must_use]
    pub fn is_halt(&self) -> bool {
        self.halted
    }

    #[must_use]
    pub fn exc_type(&self) -> ExcType {
        self.exc_type
    }

    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    #[must_use]
    pub fn line(&self) -> Option<u32> {
        self.line
    }

    /// Attaches a line number unless a more precise one was already recorded.
    #[must_use]
    pub(crate) fn at_line(mut self, line: u32) -> Self {
        if self.line.is_none() {
            self.line = Some(line);
        }
        self
    }

    /// Python `repr()` of the exception instance, e.g. `ValueError('bad')`.
    #[must_use]
    pub fn py_repr(&self) -> String {
        match &self.message {
            Some(message) => format!("{}({})", self.exc_type, crate::object::str_repr(message)),
            None => format!("{}()", self.exc_type),
        }
    }

    /// One-line summary including the source line, used in feedback.
    #[must_use]
    pub fn summary(&self) -> String {
        match self.line {
            Some(line) => format!("{self} (line {line})"),
            None => self.to_string(),
        }
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(message) if !message.is_empty() => write!(f, "{}: {message}", self.exc_type),
            _ => write!(f, "{}", self.exc_type),
        }
    }
}

impl std::error::Error for Exception {}
