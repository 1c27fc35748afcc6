use std::fmt;

use serde::{Deserialize, Serialize};

use crate::exception::{ExcType, Exception};

/// Default maximum call depth for submitted code.
///
/// Each Python frame costs several host stack frames in a tree-walking interpreter, so
/// this stays well below CPython's default of 1000 to avoid exhausting the native stack.
pub const DEFAULT_MAX_RECURSION_DEPTH: usize = 200;

/// Limits applied by the interpreter to every run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceLimits {
    pub max_recursion_depth: usize,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            max_recursion_depth: DEFAULT_MAX_RECURSION_DEPTH,
        }
    }
}

impl ResourceLimits {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn max_recursion_depth(mut self, depth: usize) -> Self {
        self.max_recursion_depth = depth;
        self
    }

    /// Checks that entering one more frame stays within the limit.
    pub(crate) fn check_depth(&self, depth: usize) -> Result<(), ResourceError> {
        if depth > self.max_recursion_depth {
            Err(ResourceError::Recursion {
                limit: self.max_recursion_depth,
                depth,
            })
        } else {
            Ok(())
        }
    }
}

/// Error returned when a resource limit is exceeded during execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceError {
    /// Maximum recursion depth exceeded.
    Recursion { limit: usize, depth: usize },
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Recursion { .. } => write!(f, "maximum recursion depth exceeded"),
        }
    }
}

impl std::error::Error for ResourceError {}

impl From<ResourceError> for Exception {
    /// Resource errors surface inside the submission as catchable exceptions:
    /// `Recursion` becomes `RecursionError`.
    fn from(error: ResourceError) -> Self {
        match error {
            ResourceError::Recursion { .. } => ExcType::RecursionError.msg(error.to_string()),
        }
    }
}
