use crate::{exception::Exception, namespace::Namespace, object::Object};

/// Copies of the arguments of a function call, keyed by parameter name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArgSnapshot {
    pub before: Namespace,
    pub after: Namespace,
}

/// Observable outcome of one controlled run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Effect {
    pub stdout: String,
    pub stderr: String,
    /// Value of the evaluated expression or call; `None` when the run raised or ran statements.
    pub result: Option<Object>,
    pub exception: Option<Exception>,
    /// Input lines read by the run, in order.
    pub consumed_inputs: Vec<String>,
    /// Set for function calls only.
    pub args: Option<ArgSnapshot>,
}
