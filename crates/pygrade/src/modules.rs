use std::str::FromStr;

use strum::{Display, EnumString, IntoStaticStr};

use crate::{
    builtins::Builtin,
    exception::{ExcType, RunResult},
    object::Object,
};

/// Standard library modules available to submissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum Module {
    Sys,
    Math,
}

impl Module {
    /// Resolves `import name`, raising `ModuleNotFoundError` for anything else.
    pub(crate) fn import(name: &str) -> RunResult<Self> {
        Self::from_str(name).map_err(|_| ExcType::ModuleNotFoundError.msg(format!("No module named '{name}'")))
    }

    /// Static attributes. `sys.argv` is dynamic and resolved by the interpreter.
    pub(crate) fn attribute(self, name: &str) -> RunResult<Object> {
        let found = match (self, name) {
            (Self::Math, "pi") => Some(Object::Float(std::f64::consts::PI)),
            (Self::Math, "e") => Some(Object::Float(std::f64::consts::E)),
            (Self::Math, "inf") => Some(Object::Float(f64::INFINITY)),
            (Self::Math, "sqrt") => Some(Object::Builtin(Builtin::Sqrt)),
            (Self::Math, "floor") => Some(Object::Builtin(Builtin::Floor)),
            (Self::Math, "ceil") => Some(Object::Builtin(Builtin::Ceil)),
            (Self::Math, "fabs") => Some(Object::Builtin(Builtin::Fabs)),
            (Self::Math, "gcd") => Some(Object::Builtin(Builtin::Gcd)),
            (Self::Math, "log") => Some(Object::Builtin(Builtin::Log)),
            _ => None,
        };
        found.ok_or_else(|| ExcType::AttributeError.msg(format!("module '{self}' has no attribute '{name}'")))
    }
}
