//! Builtin functions available to submissions.
//!
//! Builtins that only transform values live as free functions; the ones that call back into
//! submitted code (`sorted(key=...)`, `map`, `filter`, `print`, `input`) are methods on the
//! interpreter's [`Machine`] so they can reach the streams and the call machinery.

mod convert;
pub(crate) mod methods;
mod numeric;
mod print;
mod sequence;

use std::str::FromStr;

use strum::{Display, EnumString, IntoStaticStr};

use crate::{args::ArgValues, exception::RunResult, interp::Machine, object::Object};

/// Every builtin function the interpreter provides, including the `math` module functions.
///
/// The string form is the Python name, so `Builtin::from_str("print")` resolves `print`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum Builtin {
    Print,
    Input,
    Len,
    Sorted,
    Reversed,
    Sum,
    Min,
    Max,
    Abs,
    Round,
    Divmod,
    Pow,
    Enumerate,
    Zip,
    Map,
    Filter,
    Any,
    All,
    Isinstance,
    Repr,
    Chr,
    Ord,
    // math module
    Sqrt,
    Floor,
    Ceil,
    Fabs,
    Gcd,
    Log,
}

impl Builtin {
    /// Resolves a name in the builtin namespace. Module functions are only reachable
    /// through their module.
    #[must_use]
    pub fn from_global_name(name: &str) -> Option<Self> {
        Self::from_str(name).ok().filter(|builtin| !builtin.is_math())
    }

    fn is_math(self) -> bool {
        matches!(
            self,
            Self::Sqrt | Self::Floor | Self::Ceil | Self::Fabs | Self::Gcd | Self::Log
        )
    }
}

impl Machine<'_> {
    pub(crate) fn call_builtin(&mut self, builtin: Builtin, args: ArgValues) -> RunResult<Object> {
        match builtin {
            Builtin::Print => self.builtin_print(args),
            Builtin::Input => self.builtin_input(args),
            Builtin::Len => sequence::builtin_len(args),
            Builtin::Sorted => self.builtin_sorted(args),
            Builtin::Reversed => sequence::builtin_reversed(args),
            Builtin::Sum => sequence::builtin_sum(args),
            Builtin::Min | Builtin::Max => self.builtin_min_max(builtin, args),
            Builtin::Abs => numeric::builtin_abs(args),
            Builtin::Round => numeric::builtin_round(args),
            Builtin::Divmod => numeric::builtin_divmod(args),
            Builtin::Pow => numeric::builtin_pow(args),
            Builtin::Enumerate => sequence::builtin_enumerate(args),
            Builtin::Zip => sequence::builtin_zip(args),
            Builtin::Map => self.builtin_map(args),
            Builtin::Filter => self.builtin_filter(args),
            Builtin::Any => sequence::builtin_any(args),
            Builtin::All => sequence::builtin_all(args),
            Builtin::Isinstance => convert::builtin_isinstance(args),
            Builtin::Repr => Ok(Object::from(args.get_one_arg("repr")?.py_repr())),
            Builtin::Chr => convert::builtin_chr(args),
            Builtin::Ord => convert::builtin_ord(args),
            Builtin::Sqrt | Builtin::Floor | Builtin::Ceil | Builtin::Fabs | Builtin::Gcd | Builtin::Log => {
                numeric::call_math(builtin, args)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_names_exclude_module_functions() {
        assert_eq!(Builtin::from_global_name("len"), Some(Builtin::Len));
        assert_eq!(Builtin::from_global_name("isinstance"), Some(Builtin::Isinstance));
        assert_eq!(Builtin::from_global_name("sqrt"), None);
        assert_eq!(Builtin::from_global_name("open"), None);
    }
}
