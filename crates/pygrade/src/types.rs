use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

/// Python builtin types as seen by `type()`, `isinstance()` and the variable-type assertions.
///
/// The string form matches the Python class name, so `Type::from_str("int")` and
/// the serde representation both use `"int"`, `"str"`, `"NoneType"`, etc.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Type {
    #[strum(serialize = "NoneType")]
    #[serde(rename = "NoneType")]
    NoneType,
    Bool,
    Int,
    Float,
    Str,
    List,
    Tuple,
    Dict,
    Set,
    Range,
    Function,
    #[strum(serialize = "builtin_function_or_method")]
    #[serde(rename = "builtin_function_or_method")]
    BuiltinFunction,
    Method,
    Type,
    Module,
    #[strum(serialize = "TextIOWrapper")]
    #[serde(rename = "TextIOWrapper")]
    TextIO,
    /// Instances of any exception class.
    #[strum(serialize = "BaseException")]
    #[serde(rename = "BaseException")]
    Exception,
}

impl Type {
    /// `bool` is a subclass of `int`; every other builtin type only matches itself.
    #[must_use]
    pub fn is_subclass_of(self, other: Self) -> bool {
        self == other || (self == Self::Bool && other == Self::Int)
    }

    /// Whether calling the type object constructs a value (`int("3")`, `list(x)`, ...).
    #[must_use]
    pub fn is_constructor(self) -> bool {
        matches!(
            self,
            Self::Bool
                | Self::Int
                | Self::Float
                | Self::Str
                | Self::List
                | Self::Tuple
                | Self::Dict
                | Self::Set
                | Self::Range
                | Self::Type
        )
    }
}
