use std::{cell::RefCell, fmt, rc::Rc};

use indexmap::IndexMap;

use crate::{expressions::FunctionDef, object::Object, tracer::FunctionId};

/// Local variables of one function activation.
///
/// Frames are reference counted so that nested functions can capture the enclosing
/// activation and observe later rebinding, the way Python cells behave.
pub(crate) type Scope = Rc<RefCell<IndexMap<String, Object>>>;

/// A user-defined function value: a definition plus the state captured when `def` ran.
pub struct Function {
    pub(crate) def: Rc<FunctionDef>,
    /// Evaluated defaults, one per parameter that declares a default, in declaration order.
    pub(crate) defaults: Vec<Object>,
    /// Enclosing function scopes, innermost first.
    pub(crate) closure: Vec<Scope>,
}

impl Function {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.def.name
    }

    /// Positional parameter names, used to label argument snapshots.
    #[must_use]
    pub fn parameter_names(&self) -> Vec<String> {
        self.def.positional_names().map(str::to_owned).collect()
    }

    /// Identity of the function's code, shared by every value created from the same `def`.
    #[must_use]
    pub fn code_id(&self) -> FunctionId {
        FunctionId::of(&self.def)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<function {}>", self.def.name)
    }
}

/// Two function values are equal when they come from the same definition with equal defaults.
///
/// Re-running the submitted module against an existing namespace creates new function
/// values from the same parsed definitions, so a reload does not count as a change.
impl PartialEq for Function {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.def, &other.def) && self.defaults == other.defaults
    }
}
