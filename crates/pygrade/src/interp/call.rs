use std::{cell::RefCell, rc::Rc};

use indexmap::IndexMap;

use crate::{
    args::ArgValues,
    exception::{ExcType, Exception, RunResult},
    function::Function,
    interp::{Flow, Frame, Machine},
    object::Object,
};

impl Machine<'_> {
    /// Calls any callable value.
    pub(crate) fn call_object(&mut self, callee: &Object, args: ArgValues) -> RunResult<Object> {
        match callee {
            Object::Function(function) => self.call_function(function, args),
            Object::Builtin(builtin) => self.call_builtin(*builtin, args),
            Object::Method(method) => self.call_method(&method.receiver, &method.name, args),
            Object::Type(t) => self.call_type(*t, args),
            Object::ExcType(exc_type) => new_exception(*exc_type, args).map(Object::from),
            other => Err(ExcType::TypeError.msg(format!(
                "'{}' object is not callable",
                other.type_name()
            ))),
        }
    }

    /// Runs a user function in a fresh frame, reporting the activation to the tracer.
    pub(crate) fn call_function(&mut self, function: &Rc<Function>, args: ArgValues) -> RunResult<Object> {
        let locals = bind_arguments(function, args)?;
        let depth = self.depth + 1;
        self.limits.check_depth(depth)?;

        self.depth = depth;
        if self.tracer.on_call(function.code_id(), function.name(), depth).is_break() {
            self.depth -= 1;
            self.tracer.on_return(self.depth);
            return Err(Exception::halt());
        }
        let mut frame = Frame::function(Rc::clone(function), locals);
        let result = self.exec_block(&mut frame, &function.def.body);
        self.depth -= 1;
        self.tracer.on_return(self.depth);

        match result? {
            Flow::Return(value) => Ok(value),
            Flow::Normal | Flow::Break | Flow::Continue => Ok(Object::None),
        }
    }
}

/// Instantiates an exception class; one argument becomes the message, several a tuple.
fn new_exception(exc_type: ExcType, args: ArgValues) -> RunResult<Exception> {
    args.check_no_kwargs(&exc_type.to_string())?;
    let mut values = args.args;
    Ok(match values.len() {
        0 => exc_type.bare(),
        1 => exc_type.msg(values.remove(0).to_string()),
        _ => exc_type.msg(Object::tuple(values).py_repr()),
    })
}

/// Matches call arguments to the parameters of `function`, producing its initial locals.
fn bind_arguments(function: &Function, args: ArgValues) -> RunResult<IndexMap<String, Object>> {
    let def = &function.def;
    let name = def.name.as_str();
    let ArgValues { args, kwargs } = args;
    let mut locals = IndexMap::with_capacity(def.params.len());

    let positional: Vec<&str> = def.positional_names().collect();
    let given = args.len();
    let mut surplus = Vec::new();
    for (index, value) in args.into_iter().enumerate() {
        match positional.get(index) {
            Some(param) => {
                locals.insert((*param).to_owned(), value);
            }
            None => surplus.push(value),
        }
    }
    match &def.varargs {
        Some(varargs) => {
            locals.insert(varargs.clone(), Object::tuple(surplus));
        }
        None if !surplus.is_empty() => {
            return Err(too_many_positional(function, positional.len(), given));
        }
        None => {}
    }

    let mut extra_kwargs = IndexMap::new();
    for (key, value) in kwargs {
        if def.params.iter().any(|p| p.name == key) {
            if locals.contains_key(&key) {
                return Err(ExcType::TypeError.msg(format!(
                    "{name}() got multiple values for argument '{key}'"
                )));
            }
            locals.insert(key, value);
        } else if def.kwargs.is_some() {
            extra_kwargs.insert(Object::from(key), value);
        } else {
            return Err(ExcType::TypeError.msg(format!(
                "{name}() got an unexpected keyword argument '{key}'"
            )));
        }
    }
    if let Some(kwargs) = &def.kwargs {
        locals.insert(kwargs.clone(), Object::Dict(Rc::new(RefCell::new(extra_kwargs))));
    }

    let mut defaults = function.defaults.iter();
    let mut missing = Vec::new();
    for param in &def.params {
        let default = param.default.as_ref().and_then(|_| defaults.next());
        if locals.contains_key(&param.name) {
            continue;
        }
        match default {
            Some(value) => {
                locals.insert(param.name.clone(), value.clone());
            }
            None => missing.push(param),
        }
    }
    if !missing.is_empty() {
        let kind = if missing.iter().all(|p| p.keyword_only) {
            "keyword-only"
        } else {
            "positional"
        };
        let names: Vec<String> = missing.iter().map(|p| format!("'{}'", p.name)).collect();
        let listed = match names.split_last() {
            Some((last, rest)) if !rest.is_empty() => format!("{} and {last}", rest.join(", ")),
            _ => names.join(""),
        };
        let plural = if missing.len() == 1 { "" } else { "s" };
        return Err(ExcType::TypeError.msg(format!(
            "{name}() missing {} required {kind} argument{plural}: {listed}",
            missing.len()
        )));
    }
    Ok(locals)
}

fn too_many_positional(function: &Function, max: usize, given: usize) -> Exception {
    let def = &function.def;
    let required = def
        .params
        .iter()
        .filter(|p| !p.keyword_only && p.default.is_none())
        .count();
    let takes = if required == max {
        format!("{max} positional argument{}", if max == 1 { "" } else { "s" })
    } else {
        format!("from {required} to {max} positional arguments")
    };
    let verb = if given == 1 { "was" } else { "were" };
    ExcType::TypeError.msg(format!("{}() takes {takes} but {given} {verb} given", def.name))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn exception_arguments() {
        let bare = new_exception(ExcType::ValueError, ArgValues::default()).unwrap();
        assert_eq!(bare.message(), None);

        let one = new_exception(ExcType::ValueError, ArgValues::one(Object::from(5))).unwrap();
        assert_eq!(one.message(), Some("5"));

        let two = new_exception(
            ExcType::KeyError,
            ArgValues::positional(vec![Object::from("a"), Object::from(1)]),
        )
        .unwrap();
        assert_eq!(two.message(), Some("('a', 1)"));
    }
}
