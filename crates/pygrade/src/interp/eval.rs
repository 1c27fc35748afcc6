use std::{cell::RefCell, rc::Rc};

use indexmap::IndexMap;

use crate::{
    args::ArgValues,
    builtins::methods::has_method,
    exception::{ExcType, RunResult},
    expressions::{CallArg, ComprehensionKind, Expr, FStringPart, FunctionDef, Generator, Target},
    function::Function,
    interp::{
        Frame, Machine,
        format::format_field,
        ops::{self, SliceBounds},
    },
    io::Stream,
    modules::Module,
    object::{BoundMethod, Object},
};

impl Machine<'_> {
    pub(crate) fn eval(&mut self, frame: &mut Frame, expr: &Expr) -> RunResult<Object> {
        match expr {
            Expr::Constant(value) => Ok(value.clone()),
            Expr::FString(parts) => self.eval_fstring(frame, parts),
            Expr::Name(name) => self.load_name(frame, name),
            Expr::List(items) => Ok(Object::list(self.eval_all(frame, items)?)),
            Expr::Tuple(items) => Ok(Object::tuple(self.eval_all(frame, items)?)),
            Expr::Set(items) => {
                let items = self.eval_all(frame, items)?;
                items.iter().try_for_each(ops::check_hashable)?;
                Ok(Object::set(items))
            }
            Expr::Dict(pairs) => {
                let mut map = IndexMap::with_capacity(pairs.len());
                for (key, value) in pairs {
                    let key = self.eval(frame, key)?;
                    ops::check_hashable(&key)?;
                    let value = self.eval(frame, value)?;
                    map.insert(key, value);
                }
                Ok(Object::Dict(Rc::new(RefCell::new(map))))
            }
            Expr::BinOp { left, op, right } => {
                let left = self.eval(frame, left)?;
                let right = self.eval(frame, right)?;
                ops::binary_op(&left, *op, &right)
            }
            Expr::UnaryOp { op, operand } => {
                let operand = self.eval(frame, operand)?;
                ops::unary_op(*op, &operand)
            }
            Expr::BoolOp { and, values } => {
                let mut last = Object::None;
                for value in values {
                    last = self.eval(frame, value)?;
                    if last.is_truthy() != *and {
                        break;
                    }
                }
                Ok(last)
            }
            Expr::Compare { left, comparisons } => {
                let mut left = self.eval(frame, left)?;
                for (op, right) in comparisons {
                    let right = self.eval(frame, right)?;
                    if !ops::compare(&left, *op, &right)? {
                        return Ok(Object::Bool(false));
                    }
                    left = right;
                }
                Ok(Object::Bool(true))
            }
            Expr::Call { func, args } => self.eval_call(frame, func, args),
            Expr::Attribute { value, attr } => {
                let value = self.eval(frame, value)?;
                self.get_attribute(&value, attr)
            }
            Expr::Subscript { value, index } => {
                let container = self.eval(frame, value)?;
                if let Expr::Slice { lower, upper, step } = &**index {
                    let bounds = self.eval_slice_bounds(frame, lower, upper, step)?;
                    ops::get_slice(&container, &bounds)
                } else {
                    let index = self.eval(frame, index)?;
                    ops::get_item(&container, &index)
                }
            }
            Expr::Slice { .. } => Err(ExcType::SyntaxError.msg("slice outside of a subscript")),
            Expr::IfExp { test, body, orelse } => {
                if self.eval(frame, test)?.is_truthy() {
                    self.eval(frame, body)
                } else {
                    self.eval(frame, orelse)
                }
            }
            Expr::Lambda(def) => self.make_function(frame, def),
            Expr::Comprehension {
                kind,
                elt,
                key,
                generators,
            } => self.eval_comprehension(frame, *kind, elt, key.as_deref(), generators),
        }
    }

    fn eval_all(&mut self, frame: &mut Frame, exprs: &[Expr]) -> RunResult<Vec<Object>> {
        exprs.iter().map(|expr| self.eval(frame, expr)).collect()
    }

    pub(crate) fn make_function(&mut self, frame: &mut Frame, def: &Rc<FunctionDef>) -> RunResult<Object> {
        let defaults = def
            .params
            .iter()
            .filter_map(|p| p.default.as_ref())
            .map(|expr| self.eval(frame, expr))
            .collect::<RunResult<Vec<_>>>()?;
        Ok(Object::Function(Rc::new(Function {
            def: Rc::clone(def),
            defaults,
            closure: Self::closure_for(frame),
        })))
    }

    pub(crate) fn eval_slice_bounds(
        &mut self,
        frame: &mut Frame,
        lower: &Option<Box<Expr>>,
        upper: &Option<Box<Expr>>,
        step: &Option<Box<Expr>>,
    ) -> RunResult<SliceBounds> {
        let mut bound = |expr: &Option<Box<Expr>>| expr.as_deref().map(|e| self.eval(frame, e)).transpose();
        Ok(SliceBounds {
            lower: bound(lower)?,
            upper: bound(upper)?,
            step: bound(step)?,
        })
    }

    fn eval_fstring(&mut self, frame: &mut Frame, parts: &[FStringPart]) -> RunResult<Object> {
        let mut out = String::new();
        for part in parts {
            match part {
                FStringPart::Literal(text) => out.push_str(text),
                FStringPart::Interpolation {
                    expr,
                    conversion,
                    format_spec,
                    debug_text,
                } => {
                    let value = self.eval(frame, expr)?;
                    let conversion = match debug_text {
                        Some(text) => {
                            out.push_str(text);
                            // `{x=}` shows the repr unless told otherwise
                            conversion.or_else(|| format_spec.is_empty().then_some('r'))
                        }
                        None => *conversion,
                    };
                    out.push_str(&format_field(&value, conversion, format_spec)?);
                }
            }
        }
        Ok(Object::from(out))
    }

    fn eval_call(&mut self, frame: &mut Frame, func: &Expr, args: &[CallArg]) -> RunResult<Object> {
        if let Expr::Attribute { value, attr } = func {
            let receiver = self.eval(frame, value)?;
            let args = self.eval_call_args(frame, args)?;
            return self.call_attribute(&receiver, attr, args);
        }
        let callee = self.eval(frame, func)?;
        let args = self.eval_call_args(frame, args)?;
        self.call_object(&callee, args)
    }

    fn eval_call_args(&mut self, frame: &mut Frame, args: &[CallArg]) -> RunResult<ArgValues> {
        let mut values = ArgValues::default();
        for arg in args {
            match arg {
                CallArg::Positional(expr) => values.args.push(self.eval(frame, expr)?),
                CallArg::Unpack(expr) => {
                    let iterable = self.eval(frame, expr)?;
                    values.args.extend(ops::iterate(&iterable)?);
                }
                CallArg::Keyword(name, expr) => {
                    let value = self.eval(frame, expr)?;
                    values.kwargs.push((name.clone(), value));
                }
                CallArg::UnpackMapping(expr) => {
                    let Object::Dict(map) = self.eval(frame, expr)? else {
                        return Err(ExcType::TypeError.msg("argument after ** must be a mapping"));
                    };
                    for (key, value) in map.borrow().iter() {
                        let Object::Str(name) = key else {
                            return Err(ExcType::TypeError.msg("keywords must be strings"));
                        };
                        values.kwargs.push((name.to_string(), value.clone()));
                    }
                }
            }
        }
        Ok(values)
    }

    /// `receiver.attr(args)` without materializing a bound method.
    fn call_attribute(&mut self, receiver: &Object, attr: &str, args: ArgValues) -> RunResult<Object> {
        if let Object::Module(module) = receiver {
            let callee = self.module_attribute(*module, attr)?;
            return self.call_object(&callee, args);
        }
        if has_method(receiver, attr) {
            return self.call_method(receiver, attr, args);
        }
        let callee = self.get_attribute(receiver, attr)?;
        self.call_object(&callee, args)
    }

    pub(crate) fn get_attribute(&self, value: &Object, attr: &str) -> RunResult<Object> {
        match value {
            Object::Module(module) => self.module_attribute(*module, attr),
            Object::Exception(exc) if attr == "args" => Ok(Object::tuple(
                exc.message().map(Object::str).into_iter().collect(),
            )),
            other if has_method(other, attr) => Ok(Object::Method(Rc::new(BoundMethod {
                receiver: other.clone(),
                name: attr.to_owned(),
            }))),
            other => Err(ExcType::AttributeError.msg(format!(
                "'{}' object has no attribute '{attr}'",
                other.type_name()
            ))),
        }
    }

    /// Module attributes, including the ones that depend on the current run.
    pub(crate) fn module_attribute(&self, module: Module, name: &str) -> RunResult<Object> {
        match (module, name) {
            (Module::Sys, "argv") => Ok(Object::list(
                self.streams.argv().iter().map(|arg| Object::str(arg)).collect(),
            )),
            (Module::Sys, "stdout") => Ok(Object::Stream(Stream::Stdout)),
            (Module::Sys, "stderr") => Ok(Object::Stream(Stream::Stderr)),
            _ => module.attribute(name),
        }
    }

    fn eval_comprehension(
        &mut self,
        frame: &mut Frame,
        kind: ComprehensionKind,
        elt: &Expr,
        key: Option<&Expr>,
        generators: &[Generator],
    ) -> RunResult<Object> {
        let Some(first) = generators.first() else {
            return Err(ExcType::SyntaxError.msg("comprehension without a for clause"));
        };
        // the outermost iterable is evaluated in the enclosing scope
        let items = ops::iterate(&self.eval(frame, &first.iter)?)?;
        let mut layer = IndexMap::new();
        for generator in generators {
            declare_target(&generator.target, &mut layer);
        }
        frame.comprehensions.push(layer);
        let mut out = Vec::new();
        let result = self.run_generators(frame, generators, 0, items, elt, key, &mut out);
        frame.comprehensions.pop();
        result?;

        match kind {
            ComprehensionKind::List | ComprehensionKind::Generator => {
                Ok(Object::list(out.into_iter().map(|(_, value)| value).collect()))
            }
            ComprehensionKind::Set => {
                let values: Vec<Object> = out.into_iter().map(|(_, value)| value).collect();
                values.iter().try_for_each(ops::check_hashable)?;
                Ok(Object::set(values))
            }
            ComprehensionKind::Dict => {
                let mut map = IndexMap::with_capacity(out.len());
                for (key, value) in out {
                    let key = key.unwrap_or(Object::None);
                    ops::check_hashable(&key)?;
                    map.insert(key, value);
                }
                Ok(Object::Dict(Rc::new(RefCell::new(map))))
            }
        }
    }

    #[expect(clippy::too_many_arguments)]
    fn run_generators(
        &mut self,
        frame: &mut Frame,
        generators: &[Generator],
        level: usize,
        items: Vec<Object>,
        elt: &Expr,
        key: Option<&Expr>,
        out: &mut Vec<(Option<Object>, Object)>,
    ) -> RunResult<()> {
        let generator = &generators[level];
        'items: for item in items {
            self.assign(frame, &generator.target, item)?;
            for condition in &generator.ifs {
                if !self.eval(frame, condition)?.is_truthy() {
                    continue 'items;
                }
            }
            if let Some(next) = generators.get(level + 1) {
                let nested = ops::iterate(&self.eval(frame, &next.iter)?)?;
                self.run_generators(frame, generators, level + 1, nested, elt, key, out)?;
            } else {
                let key = key.map(|k| self.eval(frame, k)).transpose()?;
                let value = self.eval(frame, elt)?;
                out.push((key, value));
            }
        }
        Ok(())
    }
}

/// Reserves the names bound by a comprehension target in its own scope layer.
fn declare_target(target: &Target, layer: &mut IndexMap<String, Object>) {
    match target {
        Target::Name(name) => {
            layer.insert(name.clone(), Object::None);
        }
        Target::Unpack { targets, .. } => {
            for target in targets {
                declare_target(target, layer);
            }
        }
        Target::Subscript { .. } => {}
    }
}
