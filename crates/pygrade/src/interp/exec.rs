use crate::{
    exception::{ExcType, Exception, RunResult},
    expressions::{ExceptHandler, Expr, Node, Operator, Stmt, Target},
    interp::{
        Flow, Frame, Machine,
        ops::{self, SliceBounds},
    },
    modules::Module,
    object::Object,
};

impl Machine<'_> {
    pub(crate) fn exec_block(&mut self, frame: &mut Frame, body: &[Stmt]) -> RunResult<Flow> {
        for stmt in body {
            match self.exec_stmt(frame, stmt) {
                Ok(Flow::Normal) => {}
                Ok(flow) => return Ok(flow),
                Err(exc) => return Err(exc.at_line(stmt.line)),
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_stmt(&mut self, frame: &mut Frame, stmt: &Stmt) -> RunResult<Flow> {
        match &stmt.node {
            Node::Expr(expr) => {
                self.eval(frame, expr)?;
            }
            Node::Assign { targets, value } => {
                let value = self.eval(frame, value)?;
                for target in targets {
                    self.assign(frame, target, value.clone())?;
                }
            }
            Node::AugAssign { target, op, value } => self.exec_aug_assign(frame, target, *op, value)?,
            Node::FunctionDef(def) => {
                let function = self.make_function(frame, def)?;
                self.store_name(frame, &def.name, function);
            }
            Node::Return(value) => {
                let value = match value {
                    Some(expr) => self.eval(frame, expr)?,
                    None => Object::None,
                };
                return Ok(Flow::Return(value));
            }
            Node::If { test, body, orelse } => {
                let branch = if self.eval(frame, test)?.is_truthy() { body } else { orelse };
                return self.exec_block(frame, branch);
            }
            Node::While { test, body, orelse } => {
                while self.eval(frame, test)?.is_truthy() {
                    match self.exec_block(frame, body)? {
                        Flow::Break => return Ok(Flow::Normal),
                        Flow::Normal | Flow::Continue => {}
                        flow @ Flow::Return(_) => return Ok(flow),
                    }
                }
                return self.exec_block(frame, orelse);
            }
            Node::For {
                target,
                iter,
                body,
                orelse,
            } => {
                let iterable = self.eval(frame, iter)?;
                return self.exec_for(frame, target, &iterable, body, orelse);
            }
            Node::Break => return Ok(Flow::Break),
            Node::Continue => return Ok(Flow::Continue),
            Node::Pass => {}
            Node::Raise(exc) => return Err(self.exec_raise(frame, exc.as_ref())?),
            Node::Try {
                body,
                handlers,
                orelse,
                finalbody,
            } => return self.exec_try(frame, body, handlers, orelse, finalbody),
            Node::Assert { test, msg } => {
                if !self.eval(frame, test)?.is_truthy() {
                    let exc = match msg {
                        Some(msg) => ExcType::AssertionError.msg(self.eval(frame, msg)?.to_string()),
                        None => ExcType::AssertionError.bare(),
                    };
                    return Err(exc);
                }
            }
            Node::Import(modules) => {
                for (name, binding) in modules {
                    let module = Module::import(name)?;
                    self.store_name(frame, binding, Object::Module(module));
                }
            }
            Node::ImportFrom { module, names } => {
                let module = Module::import(module)?;
                for (name, binding) in names {
                    let value = self.module_attribute(module, name).map_err(|_| {
                        ExcType::ImportError.msg(format!("cannot import name '{name}' from '{module}'"))
                    })?;
                    self.store_name(frame, binding, value);
                }
            }
            Node::Delete(targets) => {
                for target in targets {
                    self.delete(frame, target)?;
                }
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_for(
        &mut self,
        frame: &mut Frame,
        target: &Target,
        iterable: &Object,
        body: &[Stmt],
        orelse: &[Stmt],
    ) -> RunResult<Flow> {
        // lists are walked by index so that appends made by the body are visited, and
        // ranges lazily so that large ranges are never materialized
        let mut index = 0usize;
        let mut items: Option<std::vec::IntoIter<Object>> = match iterable {
            Object::List(_) | Object::Range(_) => None,
            other => Some(ops::iterate(other)?.into_iter()),
        };
        loop {
            let next = match (iterable, items.as_mut()) {
                (_, Some(items)) => items.next(),
                (Object::List(list), None) => list.borrow().get(index).cloned(),
                (Object::Range(range), None) => (index < range.len())
                    .then(|| Object::Int(range.start + range.step * i64::try_from(index).unwrap_or(i64::MAX))),
                _ => None,
            };
            let Some(item) = next else {
                break;
            };
            index += 1;
            self.assign(frame, target, item)?;
            match self.exec_block(frame, body)? {
                Flow::Break => return Ok(Flow::Normal),
                Flow::Normal | Flow::Continue => {}
                flow @ Flow::Return(_) => return Ok(flow),
            }
        }
        self.exec_block(frame, orelse)
    }

    fn exec_raise(&mut self, frame: &mut Frame, exc: Option<&Expr>) -> RunResult<Exception> {
        let Some(expr) = exc else {
            return Ok(self
                .handling
                .last()
                .cloned()
                .unwrap_or_else(|| ExcType::RuntimeError.msg("No active exception to reraise")));
        };
        match self.eval(frame, expr)? {
            Object::Exception(exc) => Ok((*exc).clone()),
            Object::ExcType(exc_type) => Ok(exc_type.bare()),
            other => Ok(ExcType::TypeError.msg(format!(
                "exceptions must derive from BaseException, not {}",
                other.type_name()
            ))),
        }
    }

    fn exec_try(
        &mut self,
        frame: &mut Frame,
        body: &[Stmt],
        handlers: &[ExceptHandler],
        orelse: &[Stmt],
        finalbody: &[Stmt],
    ) -> RunResult<Flow> {
        let outcome = match self.exec_block(frame, body) {
            Ok(Flow::Normal) => self.exec_block(frame, orelse),
            Ok(flow) => Ok(flow),
            Err(exc) if exc.is_halt() => return Err(exc),
            Err(exc) => self.handle_exception(frame, exc, handlers),
        };
        if finalbody.is_empty() || outcome.as_ref().is_err_and(Exception::is_halt) {
            return outcome;
        }
        match self.exec_block(frame, finalbody)? {
            Flow::Normal => outcome,
            // control flow in `finally` replaces the pending outcome
            flow => Ok(flow),
        }
    }

    fn handle_exception(&mut self, frame: &mut Frame, exc: Exception, handlers: &[ExceptHandler]) -> RunResult<Flow> {
        for handler in handlers {
            if !self.handler_matches(frame, handler, &exc)? {
                continue;
            }
            if let Some(name) = &handler.name {
                self.store_name(frame, name, Object::from(exc.clone()));
            }
            self.handling.push(exc);
            let result = self.exec_block(frame, &handler.body);
            self.handling.pop();
            if let Some(name) = &handler.name {
                // Python unbinds the name when the handler ends
                let _ = self.delete_name(frame, name);
            }
            return result;
        }
        Err(exc)
    }

    fn handler_matches(&mut self, frame: &mut Frame, handler: &ExceptHandler, exc: &Exception) -> RunResult<bool> {
        let Some(expr) = &handler.exc_type else {
            return Ok(true);
        };
        let matches_one = |value: &Object| -> RunResult<bool> {
            match value {
                Object::ExcType(handler_type) => Ok(exc.exc_type().is_subclass_of(*handler_type)),
                other => Err(ExcType::TypeError.msg(format!(
                    "catching classes that do not inherit from BaseException is not allowed, got {}",
                    other.type_name()
                ))),
            }
        };
        match self.eval(frame, expr)? {
            Object::Tuple(types) => {
                for t in types.iter() {
                    if matches_one(t)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            other => matches_one(&other),
        }
    }

    fn exec_aug_assign(&mut self, frame: &mut Frame, target: &Target, op: Operator, value: &Expr) -> RunResult<()> {
        match target {
            Target::Name(name) => {
                let current = self.load_name(frame, name)?;
                let value = self.eval(frame, value)?;
                let updated = self.aug_value(&current, op, &value)?;
                self.store_name(frame, name, updated);
            }
            Target::Subscript { value: container, index } => {
                let container = self.eval(frame, container)?;
                if let Expr::Slice { lower, upper, step } = index {
                    let bounds = self.eval_slice_bounds(frame, lower, upper, step)?;
                    let current = ops::get_slice(&container, &bounds)?;
                    let value = self.eval(frame, value)?;
                    let updated = self.aug_value(&current, op, &value)?;
                    ops::set_slice(&container, &bounds, &updated)?;
                } else {
                    let index = self.eval(frame, index)?;
                    let current = ops::get_item(&container, &index)?;
                    let value = self.eval(frame, value)?;
                    let updated = self.aug_value(&current, op, &value)?;
                    ops::set_item(&container, index, updated)?;
                }
            }
            Target::Unpack { .. } => {
                return Err(ExcType::SyntaxError.msg("illegal expression for augmented assignment"));
            }
        }
        Ok(())
    }

    /// `list += iterable` extends in place; every other combination rebinds.
    fn aug_value(&mut self, current: &Object, op: Operator, value: &Object) -> RunResult<Object> {
        if let (Operator::Add, Object::List(items)) = (op, current) {
            let extra = ops::iterate(value)?;
            items.borrow_mut().extend(extra);
            return Ok(current.clone());
        }
        ops::binary_op(current, op, value)
    }

    pub(crate) fn assign(&mut self, frame: &mut Frame, target: &Target, value: Object) -> RunResult<()> {
        match target {
            Target::Name(name) => {
                self.store_name(frame, name, value);
                Ok(())
            }
            Target::Unpack { targets, starred } => {
                let items = ops::iterate(&value).map_err(|_| {
                    ExcType::TypeError.msg(format!(
                        "cannot unpack non-iterable {} object",
                        value.type_name()
                    ))
                })?;
                let values = unpack_values(items, targets.len(), *starred)?;
                for (target, value) in targets.iter().zip(values) {
                    self.assign(frame, target, value)?;
                }
                Ok(())
            }
            Target::Subscript { value: container, index } => {
                let container = self.eval(frame, container)?;
                if let Expr::Slice { lower, upper, step } = index {
                    let bounds = self.eval_slice_bounds(frame, lower, upper, step)?;
                    ops::set_slice(&container, &bounds, &value)
                } else {
                    let index = self.eval(frame, index)?;
                    ops::set_item(&container, index, value)
                }
            }
        }
    }

    fn delete(&mut self, frame: &mut Frame, target: &Target) -> RunResult<()> {
        match target {
            Target::Name(name) => self.delete_name(frame, name),
            Target::Unpack { targets, .. } => {
                for target in targets {
                    self.delete(frame, target)?;
                }
                Ok(())
            }
            Target::Subscript { value, index } => {
                let container = self.eval(frame, value)?;
                if let Expr::Slice { lower, upper, step } = index {
                    let bounds: SliceBounds = self.eval_slice_bounds(frame, lower, upper, step)?;
                    ops::del_slice(&container, &bounds)
                } else {
                    let index = self.eval(frame, index)?;
                    ops::del_item(&container, &index)
                }
            }
        }
    }
}

/// Splits `items` over `count` targets, collecting the surplus into a list at `starred`.
fn unpack_values(mut items: Vec<Object>, count: usize, starred: Option<usize>) -> RunResult<Vec<Object>> {
    match starred {
        None => {
            if items.len() == count {
                Ok(items)
            } else if items.len() > count {
                Err(ExcType::ValueError.msg(format!("too many values to unpack (expected {count})")))
            } else {
                Err(ExcType::ValueError.msg(format!(
                    "not enough values to unpack (expected {count}, got {})",
                    items.len()
                )))
            }
        }
        Some(star) => {
            let fixed = count - 1;
            if items.len() < fixed {
                return Err(ExcType::ValueError.msg(format!(
                    "not enough values to unpack (expected at least {fixed}, got {})",
                    items.len()
                )));
            }
            let after = fixed - star;
            let tail = items.split_off(items.len() - after);
            let middle = items.split_off(star);
            items.push(Object::list(middle));
            items.extend(tail);
            Ok(items)
        }
    }
}
