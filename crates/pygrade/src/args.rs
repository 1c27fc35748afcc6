use crate::{
    exception::{ExcType, Exception, RunResult},
    object::Object,
};

/// Arguments of one call into a builtin, method or user function.
///
/// Keyword arguments keep their call-site order so that error messages name the first
/// offending keyword.
#[derive(Debug, Default, Clone)]
pub(crate) struct ArgValues {
    pub args: Vec<Object>,
    pub kwargs: Vec<(String, Object)>,
}

impl ArgValues {
    pub fn new(args: Vec<Object>, kwargs: Vec<(String, Object)>) -> Self {
        Self { args, kwargs }
    }

    pub fn positional(args: Vec<Object>) -> Self {
        Self {
            args,
            kwargs: Vec::new(),
        }
    }

    pub fn one(arg: Object) -> Self {
        Self::positional(vec![arg])
    }

    pub fn len(&self) -> usize {
        self.args.len() + self.kwargs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty() && self.kwargs.is_empty()
    }

    /// Removes and returns the keyword argument `name`, if it was passed.
    pub fn take_kwarg(&mut self, name: &str) -> Option<Object> {
        let position = self.kwargs.iter().position(|(k, _)| k == name)?;
        Some(self.kwargs.remove(position).1)
    }

    /// Rejects any keyword argument that was not consumed with [`ArgValues::take_kwarg`].
    pub fn check_no_kwargs(&self, name: &str) -> RunResult<()> {
        match self.kwargs.first() {
            Some((key, _)) => Err(ExcType::TypeError.msg(format!(
                "{name}() got an unexpected keyword argument '{key}'"
            ))),
            None => Ok(()),
        }
    }

    /// Checks that zero arguments were passed.
    pub fn check_zero_args(self, name: &str) -> RunResult<()> {
        self.check_no_kwargs(name)?;
        if self.args.is_empty() {
            Ok(())
        } else {
            Err(ExcType::TypeError.msg(format!(
                "{name}() takes no arguments ({} given)",
                self.args.len()
            )))
        }
    }

    /// Checks that exactly one positional argument was passed.
    pub fn get_one_arg(self, name: &str) -> RunResult<Object> {
        self.check_no_kwargs(name)?;
        let count = self.args.len();
        let mut args = self.args.into_iter();
        match (args.next(), args.next()) {
            (Some(a), None) => Ok(a),
            _ => Err(ExcType::TypeError.msg(format!(
                "{name}() takes exactly one argument ({count} given)"
            ))),
        }
    }

    /// Checks that exactly two positional arguments were passed.
    pub fn get_two_args(self, name: &str) -> RunResult<(Object, Object)> {
        self.check_no_kwargs(name)?;
        let count = self.args.len();
        let mut args = self.args.into_iter();
        match (args.next(), args.next(), args.next()) {
            (Some(a), Some(b), None) => Ok((a, b)),
            _ => Err(ExcType::TypeError.msg(format!("{name} expected 2 arguments, got {count}"))),
        }
    }

    /// Checks that zero or one positional argument was passed.
    pub fn get_zero_one_arg(self, name: &str) -> RunResult<Option<Object>> {
        self.check_no_kwargs(name)?;
        let count = self.args.len();
        let mut args = self.args.into_iter();
        match (args.next(), args.next()) {
            (a, None) => Ok(a),
            _ => Err(at_most(name, 1, count)),
        }
    }

    /// Checks that one or two positional arguments were passed.
    pub fn get_one_two_args(self, name: &str) -> RunResult<(Object, Option<Object>)> {
        self.check_no_kwargs(name)?;
        let count = self.args.len();
        let mut args = self.args.into_iter();
        match (args.next(), args.next(), args.next()) {
            (Some(a), b, None) => Ok((a, b)),
            (None, ..) => Err(at_least(name, 1, count)),
            _ => Err(at_most(name, 2, count)),
        }
    }

    /// Checks that at most two positional arguments were passed.
    pub fn get_zero_one_two_args(self, name: &str) -> RunResult<(Option<Object>, Option<Object>)> {
        self.check_no_kwargs(name)?;
        let count = self.args.len();
        let mut args = self.args.into_iter();
        match (args.next(), args.next(), args.next()) {
            (a, b, None) => Ok((a, b)),
            _ => Err(at_most(name, 2, count)),
        }
    }

    /// Checks that one to three positional arguments were passed.
    pub fn get_one_two_three_args(self, name: &str) -> RunResult<(Object, Option<Object>, Option<Object>)> {
        self.check_no_kwargs(name)?;
        let count = self.args.len();
        let mut args = self.args.into_iter();
        match (args.next(), args.next(), args.next(), args.next()) {
            (Some(a), b, c, None) => Ok((a, b, c)),
            (None, ..) => Err(at_least(name, 1, count)),
            _ => Err(at_most(name, 3, count)),
        }
    }
}

fn at_most(name: &str, max: usize, count: usize) -> Exception {
    let plural = if max == 1 { "" } else { "s" };
    ExcType::TypeError.msg(format!("{name} expected at most {max} argument{plural}, got {count}"))
}

fn at_least(name: &str, min: usize, count: usize) -> Exception {
    let plural = if min == 1 { "" } else { "s" };
    ExcType::TypeError.msg(format!("{name} expected at least {min} argument{plural}, got {count}"))
}
