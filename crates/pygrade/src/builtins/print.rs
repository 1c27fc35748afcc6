//! `print()` and `input()`, the two builtins that touch the run's streams.

use std::borrow::Cow;

use crate::{
    args::ArgValues,
    exception::{ExcType, RunResult},
    interp::Machine,
    io::Stream,
    object::Object,
};

impl Machine<'_> {
    /// `print(*values, sep=' ', end='\n', file=sys.stdout, flush=False)`
    pub(super) fn builtin_print(&mut self, mut args: ArgValues) -> RunResult<Object> {
        let sep = text_kwarg(args.take_kwarg("sep"), "sep", " ")?;
        let end = text_kwarg(args.take_kwarg("end"), "end", "\n")?;
        let stream = match args.take_kwarg("file") {
            None | Some(Object::None) => Stream::Stdout,
            Some(Object::Stream(stream)) => stream,
            Some(other) => {
                return Err(ExcType::AttributeError.msg(format!(
                    "'{}' object has no attribute 'write'",
                    other.type_name()
                )));
            }
        };
        args.take_kwarg("flush");
        args.check_no_kwargs("print")?;

        let writer = self.streams.writer(stream);
        for (i, value) in args.args.iter().enumerate() {
            if i > 0 {
                writer.stdout_write(Cow::Borrowed(&sep));
            }
            match value {
                Object::Str(s) => writer.stdout_write(Cow::Borrowed(s)),
                other => writer.stdout_write(Cow::Owned(other.to_string())),
            }
        }
        writer.stdout_write(Cow::Owned(end));
        Ok(Object::None)
    }

    /// `input(prompt='')`
    pub(super) fn builtin_input(&mut self, args: ArgValues) -> RunResult<Object> {
        let prompt = args.get_zero_one_arg("input")?.map(|p| p.to_string()).unwrap_or_default();
        self.streams.read_input(&prompt).map(Object::from)
    }
}

/// `sep`/`end` accept a string or `None` for the default.
fn text_kwarg(value: Option<Object>, name: &str, default: &str) -> RunResult<String> {
    match value {
        None | Some(Object::None) => Ok(default.to_owned()),
        Some(Object::Str(s)) => Ok(s.to_string()),
        Some(other) => Err(ExcType::TypeError.msg(format!(
            "{name} must be None or a string, not {}",
            other.type_name()
        ))),
    }
}
