//! Type constructors (`int("3")`, `list(x)`, `type(v)`, ...) and type inspection builtins.

use std::{cell::RefCell, rc::Rc};

use indexmap::IndexMap;
use num_bigint::BigInt;
use num_traits::ToPrimitive;

use crate::{
    args::ArgValues,
    exception::{ExcType, RunResult},
    interp::{Machine, format::float_to_bigint, ops},
    object::{Object, Range, str_repr},
    types::Type,
};

impl Machine<'_> {
    /// Calls a type object.
    pub(crate) fn call_type(&mut self, t: Type, args: ArgValues) -> RunResult<Object> {
        match t {
            Type::Bool => Ok(Object::Bool(
                args.get_zero_one_arg("bool")?.is_some_and(|v| v.is_truthy()),
            )),
            Type::Int => construct_int(args),
            Type::Float => match args.get_zero_one_arg("float")? {
                None => Ok(Object::Float(0.0)),
                Some(value) => to_float(&value).map(Object::Float),
            },
            Type::Str => Ok(Object::from(
                args.get_zero_one_arg("str")?.map(|v| v.to_string()).unwrap_or_default(),
            )),
            Type::List => Ok(Object::list(iterate_optional(args.get_zero_one_arg("list")?)?)),
            Type::Tuple => Ok(Object::tuple(iterate_optional(args.get_zero_one_arg("tuple")?)?)),
            Type::Set => {
                let items = iterate_optional(args.get_zero_one_arg("set")?)?;
                items.iter().try_for_each(ops::check_hashable)?;
                Ok(Object::set(items))
            }
            Type::Dict => construct_dict(args),
            Type::Range => construct_range(args),
            Type::Type => {
                let value = args.get_one_arg("type")?;
                Ok(match value {
                    Object::Exception(exc) => Object::ExcType(exc.exc_type()),
                    other => Object::Type(other.type_of()),
                })
            }
            other => Err(ExcType::TypeError.msg(format!("cannot create '{other}' instances"))),
        }
    }
}

fn iterate_optional(value: Option<Object>) -> RunResult<Vec<Object>> {
    value.map_or_else(|| Ok(Vec::new()), |v| ops::iterate(&v))
}

/// `int(x=0)` / `int(text, base=10)`
fn construct_int(mut args: ArgValues) -> RunResult<Object> {
    let base_kwarg = args.take_kwarg("base");
    let (value, base) = args.get_zero_one_two_args("int")?;
    let base = base.or(base_kwarg);
    let Some(value) = value else {
        return Ok(Object::Int(0));
    };
    if let Some(base) = base {
        let Object::Str(text) = &value else {
            return Err(ExcType::TypeError.msg("int() can't convert non-string with explicit base"));
        };
        let radix = base
            .as_i64()
            .and_then(|b| u32::try_from(b).ok())
            .filter(|b| (2..=36).contains(b))
            .ok_or_else(|| ExcType::ValueError.msg("int() base must be >= 2 and <= 36, or 0"))?;
        return parse_int(text, radix);
    }
    match value {
        Object::Int(_) | Object::BigInt(_) => Ok(value),
        Object::Bool(b) => Ok(Object::Int(i64::from(b))),
        Object::Float(f) => float_to_bigint(f).map(Object::from_bigint),
        Object::Str(text) => parse_int(&text, 10),
        other => Err(ExcType::TypeError.msg(format!(
            "int() argument must be a string, a bytes-like object or a real number, not '{}'",
            other.type_name()
        ))),
    }
}

fn parse_int(text: &str, radix: u32) -> RunResult<Object> {
    let invalid = || {
        ExcType::ValueError.msg(format!(
            "invalid literal for int() with base {radix}: {}",
            str_repr(text)
        ))
    };
    let trimmed = text.trim();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    if digits.is_empty() || digits.starts_with('_') || digits.ends_with('_') || digits.contains("__") {
        return Err(invalid());
    }
    let digits = digits.replace('_', "");
    let magnitude = BigInt::parse_bytes(digits.as_bytes(), radix).ok_or_else(invalid)?;
    Ok(Object::from_bigint(if negative { -magnitude } else { magnitude }))
}

pub(crate) fn to_float(value: &Object) -> RunResult<f64> {
    match value {
        Object::Float(f) => Ok(*f),
        Object::Bool(_) | Object::Int(_) => Ok(value.as_f64().unwrap_or_default()),
        Object::BigInt(b) => b
            .to_f64()
            .filter(|f| f.is_finite())
            .ok_or_else(|| ExcType::OverflowError.msg("int too large to convert to float")),
        Object::Str(text) => text.trim().replace('_', "").parse::<f64>().map_err(|_| {
            ExcType::ValueError.msg(format!("could not convert string to float: {}", str_repr(text)))
        }),
        other => Err(ExcType::TypeError.msg(format!(
            "float() argument must be a string or a real number, not '{}'",
            other.type_name()
        ))),
    }
}

/// `dict()`, `dict(mapping)`, `dict(pairs)`, plus keyword entries.
fn construct_dict(args: ArgValues) -> RunResult<Object> {
    let ArgValues { args, kwargs } = args;
    if args.len() > 1 {
        return Err(ExcType::TypeError.msg(format!("dict expected at most 1 argument, got {}", args.len())));
    }
    let mut map = IndexMap::new();
    if let Some(source) = args.into_iter().next() {
        match source {
            Object::Dict(other) => map.extend(other.borrow().iter().map(|(k, v)| (k.clone(), v.clone()))),
            iterable => {
                for (index, pair) in ops::iterate(&iterable)?.into_iter().enumerate() {
                    let items = ops::iterate(&pair).map_err(|_| {
                        ExcType::TypeError.msg(format!(
                            "cannot convert dictionary update sequence element #{index} to a sequence"
                        ))
                    })?;
                    let [key, value] = <[Object; 2]>::try_from(items).map_err(|items| {
                        ExcType::ValueError.msg(format!(
                            "dictionary update sequence element #{index} has length {}; 2 is required",
                            items.len()
                        ))
                    })?;
                    ops::check_hashable(&key)?;
                    map.insert(key, value);
                }
            }
        }
    }
    for (name, value) in kwargs {
        map.insert(Object::from(name), value);
    }
    Ok(Object::Dict(Rc::new(RefCell::new(map))))
}

fn construct_range(args: ArgValues) -> RunResult<Object> {
    let (first, second, third) = args.get_one_two_three_args("range")?;
    let int = |value: Object| {
        value.as_i64().ok_or_else(|| {
            ExcType::TypeError.msg(format!(
                "'{}' object cannot be interpreted as an integer",
                value.type_name()
            ))
        })
    };
    let range = match (second, third) {
        (None, _) => Range {
            start: 0,
            stop: int(first)?,
            step: 1,
        },
        (Some(stop), step) => Range {
            start: int(first)?,
            stop: int(stop)?,
            step: step.map(int).transpose()?.unwrap_or(1),
        },
    };
    if range.step == 0 {
        return Err(ExcType::ValueError.msg("range() arg 3 must not be zero"));
    }
    Ok(Object::Range(range))
}

pub(super) fn builtin_isinstance(args: ArgValues) -> RunResult<Object> {
    let (value, classinfo) = args.get_two_args("isinstance")?;
    is_instance(&value, &classinfo).map(Object::Bool)
}

fn is_instance(value: &Object, classinfo: &Object) -> RunResult<bool> {
    match classinfo {
        Object::Type(t) => Ok(value.type_of().is_subclass_of(*t)),
        Object::ExcType(exc_type) => Ok(matches!(value, Object::Exception(exc) if exc.exc_type().is_subclass_of(*exc_type))),
        Object::Tuple(options) => {
            for option in options.iter() {
                if is_instance(value, option)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        _ => Err(ExcType::TypeError.msg("isinstance() arg 2 must be a type, a tuple of types, or a union")),
    }
}

pub(super) fn builtin_chr(args: ArgValues) -> RunResult<Object> {
    let code = args.get_one_arg("chr")?;
    let Some(code) = code.as_i64() else {
        return Err(ExcType::TypeError.msg(format!(
            "'{}' object cannot be interpreted as an integer",
            code.type_name()
        )));
    };
    u32::try_from(code)
        .ok()
        .and_then(char::from_u32)
        .map(|c| Object::from(c.to_string()))
        .ok_or_else(|| ExcType::ValueError.msg("chr() arg not in range(0x110000)"))
}

pub(super) fn builtin_ord(args: ArgValues) -> RunResult<Object> {
    let value = args.get_one_arg("ord")?;
    let Object::Str(text) = &value else {
        return Err(ExcType::TypeError.msg(format!(
            "ord() expected string of length 1, but {} found",
            value.type_name()
        )));
    };
    let mut chars = text.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(Object::Int(i64::from(u32::from(c)))),
        _ => Err(ExcType::TypeError.msg(format!(
            "ord() expected a character, but string of length {} found",
            text.chars().count()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn int_parsing() {
        let parse = |text: &str| construct_int(ArgValues::one(Object::from(text)));
        assert_eq!(parse(" 42 ").unwrap(), Object::Int(42));
        assert_eq!(parse("-1_000").unwrap(), Object::Int(-1000));
        assert_eq!(
            parse("abc").unwrap_err().to_string(),
            "ValueError: invalid literal for int() with base 10: 'abc'"
        );
        let hex = construct_int(ArgValues::positional(vec![Object::from("ff"), Object::Int(16)]));
        assert_eq!(hex.unwrap(), Object::Int(255));
    }

    #[test]
    fn isinstance_follows_subclasses() {
        assert!(is_instance(&Object::Bool(true), &Object::Type(Type::Int)).unwrap());
        assert!(!is_instance(&Object::Int(1), &Object::Type(Type::Bool)).unwrap());
        let options = Object::tuple(vec![Object::Type(Type::Str), Object::Type(Type::Float)]);
        assert!(is_instance(&Object::Float(1.0), &options).unwrap());
        let exc = Object::from(ExcType::KeyError.msg("k"));
        assert!(is_instance(&exc, &Object::ExcType(ExcType::LookupError)).unwrap());
    }
}
