//! Builtins that consume iterables: `len`, `sorted`, `sum`, `min`/`max`, `zip`, ...
//!
//! Iterators are materialized eagerly, so `reversed`, `enumerate`, `zip`, `map` and
//! `filter` return lists.

use std::cmp::Ordering;

use crate::{
    args::ArgValues,
    builtins::Builtin,
    exception::{ExcType, Exception, RunResult},
    expressions::Operator,
    interp::{Machine, ops},
    object::Object,
};

pub(super) fn builtin_len(args: ArgValues) -> RunResult<Object> {
    let value = args.get_one_arg("len")?;
    let len = match &value {
        Object::Str(s) => s.chars().count(),
        Object::List(items) => items.borrow().len(),
        Object::Tuple(items) => items.len(),
        Object::Dict(map) => map.borrow().len(),
        Object::Set(set) => set.borrow().len(),
        Object::Range(range) => range.len(),
        other => {
            return Err(ExcType::TypeError.msg(format!(
                "object of type '{}' has no len()",
                other.type_name()
            )));
        }
    };
    Ok(Object::Int(i64::try_from(len).unwrap_or(i64::MAX)))
}

pub(super) fn builtin_reversed(args: ArgValues) -> RunResult<Object> {
    let value = args.get_one_arg("reversed")?;
    if matches!(value, Object::Set(_)) {
        return Err(ExcType::TypeError.msg("'set' object is not reversible"));
    }
    let mut items = ops::iterate(&value)?;
    items.reverse();
    Ok(Object::list(items))
}

/// `sum(iterable, /, start=0)`
pub(super) fn builtin_sum(mut args: ArgValues) -> RunResult<Object> {
    let start_kwarg = args.take_kwarg("start");
    let (iterable, start) = args.get_one_two_args("sum")?;
    let start = start.or(start_kwarg).unwrap_or(Object::Int(0));
    if matches!(start, Object::Str(_)) {
        return Err(ExcType::TypeError.msg("sum() can't sum strings [use ''.join(seq) instead]"));
    }
    ops::iterate(&iterable)?
        .iter()
        .try_fold(start, |total, item| ops::binary_op(&total, Operator::Add, item))
}

pub(super) fn builtin_enumerate(mut args: ArgValues) -> RunResult<Object> {
    let start_kwarg = args.take_kwarg("start");
    let (iterable, start) = args.get_one_two_args("enumerate")?;
    let start = match start.or(start_kwarg) {
        None => 0,
        Some(value) => value.as_i64().ok_or_else(|| {
            ExcType::TypeError.msg(format!(
                "'{}' object cannot be interpreted as an integer",
                value.type_name()
            ))
        })?,
    };
    let pairs = ops::iterate(&iterable)?
        .into_iter()
        .zip(start..)
        .map(|(item, i)| Object::tuple(vec![Object::Int(i), item]))
        .collect();
    Ok(Object::list(pairs))
}

pub(super) fn builtin_zip(args: ArgValues) -> RunResult<Object> {
    args.check_no_kwargs("zip")?;
    let columns = args
        .args
        .iter()
        .map(ops::iterate)
        .collect::<RunResult<Vec<_>>>()?;
    let rows = columns.iter().map(Vec::len).min().unwrap_or(0);
    let zipped = (0..rows)
        .map(|row| Object::tuple(columns.iter().map(|column| column[row].clone()).collect()))
        .collect();
    Ok(Object::list(zipped))
}

pub(super) fn builtin_any(args: ArgValues) -> RunResult<Object> {
    let iterable = args.get_one_arg("any")?;
    Ok(Object::Bool(ops::iterate(&iterable)?.iter().any(Object::is_truthy)))
}

pub(super) fn builtin_all(args: ArgValues) -> RunResult<Object> {
    let iterable = args.get_one_arg("all")?;
    Ok(Object::Bool(ops::iterate(&iterable)?.iter().all(Object::is_truthy)))
}

fn not_supported(symbol: &str, left: &Object, right: &Object) -> Exception {
    ExcType::TypeError.msg(format!(
        "'{symbol}' not supported between instances of '{}' and '{}'",
        left.type_name(),
        right.type_name()
    ))
}

/// `key=None` means no key function.
fn key_function(value: Option<Object>) -> Option<Object> {
    value.filter(|key| !matches!(key, Object::None))
}

impl Machine<'_> {
    /// `sorted(iterable, /, *, key=None, reverse=False)`
    pub(super) fn builtin_sorted(&mut self, mut args: ArgValues) -> RunResult<Object> {
        let key = key_function(args.take_kwarg("key"));
        let reverse = args.take_kwarg("reverse").is_some_and(|r| r.is_truthy());
        let iterable = args.get_one_arg("sorted")?;
        let items = ops::iterate(&iterable)?;
        self.sort_values(items, key.as_ref(), reverse).map(Object::list)
    }

    /// Stable sort shared by `sorted()` and `list.sort()`.
    pub(crate) fn sort_values(
        &mut self,
        items: Vec<Object>,
        key: Option<&Object>,
        reverse: bool,
    ) -> RunResult<Vec<Object>> {
        let keys = match key {
            Some(key) => items
                .iter()
                .map(|item| self.call_object(key, ArgValues::one(item.clone())))
                .collect::<RunResult<Vec<_>>>()?,
            None => items.clone(),
        };

        let mut order: Vec<usize> = (0..items.len()).collect();
        let mut error = None;
        order.sort_by(|&a, &b| {
            let (left, right) = if reverse { (&keys[b], &keys[a]) } else { (&keys[a], &keys[b]) };
            left.py_cmp(right).unwrap_or_else(|| {
                error.get_or_insert_with(|| not_supported("<", &keys[a], &keys[b]));
                Ordering::Equal
            })
        });
        if let Some(error) = error {
            return Err(error);
        }

        let mut slots: Vec<Option<Object>> = items.into_iter().map(Some).collect();
        Ok(order.into_iter().filter_map(|i| slots[i].take()).collect())
    }

    /// `min`/`max` over one iterable or several positional values, with `key` and `default`.
    pub(super) fn builtin_min_max(&mut self, builtin: Builtin, mut args: ArgValues) -> RunResult<Object> {
        let name: &'static str = builtin.into();
        let key = key_function(args.take_kwarg("key"));
        let default = args.take_kwarg("default");
        args.check_no_kwargs(name)?;

        let candidates = match args.args.len() {
            0 => {
                return Err(ExcType::TypeError.msg(format!("{name} expected at least 1 argument, got 0")));
            }
            1 => ops::iterate(&args.args[0])?,
            _ if default.is_some() => {
                return Err(ExcType::TypeError.msg(format!(
                    "Cannot specify a default for {name}() with multiple positional arguments"
                )));
            }
            _ => args.args,
        };

        let wanted = if builtin == Builtin::Max {
            Ordering::Greater
        } else {
            Ordering::Less
        };
        let symbol = if builtin == Builtin::Max { ">" } else { "<" };
        let mut best: Option<(Object, Object)> = None;
        for candidate in candidates {
            let candidate_key = match &key {
                Some(key) => self.call_object(key, ArgValues::one(candidate.clone()))?,
                None => candidate.clone(),
            };
            best = match best {
                None => Some((candidate_key, candidate)),
                Some((best_key, best_value)) => {
                    let ordering = candidate_key
                        .py_cmp(&best_key)
                        .ok_or_else(|| not_supported(symbol, &candidate_key, &best_key))?;
                    if ordering == wanted {
                        Some((candidate_key, candidate))
                    } else {
                        Some((best_key, best_value))
                    }
                }
            };
        }
        match (best, default) {
            (Some((_, value)), _) => Ok(value),
            (None, Some(default)) => Ok(default),
            (None, None) => Err(ExcType::ValueError.msg(format!("{name}() iterable argument is empty"))),
        }
    }

    /// `map(function, *iterables)`, stopping at the shortest iterable.
    pub(super) fn builtin_map(&mut self, args: ArgValues) -> RunResult<Object> {
        args.check_no_kwargs("map")?;
        let mut positional = args.args.into_iter();
        let (Some(function), Some(first)) = (positional.next(), positional.next()) else {
            return Err(ExcType::TypeError.msg("map() must have at least two arguments."));
        };
        let columns = std::iter::once(first)
            .chain(positional)
            .map(|iterable| ops::iterate(&iterable))
            .collect::<RunResult<Vec<_>>>()?;
        let rows = columns.iter().map(Vec::len).min().unwrap_or(0);
        let mut mapped = Vec::with_capacity(rows);
        for row in 0..rows {
            let call_args = columns.iter().map(|column| column[row].clone()).collect();
            mapped.push(self.call_object(&function, ArgValues::positional(call_args))?);
        }
        Ok(Object::list(mapped))
    }

    /// `filter(function, iterable)`; a `None` function keeps truthy items.
    pub(super) fn builtin_filter(&mut self, args: ArgValues) -> RunResult<Object> {
        let (function, iterable) = args.get_two_args("filter")?;
        let mut kept = Vec::new();
        for item in ops::iterate(&iterable)? {
            let keep = match &function {
                Object::None => item.is_truthy(),
                function => self.call_object(function, ArgValues::one(item.clone()))?.is_truthy(),
            };
            if keep {
                kept.push(item);
            }
        }
        Ok(Object::list(kept))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn ints(values: &[i64]) -> Object {
        Object::list(values.iter().copied().map(Object::Int).collect())
    }

    #[test]
    fn sum_with_start() {
        let total = builtin_sum(ArgValues::positional(vec![ints(&[1, 2, 3]), Object::Int(10)])).unwrap();
        assert_eq!(total, Object::Int(16));

        let err = builtin_sum(ArgValues::positional(vec![ints(&[]), Object::from("")])).unwrap_err();
        assert_eq!(err.exc_type(), ExcType::TypeError);
    }

    #[test]
    fn zip_stops_at_shortest() {
        let zipped = builtin_zip(ArgValues::positional(vec![ints(&[1, 2, 3]), Object::from("ab")])).unwrap();
        assert_eq!(zipped.py_repr(), "[(1, 'a'), (2, 'b')]");
    }

    #[test]
    fn len_of_unsized_value() {
        let err = builtin_len(ArgValues::one(Object::Int(3))).unwrap_err();
        assert_eq!(err.to_string(), "TypeError: object of type 'int' has no len()");
    }
}
