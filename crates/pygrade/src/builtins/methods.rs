//! Methods of the builtin types: `str`, `list`, `dict`, `set` and the `sys` streams.

use std::borrow::Cow;

use crate::{
    args::ArgValues,
    exception::{ExcType, Exception, RunResult},
    interp::{Machine, format::str_format, ops},
    io::Stream,
    object::{DictRef, ListRef, Object, SetRef},
};

const STR_METHODS: &[&str] = &[
    "upper",
    "lower",
    "capitalize",
    "title",
    "strip",
    "lstrip",
    "rstrip",
    "split",
    "splitlines",
    "join",
    "replace",
    "startswith",
    "endswith",
    "find",
    "index",
    "count",
    "isdigit",
    "isalpha",
    "isalnum",
    "isspace",
    "isupper",
    "islower",
    "zfill",
    "format",
];

const LIST_METHODS: &[&str] = &[
    "append", "extend", "insert", "pop", "remove", "index", "count", "sort", "reverse", "copy", "clear",
];

const DICT_METHODS: &[&str] = &[
    "keys",
    "values",
    "items",
    "get",
    "pop",
    "update",
    "setdefault",
    "copy",
    "clear",
];

const SET_METHODS: &[&str] = &["add", "remove", "discard", "pop", "copy", "clear"];

const STREAM_METHODS: &[&str] = &["write", "flush"];

/// Whether `receiver.name` is a method the interpreter implements.
pub(crate) fn has_method(receiver: &Object, name: &str) -> bool {
    let table = match receiver {
        Object::Str(_) => STR_METHODS,
        Object::List(_) => LIST_METHODS,
        Object::Dict(_) => DICT_METHODS,
        Object::Set(_) => SET_METHODS,
        Object::Stream(_) => STREAM_METHODS,
        _ => return false,
    };
    table.contains(&name)
}

fn no_attribute(receiver: &Object, name: &str) -> Exception {
    ExcType::AttributeError.msg(format!(
        "'{}' object has no attribute '{name}'",
        receiver.type_name()
    ))
}

fn expect_str<'a>(value: &'a Object, method: &str) -> RunResult<&'a str> {
    match value {
        Object::Str(s) => Ok(s),
        other => Err(ExcType::TypeError.msg(format!(
            "{method}() argument must be str, not {}",
            other.type_name()
        ))),
    }
}

fn count_to_object(n: usize) -> Object {
    Object::Int(i64::try_from(n).unwrap_or(i64::MAX))
}

impl Machine<'_> {
    pub(crate) fn call_method(&mut self, receiver: &Object, name: &str, args: ArgValues) -> RunResult<Object> {
        match receiver {
            Object::Str(s) => str_method(s, name, args),
            Object::List(items) => self.list_method(items, name, args),
            Object::Dict(map) => dict_method(map, name, args),
            Object::Set(set) => set_method(set, name, args),
            Object::Stream(stream) => self.stream_method(*stream, name, args),
            other => Err(no_attribute(other, name)),
        }
    }

    fn stream_method(&mut self, stream: Stream, name: &str, args: ArgValues) -> RunResult<Object> {
        match name {
            "write" => {
                let value = args.get_one_arg("write")?;
                let text = expect_str(&value, "write")?;
                self.streams.writer(stream).stdout_write(Cow::Borrowed(text));
                Ok(count_to_object(text.chars().count()))
            }
            "flush" => args.check_zero_args("flush").map(|()| Object::None),
            _ => Err(no_attribute(&Object::Stream(stream), name)),
        }
    }

    fn list_method(&mut self, items: &ListRef, name: &str, mut args: ArgValues) -> RunResult<Object> {
        match name {
            "append" => {
                let value = args.get_one_arg("append")?;
                items.borrow_mut().push(value);
                Ok(Object::None)
            }
            "extend" => {
                let iterable = args.get_one_arg("extend")?;
                let values = ops::iterate(&iterable)?;
                items.borrow_mut().extend(values);
                Ok(Object::None)
            }
            "insert" => {
                let (index, value) = args.get_two_args("insert")?;
                let index = ops::to_index(&index, &Object::List(items.clone()))?;
                let mut items = items.borrow_mut();
                let len = i64::try_from(items.len()).unwrap_or(i64::MAX);
                let position = if index < 0 { (index + len).max(0) } else { index.min(len) };
                items.insert(usize::try_from(position).unwrap_or_default(), value);
                Ok(Object::None)
            }
            "pop" => {
                let index = args.get_zero_one_arg("pop")?;
                let index = match index {
                    Some(index) => ops::to_index(&index, &Object::List(items.clone()))?,
                    None => -1,
                };
                let mut items = items.borrow_mut();
                if items.is_empty() {
                    return Err(ExcType::IndexError.msg("pop from empty list"));
                }
                let slot = ops::normalize_index(index, items.len())
                    .ok_or_else(|| ExcType::IndexError.msg("pop index out of range"))?;
                Ok(items.remove(slot))
            }
            "remove" => {
                let value = args.get_one_arg("remove")?;
                let mut items = items.borrow_mut();
                let position = items
                    .iter()
                    .position(|item| *item == value)
                    .ok_or_else(|| ExcType::ValueError.msg("list.remove(x): x not in list"))?;
                items.remove(position);
                Ok(Object::None)
            }
            "index" => {
                let value = args.get_one_arg("index")?;
                items
                    .borrow()
                    .iter()
                    .position(|item| *item == value)
                    .map(count_to_object)
                    .ok_or_else(|| ExcType::ValueError.msg(format!("{} is not in list", value.py_repr())))
            }
            "count" => {
                let value = args.get_one_arg("count")?;
                Ok(count_to_object(items.borrow().iter().filter(|item| **item == value).count()))
            }
            "sort" => {
                let key = args.take_kwarg("key").filter(|k| !matches!(k, Object::None));
                let reverse = args.take_kwarg("reverse").is_some_and(|r| r.is_truthy());
                args.check_zero_args("sort")?;
                // the key function may inspect the list, so it must not stay borrowed
                let current = items.borrow().clone();
                let sorted = self.sort_values(current, key.as_ref(), reverse)?;
                *items.borrow_mut() = sorted;
                Ok(Object::None)
            }
            "reverse" => {
                args.check_zero_args("reverse")?;
                items.borrow_mut().reverse();
                Ok(Object::None)
            }
            "copy" => {
                args.check_zero_args("copy")?;
                Ok(Object::list(items.borrow().clone()))
            }
            "clear" => {
                args.check_zero_args("clear")?;
                items.borrow_mut().clear();
                Ok(Object::None)
            }
            _ => Err(no_attribute(&Object::List(items.clone()), name)),
        }
    }
}

fn str_method(s: &str, name: &str, args: ArgValues) -> RunResult<Object> {
    match name {
        "upper" => args.check_zero_args("upper").map(|()| Object::from(s.to_uppercase())),
        "lower" => args.check_zero_args("lower").map(|()| Object::from(s.to_lowercase())),
        "capitalize" => {
            args.check_zero_args("capitalize")?;
            let mut chars = s.chars();
            Ok(Object::from(match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }))
        }
        "title" => {
            args.check_zero_args("title")?;
            let mut out = String::with_capacity(s.len());
            let mut previous_cased = false;
            for c in s.chars() {
                if previous_cased {
                    out.extend(c.to_lowercase());
                } else {
                    out.extend(c.to_uppercase());
                }
                previous_cased = c.is_alphabetic();
            }
            Ok(Object::from(out))
        }
        "strip" | "lstrip" | "rstrip" => {
            let chars = args.get_zero_one_arg(name)?;
            let chars: Option<Vec<char>> = match &chars {
                None | Some(Object::None) => None,
                Some(value) => Some(expect_str(value, name)?.chars().collect()),
            };
            let matches = |c: char| chars.as_ref().map_or(c.is_whitespace(), |set| set.contains(&c));
            let stripped = match name {
                "lstrip" => s.trim_start_matches(matches),
                "rstrip" => s.trim_end_matches(matches),
                _ => s.trim_matches(matches),
            };
            Ok(Object::str(stripped))
        }
        "split" => split(s, args),
        "splitlines" => {
            args.check_zero_args("splitlines")?;
            Ok(Object::list(s.lines().map(Object::str).collect()))
        }
        "join" => {
            let iterable = args.get_one_arg("join")?;
            let mut parts = Vec::new();
            for (i, item) in ops::iterate(&iterable)?.iter().enumerate() {
                match item {
                    Object::Str(part) => parts.push(part.to_string()),
                    other => {
                        return Err(ExcType::TypeError.msg(format!(
                            "sequence item {i}: expected str instance, {} found",
                            other.type_name()
                        )));
                    }
                }
            }
            Ok(Object::from(parts.join(s)))
        }
        "replace" => {
            let (old, new, count) = args.get_one_two_three_args("replace")?;
            let Some(new) = new else {
                return Err(ExcType::TypeError.msg("replace expected at least 2 arguments, got 1"));
            };
            let (old, new) = (expect_str(&old, "replace")?, expect_str(&new, "replace")?);
            let count = count.and_then(|c| c.as_i64()).unwrap_or(-1);
            Ok(Object::from(match usize::try_from(count) {
                Ok(count) => s.replacen(old, new, count),
                Err(_) => s.replace(old, new),
            }))
        }
        "startswith" | "endswith" => {
            let prefix = args.get_one_arg(name)?;
            let candidates = match &prefix {
                Object::Tuple(options) => options.to_vec(),
                other => vec![other.clone()],
            };
            for candidate in &candidates {
                let candidate = expect_str(candidate, name)?;
                let found = if name == "startswith" {
                    s.starts_with(candidate)
                } else {
                    s.ends_with(candidate)
                };
                if found {
                    return Ok(Object::Bool(true));
                }
            }
            Ok(Object::Bool(false))
        }
        "find" | "index" => {
            let needle = args.get_one_arg(name)?;
            let needle = expect_str(&needle, name)?;
            match s.find(needle) {
                Some(byte) => Ok(count_to_object(s[..byte].chars().count())),
                None if name == "find" => Ok(Object::Int(-1)),
                None => Err(ExcType::ValueError.msg("substring not found")),
            }
        }
        "count" => {
            let needle = args.get_one_arg("count")?;
            let needle = expect_str(&needle, "count")?;
            let count = if needle.is_empty() {
                s.chars().count() + 1
            } else {
                s.matches(needle).count()
            };
            Ok(count_to_object(count))
        }
        "isdigit" => predicate(s, args, name, |c| c.is_ascii_digit()),
        "isalpha" => predicate(s, args, name, char::is_alphabetic),
        "isalnum" => predicate(s, args, name, char::is_alphanumeric),
        "isspace" => predicate(s, args, name, char::is_whitespace),
        "isupper" | "islower" => {
            args.check_zero_args(name)?;
            let mut cased = s.chars().filter(|c| c.is_lowercase() || c.is_uppercase()).peekable();
            let has_cased = cased.peek().is_some();
            let all = if name == "isupper" {
                cased.all(char::is_uppercase)
            } else {
                cased.all(char::is_lowercase)
            };
            Ok(Object::Bool(has_cased && all))
        }
        "zfill" => {
            let width = args.get_one_arg("zfill")?;
            let width = usize::try_from(width.as_i64().unwrap_or_default()).unwrap_or_default();
            let len = s.chars().count();
            if width <= len {
                return Ok(Object::str(s));
            }
            let (sign, digits) = match s.chars().next() {
                Some(c @ ('+' | '-')) => (Some(c), &s[1..]),
                _ => (None, s),
            };
            let mut out: String = sign.into_iter().collect();
            out.extend(std::iter::repeat_n('0', width - len));
            out.push_str(digits);
            Ok(Object::from(out))
        }
        "format" => {
            let ArgValues { args, kwargs } = args;
            str_format(s, &args, &kwargs).map(Object::from)
        }
        _ => Err(no_attribute(&Object::str(s), name)),
    }
}

fn predicate(s: &str, args: ArgValues, name: &str, check: impl Fn(char) -> bool) -> RunResult<Object> {
    args.check_zero_args(name)?;
    Ok(Object::Bool(!s.is_empty() && s.chars().all(check)))
}

/// `str.split(sep=None, maxsplit=-1)`
fn split(s: &str, mut args: ArgValues) -> RunResult<Object> {
    let sep_kwarg = args.take_kwarg("sep");
    let maxsplit_kwarg = args.take_kwarg("maxsplit");
    let (sep, maxsplit) = args.get_zero_one_two_args("split")?;
    let sep = sep.or(sep_kwarg).filter(|sep| !matches!(sep, Object::None));
    let maxsplit = maxsplit
        .or(maxsplit_kwarg)
        .and_then(|m| m.as_i64())
        .and_then(|m| usize::try_from(m).ok());

    let parts: Vec<Object> = match &sep {
        None => split_whitespace(s, maxsplit).into_iter().map(Object::str).collect(),
        Some(sep) => {
            let sep = expect_str(sep, "split")?;
            if sep.is_empty() {
                return Err(ExcType::ValueError.msg("empty separator"));
            }
            match maxsplit {
                Some(max) => s.splitn(max + 1, sep).map(Object::str).collect(),
                None => s.split(sep).map(Object::str).collect(),
            }
        }
    };
    Ok(Object::list(parts))
}

/// Splits on runs of whitespace; after `maxsplit` splits the remainder is kept whole.
fn split_whitespace(s: &str, maxsplit: Option<usize>) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut rest = s.trim_start();
    while !rest.is_empty() {
        if maxsplit == Some(parts.len()) {
            parts.push(rest);
            break;
        }
        let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        parts.push(&rest[..end]);
        rest = rest[end..].trim_start();
    }
    parts
}

fn dict_method(map: &DictRef, name: &str, mut args: ArgValues) -> RunResult<Object> {
    match name {
        "keys" => {
            args.check_zero_args("keys")?;
            Ok(Object::list(map.borrow().keys().cloned().collect()))
        }
        "values" => {
            args.check_zero_args("values")?;
            Ok(Object::list(map.borrow().values().cloned().collect()))
        }
        "items" => {
            args.check_zero_args("items")?;
            Ok(Object::list(
                map.borrow()
                    .iter()
                    .map(|(k, v)| Object::tuple(vec![k.clone(), v.clone()]))
                    .collect(),
            ))
        }
        "get" => {
            let (key, default) = args.get_one_two_args("get")?;
            ops::check_hashable(&key)?;
            Ok(map.borrow().get(&key).cloned().or(default).unwrap_or(Object::None))
        }
        "pop" => {
            let (key, default) = args.get_one_two_args("pop")?;
            ops::check_hashable(&key)?;
            let removed = map.borrow_mut().shift_remove(&key);
            removed
                .or(default)
                .ok_or_else(|| ExcType::KeyError.msg(key.py_repr()))
        }
        "setdefault" => {
            let (key, default) = args.get_one_two_args("setdefault")?;
            ops::check_hashable(&key)?;
            let mut map = map.borrow_mut();
            Ok(map.entry(key).or_insert_with(|| default.unwrap_or(Object::None)).clone())
        }
        "update" => {
            let kwargs = std::mem::take(&mut args.kwargs);
            let source = args.get_zero_one_arg("update")?;
            let mut entries = Vec::new();
            match source {
                None => {}
                Some(Object::Dict(other)) => {
                    entries.extend(other.borrow().iter().map(|(k, v)| (k.clone(), v.clone())));
                }
                Some(iterable) => {
                    for pair in ops::iterate(&iterable)? {
                        let [key, value] = <[Object; 2]>::try_from(ops::iterate(&pair)?).map_err(|_| {
                            ExcType::ValueError.msg("dictionary update sequence element has length other than 2")
                        })?;
                        ops::check_hashable(&key)?;
                        entries.push((key, value));
                    }
                }
            }
            entries.extend(kwargs.into_iter().map(|(k, v)| (Object::from(k), v)));
            map.borrow_mut().extend(entries);
            Ok(Object::None)
        }
        "copy" => {
            args.check_zero_args("copy")?;
            Ok(Object::dict(
                map.borrow().iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            ))
        }
        "clear" => {
            args.check_zero_args("clear")?;
            map.borrow_mut().clear();
            Ok(Object::None)
        }
        _ => Err(no_attribute(&Object::Dict(map.clone()), name)),
    }
}

fn set_method(set: &SetRef, name: &str, args: ArgValues) -> RunResult<Object> {
    match name {
        "add" => {
            let value = args.get_one_arg("add")?;
            ops::check_hashable(&value)?;
            set.borrow_mut().insert(value);
            Ok(Object::None)
        }
        "remove" => {
            let value = args.get_one_arg("remove")?;
            ops::check_hashable(&value)?;
            if set.borrow_mut().shift_remove(&value) {
                Ok(Object::None)
            } else {
                Err(ExcType::KeyError.msg(value.py_repr()))
            }
        }
        "discard" => {
            let value = args.get_one_arg("discard")?;
            ops::check_hashable(&value)?;
            set.borrow_mut().shift_remove(&value);
            Ok(Object::None)
        }
        "pop" => {
            args.check_zero_args("pop")?;
            set.borrow_mut()
                .shift_remove_index(0)
                .ok_or_else(|| ExcType::KeyError.msg("'pop from an empty set'"))
        }
        "copy" => {
            args.check_zero_args("copy")?;
            Ok(Object::set(set.borrow().iter().cloned().collect()))
        }
        "clear" => {
            args.check_zero_args("clear")?;
            set.borrow_mut().clear();
            Ok(Object::None)
        }
        _ => Err(no_attribute(&Object::Set(set.clone()), name)),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn call_str(s: &str, name: &str, args: Vec<Object>) -> Object {
        str_method(s, name, ArgValues::positional(args)).unwrap()
    }

    #[test]
    fn split_variants() {
        assert_eq!(call_str("  a b  c ", "split", vec![]).py_repr(), "['a', 'b', 'c']");
        assert_eq!(
            call_str("a b  c ", "split", vec![Object::None, Object::Int(1)]).py_repr(),
            "['a', 'b  c ']"
        );
        assert_eq!(call_str("1,2,,3", "split", vec![Object::from(",")]).py_repr(), "['1', '2', '', '3']");
    }

    #[test]
    fn strip_and_join() {
        assert_eq!(call_str("xxhixx", "strip", vec![Object::from("x")]), Object::from("hi"));
        let items = Object::list(vec![Object::from("a"), Object::from("b")]);
        assert_eq!(call_str("-", "join", vec![items]), Object::from("a-b"));
        let err = str_method("-", "join", ArgValues::one(Object::list(vec![Object::Int(1)]))).unwrap_err();
        assert_eq!(err.exc_type(), ExcType::TypeError);
    }

    #[test]
    fn dict_pop_missing_key() {
        let Object::Dict(map) = Object::dict(vec![(Object::from("a"), Object::Int(1))]) else {
            unreachable!()
        };
        let err = dict_method(&map, "pop", ArgValues::one(Object::from("b"))).unwrap_err();
        assert_eq!(err.to_string(), "KeyError: 'b'");
        let default = dict_method(&map, "pop", ArgValues::positional(vec![Object::from("b"), Object::Int(0)]));
        assert_eq!(default.unwrap(), Object::Int(0));
    }

    #[test]
    fn method_table() {
        assert!(has_method(&Object::from("x"), "upper"));
        assert!(has_method(&Object::list(vec![]), "append"));
        assert!(!has_method(&Object::Int(1), "append"));
    }
}
