//! Operators, subscripts and iteration over [`Object`] values.
//!
//! Everything here is a pure function of its operands: nothing calls back into user code,
//! so these never need the interpreter state.

use std::{cell::RefCell, cmp::Ordering, rc::Rc};

use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{Pow, Signed, ToPrimitive, Zero};

use crate::{
    exception::{ExcType, Exception, RunResult},
    expressions::{CmpOperator, Operator, UnaryOperator},
    interp::format::printf_format,
    object::Object,
};

/// Largest exponent accepted for integer powers before raising `OverflowError`.
const MAX_INT_EXPONENT: u32 = 1 << 20;

pub(crate) fn binary_op(left: &Object, op: Operator, right: &Object) -> RunResult<Object> {
    if let Some(result) = numeric_op(left, op, right)? {
        return Ok(result);
    }
    let result = match (op, left, right) {
        (Operator::Add, Object::Str(a), Object::Str(b)) => Some(Object::from(format!("{a}{b}"))),
        (Operator::Add, Object::Str(_), other) => {
            return Err(ExcType::TypeError.msg(format!(
                "can only concatenate str (not \"{}\") to str",
                other.type_name()
            )));
        }
        (Operator::Add, Object::List(a), Object::List(b)) => {
            let mut items = a.borrow().clone();
            items.extend(b.borrow().iter().cloned());
            Some(Object::list(items))
        }
        (Operator::Add, Object::List(_), other) => {
            return Err(ExcType::TypeError.msg(format!(
                "can only concatenate list (not \"{}\") to list",
                other.type_name()
            )));
        }
        (Operator::Add, Object::Tuple(a), Object::Tuple(b)) => {
            Some(Object::Tuple(a.iter().chain(b.iter()).cloned().collect()))
        }
        (Operator::Mult, seq, count) | (Operator::Mult, count, seq)
            if matches!(seq, Object::Str(_) | Object::List(_) | Object::Tuple(_)) && count.as_i64().is_some() =>
        {
            let times = usize::try_from(count.as_i64().unwrap_or(0).max(0)).unwrap_or(0);
            Some(repeat(seq, times))
        }
        (Operator::Mod, Object::Str(template), args) => Some(Object::from(printf_format(template, args)?)),
        (op, Object::Set(a), Object::Set(b)) => {
            let (a, b) = (a.borrow(), b.borrow());
            let items: Option<Vec<Object>> = match op {
                Operator::BitOr => Some(a.union(&b).cloned().collect()),
                Operator::BitAnd => Some(a.intersection(&b).cloned().collect()),
                Operator::Sub => Some(a.difference(&b).cloned().collect()),
                Operator::BitXor => Some(a.symmetric_difference(&b).cloned().collect()),
                _ => None,
            };
            items.map(Object::set)
        }
        (Operator::BitOr, Object::Dict(a), Object::Dict(b)) => {
            let mut merged = a.borrow().clone();
            merged.extend(b.borrow().iter().map(|(k, v)| (k.clone(), v.clone())));
            Some(Object::Dict(Rc::new(RefCell::new(merged))))
        }
        _ => None,
    };
    result.ok_or_else(|| unsupported_operands(op.symbol(), left, right))
}

fn unsupported_operands(symbol: &str, left: &Object, right: &Object) -> Exception {
    ExcType::TypeError.msg(format!(
        "unsupported operand type(s) for {symbol}: '{}' and '{}'",
        left.type_name(),
        right.type_name()
    ))
}

fn repeat(seq: &Object, times: usize) -> Object {
    match seq {
        Object::Str(s) => Object::from(s.repeat(times)),
        Object::List(items) => {
            let items = items.borrow();
            Object::list(items.iter().cycle().take(items.len() * times).cloned().collect())
        }
        Object::Tuple(items) => Object::Tuple(items.iter().cycle().take(items.len() * times).cloned().collect()),
        other => other.clone(),
    }
}

fn is_number(value: &Object) -> bool {
    matches!(
        value,
        Object::Bool(_) | Object::Int(_) | Object::BigInt(_) | Object::Float(_)
    )
}

/// Arithmetic between numbers; `Ok(None)` when either operand is not a number.
fn numeric_op(left: &Object, op: Operator, right: &Object) -> RunResult<Option<Object>> {
    if !is_number(left) || !is_number(right) {
        return Ok(None);
    }
    if matches!(left, Object::Float(_)) || matches!(right, Object::Float(_)) {
        let (a, b) = (float_operand(left)?, float_operand(right)?);
        return float_op(a, op, b, left, right).map(Some);
    }
    if let (Some(a), Some(b)) = (left.as_i64(), right.as_i64())
        && let Some(result) = small_int_op(a, op, b)?
    {
        return Ok(Some(result));
    }
    match (left.as_bigint(), right.as_bigint()) {
        (Some(a), Some(b)) => big_int_op(&a, op, &b, left, right).map(Some),
        _ => Ok(None),
    }
}

fn float_operand(value: &Object) -> RunResult<f64> {
    value
        .as_f64()
        .ok_or_else(|| ExcType::OverflowError.msg("int too large to convert to float"))
}

/// Fast path for `i64` operands; `Ok(None)` means the result needs a big integer.
fn small_int_op(a: i64, op: Operator, b: i64) -> RunResult<Option<Object>> {
    let result = match op {
        Operator::Add => a.checked_add(b).map(Object::Int),
        Operator::Sub => a.checked_sub(b).map(Object::Int),
        Operator::Mult => a.checked_mul(b).map(Object::Int),
        Operator::Div => {
            if b == 0 {
                return Err(ExcType::ZeroDivisionError.msg("division by zero"));
            }
            Some(Object::Float(a as f64 / b as f64))
        }
        Operator::FloorDiv => {
            if b == 0 {
                return Err(ExcType::ZeroDivisionError.msg("integer division or modulo by zero"));
            }
            a.checked_div(b).map(|_| Object::Int(a.div_floor(&b)))
        }
        Operator::Mod => {
            if b == 0 {
                return Err(ExcType::ZeroDivisionError.msg("integer modulo by zero"));
            }
            a.checked_rem(b).map(|_| Object::Int(a.mod_floor(&b)))
        }
        Operator::Pow => {
            if b < 0 {
                if a == 0 {
                    return Err(ExcType::ZeroDivisionError.msg("0.0 cannot be raised to a negative power"));
                }
                Some(Object::Float((a as f64).powf(b as f64)))
            } else {
                u32::try_from(b).ok().and_then(|b| a.checked_pow(b)).map(Object::Int)
            }
        }
        Operator::LShift => {
            if b < 0 {
                return Err(ExcType::ValueError.msg("negative shift count"));
            }
            u32::try_from(b)
                .ok()
                .filter(|shift| *shift < 63)
                .and_then(|shift| a.checked_mul(1i64 << shift))
                .map(Object::Int)
        }
        Operator::RShift => {
            if b < 0 {
                return Err(ExcType::ValueError.msg("negative shift count"));
            }
            Some(Object::Int(a >> b.min(63)))
        }
        Operator::BitOr => Some(Object::Int(a | b)),
        Operator::BitXor => Some(Object::Int(a ^ b)),
        Operator::BitAnd => Some(Object::Int(a & b)),
    };
    Ok(result)
}

fn big_int_op(a: &BigInt, op: Operator, b: &BigInt, left: &Object, right: &Object) -> RunResult<Object> {
    let result = match op {
        Operator::Add => a + b,
        Operator::Sub => a - b,
        Operator::Mult => a * b,
        Operator::Div => {
            if b.is_zero() {
                return Err(ExcType::ZeroDivisionError.msg("division by zero"));
            }
            let (x, y) = (float_operand(left)?, float_operand(right)?);
            return Ok(Object::Float(x / y));
        }
        Operator::FloorDiv => {
            if b.is_zero() {
                return Err(ExcType::ZeroDivisionError.msg("integer division or modulo by zero"));
            }
            a.div_floor(b)
        }
        Operator::Mod => {
            if b.is_zero() {
                return Err(ExcType::ZeroDivisionError.msg("integer modulo by zero"));
            }
            a.mod_floor(b)
        }
        Operator::Pow => {
            if b.is_negative() {
                let (x, y) = (float_operand(left)?, float_operand(right)?);
                return Ok(Object::Float(x.powf(y)));
            }
            let exponent = b
                .to_u32()
                .filter(|e| *e <= MAX_INT_EXPONENT)
                .ok_or_else(|| ExcType::OverflowError.msg("exponent too large"))?;
            Pow::pow(a, exponent)
        }
        Operator::LShift => {
            let shift = b
                .to_usize()
                .ok_or_else(|| ExcType::OverflowError.msg("shift count too large"))?;
            a << shift
        }
        Operator::RShift => {
            if b.is_negative() {
                return Err(ExcType::ValueError.msg("negative shift count"));
            }
            a >> b.to_usize().unwrap_or(usize::MAX)
        }
        Operator::BitOr => a | b,
        Operator::BitXor => a ^ b,
        Operator::BitAnd => a & b,
    };
    Ok(Object::from_bigint(result))
}

fn float_op(a: f64, op: Operator, b: f64, left: &Object, right: &Object) -> RunResult<Object> {
    let result = match op {
        Operator::Add => a + b,
        Operator::Sub => a - b,
        Operator::Mult => a * b,
        Operator::Div => {
            if b == 0.0 {
                return Err(ExcType::ZeroDivisionError.msg("float division by zero"));
            }
            a / b
        }
        Operator::FloorDiv => {
            if b == 0.0 {
                return Err(ExcType::ZeroDivisionError.msg("float floor division by zero"));
            }
            float_divmod(a, b).0
        }
        Operator::Mod => {
            if b == 0.0 {
                return Err(ExcType::ZeroDivisionError.msg("float modulo"));
            }
            float_divmod(a, b).1
        }
        Operator::Pow => {
            if a == 0.0 && b < 0.0 {
                return Err(ExcType::ZeroDivisionError.msg("0.0 cannot be raised to a negative power"));
            }
            a.powf(b)
        }
        _ => return Err(unsupported_operands(op.symbol(), left, right)),
    };
    Ok(Object::Float(result))
}

/// Floored division and modulo for floats, following CPython's `float_divmod`.
pub(crate) fn float_divmod(a: f64, b: f64) -> (f64, f64) {
    let mut modulo = a % b;
    let mut div = (a - modulo) / b;
    if modulo == 0.0 {
        modulo = 0.0_f64.copysign(b);
    } else if (b < 0.0) != (modulo < 0.0) {
        modulo += b;
        div -= 1.0;
    }
    let floordiv = if div == 0.0 {
        0.0_f64.copysign(a / b)
    } else {
        let mut floordiv = div.floor();
        if div - floordiv > 0.5 {
            floordiv += 1.0;
        }
        floordiv
    };
    (floordiv, modulo)
}

pub(crate) fn unary_op(op: UnaryOperator, value: &Object) -> RunResult<Object> {
    let result = match (op, value) {
        (UnaryOperator::Not, v) => Some(Object::Bool(!v.is_truthy())),
        (UnaryOperator::Neg, Object::Float(f)) => Some(Object::Float(-f)),
        (UnaryOperator::Neg, Object::BigInt(b)) => Some(Object::from_bigint(-b)),
        (UnaryOperator::Neg, v) => v.as_i64().map(|i| match i.checked_neg() {
            Some(n) => Object::Int(n),
            None => Object::from_bigint(-BigInt::from(i)),
        }),
        (UnaryOperator::Pos, Object::Float(f)) => Some(Object::Float(*f)),
        (UnaryOperator::Pos, Object::BigInt(b)) => Some(Object::BigInt(b.clone())),
        (UnaryOperator::Pos, v) => v.as_i64().map(Object::Int),
        (UnaryOperator::Invert, Object::BigInt(b)) => Some(Object::from_bigint(!b)),
        (UnaryOperator::Invert, v) => v.as_i64().map(|i| Object::Int(!i)),
    };
    result.ok_or_else(|| {
        let symbol = match op {
            UnaryOperator::Neg => "-",
            UnaryOperator::Pos => "+",
            UnaryOperator::Invert => "~",
            UnaryOperator::Not => "not",
        };
        ExcType::TypeError.msg(format!("bad operand type for unary {symbol}: '{}'", value.type_name()))
    })
}

pub(crate) fn compare(left: &Object, op: CmpOperator, right: &Object) -> RunResult<bool> {
    let ordering = |check: fn(Ordering) -> bool| -> RunResult<bool> {
        match left.py_cmp(right) {
            Some(ordering) => Ok(check(ordering)),
            // NaN compares false against everything
            None if matches!(left, Object::Float(f) if f.is_nan()) || matches!(right, Object::Float(f) if f.is_nan()) => {
                Ok(false)
            }
            None => Err(ExcType::TypeError.msg(format!(
                "'{}' not supported between instances of '{}' and '{}'",
                op.symbol(),
                left.type_name(),
                right.type_name()
            ))),
        }
    };
    match op {
        CmpOperator::Eq => Ok(left == right),
        CmpOperator::NotEq => Ok(left != right),
        CmpOperator::Lt => ordering(Ordering::is_lt),
        CmpOperator::LtE => ordering(Ordering::is_le),
        CmpOperator::Gt => ordering(Ordering::is_gt),
        CmpOperator::GtE => ordering(Ordering::is_ge),
        CmpOperator::Is => Ok(left.is_same(right)),
        CmpOperator::IsNot => Ok(!left.is_same(right)),
        CmpOperator::In => contains(right, left),
        CmpOperator::NotIn => contains(right, left).map(|found| !found),
    }
}

/// Python `item in container`.
pub(crate) fn contains(container: &Object, item: &Object) -> RunResult<bool> {
    match container {
        Object::Str(haystack) => match item {
            Object::Str(needle) => Ok(haystack.contains(&**needle)),
            other => Err(ExcType::TypeError.msg(format!(
                "'in <string>' requires string as left operand, not {}",
                other.type_name()
            ))),
        },
        Object::List(items) => Ok(items.borrow().iter().any(|x| x == item)),
        Object::Tuple(items) => Ok(items.iter().any(|x| x == item)),
        Object::Dict(map) => {
            check_hashable(item)?;
            Ok(map.borrow().contains_key(item))
        }
        Object::Set(set) => {
            check_hashable(item)?;
            Ok(set.borrow().contains(item))
        }
        Object::Range(range) => Ok(item.as_i64().is_some_and(|i| {
            let in_bounds = if range.step > 0 {
                range.start <= i && i < range.stop
            } else {
                range.stop < i && i <= range.start
            };
            in_bounds && (i - range.start) % range.step == 0
        })),
        other => Err(ExcType::TypeError.msg(format!(
            "argument of type '{}' is not iterable",
            other.type_name()
        ))),
    }
}

pub(crate) fn check_hashable(value: &Object) -> RunResult<()> {
    if value.is_hashable() {
        Ok(())
    } else {
        Err(ExcType::TypeError.msg(format!("unhashable type: '{}'", value.type_name())))
    }
}

/// Materializes the items produced by iterating over `value`.
pub(crate) fn iterate(value: &Object) -> RunResult<Vec<Object>> {
    match value {
        Object::Str(s) => Ok(s.chars().map(|c| Object::from(c.to_string())).collect()),
        Object::List(items) => Ok(items.borrow().clone()),
        Object::Tuple(items) => Ok(items.to_vec()),
        Object::Dict(map) => Ok(map.borrow().keys().cloned().collect()),
        Object::Set(set) => Ok(set.borrow().iter().cloned().collect()),
        Object::Range(range) => Ok(range.iter().map(Object::Int).collect()),
        other => Err(ExcType::TypeError.msg(format!("'{}' object is not iterable", other.type_name()))),
    }
}

/// Converts a subscript to an `i64` index.
pub(crate) fn to_index(value: &Object, container: &Object) -> RunResult<i64> {
    match value {
        Object::Int(_) | Object::Bool(_) => Ok(value.as_i64().unwrap_or_default()),
        Object::BigInt(_) => Err(ExcType::IndexError.msg("cannot fit 'int' into an index-sized integer")),
        other => Err(ExcType::TypeError.msg(format!(
            "{} indices must be integers or slices, not {}",
            container.type_name(),
            other.type_name()
        ))),
    }
}

/// Resolves a possibly negative index against `len`.
pub(crate) fn normalize_index(index: i64, len: usize) -> Option<usize> {
    let len = i64::try_from(len).ok()?;
    let index = if index < 0 { index + len } else { index };
    (0..len).contains(&index).then(|| usize::try_from(index).ok()).flatten()
}

fn index_error(container: &Object) -> Exception {
    ExcType::IndexError.msg(format!("{} index out of range", container.type_name()))
}

/// Python `container[index]` for non-slice subscripts.
pub(crate) fn get_item(container: &Object, index: &Object) -> RunResult<Object> {
    match container {
        Object::List(items) => {
            let i = to_index(index, container)?;
            let items = items.borrow();
            normalize_index(i, items.len())
                .map(|i| items[i].clone())
                .ok_or_else(|| index_error(container))
        }
        Object::Tuple(items) => {
            let i = to_index(index, container)?;
            normalize_index(i, items.len())
                .map(|i| items[i].clone())
                .ok_or_else(|| index_error(container))
        }
        Object::Str(s) => {
            let i = to_index(index, container)?;
            let count = s.chars().count();
            normalize_index(i, count)
                .and_then(|i| s.chars().nth(i))
                .map(|c| Object::from(c.to_string()))
                .ok_or_else(|| ExcType::IndexError.msg("string index out of range"))
        }
        Object::Range(range) => {
            let i = to_index(index, container)?;
            normalize_index(i, range.len())
                .and_then(|i| i64::try_from(i).ok())
                .map(|i| Object::Int(range.start + range.step * i))
                .ok_or_else(|| ExcType::IndexError.msg("range object index out of range"))
        }
        Object::Dict(map) => {
            check_hashable(index)?;
            map.borrow()
                .get(index)
                .cloned()
                .ok_or_else(|| ExcType::KeyError.msg(index.py_repr()))
        }
        other => Err(ExcType::TypeError.msg(format!(
            "'{}' object is not subscriptable",
            other.type_name()
        ))),
    }
}

/// Python `container[index] = value`.
pub(crate) fn set_item(container: &Object, index: Object, value: Object) -> RunResult<()> {
    match container {
        Object::List(items) => {
            let i = to_index(&index, container)?;
            let mut items = items.borrow_mut();
            let len = items.len();
            let slot = normalize_index(i, len)
                .ok_or_else(|| ExcType::IndexError.msg("list assignment index out of range"))?;
            items[slot] = value;
            Ok(())
        }
        Object::Dict(map) => {
            check_hashable(&index)?;
            map.borrow_mut().insert(index, value);
            Ok(())
        }
        other => Err(ExcType::TypeError.msg(format!(
            "'{}' object does not support item assignment",
            other.type_name()
        ))),
    }
}

/// Python `del container[index]`.
pub(crate) fn del_item(container: &Object, index: &Object) -> RunResult<()> {
    match container {
        Object::List(items) => {
            let i = to_index(index, container)?;
            let mut items = items.borrow_mut();
            let len = items.len();
            let slot = normalize_index(i, len)
                .ok_or_else(|| ExcType::IndexError.msg("list assignment index out of range"))?;
            items.remove(slot);
            Ok(())
        }
        Object::Dict(map) => {
            check_hashable(index)?;
            map.borrow_mut()
                .shift_remove(index)
                .map(|_| ())
                .ok_or_else(|| ExcType::KeyError.msg(index.py_repr()))
        }
        other => Err(ExcType::TypeError.msg(format!(
            "'{}' object doesn't support item deletion",
            other.type_name()
        ))),
    }
}

/// Bounds of a slice expression, already evaluated.
#[derive(Debug, Default, Clone)]
pub(crate) struct SliceBounds {
    pub lower: Option<Object>,
    pub upper: Option<Object>,
    pub step: Option<Object>,
}

impl SliceBounds {
    fn bound(value: Option<&Object>) -> RunResult<Option<i64>> {
        match value {
            None | Some(Object::None) => Ok(None),
            Some(v @ (Object::Int(_) | Object::Bool(_))) => Ok(v.as_i64()),
            Some(Object::BigInt(b)) => Ok(Some(if b.is_negative() { i64::MIN } else { i64::MAX })),
            Some(other) => Err(ExcType::TypeError.msg(format!(
                "slice indices must be integers or None, not {}",
                other.type_name()
            ))),
        }
    }

    /// Indices selected from a sequence of length `len`, following `slice.indices()`.
    pub fn indices(&self, len: usize) -> RunResult<Vec<usize>> {
        let step = Self::bound(self.step.as_ref())?.unwrap_or(1);
        if step == 0 {
            return Err(ExcType::ValueError.msg("slice step cannot be zero"));
        }
        let len = i64::try_from(len).unwrap_or(i64::MAX);
        let clamp = |value: Option<i64>, default: i64| -> i64 {
            match value {
                None => default,
                Some(v) if v < 0 => {
                    let v = v.saturating_add(len);
                    if v < 0 { if step < 0 { -1 } else { 0 } } else { v }
                }
                Some(v) if v >= len => {
                    if step < 0 {
                        len - 1
                    } else {
                        len
                    }
                }
                Some(v) => v,
            }
        };
        let (start, stop) = if step > 0 {
            (
                clamp(Self::bound(self.lower.as_ref())?, 0),
                clamp(Self::bound(self.upper.as_ref())?, len),
            )
        } else {
            (
                clamp(Self::bound(self.lower.as_ref())?, len - 1),
                clamp(Self::bound(self.upper.as_ref())?, -1),
            )
        };
        let mut indices = Vec::new();
        let mut i = start;
        while (step > 0 && i < stop) || (step < 0 && i > stop) {
            indices.push(usize::try_from(i).unwrap_or_default());
            i += step;
        }
        Ok(indices)
    }
}

/// Python `container[lower:upper:step]`.
pub(crate) fn get_slice(container: &Object, bounds: &SliceBounds) -> RunResult<Object> {
    match container {
        Object::List(items) => {
            let items = items.borrow();
            let selected = bounds.indices(items.len())?;
            Ok(Object::list(selected.into_iter().map(|i| items[i].clone()).collect()))
        }
        Object::Tuple(items) => {
            let selected = bounds.indices(items.len())?;
            Ok(Object::tuple(selected.into_iter().map(|i| items[i].clone()).collect()))
        }
        Object::Str(s) => {
            let chars: Vec<char> = s.chars().collect();
            let selected = bounds.indices(chars.len())?;
            Ok(Object::from(selected.into_iter().map(|i| chars[i]).collect::<String>()))
        }
        Object::Range(range) => {
            let values: Vec<i64> = range.iter().collect();
            let selected = bounds.indices(values.len())?;
            Ok(Object::list(selected.into_iter().map(|i| Object::Int(values[i])).collect()))
        }
        other => Err(ExcType::TypeError.msg(format!(
            "'{}' object is not subscriptable",
            other.type_name()
        ))),
    }
}

/// Python `items[lower:upper:step] = value` for lists.
pub(crate) fn set_slice(container: &Object, bounds: &SliceBounds, value: &Object) -> RunResult<()> {
    let Object::List(items) = container else {
        return Err(ExcType::TypeError.msg(format!(
            "'{}' object does not support item assignment",
            container.type_name()
        )));
    };
    let replacement = iterate(value)?;
    let mut items = items.borrow_mut();
    let step = SliceBounds::bound(bounds.step.as_ref())?.unwrap_or(1);
    if step == 1 {
        let len = i64::try_from(items.len()).unwrap_or(i64::MAX);
        let clamp = |value: Option<i64>, default: i64| match value {
            None => default,
            Some(v) if v < 0 => (v.saturating_add(len)).max(0),
            Some(v) => v.min(len),
        };
        let start = clamp(SliceBounds::bound(bounds.lower.as_ref())?, 0);
        let end = clamp(SliceBounds::bound(bounds.upper.as_ref())?, len).max(start);
        let (start, end) = (
            usize::try_from(start).unwrap_or_default(),
            usize::try_from(end).unwrap_or_default(),
        );
        items.splice(start..end, replacement);
        return Ok(());
    }
    let selected = bounds.indices(items.len())?;
    if selected.len() != replacement.len() {
        return Err(ExcType::ValueError.msg(format!(
            "attempt to assign sequence of size {} to extended slice of size {}",
            replacement.len(),
            selected.len()
        )));
    }
    for (i, value) in selected.into_iter().zip(replacement) {
        items[i] = value;
    }
    Ok(())
}

/// Python `del items[lower:upper:step]` for lists.
pub(crate) fn del_slice(container: &Object, bounds: &SliceBounds) -> RunResult<()> {
    let Object::List(items) = container else {
        return Err(ExcType::TypeError.msg(format!(
            "'{}' object doesn't support item deletion",
            container.type_name()
        )));
    };
    let mut items = items.borrow_mut();
    let mut selected = bounds.indices(items.len())?;
    selected.sort_unstable();
    for i in selected.into_iter().rev() {
        items.remove(i);
    }
    Ok(())
}
