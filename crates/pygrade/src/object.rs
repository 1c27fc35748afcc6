use std::{
    cell::RefCell,
    cmp::Ordering,
    fmt::{self, Write as _},
    hash::{Hash, Hasher},
    rc::Rc,
};

use ahash::AHashMap;
use indexmap::{IndexMap, IndexSet};
use num_bigint::BigInt;
use num_traits::{ToPrimitive, Zero};

use crate::{
    builtins::Builtin,
    exception::{ExcType, Exception},
    function::Function,
    io::Stream,
    modules::Module,
    types::Type,
};

pub type ListRef = Rc<RefCell<Vec<Object>>>;
pub type DictRef = Rc<RefCell<IndexMap<Object, Object>>>;
pub type SetRef = Rc<RefCell<IndexSet<Object>>>;

/// A `range(start, stop, step)` value; `step` is never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Range {
    pub start: i64,
    pub stop: i64,
    pub step: i64,
}

impl Range {
    #[must_use]
    pub fn len(&self) -> usize {
        let span = if self.step > 0 {
            i128::from(self.stop) - i128::from(self.start)
        } else {
            i128::from(self.start) - i128::from(self.stop)
        };
        if span <= 0 {
            return 0;
        }
        let step = i128::from(self.step).abs();
        usize::try_from((span + step - 1) / step).unwrap_or(usize::MAX)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = i64> + use<> {
        let Self { start, step, .. } = *self;
        (0..self.len()).map(move |i| start + step * i as i64)
    }
}

/// A method looked up on a value but not called yet, e.g. `f = items.append`.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundMethod {
    pub receiver: Object,
    pub name: String,
}

/// A Python value in the sandbox.
///
/// Containers have reference semantics like in Python: cloning an `Object::List` clones the
/// handle, and both handles observe mutations. Use [`Object::deep_copy`] for an independent
/// snapshot.
///
/// `Display` renders Python `str()`, [`Object::py_repr`] renders `repr()`.
#[derive(Debug, Clone)]
pub enum Object {
    None,
    Bool(bool),
    Int(i64),
    /// Integers outside the `i64` range. Always normalized: never holds a value that fits in `Int`.
    BigInt(BigInt),
    Float(f64),
    Str(Rc<str>),
    List(ListRef),
    Tuple(Rc<[Object]>),
    Dict(DictRef),
    Set(SetRef),
    Range(Range),
    Function(Rc<Function>),
    Builtin(Builtin),
    Method(Rc<BoundMethod>),
    Type(Type),
    ExcType(ExcType),
    Exception(Rc<Exception>),
    Module(Module),
    /// `sys.stdout` / `sys.stderr`.
    Stream(Stream),
}

impl Object {
    #[must_use]
    pub fn str(s: &str) -> Self {
        Self::Str(Rc::from(s))
    }

    #[must_use]
    pub fn list(items: Vec<Self>) -> Self {
        Self::List(Rc::new(RefCell::new(items)))
    }

    #[must_use]
    pub fn tuple(items: Vec<Self>) -> Self {
        Self::Tuple(Rc::from(items))
    }

    /// Builds a dict; later duplicate keys overwrite earlier ones.
    #[must_use]
    pub fn dict(pairs: Vec<(Self, Self)>) -> Self {
        Self::Dict(Rc::new(RefCell::new(pairs.into_iter().collect())))
    }

    #[must_use]
    pub fn set(items: Vec<Self>) -> Self {
        Self::Set(Rc::new(RefCell::new(items.into_iter().collect())))
    }

    /// Normalizes a big integer back to `Int` when it fits.
    #[must_use]
    pub fn from_bigint(value: BigInt) -> Self {
        match value.to_i64() {
            Some(i) => Self::Int(i),
            None => Self::BigInt(value),
        }
    }

    #[must_use]
    pub fn type_of(&self) -> Type {
        match self {
            Self::None => Type::NoneType,
            Self::Bool(_) => Type::Bool,
            Self::Int(_) | Self::BigInt(_) => Type::Int,
            Self::Float(_) => Type::Float,
            Self::Str(_) => Type::Str,
            Self::List(_) => Type::List,
            Self::Tuple(_) => Type::Tuple,
            Self::Dict(_) => Type::Dict,
            Self::Set(_) => Type::Set,
            Self::Range(_) => Type::Range,
            Self::Function(_) => Type::Function,
            Self::Builtin(_) => Type::BuiltinFunction,
            Self::Method(_) => Type::Method,
            Self::Type(_) | Self::ExcType(_) => Type::Type,
            Self::Exception(_) => Type::Exception,
            Self::Module(_) => Type::Module,
            Self::Stream(_) => Type::TextIO,
        }
    }

    /// Python class name of the value, used in error messages.
    #[must_use]
    pub fn type_name(&self) -> String {
        match self {
            Self::Exception(exc) => exc.exc_type().to_string(),
            other => other.type_of().to_string(),
        }
    }

    /// Python truthiness.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::None => false,
            Self::Bool(b) => *b,
            Self::Int(i) => *i != 0,
            Self::BigInt(b) => !b.is_zero(),
            Self::Float(f) => *f != 0.0,
            Self::Str(s) => !s.is_empty(),
            Self::List(items) => !items.borrow().is_empty(),
            Self::Tuple(items) => !items.is_empty(),
            Self::Dict(map) => !map.borrow().is_empty(),
            Self::Set(set) => !set.borrow().is_empty(),
            Self::Range(range) => !range.is_empty(),
            _ => true,
        }
    }

    /// Whether the value may be used as a dict key or set element.
    #[must_use]
    pub fn is_hashable(&self) -> bool {
        match self {
            Self::List(_) | Self::Dict(_) | Self::Set(_) => false,
            Self::Tuple(items) => items.iter().all(Self::is_hashable),
            _ => true,
        }
    }

    /// Numeric view used by cross-type arithmetic and comparisons.
    #[must_use]
    pub(crate) fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Bool(b) => Some(f64::from(u8::from(*b))),
            Self::Int(i) => Some(*i as f64),
            Self::BigInt(b) => b.to_f64(),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Integer view; bools count as integers like in Python.
    #[must_use]
    pub(crate) fn as_bigint(&self) -> Option<BigInt> {
        match self {
            Self::Bool(b) => Some(BigInt::from(u8::from(*b))),
            Self::Int(i) => Some(BigInt::from(*i)),
            Self::BigInt(b) => Some(b.clone()),
            _ => None,
        }
    }

    #[must_use]
    pub(crate) fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Bool(b) => Some(i64::from(*b)),
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Python identity (`is`). Immutable scalars compare by value.
    #[must_use]
    pub fn is_same(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::None, Self::None) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => Rc::ptr_eq(a, b) || a == b,
            (Self::List(a), Self::List(b)) => Rc::ptr_eq(a, b),
            (Self::Dict(a), Self::Dict(b)) => Rc::ptr_eq(a, b),
            (Self::Set(a), Self::Set(b)) => Rc::ptr_eq(a, b),
            (Self::Tuple(a), Self::Tuple(b)) => Rc::ptr_eq(a, b),
            (Self::Function(a), Self::Function(b)) => Rc::ptr_eq(a, b),
            (Self::Exception(a), Self::Exception(b)) => Rc::ptr_eq(a, b),
            (Self::Type(a), Self::Type(b)) => a == b,
            (Self::ExcType(a), Self::ExcType(b)) => a == b,
            (Self::Builtin(a), Self::Builtin(b)) => a == b,
            (Self::Module(a), Self::Module(b)) => a == b,
            (Self::Stream(a), Self::Stream(b)) => a == b,
            _ => false,
        }
    }

    /// Python ordering for `<`, `<=`, `>`, `>=`, `sorted()`, `min()` and `max()`.
    ///
    /// Returns `None` when the two values are not orderable against each other.
    #[must_use]
    pub fn py_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Str(a), Self::Str(b)) => Some(a.cmp(b)),
            (Self::List(a), Self::List(b)) => {
                if Rc::ptr_eq(a, b) {
                    return Some(Ordering::Equal);
                }
                seq_cmp(&a.borrow(), &b.borrow())
            }
            (Self::Tuple(a), Self::Tuple(b)) => seq_cmp(a, b),
            (Self::Float(_), _) | (_, Self::Float(_)) => {
                let (a, b) = (self.as_f64()?, other.as_f64()?);
                a.partial_cmp(&b)
            }
            (Self::Int(a), Self::Int(b)) => Some(a.cmp(b)),
            _ => {
                let (a, b) = (self.as_bigint()?, other.as_bigint()?);
                Some(a.cmp(&b))
            }
        }
    }

    /// Deep copy with Python `copy.deepcopy` semantics.
    ///
    /// Aliasing inside the copied value is preserved and reference cycles are supported.
    /// Immutable values and functions are shared.
    #[must_use]
    pub fn deep_copy(&self) -> Self {
        self.deep_copy_with(&mut DeepCopyMemo::default())
    }

    pub(crate) fn deep_copy_with(&self, memo: &mut DeepCopyMemo) -> Self {
        match self {
            Self::List(items) => {
                let key = Rc::as_ptr(items).cast::<()>() as usize;
                if let Some(copy) = memo.0.get(&key) {
                    return copy.clone();
                }
                let copy: ListRef = Rc::new(RefCell::new(Vec::new()));
                memo.0.insert(key, Self::List(copy.clone()));
                let copied: Vec<Self> = items.borrow().iter().map(|item| item.deep_copy_with(memo)).collect();
                *copy.borrow_mut() = copied;
                Self::List(copy)
            }
            Self::Dict(map) => {
                let key = Rc::as_ptr(map).cast::<()>() as usize;
                if let Some(copy) = memo.0.get(&key) {
                    return copy.clone();
                }
                let copy: DictRef = Rc::new(RefCell::new(IndexMap::new()));
                memo.0.insert(key, Self::Dict(copy.clone()));
                let copied: IndexMap<Self, Self> = map
                    .borrow()
                    .iter()
                    .map(|(k, v)| (k.deep_copy_with(memo), v.deep_copy_with(memo)))
                    .collect();
                *copy.borrow_mut() = copied;
                Self::Dict(copy)
            }
            Self::Set(set) => {
                let key = Rc::as_ptr(set).cast::<()>() as usize;
                if let Some(copy) = memo.0.get(&key) {
                    return copy.clone();
                }
                let copied: IndexSet<Self> = set.borrow().iter().map(|item| item.deep_copy_with(memo)).collect();
                let copy = Self::Set(Rc::new(RefCell::new(copied)));
                memo.0.insert(key, copy.clone());
                copy
            }
            Self::Tuple(items) => Self::Tuple(items.iter().map(|item| item.deep_copy_with(memo)).collect()),
            Self::Method(method) => Self::Method(Rc::new(BoundMethod {
                receiver: method.receiver.deep_copy_with(memo),
                name: method.name.clone(),
            })),
            other => other.clone(),
        }
    }

    /// Python `repr()`.
    #[must_use]
    pub fn py_repr(&self) -> String {
        let mut out = String::new();
        self.repr_into(&mut out, &mut Vec::new());
        out
    }

    fn repr_into(&self, out: &mut String, seen: &mut Vec<usize>) {
        match self {
            Self::None => out.push_str("None"),
            Self::Bool(true) => out.push_str("True"),
            Self::Bool(false) => out.push_str("False"),
            Self::Int(i) => {
                let _ = write!(out, "{i}");
            }
            Self::BigInt(b) => {
                let _ = write!(out, "{b}");
            }
            Self::Float(f) => out.push_str(&float_repr(*f)),
            Self::Str(s) => out.push_str(&str_repr(s)),
            Self::List(items) => {
                let key = Rc::as_ptr(items).cast::<()>() as usize;
                if seen.contains(&key) {
                    out.push_str("[...]");
                    return;
                }
                seen.push(key);
                out.push('[');
                join_repr(out, items.borrow().iter(), seen);
                out.push(']');
                seen.pop();
            }
            Self::Tuple(items) => {
                out.push('(');
                join_repr(out, items.iter(), seen);
                if items.len() == 1 {
                    out.push(',');
                }
                out.push(')');
            }
            Self::Dict(map) => {
                let key = Rc::as_ptr(map).cast::<()>() as usize;
                if seen.contains(&key) {
                    out.push_str("{...}");
                    return;
                }
                seen.push(key);
                out.push('{');
                for (i, (k, v)) in map.borrow().iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    k.repr_into(out, seen);
                    out.push_str(": ");
                    v.repr_into(out, seen);
                }
                out.push('}');
                seen.pop();
            }
            Self::Set(set) => {
                let set = set.borrow();
                if set.is_empty() {
                    out.push_str("set()");
                } else {
                    out.push('{');
                    join_repr(out, set.iter(), seen);
                    out.push('}');
                }
            }
            Self::Range(range) => {
                if range.step == 1 {
                    let _ = write!(out, "range({}, {})", range.start, range.stop);
                } else {
                    let _ = write!(out, "range({}, {}, {})", range.start, range.stop, range.step);
                }
            }
            Self::Function(function) => {
                let _ = write!(out, "<function {}>", function.name());
            }
            Self::Builtin(builtin) => {
                let _ = write!(out, "<built-in function {builtin}>");
            }
            Self::Method(method) => {
                let _ = write!(out, "<bound method {}.{}>", method.receiver.type_name(), method.name);
            }
            Self::Type(t) => {
                let _ = write!(out, "<class '{t}'>");
            }
            Self::ExcType(exc_type) => {
                let _ = write!(out, "<class '{exc_type}'>");
            }
            Self::Exception(exc) => out.push_str(&exc.py_repr()),
            Self::Module(module) => {
                let _ = write!(out, "<module '{module}'>");
            }
            Self::Stream(stream) => {
                let _ = write!(out, "<sys.{stream}>");
            }
        }
    }
}

fn join_repr<'a>(out: &mut String, items: impl Iterator<Item = &'a Object>, seen: &mut Vec<usize>) {
    for (i, item) in items.enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        item.repr_into(out, seen);
    }
}

fn seq_cmp(a: &[Object], b: &[Object]) -> Option<Ordering> {
    for (x, y) in a.iter().zip(b) {
        if x != y {
            return x.py_cmp(y);
        }
    }
    Some(a.len().cmp(&b.len()))
}

/// Memo table for [`Object::deep_copy_with`], keyed by container address.
///
/// Sharing one memo across several values (e.g. every entry of a namespace) preserves
/// aliasing between them in the copy.
#[derive(Debug, Default)]
pub(crate) struct DeepCopyMemo(AHashMap<usize, Object>);

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => f.write_str(s),
            Self::Exception(exc) => f.write_str(exc.message().unwrap_or_default()),
            other => f.write_str(&other.py_repr()),
        }
    }
}

/// Python `==`.
///
/// Numbers compare across `bool`, `int` and `float`. Lists never equal tuples.
///
/// Containers met again while they are being compared count as equal, so cyclic values
/// compare without unbounded recursion.
impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        self.eq_guarded(other, &mut Vec::new())
    }
}

type ContainerPair = (*const (), *const ());

impl Object {
    fn eq_guarded(&self, other: &Self, active: &mut Vec<ContainerPair>) -> bool {
        match (self, other) {
            (Self::None, Self::None) => true,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(_) | Self::Int(_) | Self::Bool(_) | Self::BigInt(_), Self::Float(_))
            | (Self::Float(_), Self::Int(_) | Self::Bool(_) | Self::BigInt(_)) => self.as_f64() == other.as_f64(),
            (Self::Int(_) | Self::Bool(_) | Self::BigInt(_), Self::Int(_) | Self::Bool(_) | Self::BigInt(_)) => {
                self.as_bigint() == other.as_bigint()
            }
            (Self::List(a), Self::List(b)) => {
                if Rc::ptr_eq(a, b) {
                    return true;
                }
                let pair = (Rc::as_ptr(a).cast::<()>(), Rc::as_ptr(b).cast::<()>());
                if active.contains(&pair) {
                    return true;
                }
                active.push(pair);
                let (a, b) = (a.borrow(), b.borrow());
                let equal = a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.eq_guarded(y, active));
                active.pop();
                equal
            }
            (Self::Tuple(a), Self::Tuple(b)) => {
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.eq_guarded(y, active))
            }
            (Self::Dict(a), Self::Dict(b)) => {
                if Rc::ptr_eq(a, b) {
                    return true;
                }
                let pair = (Rc::as_ptr(a).cast::<()>(), Rc::as_ptr(b).cast::<()>());
                if active.contains(&pair) {
                    return true;
                }
                active.push(pair);
                let (a, b) = (a.borrow(), b.borrow());
                let equal = a.len() == b.len()
                    && a.iter().all(|(k, v)| b.get(k).is_some_and(|other| v.eq_guarded(other, active)));
                active.pop();
                equal
            }
            (Self::Set(a), Self::Set(b)) => {
                let (a, b) = (a.borrow(), b.borrow());
                a.len() == b.len() && a.iter().all(|item| b.contains(item))
            }
            (Self::Range(a), Self::Range(b)) => {
                let (la, lb) = (a.len(), b.len());
                la == lb && (la == 0 || (a.start == b.start && (la == 1 || a.step == b.step)))
            }
            (Self::Function(a), Self::Function(b)) => Rc::ptr_eq(a, b) || **a == **b,
            (Self::Method(a), Self::Method(b)) => a.name == b.name && a.receiver.is_same(&b.receiver),
            (Self::Builtin(a), Self::Builtin(b)) => a == b,
            (Self::Type(a), Self::Type(b)) => a == b,
            (Self::ExcType(a), Self::ExcType(b)) => a == b,
            (Self::Exception(a), Self::Exception(b)) => Rc::ptr_eq(a, b),
            (Self::Module(a), Self::Module(b)) => a == b,
            (Self::Stream(a), Self::Stream(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Object {}

/// Hash consistent with Python equality for hashable values.
///
/// Unhashable containers hash by address; the interpreter refuses to use them as keys.
impl Hash for Object {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Self::None => 0u8.hash(state),
            Self::Bool(b) => i64::from(*b).hash(state),
            Self::Int(i) => i.hash(state),
            Self::BigInt(b) => b.hash(state),
            Self::Float(f) => {
                if f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64 {
                    (*f as i64).hash(state);
                } else {
                    f.to_bits().hash(state);
                }
            }
            Self::Str(s) => s.hash(state),
            Self::Tuple(items) => {
                items.len().hash(state);
                for item in items.iter() {
                    item.hash(state);
                }
            }
            Self::Range(range) => range.hash(state),
            Self::Builtin(builtin) => builtin.hash(state),
            Self::Type(t) => t.hash(state),
            Self::ExcType(exc_type) => exc_type.hash(state),
            Self::Module(module) => module.hash(state),
            Self::Stream(stream) => stream.hash(state),
            Self::Function(function) => (Rc::as_ptr(&function.def).cast::<()>() as usize).hash(state),
            Self::Method(method) => method.name.hash(state),
            Self::List(items) => (Rc::as_ptr(items).cast::<()>() as usize).hash(state),
            Self::Dict(map) => (Rc::as_ptr(map).cast::<()>() as usize).hash(state),
            Self::Set(set) => (Rc::as_ptr(set).cast::<()>() as usize).hash(state),
            Self::Exception(exc) => (Rc::as_ptr(exc).cast::<()>() as usize).hash(state),
        }
    }
}

impl From<bool> for Object {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Object {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for Object {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f64> for Object {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for Object {
    fn from(value: &str) -> Self {
        Self::str(value)
    }
}

impl From<String> for Object {
    fn from(value: String) -> Self {
        Self::Str(Rc::from(value))
    }
}

impl From<Vec<Self>> for Object {
    fn from(value: Vec<Self>) -> Self {
        Self::list(value)
    }
}

impl From<Exception> for Object {
    fn from(value: Exception) -> Self {
        Self::Exception(Rc::new(value))
    }
}

/// Returns a string representation of a float matching CPython's `repr()` behavior.
///
/// `ryu` produces the shortest round-tripping digits; the layout is then redone with
/// CPython's rule: scientific notation when the decimal exponent is below -4 or at least 16.
#[must_use]
pub fn float_repr(f: f64) -> String {
    if f.is_nan() {
        return "nan".to_owned();
    }
    if f.is_infinite() {
        return if f.is_sign_negative() { "-inf" } else { "inf" }.to_owned();
    }

    let mut buffer = ryu::Buffer::new();
    let formatted = buffer.format_finite(f);
    let (sign, unsigned) = match formatted.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", formatted),
    };
    let (mantissa, exp) = match unsigned.split_once('e') {
        Some((mantissa, exp)) => (mantissa, exp.parse::<i32>().unwrap_or(0)),
        None => (unsigned, 0),
    };
    let (int_part, frac_part) = mantissa.split_once('.').unwrap_or((mantissa, ""));

    let mut digits: String = format!("{int_part}{frac_part}");
    let mut point = i32::try_from(int_part.len()).unwrap_or(0) + exp;
    while digits.len() > 1 && digits.starts_with('0') {
        digits.remove(0);
        point -= 1;
    }
    while digits.len() > 1 && digits.ends_with('0') {
        digits.pop();
    }
    if digits == "0" {
        return format!("{sign}0.0");
    }

    let sci_exp = point - 1;
    if !(-4..16).contains(&sci_exp) {
        let (first, rest) = digits.split_at(1);
        let mantissa = if rest.is_empty() {
            first.to_owned()
        } else {
            format!("{first}.{rest}")
        };
        let exp_sign = if sci_exp < 0 { '-' } else { '+' };
        return format!("{sign}{mantissa}e{exp_sign}{:02}", sci_exp.abs());
    }

    let len = i32::try_from(digits.len()).unwrap_or(i32::MAX);
    if point <= 0 {
        format!("{sign}0.{}{digits}", "0".repeat(point.unsigned_abs() as usize))
    } else if point >= len {
        format!("{sign}{digits}{}.0", "0".repeat((point - len) as usize))
    } else {
        let (whole, frac) = digits.split_at(point as usize);
        format!("{sign}{whole}.{frac}")
    }
}

/// Python `repr()` of a string: single quotes unless the text contains only single quotes.
#[must_use]
pub fn str_repr(s: &str) -> String {
    let quote = if s.contains('\'') && !s.contains('"') { '"' } else { '\'' };
    let mut out = String::with_capacity(s.len() + 2);
    out.push(quote);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if (c as u32) < 0x20 || c as u32 == 0x7f => {
                let _ = write!(out, "\\x{:02x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}
