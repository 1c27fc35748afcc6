//! String formatting: the format-spec mini-language used by f-strings, `format()` and
//! `str.format`, plus printf-style `%` formatting.

use num_bigint::BigInt;
use num_traits::Signed;

use crate::{
    exception::{ExcType, Exception, RunResult},
    object::{Object, float_repr},
};

/// A parsed `[[fill]align][sign][#][0][width][,][.precision][type]` specification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct FormatSpec {
    pub fill: Option<char>,
    pub align: Option<char>,
    pub sign: Option<char>,
    pub alternate: bool,
    pub zero: bool,
    pub width: usize,
    pub grouping: Option<char>,
    pub precision: Option<usize>,
    pub kind: Option<char>,
}

impl FormatSpec {
    pub fn parse(spec: &str) -> RunResult<Self> {
        let chars: Vec<char> = spec.chars().collect();
        let mut parsed = Self::default();
        let mut i = 0;
        let is_align = |c: char| matches!(c, '<' | '>' | '^' | '=');
        if chars.len() >= 2 && is_align(chars[1]) {
            parsed.fill = Some(chars[0]);
            parsed.align = Some(chars[1]);
            i = 2;
        } else if chars.first().is_some_and(|c| is_align(*c)) {
            parsed.align = Some(chars[0]);
            i = 1;
        }
        if let Some(&c) = chars.get(i)
            && matches!(c, '+' | '-' | ' ')
        {
            parsed.sign = Some(c);
            i += 1;
        }
        if chars.get(i) == Some(&'#') {
            parsed.alternate = true;
            i += 1;
        }
        if chars.get(i) == Some(&'0') {
            parsed.zero = true;
            i += 1;
        }
        let start = i;
        while chars.get(i).is_some_and(char::is_ascii_digit) {
            i += 1;
        }
        parsed.width = chars[start..i].iter().collect::<String>().parse().unwrap_or(0);
        if let Some(&c) = chars.get(i)
            && matches!(c, ',' | '_')
        {
            parsed.grouping = Some(c);
            i += 1;
        }
        if chars.get(i) == Some(&'.') {
            i += 1;
            let start = i;
            while chars.get(i).is_some_and(char::is_ascii_digit) {
                i += 1;
            }
            if start == i {
                return Err(ExcType::ValueError.msg("Format specifier missing precision"));
            }
            parsed.precision = chars[start..i].iter().collect::<String>().parse().ok();
        }
        if let Some(&c) = chars.get(i) {
            parsed.kind = Some(c);
            i += 1;
        }
        if i != chars.len() {
            return Err(ExcType::ValueError.msg("Invalid format specifier"));
        }
        Ok(parsed)
    }
}

/// Python `format(value, spec)`.
pub(crate) fn format_value(value: &Object, spec: &str) -> RunResult<String> {
    if spec.is_empty() {
        return Ok(value.to_string());
    }
    let spec = FormatSpec::parse(spec)?;
    format_with_spec(value, &spec)
}

pub(crate) fn format_with_spec(value: &Object, spec: &FormatSpec) -> RunResult<String> {
    match value {
        Object::Str(s) => {
            if let Some(kind) = spec.kind.filter(|k| *k != 's') {
                return Err(unknown_code(kind, value));
            }
            if spec.sign.is_some() {
                return Err(ExcType::ValueError.msg("Sign not allowed in string format specifier"));
            }
            let text: String = match spec.precision {
                Some(p) => s.chars().take(p).collect(),
                None => s.to_string(),
            };
            Ok(pad(&text, "", spec, '<'))
        }
        Object::Bool(_) | Object::Int(_) | Object::BigInt(_) => {
            let kind = spec.kind.unwrap_or('d');
            if matches!(kind, 'e' | 'E' | 'f' | 'F' | 'g' | 'G' | '%') {
                let f = value
                    .as_f64()
                    .ok_or_else(|| ExcType::OverflowError.msg("int too large to convert to float"))?;
                return format_float(f, spec);
            }
            if spec.precision.is_some() {
                return Err(ExcType::ValueError.msg("Precision not allowed in integer format specifier"));
            }
            let n = value.as_bigint().unwrap_or_default();
            format_int(&n, kind, spec).ok_or_else(|| unknown_code(kind, value))
        }
        Object::Float(f) => format_float(*f, spec),
        other => {
            if spec.kind.is_some_and(|k| k != 's') {
                return Err(unknown_code(spec.kind.unwrap_or('s'), other));
            }
            Ok(pad(&other.to_string(), "", spec, '<'))
        }
    }
}

fn unknown_code(kind: char, value: &Object) -> Exception {
    ExcType::ValueError.msg(format!(
        "Unknown format code '{kind}' for object of type '{}'",
        value.type_name()
    ))
}

fn sign_prefix(negative: bool, sign: Option<char>) -> &'static str {
    match (negative, sign) {
        (true, _) => "-",
        (false, Some('+')) => "+",
        (false, Some(' ')) => " ",
        _ => "",
    }
}

fn format_int(n: &BigInt, kind: char, spec: &FormatSpec) -> Option<String> {
    let magnitude = n.abs();
    let (digits, prefix) = match kind {
        'd' | 'n' => (magnitude.to_string(), ""),
        'x' => (magnitude.to_str_radix(16), "0x"),
        'X' => (magnitude.to_str_radix(16).to_uppercase(), "0X"),
        'o' => (magnitude.to_str_radix(8), "0o"),
        'b' => (magnitude.to_str_radix(2), "0b"),
        'c' => {
            let code = u32::try_from(&magnitude).ok()?;
            return Some(pad(&char::from_u32(code)?.to_string(), "", spec, '>'));
        }
        _ => return None,
    };
    let digits = match spec.grouping {
        Some(sep) => {
            let group = if kind == 'd' || kind == 'n' { 3 } else { 4 };
            group_digits(&digits, sep, group)
        }
        None => digits,
    };
    let mut sign = sign_prefix(n.is_negative(), spec.sign).to_owned();
    if spec.alternate {
        sign.push_str(prefix);
    }
    Some(pad(&digits, &sign, spec, '>'))
}

fn group_digits(digits: &str, sep: char, group: usize) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / group);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (len - i) % group == 0 {
            out.push(sep);
        }
        out.push(c);
    }
    out
}

fn format_float(f: f64, spec: &FormatSpec) -> RunResult<String> {
    let negative = f.is_sign_negative() && !f.is_nan();
    let magnitude = f.abs();
    let body = if !magnitude.is_finite() {
        let text = if magnitude.is_nan() { "nan" } else { "inf" };
        if spec.kind.is_some_and(|k| k.is_ascii_uppercase()) {
            text.to_uppercase()
        } else {
            text.to_owned()
        }
    } else {
        match spec.kind {
            Some('f' | 'F') => format!("{magnitude:.prec$}", prec = spec.precision.unwrap_or(6)),
            Some(kind @ ('e' | 'E')) => {
                let text = format_exponent(magnitude, spec.precision.unwrap_or(6));
                if kind == 'E' { text.to_uppercase() } else { text }
            }
            Some(kind @ ('g' | 'G')) => {
                let text = format_general(magnitude, spec.precision.unwrap_or(6), spec.alternate);
                if kind == 'G' { text.to_uppercase() } else { text }
            }
            Some('%') => format!("{:.*}%", spec.precision.unwrap_or(6), magnitude * 100.0),
            Some('n') | None => match spec.precision {
                Some(p) => {
                    let text = format_general(magnitude, p, spec.alternate);
                    if text.contains(['.', 'e']) { text } else { format!("{text}.0") }
                }
                None => float_repr(magnitude),
            },
            Some(kind) => return Err(unknown_code(kind, &Object::Float(f))),
        }
    };
    let body = match spec.grouping {
        Some(sep) if magnitude.is_finite() => {
            let split = body.find(['.', 'e', '%']).unwrap_or(body.len());
            let (int_part, rest) = body.split_at(split);
            format!("{}{rest}", group_digits(int_part, sep, 3))
        }
        _ => body,
    };
    Ok(pad(&body, sign_prefix(negative, spec.sign), spec, '>'))
}

/// `{:.Ne}` with Python's exponent layout (`1.50e+02`).
fn format_exponent(f: f64, precision: usize) -> String {
    let text = format!("{f:.precision$e}");
    let (mantissa, exp) = text.split_once('e').unwrap_or((&text, "0"));
    let exp: i32 = exp.parse().unwrap_or(0);
    let exp_sign = if exp < 0 { '-' } else { '+' };
    format!("{mantissa}e{exp_sign}{:02}", exp.abs())
}

/// The `g` presentation type.
fn format_general(f: f64, precision: usize, alternate: bool) -> String {
    let precision = precision.max(1);
    if f == 0.0 {
        return if alternate {
            format!("{:.*}", precision - 1, 0.0)
        } else {
            "0".to_owned()
        };
    }
    let sci = format!("{f:.prec$e}", prec = precision - 1);
    let exp: i64 = sci.split_once('e').and_then(|(_, e)| e.parse().ok()).unwrap_or(0);
    let p = i64::try_from(precision).unwrap_or(i64::MAX);
    let text = if -4 <= exp && exp < p {
        let decimals = usize::try_from(p - 1 - exp).unwrap_or(0);
        format!("{f:.decimals$}")
    } else {
        format_exponent(f, precision - 1)
    };
    if alternate {
        return text;
    }
    match text.split_once('e') {
        Some((mantissa, exp)) => format!("{}e{exp}", strip_fraction_zeros(mantissa)),
        None => strip_fraction_zeros(&text).to_owned(),
    }
}

fn strip_fraction_zeros(text: &str) -> &str {
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.')
    } else {
        text
    }
}

/// Applies fill, alignment and width. `sign` is kept in front of zero padding.
fn pad(body: &str, sign: &str, spec: &FormatSpec, default_align: char) -> String {
    let len = body.chars().count() + sign.chars().count();
    let (fill, align) = match (spec.fill, spec.align) {
        (fill, Some(align)) => (fill.unwrap_or(' '), align),
        (_, None) if spec.zero => ('0', '='),
        (_, None) => (' ', default_align),
    };
    if len >= spec.width {
        return format!("{sign}{body}");
    }
    let padding = spec.width - len;
    let fill_str = |n: usize| fill.to_string().repeat(n);
    match align {
        '<' => format!("{sign}{body}{}", fill_str(padding)),
        '^' => format!("{}{sign}{body}{}", fill_str(padding / 2), fill_str(padding - padding / 2)),
        '=' => format!("{sign}{}{body}", fill_str(padding)),
        _ => format!("{}{sign}{body}", fill_str(padding)),
    }
}

/// Value of a `str.format` replacement field.
fn apply_conversion(value: &Object, conversion: Option<char>) -> RunResult<Object> {
    match conversion {
        None => Ok(value.clone()),
        Some('s') => Ok(Object::from(value.to_string())),
        Some('r' | 'a') => Ok(Object::from(value.py_repr())),
        Some(other) => Err(ExcType::ValueError.msg(format!(
            "Unknown conversion specifier {other}"
        ))),
    }
}

/// Formats one interpolated value, as in `f"{value!r:>10}"`.
pub(crate) fn format_field(value: &Object, conversion: Option<char>, spec: &str) -> RunResult<String> {
    let value = apply_conversion(value, conversion)?;
    format_value(&value, spec)
}

/// Python `template.format(*args, **kwargs)`.
pub(crate) fn str_format(template: &str, args: &[Object], kwargs: &[(String, Object)]) -> RunResult<String> {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();
    let mut next_auto = 0usize;
    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '}' => return Err(ExcType::ValueError.msg("Single '}' encountered in format string")),
            '{' => {
                let mut field = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(c) => field.push(c),
                        None => return Err(ExcType::ValueError.msg("Single '{' encountered in format string")),
                    }
                }
                let (field, spec) = field.split_once(':').unwrap_or((&field, ""));
                let (name, conversion) = match field.split_once('!') {
                    Some((name, conv)) => (name, conv.chars().next()),
                    None => (field, None),
                };
                let value = if name.is_empty() {
                    let value = args.get(next_auto).ok_or_else(|| {
                        ExcType::IndexError.msg(format!(
                            "Replacement index {next_auto} out of range for positional args tuple"
                        ))
                    })?;
                    next_auto += 1;
                    value
                } else if let Ok(index) = name.parse::<usize>() {
                    args.get(index).ok_or_else(|| {
                        ExcType::IndexError.msg(format!(
                            "Replacement index {index} out of range for positional args tuple"
                        ))
                    })?
                } else {
                    kwargs
                        .iter()
                        .find(|(k, _)| k == name)
                        .map(|(_, v)| v)
                        .ok_or_else(|| ExcType::KeyError.msg(crate::object::str_repr(name)))?
                };
                out.push_str(&format_field(value, conversion, spec)?);
            }
            c => out.push(c),
        }
    }
    Ok(out)
}

/// Python `template % args`.
pub(crate) fn printf_format(template: &str, args: &Object) -> RunResult<String> {
    let values: Vec<Object> = match args {
        Object::Tuple(items) => items.to_vec(),
        other => vec![other.clone()],
    };
    let mut values = values.into_iter();
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        let mut spec = FormatSpec::default();
        loop {
            match chars.peek() {
                Some('-') => spec.align = Some('<'),
                Some('+') => spec.sign = Some('+'),
                Some(' ') => spec.sign = spec.sign.or(Some(' ')),
                Some('0') => spec.zero = true,
                Some('#') => spec.alternate = true,
                _ => break,
            }
            chars.next();
        }
        let mut width = String::new();
        while let Some(d) = chars.peek().filter(|d| d.is_ascii_digit()) {
            width.push(*d);
            chars.next();
        }
        spec.width = width.parse().unwrap_or(0);
        if chars.peek() == Some(&'.') {
            chars.next();
            let mut precision = String::new();
            while let Some(d) = chars.peek().filter(|d| d.is_ascii_digit()) {
                precision.push(*d);
                chars.next();
            }
            spec.precision = Some(precision.parse().unwrap_or(0));
        }
        if spec.align.is_some() {
            spec.zero = false;
        }
        let Some(kind) = chars.next() else {
            return Err(ExcType::ValueError.msg("incomplete format"));
        };
        if kind == '%' {
            out.push('%');
            continue;
        }
        let value = values
            .next()
            .ok_or_else(|| ExcType::TypeError.msg("not enough arguments for format string"))?;
        let text = match kind {
            's' | 'r' | 'a' => {
                let text = if kind == 's' { value.to_string() } else { value.py_repr() };
                spec.zero = false;
                spec.align = spec.align.or(Some('>'));
                format_with_spec(&Object::from(text), &spec)?
            }
            'd' | 'i' | 'u' | 'x' | 'X' | 'o' | 'c' => {
                let int_value = match &value {
                    Object::Float(f) if kind != 'c' => Object::from_bigint(float_to_bigint(*f)?),
                    v if v.as_bigint().is_some() => v.clone(),
                    Object::Str(s) if kind == 'c' => Object::Int(i64::from(s.chars().next().map_or(0, u32::from))),
                    other => {
                        return Err(ExcType::TypeError.msg(format!(
                            "%{kind} format: a real number is required, not {}",
                            other.type_name()
                        )));
                    }
                };
                spec.kind = Some(if matches!(kind, 'i' | 'u') { 'd' } else { kind });
                spec.precision = None;
                format_with_spec(&int_value, &spec)?
            }
            'f' | 'F' | 'e' | 'E' | 'g' | 'G' => {
                let f = value.as_f64().ok_or_else(|| {
                    ExcType::TypeError.msg(format!("must be real number, not {}", value.type_name()))
                })?;
                spec.kind = Some(kind);
                format_with_spec(&Object::Float(f), &spec)?
            }
            other => {
                return Err(ExcType::ValueError.msg(format!(
                    "unsupported format character '{other}'"
                )));
            }
        };
        out.push_str(&text);
    }
    if values.next().is_some() {
        return Err(ExcType::TypeError.msg("not all arguments converted during string formatting"));
    }
    Ok(out)
}

/// Truncates a float toward zero, as `int(f)` does.
pub(crate) fn float_to_bigint(f: f64) -> RunResult<BigInt> {
    if f.is_nan() {
        return Err(ExcType::ValueError.msg("cannot convert float NaN to integer"));
    }
    if f.is_infinite() {
        return Err(ExcType::OverflowError.msg("cannot convert float infinity to integer"));
    }
    let truncated = f.trunc();
    if truncated.abs() < 9.0e15 {
        #[expect(clippy::cast_possible_truncation)]
        return Ok(BigInt::from(truncated as i64));
    }
    // exact conversion through the decimal expansion, which is integral here
    Ok(format!("{truncated:.0}").parse().unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_spec_variants() {
        let cases: &[(Object, &str, &str)] = &[
            (Object::Float(3.14159), ".2f", "3.14"),
            (Object::Int(42), "5d", "   42"),
            (Object::Int(42), "<5", "42   "),
            (Object::Int(-42), "05", "-0042"),
            (Object::Int(1234567), ",", "1,234,567"),
            (Object::Int(255), "#x", "0xff"),
            (Object::str("ab"), "^6", "  ab  "),
            (Object::str("abc"), "*>5", "**abc"),
            (Object::Float(1234.5), "e", "1.234500e+03"),
            (Object::Float(0.00001234), "g", "1.234e-05"),
            (Object::Float(0.5), ".1%", "50.0%"),
            (Object::Float(2.0), ".3", "2.0"),
        ];
        for (value, spec, expected) in cases {
            assert_eq!(&format_value(value, spec).unwrap(), expected, "format({value:?}, {spec:?})");
        }
    }

    #[test]
    fn printf_style() {
        let args = Object::tuple(vec![Object::str("x"), Object::Int(3), Object::Float(2.5)]);
        assert_eq!(printf_format("%s=%d (%.2f) 100%%", &args).unwrap(), "x=3 (2.50) 100%");
        assert_eq!(printf_format("%5s|%-4d|", &Object::tuple(vec![Object::str("a"), Object::Int(7)])).unwrap(), "    a|7   |");
        let err = printf_format("%d %d", &Object::Int(1)).unwrap_err();
        assert_eq!(err.exc_type(), ExcType::TypeError);
    }

    #[test]
    fn str_format_fields() {
        let out = str_format(
            "{0} + {1} = {total:>3}",
            &[Object::Int(1), Object::Int(2)],
            &[("total".to_owned(), Object::Int(3))],
        )
        .unwrap();
        assert_eq!(out, "1 + 2 =   3");
    }
}
