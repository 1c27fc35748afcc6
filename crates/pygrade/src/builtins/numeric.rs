//! Numeric builtins and the `math` module functions.

use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{Signed, Zero};

use crate::{
    args::ArgValues,
    builtins::Builtin,
    exception::{ExcType, Exception, RunResult},
    expressions::Operator,
    interp::{format::float_to_bigint, ops},
    object::Object,
};

fn bad_operand(name: &str, value: &Object) -> Exception {
    ExcType::TypeError.msg(format!("bad operand type for {name}(): '{}'", value.type_name()))
}

fn must_be_real(value: &Object) -> Exception {
    ExcType::TypeError.msg(format!("must be real number, not {}", value.type_name()))
}

fn math_domain_error() -> Exception {
    ExcType::ValueError.msg("math domain error")
}

pub(super) fn builtin_abs(args: ArgValues) -> RunResult<Object> {
    match args.get_one_arg("abs")? {
        Object::Bool(b) => Ok(Object::Int(i64::from(b))),
        Object::Int(i) => Ok(i
            .checked_abs()
            .map_or_else(|| Object::from_bigint(BigInt::from(i).abs()), Object::Int)),
        Object::BigInt(b) => Ok(Object::from_bigint(b.abs())),
        Object::Float(f) => Ok(Object::Float(f.abs())),
        other => Err(bad_operand("abs", &other)),
    }
}

/// `round(number, ndigits=None)`, rounding half to even like Python.
pub(super) fn builtin_round(mut args: ArgValues) -> RunResult<Object> {
    let ndigits_kwarg = args.take_kwarg("ndigits");
    let (number, ndigits) = args.get_one_two_args("round")?;
    let ndigits = match ndigits.or(ndigits_kwarg) {
        None | Some(Object::None) => None,
        Some(value) => Some(value.as_i64().ok_or_else(|| {
            ExcType::TypeError.msg(format!(
                "'{}' object cannot be interpreted as an integer",
                value.type_name()
            ))
        })?),
    };

    match (&number, ndigits) {
        (Object::Float(f), None) => float_to_bigint(f.round_ties_even()).map(Object::from_bigint),
        (Object::Float(f), Some(digits)) => Ok(Object::Float(round_float(*f, digits))),
        (Object::Int(_) | Object::Bool(_) | Object::BigInt(_), None) => {
            Ok(Object::from_bigint(number.as_bigint().unwrap_or_default()))
        }
        (Object::Int(_) | Object::Bool(_) | Object::BigInt(_), Some(digits)) => {
            let value = number.as_bigint().unwrap_or_default();
            if digits >= 0 {
                return Ok(Object::from_bigint(value));
            }
            let Ok(exponent) = u32::try_from(-digits) else {
                return Ok(Object::Int(0));
            };
            let unit = BigInt::from(10).pow(exponent);
            Ok(Object::from_bigint(round_half_even(&value, &unit) * unit))
        }
        (other, _) => Err(ExcType::TypeError.msg(format!(
            "type {} doesn't define __round__ method",
            other.type_name()
        ))),
    }
}

/// Rounds `value / unit` to the nearest integer, ties to even.
fn round_half_even(value: &BigInt, unit: &BigInt) -> BigInt {
    let (quotient, remainder) = value.div_mod_floor(unit);
    let twice = remainder * 2;
    if &twice > unit || (&twice == unit && quotient.is_odd()) {
        quotient + 1
    } else {
        quotient
    }
}

fn round_float(f: f64, digits: i64) -> f64 {
    if !f.is_finite() {
        return f;
    }
    if digits >= 0 {
        // the shortest decimal expansion is correctly rounded, matching CPython
        let precision = usize::try_from(digits.min(330)).unwrap_or(330);
        return format!("{f:.precision$}").parse().unwrap_or(f);
    }
    let scale = 10f64.powi(i32::try_from(-digits).unwrap_or(i32::MAX));
    if scale.is_infinite() {
        return 0.0 * f;
    }
    (f / scale).round_ties_even() * scale
}

pub(super) fn builtin_divmod(args: ArgValues) -> RunResult<Object> {
    let (a, b) = args.get_two_args("divmod")?;
    let quotient = ops::binary_op(&a, Operator::FloorDiv, &b)?;
    let remainder = ops::binary_op(&a, Operator::Mod, &b)?;
    Ok(Object::tuple(vec![quotient, remainder]))
}

/// `pow(base, exp, mod=None)`
pub(super) fn builtin_pow(args: ArgValues) -> RunResult<Object> {
    let (base, exp, modulus) = args.get_one_two_three_args("pow")?;
    let Some(exp) = exp else {
        return Err(ExcType::TypeError.msg("pow() missing required argument 'exp' (pos 2)"));
    };
    let Some(modulus) = modulus.filter(|m| !matches!(m, Object::None)) else {
        return ops::binary_op(&base, Operator::Pow, &exp);
    };
    let (Some(base), Some(exp), Some(modulus)) = (base.as_bigint(), exp.as_bigint(), modulus.as_bigint()) else {
        return Err(ExcType::TypeError.msg(
            "pow() 3rd argument not allowed unless all arguments are integers",
        ));
    };
    if modulus.is_zero() {
        return Err(ExcType::ValueError.msg("pow() 3rd argument cannot be 0"));
    }
    if exp.is_negative() {
        return Err(ExcType::ValueError.msg("base is not invertible for the given modulus"));
    }
    Ok(Object::from_bigint(base.modpow(&exp, &modulus)))
}

pub(super) fn call_math(function: Builtin, args: ArgValues) -> RunResult<Object> {
    match function {
        Builtin::Sqrt => {
            let x = real_arg(args.get_one_arg("sqrt")?)?;
            if x < 0.0 {
                return Err(math_domain_error());
            }
            Ok(Object::Float(x.sqrt()))
        }
        Builtin::Floor | Builtin::Ceil => {
            let name: &'static str = function.into();
            match args.get_one_arg(name)? {
                value @ (Object::Int(_) | Object::BigInt(_)) => Ok(value),
                Object::Bool(b) => Ok(Object::Int(i64::from(b))),
                Object::Float(f) => {
                    let rounded = if function == Builtin::Floor { f.floor() } else { f.ceil() };
                    float_to_bigint(rounded).map(Object::from_bigint)
                }
                other => Err(must_be_real(&other)),
            }
        }
        Builtin::Fabs => real_arg(args.get_one_arg("fabs")?).map(|x| Object::Float(x.abs())),
        Builtin::Gcd => {
            args.check_no_kwargs("gcd")?;
            let mut result = BigInt::zero();
            for value in &args.args {
                let n = value.as_bigint().ok_or_else(|| {
                    ExcType::TypeError.msg(format!(
                        "'{}' object cannot be interpreted as an integer",
                        value.type_name()
                    ))
                })?;
                result = result.gcd(&n);
            }
            Ok(Object::from_bigint(result))
        }
        Builtin::Log => {
            let (x, base) = args.get_one_two_args("log")?;
            let x = real_arg(x)?;
            if x <= 0.0 {
                return Err(math_domain_error());
            }
            match base {
                None => Ok(Object::Float(x.ln())),
                Some(base) => {
                    let base = real_arg(base)?;
                    if base <= 0.0 || base == 1.0 {
                        return Err(if base == 1.0 {
                            ExcType::ZeroDivisionError.msg("float division by zero")
                        } else {
                            math_domain_error()
                        });
                    }
                    Ok(Object::Float(x.ln() / base.ln()))
                }
            }
        }
        other => Err(ExcType::TypeError.msg(format!("math.{other} is not a math function"))),
    }
}

fn real_arg(value: Object) -> RunResult<f64> {
    value.as_f64().ok_or_else(|| must_be_real(&value))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn round(args: Vec<Object>) -> Object {
        builtin_round(ArgValues::positional(args)).unwrap()
    }

    #[test]
    fn round_half_to_even() {
        assert_eq!(round(vec![Object::Float(2.5)]), Object::Int(2));
        assert_eq!(round(vec![Object::Float(3.5)]), Object::Int(4));
        assert_eq!(round(vec![Object::Float(2.675), Object::Int(2)]), Object::Float(2.67));
        assert_eq!(round(vec![Object::Int(1250), Object::Int(-2)]), Object::Int(1200));
        assert_eq!(round(vec![Object::Int(1350), Object::Int(-2)]), Object::Int(1400));
    }

    #[test]
    fn pow_with_modulus() {
        let args = ArgValues::positional(vec![Object::Int(3), Object::Int(4), Object::Int(5)]);
        assert_eq!(builtin_pow(args).unwrap(), Object::Int(1));
    }

    #[test]
    fn math_domain() {
        let err = call_math(Builtin::Sqrt, ArgValues::one(Object::Int(-1))).unwrap_err();
        assert_eq!(err.to_string(), "ValueError: math domain error");
        let gcd = call_math(
            Builtin::Gcd,
            ArgValues::positional(vec![Object::Int(12), Object::Int(18)]),
        );
        assert_eq!(gcd.unwrap(), Object::Int(6));
    }
}
