//! Comparators for the `*_with` assertion forms.
//!
//! Assertions compare with plain equality by default. These cover the usual exceptions:
//! output whose line order does not matter, collections compared as multisets, and
//! floating point results.

use crate::object::Object;

/// Same lines in any order, each line counted with its multiplicity.
#[must_use]
pub fn unordered_lines(expected: &str, actual: &str) -> bool {
    let mut expected: Vec<&str> = expected.lines().collect();
    let mut actual: Vec<&str> = actual.lines().collect();
    expected.sort_unstable();
    actual.sort_unstable();
    expected == actual
}

/// Same items in any order, for lists, tuples, sets and dict keys.
///
/// Items only need to support equality, so unhashable items (nested lists) work too.
/// Values that are not collections fall back to equality.
#[must_use]
pub fn unordered_items(expected: &Object, actual: &Object) -> bool {
    let (Some(expected), Some(actual)) = (collection_items(expected), collection_items(actual)) else {
        return expected == actual;
    };
    if expected.len() != actual.len() {
        return false;
    }
    let mut matched = vec![false; actual.len()];
    expected.iter().all(|item| {
        let found = actual
            .iter()
            .enumerate()
            .find(|(i, candidate)| !matched[*i] && *candidate == item);
        match found {
            Some((i, _)) => {
                matched[i] = true;
                true
            }
            None => false,
        }
    })
}

/// Numeric comparison with an absolute tolerance, recursing into lists and tuples.
///
/// Ints and floats compare by value; anything else uses equality.
pub fn float_close(tolerance: f64) -> impl Fn(&Object, &Object) -> bool {
    move |expected, actual| close(expected, actual, tolerance)
}

fn close(expected: &Object, actual: &Object, tolerance: f64) -> bool {
    match (expected, actual) {
        (Object::List(a), Object::List(b)) => items_close(&a.borrow(), &b.borrow(), tolerance),
        (Object::Tuple(a), Object::Tuple(b)) => items_close(a, b, tolerance),
        (Object::Bool(_), _) | (_, Object::Bool(_)) => expected == actual,
        _ => match (expected.as_f64(), actual.as_f64()) {
            (Some(a), Some(b)) => (a - b).abs() <= tolerance,
            _ => expected == actual,
        },
    }
}

fn items_close(expected: &[Object], actual: &[Object], tolerance: f64) -> bool {
    expected.len() == actual.len() && expected.iter().zip(actual).all(|(a, b)| close(a, b, tolerance))
}

fn collection_items(value: &Object) -> Option<Vec<Object>> {
    match value {
        Object::List(items) => Some(items.borrow().clone()),
        Object::Tuple(items) => Some(items.to_vec()),
        Object::Set(items) => Some(items.borrow().iter().cloned().collect()),
        Object::Dict(map) => Some(map.borrow().keys().cloned().collect()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_in_any_order() {
        assert!(unordered_lines("a\nb\nb\n", "b\na\nb\n"));
        assert!(!unordered_lines("a\nb\n", "a\na\n"));
    }

    #[test]
    fn items_as_multiset() {
        let expected = Object::list(vec![Object::Int(1), Object::list(vec![]), Object::Int(1)]);
        let actual = Object::tuple(vec![Object::list(vec![]), Object::Int(1), Object::Int(1)]);
        assert!(unordered_items(&expected, &actual));
        let short = Object::list(vec![Object::Int(1), Object::list(vec![]), Object::Int(2)]);
        assert!(!unordered_items(&expected, &short));
    }

    #[test]
    fn floats_within_tolerance() {
        let cmp = float_close(1e-6);
        assert!(cmp(&Object::Float(0.3), &Object::Float(0.1 + 0.2)));
        assert!(cmp(&Object::Int(2), &Object::Float(2.000_000_1)));
        let expected = Object::list(vec![Object::Float(1.0), Object::str("x")]);
        let actual = Object::list(vec![Object::Float(1.000_000_5), Object::str("x")]);
        assert!(cmp(&expected, &actual));
        assert!(!cmp(&Object::Float(1.0), &Object::Float(1.1)));
    }
}
