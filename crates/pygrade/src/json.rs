//! Conversion between JSON and sandbox values, used by suite files and reports.
//!
//! Plain JSON maps onto the obvious Python values. Values JSON cannot express use a
//! single-key tagged object:
//!
//! - `{"$tuple": [...]}` for tuples
//! - `{"$set": [...]}` for sets
//! - `{"$bigint": "123..."}` for integers outside the `i64` range
//!
//! Dict keys are always strings.

use num_bigint::BigInt;
use serde_json::{Map, Value as JV, json};
use thiserror::Error;

use crate::object::Object;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum JsonValueError {
    #[error("unhashable element in $set: {0}")]
    Unhashable(String),
    #[error("invalid $bigint literal: {0}")]
    BigInt(String),
    #[error("number out of range: {0}")]
    Number(String),
}

impl Object {
    /// Builds a sandbox value from JSON.
    pub fn from_json_value(value: &JV) -> Result<Self, JsonValueError> {
        Ok(match value {
            JV::Null => Self::None,
            JV::Bool(b) => Self::Bool(*b),
            JV::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::Int(i)
                } else if let Some(u) = n.as_u64() {
                    Self::from_bigint(BigInt::from(u))
                } else if let Some(f) = n.as_f64() {
                    Self::Float(f)
                } else {
                    return Err(JsonValueError::Number(n.to_string()));
                }
            }
            JV::String(s) => Self::str(s),
            JV::Array(items) => Self::list(from_json_items(items)?),
            JV::Object(map) => match single_tag(map) {
                Some(("$tuple", JV::Array(items))) => Self::tuple(from_json_items(items)?),
                Some(("$set", JV::Array(items))) => {
                    let items = from_json_items(items)?;
                    if let Some(bad) = items.iter().find(|item| !item.is_hashable()) {
                        return Err(JsonValueError::Unhashable(bad.py_repr()));
                    }
                    Self::set(items)
                }
                Some(("$bigint", JV::String(digits))) => {
                    let parsed = digits
                        .parse::<BigInt>()
                        .map_err(|_| JsonValueError::BigInt(digits.clone()))?;
                    Self::from_bigint(parsed)
                }
                _ => {
                    let mut pairs = Vec::with_capacity(map.len());
                    for (key, value) in map {
                        pairs.push((Self::str(key), Self::from_json_value(value)?));
                    }
                    Self::dict(pairs)
                }
            },
        })
    }

    /// JSON form of a value, using the tagged objects for tuples, sets and big integers.
    ///
    /// Values without a JSON form (functions, modules, ...) become `{"$repr": "..."}`.
    #[must_use]
    pub fn to_json_value(&self) -> JV {
        match self {
            Self::None => JV::Null,
            Self::Bool(b) => JV::Bool(*b),
            Self::Int(i) => json!(i),
            Self::BigInt(b) => json!({"$bigint": b.to_string()}),
            Self::Float(f) if f.is_finite() => json!(f),
            Self::Str(s) => JV::String(s.to_string()),
            Self::List(items) => JV::Array(items.borrow().iter().map(Self::to_json_value).collect()),
            Self::Tuple(items) => json!({"$tuple": items.iter().map(Self::to_json_value).collect::<Vec<_>>()}),
            Self::Set(items) => json!({"$set": items.borrow().iter().map(Self::to_json_value).collect::<Vec<_>>()}),
            Self::Dict(map) => {
                let object: Map<String, JV> = map
                    .borrow()
                    .iter()
                    .map(|(k, v)| {
                        let key = match k {
                            Self::Str(s) => s.to_string(),
                            other => other.py_repr(),
                        };
                        (key, v.to_json_value())
                    })
                    .collect();
                JV::Object(object)
            }
            other => json!({"$repr": other.py_repr()}),
        }
    }
}

fn from_json_items(items: &[JV]) -> Result<Vec<Object>, JsonValueError> {
    items.iter().map(Object::from_json_value).collect()
}

fn single_tag(map: &Map<String, JV>) -> Option<(&str, &JV)> {
    if map.len() != 1 {
        return None;
    }
    map.iter()
        .next()
        .filter(|(key, _)| key.starts_with('$'))
        .map(|(key, value)| (key.as_str(), value))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn tagged_values() {
        let value = json!({"point": {"$tuple": [1, 2]}, "tags": {"$set": ["a"]}, "n": 2.5});
        let object = Object::from_json_value(&value).unwrap();
        assert_eq!(object.py_repr(), "{'point': (1, 2), 'tags': {'a'}, 'n': 2.5}");
    }

    #[test]
    fn unhashable_set_element() {
        let err = Object::from_json_value(&json!({"$set": [[1]]})).unwrap_err();
        assert_eq!(err, JsonValueError::Unhashable("[1]".to_owned()));
    }

    #[test]
    fn to_json_tags_tuples() {
        let object = Object::tuple(vec![Object::Int(1), Object::None]);
        assert_eq!(object.to_json_value(), json!({"$tuple": [1, null]}));
    }
}
