//! Dynamic value semantics shared by conditions, functions and templates.
//!
//! Values are plain `serde_json::Value`s. The helpers here give them the
//! loose semantics diagram authors expect: truthiness, numeric equality that
//! ignores the int/float split, ordering across comparable kinds and a
//! human-readable string form for interpolation.

use std::cmp::Ordering;

use serde_json::{Number, Value};

use crate::error::{ControllerError, Result};

/// A numeric view of a value. Booleans count as integers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Num {
    Int(i64),
    Float(f64),
}

impl Num {
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(Num::Int(i64::from(*b))),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(Num::Int(i))
                } else {
                    n.as_f64().map(Num::Float)
                }
            }
            _ => None,
        }
    }

    pub fn as_f64(self) -> f64 {
        match self {
            Num::Int(i) => i as f64,
            Num::Float(f) => f,
        }
    }

    pub fn into_value(self) -> Result<Value> {
        match self {
            Num::Int(i) => Ok(Value::from(i)),
            Num::Float(f) => float_value(f),
        }
    }
}

/// Wraps a float, rejecting NaN and infinities which have no JSON form.
pub fn float_value(f: f64) -> Result<Value> {
    Number::from_f64(f)
        .map(Value::Number)
        .ok_or_else(|| ControllerError::computation(format!("result {} is not a finite number", f)))
}

pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Equality where `1 == 1.0 == true`, applied recursively through containers.
pub fn loose_eq(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| loose_eq(x, y))
        }
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a
                    .iter()
                    .all(|(k, v)| b.get(k).map(|w| loose_eq(v, w)).unwrap_or(false))
        }
        _ => match (Num::from_value(left), Num::from_value(right)) {
            (Some(Num::Int(a)), Some(Num::Int(b))) => a == b,
            (Some(a), Some(b)) => a.as_f64() == b.as_f64(),
            _ => left == right,
        },
    }
}

/// Orders two values of comparable kinds; anything else is a computation error.
pub fn compare(left: &Value, right: &Value) -> Result<Ordering> {
    if let (Some(a), Some(b)) = (Num::from_value(left), Num::from_value(right)) {
        return match (a, b) {
            (Num::Int(x), Num::Int(y)) => Ok(x.cmp(&y)),
            _ => a.as_f64().partial_cmp(&b.as_f64()).ok_or_else(|| {
                ControllerError::computation("cannot order NaN values".to_string())
            }),
        };
    }

    match (left, right) {
        (Value::String(a), Value::String(b)) => Ok(a.cmp(b)),
        (Value::Array(a), Value::Array(b)) => {
            for (x, y) in a.iter().zip(b) {
                let ord = compare(x, y)?;
                if ord != Ordering::Equal {
                    return Ok(ord);
                }
            }
            Ok(a.len().cmp(&b.len()))
        }
        _ => Err(ControllerError::computation(format!(
            "'{}' and '{}' are not comparable",
            kind_name(left),
            kind_name(right)
        ))),
    }
}

/// Membership test `item in container`: list elements, substrings and map keys.
pub fn contains(container: &Value, item: &Value) -> Result<bool> {
    match container {
        Value::Array(items) => Ok(items.iter().any(|v| loose_eq(v, item))),
        Value::Object(map) => match item {
            Value::String(key) => Ok(map.contains_key(key)),
            Value::Number(_) | Value::Bool(_) | Value::Null => Ok(map.contains_key(&to_display(item))),
            _ => Err(ControllerError::computation(format!(
                "unhashable type '{}'",
                kind_name(item)
            ))),
        },
        Value::String(haystack) => match item {
            Value::String(needle) => Ok(haystack.contains(needle.as_str())),
            _ => Err(ControllerError::computation(format!(
                "'in <string>' requires string as left operand, not {}",
                kind_name(item)
            ))),
        },
        _ => Err(ControllerError::computation(format!(
            "argument of type '{}' is not iterable",
            kind_name(container)
        ))),
    }
}

/// String form used for interpolation: strings verbatim, scalars in their
/// conventional spelling, containers as JSON.
pub fn to_display(value: &Value) -> String {
    match value {
        Value::Null => "None".to_string(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Number(n) => {
            if n.is_f64() {
                let f = n.as_f64().unwrap_or_default();
                if f.fract() == 0.0 && f.abs() < 1e16 {
                    format!("{:.1}", f)
                } else {
                    f.to_string()
                }
            } else {
                n.to_string()
            }
        }
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "int",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}
