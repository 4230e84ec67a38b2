//! Unary and binary operations shared by conditions and functions.
//!
//! Integer arithmetic stays integral and is overflow-checked, `div` is true
//! division, `mod` takes the sign of the divisor and `round` ties to even.

use std::cmp::Ordering;

use at_controller_core::value::{
    Num, compare, contains, float_value, is_truthy, kind_name, loose_eq, to_display,
};
use at_controller_core::{AttributeStore, ControllerError, Result};
use at_controller_diagram::{BinaryOp, UnaryOp};
use serde_json::Value;

fn computation(message: impl Into<String>) -> ControllerError {
    ControllerError::computation(message)
}

fn domain_error() -> ControllerError {
    computation("math domain error")
}

fn overflow(op: &str) -> ControllerError {
    computation(format!("integer overflow in {}", op))
}

fn number(op: &str, value: &Value) -> Result<Num> {
    Num::from_value(value).ok_or_else(|| {
        computation(format!(
            "bad operand type for {}: '{}'",
            op,
            kind_name(value)
        ))
    })
}

fn float_to_int(f: f64) -> Result<Value> {
    if f.is_finite() && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Ok(Value::from(f as i64))
    } else {
        Err(computation(format!("cannot convert {} to integer", f)))
    }
}

pub fn apply_unary(op: UnaryOp, value: &Value) -> Result<Value> {
    let name = op.name();
    match op {
        UnaryOp::Len => match value {
            Value::String(s) => Ok(Value::from(s.chars().count())),
            Value::Array(items) => Ok(Value::from(items.len())),
            Value::Object(map) => Ok(Value::from(map.len())),
            other => Err(computation(format!(
                "object of type '{}' has no len()",
                kind_name(other)
            ))),
        },
        UnaryOp::Sqrt => {
            let x = number(name, value)?.as_f64();
            if x < 0.0 {
                return Err(domain_error());
            }
            float_value(x.sqrt())
        }
        UnaryOp::Abs => match number(name, value)? {
            Num::Int(i) => i.checked_abs().map(Value::from).ok_or_else(|| overflow(name)),
            Num::Float(f) => float_value(f.abs()),
        },
        UnaryOp::Ceil => match number(name, value)? {
            Num::Int(i) => Ok(Value::from(i)),
            Num::Float(f) => float_to_int(f.ceil()),
        },
        UnaryOp::Floor => match number(name, value)? {
            Num::Int(i) => Ok(Value::from(i)),
            Num::Float(f) => float_to_int(f.floor()),
        },
        UnaryOp::Round => match number(name, value)? {
            Num::Int(i) => Ok(Value::from(i)),
            Num::Float(f) => float_to_int(f.round_ties_even()),
        },
        UnaryOp::Sign => float_value(1f64.copysign(number(name, value)?.as_f64())),
        UnaryOp::Log => {
            let x = number(name, value)?.as_f64();
            if x <= 0.0 {
                return Err(domain_error());
            }
            float_value(x.ln())
        }
        UnaryOp::Exp => float_value(number(name, value)?.as_f64().exp()),
        UnaryOp::Sin => float_value(number(name, value)?.as_f64().sin()),
        UnaryOp::Cos => float_value(number(name, value)?.as_f64().cos()),
        UnaryOp::Tan => float_value(number(name, value)?.as_f64().tan()),
        UnaryOp::Asin | UnaryOp::Acos => {
            let x = number(name, value)?.as_f64();
            if !(-1.0..=1.0).contains(&x) {
                return Err(domain_error());
            }
            float_value(if op == UnaryOp::Asin { x.asin() } else { x.acos() })
        }
        UnaryOp::Atan => float_value(number(name, value)?.as_f64().atan()),
        UnaryOp::Neg => match number(name, value)? {
            Num::Int(i) => i.checked_neg().map(Value::from).ok_or_else(|| overflow(name)),
            Num::Float(f) => float_value(-f),
        },
        UnaryOp::Transpose => transpose(value),
        UnaryOp::Det => float_value(determinant(square_matrix(name, value)?)),
        UnaryOp::Inv => {
            let inverse = inverse(square_matrix(name, value)?)?;
            let rows = inverse
                .into_iter()
                .map(|row| {
                    row.into_iter()
                        .map(float_value)
                        .collect::<Result<Vec<_>>>()
                        .map(Value::Array)
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(Value::Array(rows))
        }
        UnaryOp::Norm => norm(value),
        UnaryOp::Trace => trace(value),
        UnaryOp::IsNull => Ok(Value::Bool(value.is_null())),
    }
}

/// Applies `op` with `left` as the subject and `right` as the argument.
pub fn apply_binary(
    op: BinaryOp,
    left: &Value,
    right: &Value,
    attributes: &AttributeStore,
) -> Result<Value> {
    let name = op.name();
    match op {
        BinaryOp::Add => match (left, right) {
            (Value::String(a), Value::String(b)) => Ok(Value::String(format!("{}{}", a, b))),
            (Value::Array(a), Value::Array(b)) => {
                Ok(Value::Array(a.iter().chain(b).cloned().collect()))
            }
            _ => arithmetic(name, left, right, i64::checked_add, |a, b| a + b),
        },
        BinaryOp::Sub => arithmetic(name, left, right, i64::checked_sub, |a, b| a - b),
        BinaryOp::Mul => multiply(left, right),
        BinaryOp::Div => {
            let divisor = number(name, right)?.as_f64();
            let dividend = number(name, left)?.as_f64();
            if divisor == 0.0 {
                return Err(computation("division by zero"));
            }
            float_value(dividend / divisor)
        }
        BinaryOp::Mod => modulo(left, right),
        BinaryOp::Pow => power(left, right),
        BinaryOp::LogicalAnd => Ok(if is_truthy(left) { right } else { left }.clone()),
        BinaryOp::LogicalOr => Ok(if is_truthy(left) { left } else { right }.clone()),
        BinaryOp::Xor => match (left, right) {
            (Value::Bool(a), Value::Bool(b)) => Ok(Value::Bool(a ^ b)),
            _ => match (number(name, left)?, number(name, right)?) {
                (Num::Int(a), Num::Int(b)) => Ok(Value::from(a ^ b)),
                _ => Err(computation(format!(
                    "unsupported operand types for xor: '{}' and '{}'",
                    kind_name(left),
                    kind_name(right)
                ))),
            },
        },
        BinaryOp::Max => {
            Ok(if compare(right, left)? == Ordering::Greater { right } else { left }.clone())
        }
        BinaryOp::Min => {
            Ok(if compare(right, left)? == Ordering::Less { right } else { left }.clone())
        }
        BinaryOp::Equal => Ok(Value::Bool(loose_eq(left, right))),
        BinaryOp::NotEqual => Ok(Value::Bool(!loose_eq(left, right))),
        BinaryOp::LessThan => Ok(Value::Bool(compare(left, right)? == Ordering::Less)),
        BinaryOp::LessOrEqual => Ok(Value::Bool(compare(left, right)? != Ordering::Greater)),
        BinaryOp::GreaterThan => Ok(Value::Bool(compare(left, right)? == Ordering::Greater)),
        BinaryOp::GreaterOrEqual => Ok(Value::Bool(compare(left, right)? != Ordering::Less)),
        BinaryOp::StateAttr => Ok(match right {
            Value::String(key) => attributes.get_or_null(key),
            _ => Value::Null,
        }),
        BinaryOp::GetAttr => get_item(left, right),
        BinaryOp::HasAttr => contains(left, right).map(Value::Bool),
    }
}

fn arithmetic(
    op: &str,
    left: &Value,
    right: &Value,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> Result<Value> {
    match (number(op, left)?, number(op, right)?) {
        (Num::Int(a), Num::Int(b)) => int_op(a, b).map(Value::from).ok_or_else(|| overflow(op)),
        (a, b) => float_value(float_op(a.as_f64(), b.as_f64())),
    }
}

/// Upper bound on the length of a string or list produced by `mul`.
pub const MAX_REPEAT_LEN: usize = 1 << 20;

fn repeat_count(value: &Value) -> Option<usize> {
    match Num::from_value(value) {
        Some(Num::Int(n)) => Some(usize::try_from(n.max(0)).unwrap_or(usize::MAX)),
        _ => None,
    }
}

fn repeated_len(len: usize, times: usize) -> Result<usize> {
    len.checked_mul(times)
        .filter(|total| *total <= MAX_REPEAT_LEN)
        .ok_or_else(|| computation("repeated sequence is too long"))
}

fn multiply(left: &Value, right: &Value) -> Result<Value> {
    match (left, right) {
        (Value::String(s), count) | (count, Value::String(s)) => {
            if let Some(times) = repeat_count(count) {
                repeated_len(s.len(), times)?;
                return Ok(Value::String(s.repeat(times)));
            }
        }
        (Value::Array(items), count) | (count, Value::Array(items)) => {
            if let Some(times) = repeat_count(count) {
                repeated_len(items.len(), times)?;
                return Ok(Value::Array(
                    std::iter::repeat_n(items.iter(), times)
                        .flatten()
                        .cloned()
                        .collect(),
                ));
            }
        }
        _ => {}
    }
    arithmetic("mul", left, right, i64::checked_mul, |a, b| a * b)
}

fn modulo(left: &Value, right: &Value) -> Result<Value> {
    match (number("mod", left)?, number("mod", right)?) {
        (Num::Int(a), Num::Int(b)) => {
            if b == 0 {
                return Err(computation("integer modulo by zero"));
            }
            let mut r = a.checked_rem(b).ok_or_else(|| overflow("mod"))?;
            if r != 0 && (r < 0) != (b < 0) {
                r += b;
            }
            Ok(Value::from(r))
        }
        (a, b) => {
            let (a, b) = (a.as_f64(), b.as_f64());
            if b == 0.0 {
                return Err(computation("float modulo by zero"));
            }
            let mut r = a % b;
            if r != 0.0 && (r < 0.0) != (b < 0.0) {
                r += b;
            }
            float_value(r)
        }
    }
}

fn power(left: &Value, right: &Value) -> Result<Value> {
    match (number("pow", left)?, number("pow", right)?) {
        (Num::Int(a), Num::Int(b)) if b >= 0 => u32::try_from(b)
            .ok()
            .and_then(|exp| a.checked_pow(exp))
            .map(Value::from)
            .ok_or_else(|| overflow("pow")),
        (a, b) => {
            let (a, b) = (a.as_f64(), b.as_f64());
            if a == 0.0 && b < 0.0 {
                return Err(computation("0.0 cannot be raised to a negative power"));
            }
            if a < 0.0 && b.fract() != 0.0 {
                return Err(computation("negative number cannot be raised to a fractional power"));
            }
            float_value(a.powf(b))
        }
    }
}

fn get_item(container: &Value, key: &Value) -> Result<Value> {
    match container {
        Value::Object(map) => match key {
            Value::String(k) => map
                .get(k)
                .cloned()
                .ok_or_else(|| ControllerError::KeyNotFound(k.clone())),
            other => Err(ControllerError::KeyNotFound(to_display(other))),
        },
        Value::Array(items) => {
            let index = sequence_index(key, items.len())?;
            Ok(items[index].clone())
        }
        Value::String(s) => {
            let chars: Vec<char> = s.chars().collect();
            let index = sequence_index(key, chars.len())?;
            Ok(Value::String(chars[index].to_string()))
        }
        other => Err(computation(format!(
            "'{}' object is not subscriptable",
            kind_name(other)
        ))),
    }
}

/// Resolves a possibly negative index against a sequence of `len` items.
fn sequence_index(key: &Value, len: usize) -> Result<usize> {
    let Some(Num::Int(index)) = Num::from_value(key) else {
        return Err(computation(format!(
            "indices must be integers, not {}",
            kind_name(key)
        )));
    };
    let resolved = if index < 0 { len as i64 + index } else { index };
    if resolved < 0 || resolved >= len as i64 {
        return Err(computation("index out of range"));
    }
    Ok(resolved as usize)
}

fn transpose(value: &Value) -> Result<Value> {
    let Value::Array(rows) = value else {
        return Err(computation(format!(
            "transpose expects a list, got '{}'",
            kind_name(value)
        )));
    };
    if !rows.iter().any(Value::is_array) {
        return Ok(value.clone());
    }
    let rows = rows
        .iter()
        .map(|row| {
            row.as_array()
                .ok_or_else(|| computation("transpose expects a rectangular matrix"))
        })
        .collect::<Result<Vec<_>>>()?;
    let width = rows.first().map(|r| r.len()).unwrap_or_default();
    if rows.iter().any(|r| r.len() != width) {
        return Err(computation("transpose expects a rectangular matrix"));
    }
    Ok(Value::Array(
        (0..width)
            .map(|col| Value::Array(rows.iter().map(|row| row[col].clone()).collect()))
            .collect(),
    ))
}

fn num_matrix(op: &str, value: &Value) -> Result<Vec<Vec<Num>>> {
    let rows = value.as_array().ok_or_else(|| {
        computation(format!(
            "{} expects a matrix, got '{}'",
            op,
            kind_name(value)
        ))
    })?;
    let mut matrix = Vec::with_capacity(rows.len());
    for row in rows {
        let row = row.as_array().ok_or_else(|| {
            computation(format!("{} expects a two-dimensional matrix", op))
        })?;
        matrix.push(row.iter().map(|v| number(op, v)).collect::<Result<Vec<_>>>()?);
    }
    if let Some(first) = matrix.first() {
        if matrix.iter().any(|row| row.len() != first.len()) {
            return Err(computation(format!("{} expects a rectangular matrix", op)));
        }
    }
    Ok(matrix)
}

fn square_matrix(op: &str, value: &Value) -> Result<Vec<Vec<f64>>> {
    let matrix = num_matrix(op, value)?;
    if matrix.iter().any(|row| row.len() != matrix.len()) {
        return Err(computation(format!("{} expects a square matrix", op)));
    }
    Ok(matrix
        .into_iter()
        .map(|row| row.into_iter().map(Num::as_f64).collect())
        .collect())
}

fn pivot_row(m: &[Vec<f64>], col: usize) -> usize {
    (col..m.len())
        .max_by(|&a, &b| m[a][col].abs().total_cmp(&m[b][col].abs()))
        .unwrap_or(col)
}

fn determinant(mut m: Vec<Vec<f64>>) -> f64 {
    let n = m.len();
    let mut det = 1.0;
    for col in 0..n {
        let pivot = pivot_row(&m, col);
        if m[pivot][col] == 0.0 {
            return 0.0;
        }
        if pivot != col {
            m.swap(pivot, col);
            det = -det;
        }
        det *= m[col][col];
        let top = m[col].clone();
        for row in m.iter_mut().skip(col + 1) {
            let factor = row[col] / top[col];
            for k in col..n {
                row[k] -= factor * top[k];
            }
        }
    }
    det
}

fn inverse(mut m: Vec<Vec<f64>>) -> Result<Vec<Vec<f64>>> {
    let n = m.len();
    let mut inv: Vec<Vec<f64>> = (0..n)
        .map(|i| (0..n).map(|j| if i == j { 1.0 } else { 0.0 }).collect())
        .collect();

    for col in 0..n {
        let pivot = pivot_row(&m, col);
        if m[pivot][col].abs() < 1e-12 {
            return Err(computation("singular matrix"));
        }
        m.swap(pivot, col);
        inv.swap(pivot, col);

        let scale = m[col][col];
        m[col].iter_mut().for_each(|x| *x /= scale);
        inv[col].iter_mut().for_each(|x| *x /= scale);

        let (top, top_inv) = (m[col].clone(), inv[col].clone());
        for row in 0..n {
            if row == col {
                continue;
            }
            let factor = m[row][col];
            if factor == 0.0 {
                continue;
            }
            for k in 0..n {
                m[row][k] -= factor * top[k];
                inv[row][k] -= factor * top_inv[k];
            }
        }
    }
    Ok(inv)
}

fn norm(value: &Value) -> Result<Value> {
    let squares: f64 = match value {
        Value::Array(items) if items.iter().any(Value::is_array) => num_matrix("norm", value)?
            .into_iter()
            .flatten()
            .map(|x| x.as_f64().powi(2))
            .sum(),
        Value::Array(items) => items
            .iter()
            .map(|v| number("norm", v).map(|x| x.as_f64().powi(2)))
            .sum::<Result<f64>>()?,
        other => number("norm", other)?.as_f64().powi(2),
    };
    float_value(squares.sqrt())
}

fn trace(value: &Value) -> Result<Value> {
    let matrix = num_matrix("trace", value)?;
    let size = matrix
        .first()
        .map(|row| row.len().min(matrix.len()))
        .unwrap_or_default();
    let mut total = Num::Int(0);
    for (i, row) in matrix.iter().enumerate().take(size) {
        total = match (total, row[i]) {
            (Num::Int(a), Num::Int(b)) => Num::Int(a.checked_add(b).ok_or_else(|| overflow("trace"))?),
            (a, b) => Num::Float(a.as_f64() + b.as_f64()),
        };
    }
    total.into_value()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn unary(op: UnaryOp, value: Value) -> Result<Value> {
        apply_unary(op, &value)
    }

    fn binary(op: BinaryOp, left: Value, right: Value) -> Result<Value> {
        apply_binary(op, &left, &right, &AttributeStore::new())
    }

    #[test]
    fn test_integer_arithmetic_stays_integral() {
        assert_eq!(binary(BinaryOp::Add, json!(2), json!(3)).unwrap(), json!(5));
        assert_eq!(binary(BinaryOp::Add, json!(2), json!(0.5)).unwrap(), json!(2.5));
        assert_eq!(binary(BinaryOp::Mul, json!(4), json!(-2)).unwrap(), json!(-8));
        assert_eq!(binary(BinaryOp::Pow, json!(2), json!(10)).unwrap(), json!(1024));
        assert_eq!(binary(BinaryOp::Pow, json!(2), json!(-1)).unwrap(), json!(0.5));
    }

    #[test]
    fn test_overflow_is_an_error() {
        assert!(binary(BinaryOp::Add, json!(i64::MAX), json!(1)).is_err());
        assert!(binary(BinaryOp::Pow, json!(10), json!(100)).is_err());
        assert!(unary(UnaryOp::Neg, json!(i64::MIN)).is_err());
    }

    #[test]
    fn test_division_and_modulo() {
        assert_eq!(binary(BinaryOp::Div, json!(10), json!(2)).unwrap(), json!(5.0));
        assert_eq!(binary(BinaryOp::Div, json!(7), json!(2)).unwrap(), json!(3.5));
        assert!(binary(BinaryOp::Div, json!(1), json!(0)).is_err());
        assert_eq!(binary(BinaryOp::Mod, json!(-7), json!(3)).unwrap(), json!(2));
        assert_eq!(binary(BinaryOp::Mod, json!(7), json!(-3)).unwrap(), json!(-2));
        assert_eq!(binary(BinaryOp::Mod, json!(5.5), json!(2)).unwrap(), json!(1.5));
        assert!(binary(BinaryOp::Mod, json!(5), json!(0)).is_err());
    }

    #[test]
    fn test_sequences() {
        assert_eq!(binary(BinaryOp::Add, json!("ab"), json!("cd")).unwrap(), json!("abcd"));
        assert_eq!(binary(BinaryOp::Add, json!([1]), json!([2])).unwrap(), json!([1, 2]));
        assert_eq!(binary(BinaryOp::Mul, json!("ab"), json!(2)).unwrap(), json!("abab"));
        assert_eq!(binary(BinaryOp::Mul, json!(2), json!([0])).unwrap(), json!([0, 0]));
        assert!(binary(BinaryOp::Sub, json!("ab"), json!(1)).is_err());
    }

    #[test]
    fn test_oversized_repeat_is_an_error() {
        let err = binary(BinaryOp::Mul, json!("ab"), json!(i64::MAX)).unwrap_err();
        assert!(matches!(err, ControllerError::Computation(_)));
        let err = binary(BinaryOp::Mul, json!(i64::MAX), json!([1, 2])).unwrap_err();
        assert!(matches!(err, ControllerError::Computation(_)));
        assert!(binary(BinaryOp::Mul, json!("x"), json!(MAX_REPEAT_LEN as i64 + 1)).is_err());

        assert_eq!(binary(BinaryOp::Mul, json!("ab"), json!(-3)).unwrap(), json!(""));
        let filled = binary(BinaryOp::Mul, json!("x"), json!(MAX_REPEAT_LEN as i64)).unwrap();
        assert_eq!(filled.as_str().map(str::len), Some(MAX_REPEAT_LEN));
    }

    #[test]
    fn test_logical_value_semantics() {
        assert_eq!(binary(BinaryOp::LogicalAnd, json!(0), json!("x")).unwrap(), json!(0));
        assert_eq!(binary(BinaryOp::LogicalAnd, json!(1), json!("x")).unwrap(), json!("x"));
        assert_eq!(binary(BinaryOp::LogicalOr, json!(""), json!("y")).unwrap(), json!("y"));
        assert_eq!(binary(BinaryOp::Xor, json!(true), json!(false)).unwrap(), json!(true));
        assert_eq!(binary(BinaryOp::Xor, json!(6), json!(3)).unwrap(), json!(5));
        assert!(binary(BinaryOp::Xor, json!(1.5), json!(1)).is_err());
    }

    #[test]
    fn test_comparisons() {
        assert_eq!(binary(BinaryOp::Equal, json!(1), json!(1.0)).unwrap(), json!(true));
        assert_eq!(binary(BinaryOp::LessThan, json!("a"), json!("b")).unwrap(), json!(true));
        assert_eq!(binary(BinaryOp::GreaterOrEqual, json!(2), json!(2)).unwrap(), json!(true));
        assert_eq!(binary(BinaryOp::Max, json!(3), json!(7)).unwrap(), json!(7));
        assert_eq!(binary(BinaryOp::Min, json!(3), json!(7)).unwrap(), json!(3));
        assert!(binary(BinaryOp::LessThan, json!("a"), json!(1)).is_err());
    }

    #[test]
    fn test_attribute_access() {
        let attributes = AttributeStore::new();
        attributes.set("x", json!(42));
        assert_eq!(
            apply_binary(BinaryOp::StateAttr, &json!(null), &json!("x"), &attributes).unwrap(),
            json!(42)
        );
        assert_eq!(binary(BinaryOp::GetAttr, json!({"a": 1}), json!("a")).unwrap(), json!(1));
        assert!(matches!(
            binary(BinaryOp::GetAttr, json!({"a": 1}), json!("b")),
            Err(ControllerError::KeyNotFound(key)) if key == "b"
        ));
        assert_eq!(binary(BinaryOp::GetAttr, json!([1, 2, 3]), json!(-1)).unwrap(), json!(3));
        assert!(binary(BinaryOp::GetAttr, json!([1]), json!(5)).is_err());
        assert_eq!(binary(BinaryOp::HasAttr, json!({"a": 1}), json!("a")).unwrap(), json!(true));
        assert_eq!(binary(BinaryOp::HasAttr, json!([1, 2]), json!(3)).unwrap(), json!(false));
    }

    #[test]
    fn test_rounding() {
        assert_eq!(unary(UnaryOp::Round, json!(2.5)).unwrap(), json!(2));
        assert_eq!(unary(UnaryOp::Round, json!(3.5)).unwrap(), json!(4));
        assert_eq!(unary(UnaryOp::Ceil, json!(1.2)).unwrap(), json!(2));
        assert_eq!(unary(UnaryOp::Floor, json!(-1.2)).unwrap(), json!(-2));
        assert_eq!(unary(UnaryOp::Sign, json!(-3)).unwrap(), json!(-1.0));
        assert_eq!(unary(UnaryOp::Sign, json!(0)).unwrap(), json!(1.0));
    }

    #[test]
    fn test_math_domain() {
        assert_eq!(unary(UnaryOp::Sqrt, json!(9)).unwrap(), json!(3.0));
        assert!(unary(UnaryOp::Sqrt, json!(-1)).is_err());
        assert!(unary(UnaryOp::Log, json!(0)).is_err());
        assert!(unary(UnaryOp::Asin, json!(2)).is_err());
        assert!(unary(UnaryOp::Exp, json!(1000)).is_err());
        assert!(unary(UnaryOp::Sqrt, json!("9")).is_err());
    }

    #[test]
    fn test_len_and_is_null() {
        assert_eq!(unary(UnaryOp::Len, json!("héllo")).unwrap(), json!(5));
        assert_eq!(unary(UnaryOp::Len, json!({"a": 1})).unwrap(), json!(1));
        assert!(unary(UnaryOp::Len, json!(5)).is_err());
        assert_eq!(unary(UnaryOp::IsNull, json!(null)).unwrap(), json!(true));
        assert_eq!(unary(UnaryOp::IsNull, json!(0)).unwrap(), json!(false));
    }

    #[test]
    fn test_matrices() {
        assert_eq!(
            unary(UnaryOp::Transpose, json!([[1, 2, 3], [4, 5, 6]])).unwrap(),
            json!([[1, 4], [2, 5], [3, 6]])
        );
        assert_eq!(unary(UnaryOp::Transpose, json!([1, 2])).unwrap(), json!([1, 2]));

        let det = unary(UnaryOp::Det, json!([[1, 2], [3, 4]])).unwrap();
        assert!((det.as_f64().unwrap() + 2.0).abs() < 1e-9);

        let inv = unary(UnaryOp::Inv, json!([[4, 7], [2, 6]])).unwrap();
        let expected = [[0.6, -0.7], [-0.2, 0.4]];
        for (i, row) in expected.iter().enumerate() {
            for (j, x) in row.iter().enumerate() {
                assert!((inv[i][j].as_f64().unwrap() - x).abs() < 1e-9);
            }
        }

        assert_eq!(unary(UnaryOp::Norm, json!([3, 4])).unwrap(), json!(5.0));
        assert_eq!(unary(UnaryOp::Trace, json!([[1, 2], [3, 4]])).unwrap(), json!(5));
    }

    #[test]
    fn test_malformed_matrices() {
        assert!(unary(UnaryOp::Det, json!([[1, 2, 3], [4, 5, 6]])).is_err());
        assert!(unary(UnaryOp::Inv, json!([[1, 2], [2, 4]])).is_err());
        assert!(unary(UnaryOp::Det, json!([[1, 2], [3]])).is_err());
        assert!(unary(UnaryOp::Trace, json!([1, 2])).is_err());
        assert!(unary(UnaryOp::Det, json!([["a", 1], [1, 1]])).is_err());
    }
}
