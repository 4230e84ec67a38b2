//! Predicate evaluation against a subject value.

use std::cmp::Ordering;

use at_controller_core::value::{compare, contains, is_truthy, loose_eq};
use at_controller_core::{AttributeStore, Result};
use at_controller_diagram::{CompareOp, Condition, Guard, InclusionOp};
use serde_json::Value;

use crate::evaluator::{Scope, evaluate};
use crate::operations::{apply_binary, apply_unary};

/// Checks `condition` against `subject`.
///
/// Comparison, inclusion and logical nodes produce booleans. An operation
/// node without a sub-condition produces the transformed subject, so the
/// caller sees e.g. `5.0` for `{div: 2}` applied to `10`.
pub fn check(condition: &Condition, subject: &Value, attributes: &AttributeStore) -> Result<Value> {
    match condition {
        Condition::Compare { op, value } => {
            let holds = match op {
                CompareOp::Eq => loose_eq(subject, value),
                CompareOp::Ne => !loose_eq(subject, value),
                CompareOp::Gt => compare(subject, value)? == Ordering::Greater,
                CompareOp::Gte => compare(subject, value)? != Ordering::Less,
                CompareOp::Lt => compare(subject, value)? == Ordering::Less,
                CompareOp::Lte => compare(subject, value)? != Ordering::Greater,
            };
            Ok(Value::Bool(holds))
        }
        Condition::Inclusion { op, value } => {
            let holds = match op {
                InclusionOp::In => contains(value, subject)?,
                InclusionOp::NotIn => !contains(value, subject)?,
                InclusionOp::Includes => contains(subject, value)?,
                InclusionOp::NotIncludes => !contains(subject, value)?,
            };
            Ok(Value::Bool(holds))
        }
        Condition::And(children) => {
            let results = check_all(children, subject, attributes)?;
            Ok(Value::Bool(results.iter().all(|&r| r)))
        }
        Condition::Or(children) => {
            let results = check_all(children, subject, attributes)?;
            Ok(Value::Bool(results.iter().any(|&r| r)))
        }
        Condition::Not(inner) => Ok(Value::Bool(!holds(inner, subject, attributes)?)),
        Condition::Unary { op, condition } => {
            let value = apply_unary(*op, subject)?;
            then_check(condition.as_deref(), value, attributes)
        }
        Condition::Binary {
            op,
            argument,
            condition,
        } => {
            let value = apply_binary(*op, subject, argument, attributes)?;
            then_check(condition.as_deref(), value, attributes)
        }
    }
}

/// Truthiness of [`check`].
pub fn holds(condition: &Condition, subject: &Value, attributes: &AttributeStore) -> Result<bool> {
    check(condition, subject, attributes).map(|v| is_truthy(&v))
}

// every child runs, so a failing later child surfaces even when an earlier
// one already decided the outcome
fn check_all(children: &[Condition], subject: &Value, attributes: &AttributeStore) -> Result<Vec<bool>> {
    children
        .iter()
        .map(|child| holds(child, subject, attributes))
        .collect()
}

fn then_check(condition: Option<&Condition>, value: Value, attributes: &AttributeStore) -> Result<Value> {
    match condition {
        Some(condition) => check(condition, &value, attributes),
        None => Ok(value),
    }
}

/// Decides whether a guarded transition may fire for `data`.
///
/// Function guards see `data` as their event data.
pub fn guard_allows(guard: &Guard, data: &Value, scope: &Scope<'_>) -> Result<bool> {
    match guard {
        Guard::Condition(condition) => holds(condition, data, scope.attributes),
        Guard::Function(expr) => {
            let scope = scope.with_event_data(data);
            evaluate(expr, &scope).map(|v| is_truthy(&v))
        }
    }
}
