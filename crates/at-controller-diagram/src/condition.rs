//! Predicate trees evaluated against a subject value.

use serde_json::Value;

use crate::expr::{BinaryOp, Expr, UnaryOp};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl CompareOp {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "eq" => CompareOp::Eq,
            "ne" => CompareOp::Ne,
            "gt" => CompareOp::Gt,
            "gte" => CompareOp::Gte,
            "lt" => CompareOp::Lt,
            "lte" => CompareOp::Lte,
            _ => return None,
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            CompareOp::Eq => "eq",
            CompareOp::Ne => "ne",
            CompareOp::Gt => "gt",
            CompareOp::Gte => "gte",
            CompareOp::Lt => "lt",
            CompareOp::Lte => "lte",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InclusionOp {
    /// Subject is a member of the literal.
    In,
    NotIn,
    /// Literal is a member of the subject.
    Includes,
    NotIncludes,
}

impl InclusionOp {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "in" => InclusionOp::In,
            "not_in" => InclusionOp::NotIn,
            "includes" => InclusionOp::Includes,
            "not_includes" => InclusionOp::NotIncludes,
            _ => return None,
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            InclusionOp::In => "in",
            InclusionOp::NotIn => "not_in",
            InclusionOp::Includes => "includes",
            InclusionOp::NotIncludes => "not_includes",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Compare {
        op: CompareOp,
        value: Value,
    },
    Inclusion {
        op: InclusionOp,
        value: Value,
    },
    /// Evaluates every child, even once the outcome is known.
    And(Vec<Condition>),
    /// Evaluates every child, even once the outcome is known.
    Or(Vec<Condition>),
    Not(Box<Condition>),
    Unary {
        op: UnaryOp,
        condition: Option<Box<Condition>>,
    },
    Binary {
        op: BinaryOp,
        argument: Value,
        condition: Option<Box<Condition>>,
    },
}

impl Condition {
    pub fn eq(value: impl Into<Value>) -> Self {
        Condition::Compare {
            op: CompareOp::Eq,
            value: value.into(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Condition::Compare { op, .. } => op.name(),
            Condition::Inclusion { op, .. } => op.name(),
            Condition::And(_) => "and",
            Condition::Or(_) => "or",
            Condition::Not(_) => "not",
            Condition::Unary { op, .. } => op.name(),
            Condition::Binary { op, .. } => op.name(),
        }
    }
}

/// Trigger condition of an event transition.
#[derive(Debug, Clone)]
pub enum Guard {
    Condition(Condition),
    /// Function-grammar guard; its truthiness decides, with the checked data as event data.
    Function(Expr),
}

impl From<Condition> for Guard {
    fn from(condition: Condition) -> Self {
        Guard::Condition(condition)
    }
}
