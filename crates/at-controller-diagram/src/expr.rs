//! Value-producing expressions embedded in diagram documents.

use indexmap::IndexMap;
use regex::Regex;
use serde_json::Value;

/// A literal tree that may contain function calls anywhere inside it.
///
/// Subtrees without calls are collapsed into `Literal` at load time.
#[derive(Debug, Clone)]
pub enum Expr {
    Literal(Value),
    List(Vec<Expr>),
    Map(IndexMap<String, Expr>),
    Call(Box<Function>),
}

impl Expr {
    pub fn literal(value: impl Into<Value>) -> Self {
        Expr::Literal(value.into())
    }

    pub fn call(function: Function) -> Self {
        Expr::Call(Box::new(function))
    }

    pub fn is_call(&self) -> bool {
        matches!(self, Expr::Call(_))
    }

    pub fn has_calls(&self) -> bool {
        match self {
            Expr::Literal(_) => false,
            Expr::Call(_) => true,
            Expr::List(items) => items.iter().any(Expr::has_calls),
            Expr::Map(entries) => entries.values().any(Expr::has_calls),
        }
    }

    pub fn as_literal(&self) -> Option<&Value> {
        match self {
            Expr::Literal(value) => Some(value),
            _ => None,
        }
    }
}

impl Default for Expr {
    fn default() -> Self {
        Expr::Literal(Value::Null)
    }
}

#[derive(Debug, Clone)]
pub enum Function {
    GetAttribute(Expr),
    FrameUrl(FrameUrl),
    AuthToken,
    EventData(Vec<PathSegment>),
    InitialEventData(Vec<PathSegment>),
    And(Vec<Expr>),
    Or(Vec<Expr>),
    Not(Expr),
    StateAttr(Expr),
    Unary {
        op: UnaryOp,
        value: Expr,
    },
    Binary {
        op: BinaryOp,
        left: Expr,
        right: Expr,
    },
}

impl Function {
    pub fn name(&self) -> &'static str {
        match self {
            Function::GetAttribute(_) => "get_attribute",
            Function::FrameUrl(_) => "frame_url",
            Function::AuthToken => "auth_token",
            Function::EventData(_) => "event_data",
            Function::InitialEventData(_) => "initial_event_data",
            Function::And(_) => "and",
            Function::Or(_) => "or",
            Function::Not(_) => "not",
            Function::StateAttr(_) => "state_attr",
            Function::Unary { op, .. } => op.name(),
            Function::Binary { op, .. } => op.name(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FrameUrl {
    pub frame_id: Expr,
    pub extract: UrlExtract,
}

#[derive(Debug, Clone)]
pub enum UrlExtract {
    Whole,
    /// Anchored at the start of the URL; `group` indexes capture groups from 0.
    Pattern { regex: Regex, group: usize },
    QueryParam { param: String, index: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        PathSegment::Key(key.to_string())
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        PathSegment::Index(index)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Len,
    Sqrt,
    Abs,
    Ceil,
    Floor,
    Round,
    Sign,
    Log,
    Exp,
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Neg,
    Transpose,
    Det,
    Inv,
    Norm,
    Trace,
    IsNull,
}

impl UnaryOp {
    pub const ALL: [UnaryOp; 22] = [
        UnaryOp::Len,
        UnaryOp::Sqrt,
        UnaryOp::Abs,
        UnaryOp::Ceil,
        UnaryOp::Floor,
        UnaryOp::Round,
        UnaryOp::Sign,
        UnaryOp::Log,
        UnaryOp::Exp,
        UnaryOp::Sin,
        UnaryOp::Cos,
        UnaryOp::Tan,
        UnaryOp::Asin,
        UnaryOp::Acos,
        UnaryOp::Atan,
        UnaryOp::Neg,
        UnaryOp::Transpose,
        UnaryOp::Det,
        UnaryOp::Inv,
        UnaryOp::Norm,
        UnaryOp::Trace,
        UnaryOp::IsNull,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            UnaryOp::Len => "len",
            UnaryOp::Sqrt => "sqrt",
            UnaryOp::Abs => "abs",
            UnaryOp::Ceil => "ceil",
            UnaryOp::Floor => "floor",
            UnaryOp::Round => "round",
            UnaryOp::Sign => "sign",
            UnaryOp::Log => "log",
            UnaryOp::Exp => "exp",
            UnaryOp::Sin => "sin",
            UnaryOp::Cos => "cos",
            UnaryOp::Tan => "tan",
            UnaryOp::Asin => "asin",
            UnaryOp::Acos => "acos",
            UnaryOp::Atan => "atan",
            UnaryOp::Neg => "neg",
            UnaryOp::Transpose => "transpose",
            UnaryOp::Det => "det",
            UnaryOp::Inv => "inv",
            UnaryOp::Norm => "norm",
            UnaryOp::Trace => "trace",
            UnaryOp::IsNull => "is_null",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.name() == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    LogicalAnd,
    LogicalOr,
    Xor,
    Max,
    Min,
    Equal,
    NotEqual,
    LessThan,
    LessOrEqual,
    GreaterThan,
    GreaterOrEqual,
    StateAttr,
    GetAttr,
    HasAttr,
}

impl BinaryOp {
    pub const ALL: [BinaryOp; 20] = [
        BinaryOp::Add,
        BinaryOp::Sub,
        BinaryOp::Mul,
        BinaryOp::Div,
        BinaryOp::Mod,
        BinaryOp::Pow,
        BinaryOp::LogicalAnd,
        BinaryOp::LogicalOr,
        BinaryOp::Xor,
        BinaryOp::Max,
        BinaryOp::Min,
        BinaryOp::Equal,
        BinaryOp::NotEqual,
        BinaryOp::LessThan,
        BinaryOp::LessOrEqual,
        BinaryOp::GreaterThan,
        BinaryOp::GreaterOrEqual,
        BinaryOp::StateAttr,
        BinaryOp::GetAttr,
        BinaryOp::HasAttr,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            BinaryOp::Add => "add",
            BinaryOp::Sub => "sub",
            BinaryOp::Mul => "mul",
            BinaryOp::Div => "div",
            BinaryOp::Mod => "mod",
            BinaryOp::Pow => "pow",
            BinaryOp::LogicalAnd => "logical_and",
            BinaryOp::LogicalOr => "logical_or",
            BinaryOp::Xor => "xor",
            BinaryOp::Max => "max",
            BinaryOp::Min => "min",
            BinaryOp::Equal => "equal",
            BinaryOp::NotEqual => "not_equal",
            BinaryOp::LessThan => "less_than",
            BinaryOp::LessOrEqual => "less_or_equal",
            BinaryOp::GreaterThan => "greater_than",
            BinaryOp::GreaterOrEqual => "greater_or_equal",
            BinaryOp::StateAttr => "state_attr",
            BinaryOp::GetAttr => "get_attr",
            BinaryOp::HasAttr => "has_attr",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.name() == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_op_names_roundtrip() {
        for op in UnaryOp::ALL {
            assert_eq!(UnaryOp::from_name(op.name()), Some(op));
        }
        for op in BinaryOp::ALL {
            assert_eq!(BinaryOp::from_name(op.name()), Some(op));
        }
        assert_eq!(UnaryOp::from_name("frobnicate"), None);
    }

    #[test]
    fn test_has_calls() {
        let plain = Expr::List(vec![Expr::literal(1), Expr::literal(json!("a"))]);
        assert!(!plain.has_calls());

        let mut map = IndexMap::new();
        map.insert("token".to_string(), Expr::call(Function::AuthToken));
        assert!(Expr::Map(map).has_calls());
    }
}
