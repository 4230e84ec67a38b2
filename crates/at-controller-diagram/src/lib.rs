//! Diagram model for the AT controller: states, transitions, events and
//! the expression, condition and action trees they carry.

pub mod action;
pub mod condition;
pub mod config;
pub mod diagram;
pub mod expr;
pub mod model;
pub mod parse;

pub use action::{Action, ActionKind};
pub use condition::{CompareOp, Condition, Guard, InclusionOp};
pub use config::DiagramDocument;
pub use diagram::{Diagram, DiagramOutline, OutlineTransition};
pub use expr::{BinaryOp, Expr, FrameUrl, Function, PathSegment, UnaryOp, UrlExtract};
pub use model::{
    Event, EventHandler, Frame, FrameKind, InitialAttribute, LinkPosition, Span, State,
    Transition, TransitionKind,
};
pub use parse::{parse_action, parse_actions, parse_condition, parse_expr, parse_guard};
