//! Runtime side of the AT controller: expression evaluation, conditions,
//! actions, page derivation and the per-session state machine.

pub mod actions;
pub mod conditions;
pub mod config;
pub mod evaluator;
pub mod machine;
pub mod operations;
pub mod page;
pub mod urls;

pub use actions::ActionContext;
pub use conditions::{check, guard_allows, holds};
pub use config::EngineConfig;
pub use evaluator::{Scope, evaluate, extract};
pub use machine::{EventOutcome, MachineSnapshot, StateMachine, TransitionOutcome, TransitionRecord};
pub use operations::{apply_binary, apply_unary};
pub use page::{derive_page, frame_src};
