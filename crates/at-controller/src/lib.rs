//! AT Controller
//!
//! Drives tutoring sessions from a YAML state diagram: each session owns a
//! state machine whose current state is rendered as a page of frames and
//! links, and whose transitions run actions against a per-session
//! attribute store.

mod controller;

pub use controller::{Controller, NO_PROCESS_MESSAGE, SessionOutcome};

pub mod error {
    pub use at_controller_core::{ControllerError, Result};
}

pub mod traits {
    pub use at_controller_core::traits::session::DEFAULT_SESSION;
    pub use at_controller_core::{
        ComponentRegistry, DefaultSessionResolver, Renderer, SessionResolver,
    };
}

pub mod page {
    pub use at_controller_core::{
        ControlPanel, Footer, Grid, GridCol, GridRow, HandlerBinding, Header, Link, Message,
        MessageType, Page, Props, Style, TriggerKwargs,
    };
}

pub mod diagram {
    pub use at_controller_diagram::{
        Action, ActionKind, Condition, Diagram, DiagramDocument, DiagramOutline, Event,
        EventHandler, Expr, Frame, FrameKind, Function, Guard, InitialAttribute, LinkPosition,
        OutlineTransition, Span, State, Transition, TransitionKind, parse_actions,
        parse_condition, parse_expr, parse_guard,
    };
}

pub mod engine {
    pub use at_controller_engine::{
        EngineConfig, EventOutcome, MachineSnapshot, StateMachine, TransitionOutcome,
        TransitionRecord, derive_page,
    };
}

pub mod mock {
    pub use at_controller_core::mock::{
        MockComponentRegistry, MockMethodCall, MockRenderer,
    };
}

pub use at_controller_core::{AttributeStore, ControllerError, FrameData, Result};
pub use at_controller_diagram::Diagram;
pub use at_controller_engine::{EngineConfig, EventOutcome, StateMachine};
