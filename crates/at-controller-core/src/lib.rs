//! Core types and collaborator traits for the AT controller state engine

pub mod attributes;
pub mod error;
pub mod message;
pub mod mock;
pub mod page;
pub mod traits;
pub mod value;

pub use attributes::{AttributeStore, safe_format};
pub use error::{ControllerError, Result};
pub use message::{Message, MessageType};
pub use page::{
    ControlPanel, Footer, Grid, GridCol, GridRow, HandlerBinding, Header, Link, Page, Props,
    Style, TriggerKwargs,
};
pub use traits::{ComponentRegistry, DefaultSessionResolver, Renderer, SessionResolver};
pub use value::{Num, is_truthy, loose_eq};

/// Submitted frame URLs keyed by frame id.
pub type FrameData = std::collections::HashMap<String, String>;
