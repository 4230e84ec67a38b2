//! Collaborator traits the engine talks to

pub mod component;
pub mod renderer;
pub mod session;

pub use component::ComponentRegistry;
pub use renderer::Renderer;
pub use session::{DefaultSessionResolver, SessionResolver};
