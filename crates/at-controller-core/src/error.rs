use thiserror::Error;

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("Invalid diagram: {0}")]
    InvalidDiagram(String),

    #[error("Unknown transition: {0}")]
    UnknownTransition(String),

    #[error("Unknown state: {0}")]
    UnknownState(String),

    #[error("Diagram has no initial state")]
    NoInitialState,

    #[error("Computation error: {0}")]
    Computation(String),

    #[error("Key not found: {0}")]
    KeyNotFound(String),

    #[error("Component \"{0}\" is not registered")]
    ComponentNotRegistered(String),

    /// Raised when an event handler component is missing and the event asks to fail.
    #[error("Reference error: {0}")]
    Reference(String),

    #[error("External call {component}.{method} failed: {message}")]
    External {
        component: String,
        method: String,
        message: String,
    },

    #[error("Renderer error: {0}")]
    Renderer(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl ControllerError {
    pub fn computation(message: impl Into<String>) -> Self {
        Self::Computation(message.into())
    }

    pub fn external(
        component: impl Into<String>,
        method: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::External {
            component: component.into(),
            method: method.into(),
            message: message.into(),
        }
    }

    /// Lookup failures are reported to callers as "not found" and leave the machine untouched.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::UnknownTransition(_) | Self::UnknownState(_))
    }
}

pub type Result<T> = std::result::Result<T, ControllerError>;
