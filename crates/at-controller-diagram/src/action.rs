use at_controller_core::MessageType;

use crate::expr::Expr;

pub const DEFAULT_MESSAGE_TITLE: &str = "Message";

/// Side-effecting step with successors that fan out once it completes.
#[derive(Debug, Clone)]
pub struct Action {
    pub kind: ActionKind,
    pub next: Vec<Action>,
}

#[derive(Debug, Clone)]
pub enum ActionKind {
    SetAttribute {
        attribute: String,
        value: Expr,
    },
    ShowMessage {
        message: String,
        title: String,
        modal: bool,
        message_type: MessageType,
    },
    ExecMethod {
        component: Expr,
        method: Expr,
        method_args: Expr,
        auth_token: Option<Expr>,
    },
}

impl Action {
    pub fn new(kind: ActionKind) -> Self {
        Self {
            kind,
            next: Vec::new(),
        }
    }

    pub fn set_attribute(attribute: impl Into<String>, value: Expr) -> Self {
        Self::new(ActionKind::SetAttribute {
            attribute: attribute.into(),
            value,
        })
    }

    pub fn show_message(message: impl Into<String>) -> Self {
        Self::new(ActionKind::ShowMessage {
            message: message.into(),
            title: DEFAULT_MESSAGE_TITLE.to_string(),
            modal: true,
            message_type: MessageType::Info,
        })
    }

    pub fn exec_method(component: Expr, method: Expr, method_args: Expr) -> Self {
        Self::new(ActionKind::ExecMethod {
            component,
            method,
            method_args,
            auth_token: None,
        })
    }

    pub fn then(mut self, next: Action) -> Self {
        self.next.push(next);
        self
    }

    pub fn name(&self) -> &'static str {
        match self.kind {
            ActionKind::SetAttribute { .. } => "set_attribute",
            ActionKind::ShowMessage { .. } => "show_message",
            ActionKind::ExecMethod { .. } => "exec_method",
        }
    }
}
