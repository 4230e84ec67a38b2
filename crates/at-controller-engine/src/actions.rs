//! Action execution with fan-out of successor actions.

use at_controller_core::value::{is_truthy, to_display};
use at_controller_core::{ComponentRegistry, ControllerError, Message, Renderer, Result};
use at_controller_diagram::{Action, ActionKind, Expr};
use futures::FutureExt;
use futures::future::{BoxFuture, try_join_all};
use serde_json::{Map, Value};
use tracing::debug;

use crate::evaluator::{Scope, evaluate};

/// What a running action can read and call.
#[derive(Clone, Copy)]
pub struct ActionContext<'a> {
    pub scope: Scope<'a>,
    pub session: &'a str,
    pub renderer: &'a dyn Renderer,
    pub components: &'a dyn ComponentRegistry,
}

impl<'a> ActionContext<'a> {
    /// Runs `action`, then all of its `next` successors concurrently.
    ///
    /// Resolves to the action's own result. The first failing successor
    /// fails the whole call; siblings still in flight are dropped at their
    /// next suspension point and effects already applied are kept.
    pub fn perform(&'a self, action: &'a Action) -> BoxFuture<'a, Result<Value>> {
        async move {
            debug!(action = action.name(), session = self.session, "Performing action");
            let result = self.run(&action.kind).await?;
            if !action.next.is_empty() {
                self.perform_all(&action.next).await?;
            }
            Ok(result)
        }
        .boxed()
    }

    /// Runs `actions` concurrently, resolving to their results in order.
    pub fn perform_all(&'a self, actions: &'a [Action]) -> BoxFuture<'a, Result<Vec<Value>>> {
        try_join_all(actions.iter().map(|action| self.perform(action))).boxed()
    }

    async fn run(&self, kind: &ActionKind) -> Result<Value> {
        match kind {
            ActionKind::SetAttribute { attribute, value } => {
                let value = evaluate(value, &self.scope)?;
                self.scope.attributes.set(attribute.clone(), value.clone());
                let mut result = Map::new();
                result.insert(attribute.clone(), value);
                Ok(Value::Object(result))
            }
            ActionKind::ShowMessage {
                message,
                title,
                modal,
                message_type,
            } => {
                let attributes = self.scope.attributes;
                let message = Message::info(attributes.format(message))
                    .with_title(attributes.format(title))
                    .with_type(*message_type)
                    .modal(*modal);
                self.renderer.show_message(self.session, &message).await
            }
            ActionKind::ExecMethod {
                component,
                method,
                method_args,
                auth_token,
            } => {
                let component = self.text(component)?;
                let method = self.text(method)?;
                if !self.components.is_registered(&component).await? {
                    return Err(ControllerError::ComponentNotRegistered(component));
                }
                let args = evaluate(method_args, &self.scope)?;
                let auth_token = match auth_token {
                    Some(expr) => {
                        let token = evaluate(expr, &self.scope)?;
                        if is_truthy(&token) {
                            to_display(&token)
                        } else {
                            self.scope.auth_token.to_string()
                        }
                    }
                    None => self.scope.auth_token.to_string(),
                };
                debug!(component = %component, method = %method, "Calling component method");
                self.components
                    .call_method(&component, &method, args, &auth_token)
                    .await
            }
        }
    }

    fn text(&self, expr: &Expr) -> Result<String> {
        Ok(to_display(&evaluate(expr, &self.scope)?))
    }
}
