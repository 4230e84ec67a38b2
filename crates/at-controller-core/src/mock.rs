//! In-memory collaborators for tests and dry runs.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::{Value, json};

use crate::error::{ControllerError, Result};
use crate::message::Message;
use crate::page::Page;
use crate::traits::{ComponentRegistry, Renderer};

/// Renderer that records every page and message it receives.
#[derive(Clone, Default)]
pub struct MockRenderer {
    inner: Arc<RwLock<MockRendererInner>>,
}

#[derive(Default)]
struct MockRendererInner {
    pages: Vec<(String, Page)>,
    messages: Vec<(String, Message)>,
    error_message: Option<String>,
}

impl MockRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_error(&self, error_message: impl Into<String>) {
        self.inner.write().error_message = Some(error_message.into());
    }

    pub fn clear_error(&self) {
        self.inner.write().error_message = None;
    }

    pub fn pages(&self) -> Vec<(String, Page)> {
        self.inner.read().pages.clone()
    }

    pub fn last_page(&self) -> Option<Page> {
        self.inner.read().pages.last().map(|(_, page)| page.clone())
    }

    pub fn messages(&self) -> Vec<(String, Message)> {
        self.inner.read().messages.clone()
    }

    pub fn render_count(&self) -> usize {
        self.inner.read().pages.len()
    }
}

#[async_trait]
impl Renderer for MockRenderer {
    async fn render_page(&self, session: &str, page: &Page) -> Result<Value> {
        let mut inner = self.inner.write();
        if let Some(message) = &inner.error_message {
            return Err(ControllerError::Renderer(message.clone()));
        }
        inner.pages.push((session.to_string(), page.clone()));
        Ok(json!({"rendered": true}))
    }

    async fn show_message(&self, session: &str, message: &Message) -> Result<Value> {
        let mut inner = self.inner.write();
        if let Some(error) = &inner.error_message {
            return Err(ControllerError::Renderer(error.clone()));
        }
        inner.messages.push((session.to_string(), message.clone()));
        Ok(json!({"shown": true}))
    }
}

pub type MethodHandler = Arc<dyn Fn(Value) -> Result<Value> + Send + Sync>;

#[derive(Debug, Clone, PartialEq)]
pub struct MockMethodCall {
    pub component: String,
    pub method: String,
    pub args: Value,
    pub auth_token: String,
}

/// Component registry backed by closures keyed by `component.method`.
///
/// Registered methods without a handler echo their arguments back.
#[derive(Clone, Default)]
pub struct MockComponentRegistry {
    inner: Arc<RwLock<MockRegistryInner>>,
}

#[derive(Default)]
struct MockRegistryInner {
    components: HashSet<String>,
    handlers: HashMap<String, MethodHandler>,
    calls: Vec<MockMethodCall>,
    latency_ms: u64,
}

impl MockComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, component: impl Into<String>) {
        self.inner.write().components.insert(component.into());
    }

    pub fn unregister(&self, component: &str) {
        self.inner.write().components.remove(component);
    }

    pub fn on_method<F>(&self, component: &str, method: &str, handler: F)
    where
        F: Fn(Value) -> Result<Value> + Send + Sync + 'static,
    {
        let mut inner = self.inner.write();
        inner.components.insert(component.to_string());
        inner
            .handlers
            .insert(format!("{}.{}", component, method), Arc::new(handler));
    }

    pub fn set_latency(&self, latency_ms: u64) {
        self.inner.write().latency_ms = latency_ms;
    }

    pub fn calls(&self) -> Vec<MockMethodCall> {
        self.inner.read().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.inner.read().calls.len()
    }
}

#[async_trait]
impl ComponentRegistry for MockComponentRegistry {
    async fn is_registered(&self, component: &str) -> Result<bool> {
        Ok(self.inner.read().components.contains(component))
    }

    async fn call_method(
        &self,
        component: &str,
        method: &str,
        args: Value,
        auth_token: &str,
    ) -> Result<Value> {
        let (handler, latency_ms) = {
            let mut inner = self.inner.write();
            if !inner.components.contains(component) {
                return Err(ControllerError::ComponentNotRegistered(component.to_string()));
            }
            inner.calls.push(MockMethodCall {
                component: component.to_string(),
                method: method.to_string(),
                args: args.clone(),
                auth_token: auth_token.to_string(),
            });
            let handler = inner.handlers.get(&format!("{}.{}", component, method)).cloned();
            (handler, inner.latency_ms)
        };

        if latency_ms > 0 {
            tokio::time::sleep(Duration::from_millis(latency_ms)).await;
        }

        match handler {
            Some(handler) => handler(args),
            None => Ok(args),
        }
    }
}
