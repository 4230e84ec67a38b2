//! Renderer collaborator

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::message::Message;
use crate::page::Page;

/// Turns page descriptions and messages into something the user sees.
///
/// Calls are fire-and-await; the returned value is passed back to callers
/// untouched and only success or failure matters to the engine.
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn render_page(&self, session: &str, page: &Page) -> Result<Value>;

    async fn show_message(&self, session: &str, message: &Message) -> Result<Value>;
}
