//! Component registry collaborator

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

/// Dispatches method calls to external components reachable over the bus.
#[async_trait]
pub trait ComponentRegistry: Send + Sync {
    async fn is_registered(&self, component: &str) -> Result<bool>;

    async fn call_method(
        &self,
        component: &str,
        method: &str,
        args: Value,
        auth_token: &str,
    ) -> Result<Value>;
}
