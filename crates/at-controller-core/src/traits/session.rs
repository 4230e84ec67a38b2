//! Session identity resolution

use async_trait::async_trait;

use crate::error::Result;

pub const DEFAULT_SESSION: &str = "default";

/// Maps a raw auth token to the key a session is stored under.
#[async_trait]
pub trait SessionResolver: Send + Sync {
    async fn resolve(&self, auth_token: Option<&str>) -> Result<String>;
}

/// Uses the token itself as the key, falling back to `"default"`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultSessionResolver;

#[async_trait]
impl SessionResolver for DefaultSessionResolver {
    async fn resolve(&self, auth_token: Option<&str>) -> Result<String> {
        Ok(match auth_token {
            Some(token) if !token.is_empty() => token.to_string(),
            _ => DEFAULT_SESSION.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_default_resolver() {
        let resolver = DefaultSessionResolver;
        assert_eq!(resolver.resolve(Some("abc")).await.unwrap(), "abc");
        assert_eq!(resolver.resolve(Some("")).await.unwrap(), "default");
        assert_eq!(resolver.resolve(None).await.unwrap(), "default");
    }
}
