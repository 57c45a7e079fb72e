//! Access token sources.
//!
//! Sessions are owned by an external auth service; the client only asks it for
//! the current bearer token before each call.

use async_trait::async_trait;
use std::sync::Arc;

/// Supplies the bearer token attached to authenticated requests.
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use pagewise::TokenProvider;
///
/// struct SessionStore;
///
/// #[async_trait]
/// impl TokenProvider for SessionStore {
///     async fn access_token(&self) -> Option<String> {
///         // Look up the current session here.
///         None
///     }
/// }
/// ```
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Returns the current access token, or `None` when signed out.
    async fn access_token(&self) -> Option<String>;
}

/// A provider returning a fixed token.
#[derive(Debug, Clone, Default)]
pub struct StaticToken(Option<String>);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(Some(token.into()))
    }

    /// A provider that never has a token.
    pub fn none() -> Self {
        Self(None)
    }
}

#[async_trait]
impl TokenProvider for StaticToken {
    async fn access_token(&self) -> Option<String> {
        self.0.clone()
    }
}

#[async_trait]
impl<P: TokenProvider + ?Sized> TokenProvider for Arc<P> {
    async fn access_token(&self) -> Option<String> {
        (**self).access_token().await
    }
}
