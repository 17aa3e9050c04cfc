//! API key providers

use async_trait::async_trait;

use crate::error::AuthError;

/// Trait for providing API keys to the Inshad client.
///
/// The client calls `api_key` before each request. The common case is a
/// long-lived publishable key ([`StaticKeyProvider`]); implementations that
/// rotate keys can fetch or refresh transparently.
#[async_trait]
pub trait KeyProvider: Send + Sync {
    /// Returns the API key to present to the service.
    async fn api_key(&self) -> Result<String, AuthError>;
}

/// A key provider that always returns the same static key.
///
/// # Example
///
/// ```
/// use inshad_lib::auth::StaticKeyProvider;
///
/// let provider = StaticKeyProvider::new("public-anon-key");
/// ```
#[derive(Debug, Clone)]
pub struct StaticKeyProvider {
    key: String,
}

impl StaticKeyProvider {
    /// Creates a new static key provider.
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

#[async_trait]
impl KeyProvider for StaticKeyProvider {
    async fn api_key(&self) -> Result<String, AuthError> {
        Ok(self.key.clone())
    }
}
