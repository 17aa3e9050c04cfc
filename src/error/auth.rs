//! Authentication error types

/// Errors that can occur while obtaining API credentials.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AuthError {
    /// No API key is configured or the provider could not supply one.
    #[error("API key unavailable: {0}")]
    KeyUnavailable(String),

    /// The service rejected the presented credentials.
    #[error("Credentials rejected: HTTP {status}")]
    Rejected {
        /// HTTP status code from the rejection.
        status: u16,
    },
}

impl AuthError {
    /// Creates a new key-unavailable error.
    pub fn key_unavailable(reason: impl Into<String>) -> Self {
        Self::KeyUnavailable(reason.into())
    }
}
