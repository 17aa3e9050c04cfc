//! Error types

use std::collections::BTreeMap;

mod api;
mod auth;
mod store;

pub use api::*;
pub use auth::*;
pub use store::*;

/// Top-level error type for the Inshad client.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Error talking to the content service.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Error obtaining credentials.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Error setting up a cache store.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Every table fetch in an aggregate failed.
    ///
    /// Partial failures are not errors: as long as at least one table
    /// succeeds the aggregate is assembled with per-table failure markers.
    /// This variant is the only cache-layer condition surfaced to callers.
    #[error("all {} table fetches failed", failures.len())]
    SourceUnavailable {
        /// Failure message per table.
        failures: BTreeMap<String, String>,
    },
}

impl Error {
    /// Returns the per-table failure messages if every table fetch failed.
    pub fn source_failures(&self) -> Option<&BTreeMap<String, String>> {
        match self {
            Self::SourceUnavailable { failures } => Some(failures),
            _ => None,
        }
    }
}
