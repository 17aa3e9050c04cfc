//! Remote data source contract

use async_trait::async_trait;

use crate::api::Filter;
use crate::error::ApiError;
use crate::model::Row;

/// Contract for the remote relational data source.
///
/// The cache layer only needs two things from the service: rows for a table
/// and a per-table "last changed" version token. Both are opaque beyond
/// that. [`InshadClient`](crate::InshadClient) implements this trait over
/// the service's HTTP API; tests swap in a fake.
///
/// Implementations must support concurrent invocation for multiple tables
/// without serializing the calls; the fetch orchestrator issues all lookups
/// of a batch in parallel.
#[async_trait]
pub trait RemoteSource: Send + Sync {
    /// Fetches all rows of a table.
    async fn fetch_rows(&self, table: &str) -> Result<Vec<Row>, ApiError>;

    /// Fetches the rows of a table matching a filter.
    async fn query_rows(&self, table: &str, filter: &Filter) -> Result<Vec<Row>, ApiError>;

    /// Returns the table's current version token.
    ///
    /// The token changes whenever any row in the table is inserted, updated,
    /// or deleted. `Ok(None)` means the service cannot supply one, e.g. the
    /// table is empty or change tracking is unavailable.
    async fn table_version(&self, table: &str) -> Result<Option<String>, ApiError>;
}
