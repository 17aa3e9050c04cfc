//! Version token lookups against the remote source.

use std::sync::Arc;

use futures::future::join_all;

use crate::model::TableVersion;
use crate::source::RemoteSource;

/// Queries the remote source for per-table version tokens.
///
/// The oracle is the only component that talks to the service about
/// versions, and it fails soft: a lookup that errors yields a `None` token
/// rather than propagating, because a missing token merely means freshness
/// cannot be proven. One table's failure never aborts the others.
#[derive(Clone)]
pub struct VersionOracle {
    source: Arc<dyn RemoteSource>,
}

impl VersionOracle {
    /// Creates a new oracle over the given source.
    pub fn new(source: Arc<dyn RemoteSource>) -> Self {
        Self { source }
    }

    /// Returns the current version token of a table.
    ///
    /// Remote errors are absorbed into a `None` token and logged at debug.
    pub async fn version(&self, table: &str) -> TableVersion {
        match self.source.table_version(table).await {
            Ok(token) => TableVersion::new(table, token),
            Err(err) => {
                log::debug!("[version] lookup for '{}' failed: {}", table, err);
                TableVersion::new(table, None)
            }
        }
    }

    /// Returns the current version tokens of all given tables.
    ///
    /// All lookups are issued concurrently and awaited jointly; the result
    /// preserves the input order.
    pub async fn versions(&self, tables: &[&str]) -> Vec<TableVersion> {
        join_all(tables.iter().map(|table| self.version(table))).await
    }
}

/// Returns the latest version token across tables.
///
/// Tokens are not comparable across tables, but their maximum still orders
/// "has anything this aggregate depends on changed": the service emits
/// RFC 3339 timestamps, so the lexicographic maximum is the most recent
/// change anywhere in the set. `None` when every token is null.
pub fn latest_token(versions: &[TableVersion]) -> Option<String> {
    versions
        .iter()
        .filter_map(|version| version.token.as_deref())
        .max()
        .map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;

    use crate::api::Filter;
    use crate::error::ApiError;
    use crate::model::Row;

    struct StubSource;

    #[async_trait]
    impl RemoteSource for StubSource {
        async fn fetch_rows(&self, _table: &str) -> Result<Vec<Row>, ApiError> {
            Ok(Vec::new())
        }

        async fn query_rows(&self, _table: &str, _filter: &Filter) -> Result<Vec<Row>, ApiError> {
            Ok(Vec::new())
        }

        async fn table_version(&self, table: &str) -> Result<Option<String>, ApiError> {
            match table {
                "categories" => Ok(Some("2024-01-02T00:00:00Z".to_string())),
                "pieces" => Ok(Some("2024-01-01T00:00:00Z".to_string())),
                "site_settings" => Ok(None),
                _ => Err(ApiError::http(500, "boom")),
            }
        }
    }

    #[tokio::test]
    async fn test_lookup_failure_yields_null_token() {
        let oracle = VersionOracle::new(Arc::new(StubSource));
        let version = oracle.version("imams").await;
        assert_eq!(version.token, None);
    }

    #[tokio::test]
    async fn test_batch_preserves_order_and_isolates_failures() {
        let oracle = VersionOracle::new(Arc::new(StubSource));
        let versions = oracle
            .versions(&["categories", "imams", "pieces", "site_settings"])
            .await;

        assert_eq!(versions.len(), 4);
        assert_eq!(versions[0].table, "categories");
        assert_eq!(versions[0].token.as_deref(), Some("2024-01-02T00:00:00Z"));
        assert_eq!(versions[1].token, None);
        assert_eq!(versions[2].token.as_deref(), Some("2024-01-01T00:00:00Z"));
        assert_eq!(versions[3].token, None);
    }

    #[test]
    fn test_latest_token_is_max_of_non_null() {
        let versions = vec![
            TableVersion::new("categories", Some("2024-01-02T00:00:00Z".to_string())),
            TableVersion::new("pieces", Some("2024-01-01T00:00:00Z".to_string())),
            TableVersion::new("site_settings", None),
        ];
        assert_eq!(
            latest_token(&versions).as_deref(),
            Some("2024-01-02T00:00:00Z")
        );
    }

    #[test]
    fn test_latest_token_all_null() {
        let versions = vec![
            TableVersion::new("categories", None),
            TableVersion::new("pieces", None),
        ];
        assert_eq!(latest_token(&versions), None);
        assert_eq!(latest_token(&[]), None);
    }
}
