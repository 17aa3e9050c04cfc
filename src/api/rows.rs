//! Row fetch and version token operations over the REST API.

use async_trait::async_trait;

use crate::InshadClient;
use crate::api::Filter;
use crate::error::ApiError;
use crate::model::Row;
use crate::source::RemoteSource;

/// Column the service keeps current on every row mutation. The newest value
/// in a table doubles as the table's version token.
const VERSION_COLUMN: &str = "updated_at";

#[async_trait]
impl RemoteSource for InshadClient {
    async fn fetch_rows(&self, table: &str) -> Result<Vec<Row>, ApiError> {
        self.get_rows(table, &[("select".to_string(), "*".to_string())])
            .await
    }

    async fn query_rows(&self, table: &str, filter: &Filter) -> Result<Vec<Row>, ApiError> {
        let mut query = vec![("select".to_string(), "*".to_string())];
        query.extend(filter.to_query_pairs());
        self.get_rows(table, &query).await
    }

    async fn table_version(&self, table: &str) -> Result<Option<String>, ApiError> {
        let query = [
            ("select".to_string(), VERSION_COLUMN.to_string()),
            ("order".to_string(), format!("{}.desc", VERSION_COLUMN)),
            ("limit".to_string(), "1".to_string()),
        ];
        let rows = self.get_rows(table, &query).await?;

        // An empty table has no token to offer.
        Ok(rows
            .first()
            .and_then(|row| row.get(VERSION_COLUMN))
            .and_then(|value| value.as_str())
            .map(str::to_owned))
    }
}
