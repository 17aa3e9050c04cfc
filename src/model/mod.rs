//! Data model for aggregates and version tokens

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

/// A single row from a remote table.
///
/// Row shape is owned by the caller; the cache layer treats rows as opaque
/// JSON beyond the primary key used for search deduplication.
pub type Row = serde_json::Value;

/// The current version token of a remote table.
///
/// Tokens change whenever any row in the table is inserted, updated, or
/// deleted. They are comparable within a table (the service emits RFC 3339
/// timestamps, so lexicographic order is temporal order) but not across
/// tables. `None` means the service could not supply one, e.g. the table is
/// empty or change tracking is unavailable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableVersion {
    /// Logical table name.
    pub table: String,
    /// The version token, or `None` if unavailable.
    pub token: Option<String>,
}

impl TableVersion {
    /// Creates a new table version.
    pub fn new(table: impl Into<String>, token: Option<String>) -> Self {
        Self {
            table: table.into(),
            token,
        }
    }
}

/// A multi-table aggregate assembled from independent table fetches.
///
/// Tables that fetched successfully contribute their rows; tables that
/// failed contribute a failure marker instead. A single table's failure
/// never discards results already obtained from the others.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AggregateResult {
    /// Rows per table, for the tables that fetched successfully.
    pub tables: BTreeMap<String, Vec<Row>>,
    /// Failure message per table, for the tables that did not.
    pub failures: BTreeMap<String, String>,
}

impl AggregateResult {
    /// Creates an empty aggregate.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the rows of a successfully fetched table.
    pub fn insert_rows(&mut self, table: impl Into<String>, rows: Vec<Row>) {
        self.tables.insert(table.into(), rows);
    }

    /// Records a failure marker for a table.
    pub fn insert_failure(&mut self, table: impl Into<String>, message: impl Into<String>) {
        self.failures.insert(table.into(), message.into());
    }

    /// Returns the rows for a table, if it fetched successfully.
    pub fn rows(&self, table: &str) -> Option<&[Row]> {
        self.tables.get(table).map(Vec::as_slice)
    }

    /// Returns the failure message for a table, if it failed.
    pub fn failure(&self, table: &str) -> Option<&str> {
        self.failures.get(table).map(String::as_str)
    }

    /// Returns `true` if at least one table failed while others succeeded.
    pub fn is_partial(&self) -> bool {
        !self.failures.is_empty() && !self.tables.is_empty()
    }

    /// Returns `true` if no table fetched successfully.
    pub fn all_failed(&self) -> bool {
        self.tables.is_empty() && !self.failures.is_empty()
    }
}
