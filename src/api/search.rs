//! Two-tier text search.
//!
//! Searching issues a single combined predicate ORing a pattern across the
//! searchable columns. Some deployments reject the combined form (column
//! permissions, legacy gateways), so on failure the search falls back to
//! one query per column and merges the results, deduplicating by primary
//! key. Both tiers sit behind the one [`search`] entry point.

use std::collections::HashSet;

use futures::future::join_all;

use crate::api::Filter;
use crate::error::ApiError;
use crate::model::Row;
use crate::source::RemoteSource;

/// Searches a table for rows where any of `fields` matches `term`
/// (case-insensitive substring).
///
/// Results are not cached; every search goes to the service.
pub async fn search(
    source: &dyn RemoteSource,
    table: &str,
    fields: &[&str],
    term: &str,
    primary_key: &str,
) -> Result<Vec<Row>, ApiError> {
    let pattern = format!("*{}*", term);
    let combined = Filter::or(
        fields
            .iter()
            .map(|field| Filter::ilike(*field, pattern.clone())),
    );

    match source.query_rows(table, &combined).await {
        Ok(rows) => Ok(rows),
        Err(err) => {
            log::debug!(
                "[search] combined query on '{}' failed, falling back per field: {}",
                table,
                err
            );

            let queries = fields.iter().map(|field| {
                let filter = Filter::ilike(*field, pattern.clone());
                async move { source.query_rows(table, &filter).await }
            });

            let mut batches = Vec::new();
            let mut last_error = None;
            for result in join_all(queries).await {
                match result {
                    Ok(rows) => batches.push(rows),
                    Err(field_err) => last_error = Some(field_err),
                }
            }

            if batches.is_empty() {
                return Err(last_error.unwrap_or(err));
            }

            Ok(merge_rows_by_key(batches, primary_key))
        }
    }
}

/// Merges row batches, deduplicating by primary key and preserving
/// first-seen order. Rows without the key column cannot be deduplicated and
/// are always kept.
fn merge_rows_by_key(batches: Vec<Vec<Row>>, primary_key: &str) -> Vec<Row> {
    let mut seen = HashSet::new();
    let mut merged = Vec::new();

    for row in batches.into_iter().flatten() {
        match row.get(primary_key) {
            Some(id) => {
                if seen.insert(id.to_string()) {
                    merged.push(row);
                }
            }
            None => merged.push(row),
        }
    }

    merged
}
