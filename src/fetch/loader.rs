//! The cached aggregate fetch orchestrator.

use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::cache::CacheEntry;
use crate::cache::CacheStore;
use crate::error::Error;
use crate::model::AggregateResult;
use crate::response::Response;
use crate::source::RemoteSource;

use super::oracle::VersionOracle;
use super::oracle::latest_token;

/// Decides cache-hit vs cache-miss for aggregate queries and owns the
/// concurrent fetch/assemble/write-back cycle.
///
/// On every load the orchestrator reads the stored entry, asks the
/// [`VersionOracle`] for the current tokens of all dependent tables, and
/// compares the latest token against the entry's stamp. A hit returns the
/// cached payload with zero remote data fetches. A miss fetches, re-reads
/// the tokens (a write landing mid-fetch must not be missed by stamping
/// with tokens collected before the fetch), writes back, and returns the
/// fresh result whether or not the write succeeded.
///
/// Concurrent loads for the same key may both miss and both write; the
/// later write wins. That is acceptable because staleness is
/// self-correcting: the next load re-derives the decision from live tokens.
///
/// # Example
///
/// ```ignore
/// let loader = AggregateLoader::new(source, store);
/// let response = loader.load_tables("index", &HOME_TABLES).await?;
/// println!("cached: {}", response.is_cached());
/// ```
pub struct AggregateLoader {
    source: Arc<dyn RemoteSource>,
    store: Arc<dyn CacheStore>,
    oracle: VersionOracle,
}

impl AggregateLoader {
    /// Creates a new orchestrator over a source and a store.
    pub fn new(source: Arc<dyn RemoteSource>, store: Arc<dyn CacheStore>) -> Self {
        let oracle = VersionOracle::new(Arc::clone(&source));
        Self {
            source,
            store,
            oracle,
        }
    }

    /// Returns the cache store.
    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    /// Returns the version oracle.
    pub fn oracle(&self) -> &VersionOracle {
        &self.oracle
    }

    /// Loads an aggregate through the cache.
    ///
    /// `name` identifies the aggregate (one per page/view), `tables` are the
    /// remote tables the aggregate depends on, and `fetch` recomputes it on
    /// a miss. The freshness rule:
    ///
    /// - entry absent, or any live token newer than the stamp → miss
    /// - every live token at or below the stamp → hit
    /// - no live tokens at all → hit only when the stamp is also absent
    ///   (both sides blind; assuming valid keeps the cache useful when
    ///   version tracking is entirely unavailable)
    ///
    /// A cached payload that fails to deserialize is discarded and treated
    /// as a miss.
    pub async fn load<T, F, Fut>(
        &self,
        name: &str,
        tables: &[&str],
        fetch: F,
    ) -> Result<Response<T>, Error>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, Error>>,
    {
        let key = self.store.cache_key(name);

        if let Some(entry) = self.store.get(&key).await {
            let versions = self.oracle.versions(tables).await;
            let latest = latest_token(&versions);

            if is_fresh(latest.as_deref(), entry.version_stamp.as_deref()) {
                match serde_json::from_slice(&entry.payload) {
                    Ok(value) => {
                        log::debug!(
                            "[fetch] '{}' hit (stamp {:?})",
                            name,
                            entry.version_stamp
                        );
                        return Ok(Response::cache_hit(
                            value,
                            entry.written_at,
                            entry.version_stamp,
                        ));
                    }
                    Err(err) => {
                        log::warn!("[fetch] '{}' cached payload unreadable, refetching: {}", name, err);
                        self.store.remove(&key).await;
                    }
                }
            } else {
                log::debug!(
                    "[fetch] '{}' stale (stamp {:?}, latest {:?})",
                    name,
                    entry.version_stamp,
                    latest
                );
            }
        }

        let value = fetch().await?;

        let versions = self.oracle.versions(tables).await;
        let latest = latest_token(&versions);

        let written_at = Utc::now();
        match serde_json::to_vec(&value) {
            Ok(payload) => {
                self.store
                    .put(&key, CacheEntry::with_written_at(payload, latest, written_at))
                    .await;
            }
            Err(err) => {
                log::warn!("[fetch] '{}' not cached, serialization failed: {}", name, err);
            }
        }

        Ok(Response::cache_miss(value, written_at))
    }

    /// Loads a multi-table aggregate through the cache.
    ///
    /// On a miss every table is fetched concurrently. Tables that fail
    /// contribute a failure marker instead of discarding the rows already
    /// obtained from the others; the load only errors when all tables fail.
    /// The write-back stamp naturally reflects only the tables the service
    /// could answer for, since failed tables report null tokens.
    pub async fn load_tables(
        &self,
        name: &str,
        tables: &[&str],
    ) -> Result<Response<AggregateResult>, Error> {
        let source = Arc::clone(&self.source);
        let owned: Vec<String> = tables.iter().map(|table| table.to_string()).collect();

        self.load(name, tables, move || fetch_aggregate(source, owned))
            .await
    }
}

/// Fetches every table concurrently and assembles the aggregate.
async fn fetch_aggregate(
    source: Arc<dyn RemoteSource>,
    tables: Vec<String>,
) -> Result<AggregateResult, Error> {
    let fetches = tables.iter().map(|table| {
        let source = Arc::clone(&source);
        async move { (table.clone(), source.fetch_rows(table).await) }
    });

    let mut aggregate = AggregateResult::new();
    for (table, result) in join_all(fetches).await {
        match result {
            Ok(rows) => aggregate.insert_rows(table, rows),
            Err(err) => {
                log::warn!("[fetch] table '{}' failed: {}", table, err);
                aggregate.insert_failure(table, err.to_string());
            }
        }
    }

    if aggregate.all_failed() {
        return Err(Error::SourceUnavailable {
            failures: aggregate.failures,
        });
    }

    Ok(aggregate)
}

/// The freshness rule, in one place.
fn is_fresh(latest: Option<&str>, stamp: Option<&str>) -> bool {
    match (latest, stamp) {
        // Both sides blind: assume valid, otherwise caching never works
        // when version tracking is entirely unavailable.
        (None, None) => true,
        (Some(latest), Some(stamp)) => latest <= stamp,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;

    use async_trait::async_trait;
    use serde_json::json;

    use crate::api::Filter;
    use crate::cache::MemoryStore;
    use crate::error::ApiError;
    use crate::model::Row;

    #[test]
    fn test_freshness_rule() {
        assert!(is_fresh(None, None));
        assert!(is_fresh(Some("t1"), Some("t1")));
        assert!(is_fresh(Some("t0"), Some("t1")));
        assert!(!is_fresh(Some("t2"), Some("t1")));
        assert!(!is_fresh(Some("t1"), None));
        assert!(!is_fresh(None, Some("t1")));
    }

    /// Programmable remote source that counts data fetches.
    #[derive(Default)]
    struct FakeSource {
        rows: Mutex<HashMap<String, Result<Vec<Row>, String>>>,
        versions: Mutex<HashMap<String, Result<Option<String>, String>>>,
        fetch_calls: AtomicUsize,
    }

    impl FakeSource {
        fn new() -> Self {
            Self::default()
        }

        fn set_rows(&self, table: &str, rows: Vec<Row>) {
            self.rows
                .lock()
                .unwrap()
                .insert(table.to_string(), Ok(rows));
        }

        fn fail_rows(&self, table: &str) {
            self.rows
                .lock()
                .unwrap()
                .insert(table.to_string(), Err("connection reset".to_string()));
        }

        fn set_version(&self, table: &str, token: Option<&str>) {
            self.versions
                .lock()
                .unwrap()
                .insert(table.to_string(), Ok(token.map(str::to_owned)));
        }

        fn fail_version(&self, table: &str) {
            self.versions
                .lock()
                .unwrap()
                .insert(table.to_string(), Err("boom".to_string()));
        }

        fn fetch_count(&self) -> usize {
            self.fetch_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RemoteSource for FakeSource {
        async fn fetch_rows(&self, table: &str) -> Result<Vec<Row>, ApiError> {
            self.fetch_calls.fetch_add(1, Ordering::SeqCst);
            match self.rows.lock().unwrap().get(table) {
                Some(Ok(rows)) => Ok(rows.clone()),
                Some(Err(message)) => Err(ApiError::http(503, message.clone())),
                None => Err(ApiError::http(404, format!("no such table '{}'", table))),
            }
        }

        async fn query_rows(&self, table: &str, _filter: &Filter) -> Result<Vec<Row>, ApiError> {
            self.fetch_rows(table).await
        }

        async fn table_version(&self, table: &str) -> Result<Option<String>, ApiError> {
            match self.versions.lock().unwrap().get(table) {
                Some(Ok(token)) => Ok(token.clone()),
                Some(Err(message)) => Err(ApiError::http(500, message.clone())),
                None => Ok(None),
            }
        }
    }

    fn loader_over(source: Arc<FakeSource>) -> AggregateLoader {
        AggregateLoader::new(source, Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn test_first_load_misses_and_writes_stamp() {
        let source = Arc::new(FakeSource::new());
        source.set_rows("categories", vec![json!({"id": 1, "name": "Madih"})]);
        source.set_version("categories", Some("t1"));
        let loader = loader_over(Arc::clone(&source));

        let response = loader.load_tables("index", &["categories"]).await.unwrap();

        assert!(!response.is_cached());
        assert_eq!(response.data().rows("categories").unwrap().len(), 1);
        assert_eq!(source.fetch_count(), 1);

        let entry = loader
            .store()
            .get(&loader.store().cache_key("index"))
            .await
            .expect("entry written");
        assert_eq!(entry.version_stamp.as_deref(), Some("t1"));
    }

    #[tokio::test]
    async fn test_idempotent_hit_performs_zero_fetches() {
        let source = Arc::new(FakeSource::new());
        source.set_rows("categories", vec![json!({"id": 1})]);
        source.set_rows("pieces", vec![json!({"id": 9})]);
        source.set_version("categories", Some("t1"));
        source.set_version("pieces", Some("t0"));
        let loader = loader_over(Arc::clone(&source));

        loader
            .load_tables("index", &["categories", "pieces"])
            .await
            .unwrap();
        let fetches_after_miss = source.fetch_count();

        let response = loader
            .load_tables("index", &["categories", "pieces"])
            .await
            .unwrap();

        assert!(response.is_cached());
        assert_eq!(source.fetch_count(), fetches_after_miss);
        assert_eq!(response.data().rows("pieces").unwrap(), &[json!({"id": 9})]);
    }

    #[tokio::test]
    async fn test_monotonic_invalidation_on_token_increase() {
        let source = Arc::new(FakeSource::new());
        source.set_rows("pieces", vec![json!({"id": 1, "title": "Qad Kafani"})]);
        source.set_version("pieces", Some("2024-01-01T00:00:00Z"));
        let loader = loader_over(Arc::clone(&source));

        loader.load_tables("pieces", &["pieces"]).await.unwrap();

        // A row changes remotely: rows and token move together.
        source.set_rows("pieces", vec![json!({"id": 1, "title": "Qad Kafani (live)"})]);
        source.set_version("pieces", Some("2024-01-02T00:00:00Z"));

        let response = loader.load_tables("pieces", &["pieces"]).await.unwrap();

        assert!(!response.is_cached());
        assert_eq!(
            response.data().rows("pieces").unwrap()[0]["title"],
            "Qad Kafani (live)"
        );

        let entry = loader
            .store()
            .get(&loader.store().cache_key("pieces"))
            .await
            .unwrap();
        assert_eq!(entry.version_stamp.as_deref(), Some("2024-01-02T00:00:00Z"));
    }

    #[tokio::test]
    async fn test_null_safety_both_blind_is_a_hit() {
        let source = Arc::new(FakeSource::new());
        source.set_rows("site_settings", vec![json!({"key": "title"})]);
        // No versions configured at all: every lookup yields None.
        let loader = loader_over(Arc::clone(&source));

        loader
            .load_tables("settings", &["site_settings"])
            .await
            .unwrap();
        let fetches_after_miss = source.fetch_count();

        let response = loader
            .load_tables("settings", &["site_settings"])
            .await
            .unwrap();

        assert!(response.is_cached());
        assert_eq!(source.fetch_count(), fetches_after_miss);
    }

    #[tokio::test]
    async fn test_stamped_entry_with_blind_oracle_is_a_miss() {
        let source = Arc::new(FakeSource::new());
        source.set_rows("pieces", vec![json!({"id": 1})]);
        source.set_version("pieces", Some("t1"));
        let loader = loader_over(Arc::clone(&source));

        loader.load_tables("pieces", &["pieces"]).await.unwrap();

        // Version tracking goes away: freshness can no longer be proven.
        source.fail_version("pieces");

        let response = loader.load_tables("pieces", &["pieces"]).await.unwrap();
        assert!(!response.is_cached());
    }

    #[tokio::test]
    async fn test_partial_failure_assembles_and_still_writes() {
        let source = Arc::new(FakeSource::new());
        for table in ["categories", "pieces", "imams"] {
            source.set_rows(table, vec![json!({"id": table})]);
            source.set_version(table, Some("t3"));
        }
        source.fail_rows("site_settings");
        source.fail_rows("artistes");
        let tables = ["categories", "pieces", "imams", "site_settings", "artistes"];
        let loader = loader_over(Arc::clone(&source));

        let response = loader.load_tables("index", &tables).await.unwrap();
        let aggregate = response.data();

        assert!(aggregate.is_partial());
        assert_eq!(aggregate.tables.len(), 3);
        assert_eq!(aggregate.failures.len(), 2);
        assert!(aggregate.failure("site_settings").unwrap().contains("connection reset"));

        // The write still happened, stamped with the surviving tables' tokens.
        let entry = loader
            .store()
            .get(&loader.store().cache_key("index"))
            .await
            .expect("entry written despite partial failure");
        assert_eq!(entry.version_stamp.as_deref(), Some("t3"));
    }

    #[tokio::test]
    async fn test_total_failure_surfaces_error() {
        let source = Arc::new(FakeSource::new());
        source.fail_rows("categories");
        source.fail_rows("pieces");
        let loader = loader_over(Arc::clone(&source));

        let err = loader
            .load_tables("index", &["categories", "pieces"])
            .await
            .unwrap_err();

        let failures = err.source_failures().expect("aggregate-level error");
        assert_eq!(failures.len(), 2);

        // Nothing was cached.
        assert!(
            loader
                .store()
                .get(&loader.store().cache_key("index"))
                .await
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_corrupt_payload_self_heals() {
        let source = Arc::new(FakeSource::new());
        source.set_rows("pieces", vec![json!({"id": 1})]);
        source.set_version("pieces", Some("t1"));
        let loader = loader_over(Arc::clone(&source));

        // Plant an unparseable payload under the key the loader will read.
        let key = loader.store().cache_key("pieces");
        loader
            .store()
            .put(&key, CacheEntry::new(b"not json".to_vec(), Some("t1".to_string())))
            .await;

        let response = loader.load_tables("pieces", &["pieces"]).await.unwrap();

        assert!(!response.is_cached());
        assert_eq!(source.fetch_count(), 1);

        // The replacement entry is readable again.
        let entry = loader.store().get(&key).await.unwrap();
        assert!(serde_json::from_slice::<AggregateResult>(&entry.payload).is_ok());
    }

    #[tokio::test]
    async fn test_concrete_scenario_hit_then_invalidate() {
        let source = Arc::new(FakeSource::new());
        source.set_rows("categories", vec![json!({"id": 1})]);
        source.set_rows("pieces", vec![json!({"id": 2})]);
        source.set_version("categories", Some("t1"));
        source.set_version("pieces", Some("t0"));
        let loader = loader_over(Arc::clone(&source));

        // Seed: entry stamped t1 (max of t1, t0).
        loader
            .load_tables("index", &["categories", "pieces"])
            .await
            .unwrap();
        let entry = loader
            .store()
            .get(&loader.store().cache_key("index"))
            .await
            .unwrap();
        assert_eq!(entry.version_stamp.as_deref(), Some("t1"));
        let fetches = source.fetch_count();

        // categories -> t1, pieces -> t0: hit, payload unchanged.
        let response = loader
            .load_tables("index", &["categories", "pieces"])
            .await
            .unwrap();
        assert!(response.is_cached());
        assert_eq!(source.fetch_count(), fetches);

        // pieces -> t2: miss, both tables refetched, new stamp t2.
        source.set_version("pieces", Some("t2"));
        let response = loader
            .load_tables("index", &["categories", "pieces"])
            .await
            .unwrap();
        assert!(!response.is_cached());
        assert_eq!(source.fetch_count(), fetches + 2);

        let entry = loader
            .store()
            .get(&loader.store().cache_key("index"))
            .await
            .unwrap();
        assert_eq!(entry.version_stamp.as_deref(), Some("t2"));
    }

    #[tokio::test]
    async fn test_generic_load_caches_custom_payloads() {
        let source = Arc::new(FakeSource::new());
        source.set_version("site_settings", Some("t1"));
        let loader = loader_over(Arc::clone(&source));

        let response = loader
            .load("greeting", &["site_settings"], || async {
                Ok::<_, Error>("ahlan".to_string())
            })
            .await
            .unwrap();
        assert!(!response.is_cached());

        let response = loader
            .load("greeting", &["site_settings"], || async {
                Err::<String, Error>(ApiError::http(500, "fetch must not run on a hit").into())
            })
            .await
            .unwrap();
        assert!(response.is_cached());
        assert_eq!(response.data(), "ahlan");
    }
}
