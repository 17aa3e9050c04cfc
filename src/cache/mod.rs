//! Versioned read cache
//!
//! Provides the [`CacheStore`] trait and implementations for storing
//! serialized aggregate payloads, each tagged with the version stamp that
//! was current when the payload was written. The fetch orchestrator
//! compares stamps against live version tokens to decide hit vs miss;
//! wall-clock age is used only for storage pruning.

mod config;
mod memory;
mod sqlite;

pub use config::*;
pub use memory::*;
pub use sqlite::*;

use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;

/// Reserved key name for the application build identifier.
const BUILD_KEY: &str = "app-build";

/// A cached aggregate payload with its version stamp.
///
/// Entries are immutable once written: staleness is detected by comparing
/// the stamp against live tokens, never by mutating the entry. A write
/// fully replaces any prior entry under the same key.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The serialized payload. Opaque to the store.
    pub payload: Vec<u8>,
    /// The highest version token observed across the aggregate's dependent
    /// tables at write time. `None` means no version info was available.
    pub version_stamp: Option<String>,
    /// When this entry was written. Used only for absolute-age pruning.
    pub written_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Creates a new entry stamped with the current time.
    pub fn new(payload: Vec<u8>, version_stamp: Option<String>) -> Self {
        Self {
            payload,
            version_stamp,
            written_at: Utc::now(),
        }
    }

    /// Creates an entry with an explicit write time.
    pub fn with_written_at(
        payload: Vec<u8>,
        version_stamp: Option<String>,
        written_at: DateTime<Utc>,
    ) -> Self {
        Self {
            payload,
            version_stamp,
            written_at,
        }
    }

    /// Returns `true` if the entry is older than `max_age`.
    pub fn is_expired(&self, max_age: std::time::Duration) -> bool {
        let max_age = chrono::Duration::from_std(max_age).unwrap_or(chrono::Duration::MAX);
        Utc::now() - self.written_at >= max_age
    }
}

/// Trait for cache stores.
///
/// Implementations persist entries under namespaced string keys. They are
/// responsible for:
/// - Treating corrupt or age-expired stored values as absent in `get()`
/// - Dropping (and logging) failed writes instead of propagating them
/// - Scoping `clear_all()` to their own namespace
///
/// A cache fault must never block returning fresh data to the caller, so
/// the mutating operations are infallible by signature.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Maps a logical aggregate name to the storage key.
    ///
    /// Deterministic and collision-free across distinct names.
    fn cache_key(&self, name: &str) -> String;

    /// Retrieves an entry by key.
    ///
    /// Returns `None` if the key is missing, the stored value cannot be
    /// read back, or the entry exceeded the configured maximum age.
    async fn get(&self, key: &str) -> Option<CacheEntry>;

    /// Stores an entry, fully replacing any prior entry under `key`.
    async fn put(&self, key: &str, entry: CacheEntry);

    /// Removes an entry.
    async fn remove(&self, key: &str);

    /// Removes every entry in the store's namespace.
    async fn clear_all(&self);

    /// Removes age-expired entries. Returns the number removed.
    async fn prune(&self) -> usize;
}

/// Clears the cache when the application build changes.
///
/// Compares `build` against the identifier stored under a reserved key; on
/// mismatch (or first run) wipes the namespace and stamps the new build.
/// Returns `true` if a purge happened.
///
/// # Example
///
/// ```ignore
/// let purged = cache::purge_on_build_change(store.as_ref(), env!("CARGO_PKG_VERSION")).await;
/// if purged {
///     log::info!("cache cleared for new build");
/// }
/// ```
pub async fn purge_on_build_change(store: &dyn CacheStore, build: &str) -> bool {
    let key = store.cache_key(BUILD_KEY);
    let stored = store
        .get(&key)
        .await
        .and_then(|entry| String::from_utf8(entry.payload).ok());

    if stored.as_deref() == Some(build) {
        return false;
    }

    store.clear_all().await;
    store
        .put(&key, CacheEntry::new(build.as_bytes().to_vec(), None))
        .await;
    true
}
