//! In-memory cache store using DashMap

use async_trait::async_trait;
use dashmap::DashMap;

use super::CacheConfig;
use super::CacheEntry;
use super::CacheStore;

/// An in-memory cache store backed by a concurrent hash map.
///
/// Fast and thread-safe, but entries are lost when the process exits. Used
/// in tests and wherever persistence across restarts is not wanted.
///
/// # Example
///
/// ```
/// use inshad_lib::cache::MemoryStore;
///
/// let store = MemoryStore::new();
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, CacheEntry>,
    config: CacheConfig,
}

impl MemoryStore {
    /// Creates a new empty store with the default configuration.
    pub fn new() -> Self {
        Self::with_config(CacheConfig::default())
    }

    /// Creates a new empty store with the given configuration.
    pub fn with_config(config: CacheConfig) -> Self {
        Self {
            entries: DashMap::new(),
            config,
        }
    }

    /// Returns the number of entries in the store (including expired ones).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    fn cache_key(&self, name: &str) -> String {
        format!("{}:{}", self.config.namespace, name)
    }

    async fn get(&self, key: &str) -> Option<CacheEntry> {
        let entry = self.entries.get(key)?;
        if entry.is_expired(self.config.max_entry_age) {
            drop(entry);
            self.entries.remove(key);
            None
        } else {
            Some(entry.clone())
        }
    }

    async fn put(&self, key: &str, entry: CacheEntry) {
        self.entries.insert(key.to_string(), entry);
    }

    async fn remove(&self, key: &str) {
        self.entries.remove(key);
    }

    async fn clear_all(&self) {
        let prefix = format!("{}:", self.config.namespace);
        self.entries.retain(|key, _| !key.starts_with(&prefix));
    }

    async fn prune(&self) -> usize {
        let mut removed = 0;
        self.entries.retain(|_, entry| {
            if entry.is_expired(self.config.max_entry_age) {
                removed += 1;
                false
            } else {
                true
            }
        });
        removed
    }
}
