//! SQLite-backed persistent cache store.

use std::path::Path;

use async_sqlite::Client;
use async_sqlite::ClientBuilder;
use async_sqlite::JournalMode;
use async_sqlite::rusqlite;
use async_trait::async_trait;
use chrono::TimeZone;
use chrono::Utc;

use super::CacheConfig;
use super::CacheEntry;
use super::CacheStore;
use crate::error::StoreError;

/// A persistent cache store backed by SQLite.
///
/// Entries survive process restarts and are scoped to the local device.
/// Uses WAL journal mode for better concurrent read performance. Storage
/// faults after open are absorbed: a row that cannot be read back is
/// treated as absent and a write that fails is logged and dropped.
///
/// # Example
///
/// ```ignore
/// use inshad_lib::cache::SqliteStore;
///
/// // File-based store
/// let store = SqliteStore::open("cache.db").await?;
///
/// // In-memory store (for testing)
/// let store = SqliteStore::open_in_memory().await?;
/// ```
pub struct SqliteStore {
    client: Client,
    config: CacheConfig,
}

impl SqliteStore {
    /// Opens a SQLite store at the specified path with default config.
    ///
    /// Creates the database file and cache table if they don't exist.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::open_with_config(path, CacheConfig::default()).await
    }

    /// Opens a SQLite store at the specified path.
    pub async fn open_with_config(
        path: impl AsRef<Path>,
        config: CacheConfig,
    ) -> Result<Self, StoreError> {
        let client = ClientBuilder::new()
            .path(path)
            .journal_mode(JournalMode::Wal)
            .open()
            .await?;

        Self::init_schema(&client).await?;

        Ok(Self { client, config })
    }

    /// Opens an in-memory SQLite store.
    ///
    /// Useful for testing. Entries are lost when the store is dropped.
    pub async fn open_in_memory() -> Result<Self, StoreError> {
        let client = ClientBuilder::new().path(":memory:").open().await?;

        Self::init_schema(&client).await?;

        Ok(Self {
            client,
            config: CacheConfig::default(),
        })
    }

    /// Initializes the cache table schema.
    async fn init_schema(client: &Client) -> Result<(), async_sqlite::Error> {
        client
            .conn(|conn| {
                conn.execute(
                    "CREATE TABLE IF NOT EXISTS cache (
                        key TEXT PRIMARY KEY,
                        payload BLOB NOT NULL,
                        version_stamp TEXT,
                        written_at INTEGER NOT NULL
                    )",
                    [],
                )?;
                // Index for efficient pruning
                conn.execute(
                    "CREATE INDEX IF NOT EXISTS idx_cache_written_at ON cache(written_at)",
                    [],
                )?;
                Ok(())
            })
            .await
    }

    /// Returns the number of entries in the store (including expired ones).
    pub async fn len(&self) -> Result<usize, StoreError> {
        let count = self
            .client
            .conn(|conn| {
                conn.query_row("SELECT COUNT(*) FROM cache", [], |row| row.get::<_, i64>(0))
            })
            .await?;
        Ok(count as usize)
    }

    /// Returns `true` if the store is empty.
    pub async fn is_empty(&self) -> Result<bool, StoreError> {
        self.len().await.map(|len| len == 0)
    }

    fn age_cutoff(&self) -> i64 {
        chrono::Duration::from_std(self.config.max_entry_age)
            .ok()
            .and_then(|max_age| Utc::now().checked_sub_signed(max_age))
            .map(|cutoff| cutoff.timestamp())
            .unwrap_or(i64::MIN)
    }
}

#[async_trait]
impl CacheStore for SqliteStore {
    fn cache_key(&self, name: &str) -> String {
        format!("{}:{}", self.config.namespace, name)
    }

    async fn get(&self, key: &str) -> Option<CacheEntry> {
        let key = key.to_string();
        let cutoff = self.age_cutoff();

        let result = self
            .client
            .conn(move |conn| {
                conn.query_row(
                    "SELECT payload, version_stamp, written_at FROM cache
                     WHERE key = ? AND written_at > ?",
                    rusqlite::params![key, cutoff],
                    |row| {
                        let payload: Vec<u8> = row.get(0)?;
                        let version_stamp: Option<String> = row.get(1)?;
                        let written_at: i64 = row.get(2)?;
                        Ok((payload, version_stamp, written_at))
                    },
                )
            })
            .await;

        match result {
            Ok((payload, version_stamp, written_at)) => {
                let written_at = Utc.timestamp_opt(written_at, 0).single()?;
                Some(CacheEntry::with_written_at(payload, version_stamp, written_at))
            }
            Err(_) => None,
        }
    }

    async fn put(&self, key: &str, entry: CacheEntry) {
        let key = key.to_string();
        let payload = entry.payload;
        let version_stamp = entry.version_stamp;
        let written_at = entry.written_at.timestamp();

        let result = self
            .client
            .conn(move |conn| {
                conn.execute(
                    "INSERT OR REPLACE INTO cache (key, payload, version_stamp, written_at)
                     VALUES (?, ?, ?, ?)",
                    rusqlite::params![key, payload, version_stamp, written_at],
                )
            })
            .await;

        if let Err(err) = result {
            log::warn!("[cache] dropped write: {}", err);
        }
    }

    async fn remove(&self, key: &str) {
        let key = key.to_string();

        let result = self
            .client
            .conn(move |conn| conn.execute("DELETE FROM cache WHERE key = ?", [key]))
            .await;

        if let Err(err) = result {
            log::warn!("[cache] failed to remove entry: {}", err);
        }
    }

    async fn clear_all(&self) {
        let prefix = format!("{}:%", self.config.namespace);

        let result = self
            .client
            .conn(move |conn| conn.execute("DELETE FROM cache WHERE key LIKE ?", [prefix]))
            .await;

        if let Err(err) = result {
            log::warn!("[cache] failed to clear: {}", err);
        }
    }

    async fn prune(&self) -> usize {
        let cutoff = self.age_cutoff();

        self.client
            .conn(move |conn| conn.execute("DELETE FROM cache WHERE written_at <= ?", [cutoff]))
            .await
            .unwrap_or_else(|err| {
                log::warn!("[cache] prune failed: {}", err);
                0
            })
    }
}
