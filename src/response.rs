//! Response wrapper with cache status

use chrono::DateTime;
use chrono::Utc;

/// A response from the cached fetch layer that includes cache status.
///
/// All orchestrated loads return this wrapper so callers can determine
/// whether the data came from cache or was freshly fetched, e.g. for
/// logging. Correctness never depends on it.
///
/// # Example
///
/// ```ignore
/// let response = catalog.home().await?;
///
/// if response.is_cached() {
///     println!("Served from cache, written at {:?}", response.written_at());
/// }
///
/// let aggregate = response.into_inner();
/// ```
#[derive(Debug, Clone)]
pub struct Response<T> {
    data: T,
    /// Whether this response came from cache.
    pub cache: CacheStatus,
}

impl<T> Response<T> {
    /// Creates a response for a cache hit.
    pub fn cache_hit(data: T, written_at: DateTime<Utc>, version_stamp: Option<String>) -> Self {
        Self {
            data,
            cache: CacheStatus::Hit {
                written_at,
                version_stamp,
            },
        }
    }

    /// Creates a response for a cache miss (freshly fetched, now cached).
    pub fn cache_miss(data: T, written_at: DateTime<Utc>) -> Self {
        Self {
            data,
            cache: CacheStatus::Miss { written_at },
        }
    }

    /// Returns `true` if this response came from the cache.
    pub fn is_cached(&self) -> bool {
        self.cache.is_hit()
    }

    /// Returns when the payload was written to the cache.
    pub fn written_at(&self) -> DateTime<Utc> {
        match &self.cache {
            CacheStatus::Hit { written_at, .. } | CacheStatus::Miss { written_at } => *written_at,
        }
    }

    /// Returns a reference to the inner data.
    pub fn data(&self) -> &T {
        &self.data
    }

    /// Consumes the response and returns the inner data.
    pub fn into_inner(self) -> T {
        self.data
    }

    /// Maps the inner data using the provided function.
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Response<U> {
        Response {
            data: f(self.data),
            cache: self.cache,
        }
    }
}

/// Cache status for a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheStatus {
    /// Cache hit: the payload was returned from cache, no remote fetch.
    Hit {
        /// When the payload was originally written.
        written_at: DateTime<Utc>,
        /// The version stamp the payload was written under.
        version_stamp: Option<String>,
    },
    /// Cache miss: the payload was freshly fetched and is now cached.
    Miss {
        /// When the payload was written back.
        written_at: DateTime<Utc>,
    },
}

impl CacheStatus {
    /// Returns `true` if this is a cache hit.
    pub fn is_hit(&self) -> bool {
        matches!(self, Self::Hit { .. })
    }

    /// Returns `true` if this is a cache miss.
    pub fn is_miss(&self) -> bool {
        matches!(self, Self::Miss { .. })
    }
}
