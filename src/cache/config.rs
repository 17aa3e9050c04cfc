//! Cache configuration

use std::time::Duration;

/// Configuration shared by cache store implementations.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use inshad_lib::cache::CacheConfig;
///
/// let config = CacheConfig::default()
///     .with_namespace("aggregate:v2")
///     .with_max_entry_age(Duration::from_secs(86_400));
/// ```
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Key namespace. Every key the store owns is prefixed with
    /// `<namespace>:`, so `clear_all` cannot touch unrelated data.
    ///
    /// Default: `aggregate:v1`
    pub namespace: String,

    /// Absolute upper bound on entry age, used only for storage pruning.
    /// Freshness decisions use version tokens, never this bound.
    ///
    /// Default: 7 days
    pub max_entry_age: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            namespace: "aggregate:v1".to_string(),
            max_entry_age: Duration::from_secs(7 * 24 * 3600),
        }
    }
}

impl CacheConfig {
    /// Creates a new cache config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the key namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Sets the maximum entry age.
    pub fn with_max_entry_age(mut self, max_age: Duration) -> Self {
        self.max_entry_age = max_age;
        self
    }
}
