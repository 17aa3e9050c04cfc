//! High-level catalog access for the content screens.

use std::sync::Arc;

use crate::api;
use crate::cache::CacheStore;
use crate::error::Error;
use crate::fetch::AggregateLoader;
use crate::model::AggregateResult;
use crate::model::Row;
use crate::response::Response;
use crate::source::RemoteSource;

/// The tables the landing page aggregates.
pub const HOME_TABLES: [&str; 5] = ["categories", "pieces", "imams", "site_settings", "artistes"];

/// Columns searched by [`Catalog::search_pieces`].
pub const PIECE_SEARCH_FIELDS: [&str; 3] = ["title", "poet", "performer"];

/// Cache key for the landing-page aggregate.
const HOME_KEY: &str = "index";

/// Entry point for the content screens.
///
/// Every list-fetching screen goes through the cached
/// [`AggregateLoader`]; search goes straight to the service.
///
/// # Example
///
/// ```ignore
/// let catalog = Catalog::new(Arc::new(client), Arc::new(store));
///
/// let home = catalog.home().await?;
/// for category in home.data().rows("categories").unwrap_or_default() {
///     println!("{}", category["name"]);
/// }
/// ```
pub struct Catalog {
    loader: AggregateLoader,
    source: Arc<dyn RemoteSource>,
}

impl Catalog {
    /// Creates a new catalog over a source and a cache store.
    pub fn new(source: Arc<dyn RemoteSource>, store: Arc<dyn CacheStore>) -> Self {
        let loader = AggregateLoader::new(Arc::clone(&source), store);
        Self { loader, source }
    }

    /// Returns the underlying loader.
    pub fn loader(&self) -> &AggregateLoader {
        &self.loader
    }

    /// Loads the landing-page aggregate: all five content tables.
    pub async fn home(&self) -> Result<Response<AggregateResult>, Error> {
        self.loader.load_tables(HOME_KEY, &HOME_TABLES).await
    }

    /// Loads a single table's rows through the cache.
    ///
    /// The table name doubles as the cache key, so each list screen gets
    /// its own entry.
    pub async fn section(&self, table: &str) -> Result<Response<AggregateResult>, Error> {
        self.loader.load_tables(table, &[table]).await
    }

    /// Searches pieces by title, poet, or performer.
    pub async fn search_pieces(&self, term: &str) -> Result<Vec<Row>, Error> {
        let rows = api::search(
            self.source.as_ref(),
            "pieces",
            &PIECE_SEARCH_FIELDS,
            term,
            "id",
        )
        .await?;
        Ok(rows)
    }
}
