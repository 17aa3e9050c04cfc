//! Cache storage error types

/// Errors that can occur while opening or maintaining a cache store.
///
/// Read and write faults inside a store are recovered internally (a corrupt
/// entry reads as absent, a failed write is dropped and logged), so this
/// type only covers setup-time failures such as opening the database file.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Failed to open or initialize the underlying SQLite database.
    #[error("Cache database error: {0}")]
    Database(#[from] async_sqlite::Error),
}
