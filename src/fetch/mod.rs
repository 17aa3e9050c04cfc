//! Cached aggregate fetching
//!
//! The [`VersionOracle`] answers "what is the current version token of this
//! table" and the [`AggregateLoader`] owns the hit/miss decision and the
//! concurrent fetch/assemble/write-back cycle that sits in front of every
//! list-fetching screen.

mod loader;
mod oracle;

pub use loader::AggregateLoader;
pub use oracle::VersionOracle;
pub use oracle::latest_token;
