//! Inshad content client library
//!
//! A Rust async client for a recitation/poetry content service. The heart
//! of the crate is a versioned read cache: every list screen's aggregate is
//! cached locally and revalidated against per-table version tokens from the
//! service, so a page load costs zero data fetches unless something it
//! depends on actually changed.

pub mod api;
pub mod auth;
pub mod cache;
pub mod catalog;
pub mod error;
pub mod fetch;
pub mod model;
pub mod rate_limit;
pub mod response;
pub mod source;

mod client;

pub use client::*;
pub use response::CacheStatus;
pub use response::Response;
