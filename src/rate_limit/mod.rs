//! Request throttling and retry configuration.

mod concurrency;
mod retry;

pub use concurrency::ConcurrencyLimiter;
pub use retry::RetryConfig;
