//! HTTP dispatch for the agent API: auth headers, rate-limit retry and
//! status-to-error mapping.

mod client;
mod retry;

pub use client::{API_PREFIX, HttpClient};
pub use retry::{DEFAULT_RETRY_AFTER_SECS, MAX_RETRIES, RATE_LIMIT_CODE, parse_retry_after};
