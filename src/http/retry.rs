//! Rate-limit retry policy.

use reqwest::header::{HeaderMap, RETRY_AFTER};

/// Default number of retries after an HTTP 429 response.
pub const MAX_RETRIES: usize = 3;

/// Delay in seconds used when a 429 response carries no usable `Retry-After`.
pub const DEFAULT_RETRY_AFTER_SECS: u64 = 5;

/// Error code attached to a rate-limit error once the retry budget is spent.
pub const RATE_LIMIT_CODE: &str = "RATE_LIMIT_EXCEEDED";

/// Reads the `Retry-After` header as whole seconds.
///
/// Falls back to [`DEFAULT_RETRY_AFTER_SECS`] when the header is absent or is
/// not a non-negative integer (HTTP-date values included).
pub fn parse_retry_after(headers: &HeaderMap) -> u64 {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(DEFAULT_RETRY_AFTER_SECS)
}
