//! Error taxonomy for knowledge-base API calls.
//!
//! Every non-2xx response maps to exactly one variant. The variant tells the
//! caller what went wrong; the attached [`ApiError`] carries the server's
//! message, its machine-readable code and the HTTP status.

use std::fmt;

use reqwest::StatusCode;

/// Result alias used throughout the library.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Details reported by the server for a failed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub message: String,
    pub code: Option<String>,
    pub status: Option<u16>,
}

impl ApiError {
    pub fn new(message: impl Into<String>, code: Option<String>, status: Option<u16>) -> Self {
        Self {
            message: message.into(),
            code,
            status,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.code {
            Some(code) => write!(f, "{} [{}]", self.message, code),
            None => write!(f, "{}", self.message),
        }
    }
}

/// Errors returned by the client.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// API key is missing, invalid or revoked (HTTP 401).
    #[error("Authentication failed: {0}")]
    Authentication(ApiError),

    /// API key lacks the required scope (HTTP 403).
    #[error("Access forbidden: {0}")]
    Forbidden(ApiError),

    /// Requested resource does not exist (HTTP 404).
    #[error("Not found: {0}")]
    NotFound(ApiError),

    /// Request parameters failed server-side validation (HTTP 400).
    #[error("Validation failed: {0}")]
    Validation(ApiError),

    /// Still rate limited after every retry was spent (HTTP 429).
    #[error("Rate limit exceeded: {detail} (retry after {retry_after}s)")]
    RateLimit { detail: ApiError, retry_after: u64 },

    /// Server-side failure (HTTP 5xx) or a success response that was not JSON.
    #[error("Server error: {0}")]
    Server(ApiError),

    /// Any other non-2xx status.
    #[error("Unexpected HTTP {status}: {0}", status = .0.status.unwrap_or_default())]
    Api(ApiError),

    /// The request never produced a response (connection, timeout, TLS).
    #[error("HTTP request failed: {0}")]
    Transport(#[source] reqwest::Error),

    /// A request body could not be serialized before sending.
    #[error("Failed to encode request body: {0}")]
    Encode(#[source] serde_json::Error),

    /// The client could not be configured.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Builds the error matching a non-success, non-429 status.
    pub fn from_status(status: StatusCode, detail: ApiError) -> Self {
        match status {
            StatusCode::BAD_REQUEST => Error::Validation(detail),
            StatusCode::UNAUTHORIZED => Error::Authentication(detail),
            StatusCode::FORBIDDEN => Error::Forbidden(detail),
            StatusCode::NOT_FOUND => Error::NotFound(detail),
            s if s.is_server_error() => Error::Server(detail),
            _ => Error::Api(detail),
        }
    }

    fn detail(&self) -> Option<&ApiError> {
        match self {
            Error::Authentication(d)
            | Error::Forbidden(d)
            | Error::NotFound(d)
            | Error::Validation(d)
            | Error::Server(d)
            | Error::Api(d) => Some(d),
            Error::RateLimit { detail, .. } => Some(detail),
            Error::Transport(_) | Error::Encode(_) | Error::Config(_) => None,
        }
    }

    /// HTTP status of the failed response, if there was one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Transport(e) => e.status().map(|s| s.as_u16()),
            other => other.detail().and_then(|d| d.status),
        }
    }

    /// Machine-readable error code from the response envelope.
    pub fn code(&self) -> Option<&str> {
        self.detail().and_then(|d| d.code.as_deref())
    }

    /// Seconds the server asked to wait, for rate-limit errors.
    pub fn retry_after(&self) -> Option<u64> {
        match self {
            Error::RateLimit { retry_after, .. } => Some(*retry_after),
            _ => None,
        }
    }
}
