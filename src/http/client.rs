//! Request dispatcher with rate-limit retry and status mapping.

use std::time::Duration;

use log::{debug, warn};
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::retry::{DEFAULT_RETRY_AFTER_SECS, RATE_LIMIT_CODE, parse_retry_after};
use crate::config::ClientConfig;
use crate::error::{ApiError, Error, Result};

/// Path prefix of the agent API under the base URL.
pub const API_PREFIX: &str = "/api/agent";

/// HTTP client for the agent API, retrying on HTTP 429.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    api_url: String,
    max_retries: usize,
}

impl HttpClient {
    /// Wraps an already configured reqwest Client.
    ///
    /// `base_url` is the service root; [`API_PREFIX`] is appended to it.
    pub fn new(client: Client, base_url: &str, max_retries: usize) -> Self {
        Self {
            client,
            api_url: format!("{}{}", base_url.trim_end_matches('/'), API_PREFIX),
            max_retries,
        }
    }

    /// Builds a reqwest Client carrying auth headers and the request timeout.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let mut auth_value = HeaderValue::from_str(&format!("Bearer {}", config.api_key))
            .map_err(|e| Error::Config(format!("API key is not a valid header value: {}", e)))?;
        auth_value.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth_value);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        debug!(
            "Using API key for authentication: {}",
            config.redacted_api_key()
        );

        let client = Client::builder()
            .user_agent(concat!("symbio-kb/", env!("SKB_VERSION")))
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self::new(client, &config.base_url, config.max_retries))
    }

    /// Full URL for an API path such as `/pages`.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }

    /// Sends a request and deserializes the decoded body into `T`.
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<T> {
        let value = self.send(method, path, query, body).await?;
        serde_json::from_value(value).map_err(|e| {
            Error::Server(ApiError::new(
                format!("Unexpected response shape from {}: {}", path, e),
                None,
                None,
            ))
        })
    }

    /// Sends a request and returns the decoded JSON body of a 2xx response.
    ///
    /// A 429 response is reissued after its `Retry-After` delay, at most
    /// `max_retries` times. Any other status is mapped to an [`Error`].
    #[tracing::instrument(skip(self, query, body))]
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<Value> {
        let url = self.url(path);
        let mut retry_after = DEFAULT_RETRY_AFTER_SECS;

        for attempt in 0..=self.max_retries {
            debug!("{} {} with query {:?}...", method, url, query);

            let mut request = self.client.request(method.clone(), &url);
            if !query.is_empty() {
                request = request.query(query);
            }
            if let Some(body) = body {
                request = request.json(body);
            }

            let response = request.send().await.map_err(Error::Transport)?;

            if response.status() != StatusCode::TOO_MANY_REQUESTS {
                return decode_response(response).await;
            }

            retry_after = parse_retry_after(response.headers());
            if attempt < self.max_retries {
                warn!(
                    "{} {}: rate limited (attempt {}/{}), retrying in {}s...",
                    method,
                    path,
                    attempt + 1,
                    self.max_retries.saturating_add(1),
                    retry_after
                );
                tokio::time::sleep(Duration::from_secs(retry_after)).await;
            }
        }

        Err(Error::RateLimit {
            detail: ApiError::new(
                "Rate limit exceeded after all retries",
                Some(RATE_LIMIT_CODE.to_string()),
                Some(StatusCode::TOO_MANY_REQUESTS.as_u16()),
            ),
            retry_after,
        })
    }
}

/// Turns a non-429 response into a decoded body or a typed error.
async fn decode_response(response: Response) -> Result<Value> {
    let status = response.status();
    let text = response.text().await.map_err(Error::Transport)?;
    let body = serde_json::from_str::<Value>(&text).ok();

    if status.is_success() {
        return body.ok_or_else(|| {
            Error::Server(ApiError::new(
                format!("Non-JSON response (HTTP {})", status.as_u16()),
                None,
                Some(status.as_u16()),
            ))
        });
    }

    debug!("HTTP {} error body: {}", status.as_u16(), text);
    Err(Error::from_status(
        status,
        error_detail(status, body.as_ref(), &text),
    ))
}

/// Extracts `error.{code,message}` from an error envelope.
fn error_detail(status: StatusCode, body: Option<&Value>, text: &str) -> ApiError {
    let error = body.and_then(|b| b.get("error"));
    let code = error
        .and_then(|e| e.get("code"))
        .and_then(Value::as_str)
        .map(str::to_string);
    let message = error
        .and_then(|e| e.get("message"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(|| (!text.trim().is_empty()).then(|| text.trim().to_string()))
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Unknown error")
                .to_string()
        });

    ApiError::new(message, code, Some(status.as_u16()))
}
