//! J-Quants API V2 client.
//!
//! Blocking HTTP client for the two endpoints the pipeline consumes: the
//! listed-company master and the daily bar endpoint. Handles API-key auth,
//! `pagination_key` pagination, and bounded retry on rate limits.
//!
//! The free plan only serves data between 12 weeks and about two years back;
//! the extraction window in [`crate::source::extract`] accounts for that.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

pub const API_BASE_URL: &str = "https://api.jquants.com/v2";

/// Environment variable holding the API key (dashboard-issued).
pub const API_KEY_ENV: &str = "JQUANTS_API_KEY";

/// Retry and pacing knobs.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    /// Base wait after a 429; grows linearly with the attempt number.
    pub retry_delay: Duration,
    /// Pause between successive requests in the day-by-day price loop.
    pub request_interval: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay: Duration::from_secs(3),
            request_interval: Duration::from_millis(500),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("authentication failed (HTTP {status}): {message} — check JQUANTS_API_KEY")]
    Authentication { status: u16, message: String },

    #[error("rate limited by the provider and out of retries")]
    RateLimited,

    #[error("network error: {0}")]
    Network(String),

    #[error("unexpected response (HTTP {status}): {message}")]
    Http { status: u16, message: String },

    #[error("response format changed: {0}")]
    ResponseFormat(String),

    #[error("environment variable {0} is not set — put your API key in the environment or a .env file")]
    MissingApiKey(&'static str),
}

/// One page of a paginated endpoint response.
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct Page<T> {
    #[serde(default)]
    pub data: Vec<T>,
    pub pagination_key: Option<String>,
}

#[derive(Debug)]
pub struct JQuantsClient {
    client: reqwest::blocking::Client,
    base_url: String,
    api_key: String,
    retry: RetryConfig,
}

impl JQuantsClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(API_BASE_URL, api_key)
    }

    /// Client against a non-default base URL (test doubles, mirrors).
    pub fn with_base_url(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("failed to build HTTP client");

        Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
            retry: RetryConfig::default(),
        }
    }

    /// Read the API key from the environment. The caller is responsible for
    /// loading `.env` first if it wants dotfile support.
    pub fn from_env() -> Result<Self, SourceError> {
        match std::env::var(API_KEY_ENV) {
            Ok(key) if !key.is_empty() => Ok(Self::new(key)),
            _ => Err(SourceError::MissingApiKey(API_KEY_ENV)),
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn request_interval(&self) -> Duration {
        self.retry.request_interval
    }

    /// Fetch every page of an endpoint, following `pagination_key` until the
    /// provider stops returning one. Pages are concatenated in order.
    pub fn get_all_pages<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(String, String)],
    ) -> Result<Vec<T>, SourceError> {
        let mut params = params.to_vec();
        let mut page: Page<T> = self.get_page(endpoint, &params)?;
        let mut data = std::mem::take(&mut page.data);

        while let Some(key) = page.pagination_key {
            params.retain(|(name, _)| name != "pagination_key");
            params.push(("pagination_key".to_string(), key));
            page = self.get_page(endpoint, &params)?;
            data.append(&mut page.data);
        }

        Ok(data)
    }

    /// One GET with bounded retry on HTTP 429.
    fn get_page<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(String, String)],
    ) -> Result<Page<T>, SourceError> {
        let url = format!("{}{}", self.base_url, endpoint);

        for attempt in 0..self.retry.max_retries {
            if attempt > 0 {
                std::thread::sleep(self.retry.retry_delay * attempt);
            }

            let response = self
                .client
                .get(&url)
                .header("x-api-key", &self.api_key)
                .query(params)
                .send()
                .map_err(|e| SourceError::Network(e.to_string()))?;

            let status = response.status();

            if status == reqwest::StatusCode::UNAUTHORIZED
                || status == reqwest::StatusCode::FORBIDDEN
            {
                return Err(SourceError::Authentication {
                    status: status.as_u16(),
                    message: extract_error_message(response),
                });
            }

            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                continue;
            }

            if !status.is_success() {
                return Err(SourceError::Http {
                    status: status.as_u16(),
                    message: extract_error_message(response),
                });
            }

            return response
                .json()
                .map_err(|e| SourceError::ResponseFormat(e.to_string()));
        }

        Err(SourceError::RateLimited)
    }
}

/// Pull the provider's `message` field out of an error body, falling back to
/// the raw text.
fn extract_error_message(response: reqwest::blocking::Response) -> String {
    let text = response.text().unwrap_or_default();
    serde_json::from_str::<serde_json::Value>(&text)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
        .unwrap_or(text)
}
