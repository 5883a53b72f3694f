//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests of a harvest, including:
//! - Building the HTTP client with the configured user agent and timeout
//! - Single JSON GET requests with status and Content-Type validation
//! - Error classification into transient and terminal failures
//! - Rate-limited retries with exponential backoff

use crate::config::{CrawlerConfig, RemoteConfig};
use crate::limiter::CompositeLimiter;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Longest delay between two attempts, whatever the attempt number
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Failure of a single request attempt
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request timed out")]
    Timeout,

    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Failed to read response body: {0}")]
    Body(String),

    #[error("HTTP status {0}")]
    Status(u16),

    #[error("Unexpected Content-Type '{0}'")]
    ContentType(String),

    #[error("Response is not valid JSON: {0}")]
    InvalidJson(String),
}

impl FetchError {
    /// Returns true if repeating the request may succeed
    ///
    /// | Failure | Transient |
    /// |---------|-----------|
    /// | Timeout, connection or other request error | yes |
    /// | Body interrupted while reading | yes |
    /// | HTTP 5xx, HTTP 429 | yes |
    /// | Other HTTP status | no |
    /// | Non-JSON Content-Type | no |
    /// | Invalid JSON in a successful response | no |
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout | Self::Connect(_) | Self::Request(_) | Self::Body(_) => true,
            Self::Status(code) => *code >= 500 || *code == 429,
            Self::ContentType(_) | Self::InvalidJson(_) => false,
        }
    }

    fn from_request(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout
        } else if error.is_connect() {
            Self::Connect(error.to_string())
        } else {
            Self::Request(error.to_string())
        }
    }
}

/// A parsed JSON response
#[derive(Debug, Clone)]
pub struct FetchedDocument {
    pub payload: Value,
    /// Body exactly as received
    pub raw: String,
}

/// Result of fetching one URL with retries
#[derive(Debug)]
pub enum FetchOutcome {
    /// The document was fetched and parsed
    Fetched {
        document: FetchedDocument,
        attempts: u32,
    },

    /// Every attempt failed transiently
    Exhausted { attempts: u32, last_error: FetchError },

    /// A terminal failure; no further attempts were made
    Rejected { attempts: u32, error: FetchError },
}

impl FetchOutcome {
    /// Number of requests issued
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Fetched { attempts, .. }
            | Self::Exhausted { attempts, .. }
            | Self::Rejected { attempts, .. } => *attempts,
        }
    }
}

/// Retry bound and backoff schedule for transient failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry; doubled for each further retry
    pub backoff_base: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            backoff_base: Duration::from_millis(config.retry_backoff_ms),
        }
    }

    /// Total number of requests allowed for one URL
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Delay after failed attempt number `attempt` (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.backoff_base
            .saturating_mul(1u32 << exponent)
            .min(MAX_BACKOFF)
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The remote API configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(config: &RemoteConfig) -> Result<Client, reqwest::Error> {
    let timeout = Duration::from_secs(config.request_timeout_secs);

    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Returns true for `application/json` and `+json` media types
fn is_json_content_type(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();
    essence == "application/json" || essence.ends_with("+json")
}

/// Issues one JSON GET request
///
/// The response must have a success status and a JSON Content-Type, and
/// its body must parse as JSON.
pub async fn fetch_json(client: &Client, url: &str) -> Result<FetchedDocument, FetchError> {
    let response = client
        .get(url)
        .header(ACCEPT, "application/json")
        .send()
        .await
        .map_err(FetchError::from_request)?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status(status.as_u16()));
    }

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    if !is_json_content_type(&content_type) {
        return Err(FetchError::ContentType(content_type));
    }

    let raw = response.text().await.map_err(|e| {
        if e.is_timeout() {
            FetchError::Timeout
        } else {
            FetchError::Body(e.to_string())
        }
    })?;

    let payload =
        serde_json::from_str(&raw).map_err(|e| FetchError::InvalidJson(e.to_string()))?;

    Ok(FetchedDocument { payload, raw })
}

/// Fetches `url`, retrying transient failures
///
/// Every attempt first acquires `limiter`; its permit is held until the
/// response has been read. Failures are returned as a [`FetchOutcome`], never
/// as an error, so callers handle them with ordinary branching.
pub async fn fetch_with_retry(
    client: &Client,
    limiter: &CompositeLimiter,
    policy: &RetryPolicy,
    url: &str,
) -> FetchOutcome {
    let max_attempts = policy.max_attempts();
    let mut attempt = 0;

    loop {
        attempt += 1;

        let result = {
            let _permit = limiter.acquire().await;
            tracing::debug!("GET {} (attempt {}/{})", url, attempt, max_attempts);
            fetch_json(client, url).await
        };

        match result {
            Ok(document) => {
                return FetchOutcome::Fetched {
                    document,
                    attempts: attempt,
                }
            }
            Err(error) if !error.is_transient() => {
                return FetchOutcome::Rejected {
                    attempts: attempt,
                    error,
                }
            }
            Err(error) if attempt >= max_attempts => {
                return FetchOutcome::Exhausted {
                    attempts: attempt,
                    last_error: error,
                }
            }
            Err(error) => {
                let delay = policy.delay_for(attempt);
                tracing::warn!(
                    "Attempt {}/{} for {} failed: {}; retrying in {:?}",
                    attempt,
                    max_attempts,
                    url,
                    error,
                    delay
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}
