//! Resilient HTTP transport
//!
//! This module handles every outgoing request for a site session:
//! - Building the HTTP client and default headers from config
//! - Pacing requests through the session's [`RateLimiter`]
//! - Retrying transient failures through a [`RetryPolicy`]
//! - Honouring `Retry-After` on HTTP 429 for JSON fetches
//!
//! # Failure Classification
//!
//! | Condition | Result | Retried |
//! |-----------|--------|---------|
//! | Timeout | `FetchError::Timeout` | yes |
//! | Connection / body read error | `FetchError::Http` | yes |
//! | HTTP 429 | sleep `Retry-After`, then `FetchError::RateLimited` | yes |
//! | Other non-2xx | `FetchError::Status` | yes |
//! | Body is not JSON | `FetchError::Decode` | no |

use crate::config::{Config, ScraperConfig};
use crate::crawler::rate_limiter::RateLimiter;
use crate::crawler::retry::RetryPolicy;
use crate::{FetchError, FetchResult, HarvestError};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, RETRY_AFTER};
use reqwest::{Client, Response, StatusCode};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

/// Wait applied on HTTP 429 when `Retry-After` is absent or not a number
pub const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// Parsed JSON body together with the raw response headers
#[derive(Debug, Clone)]
pub struct JsonResponse {
    pub payload: Value,
    pub headers: HeaderMap,
}

/// Builds an HTTP client for one site session
///
/// The per-request timeout is applied on each request by [`HttpTransport`];
/// the client only carries the connection-level settings.
pub fn build_http_client(config: &ScraperConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .connect_timeout(config.request_timeout())
        .pool_max_idle_per_host(config.max_concurrent_requests as usize)
        .gzip(true)
        .brotli(true)
        .deflate(true)
        .build()
}

/// Converts the `[headers]` config table into a header map
pub fn build_default_headers(headers: &BTreeMap<String, String>) -> Result<HeaderMap, HarvestError> {
    let mut map = HeaderMap::with_capacity(headers.len());

    for (name, value) in headers {
        let header_name =
            HeaderName::from_bytes(name.as_bytes()).map_err(|e| HarvestError::InvalidHeader {
                name: name.clone(),
                message: e.to_string(),
            })?;
        let header_value = HeaderValue::from_str(value).map_err(|e| HarvestError::InvalidHeader {
            name: name.clone(),
            message: e.to_string(),
        })?;
        map.insert(header_name, header_value);
    }

    Ok(map)
}

/// Reads `Retry-After` as whole seconds, falling back to [`DEFAULT_RETRY_AFTER_SECS`]
pub fn parse_retry_after(headers: &HeaderMap) -> u64 {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(DEFAULT_RETRY_AFTER_SECS)
}

/// Rate-limited, retried JSON-over-HTTP GET for one site session
///
/// Owns the session's connection pool and rate limiter. Dropping the
/// transport releases both.
#[derive(Debug)]
pub struct HttpTransport {
    client: Client,
    headers: HeaderMap,
    timeout: Duration,
    rate_limiter: RateLimiter,
    retry: RetryPolicy,
}

impl HttpTransport {
    pub fn new(
        client: Client,
        headers: HeaderMap,
        timeout: Duration,
        rate_limiter: RateLimiter,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            client,
            headers,
            timeout,
            rate_limiter,
            retry,
        }
    }

    /// Builds a transport with a fresh client, limiter and retry policy
    pub fn from_config(config: &Config) -> Result<Self, HarvestError> {
        let client = build_http_client(&config.scraper)?;
        let headers = build_default_headers(&config.headers)?;

        Ok(Self::new(
            client,
            headers,
            config.scraper.request_timeout(),
            RateLimiter::new(config.scraper.requests_per_second),
            RetryPolicy::from_config(&config.retry),
        ))
    }

    /// GETs `url` and returns the parsed JSON body
    ///
    /// On HTTP 429 the attempt sleeps for `Retry-After` seconds and then fails
    /// as retryable, so the retry policy's own backoff is added on top.
    pub async fn fetch_json(
        &self,
        url: &str,
        query: &[(&str, String)],
        extra_headers: Option<&HeaderMap>,
    ) -> FetchResult<Value> {
        self.retry
            .execute(|| self.fetch_json_once(url, query, extra_headers))
            .await
    }

    /// GETs `url` and returns the parsed JSON body with the response headers
    ///
    /// Used for pagination discovery. A 429 here is treated like any other
    /// non-2xx status: no `Retry-After` wait is applied.
    pub async fn fetch_json_with_headers(
        &self,
        url: &str,
        query: &[(&str, String)],
        extra_headers: Option<&HeaderMap>,
    ) -> FetchResult<JsonResponse> {
        self.retry
            .execute(|| self.fetch_with_headers_once(url, query, extra_headers))
            .await
    }

    async fn fetch_json_once(
        &self,
        url: &str,
        query: &[(&str, String)],
        extra_headers: Option<&HeaderMap>,
    ) -> FetchResult<Value> {
        let response = self.send(url, query, extra_headers).await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = parse_retry_after(response.headers());
            drop(response);

            tracing::warn!("Rate limited by {}. Waiting {} seconds.", url, retry_after);
            tokio::time::sleep(Duration::from_secs(retry_after)).await;

            return Err(FetchError::RateLimited {
                url: url.to_string(),
                retry_after,
            });
        }

        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        read_json(url, response).await
    }

    async fn fetch_with_headers_once(
        &self,
        url: &str,
        query: &[(&str, String)],
        extra_headers: Option<&HeaderMap>,
    ) -> FetchResult<JsonResponse> {
        let response = self.send(url, query, extra_headers).await?;
        let status = response.status();

        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let headers = response.headers().clone();
        let payload = read_json(url, response).await?;

        Ok(JsonResponse { payload, headers })
    }

    /// Waits for a rate-limit permit and sends one GET
    ///
    /// Caller-supplied headers replace defaults with the same name.
    async fn send(
        &self,
        url: &str,
        query: &[(&str, String)],
        extra_headers: Option<&HeaderMap>,
    ) -> FetchResult<Response> {
        self.rate_limiter.wait().await;

        let mut headers = self.headers.clone();
        if let Some(extra) = extra_headers {
            for (name, value) in extra {
                headers.insert(name.clone(), value.clone());
            }
        }

        tracing::trace!("GET {} {:?}", url, query);

        self.client
            .get(url)
            .query(query)
            .headers(headers)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))
    }
}

async fn read_json(url: &str, response: Response) -> FetchResult<Value> {
    let body = response
        .bytes()
        .await
        .map_err(|e| FetchError::from_reqwest(url, e))?;

    serde_json::from_slice(&body).map_err(|source| FetchError::Decode {
        url: url.to_string(),
        source,
    })
}
