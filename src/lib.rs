//! WP-Harvest: incremental ingestion of WordPress post listings
//!
//! This crate walks the paginated `wp-json/wp/v2/posts` endpoint of many
//! independent sites, tolerating flaky networks and server-side rate limits.
//! A site with no ingestion history is crawled in full with bounded
//! concurrency; a site with history is walked page by page until content that
//! was already ingested is reached.

pub mod config;
pub mod crawler;
pub mod site;
pub mod storage;

use thiserror::Error;

/// Main error type for WP-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("Invalid header '{name}': {message}")]
    InvalidHeader { name: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure of a single HTTP request attempt
///
/// Every variant except [`FetchError::Decode`] is transient and will be
/// retried by the transport's retry policy.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Rate limited by {url} (Retry-After {retry_after}s)")]
    RateLimited { url: String, retry_after: u64 },

    #[error("HTTP status {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("Invalid JSON from {url}: {source}")]
    Decode {
        url: String,
        source: serde_json::Error,
    },
}

impl FetchError {
    /// Classifies a reqwest error raised while sending or reading a request
    pub fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
            }
        } else {
            FetchError::Http {
                url: url.to_string(),
                source: err,
            }
        }
    }

    /// HTTP status code carried by this error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::RateLimited { .. } => Some(429),
            FetchError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl crawler::Retryable for FetchError {
    fn is_retryable(&self) -> bool {
        !matches!(self, FetchError::Decode { .. })
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for WP-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for single-request operations
pub type FetchResult<T> = std::result::Result<T, FetchError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{FetchMetadata, Fetcher, HttpTransport, RateLimiter, RetryPolicy};
pub use site::{composite_id, SiteIdentity};
