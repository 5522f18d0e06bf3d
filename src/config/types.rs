use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;

/// Main configuration structure for WP-Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub scraper: ScraperConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default = "default_headers")]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default, rename = "site")]
    pub sites: Vec<SiteEntry>,
}

/// Pagination, concurrency and pacing settings
#[derive(Debug, Clone, Deserialize)]
pub struct ScraperConfig {
    /// Posts requested per page (`per_page` query parameter)
    #[serde(rename = "posts-per-page", default = "default_posts_per_page")]
    pub posts_per_page: u32,

    /// Maximum number of page requests in flight during a bootstrap crawl
    #[serde(
        rename = "max-concurrent-requests",
        default = "default_max_concurrent_requests"
    )]
    pub max_concurrent_requests: u32,

    /// Per-request timeout (seconds)
    #[serde(rename = "request-timeout", default = "default_request_timeout")]
    pub request_timeout: u64,

    /// Upper bound on outgoing requests per second for one site
    #[serde(rename = "requests-per-second", default = "default_requests_per_second")]
    pub requests_per_second: f64,
}

impl ScraperConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            posts_per_page: default_posts_per_page(),
            max_concurrent_requests: default_max_concurrent_requests(),
            request_timeout: default_request_timeout(),
            requests_per_second: default_requests_per_second(),
        }
    }
}

/// Retry behaviour for transient request failures
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    /// Additional attempts after the first one
    #[serde(rename = "max-retries", default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay before the first retry (seconds)
    #[serde(rename = "retry-delay", default = "default_retry_delay")]
    pub retry_delay: f64,

    /// Multiplier applied to the delay for each further retry
    #[serde(rename = "retry-backoff", default = "default_retry_backoff")]
    pub retry_backoff: f64,
}

impl RetryConfig {
    /// Initial retry delay; out-of-range values saturate instead of panicking
    pub fn retry_delay(&self) -> Duration {
        Duration::try_from_secs_f64(self.retry_delay).unwrap_or(if self.retry_delay > 0.0 {
            Duration::MAX
        } else {
            Duration::ZERO
        })
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_delay: default_retry_delay(),
            retry_backoff: default_retry_backoff(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path", default = "default_database_path")]
    pub database_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

/// A site to harvest
#[derive(Debug, Clone, Deserialize)]
pub struct SiteEntry {
    /// Short name used to namespace item IDs (e.g., "acme")
    pub name: String,

    /// Base URL of the WordPress installation
    pub url: String,
}

fn default_posts_per_page() -> u32 {
    100
}

fn default_max_concurrent_requests() -> u32 {
    10
}

fn default_request_timeout() -> u64 {
    20
}

fn default_requests_per_second() -> f64 {
    5.0
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay() -> f64 {
    1.0
}

fn default_retry_backoff() -> f64 {
    2.0
}

fn default_database_path() -> String {
    "./harvest.db".to_string()
}

/// Browser-like headers sent with every request unless overridden
pub fn default_headers() -> BTreeMap<String, String> {
    [
        (
            "User-Agent",
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
             (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
        ),
        ("Accept", "application/json, text/plain, */*"),
        ("Accept-Language", "en-US,en;q=0.9"),
        ("Accept-Encoding", "gzip, deflate, br"),
        ("Connection", "keep-alive"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scraper: ScraperConfig::default(),
            retry: RetryConfig::default(),
            headers: default_headers(),
            output: OutputConfig::default(),
            sites: Vec::new(),
        }
    }
}
