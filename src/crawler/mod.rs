//! Crawler module for fetching and processing WordPress post listings
//!
//! This module contains the fetch layer and the per-site pipeline around it:
//! - Request pacing and retry with exponential backoff
//! - HTTP transport with 429 / `Retry-After` handling
//! - Pagination metadata and fetch strategy selection
//! - Raw post parsing
//! - Per-site and multi-site coordination

mod coordinator;
mod fetcher;
mod parser;
mod rate_limiter;
mod retry;
mod transport;

pub use coordinator::{Coordinator, RunSummary, SiteReport};
pub use fetcher::{FetchMetadata, Fetcher, CATEGORIES_PER_PAGE, TOTAL_PAGES_HEADER};
pub use parser::{clean_html_text, Parser};
pub use rate_limiter::RateLimiter;
pub use retry::{RetryPolicy, Retryable};
pub use transport::{
    build_default_headers, build_http_client, parse_retry_after, HttpTransport, JsonResponse,
    DEFAULT_RETRY_AFTER_SECS,
};
