//! Pagination and fetch strategy for one site
//!
//! The [`Fetcher`] resolves pagination metadata and then walks the posts
//! endpoint with one of two strategies:
//!
//! | Seen IDs | Strategy | Stops when |
//! |----------|----------|------------|
//! | none / empty | bulk-concurrent | every page in range was requested |
//! | non-empty | sequential-incremental | empty/failed page, all-duplicate page, or range end |
//!
//! Failures never escape: a failed page contributes no items, and failed
//! metadata lookups fall back to one page and no categories.

use crate::config::ScraperConfig;
use crate::crawler::transport::HttpTransport;
use crate::site::SiteIdentity;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};

/// Response header carrying the total page count
pub const TOTAL_PAGES_HEADER: &str = "X-WP-TotalPages";

/// Page size used when listing categories
pub const CATEGORIES_PER_PAGE: u32 = 100;

/// Pagination metadata resolved once per site session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchMetadata {
    /// Total number of post pages (always >= 1)
    pub total_pages: u32,

    /// Category id -> name
    pub category_map: HashMap<i64, String>,
}

impl Default for FetchMetadata {
    fn default() -> Self {
        Self {
            total_pages: 1,
            category_map: HashMap::new(),
        }
    }
}

/// Walks the paginated posts endpoint of one site
///
/// Cloning is cheap; clones share the same transport, and with it the same
/// rate limiter and connection pool.
#[derive(Debug, Clone)]
pub struct Fetcher {
    site: SiteIdentity,
    http: Arc<HttpTransport>,
    posts_url: String,
    categories_url: String,
    posts_per_page: u32,
    max_concurrent_requests: usize,
}

impl Fetcher {
    /// Creates a fetcher that owns `http` for the lifetime of the site session
    pub fn new(site: SiteIdentity, http: HttpTransport, config: &ScraperConfig) -> Self {
        let posts_url = site.posts_url();
        let categories_url = site.categories_url();

        Self {
            site,
            http: Arc::new(http),
            posts_url,
            categories_url,
            posts_per_page: config.posts_per_page,
            max_concurrent_requests: config.max_concurrent_requests.max(1) as usize,
        }
    }

    pub fn site(&self) -> &SiteIdentity {
        &self.site
    }

    /// Resolves the total page count and category map
    ///
    /// Both lookups run concurrently and each degrades independently.
    pub async fn fetch_metadata(&self) -> FetchMetadata {
        let (total_pages, category_map) =
            tokio::join!(self.fetch_total_pages(), self.fetch_categories());

        FetchMetadata {
            total_pages,
            category_map,
        }
    }

    /// Fetches raw post items, choosing the strategy from `seen_ids`
    ///
    /// An absent or empty set means no ingestion history: every page is
    /// fetched concurrently. Otherwise pages are walked in order until
    /// already-seen content is reached.
    pub async fn fetch_data(
        &self,
        total_pages: u32,
        seen_ids: Option<&HashSet<String>>,
        start_page: u32,
    ) -> Vec<Value> {
        match seen_ids {
            Some(ids) if !ids.is_empty() => {
                tracing::info!("Incremental run detected - using sequential fetching.");
                self.fetch_all_sequential(total_pages, ids, start_page).await
            }
            _ => {
                tracing::info!("First run detected - using concurrent fetching.");
                self.fetch_all_concurrent(total_pages, start_page).await
            }
        }
    }

    /// Fetches every page in `[start_page, start_page + total_pages)` with bounded concurrency
    ///
    /// Items are returned in completion order, not page order. Exactly
    /// `total_pages` page fetches are issued; a failed page adds nothing and
    /// does not disturb the others.
    ///
    /// A permit is taken before each task is spawned, so at most
    /// `max_concurrent_requests` page tasks exist at any time no matter how
    /// large `total_pages` is.
    pub async fn fetch_all_concurrent(&self, total_pages: u32, start_page: u32) -> Vec<Value> {
        tracing::info!(
            "Fetching {} pages concurrently (max {} at a time).",
            total_pages,
            self.max_concurrent_requests
        );

        let permits = Arc::new(Semaphore::new(self.max_concurrent_requests));
        let mut tasks = JoinSet::new();
        let mut progress = Progress::new(total_pages);

        for page in page_range(start_page, total_pages) {
            let Ok(permit) = permits.clone().acquire_owned().await else {
                break;
            };

            // Finished tasks hold their page until reaped
            while let Some(joined) = tasks.try_join_next() {
                progress.record(&self.site, joined);
            }

            let fetcher = self.clone();
            tasks.spawn(async move {
                let _permit = permit;
                fetcher.fetch_page(page).await
            });
        }

        while let Some(joined) = tasks.join_next().await {
            progress.record(&self.site, joined);
        }

        progress.items
    }

    /// Walks pages in order, returning only items whose composite ID is not in `existing_ids`
    ///
    /// Stops at the first empty or failed page, or at the first page made up
    /// entirely of already-seen items. Pages mixing new and seen items do not
    /// stop the walk.
    pub async fn fetch_all_sequential(
        &self,
        total_pages: u32,
        existing_ids: &HashSet<String>,
        start_page: u32,
    ) -> Vec<Value> {
        tracing::info!(
            "Fetching sequentially from page {}, stopping on duplicates.",
            start_page
        );

        let mut new_items = Vec::new();

        for page in page_range(start_page, total_pages) {
            let Some(items) = self.fetch_page(page).await else {
                tracing::warn!("No items returned for page {} - stopping.", page);
                break;
            };

            let (fresh, duplicates): (Vec<Value>, Vec<Value>) = items
                .into_iter()
                .partition(|item| !existing_ids.contains(&self.site.item_id(item)));

            tracing::info!(
                "Page {}: {} new items, {} already scraped.",
                page,
                fresh.len(),
                duplicates.len()
            );

            let all_seen = fresh.is_empty() && !duplicates.is_empty();
            new_items.extend(fresh);

            if all_seen {
                tracing::info!("All items on page {} already exist - stopping.", page);
                tracing::info!(
                    "Total pages fetched: {}/{}, total new items: {}.",
                    page - start_page + 1,
                    total_pages,
                    new_items.len()
                );
                break;
            }
        }

        new_items
    }

    /// Fetches one page of posts
    ///
    /// Returns `None` when the request failed after retries, the payload is
    /// not an array, or the page is empty.
    pub async fn fetch_page(&self, page: u32) -> Option<Vec<Value>> {
        let query = [
            ("per_page", self.posts_per_page.to_string()),
            ("page", page.to_string()),
        ];

        match self.http.fetch_json(&self.posts_url, &query, None).await {
            Ok(Value::Array(items)) if !items.is_empty() => {
                tracing::info!("Fetched page {} with {} posts.", page, items.len());
                Some(items)
            }
            Ok(Value::Array(_)) => {
                tracing::warn!("Page {} returned no posts.", page);
                None
            }
            Ok(_) => {
                tracing::warn!("Page {} returned an unexpected payload.", page);
                None
            }
            Err(e) => {
                tracing::warn!("Failed to fetch page {}: {}", page, e);
                None
            }
        }
    }

    /// Reads the total page count from the `X-WP-TotalPages` header
    ///
    /// Any failure (request, missing or malformed header) yields 1.
    pub async fn fetch_total_pages(&self) -> u32 {
        let query = [("per_page", self.posts_per_page.to_string())];

        let response = match self
            .http
            .fetch_json_with_headers(&self.posts_url, &query, None)
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::error!("Error fetching total pages: {}", e);
                return 1;
            }
        };

        let Some(raw) = response.headers.get(TOTAL_PAGES_HEADER) else {
            tracing::warn!("{} header missing, assuming 1 page.", TOTAL_PAGES_HEADER);
            return 1;
        };

        match raw.to_str().ok().and_then(|v| v.trim().parse::<i64>().ok()) {
            Some(total) => {
                let total = total.clamp(1, u32::MAX as i64) as u32;
                tracing::info!("Total pages available: {}.", total);
                total
            }
            None => {
                tracing::error!("Malformed {} header: {:?}", TOTAL_PAGES_HEADER, raw);
                1
            }
        }
    }

    /// Builds the category id -> name map
    ///
    /// A failed request yields an empty map; malformed entries are skipped.
    pub async fn fetch_categories(&self) -> HashMap<i64, String> {
        let query = [("per_page", CATEGORIES_PER_PAGE.to_string())];
        let mut category_map = HashMap::new();

        match self.http.fetch_json(&self.categories_url, &query, None).await {
            Ok(Value::Array(categories)) if !categories.is_empty() => {
                for category in &categories {
                    let id = category.get("id").and_then(Value::as_i64);
                    let name = category.get("name").and_then(Value::as_str);

                    match (id, name) {
                        (Some(id), Some(name)) => {
                            category_map.insert(id, name.to_string());
                        }
                        _ => tracing::debug!("Skipping malformed category entry: {}", category),
                    }
                }
                tracing::info!("Fetched {} categories.", category_map.len());
            }
            Ok(_) => tracing::warn!("Failed to fetch categories."),
            Err(e) => tracing::error!("Error building category map: {}", e),
        }

        category_map
    }
}

/// Items gathered by the concurrent strategy, with completion counting
struct Progress {
    items: Vec<Value>,
    completed: u32,
    total_pages: u32,
}

impl Progress {
    fn new(total_pages: u32) -> Self {
        Self {
            items: Vec::new(),
            completed: 0,
            total_pages,
        }
    }

    fn record(&mut self, site: &SiteIdentity, joined: Result<Option<Vec<Value>>, JoinError>) {
        self.completed += 1;

        match joined {
            Ok(Some(items)) => self.items.extend(items),
            Ok(None) => {}
            Err(e) => tracing::error!("Page task for {} did not finish: {}", site.name, e),
        }

        tracing::info!(
            "Progress: {}/{} pages completed, {} total items.",
            self.completed,
            self.total_pages,
            self.items.len()
        );
    }
}

/// Contiguous page numbers `[start_page, start_page + total_pages)`
fn page_range(start_page: u32, total_pages: u32) -> std::ops::Range<u32> {
    start_page..start_page.saturating_add(total_pages)
}
