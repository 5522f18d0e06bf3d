//! Harvest coordinator - per-site pipeline and multi-site loop
//!
//! This module drives one site session at a time:
//! - Loading the site's seen IDs from the store
//! - Building a fresh transport (connection pool, rate limiter) for the site
//! - Resolving metadata and fetching raw posts
//! - Parsing and persisting new articles
//!
//! Nothing is written to the store until the fetch phase of a site has
//! finished, so an interrupted site leaves its stored state untouched.

use crate::config::Config;
use crate::crawler::fetcher::Fetcher;
use crate::crawler::parser::Parser;
use crate::crawler::transport::HttpTransport;
use crate::site::SiteIdentity;
use crate::storage::Store;
use crate::HarvestError;

/// Outcome of one successful site session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteReport {
    pub site: String,
    /// Whether the site had ingestion history (sequential strategy)
    pub incremental: bool,
    pub total_pages: u32,
    pub fetched_items: usize,
    pub saved_articles: usize,
}

/// Outcome of a multi-site run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub successful: Vec<SiteReport>,
    /// Names of sites whose session failed
    pub failed: Vec<String>,
}

impl RunSummary {
    pub fn total_sites(&self) -> usize {
        self.successful.len() + self.failed.len()
    }
}

/// Main harvest coordinator
pub struct Coordinator<S: Store> {
    config: Config,
    store: S,
}

impl<S: Store> Coordinator<S> {
    pub fn new(config: Config, store: S) -> Self {
        Self { config, store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Runs the full pipeline for one site
    ///
    /// # Returns
    ///
    /// * `Ok(SiteReport)` - The site session completed
    /// * `Err(HarvestError)` - Transport construction or storage failed
    pub async fn scrape_site(&mut self, site: &SiteIdentity) -> Result<SiteReport, HarvestError> {
        tracing::info!("Starting scraper for {}", site.base_url);

        let seen_ids = self.store.load_seen_ids(&site.name)?;
        tracing::info!("Loaded {} previously seen IDs", seen_ids.len());

        // The transport and its connection pool live only for this block
        let (metadata, raw_items) = {
            let transport = HttpTransport::from_config(&self.config)?;
            let fetcher = Fetcher::new(site.clone(), transport, &self.config.scraper);

            let metadata = fetcher.fetch_metadata().await;
            let raw_items = fetcher
                .fetch_data(metadata.total_pages, Some(&seen_ids), 1)
                .await;
            (metadata, raw_items)
        };
        tracing::info!("Fetched {} raw items", raw_items.len());

        let articles = Parser::new(site.clone()).parse(&raw_items, &metadata);
        tracing::info!("Parsed {} records", articles.len());

        let saved_articles = if articles.is_empty() {
            tracing::info!("No new records to save");
            0
        } else {
            self.store.save_articles(&articles)?
        };

        tracing::info!("Scraping completed for {}", site.base_url);

        Ok(SiteReport {
            site: site.name.clone(),
            incremental: !seen_ids.is_empty(),
            total_pages: metadata.total_pages,
            fetched_items: raw_items.len(),
            saved_articles,
        })
    }

    /// Processes `sites` one after another
    ///
    /// A failing site is logged and recorded; the remaining sites still run.
    pub async fn run(&mut self, sites: &[SiteIdentity]) -> RunSummary {
        tracing::info!("Total sites to scrape: {}", sites.len());

        let mut summary = RunSummary::default();

        for (idx, site) in sites.iter().enumerate() {
            tracing::info!("Processing site {}/{}: {}", idx + 1, sites.len(), site.name);

            match self.scrape_site(site).await {
                Ok(report) => summary.successful.push(report),
                Err(e) => {
                    tracing::error!("Failed to scrape {}: {}", site.name, e);
                    summary.failed.push(site.name.clone());
                }
            }
        }

        tracing::info!(
            "Successfully scraped: {}/{} sites",
            summary.successful.len(),
            summary.total_sites()
        );
        if !summary.failed.is_empty() {
            tracing::warn!(
                "Failed sites ({}): {}",
                summary.failed.len(),
                summary.failed.join(", ")
            );
        }

        summary
    }
}
