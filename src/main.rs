//! WP-Harvest main entry point
//!
//! This is the command-line driver: it loads the config, selects sites and
//! runs them one after another against the configured database.

use anyhow::Context;
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use wp_harvest::config::{load_config_with_hash, Config};
use wp_harvest::crawler::Coordinator;
use wp_harvest::storage::{open_store, Store};
use wp_harvest::SiteIdentity;

/// WP-Harvest: incremental WordPress post harvester
///
/// Sites without history are crawled in full; sites with history are walked
/// page by page until already-ingested posts are reached.
#[derive(Parser, Debug)]
#[command(name = "wp-harvest")]
#[command(version = "1.0.0")]
#[command(about = "Incremental WordPress post harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Only harvest the named site (repeatable)
    #[arg(long = "site", value_name = "NAME")]
    sites: Vec<String>,

    /// Forget stored articles and seen IDs of the selected sites first
    #[arg(long)]
    fresh: bool,

    /// Validate config and show what would be harvested without fetching
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    let sites = select_sites(&config, &cli.sites)?;

    if cli.dry_run {
        print_dry_run(&config, &sites);
        return Ok(());
    }

    let mut store = open_store(Path::new(&config.output.database_path))
        .context("failed to open the database")?;

    if cli.fresh {
        for site in &sites {
            tracing::info!("Clearing stored state for {}", site.name);
            store.clear(&site.name)?;
        }
    }

    let mut coordinator = Coordinator::new(config, store);

    // Dropping the run future abandons in-flight requests; nothing is
    // persisted for a site until its fetch phase completes.
    tokio::select! {
        summary = coordinator.run(&sites) => {
            if !summary.failed.is_empty() {
                anyhow::bail!("{} of {} sites failed", summary.failed.len(), summary.total_sites());
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("Scraping interrupted by user");
        }
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// `RUST_LOG`, when set, takes precedence over the flags.
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if quiet {
            EnvFilter::new("error")
        } else {
            match verbose {
                0 => EnvFilter::new("wp_harvest=info,warn"),
                1 => EnvFilter::new("wp_harvest=debug,info"),
                2 => EnvFilter::new("wp_harvest=trace,debug"),
                _ => EnvFilter::new("trace"),
            }
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Resolves `--site` names against the config; no names means every site
fn select_sites(config: &Config, names: &[String]) -> anyhow::Result<Vec<SiteIdentity>> {
    if names.is_empty() {
        return Ok(config.sites.iter().map(SiteIdentity::from).collect());
    }

    names
        .iter()
        .map(|name| {
            config
                .sites
                .iter()
                .find(|entry| &entry.name == name)
                .map(SiteIdentity::from)
                .with_context(|| format!("unknown site '{}'", name))
        })
        .collect()
}

fn print_dry_run(config: &Config, sites: &[SiteIdentity]) {
    println!("=== WP-Harvest Dry Run ===\n");

    println!("Scraper Configuration:");
    println!("  Posts per page: {}", config.scraper.posts_per_page);
    println!(
        "  Max concurrent requests: {}",
        config.scraper.max_concurrent_requests
    );
    println!("  Request timeout: {}s", config.scraper.request_timeout);
    println!(
        "  Requests per second: {}",
        config.scraper.requests_per_second
    );

    println!("\nRetry:");
    println!("  Max retries: {}", config.retry.max_retries);
    println!("  Initial delay: {}s", config.retry.retry_delay);
    println!("  Backoff multiplier: {}", config.retry.retry_backoff);

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);

    println!("\nSites ({}):", sites.len());
    for site in sites {
        println!("  - {} ({})", site.name, site.posts_url());
    }

    println!("\n✓ Configuration is valid");
}
