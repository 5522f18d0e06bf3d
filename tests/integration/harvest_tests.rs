//! Integration tests for the harvester
//!
//! These tests use wiremock to serve a fake WordPress REST API and exercise
//! the fetch strategies and the per-site pipeline end-to-end.

use serde_json::{json, Value};
use std::collections::HashSet;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};
use wp_harvest::config::{Config, RetryConfig, ScraperConfig};
use wp_harvest::crawler::{Coordinator, Fetcher, HttpTransport};
use wp_harvest::storage::{Article, SqliteStore, StorageError, StorageResult, Store};
use wp_harvest::SiteIdentity;

const POSTS: &str = "/wp-json/wp/v2/posts";
const CATEGORIES: &str = "/wp-json/wp/v2/categories";

/// Creates a test configuration with fast pacing and no retry delay
fn create_test_config() -> Config {
    Config {
        scraper: ScraperConfig {
            posts_per_page: 2,
            max_concurrent_requests: 2,
            request_timeout: 5,
            requests_per_second: 500.0,
        },
        retry: RetryConfig {
            max_retries: 1,
            retry_delay: 0.01,
            retry_backoff: 2.0,
        },
        ..Config::default()
    }
}

fn post(id: i64) -> Value {
    json!({
        "id": id,
        "link": format!("https://acme.example/?p={}", id),
        "title": {"rendered": format!("Post &#8220;{}&#8221;", id)},
        "content": {"rendered": format!("<p>Body of <em>{}</em></p>", id)},
        "date": "2024-03-01T12:00:00",
        "categories": [1]
    })
}

/// Mounts the WordPress endpoints for a site whose pages hold `pages` post IDs
async fn mount_site(server: &MockServer, pages: &[Vec<i64>]) {
    for (idx, ids) in pages.iter().enumerate() {
        let body = Value::Array(ids.iter().map(|id| post(*id)).collect());
        Mock::given(method("GET"))
            .and(path(POSTS))
            .and(query_param("page", (idx + 1).to_string()))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    // Pagination discovery request (no `page` parameter)
    Mock::given(method("GET"))
        .and(path(POSTS))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([]))
                .insert_header("X-WP-TotalPages", pages.len().to_string()),
        )
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(CATEGORIES))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1, "name": "News"}])))
        .mount(server)
        .await;
}

async fn page_request_count(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .expect("request recording enabled")
        .iter()
        .filter(|r| r.url.path() == POSTS && r.url.query_pairs().any(|(k, _)| k == "page"))
        .count()
}

#[tokio::test]
async fn test_bootstrap_crawl_fetches_every_page() {
    let server = MockServer::start().await;
    mount_site(&server, &[vec![1, 2], vec![3, 4], vec![5, 6]]).await;

    let config = create_test_config();
    let transport = HttpTransport::from_config(&config).expect("transport");
    let fetcher = Fetcher::new(
        SiteIdentity::new("acme", server.uri()),
        transport,
        &config.scraper,
    );

    let metadata = fetcher.fetch_metadata().await;
    assert_eq!(metadata.total_pages, 3);
    assert_eq!(metadata.category_map.get(&1).map(String::as_str), Some("News"));

    let items = fetcher
        .fetch_data(metadata.total_pages, Some(&HashSet::new()), 1)
        .await;

    let mut ids: Vec<i64> = items.iter().filter_map(|i| i["id"].as_i64()).collect();
    ids.sort();
    assert_eq!(ids, vec![1, 2, 3, 4, 5, 6]);
    assert_eq!(page_request_count(&server).await, 3);
}

#[tokio::test]
async fn test_incremental_run_picks_up_only_new_posts() {
    let server = MockServer::start().await;
    mount_site(&server, &[vec![4, 3], vec![2, 1]]).await;

    let mut coordinator = Coordinator::new(
        create_test_config(),
        SqliteStore::new_in_memory().expect("store"),
    );
    let site = SiteIdentity::new("acme", server.uri());

    let first = coordinator.scrape_site(&site).await.expect("first run");
    assert!(!first.incremental);
    assert_eq!(first.saved_articles, 4);

    // Two new posts arrive at the top of the feed, shifting older ones down
    server.reset().await;
    mount_site(&server, &[vec![6, 5], vec![4, 3], vec![2, 1]]).await;

    let second = coordinator.scrape_site(&site).await.expect("second run");
    assert!(second.incremental);
    assert_eq!(second.total_pages, 3);
    assert_eq!(second.saved_articles, 2);

    // Page 1 was all new, page 2 all seen: the walk stops there
    assert_eq!(page_request_count(&server).await, 2);

    let articles = coordinator.store().load_all_articles("acme").expect("load");
    assert_eq!(articles.len(), 6);
    let newest = articles.iter().find(|a| a.id == "acme_6").expect("acme_6 stored");
    assert_eq!(newest.title, "Post \u{201c}6\u{201d}");
    assert_eq!(newest.content, "Body of 6");
    assert_eq!(newest.categories, vec!["News"]);
}

#[tokio::test]
async fn test_mixed_page_does_not_stop_incremental_walk() {
    let server = MockServer::start().await;
    mount_site(&server, &[vec![10, 1], vec![11, 12], vec![2, 3]]).await;

    let config = create_test_config();
    let fetcher = Fetcher::new(
        SiteIdentity::new("acme", server.uri()),
        HttpTransport::from_config(&config).expect("transport"),
        &config.scraper,
    );

    let seen: HashSet<String> = ["acme_1", "acme_2", "acme_3"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let items = fetcher.fetch_data(3, Some(&seen), 1).await;

    let ids: Vec<i64> = items.iter().filter_map(|i| i["id"].as_i64()).collect();
    assert_eq!(ids, vec![10, 11, 12]);
    assert_eq!(page_request_count(&server).await, 3);
}

/// Store that fails for one site, delegating everything else to SQLite
struct FailingStore {
    inner: SqliteStore,
    broken_site: String,
}

impl Store for FailingStore {
    fn load_seen_ids(&self, site: &str) -> StorageResult<HashSet<String>> {
        if site == self.broken_site {
            return Err(StorageError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "disk unavailable",
            )));
        }
        self.inner.load_seen_ids(site)
    }

    fn save_seen_ids(&mut self, site: &str, ids: &HashSet<String>) -> StorageResult<()> {
        self.inner.save_seen_ids(site, ids)
    }

    fn save_articles(&mut self, articles: &[Article]) -> StorageResult<usize> {
        self.inner.save_articles(articles)
    }

    fn load_all_articles(&self, site: &str) -> StorageResult<Vec<Article>> {
        self.inner.load_all_articles(site)
    }

    fn clear(&mut self, site: &str) -> StorageResult<()> {
        self.inner.clear(site)
    }
}

#[tokio::test]
async fn test_failing_site_does_not_abort_run() {
    let server = MockServer::start().await;
    mount_site(&server, &[vec![1, 2]]).await;

    let store = FailingStore {
        inner: SqliteStore::new_in_memory().expect("store"),
        broken_site: "broken".to_string(),
    };
    let mut coordinator = Coordinator::new(create_test_config(), store);

    let sites = vec![
        SiteIdentity::new("broken", server.uri()),
        SiteIdentity::new("acme", server.uri()),
    ];
    let summary = coordinator.run(&sites).await;

    assert_eq!(summary.failed, vec!["broken".to_string()]);
    assert_eq!(summary.successful.len(), 1);
    assert_eq!(summary.successful[0].site, "acme");
    assert_eq!(summary.successful[0].saved_articles, 2);
}
