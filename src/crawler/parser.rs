//! Raw post parsing
//!
//! Turns raw WordPress post objects into [`Article`] records:
//! - Composite ID from the site name and raw post ID
//! - Title and content stripped of markup, entities decoded
//! - Category IDs resolved through the category map

use crate::crawler::fetcher::FetchMetadata;
use crate::site::SiteIdentity;
use crate::storage::Article;
use chrono::{DateTime, Utc};
use scraper::Html;
use serde_json::Value;
use std::collections::HashMap;

/// Parses raw posts of one site into articles
#[derive(Debug, Clone)]
pub struct Parser {
    site: SiteIdentity,
}

impl Parser {
    pub fn new(site: SiteIdentity) -> Self {
        Self { site }
    }

    /// Parses a batch of raw posts
    ///
    /// Every article of the batch shares one `scraped_at` timestamp. Posts that
    /// cannot be parsed are logged and skipped.
    pub fn parse(&self, raw_posts: &[Value], metadata: &FetchMetadata) -> Vec<Article> {
        let batch_timestamp = Utc::now();

        raw_posts
            .iter()
            .filter_map(|post| {
                match self.parse_post(post, &metadata.category_map, batch_timestamp) {
                    Ok(article) => Some(article),
                    Err(e) => {
                        let link = post.get("link").and_then(Value::as_str).unwrap_or("<no link>");
                        tracing::error!("Error parsing post {}: {}", link, e);
                        None
                    }
                }
            })
            .collect()
    }

    /// Parses a single raw post
    ///
    /// # Returns
    ///
    /// * `Ok(Article)` - Successfully parsed post
    /// * `Err(String)` - The post has no usable `id`
    pub fn parse_post(
        &self,
        post: &Value,
        category_map: &HashMap<i64, String>,
        scraped_at: DateTime<Utc>,
    ) -> Result<Article, String> {
        let raw_id = post.get("id").filter(|id| id.is_number() || id.is_string());
        let Some(raw_id) = raw_id else {
            return Err("post has no id".to_string());
        };

        let title = rendered(post, "title")
            .map(clean_html_text)
            .unwrap_or_default();
        let content = rendered(post, "content")
            .map(clean_html_text)
            .unwrap_or_default();

        let categories = post
            .get("categories")
            .and_then(Value::as_array)
            .map(|ids| {
                ids.iter()
                    .filter_map(Value::as_i64)
                    .map(|id| {
                        category_map
                            .get(&id)
                            .cloned()
                            .unwrap_or_else(|| format!("category_{}", id))
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(Article {
            id: crate::site::composite_id(&self.site.name, raw_id),
            site: self.site.name.clone(),
            site_url: self.site.base_url.clone(),
            page_url: post.get("link").and_then(Value::as_str).map(str::to_string),
            title,
            content,
            published_at: post.get("date").and_then(Value::as_str).map(str::to_string),
            categories,
            scraped_at,
        })
    }
}

/// Reads `post[field].rendered`
fn rendered<'a>(post: &'a Value, field: &str) -> Option<&'a str> {
    post.get(field)?.get("rendered")?.as_str()
}

/// Converts an HTML fragment to plain text with collapsed whitespace
pub fn clean_html_text(raw_html: &str) -> String {
    if raw_html.trim().is_empty() {
        return String::new();
    }

    let fragment = Html::parse_fragment(raw_html);
    let text = fragment.root_element().text().collect::<Vec<_>>().join(" ");

    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parser() -> Parser {
        Parser::new(SiteIdentity::new("acme", "https://acme.example"))
    }

    #[test]
    fn test_clean_html_text() {
        assert_eq!(
            clean_html_text("<p>Hello   <b>world</b></p>\n<p>again</p>"),
            "Hello world again"
        );
        assert_eq!(clean_html_text("Tom &amp; Jerry &#8211; live"), "Tom & Jerry – live");
        assert_eq!(clean_html_text(""), "");
    }

    #[test]
    fn test_parse_post() {
        let mut categories = HashMap::new();
        categories.insert(3, "Sport".to_string());

        let post = json!({
            "id": 42,
            "link": "https://acme.example/2024/01/42",
            "date": "2024-01-15T10:00:00",
            "title": {"rendered": "Big &amp; bold"},
            "content": {"rendered": "<p>First</p><p>Second</p>"},
            "categories": [3, 9]
        });

        let article = parser().parse_post(&post, &categories, Utc::now()).unwrap();

        assert_eq!(article.id, "acme_42");
        assert_eq!(article.site, "acme");
        assert_eq!(article.title, "Big & bold");
        assert_eq!(article.content, "First Second");
        assert_eq!(article.page_url.as_deref(), Some("https://acme.example/2024/01/42"));
        assert_eq!(article.published_at.as_deref(), Some("2024-01-15T10:00:00"));
        assert_eq!(article.categories, vec!["Sport", "category_9"]);
    }

    #[test]
    fn test_parse_post_without_id_fails() {
        let post = json!({"title": {"rendered": "orphan"}});
        assert!(parser().parse_post(&post, &HashMap::new(), Utc::now()).is_err());
    }

    #[test]
    fn test_parse_skips_bad_posts_and_shares_timestamp() {
        let posts = vec![
            json!({"id": 1, "title": {"rendered": "one"}}),
            json!({"title": {"rendered": "broken"}}),
            json!({"id": 2, "title": {"rendered": "two"}}),
        ];

        let articles = parser().parse(&posts, &FetchMetadata::default());

        assert_eq!(articles.len(), 2);
        assert_eq!(articles[0].id, "acme_1");
        assert_eq!(articles[1].id, "acme_2");
        assert_eq!(articles[0].scraped_at, articles[1].scraped_at);
        assert!(articles[0].content.is_empty());
    }

    #[test]
    fn test_parse_skips_linked_post_without_id() {
        let posts = vec![
            json!({"link": "https://acme.example/?p=9", "title": {"rendered": "no id"}}),
            json!({"id": "abc", "link": "https://acme.example/abc"}),
        ];

        let articles = parser().parse(&posts, &FetchMetadata::default());

        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].id, "acme_abc");
        assert_eq!(articles[0].page_url.as_deref(), Some("https://acme.example/abc"));
    }
}
