//! Site identity and composite item IDs
//!
//! Raw WordPress post IDs are only unique within one site. Prefixing them with
//! the site name gives IDs that stay unique across every site sharing one
//! seen-ID universe.

use crate::config::SiteEntry;
use serde_json::Value;

/// Name and base URL of one harvested site
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteIdentity {
    pub name: String,
    pub base_url: String,
}

impl SiteIdentity {
    /// Creates a site identity, dropping any trailing slash from the base URL
    pub fn new(name: impl Into<String>, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            name: name.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// `{base_url}/wp-json/wp/v2/posts`
    pub fn posts_url(&self) -> String {
        format!("{}/wp-json/wp/v2/posts", self.base_url)
    }

    /// `{base_url}/wp-json/wp/v2/categories`
    pub fn categories_url(&self) -> String {
        format!("{}/wp-json/wp/v2/categories", self.base_url)
    }

    /// Composite ID of a raw item from this site
    pub fn item_id(&self, item: &Value) -> String {
        composite_id(&self.name, item.get("id").unwrap_or(&Value::Null))
    }
}

impl From<&SiteEntry> for SiteIdentity {
    fn from(entry: &SiteEntry) -> Self {
        SiteIdentity::new(entry.name.clone(), entry.url.clone())
    }
}

/// Builds `site_name + "_" + raw_id`
///
/// Numbers and strings render bare (`acme_42`); anything else renders as its
/// JSON text, so a missing ID becomes `acme_null`.
pub fn composite_id(site_name: &str, raw_id: &Value) -> String {
    match raw_id {
        Value::String(s) => format!("{}_{}", site_name, s),
        other => format!("{}_{}", site_name, other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_composite_id_from_number() {
        assert_eq!(composite_id("acme", &json!(42)), "acme_42");
    }

    #[test]
    fn test_composite_id_from_string() {
        assert_eq!(composite_id("acme", &json!("42")), "acme_42");
    }

    #[test]
    fn test_composite_id_missing() {
        let site = SiteIdentity::new("acme", "https://acme.example");
        assert_eq!(site.item_id(&json!({"title": "x"})), "acme_null");
    }

    #[test]
    fn test_item_id_is_deterministic() {
        let site = SiteIdentity::new("s", "https://s.example");
        let item = json!({"id": 7, "link": "https://s.example/7"});
        assert_eq!(site.item_id(&item), site.item_id(&item));
        assert_eq!(site.item_id(&item), "s_7");
    }

    #[test]
    fn test_endpoints_strip_trailing_slash() {
        let site = SiteIdentity::new("acme", "https://acme.example/");
        assert_eq!(site.posts_url(), "https://acme.example/wp-json/wp/v2/posts");
        assert_eq!(
            site.categories_url(),
            "https://acme.example/wp-json/wp/v2/categories"
        );
    }
}
