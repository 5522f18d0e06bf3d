use crate::config::types::{Config, RetryConfig, ScraperConfig, SiteEntry};
use crate::ConfigError;
use reqwest::header::{HeaderName, HeaderValue};
use std::collections::{BTreeMap, HashSet};
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_scraper_config(&config.scraper)?;
    validate_retry_config(&config.retry)?;
    validate_headers(&config.headers)?;
    validate_sites(&config.sites)?;

    if config.output.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates pagination and pacing settings
fn validate_scraper_config(config: &ScraperConfig) -> Result<(), ConfigError> {
    if config.posts_per_page < 1 || config.posts_per_page > 100 {
        return Err(ConfigError::Validation(format!(
            "posts_per_page must be between 1 and 100, got {}",
            config.posts_per_page
        )));
    }

    if config.max_concurrent_requests < 1 || config.max_concurrent_requests > 100 {
        return Err(ConfigError::Validation(format!(
            "max_concurrent_requests must be between 1 and 100, got {}",
            config.max_concurrent_requests
        )));
    }

    if config.request_timeout == 0 {
        return Err(ConfigError::Validation(
            "request_timeout must be >= 1 second".to_string(),
        ));
    }

    if !config.requests_per_second.is_finite() || config.requests_per_second <= 0.0 {
        return Err(ConfigError::Validation(format!(
            "requests_per_second must be > 0, got {}",
            config.requests_per_second
        )));
    }

    Ok(())
}

/// Upper bound for `retry-delay` (seconds)
const MAX_RETRY_DELAY_SECS: f64 = 3600.0;

/// Upper bound for `retry-backoff`
const MAX_RETRY_BACKOFF: f64 = 10.0;

fn validate_retry_config(config: &RetryConfig) -> Result<(), ConfigError> {
    if !config.retry_delay.is_finite()
        || config.retry_delay < 0.0
        || config.retry_delay > MAX_RETRY_DELAY_SECS
    {
        return Err(ConfigError::Validation(format!(
            "retry_delay must be between 0 and {}, got {}",
            MAX_RETRY_DELAY_SECS, config.retry_delay
        )));
    }

    if !config.retry_backoff.is_finite()
        || config.retry_backoff < 1.0
        || config.retry_backoff > MAX_RETRY_BACKOFF
    {
        return Err(ConfigError::Validation(format!(
            "retry_backoff must be between 1.0 and {}, got {}",
            MAX_RETRY_BACKOFF, config.retry_backoff
        )));
    }

    Ok(())
}

fn validate_headers(headers: &BTreeMap<String, String>) -> Result<(), ConfigError> {
    for (name, value) in headers {
        HeaderName::from_bytes(name.as_bytes()).map_err(|_| {
            ConfigError::Validation(format!("Invalid header name '{}'", name))
        })?;
        HeaderValue::from_str(value).map_err(|_| {
            ConfigError::Validation(format!("Invalid value for header '{}'", name))
        })?;
    }
    Ok(())
}

/// Validates site entries: usable names, no duplicates, http(s) base URLs
fn validate_sites(sites: &[SiteEntry]) -> Result<(), ConfigError> {
    let mut names = HashSet::new();

    for site in sites {
        validate_site_name(&site.name)?;

        if !names.insert(site.name.as_str()) {
            return Err(ConfigError::Validation(format!(
                "Duplicate site name '{}'",
                site.name
            )));
        }

        let url = Url::parse(&site.url).map_err(|e| {
            ConfigError::InvalidUrl(format!("Invalid URL '{}' for site '{}': {}", site.url, site.name, e))
        })?;

        if url.scheme() != "https" && url.scheme() != "http" {
            return Err(ConfigError::Validation(format!(
                "Site URL '{}' must use http or https",
                site.url
            )));
        }
    }

    Ok(())
}

fn validate_site_name(name: &str) -> Result<(), ConfigError> {
    if name.is_empty() {
        return Err(ConfigError::Validation(
            "site name cannot be empty".to_string(),
        ));
    }

    // The name prefixes every composite ID, so keep it unambiguous
    if !name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ConfigError::Validation(format!(
            "site name must contain only alphanumeric characters, hyphens and underscores, got '{}'",
            name
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site(name: &str, url: &str) -> SiteEntry {
        SiteEntry {
            name: name.to_string(),
            url: url.to_string(),
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_validate_site_name() {
        assert!(validate_site_name("acme").is_ok());
        assert!(validate_site_name("mkd-news").is_ok());
        assert!(validate_site_name("site_2").is_ok());

        assert!(validate_site_name("").is_err());
        assert!(validate_site_name("has space").is_err());
        assert!(validate_site_name("a/b").is_err());
    }

    #[test]
    fn test_validate_sites() {
        assert!(validate_sites(&[site("acme", "https://acme.example")]).is_ok());
        assert!(validate_sites(&[site("local", "http://127.0.0.1:8080")]).is_ok());

        assert!(validate_sites(&[site("acme", "not a url")]).is_err());
        assert!(validate_sites(&[site("acme", "ftp://acme.example")]).is_err());
        assert!(validate_sites(&[
            site("acme", "https://acme.example"),
            site("acme", "https://other.example"),
        ])
        .is_err());
    }

    #[test]
    fn test_validate_scraper_ranges() {
        let mut config = ScraperConfig::default();
        assert!(validate_scraper_config(&config).is_ok());

        config.posts_per_page = 101;
        assert!(validate_scraper_config(&config).is_err());

        config = ScraperConfig::default();
        config.requests_per_second = 0.0;
        assert!(validate_scraper_config(&config).is_err());

        config = ScraperConfig::default();
        config.request_timeout = 0;
        assert!(validate_scraper_config(&config).is_err());
    }

    #[test]
    fn test_validate_retry() {
        let mut config = RetryConfig::default();
        assert!(validate_retry_config(&config).is_ok());

        config.retry_backoff = 0.5;
        assert!(validate_retry_config(&config).is_err());

        config = RetryConfig::default();
        config.retry_delay = -1.0;
        assert!(validate_retry_config(&config).is_err());
    }

    #[test]
    fn test_validate_retry_upper_bounds() {
        let mut config = RetryConfig::default();
        config.retry_delay = 1e20;
        assert!(validate_retry_config(&config).is_err());

        config = RetryConfig::default();
        config.retry_backoff = 1e300;
        assert!(validate_retry_config(&config).is_err());

        config = RetryConfig::default();
        config.retry_delay = 3600.0;
        config.retry_backoff = 10.0;
        assert!(validate_retry_config(&config).is_ok());
    }

    #[test]
    fn test_validate_headers() {
        let mut headers = BTreeMap::new();
        headers.insert("X-Custom".to_string(), "value".to_string());
        assert!(validate_headers(&headers).is_ok());

        headers.insert("Bad Header".to_string(), "value".to_string());
        assert!(validate_headers(&headers).is_err());
    }
}
