//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::storage::Article;
use std::collections::HashSet;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Invalid stored timestamp: {0}")]
    Timestamp(#[from] chrono::ParseError),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// Seen IDs are composite IDs (`site_name + "_" + raw_id`) and are scoped
/// per site, so a site that was never harvested always loads an empty set.
pub trait Store {
    /// Loads every composite ID already ingested for `site`
    fn load_seen_ids(&self, site: &str) -> StorageResult<HashSet<String>>;

    /// Records `ids` as seen for `site`, keeping what is already stored
    fn save_seen_ids(&mut self, site: &str, ids: &HashSet<String>) -> StorageResult<()>;

    /// Persists articles and marks their IDs as seen
    ///
    /// Articles whose ID is already stored are ignored.
    ///
    /// # Returns
    ///
    /// The number of articles actually inserted
    fn save_articles(&mut self, articles: &[Article]) -> StorageResult<usize>;

    /// Loads every stored article of `site`
    fn load_all_articles(&self, site: &str) -> StorageResult<Vec<Article>>;

    /// Removes all articles and seen IDs of `site`
    fn clear(&mut self, site: &str) -> StorageResult<()>;
}
