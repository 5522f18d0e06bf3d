//! Storage module for persisting harvest results
//!
//! This module handles all database operations, including:
//! - SQLite database initialization and schema management
//! - Article persistence
//! - Per-site seen-ID tracking for incremental runs

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStore;
pub use traits::{StorageError, StorageResult, Store};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Opens or creates the store database
pub fn open_store(path: &Path) -> StorageResult<SqliteStore> {
    SqliteStore::new(path)
}

/// A parsed post, ready to persist
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    /// Composite ID (`site_name + "_" + raw_id`)
    pub id: String,
    pub site: String,
    pub site_url: String,
    pub page_url: Option<String>,
    pub title: String,
    /// Plain-text body
    pub content: String,
    pub published_at: Option<String>,
    pub categories: Vec<String>,
    pub scraped_at: DateTime<Utc>,
}
