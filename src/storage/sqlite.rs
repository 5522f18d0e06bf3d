//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Store trait.

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{StorageResult, Store};
use crate::storage::Article;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::collections::HashSet;
use std::path::Path;

/// SQLite storage backend
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Opens (or creates) the database at `path`
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStore)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database or create its directory
    pub fn new(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Counts stored articles of `site`
    pub fn count_articles(&self, site: &str) -> StorageResult<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM articles WHERE site = ?1",
            params![site],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

/// Article columns as stored, before JSON/timestamp decoding
struct ArticleRow {
    id: String,
    site: String,
    site_url: String,
    page_url: Option<String>,
    title: String,
    content: String,
    published_at: Option<String>,
    categories: String,
    scraped_at: String,
}

impl ArticleRow {
    fn into_article(self) -> StorageResult<Article> {
        let scraped_at = DateTime::parse_from_rfc3339(&self.scraped_at)?.with_timezone(&Utc);

        Ok(Article {
            id: self.id,
            site: self.site,
            site_url: self.site_url,
            page_url: self.page_url,
            title: self.title,
            content: self.content,
            published_at: self.published_at,
            categories: serde_json::from_str(&self.categories)?,
            scraped_at,
        })
    }
}

impl Store for SqliteStore {
    fn load_seen_ids(&self, site: &str) -> StorageResult<HashSet<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id FROM seen_ids WHERE site = ?1")?;

        let ids = stmt
            .query_map(params![site], |row| row.get::<_, String>(0))?
            .collect::<Result<HashSet<_>, _>>()?;

        tracing::debug!("Loaded {} seen IDs for {}", ids.len(), site);
        Ok(ids)
    }

    fn save_seen_ids(&mut self, site: &str, ids: &HashSet<String>) -> StorageResult<()> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare("INSERT OR IGNORE INTO seen_ids (id, site) VALUES (?1, ?2)")?;
            for id in ids {
                stmt.execute(params![id, site])?;
            }
        }
        tx.commit()?;

        tracing::info!("Added {} seen IDs for {}", ids.len(), site);
        Ok(())
    }

    fn save_articles(&mut self, articles: &[Article]) -> StorageResult<usize> {
        if articles.is_empty() {
            tracing::info!("No articles to save");
            return Ok(0);
        }

        let tx = self.conn.transaction()?;
        let mut inserted = 0;
        {
            let mut insert_article = tx.prepare(
                "INSERT OR IGNORE INTO articles
                 (id, site, site_url, page_url, title, content, published_at, categories, scraped_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )?;
            let mut insert_seen =
                tx.prepare("INSERT OR IGNORE INTO seen_ids (id, site) VALUES (?1, ?2)")?;

            for article in articles {
                inserted += insert_article.execute(params![
                    article.id,
                    article.site,
                    article.site_url,
                    article.page_url,
                    article.title,
                    article.content,
                    article.published_at,
                    serde_json::to_string(&article.categories)?,
                    article.scraped_at.to_rfc3339(),
                ])?;
                insert_seen.execute(params![article.id, article.site])?;
            }
        }
        tx.commit()?;

        tracing::info!(
            "Added {} new articles ({} submitted)",
            inserted,
            articles.len()
        );
        Ok(inserted)
    }

    fn load_all_articles(&self, site: &str) -> StorageResult<Vec<Article>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, site, site_url, page_url, title, content, published_at, categories, scraped_at
             FROM articles WHERE site = ?1 ORDER BY id",
        )?;

        let rows = stmt
            .query_map(params![site], |row| {
                Ok(ArticleRow {
                    id: row.get(0)?,
                    site: row.get(1)?,
                    site_url: row.get(2)?,
                    page_url: row.get(3)?,
                    title: row.get(4)?,
                    content: row.get(5)?,
                    published_at: row.get(6)?,
                    categories: row.get(7)?,
                    scraped_at: row.get(8)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter().map(ArticleRow::into_article).collect()
    }

    fn clear(&mut self, site: &str) -> StorageResult<()> {
        let articles = self
            .conn
            .execute("DELETE FROM articles WHERE site = ?1", params![site])?;
        let ids = self
            .conn
            .execute("DELETE FROM seen_ids WHERE site = ?1", params![site])?;

        tracing::info!(
            "Cleared {} articles and {} seen IDs for {}",
            articles,
            ids,
            site
        );
        Ok(())
    }
}
