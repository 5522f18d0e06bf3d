//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the WP-Harvest database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Parsed articles
CREATE TABLE IF NOT EXISTS articles (
    id TEXT PRIMARY KEY,
    site TEXT NOT NULL,
    site_url TEXT NOT NULL,
    page_url TEXT,
    title TEXT NOT NULL,
    content TEXT NOT NULL,
    published_at TEXT,
    categories TEXT NOT NULL,
    scraped_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_articles_site ON articles(site);

-- Composite IDs already ingested, per site
CREATE TABLE IF NOT EXISTS seen_ids (
    id TEXT PRIMARY KEY,
    site TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_seen_ids_site ON seen_ids(site);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
