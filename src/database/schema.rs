//! # Database Schema Module
//!
//! Defines the `web_navigation` table that crawl records are written to.
//!
//! ## Schema Design
//!
//! One row per crawl run. Base columns describe the site and its screenshot;
//! the per-language columns follow the record's flat layout (`content`,
//! `detail` for English, `content_<code>`, `detail_<code>` for the rest).
//! Tags are stored comma-joined.

use libsql::{Connection, params};

use crate::database::error::DbError;
use crate::language::Language;

/// Table crawl records are inserted into
pub const TABLE_NAME: &str = "web_navigation";

/// Build the `CREATE TABLE` statement for the records table
pub fn create_table_sql() -> String {
    let mut columns = vec![
        "id INTEGER PRIMARY KEY AUTOINCREMENT".to_string(),
        "name TEXT NOT NULL".to_string(),
        "title TEXT".to_string(),
        "url TEXT NOT NULL".to_string(),
        "image_url TEXT".to_string(),
        "thumbnail_url TEXT".to_string(),
        "collection_time TEXT NOT NULL".to_string(),
        "star_rating INTEGER DEFAULT 0".to_string(),
        "category_name TEXT".to_string(),
        "tags TEXT".to_string(),
    ];
    for lang in Language::ALL {
        columns.push(format!("{} TEXT", lang.field_name("content")));
    }
    for lang in Language::ALL {
        columns.push(format!("{} TEXT", lang.field_name("detail")));
    }
    format!(
        "CREATE TABLE IF NOT EXISTS {TABLE_NAME} (\n    {}\n)",
        columns.join(",\n    ")
    )
}

/// Initialize the database schema
pub async fn initialize_schema(conn: &Connection) -> Result<(), DbError> {
    conn.execute(&create_table_sql(), params![])
        .await
        .map_err(|e| DbError::Schema(format!("Failed to create {TABLE_NAME} table: {}", e)))?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_web_navigation_url ON web_navigation(url)",
        params![],
    )
    .await
    .map_err(|e| DbError::Schema(format!("Failed to create index on url: {}", e)))?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_web_navigation_name ON web_navigation(name)",
        params![],
    )
    .await
    .map_err(|e| DbError::Schema(format!("Failed to create index on name: {}", e)))?;

    Ok(())
}
