//! Record persistence backed by libsql

use async_trait::async_trait;
use libsql::{Connection, Value};
use tracing::{debug, info, instrument};

use crate::database::error::DbError;
use crate::database::retry::{RetryPolicy, retry_fixed};
use crate::database::schema::{self, TABLE_NAME};
use crate::record::SiteRecord;

/// Persistence collaborator for finished crawl records
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert a record, returning the number of inserted rows
    async fn insert_record(&self, record: &SiteRecord) -> Result<u64, DbError>;
}

/// Record store writing to the `web_navigation` table
#[derive(Clone)]
pub struct LibsqlRecordStore {
    conn: Connection,
    retry: RetryPolicy,
}

impl LibsqlRecordStore {
    /// Create a store on an open connection, creating the schema if needed
    #[instrument(skip(conn))]
    pub async fn new(conn: Connection) -> Result<Self, DbError> {
        schema::initialize_schema(&conn).await?;
        Ok(Self {
            conn,
            retry: RetryPolicy::default(),
        })
    }

    /// Open (or create) a local database file
    pub async fn new_from_path(path: &str) -> Result<Self, DbError> {
        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DbError::Connection(format!("Failed to open database: {}", e)))?;

        let conn = db
            .connect()
            .map_err(|e| DbError::Connection(format!("Failed to connect to database: {}", e)))?;

        Self::new(conn).await
    }

    /// Connect to a remote libsql server
    pub async fn new_remote(url: &str, auth_token: &str) -> Result<Self, DbError> {
        let db = libsql::Builder::new_remote(url.to_string(), auth_token.to_string())
            .build()
            .await
            .map_err(|e| DbError::Connection(format!("Failed to open remote database: {}", e)))?;

        let conn = db
            .connect()
            .map_err(|e| DbError::Connection(format!("Failed to connect to database: {}", e)))?;

        Self::new(conn).await
    }

    /// Open a database from a URL: `libsql://`, `http(s)://` and `wss://`
    /// URLs are remote, anything else is a local path.
    pub async fn open(url: &str, auth_token: Option<&str>) -> Result<Self, DbError> {
        let remote = ["libsql://", "http://", "https://", "wss://", "ws://"]
            .iter()
            .any(|scheme| url.starts_with(scheme));
        if remote {
            Self::new_remote(url, auth_token.unwrap_or_default()).await
        } else {
            let path = url.strip_prefix("file:").unwrap_or(url);
            Self::new_from_path(path).await
        }
    }

    /// Override the retry policy
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn insert_once(&self, sql: &str, values: Vec<Value>) -> Result<u64, DbError> {
        self.conn
            .execute(sql, values)
            .await
            .map_err(|e| DbError::Query(format!("Failed to insert record: {}", e)))
    }
}

/// Build the insert statement and its values for a record
fn insert_statement(record: &SiteRecord) -> (String, Vec<Value>) {
    let columns = record.columns();
    let names: Vec<&str> = columns.iter().map(|(name, _)| name.as_str()).collect();
    let placeholders = vec!["?"; columns.len()].join(", ");
    let sql = format!(
        "INSERT INTO {TABLE_NAME} ({}) VALUES ({})",
        names.join(", "),
        placeholders
    );
    let values = columns
        .into_iter()
        .map(|(_, value)| match value {
            Some(text) => Value::Text(text),
            None => Value::Null,
        })
        .collect();
    (sql, values)
}

#[async_trait]
impl RecordStore for LibsqlRecordStore {
    #[instrument(skip(self, record), fields(name = %record.name))]
    async fn insert_record(&self, record: &SiteRecord) -> Result<u64, DbError> {
        let (sql, values) = insert_statement(record);
        debug!("Inserting record with {} columns", values.len());

        let inserted = retry_fixed(self.retry, || self.insert_once(&sql, values.clone())).await?;
        info!("Stored record for {}", record.url);
        Ok(inserted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::{Language, PerLanguage};
    use chrono::Utc;
    use libsql::params;
    use std::time::Duration;
    use tempfile::tempdir;

    async fn setup_test_store() -> Result<(LibsqlRecordStore, tempfile::TempDir), DbError> {
        let temp_dir = tempdir().unwrap();
        let db_path = temp_dir
            .path()
            .join("test.db")
            .to_string_lossy()
            .to_string();
        let store = LibsqlRecordStore::new_from_path(&db_path).await?.with_retry(RetryPolicy {
            attempts: 3,
            backoff: Duration::from_millis(1),
        });
        Ok((store, temp_dir))
    }

    fn sample_record() -> SiteRecord {
        let mut content = PerLanguage::from_fn(|_| "A simple page.".to_string());
        content.set(Language::Fr, "Une page simple.".to_string());
        SiteRecord {
            name: "example-com".to_string(),
            title: "Example".to_string(),
            url: "https://example.com".to_string(),
            image_url: "https://cdn.test/example-com.png".to_string(),
            thumbnail_url: "https://cdn.test/thumb/example-com.png".to_string(),
            collection_time: Utc::now(),
            star_rating: 0,
            category_name: None,
            tags: vec![],
            content,
            detail: PerLanguage::from_fn(|_| Some("# Example".to_string())),
        }
    }

    #[tokio::test]
    async fn test_schema_created() {
        let (store, _temp_dir) = setup_test_store().await.unwrap();
        let mut rows = store
            .conn
            .query(
                "SELECT name FROM sqlite_master WHERE type='table' AND name = 'web_navigation'",
                params![],
            )
            .await
            .unwrap();
        assert!(rows.next().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_insert_record() {
        let (store, _temp_dir) = setup_test_store().await.unwrap();
        let inserted = store.insert_record(&sample_record()).await.unwrap();
        assert_eq!(inserted, 1);

        let mut rows = store
            .conn
            .query(
                "SELECT name, url, content, content_fr, detail_de, category_name, star_rating FROM web_navigation",
                params![],
            )
            .await
            .unwrap();
        let row = rows.next().await.unwrap().unwrap();
        assert_eq!(row.get::<String>(0).unwrap(), "example-com");
        assert_eq!(row.get::<String>(1).unwrap(), "https://example.com");
        assert_eq!(row.get::<String>(2).unwrap(), "A simple page.");
        assert_eq!(row.get::<String>(3).unwrap(), "Une page simple.");
        assert_eq!(row.get::<String>(4).unwrap(), "# Example");
        assert_eq!(row.get::<Option<String>>(5).unwrap(), None);
        assert_eq!(row.get::<i64>(6).unwrap(), 0);
    }

    #[tokio::test]
    async fn test_insert_gives_up_after_retries() {
        let (store, _temp_dir) = setup_test_store().await.unwrap();
        store
            .conn
            .execute("DROP TABLE web_navigation", params![])
            .await
            .unwrap();

        let result = store.insert_record(&sample_record()).await;
        assert!(matches!(
            result,
            Err(DbError::RetriesExhausted { attempts: 3, .. })
        ));
    }

    #[test]
    fn test_insert_statement_covers_every_column() {
        let (sql, values) = insert_statement(&sample_record());
        assert!(sql.starts_with("INSERT INTO web_navigation (name, title, url"));
        assert_eq!(sql.matches('?').count(), values.len());
        assert!(matches!(values[7], Value::Null));
    }
}
