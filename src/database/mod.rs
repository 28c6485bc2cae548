//! Record persistence module
//!
//! This module stores finished crawl records. The pipeline only sees the
//! [`RecordStore`] trait; [`LibsqlRecordStore`] writes rows to a local or
//! remote libsql database, retrying failed inserts with a fixed backoff.

pub mod error;
mod retry;
mod schema;
mod store;

pub use error::DbError;
pub use retry::{RetryPolicy, retry_fixed};
pub use schema::{TABLE_NAME, create_table_sql, initialize_schema};
pub use store::{LibsqlRecordStore, RecordStore};
