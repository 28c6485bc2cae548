//! Error types for the crawler module

use crate::error::Error as CrateError;
use crate::storage::StorageError;
use thiserror::Error;

/// Error type for crawler operations
#[derive(Debug, Error)]
pub enum CrawlError {
    /// Browser could not be found or launched
    #[error("Browser launch error: {0}")]
    Launch(String),

    /// Chrome DevTools Protocol error
    #[error("Browser error: {0}")]
    Browser(String),

    /// Navigation failed or did not finish in time
    #[error("Navigation error: {0}")]
    Navigation(String),

    /// Screenshot capture failed
    #[error("Screenshot error: {0}")]
    Screenshot(String),

    /// Screenshot upload or thumbnail failed
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<chromiumoxide::error::CdpError> for CrawlError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        CrawlError::Browser(err.to_string())
    }
}

impl From<CrawlError> for CrateError {
    fn from(err: CrawlError) -> Self {
        match err {
            CrawlError::Io(e) => CrateError::Io(e),
            _ => CrateError::Crawl(err.to_string()),
        }
    }
}
