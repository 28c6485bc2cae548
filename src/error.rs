//! Error types for the sitescribe crate

use thiserror::Error;

/// Result type for sitescribe operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for sitescribe operations
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Missing or malformed configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Browser or page error
    #[error("Crawl error: {0}")]
    Crawl(String),

    /// Language-model enrichment error
    #[error("Process error: {0}")]
    Process(String),

    /// Object storage error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// Pipeline run failed
    #[error("Pipeline error: {0}")]
    Pipeline(String),

    /// Other errors
    #[error("{0}")]
    Other(String),
}
