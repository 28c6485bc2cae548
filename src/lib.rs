//! # sitescribe - Website enrichment crawler
//!
//! Renders a website in a headless browser, pulls the title and description
//! out of the page, asks a language model for a markdown detail section and
//! tags, translates the description and detail into nine languages, uploads a
//! screenshot, and stores the resulting record in LibSQL.
//!
//! ## Features
//!
//! - Shared Chromium instance driven over CDP
//! - Rate-limited completion models (OpenAI-compatible endpoints or Gemini)
//! - Concurrent enrichment that degrades instead of failing
//! - HTTP API with synchronous and callback-based crawls
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use sitescribe::config::AppConfig;
//! use sitescribe::crawler::ChromiumBrowser;
//! use sitescribe::database::LibsqlRecordStore;
//! use sitescribe::model::openai_compatible_model;
//! use sitescribe::pipeline::Pipeline;
//! use sitescribe::processor::Enricher;
//! use sitescribe::record::CrawlRequest;
//! use sitescribe::storage::HttpObjectStore;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::from_env()?;
//!
//!     let pipeline = Pipeline::new(
//!         Arc::new(ChromiumBrowser::new(config.crawler.clone())),
//!         Enricher::new(openai_compatible_model(&config.llm), config.enrichment.clone()),
//!         Arc::new(HttpObjectStore::new(config.storage.clone())?),
//!         Arc::new(LibsqlRecordStore::open(&config.database_url, None).await?),
//!         config.crawler.clone(),
//!     );
//!
//!     let record = pipeline
//!         .scrape_website(&CrawlRequest::new("example.com", &[]))
//!         .await?;
//!     println!("{}", serde_json::to_string_pretty(&record)?);
//!     Ok(())
//! }
//! ```

mod error;

pub mod api;
pub mod config;
pub mod crawler;
pub mod database;
pub mod language;
pub mod model;
pub mod naming;
pub mod pipeline;
pub mod processor;
pub mod record;
pub mod storage;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{Error, Result};

/// Re-export of types module for public use
pub mod prelude {
    pub use crate::error::Error;
    pub use crate::error::Result;
    pub use crate::language::Language;
    pub use crate::pipeline::SiteCrawler;
    pub use crate::record::{CrawlRequest, SiteRecord};
}
