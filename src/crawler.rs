//! # Website Crawler Module
//!
//! This module renders a target website in a headless browser and turns the
//! result into the raw signals the rest of the pipeline works from. It is the
//! first stage of a crawl run.
//!
//! ## Key Components
//!
//! - `CrawlerConfig`: Browser, viewport, user-agent and timeout settings
//! - `BrowserDriver` / `PageSession`: The seam between the pipeline and the browser
//! - `ChromiumBrowser`: Lazily launched, process-wide Chromium instance
//! - `extract_page_signals`: Rendered HTML to title, visible text and description
//! - `capture`: Screenshot, upload and thumbnail for a loaded page
//!
//! ## Features
//!
//! - One shared browser per process, one fresh page per run
//! - Random user agent per page from a fixed pool
//! - Bounded navigation timeout that degrades instead of failing the run
//! - Description fallback chain (meta, Open Graph, first long paragraph)

mod browser;
mod capture;
mod config;
mod content_extraction;
mod error;

// Re-export important types and functions
pub use browser::{BrowserDriver, ChromiumBrowser, PageSession, with_page_timeout};
pub use capture::{CaptureResult, capture, storage_key};
pub use config::{CrawlerConfig, CrawlerConfigBuilder, DEFAULT_USER_AGENTS};
pub use content_extraction::extract_page_signals;
pub use error::CrawlError;

/// Signals extracted from a rendered page
///
/// Produced once per run and never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageSignals {
    /// The rendered HTML the signals were extracted from
    pub rendered_html: String,

    /// Trimmed `<title>` text, empty when missing
    pub title: String,

    /// Visible text of the document
    pub body_text: String,

    /// Resolved description, empty when nothing suitable was found
    pub description: String,
}
