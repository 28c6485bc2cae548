//! # Crawl Pipeline
//!
//! Ties the crawler, enrichment, capture and persistence together into one
//! run per request. A run moves through these stages:
//!
//! `Init -> BrowserReady -> PageLoaded -> SignalsExtracted -> Enriched ->
//! Captured -> Persisted -> Done`
//!
//! Navigation problems and persistence failures degrade the run; browser,
//! DOM and capture failures abort it. The page is closed however the run
//! ends, the shared browser stays up.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;
use rig::completion::CompletionModel;
use thiserror::Error;
use tracing::{error, info, instrument, warn};

use crate::crawler::{
    BrowserDriver, CrawlError, CrawlerConfig, PageSession, capture, extract_page_signals,
    with_page_timeout,
};
use crate::database::RecordStore;
use crate::error::Error as CrateError;
use crate::naming::record_name;
use crate::processor::Enricher;
use crate::record::{CrawlRequest, SiteRecord};
use crate::storage::ObjectStore;

/// Stage of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStage {
    Init,
    BrowserReady,
    PageLoaded,
    SignalsExtracted,
    Enriched,
    Captured,
    Persisted,
    Done,
}

impl fmt::Display for RunStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunStage::Init => "init",
            RunStage::BrowserReady => "browser-ready",
            RunStage::PageLoaded => "page-loaded",
            RunStage::SignalsExtracted => "signals-extracted",
            RunStage::Enriched => "enriched",
            RunStage::Captured => "captured",
            RunStage::Persisted => "persisted",
            RunStage::Done => "done",
        };
        f.write_str(name)
    }
}

/// A crawl run that produced no record.
///
/// `stage` is the last stage the run reached before failing.
#[derive(Debug, Error)]
#[error("Crawl of {url} failed after stage {stage}: {source}")]
pub struct PipelineError {
    pub url: String,
    pub stage: RunStage,
    #[source]
    pub source: CrawlError,
}

impl From<PipelineError> for CrateError {
    fn from(err: PipelineError) -> Self {
        CrateError::Pipeline(err.to_string())
    }
}

/// Anything that can turn a crawl request into a site record
#[async_trait]
pub trait SiteCrawler: Send + Sync {
    async fn crawl(&self, request: &CrawlRequest) -> Result<SiteRecord, PipelineError>;
}

/// The full crawl pipeline over its collaborators
pub struct Pipeline<M: CompletionModel> {
    browser: Arc<dyn BrowserDriver>,
    enricher: Enricher<M>,
    store: Arc<dyn ObjectStore>,
    records: Arc<dyn RecordStore>,
    config: CrawlerConfig,
}

impl<M: CompletionModel> Pipeline<M> {
    pub fn new(
        browser: Arc<dyn BrowserDriver>,
        enricher: Enricher<M>,
        store: Arc<dyn ObjectStore>,
        records: Arc<dyn RecordStore>,
        config: CrawlerConfig,
    ) -> Self {
        Self {
            browser,
            enricher,
            store,
            records,
            config,
        }
    }

    /// Crawl, enrich, capture and persist one site.
    ///
    /// Always logs the total elapsed time, whatever the outcome.
    #[instrument(skip(self, request), fields(url = %request.url()))]
    pub async fn scrape_website(&self, request: &CrawlRequest) -> Result<SiteRecord, PipelineError> {
        let started = Instant::now();
        info!("Processing {}", request.url());

        let outcome = self.run(request).await;

        let elapsed = started.elapsed();
        match &outcome {
            Ok(_) => info!(
                elapsed_secs = elapsed.as_secs_f64(),
                "Processed {} in {:.1}s",
                request.url(),
                elapsed.as_secs_f64()
            ),
            Err(e) => error!(
                elapsed_secs = elapsed.as_secs_f64(),
                "Processing {} failed after {:.1}s: {}",
                request.url(),
                elapsed.as_secs_f64(),
                e
            ),
        }
        outcome
    }

    async fn run(&self, request: &CrawlRequest) -> Result<SiteRecord, PipelineError> {
        let fail = |stage: RunStage| {
            let url = request.url().to_string();
            move |source: CrawlError| PipelineError { url, stage, source }
        };

        let page = self.browser.new_page().await.map_err(fail(RunStage::Init))?;
        let outcome = self.process_page(page.as_ref(), request).await;
        if let Err(e) = page.close().await {
            warn!("Failed to close page: {}", e);
        }

        outcome.map_err(|(stage, source)| fail(stage)(source))
    }

    async fn process_page(
        &self,
        page: &dyn PageSession,
        request: &CrawlRequest,
    ) -> Result<SiteRecord, (RunStage, CrawlError)> {
        let url = request.url();

        // BrowserReady -> PageLoaded
        let at = |stage: RunStage| move |e: CrawlError| (stage, e);
        if let Some(user_agent) = self.config.random_user_agent() {
            page.set_user_agent(user_agent)
                .await
                .map_err(at(RunStage::BrowserReady))?;
        }
        page.set_viewport(self.config.viewport_width, self.config.viewport_height)
            .await
            .map_err(at(RunStage::BrowserReady))?;

        let navigation = with_page_timeout(
            page.navigate(url),
            self.config.navigation_timeout(),
            "Page navigation",
        )
        .await;
        if let Err(e) = navigation {
            warn!("Page load degraded, continuing with what has loaded: {}", e);
        }

        // PageLoaded -> SignalsExtracted
        let html = page.content().await.map_err(at(RunStage::PageLoaded))?;
        let signals = extract_page_signals(&html);
        let name = record_name(url, Utc::now());

        // SignalsExtracted -> Enriched
        let enrichment = self.enricher.enrich(&signals, request).await;

        // Enriched -> Captured
        let captured = capture(page, url, &name, self.store.as_ref(), &self.config)
            .await
            .map_err(at(RunStage::Enriched))?;

        let record = SiteRecord {
            name,
            title: signals.title,
            url: url.to_string(),
            image_url: captured.image_url,
            thumbnail_url: captured.thumbnail_url,
            collection_time: Utc::now(),
            star_rating: 0,
            category_name: enrichment.tags.first().cloned(),
            tags: enrichment.tags,
            content: enrichment.descriptions,
            detail: enrichment.details,
        };

        // Captured -> Persisted
        match self.records.insert_record(&record).await {
            Ok(rows) => info!("Stored {} row(s) for {}", rows, url),
            Err(e) => error!("Failed to store record for {}: {}", url, e),
        }

        Ok(record)
    }
}

#[async_trait]
impl<M: CompletionModel + 'static> SiteCrawler for Pipeline<M> {
    async fn crawl(&self, request: &CrawlRequest) -> Result<SiteRecord, PipelineError> {
        self.scrape_website(request).await
    }
}
