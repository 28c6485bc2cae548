//! Content enrichment module
//!
//! This module turns the signals extracted from a page into model-derived
//! content: a markdown detail section, a list of tags, and translations of
//! both the description and the detail into every supported language.
//!
//! Every model call here degrades instead of failing: a failed detail call
//! leaves the detail absent, a failed tag call yields no tags, and a failed
//! translation keeps the original text.

mod config;
mod detail;
mod error;
mod llm_integration;
mod translation;

pub use config::{EnrichmentConfig, EnrichmentConfigBuilder, LANGUAGE_PLACEHOLDER};
pub use detail::{parse_tags, select_markdown_section, strip_markdown_markers};
pub use error::ProcessError;
pub use llm_integration::{complete, truncate_to_tokens};
pub use translation::{accept_translation, translate_all, translate_one};

use rig::completion::CompletionModel;
use tracing::{info, instrument, warn};

use crate::crawler::PageSignals;
use crate::language::PerLanguage;
use crate::record::CrawlRequest;

/// Model-derived content for one page
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichmentResult {
    /// Markdown detail section in the source language
    pub detail: Option<String>,

    /// Tags in model order
    pub tags: Vec<String>,

    /// Description per language
    pub descriptions: PerLanguage<String>,

    /// Detail per language, all `None` when there is no detail
    pub details: PerLanguage<Option<String>>,
}

/// Runs the enrichment calls against one completion model
#[derive(Clone)]
pub struct Enricher<M: CompletionModel> {
    model: M,
    config: EnrichmentConfig,
}

impl<M: CompletionModel> Enricher<M> {
    pub fn new(model: M, config: EnrichmentConfig) -> Self {
        Self { model, config }
    }

    pub fn config(&self) -> &EnrichmentConfig {
        &self.config
    }

    /// Extract the markdown detail section from the page text
    #[instrument(skip_all)]
    pub async fn extract_detail(&self, body_text: &str) -> Option<String> {
        info!("Extracting detail");
        match complete(&self.model, &self.config.detail_prompt, body_text, &self.config).await {
            Ok(Some(text)) => Some(select_markdown_section(&text)),
            Ok(None) => None,
            Err(e) => {
                warn!("Detail extraction failed: {}", e);
                None
            }
        }
    }

    /// Ask the model for comma-separated tags describing the page
    #[instrument(skip_all)]
    pub async fn extract_tags(&self, body_text: &str) -> Vec<String> {
        info!("Extracting tags");
        let tags = match complete(&self.model, &self.config.tag_prompt, body_text, &self.config).await {
            Ok(Some(text)) => parse_tags(&text),
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!("Tag extraction failed: {}", e);
                Vec::new()
            }
        };
        info!("Extracted tags: {:?}", tags);
        tags
    }

    /// Translate the description into every supported language
    #[instrument(skip_all)]
    pub async fn translate_description(
        &self,
        description: &str,
        request: &CrawlRequest,
    ) -> PerLanguage<String> {
        translate_all(&self.model, &self.config, description, request).await
    }

    /// Translate the detail into every supported language
    #[instrument(skip_all)]
    pub async fn translate_detail(
        &self,
        detail: Option<&str>,
        request: &CrawlRequest,
    ) -> PerLanguage<Option<String>> {
        let Some(detail) = detail else {
            return PerLanguage::from_fn(|_| None);
        };
        let translated = translate_all(&self.model, &self.config, detail, request).await;
        PerLanguage::from_fn(|lang| Some(translated.get(lang).clone()))
    }

    /// Run every enrichment step for a page.
    ///
    /// Detail extraction, tag extraction and the description fan-out run
    /// concurrently. The detail fan-out starts once the detail is known.
    #[instrument(skip_all, fields(url = %request.url()))]
    pub async fn enrich(&self, signals: &PageSignals, request: &CrawlRequest) -> EnrichmentResult {
        let detail_branch = async {
            let detail = self.extract_detail(&signals.body_text).await;
            let details = self.translate_detail(detail.as_deref(), request).await;
            (detail, details)
        };

        let ((detail, details), tags, descriptions) = tokio::join!(
            detail_branch,
            self.extract_tags(&signals.body_text),
            self.translate_description(&signals.description, request),
        );

        EnrichmentResult {
            detail,
            tags,
            descriptions,
            details,
        }
    }
}
