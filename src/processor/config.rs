//! # Enrichment Configuration Module
//!
//! This module provides configuration structures and builders for the
//! enrichment stage of a crawl run. It holds the system prompts sent to the
//! language model and the limits applied to every call.
//!
//! ## Key Components
//!
//! - `EnrichmentConfig`: Prompts, input token budget and sampling temperature
//! - `EnrichmentConfigBuilder`: Builder pattern implementation for easier configuration
//!
//! ## Features
//!
//! - Separate system prompts for detail extraction and tag selection
//! - Generic translation template with a `{language}` placeholder
//! - Dedicated translation prompts for Simplified Chinese, Traditional Chinese
//!   and Japanese, falling back to the generic template when unset
//!
//! An unset (empty) prompt disables the calls that use it.

use crate::language::Language;

/// Placeholder replaced with the target language's display name
pub const LANGUAGE_PLACEHOLDER: &str = "{language}";

/// Configuration for enrichment
#[derive(Debug, Clone)]
pub struct EnrichmentConfig {
    /// System prompt for detail extraction
    pub detail_prompt: String,

    /// System prompt for tag selection
    pub tag_prompt: String,

    /// Generic translation prompt containing `{language}`
    pub translation_prompt: String,

    /// Dedicated Simplified Chinese translation prompt
    pub translation_prompt_cn: String,

    /// Dedicated Traditional Chinese translation prompt
    pub translation_prompt_tw: String,

    /// Dedicated Japanese translation prompt
    pub translation_prompt_jp: String,

    /// Maximum input tokens sent with any single call
    pub max_tokens: usize,

    /// Sampling temperature for every call
    pub temperature: f64,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            detail_prompt: String::new(),
            tag_prompt: String::new(),
            translation_prompt: String::new(),
            translation_prompt_cn: String::new(),
            translation_prompt_tw: String::new(),
            translation_prompt_jp: String::new(),
            max_tokens: 5000,
            temperature: 0.2,
        }
    }
}

impl EnrichmentConfig {
    /// Create a new builder
    pub fn builder() -> EnrichmentConfigBuilder {
        EnrichmentConfigBuilder::new()
    }

    /// System prompt used to translate into `lang`.
    ///
    /// Returns `None` for the source language and when no usable prompt is
    /// configured.
    pub fn translation_prompt_for(&self, lang: Language) -> Option<String> {
        let dedicated = match lang {
            Language::En => return None,
            Language::Cn => self.translation_prompt_cn.as_str(),
            Language::Tw => self.translation_prompt_tw.as_str(),
            Language::Jp => self.translation_prompt_jp.as_str(),
            _ => "",
        };
        if !dedicated.trim().is_empty() {
            return Some(dedicated.to_string());
        }
        if self.translation_prompt.trim().is_empty() {
            return None;
        }
        Some(
            self.translation_prompt
                .replace(LANGUAGE_PLACEHOLDER, lang.display_name()),
        )
    }
}

/// Builder for EnrichmentConfig
#[derive(Debug, Default)]
pub struct EnrichmentConfigBuilder {
    config: EnrichmentConfig,
}

impl EnrichmentConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: EnrichmentConfig::default(),
        }
    }

    /// Set the detail extraction prompt
    pub fn detail_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.detail_prompt = prompt.into();
        self
    }

    /// Set the tag selection prompt
    pub fn tag_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.tag_prompt = prompt.into();
        self
    }

    /// Set the generic translation prompt
    pub fn translation_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.translation_prompt = prompt.into();
        self
    }

    /// Set a dedicated translation prompt.
    ///
    /// Only Simplified Chinese, Traditional Chinese and Japanese have
    /// dedicated prompts; other languages are ignored.
    pub fn dedicated_translation_prompt(mut self, lang: Language, prompt: impl Into<String>) -> Self {
        let prompt = prompt.into();
        match lang {
            Language::Cn => self.config.translation_prompt_cn = prompt,
            Language::Tw => self.config.translation_prompt_tw = prompt,
            Language::Jp => self.config.translation_prompt_jp = prompt,
            _ => {}
        }
        self
    }

    /// Set the input token budget
    pub fn max_tokens(mut self, max_tokens: usize) -> Self {
        self.config.max_tokens = max_tokens;
        self
    }

    /// Set the sampling temperature
    pub fn temperature(mut self, temperature: f64) -> Self {
        self.config.temperature = temperature;
        self
    }

    /// Build the configuration
    pub fn build(self) -> EnrichmentConfig {
        self.config
    }
}
