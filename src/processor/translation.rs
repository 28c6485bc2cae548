//! Per-language translation fan-out

use futures::future::join_all;
use rig::completion::CompletionModel;
use tracing::{debug, instrument, warn};

use crate::language::{Language, PerLanguage};
use crate::processor::config::EnrichmentConfig;
use crate::processor::detail::strip_markdown_markers;
use crate::processor::llm_integration::complete;
use crate::record::CrawlRequest;

/// Translations shorter than this (after trimming) are rejected
const MIN_TRANSLATION_CHARS: usize = 10;

/// Decide what to store for one language given the model's answer.
///
/// Empty or too-short answers fall back to the original content. Accepted
/// answers lose their markdown markers unless the original is itself
/// markdown (starts with `#`).
pub fn accept_translation(original: &str, candidate: Option<String>) -> String {
    let Some(candidate) = candidate else {
        return original.to_string();
    };
    if candidate.trim().chars().count() < MIN_TRANSLATION_CHARS {
        return original.to_string();
    }
    if original.starts_with('#') {
        candidate
    } else {
        strip_markdown_markers(&candidate)
    }
}

/// Translate `content` into a single language
///
/// The source language is returned unchanged without a model call. Model
/// failures are logged and fall back to the original content.
#[instrument(skip(model, config, content), fields(lang = %lang))]
pub async fn translate_one<M: CompletionModel>(
    model: &M,
    config: &EnrichmentConfig,
    lang: Language,
    content: &str,
) -> String {
    if lang.is_source() {
        return content.to_string();
    }
    let Some(prompt) = config.translation_prompt_for(lang) else {
        debug!("No translation prompt for {}, keeping original", lang);
        return content.to_string();
    };

    let candidate = match complete(model, &prompt, content, config).await {
        Ok(candidate) => candidate,
        Err(e) => {
            warn!("Translation to {} failed: {}", lang.display_name(), e);
            None
        }
    };
    let too_short = candidate
        .as_deref()
        .is_some_and(|c| c.trim().chars().count() < MIN_TRANSLATION_CHARS);
    if too_short {
        warn!(
            "Translation to {} returned an invalid result, keeping original",
            lang.display_name()
        );
    }
    accept_translation(content, candidate)
}

/// Translate `content` into every supported language concurrently.
///
/// Languages the request did not ask for keep the original content.
pub async fn translate_all<M: CompletionModel>(
    model: &M,
    config: &EnrichmentConfig,
    content: &str,
    request: &CrawlRequest,
) -> PerLanguage<String> {
    let targets = Language::ALL
        .into_iter()
        .filter(|lang| !lang.is_source() && request.wants(*lang));

    let translations = join_all(targets.map(|lang| async move {
        (lang, translate_one(model, config, lang, content).await)
    }))
    .await;

    let mut table = PerLanguage::from_fn(|_| content.to_string());
    for (lang, text) in translations {
        table.set(lang, text);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::mock_model::MockCompletionModel;

    fn config() -> EnrichmentConfig {
        EnrichmentConfig::builder()
            .translation_prompt("Translate into {language}.")
            .dedicated_translation_prompt(Language::Cn, "Translate into Simplified Chinese (dedicated).")
            .build()
    }

    #[test]
    fn test_accept_translation() {
        assert_eq!(accept_translation("orig", None), "orig");
        assert_eq!(accept_translation("orig", Some("  short  ".to_string())), "orig");
        assert_eq!(
            accept_translation("plain original", Some("## Eine **lange** Übersetzung".to_string())),
            "Eine lange Übersetzung"
        );
        assert_eq!(
            accept_translation("# Markdown original", Some("## Eine **lange** Übersetzung".to_string())),
            "## Eine **lange** Übersetzung"
        );
    }

    #[tokio::test]
    async fn test_source_language_is_identity() {
        let model = MockCompletionModel::new();
        let result = translate_one(&model, &config(), Language::En, "Hello world").await;
        assert_eq!(result, "Hello world");
        assert!(model.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_translate_all_uses_prompts_per_language() {
        let model = MockCompletionModel::new();
        model.respond_when("German", "Eine einfache Seite.").await;
        model.respond_when("(dedicated)", "一个简单的页面，真的很简单。").await;
        model.set_text_response("Generic translated text").await;

        let request = CrawlRequest::new("example.com", &[]);
        let table = translate_all(&model, &config(), "A simple page.", &request).await;

        assert_eq!(table.get(Language::En), "A simple page.");
        assert_eq!(table.get(Language::De), "Eine einfache Seite.");
        assert_eq!(table.get(Language::Cn), "一个简单的页面，真的很简单。");
        assert_eq!(table.get(Language::Fr), "Generic translated text");
        // eight non-source languages, one call each
        assert_eq!(model.calls().await.len(), 8);
    }

    #[tokio::test]
    async fn test_one_failure_does_not_affect_others() {
        let model = MockCompletionModel::new();
        model.fail_when("Spanish", "boom").await;
        model.respond_when("Portuguese", "curto").await;
        model.set_text_response("Translated successfully").await;

        let request = CrawlRequest::new("example.com", &[]);
        let table = translate_all(&model, &config(), "Original text", &request).await;

        assert_eq!(table.get(Language::Es), "Original text");
        assert_eq!(table.get(Language::Pt), "Original text");
        assert_eq!(table.get(Language::De), "Translated successfully");
        assert_eq!(table.get(Language::Ru), "Translated successfully");
    }

    #[tokio::test]
    async fn test_requested_languages_limit_calls() {
        let model = MockCompletionModel::new();
        model.set_text_response("Traduction française").await;

        let request = CrawlRequest::new("example.com", &["fr".to_string()]);
        let table = translate_all(&model, &config(), "Original text", &request).await;

        assert_eq!(table.get(Language::Fr), "Traduction française");
        assert_eq!(table.get(Language::De), "Original text");
        assert_eq!(model.calls().await.len(), 1);
    }
}
