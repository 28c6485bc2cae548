//! LLM integration functionality for the processor module

use rig::completion::{AssistantContent, CompletionModel};
use tracing::{debug, instrument, trace};

use crate::processor::config::EnrichmentConfig;
use crate::processor::error::ProcessError;

/// Characters of one word-piece token in alphabetic scripts
const CHARS_PER_WORD_TOKEN: usize = 4;

/// Ideographic, kana and hangul characters, which tokenize to roughly one
/// token per character
fn is_wide_script(ch: char) -> bool {
    matches!(
        u32::from(ch),
        0x3040..=0x30FF
            | 0x3400..=0x4DBF
            | 0x4E00..=0x9FFF
            | 0xAC00..=0xD7AF
            | 0xF900..=0xFAFF
            | 0xFF00..=0xFFEF
            | 0x20000..=0x2FA1F
    )
}

/// Walk `text` and return the byte offset where token number `limit + 1`
/// starts, or `None` if the text fits. With `limit == usize::MAX` this only
/// counts; the count is the second value.
fn scan_tokens(text: &str, limit: usize) -> (Option<usize>, usize) {
    let mut tokens = 0usize;
    let mut word_len = 0usize;
    for (idx, ch) in text.char_indices() {
        let starts_token = if ch.is_whitespace() {
            word_len = 0;
            false
        } else if is_wide_script(ch) || !ch.is_alphanumeric() {
            word_len = 0;
            true
        } else {
            word_len += 1;
            word_len % CHARS_PER_WORD_TOKEN == 1
        };
        if starts_token {
            if tokens == limit {
                return (Some(idx), tokens);
            }
            tokens += 1;
        }
    }
    (None, tokens)
}

/// Estimated number of model tokens in `text`.
///
/// Alphabetic words cost one token per started run of four characters,
/// every CJK character and every punctuation mark costs one, and
/// whitespace is free.
pub fn count_tokens(text: &str) -> usize {
    scan_tokens(text, usize::MAX).1
}

/// Cut `text` so that at most `max_tokens` tokens remain, as counted by
/// [`count_tokens`].
///
/// The result is a prefix of the input with trailing whitespace removed, so
/// the original spacing and line breaks survive. A budget of zero means no
/// limit.
pub fn truncate_to_tokens(text: &str, max_tokens: usize) -> &str {
    if max_tokens == 0 {
        return text;
    }
    match scan_tokens(text, max_tokens) {
        (Some(cut), _) => text[..cut].trim_end(),
        (None, _) => text,
    }
}

/// Run one completion with a system prompt over some text
///
/// # Arguments
///
/// * `model` - The completion model to use
/// * `system_prompt` - The system prompt (preamble)
/// * `text` - The user text, truncated to the configured token budget
/// * `config` - Enrichment configuration
///
/// # Returns
///
/// The model's text, or `None` when the prompt or the text is empty or the
/// model answered with no text.
#[instrument(skip_all, fields(text_len = text.len()))]
pub async fn complete<M: CompletionModel>(
    model: &M,
    system_prompt: &str,
    text: &str,
    config: &EnrichmentConfig,
) -> Result<Option<String>, ProcessError> {
    if system_prompt.trim().is_empty() {
        debug!("System prompt is empty, skipping model call");
        return Ok(None);
    }
    if text.trim().is_empty() {
        debug!("Input text is empty, skipping model call");
        return Ok(None);
    }

    let input = truncate_to_tokens(text, config.max_tokens);
    if input.len() < text.len() {
        debug!("Input exceeds {} tokens, truncated", config.max_tokens);
    }

    let response = model
        .completion_request(input)
        .preamble(system_prompt.to_string())
        .temperature(config.temperature)
        .send()
        .await?;

    let output = response
        .choice
        .iter()
        .filter_map(|c| match c {
            AssistantContent::Text(t) => Some(t.text.clone()),
            _ => None,
        })
        .collect::<Vec<String>>()
        .join("\n");

    trace!("Model returned {} chars", output.len());
    if output.trim().is_empty() {
        Ok(None)
    } else {
        Ok(Some(output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::mock_model::MockCompletionModel;

    #[test]
    fn test_count_tokens() {
        assert_eq!(count_tokens(""), 0);
        assert_eq!(count_tokens("one two"), 2);
        assert_eq!(count_tokens("internationalization"), 5);
        assert_eq!(count_tokens("Hello, world!"), 6);
        assert_eq!(count_tokens("中文页面"), 4);
        assert_eq!(count_tokens("日本語のページ"), 7);
    }

    #[test]
    fn test_truncate_to_tokens() {
        assert_eq!(truncate_to_tokens("one two three four", 2), "one two");
        assert_eq!(truncate_to_tokens("  one\n\ntwo  three", 2), "  one\n\ntwo");
        assert_eq!(truncate_to_tokens("one two", 2), "one two");
        assert_eq!(truncate_to_tokens("one two", 5), "one two");
        assert_eq!(truncate_to_tokens("one two", 0), "one two");
        assert_eq!(truncate_to_tokens("", 3), "");
        assert_eq!(truncate_to_tokens("héllo wörld ünïcode", 4), "héllo wörld");
        assert_eq!(truncate_to_tokens("中文页面内容", 3), "中文页");
    }

    #[test]
    fn test_truncate_cjk_page() {
        let text = "这是一个非常长的中文页面内容".repeat(20_000);

        let truncated = truncate_to_tokens(&text, 5000);

        assert!(text.starts_with(truncated));
        assert_eq!(truncated.chars().count(), 5000);
        assert!(count_tokens(truncated) <= 5000);
    }

    #[test]
    fn test_truncate_unspaced_text() {
        let text = "a".repeat(100_000);

        let truncated = truncate_to_tokens(&text, 10);

        assert_eq!(truncated.len(), 10 * CHARS_PER_WORD_TOKEN);
        assert_eq!(count_tokens(truncated), 10);
    }

    #[tokio::test]
    async fn test_complete_sends_preamble_and_temperature() {
        let model = MockCompletionModel::new();
        model.set_text_response("answer").await;
        let config = EnrichmentConfig::default();

        let result = complete(&model, "system", "user text", &config).await.unwrap();

        assert_eq!(result.as_deref(), Some("answer"));
        assert_eq!(model.calls().await, vec![Some("system".to_string())]);
        assert_eq!(model.temperatures().await, vec![Some(0.2)]);
    }

    #[tokio::test]
    async fn test_complete_sends_truncated_text() {
        let model = MockCompletionModel::new();
        model.set_text_response("answer").await;
        let config = EnrichmentConfig::builder().max_tokens(3).build();

        complete(&model, "system", "alpha beta gamma delta epsilon", &config)
            .await
            .unwrap();
        complete(&model, "system", "这是一个中文页面", &config)
            .await
            .unwrap();

        assert_eq!(
            model.prompts().await,
            vec!["alpha beta gamma".to_string(), "这是一".to_string()]
        );
    }

    #[tokio::test]
    async fn test_complete_skips_empty_inputs() {
        let model = MockCompletionModel::new();
        model.set_text_response("answer").await;
        let config = EnrichmentConfig::default();

        assert_eq!(complete(&model, "", "text", &config).await.unwrap(), None);
        assert_eq!(complete(&model, "system", "  ", &config).await.unwrap(), None);
        assert!(model.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_complete_empty_answer_is_none() {
        let model = MockCompletionModel::new();
        let config = EnrichmentConfig::default();
        assert_eq!(complete(&model, "system", "text", &config).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_complete_propagates_failure() {
        let model = MockCompletionModel::new();
        model.fail_when("system", "quota exceeded").await;
        let config = EnrichmentConfig::default();

        let result = complete(&model, "system", "text", &config).await;
        assert!(matches!(result, Err(ProcessError::Llm(_))));
    }
}
