//! # Mock Completion Model for Testing
//!
//! Provides a `MockCompletionModel` that implements the `CompletionModel` trait
//! for use in tests. Responses can be scripted per system prompt, so a single
//! mock can answer the detail, tag and translation calls of one crawl run
//! differently, or fail some of them.

use rig::{
    completion::{
        AssistantContent, CompletionError, CompletionModel, CompletionRequest, CompletionResponse,
    },
    message::{Message, UserContent},
    one_or_many::OneOrMany,
};
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Clone)]
enum Scripted {
    Text(String),
    Fail(String),
}

#[derive(Debug, Default)]
struct MockState {
    /// Fallback response when no rule matches
    response: Option<OneOrMany<AssistantContent>>,
    /// (preamble substring, outcome), first match wins
    rules: Vec<(String, Scripted)>,
    /// Preamble of every call received, in order
    calls: Vec<Option<String>>,
    /// Temperature of every call received, in order
    temperatures: Vec<Option<f64>>,
    /// User prompt text of every call received, in order
    prompts: Vec<String>,
}

/// A mock completion model for testing purposes.
#[derive(Debug, Clone, Default)]
pub struct MockCompletionModel {
    state: Arc<Mutex<MockState>>,
}

impl MockCompletionModel {
    /// Creates a new mock model that will return a default empty success response.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the response returned when no rule matches.
    pub async fn set_response(&self, response: OneOrMany<AssistantContent>) {
        self.state.lock().await.response = Some(response);
    }

    /// Helper to create a simple text response.
    pub async fn set_text_response(&self, text: &str) {
        self.set_response(OneOrMany::one(AssistantContent::text(text)))
            .await;
    }

    /// Answer with `text` whenever the preamble contains `preamble_contains`.
    pub async fn respond_when(&self, preamble_contains: &str, text: &str) {
        self.state.lock().await.rules.push((
            preamble_contains.to_string(),
            Scripted::Text(text.to_string()),
        ));
    }

    /// Fail whenever the preamble contains `preamble_contains`.
    pub async fn fail_when(&self, preamble_contains: &str, message: &str) {
        self.state.lock().await.rules.push((
            preamble_contains.to_string(),
            Scripted::Fail(message.to_string()),
        ));
    }

    /// Preambles of all calls received so far
    pub async fn calls(&self) -> Vec<Option<String>> {
        self.state.lock().await.calls.clone()
    }

    /// Temperatures of all calls received so far
    pub async fn temperatures(&self) -> Vec<Option<f64>> {
        self.state.lock().await.temperatures.clone()
    }

    /// User prompt text of all calls received so far
    pub async fn prompts(&self) -> Vec<String> {
        self.state.lock().await.prompts.clone()
    }
}

fn prompt_text(prompt: &Message) -> String {
    match prompt {
        Message::User { content } => content
            .iter()
            .filter_map(|c| match c {
                UserContent::Text(t) => Some(t.text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n"),
        Message::Assistant { .. } => String::new(),
    }
}

impl CompletionModel for MockCompletionModel {
    type Response = String;

    async fn completion(
        &self,
        completion_request: CompletionRequest,
    ) -> Result<CompletionResponse<Self::Response>, CompletionError> {
        let preamble = completion_request.preamble.clone();
        let (matched, fallback) = {
            let mut state = self.state.lock().await;
            state.calls.push(preamble.clone());
            state.temperatures.push(completion_request.temperature);
            state.prompts.push(prompt_text(&completion_request.prompt));

            let matched = preamble.as_deref().and_then(|preamble| {
                state
                    .rules
                    .iter()
                    .find(|(needle, _)| preamble.contains(needle.as_str()))
                    .map(|(_, outcome)| outcome.clone())
            });
            (matched, state.response.clone())
        };

        let choice = match matched {
            Some(Scripted::Text(text)) => OneOrMany::one(AssistantContent::text(text)),
            Some(Scripted::Fail(message)) => return Err(CompletionError::ProviderError(message)),
            None => fallback.unwrap_or_else(|| OneOrMany::one(AssistantContent::text(""))),
        };
        Ok(CompletionResponse {
            choice,
            raw_response: String::new(),
        })
    }
}
