//! # LLM Client Module
//!
//! This module builds the completion models used for enrichment, with
//! built-in rate limiting to prevent API quota exhaustion.
//!
//! ## Key Components
//!
//! - `LlmSettings`: Provider, credentials and quota for the completion model
//! - `RateLimitedCompletionModel`: A wrapper that adds rate limiting to any completion model
//! - `openai_compatible_model` / `gemini_model`: Constructors for the supported providers
//!
//! ## Features
//!
//! - Any OpenAI-compatible endpoint (Groq by default) or Gemini
//! - Configurable requests-per-minute quota
//! - Instrumentation with tracing spans for monitoring
//! - Type-safe model integration with the `rig` framework

use std::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use rig::completion::{CompletionError, CompletionModel, CompletionRequest, CompletionResponse};
use rig::providers::{gemini, openai};
use tracing::{Instrument, debug, info_span};

#[cfg(test)]
pub mod mock_model;

/// Default base URL for the OpenAI-compatible provider
pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Default model for the OpenAI-compatible provider
pub const DEFAULT_OPENAI_MODEL: &str = "llama-3.1-70b-versatile";

/// Default Gemini model
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";

/// Supported completion providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Provider {
    /// Any endpoint speaking the OpenAI chat completions API
    #[default]
    OpenAi,
    Gemini,
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" | "groq" => Ok(Provider::OpenAi),
            "gemini" => Ok(Provider::Gemini),
            other => Err(format!("unknown LLM provider: {other}")),
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::OpenAi => f.write_str("openai"),
            Provider::Gemini => f.write_str("gemini"),
        }
    }
}

/// Settings for building a completion model
#[derive(Clone)]
pub struct LlmSettings {
    pub provider: Provider,
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub requests_per_minute: u32,
}

impl fmt::Debug for LlmSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmSettings")
            .field("provider", &self.provider)
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("requests_per_minute", &self.requests_per_minute)
            .finish()
    }
}

/// Build a direct rate limiter allowing `requests_per_minute` calls.
///
/// A quota of zero is treated as one request per minute.
pub fn rate_limiter(requests_per_minute: u32) -> DefaultDirectRateLimiter {
    let quota = NonZeroU32::new(requests_per_minute).unwrap_or(NonZeroU32::MIN);
    RateLimiter::direct(Quota::per_minute(quota))
}

/// Completion model that takes a permit from a shared quota before every
/// call. Clones draw from the same quota, so the detail, tag and translation
/// calls of all concurrent crawls together stay within it.
#[derive(Clone)]
pub struct RateLimitedCompletionModel<M: CompletionModel> {
    model: M,
    limiter: Arc<DefaultDirectRateLimiter>,
}

impl<M: CompletionModel> RateLimitedCompletionModel<M> {
    pub fn new(model: M, limiter: DefaultDirectRateLimiter) -> Self {
        Self {
            model,
            limiter: Arc::new(limiter),
        }
    }
}

impl<M: CompletionModel> CompletionModel for RateLimitedCompletionModel<M> {
    type Response = M::Response;

    async fn completion(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse<Self::Response>, CompletionError> {
        let queued = Instant::now();
        self.limiter.until_ready().await;
        let waited = queued.elapsed();
        if waited > Duration::from_millis(10) {
            debug!("Waited {:?} for a completion permit", waited);
        }

        self.model
            .completion(request)
            .instrument(info_span!("completion", waited_ms = waited.as_millis() as u64))
            .await
    }
}

/// Completion model for an OpenAI-compatible endpoint
pub fn openai_compatible_model(
    settings: &LlmSettings,
) -> RateLimitedCompletionModel<impl CompletionModel + use<>> {
    let client = openai::Client::from_url(&settings.api_key, &settings.base_url);
    RateLimitedCompletionModel::new(
        client.completion_model(&settings.model),
        rate_limiter(settings.requests_per_minute),
    )
}

/// Gemini completion model
pub fn gemini_model(
    settings: &LlmSettings,
) -> RateLimitedCompletionModel<gemini::completion::CompletionModel> {
    let client = gemini::Client::new(&settings.api_key);
    RateLimitedCompletionModel::new(
        client.completion_model(&settings.model),
        rate_limiter(settings.requests_per_minute),
    )
}
