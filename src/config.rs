//! Application configuration loaded from environment variables
//!
//! A `.env` file in the working directory is loaded first when present.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use crate::crawler::CrawlerConfig;
use crate::error::{Error, Result};
use crate::language::Language;
use crate::model::{DEFAULT_BASE_URL, DEFAULT_GEMINI_MODEL, DEFAULT_OPENAI_MODEL, LlmSettings, Provider};
use crate::processor::EnrichmentConfig;
use crate::storage::StorageConfig;

/// Address the API listens on unless `BIND_ADDR` says otherwise
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8040";

/// Local database file used unless `DATABASE_URL` is set
pub const DEFAULT_DATABASE_URL: &str = "sitescribe.db";

#[derive(Debug, Clone)]
pub struct AppConfig {
    // Server
    pub bind_addr: SocketAddr,
    pub auth_secret: Option<String>,

    // AI / LLM
    pub llm: LlmSettings,
    pub enrichment: EnrichmentConfig,

    // Storage
    pub storage: StorageConfig,

    // Database
    pub database_url: String,
    pub database_auth_token: Option<String>,

    // Browser
    pub crawler: CrawlerConfig,
}

impl AppConfig {
    /// Load `.env` (if any) and read the configuration from the environment
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        let config = Self::from_lookup(|key| std::env::var(key).ok())?;
        config.log_keys();
        Ok(config)
    }

    /// Read the configuration through `lookup`; empty values count as unset
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let text = |key: &str| var(key).unwrap_or_default();

        let provider = match var("LLM_PROVIDER") {
            Some(value) => Provider::from_str(&value).map_err(Error::Config)?,
            None => Provider::default(),
        };
        let default_model = match provider {
            Provider::OpenAi => DEFAULT_OPENAI_MODEL,
            Provider::Gemini => DEFAULT_GEMINI_MODEL,
        };
        let llm = LlmSettings {
            provider,
            api_key: var("LLM_API_KEY")
                .or_else(|| var("GROQ_API_KEY"))
                .ok_or_else(|| Error::Config("LLM_API_KEY (or GROQ_API_KEY) must be set".to_string()))?,
            base_url: var("LLM_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            model: var("LLM_MODEL").unwrap_or_else(|| default_model.to_string()),
            requests_per_minute: parse_or(var("LLM_REQUESTS_PER_MINUTE"), "LLM_REQUESTS_PER_MINUTE", 30)?,
        };

        let enrichment = EnrichmentConfig::builder()
            .detail_prompt(text("DETAIL_SYS_PROMPT"))
            .tag_prompt(text("TAG_SELECTOR_SYS_PROMPT"))
            .translation_prompt(text("DESCRIPTION_TRANSLATION_PROMPT"))
            .dedicated_translation_prompt(Language::Cn, text("DESCRIPTION_TRANSLATION_PROMPT_ZH"))
            .dedicated_translation_prompt(Language::Jp, text("DESCRIPTION_TRANSLATION_PROMPT_JP"))
            .dedicated_translation_prompt(Language::Tw, text("DESCRIPTION_TRANSLATION_PROMPT_TW"))
            .max_tokens(parse_or(var("LLM_MAX_TOKENS"), "LLM_MAX_TOKENS", 5000)?)
            .build();

        let storage = StorageConfig {
            endpoint: text("STORAGE_ENDPOINT"),
            bucket: text("STORAGE_BUCKET"),
            token: var("STORAGE_TOKEN"),
            public_url: text("STORAGE_PUBLIC_URL"),
            thumbnail_template: var("STORAGE_THUMBNAIL_TEMPLATE"),
        };

        let mut crawler = CrawlerConfig::builder()
            .chrome_executable(var("CHROMIUM_PATH").map(PathBuf::from))
            .headless(parse_bool(var("HEADLESS"), "HEADLESS", true)?)
            .full_page_screenshot(parse_bool(var("FULL_PAGE_SCREENSHOT"), "FULL_PAGE_SCREENSHOT", false)?);
        if let Some(prefix) = var("STORAGE_KEY_PREFIX") {
            crawler = crawler.screenshot_key_prefix(prefix);
        }

        Ok(Self {
            bind_addr: parse_or(var("BIND_ADDR"), "BIND_ADDR", default_bind_addr())?,
            auth_secret: var("AUTH_SECRET"),
            llm,
            enrichment,
            storage,
            database_url: var("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            database_auth_token: var("DATABASE_AUTH_TOKEN"),
            crawler: crawler.build(),
        })
    }

    fn log_keys(&self) {
        fn preview(val: &str) -> String {
            let head: String = val.chars().take(5).collect();
            format!("{}...({} chars)", head, val.chars().count())
        }
        fn preview_opt(val: &Option<String>) -> String {
            match val {
                Some(v) => preview(v),
                None => "<not set>".to_string(),
            }
        }

        tracing::info!("Config loaded:");
        tracing::info!("  BIND_ADDR: {}", self.bind_addr);
        tracing::info!("  AUTH_SECRET: {}", preview_opt(&self.auth_secret));
        tracing::info!("  LLM_PROVIDER: {}", self.llm.provider);
        tracing::info!("  LLM_API_KEY: {}", preview(&self.llm.api_key));
        tracing::info!("  LLM_MODEL: {}", self.llm.model);
        tracing::info!("  STORAGE_ENDPOINT: {}", self.storage.endpoint);
        tracing::info!("  STORAGE_TOKEN: {}", preview_opt(&self.storage.token));
        tracing::info!("  DATABASE_URL: {}", self.database_url);
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8040))
}

fn parse_or<T: FromStr>(value: Option<String>, key: &str, default: T) -> Result<T> {
    match value {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| Error::Config(format!("{key} has an invalid value: {value}"))),
        None => Ok(default),
    }
}

fn parse_bool(value: Option<String>, key: &str, default: bool) -> Result<bool> {
    let Some(value) = value else {
        return Ok(default);
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(Error::Config(format!("{key} must be a boolean, got {value}"))),
    }
}
