use std::time::Duration;

use trogon_std::env::{ReadEnv, non_empty_var, parse_var_or};
use trogon_vault::ProviderTag;

const DEFAULT_MAX_TOKENS: u32 = 4096;
const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 300;
const INITIAL_BACKOFF: Duration = Duration::from_secs(1);

/// Base URL each provider is reached at unless overridden.
pub fn default_base_url(provider: ProviderTag) -> &'static str {
    match provider {
        ProviderTag::Anthropic => "https://api.anthropic.com",
        ProviderTag::OpenAi => "https://api.openai.com/v1",
        ProviderTag::Google => "https://generativelanguage.googleapis.com/v1beta",
        ProviderTag::OpenRouter => "https://openrouter.ai/api/v1",
    }
}

fn base_url_var(provider: ProviderTag) -> &'static str {
    match provider {
        ProviderTag::Anthropic => "ANTHROPIC_BASE_URL",
        ProviderTag::OpenAi => "OPENAI_BASE_URL",
        ProviderTag::Google => "GOOGLE_BASE_URL",
        ProviderTag::OpenRouter => "OPENROUTER_BASE_URL",
    }
}

/// Configuration for [`ModelRouter`](crate::ModelRouter).
///
/// Resolved from environment variables:
/// - `ANTHROPIC_BASE_URL`, `OPENAI_BASE_URL`, `GOOGLE_BASE_URL`,
///   `OPENROUTER_BASE_URL`: provider endpoints (default: the public APIs)
/// - `LLM_DEFAULT_MAX_TOKENS`: output cap when a request sets none (default: 4096)
/// - `LLM_RETRY_ATTEMPTS`: attempts on 429 / 5xx / transport errors (default: 3)
/// - `LLM_REQUEST_TIMEOUT_SECS`: per-attempt HTTP timeout (default: 300)
///
/// There are no API key variables: every call uses the calling tenant's key.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    anthropic_base_url: String,
    openai_base_url: String,
    google_base_url: String,
    openrouter_base_url: String,
    pub default_max_tokens: u32,
    pub retry_attempts: u32,
    pub request_timeout: Duration,
    pub initial_backoff: Duration,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            anthropic_base_url: default_base_url(ProviderTag::Anthropic).to_string(),
            openai_base_url: default_base_url(ProviderTag::OpenAi).to_string(),
            google_base_url: default_base_url(ProviderTag::Google).to_string(),
            openrouter_base_url: default_base_url(ProviderTag::OpenRouter).to_string(),
            default_max_tokens: DEFAULT_MAX_TOKENS,
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            initial_backoff: INITIAL_BACKOFF,
        }
    }
}

impl RouterConfig {
    pub fn from_env<E: ReadEnv>(env: &E) -> Self {
        let mut config = Self {
            default_max_tokens: parse_var_or(env, "LLM_DEFAULT_MAX_TOKENS", DEFAULT_MAX_TOKENS),
            retry_attempts: parse_var_or(env, "LLM_RETRY_ATTEMPTS", DEFAULT_RETRY_ATTEMPTS),
            request_timeout: Duration::from_secs(parse_var_or(
                env,
                "LLM_REQUEST_TIMEOUT_SECS",
                DEFAULT_REQUEST_TIMEOUT_SECS,
            )),
            ..Self::default()
        };
        for provider in ProviderTag::ALL {
            if let Some(url) = non_empty_var(env, base_url_var(provider)) {
                config = config.with_base_url(provider, url);
            }
        }
        config
    }

    pub fn base_url(&self, provider: ProviderTag) -> &str {
        match provider {
            ProviderTag::Anthropic => &self.anthropic_base_url,
            ProviderTag::OpenAi => &self.openai_base_url,
            ProviderTag::Google => &self.google_base_url,
            ProviderTag::OpenRouter => &self.openrouter_base_url,
        }
    }

    pub fn with_base_url(mut self, provider: ProviderTag, url: impl Into<String>) -> Self {
        let url = url.into();
        match provider {
            ProviderTag::Anthropic => self.anthropic_base_url = url,
            ProviderTag::OpenAi => self.openai_base_url = url,
            ProviderTag::Google => self.google_base_url = url,
            ProviderTag::OpenRouter => self.openrouter_base_url = url,
        }
        self
    }

    pub fn with_default_max_tokens(mut self, max_tokens: u32) -> Self {
        self.default_max_tokens = max_tokens;
        self
    }

    pub fn with_retry_attempts(mut self, attempts: u32) -> Self {
        self.retry_attempts = attempts;
        self
    }

    pub fn with_initial_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff = backoff;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}
