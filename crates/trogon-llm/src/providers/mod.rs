//! HTTP backends, one module per wire format.
//!
//! OpenRouter speaks the OpenAI chat-completions format and shares its module.

mod anthropic;
mod google;
mod openai;

use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};
use trogon_vault::{ApiKey, ProviderTag};

use crate::config::RouterConfig;
use crate::error::{LlmError, sanitize_upstream};
use crate::handle::LanguageModel;
use crate::sse::event_stream;
use crate::types::{GenerateRequest, Generation, TokenStream};
use openai::TokenLimit;

/// Wire body for one request, in the provider's own format.
#[derive(Serialize)]
#[serde(untagged)]
enum RequestBody<'a> {
    Messages(anthropic::MessagesRequest<'a>),
    Chat(openai::ChatRequest<'a>),
    GenerateContent(google::GenerateContentRequest<'a>),
}

/// A provider model bound to one tenant's API key.
pub struct ProviderModel {
    provider: ProviderTag,
    model: String,
    base_url: String,
    api_key: ApiKey,
    http: reqwest::Client,
    default_max_tokens: u32,
    retry_attempts: u32,
    initial_backoff: Duration,
    request_timeout: Duration,
}

impl ProviderModel {
    pub fn new(
        provider: ProviderTag,
        model: impl Into<String>,
        api_key: ApiKey,
        http: reqwest::Client,
        config: &RouterConfig,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            base_url: config.base_url(provider).trim_end_matches('/').to_string(),
            api_key,
            http,
            default_max_tokens: config.default_max_tokens,
            retry_attempts: config.retry_attempts,
            initial_backoff: config.initial_backoff,
            request_timeout: config.request_timeout,
        }
    }

    pub fn provider(&self) -> ProviderTag {
        self.provider
    }

    fn max_tokens(&self, request: &GenerateRequest) -> u32 {
        request.max_tokens.filter(|n| *n > 0).unwrap_or(self.default_max_tokens)
    }

    fn endpoint(&self, stream: bool) -> String {
        match self.provider {
            ProviderTag::Anthropic => anthropic::endpoint(&self.base_url),
            ProviderTag::OpenAi | ProviderTag::OpenRouter => openai::endpoint(&self.base_url),
            ProviderTag::Google => google::endpoint(&self.base_url, &self.model, stream),
        }
    }

    fn body<'a>(&'a self, request: &'a GenerateRequest, stream: bool) -> RequestBody<'a> {
        let max_tokens = self.max_tokens(request);
        match self.provider {
            ProviderTag::Anthropic => {
                RequestBody::Messages(anthropic::request_body(&self.model, request, max_tokens, stream))
            }
            ProviderTag::OpenAi => RequestBody::Chat(openai::request_body(
                &self.model,
                request,
                max_tokens,
                stream,
                TokenLimit::MaxCompletionTokens,
            )),
            ProviderTag::OpenRouter => RequestBody::Chat(openai::request_body(
                &self.model,
                request,
                max_tokens,
                stream,
                TokenLimit::MaxTokens,
            )),
            ProviderTag::Google => RequestBody::GenerateContent(google::request_body(request, max_tokens)),
        }
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let key = self.api_key.expose();
        match self.provider {
            ProviderTag::Anthropic => builder
                .header("x-api-key", key)
                .header("anthropic-version", anthropic::API_VERSION),
            ProviderTag::OpenAi | ProviderTag::OpenRouter => builder.bearer_auth(key),
            ProviderTag::Google => builder.header("x-goog-api-key", key),
        }
    }

    /// POST with retries on 429, 5xx and transport errors, doubling the
    /// delay from `initial_backoff`.
    async fn send_with_retry(&self, stream: bool, body: &RequestBody<'_>) -> Result<reqwest::Response, LlmError> {
        let url = self.endpoint(stream);
        let body_bytes = serde_json::to_vec(body).map_err(|e| LlmError::Decode {
            provider: self.provider,
            message: format!("serialize error: {e}"),
        })?;
        let attempts = self.retry_attempts.max(1);
        let mut delay = self.initial_backoff;
        let mut attempt = 0;

        loop {
            attempt += 1;
            let result = self
                .authorize(self.http.post(&url))
                .header("content-type", "application/json")
                .timeout(self.request_timeout)
                .body(body_bytes.clone())
                .send()
                .await;

            let err = match result {
                Ok(resp) if resp.status().is_success() => return Ok(resp),
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    let text = resp.text().await.unwrap_or_default();
                    let err = LlmError::Api {
                        provider: self.provider,
                        status,
                        message: self.upstream_message(&text),
                    };
                    if !LlmError::is_retryable_status(status) {
                        return Err(err);
                    }
                    err
                }
                Err(e) => LlmError::Transport {
                    provider: self.provider,
                    message: sanitize_upstream(&e.to_string(), self.api_key.expose()),
                },
            };

            if attempt >= attempts {
                return Err(err);
            }
            warn!(
                provider = %self.provider,
                model = %self.model,
                attempt,
                retry_in = ?delay,
                error = %err,
                "Provider request failed, retrying"
            );
            tokio::time::sleep(delay).await;
            delay *= 2;
        }
    }

    /// The provider's `error.message`, or the trimmed body when there is none.
    fn upstream_message(&self, body: &str) -> String {
        let parsed: Option<Value> = serde_json::from_str(body).ok();
        let error = parsed.as_ref().map(|v| match v {
            Value::Array(items) => items.first().unwrap_or(&Value::Null),
            other => other,
        });
        let message = error
            .and_then(|v| v["error"]["message"].as_str().or_else(|| v["message"].as_str()))
            .unwrap_or(body.trim());
        sanitize_upstream(message, self.api_key.expose())
    }

    fn decode_error(&self, message: impl std::fmt::Display) -> LlmError {
        LlmError::Decode {
            provider: self.provider,
            message: message.to_string(),
        }
    }
}

impl LanguageModel for ProviderModel {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: &GenerateRequest) -> Result<Generation, LlmError> {
        debug!(provider = %self.provider, model = %self.model, "Calling provider");
        let response = self.send_with_retry(false, &self.body(request, false)).await?;
        let body: Value = response.json().await.map_err(|e| self.decode_error(e))?;
        match self.provider {
            ProviderTag::Anthropic => anthropic::parse_response(&body),
            ProviderTag::OpenAi | ProviderTag::OpenRouter => openai::parse_response(&body),
            ProviderTag::Google => google::parse_response(&body),
        }
        .map_err(|message| self.decode_error(message))
    }

    async fn stream(&self, request: &GenerateRequest) -> Result<TokenStream, LlmError> {
        debug!(provider = %self.provider, model = %self.model, "Streaming from provider");
        let response = self.send_with_retry(true, &self.body(request, true)).await?;
        let provider = self.provider;
        Ok(match provider {
            ProviderTag::Anthropic => event_stream(provider, response, anthropic::StreamParser::new(provider)),
            ProviderTag::OpenAi | ProviderTag::OpenRouter => {
                event_stream(provider, response, openai::StreamParser::new(provider))
            }
            ProviderTag::Google => event_stream(provider, response, google::StreamParser::new(provider)),
        })
    }
}

impl std::fmt::Debug for ProviderModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderModel")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key)
            .finish_non_exhaustive()
    }
}

/// Parse tool-call arguments that arrive as a JSON string. Unparsable text is
/// kept as a string so the tool can report it.
pub(crate) fn parse_arguments(raw: &str) -> Value {
    if raw.trim().is_empty() {
        return Value::Object(Default::default());
    }
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// Tool output as text, for providers that take strings.
pub(crate) fn output_text(output: &Value) -> String {
    match output {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests;
