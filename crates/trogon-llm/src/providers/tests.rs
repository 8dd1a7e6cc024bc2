use std::time::Duration;

use futures::StreamExt;
use httpmock::prelude::*;
use serde_json::json;
use trogon_vault::{ApiKey, ProviderTag};

use super::*;
use crate::types::{FinishReason, LlmMessage, StreamPart, ToolDefinition, collect_stream};

const KEY: &str = "sk-tenant-secret-0001";

fn model(server: &MockServer, provider: ProviderTag, name: &str) -> ProviderModel {
    let config = RouterConfig::default()
        .with_base_url(provider, server.base_url())
        .with_initial_backoff(Duration::ZERO)
        .with_retry_attempts(2);
    ProviderModel::new(provider, name, ApiKey::new(KEY), reqwest::Client::new(), &config)
}

fn ask(text: &str) -> GenerateRequest {
    GenerateRequest {
        messages: vec![LlmMessage::user(text)],
        ..Default::default()
    }
}

#[tokio::test]
async fn anthropic_generate_sends_tenant_key_and_version() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/v1/messages")
            .header("x-api-key", KEY)
            .header("anthropic-version", "2023-06-01")
            .json_body_partial(r#"{"model":"claude-sonnet-4.5","max_tokens":4096,"stream":false}"#);
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({
                "content": [{"type": "text", "text": "Hello!"}],
                "stop_reason": "end_turn"
            }));
    });

    let generation = model(&server, ProviderTag::Anthropic, "claude-sonnet-4.5")
        .generate(&ask("hi"))
        .await
        .unwrap();
    assert_eq!(generation.text, "Hello!");
    assert_eq!(generation.finish_reason, FinishReason::Stop);
    mock.assert();
}

#[tokio::test]
async fn openai_uses_bearer_auth() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/chat/completions")
            .header("authorization", format!("Bearer {KEY}"))
            .json_body_partial(r#"{"model":"gpt-4.1-mini"}"#);
        then.status(200).json_body(json!({
            "choices": [{"message": {"content": "pong"}, "finish_reason": "stop"}]
        }));
    });

    let generation = model(&server, ProviderTag::OpenAi, "gpt-4.1-mini")
        .generate(&ask("ping"))
        .await
        .unwrap();
    assert_eq!(generation.text, "pong");
    mock.assert();
}

#[tokio::test]
async fn openrouter_passes_nested_model_name_verbatim() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/chat/completions")
            .json_body_partial(r#"{"model":"meta-llama/llama-4-maverick","max_tokens":4096}"#);
        then.status(200).json_body(json!({
            "choices": [{"message": {"content": "ok"}, "finish_reason": "stop"}]
        }));
    });

    model(&server, ProviderTag::OpenRouter, "meta-llama/llama-4-maverick")
        .generate(&ask("hi"))
        .await
        .unwrap();
    mock.assert();
}

#[tokio::test]
async fn google_key_goes_in_header_not_url() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/models/gemini-2.5-flash:generateContent")
            .header("x-goog-api-key", KEY);
        then.status(200).json_body(json!({
            "candidates": [{"content": {"parts": [{"text": "hola"}]}, "finishReason": "STOP"}]
        }));
    });

    let generation = model(&server, ProviderTag::Google, "gemini-2.5-flash")
        .generate(&ask("hi"))
        .await
        .unwrap();
    assert_eq!(generation.text, "hola");
    mock.assert();
}

#[tokio::test]
async fn tools_are_attached_in_native_format() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/v1/messages")
            .json_body_partial(r#"{"tools":[{"name":"queryMongo","input_schema":{"type":"object"}}]}"#);
        then.status(200).json_body(json!({
            "content": [{"type": "tool_use", "id": "toolu_1", "name": "queryMongo", "input": {"collection": "users"}}],
            "stop_reason": "tool_use"
        }));
    });

    let mut request = ask("count users");
    request.tools.push(ToolDefinition {
        name: "queryMongo".into(),
        description: "Query MongoDB".into(),
        input_schema: json!({"type": "object"}),
        needs_approval: true,
    });
    let generation = model(&server, ProviderTag::Anthropic, "claude-haiku-4.5")
        .generate(&request)
        .await
        .unwrap();
    assert_eq!(generation.tool_calls.len(), 1);
    assert_eq!(generation.finish_reason, FinishReason::ToolCalls);
    mock.assert();
}

#[tokio::test]
async fn retryable_status_is_retried_then_reported() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST).path("/chat/completions");
        then.status(503).json_body(json!({"error": {"message": "overloaded"}}));
    });

    let err = model(&server, ProviderTag::OpenAi, "gpt-4o")
        .generate(&ask("hi"))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        LlmError::Api {
            provider: ProviderTag::OpenAi,
            status: 503,
            message: "overloaded".into()
        }
    );
    mock.assert_hits(2);
}

#[tokio::test]
async fn client_error_is_not_retried_and_key_is_scrubbed() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST).path("/chat/completions");
        then.status(401).json_body(json!({
            "error": {"message": format!("Incorrect API key provided: {KEY}")}
        }));
    });

    let err = model(&server, ProviderTag::OpenAi, "gpt-4o")
        .generate(&ask("hi"))
        .await
        .unwrap_err();
    assert!(matches!(err, LlmError::Api { status: 401, .. }));
    assert!(!err.to_string().contains(KEY));
    mock.assert_hits(1);
}

#[tokio::test]
async fn anthropic_stream_yields_text_then_finish() {
    let server = MockServer::start();
    let sse = [
        r#"data: {"type":"message_start","message":{}}"#,
        r#"data: {"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"Hel"}}"#,
        r#"data: {"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"lo"}}"#,
        r#"data: {"type":"message_delta","delta":{"stop_reason":"end_turn"}}"#,
        r#"data: {"type":"message_stop"}"#,
    ]
    .join("\n\n");
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/v1/messages")
            .json_body_partial(r#"{"stream":true}"#);
        then.status(200).header("content-type", "text/event-stream").body(sse);
    });

    let stream = model(&server, ProviderTag::Anthropic, "claude-sonnet-4.5")
        .stream(&ask("hi"))
        .await
        .unwrap();
    let parts: Vec<StreamPart> = stream.map(|p| p.unwrap()).collect().await;
    assert_eq!(
        parts,
        vec![
            StreamPart::TextDelta { text: "Hel".into() },
            StreamPart::TextDelta { text: "lo".into() },
            StreamPart::Finish { reason: FinishReason::Stop },
        ]
    );
    mock.assert();
}

#[tokio::test]
async fn openai_stream_stops_at_done_sentinel() {
    let server = MockServer::start();
    let sse = [
        r#"data: {"choices":[{"index":0,"delta":{"content":"A"}}]}"#,
        r#"data: {"choices":[{"index":0,"delta":{},"finish_reason":"length"}]}"#,
        "data: [DONE]",
        r#"data: {"choices":[{"index":0,"delta":{"content":"ignored"}}]}"#,
    ]
    .join("\n\n");
    server.mock(|when, then| {
        when.method(POST).path("/chat/completions");
        then.status(200).body(sse);
    });

    let stream = model(&server, ProviderTag::OpenAi, "gpt-4o").stream(&ask("hi")).await.unwrap();
    let generation = collect_stream(stream).await.unwrap();
    assert_eq!(generation.text, "A");
    assert_eq!(generation.finish_reason, FinishReason::Length);
}

#[tokio::test]
async fn google_stream_uses_sse_endpoint() {
    let server = MockServer::start();
    let sse = [
        r#"data: {"candidates":[{"content":{"parts":[{"text":"Hi "}]}}]}"#,
        r#"data: {"candidates":[{"content":{"parts":[{"text":"there"}]},"finishReason":"STOP"}]}"#,
    ]
    .join("\r\n\r\n");
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/models/gemini-2.5-pro:streamGenerateContent")
            .query_param("alt", "sse")
            .header("x-goog-api-key", KEY);
        then.status(200).body(sse);
    });

    let stream = model(&server, ProviderTag::Google, "gemini-2.5-pro").stream(&ask("hi")).await.unwrap();
    let generation = collect_stream(stream).await.unwrap();
    assert_eq!(generation.text, "Hi there");
    mock.assert();
}
