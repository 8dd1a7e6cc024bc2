//! OpenAI chat completions, also spoken by OpenRouter.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Value, json};
use trogon_vault::ProviderTag;

use super::{output_text, parse_arguments};
use crate::error::LlmError;
use crate::sse::EventParser;
use crate::types::{FinishReason, GenerateRequest, Generation, LlmMessage, StreamPart, ToolCall};

pub(super) fn endpoint(base_url: &str) -> String {
    format!("{base_url}/chat/completions")
}

/// Where the output limit goes: OpenAI's reasoning models require
/// `max_completion_tokens`, OpenRouter still reads `max_tokens`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum TokenLimit {
    MaxTokens,
    MaxCompletionTokens,
}

#[derive(Serialize)]
pub(super) struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Value>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_completion_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ChatTool<'a>>,
}

#[derive(Serialize)]
struct ChatTool<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    function: FunctionSpec<'a>,
}

#[derive(Serialize)]
struct FunctionSpec<'a> {
    name: &'a str,
    description: &'a str,
    parameters: &'a Value,
}

pub(super) fn request_body<'a>(
    model: &'a str,
    request: &'a GenerateRequest,
    max_tokens: u32,
    stream: bool,
    limit: TokenLimit,
) -> ChatRequest<'a> {
    let mut messages: Vec<Value> = Vec::with_capacity(request.messages.len() + 1);
    if let Some(system) = &request.system {
        messages.push(json!({"role": "system", "content": system}));
    }
    messages.extend(request.messages.iter().map(wire_message));

    ChatRequest {
        model,
        messages,
        stream,
        max_tokens: (limit == TokenLimit::MaxTokens).then_some(max_tokens),
        max_completion_tokens: (limit == TokenLimit::MaxCompletionTokens).then_some(max_tokens),
        tools: request
            .tools
            .iter()
            .map(|t| ChatTool {
                kind: "function",
                function: FunctionSpec {
                    name: &t.name,
                    description: &t.description,
                    parameters: &t.input_schema,
                },
            })
            .collect(),
    }
}

fn wire_message(message: &LlmMessage) -> Value {
    match message {
        LlmMessage::User { content } => json!({"role": "user", "content": content}),
        LlmMessage::Assistant { content, tool_calls } if tool_calls.is_empty() => {
            json!({"role": "assistant", "content": content})
        }
        LlmMessage::Assistant { content, tool_calls } => {
            let calls: Vec<Value> = tool_calls
                .iter()
                .map(|call| {
                    json!({
                        "id": call.id,
                        "type": "function",
                        "function": {"name": call.name, "arguments": call.input.to_string()},
                    })
                })
                .collect();
            let content = if content.is_empty() { Value::Null } else { json!(content) };
            json!({"role": "assistant", "content": content, "tool_calls": calls})
        }
        LlmMessage::Tool { call_id, output, .. } => {
            json!({"role": "tool", "tool_call_id": call_id, "content": output_text(output)})
        }
    }
}

fn finish_reason(reason: Option<&str>) -> FinishReason {
    match reason {
        Some("stop") | None => FinishReason::Stop,
        Some("length") => FinishReason::Length,
        Some("tool_calls" | "function_call") => FinishReason::ToolCalls,
        Some("content_filter") => FinishReason::ContentFilter,
        Some(_) => FinishReason::Other,
    }
}

/// Native reasoning text: OpenRouter uses `reasoning`, some upstreams
/// `reasoning_content`.
fn reasoning_field(message: &Value) -> Option<&str> {
    message["reasoning"]
        .as_str()
        .or_else(|| message["reasoning_content"].as_str())
        .filter(|s| !s.is_empty())
}

pub(super) fn parse_response(body: &Value) -> Result<Generation, String> {
    let choice = body["choices"]
        .get(0)
        .ok_or_else(|| "response has no choices".to_string())?;
    let message = &choice["message"];

    let mut tool_calls = Vec::new();
    for call in message["tool_calls"].as_array().into_iter().flatten() {
        let id = call["id"].as_str().ok_or("tool call missing id")?;
        let name = call["function"]["name"].as_str().ok_or("tool call missing name")?;
        tool_calls.push(ToolCall {
            id: id.to_string(),
            name: name.to_string(),
            input: parse_arguments(call["function"]["arguments"].as_str().unwrap_or_default()),
        });
    }

    Ok(Generation {
        text: message["content"].as_str().unwrap_or_default().to_string(),
        reasoning: reasoning_field(message).map(str::to_string),
        tool_calls,
        finish_reason: finish_reason(choice["finish_reason"].as_str()),
    })
}

#[derive(Default)]
struct ToolCallState {
    id: String,
    name: String,
    arguments: String,
}

/// Accumulates streamed tool-call fragments by index; calls are emitted once
/// the stream finishes.
pub(super) struct StreamParser {
    provider: ProviderTag,
    tools: BTreeMap<u64, ToolCallState>,
    finish: Option<String>,
}

impl StreamParser {
    pub(super) fn new(provider: ProviderTag) -> Self {
        Self {
            provider,
            tools: BTreeMap::new(),
            finish: None,
        }
    }
}

impl EventParser for StreamParser {
    fn on_data(&mut self, data: &str) -> Result<Vec<StreamPart>, LlmError> {
        let Ok(chunk) = serde_json::from_str::<Value>(data) else {
            return Ok(Vec::new());
        };
        if let Some(message) = chunk["error"]["message"].as_str() {
            return Err(LlmError::Stream {
                provider: self.provider,
                message: message.to_string(),
            });
        }

        let mut parts = Vec::new();
        let Some(choice) = chunk["choices"].get(0) else {
            return Ok(parts);
        };
        let delta = &choice["delta"];

        if let Some(text) = reasoning_field(delta) {
            parts.push(StreamPart::ReasoningDelta { text: text.to_string() });
        }
        if let Some(text) = delta["content"].as_str().filter(|s| !s.is_empty()) {
            parts.push(StreamPart::TextDelta { text: text.to_string() });
        }
        for fragment in delta["tool_calls"].as_array().into_iter().flatten() {
            let index = fragment["index"].as_u64().unwrap_or_default();
            let state = self.tools.entry(index).or_default();
            if let Some(id) = fragment["id"].as_str() {
                state.id = id.to_string();
            }
            if let Some(name) = fragment["function"]["name"].as_str() {
                state.name.push_str(name);
            }
            if let Some(arguments) = fragment["function"]["arguments"].as_str() {
                state.arguments.push_str(arguments);
            }
        }
        if let Some(reason) = choice["finish_reason"].as_str() {
            self.finish = Some(reason.to_string());
        }
        Ok(parts)
    }

    fn finish(&mut self) -> Vec<StreamPart> {
        let mut parts: Vec<StreamPart> = std::mem::take(&mut self.tools)
            .into_values()
            .filter(|state| !state.name.is_empty())
            .map(|state| StreamPart::ToolCall {
                call: ToolCall {
                    id: state.id,
                    name: state.name,
                    input: parse_arguments(&state.arguments),
                },
            })
            .collect();
        parts.push(StreamPart::Finish {
            reason: finish_reason(self.finish.as_deref()),
        });
        parts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openai_uses_max_completion_tokens() {
        let request = GenerateRequest {
            system: Some("sys".into()),
            messages: vec![LlmMessage::user("hi")],
            ..Default::default()
        };
        let body =
            serde_json::to_value(request_body("o4-mini", &request, 2048, false, TokenLimit::MaxCompletionTokens))
                .unwrap();
        assert_eq!(body["max_completion_tokens"], 2048);
        assert!(body.get("max_tokens").is_none());
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "hi");
        assert!(body.get("tools").is_none());
    }

    #[test]
    fn tool_turns_use_function_format() {
        let call = ToolCall {
            id: "call_1".into(),
            name: "queryMongo".into(),
            input: json!({"collection": "users"}),
        };
        let assistant = wire_message(&LlmMessage::Assistant {
            content: String::new(),
            tool_calls: vec![call],
        });
        assert_eq!(assistant["content"], Value::Null);
        assert_eq!(assistant["tool_calls"][0]["function"]["arguments"], "{\"collection\":\"users\"}");

        let tool = wire_message(&LlmMessage::Tool {
            call_id: "call_1".into(),
            name: "queryMongo".into(),
            output: json!({"count": 0}),
        });
        assert_eq!(tool["role"], "tool");
        assert_eq!(tool["tool_call_id"], "call_1");
    }

    #[test]
    fn parse_response_reads_tool_calls_and_reasoning() {
        let body = json!({
            "choices": [{
                "message": {
                    "content": null,
                    "reasoning": "need data",
                    "tool_calls": [{
                        "id": "call_7",
                        "type": "function",
                        "function": {"name": "queryMongo", "arguments": "{\"collection\":\"orders\"}"}
                    }]
                },
                "finish_reason": "tool_calls"
            }]
        });
        let generation = parse_response(&body).unwrap();
        assert_eq!(generation.text, "");
        assert_eq!(generation.reasoning.as_deref(), Some("need data"));
        assert_eq!(generation.tool_calls[0].input["collection"], "orders");
        assert_eq!(generation.finish_reason, FinishReason::ToolCalls);
    }

    #[test]
    fn parse_response_without_choices_fails() {
        assert!(parse_response(&json!({"choices": []})).is_err());
    }

    #[test]
    fn stream_parser_merges_tool_fragments() {
        let mut parser = StreamParser::new(ProviderTag::OpenAi);
        let chunks = [
            r#"{"choices":[{"index":0,"delta":{"tool_calls":[{"index":0,"id":"call_1","function":{"name":"queryMongo","arguments":""}}]}}]}"#,
            r#"{"choices":[{"index":0,"delta":{"tool_calls":[{"index":0,"function":{"arguments":"{\"collection\""}}]}}]}"#,
            r#"{"choices":[{"index":0,"delta":{"tool_calls":[{"index":0,"function":{"arguments":":\"users\"}"}}]}}]}"#,
            r#"{"choices":[{"index":0,"delta":{},"finish_reason":"tool_calls"}]}"#,
        ];
        for chunk in chunks {
            assert!(parser.on_data(chunk).unwrap().is_empty());
        }
        let parts = parser.finish();
        assert_eq!(
            parts,
            vec![
                StreamPart::ToolCall {
                    call: ToolCall {
                        id: "call_1".into(),
                        name: "queryMongo".into(),
                        input: json!({"collection": "users"}),
                    }
                },
                StreamPart::Finish { reason: FinishReason::ToolCalls },
            ]
        );
    }

    #[test]
    fn stream_parser_emits_text_deltas() {
        let mut parser = StreamParser::new(ProviderTag::OpenRouter);
        let parts = parser
            .on_data(r#"{"choices":[{"index":0,"delta":{"content":"Hel"}}]}"#)
            .unwrap();
        assert_eq!(parts, vec![StreamPart::TextDelta { text: "Hel".into() }]);
    }
}
