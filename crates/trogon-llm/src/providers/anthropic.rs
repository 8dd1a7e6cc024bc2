//! Anthropic Messages API.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Value, json};
use trogon_vault::ProviderTag;

use super::{output_text, parse_arguments};
use crate::error::LlmError;
use crate::sse::EventParser;
use crate::types::{FinishReason, GenerateRequest, Generation, LlmMessage, StreamPart, ToolCall};

pub(super) const API_VERSION: &str = "2023-06-01";

pub(super) fn endpoint(base_url: &str) -> String {
    format!("{base_url}/v1/messages")
}

#[derive(Serialize)]
pub(super) struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Value>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ToolSpec<'a>>,
}

#[derive(Serialize)]
struct ToolSpec<'a> {
    name: &'a str,
    description: &'a str,
    input_schema: &'a Value,
}

pub(super) fn request_body<'a>(
    model: &'a str,
    request: &'a GenerateRequest,
    max_tokens: u32,
    stream: bool,
) -> MessagesRequest<'a> {
    MessagesRequest {
        model,
        max_tokens,
        messages: wire_messages(&request.messages),
        stream,
        system: request.system.as_deref(),
        tools: request
            .tools
            .iter()
            .map(|t| ToolSpec {
                name: &t.name,
                description: &t.description,
                input_schema: &t.input_schema,
            })
            .collect(),
    }
}

/// Consecutive tool results are merged into one user turn, as the API
/// requires every `tool_use` to be answered in the next message.
fn wire_messages(messages: &[LlmMessage]) -> Vec<Value> {
    let mut wire: Vec<Value> = Vec::with_capacity(messages.len());
    for message in messages {
        match message {
            LlmMessage::User { content } => wire.push(json!({"role": "user", "content": content})),
            LlmMessage::Assistant { content, tool_calls } if tool_calls.is_empty() => {
                wire.push(json!({"role": "assistant", "content": content}))
            }
            LlmMessage::Assistant { content, tool_calls } => {
                let mut blocks = Vec::new();
                if !content.is_empty() {
                    blocks.push(json!({"type": "text", "text": content}));
                }
                blocks.extend(tool_calls.iter().map(|call| {
                    json!({"type": "tool_use", "id": call.id, "name": call.name, "input": call.input})
                }));
                wire.push(json!({"role": "assistant", "content": blocks}));
            }
            LlmMessage::Tool { call_id, output, .. } => {
                let block = json!({
                    "type": "tool_result",
                    "tool_use_id": call_id,
                    "content": output_text(output),
                });
                match wire.last_mut() {
                    Some(last) if is_tool_result_turn(last) => {
                        if let Some(blocks) = last["content"].as_array_mut() {
                            blocks.push(block);
                        }
                    }
                    _ => wire.push(json!({"role": "user", "content": [block]})),
                }
            }
        }
    }
    wire
}

fn is_tool_result_turn(message: &Value) -> bool {
    message["role"] == "user"
        && message["content"]
            .as_array()
            .and_then(|blocks| blocks.first())
            .is_some_and(|b| b["type"] == "tool_result")
}

fn finish_reason(stop_reason: Option<&str>) -> FinishReason {
    match stop_reason {
        Some("end_turn" | "stop_sequence") | None => FinishReason::Stop,
        Some("max_tokens") => FinishReason::Length,
        Some("tool_use") => FinishReason::ToolCalls,
        Some("refusal") => FinishReason::ContentFilter,
        Some(_) => FinishReason::Other,
    }
}

pub(super) fn parse_response(body: &Value) -> Result<Generation, String> {
    let blocks = body["content"]
        .as_array()
        .ok_or_else(|| "response has no content array".to_string())?;

    let mut generation = Generation {
        finish_reason: finish_reason(body["stop_reason"].as_str()),
        ..Generation::default()
    };
    let mut reasoning = String::new();
    for block in blocks {
        match block["type"].as_str() {
            Some("text") => generation.text.push_str(block["text"].as_str().unwrap_or_default()),
            Some("thinking") => reasoning.push_str(block["thinking"].as_str().unwrap_or_default()),
            Some("tool_use") => {
                let id = block["id"].as_str().ok_or("tool_use block missing id")?;
                let name = block["name"].as_str().ok_or("tool_use block missing name")?;
                generation.tool_calls.push(ToolCall {
                    id: id.to_string(),
                    name: name.to_string(),
                    input: block["input"].clone(),
                });
            }
            _ => {}
        }
    }
    if !reasoning.is_empty() {
        generation.reasoning = Some(reasoning);
    }
    Ok(generation)
}

#[derive(Default)]
struct PendingToolUse {
    id: String,
    name: String,
    json: String,
}

/// Tracks open `tool_use` blocks by content index until `content_block_stop`.
pub(super) struct StreamParser {
    provider: ProviderTag,
    tools: BTreeMap<u64, PendingToolUse>,
    stop_reason: Option<String>,
}

impl StreamParser {
    pub(super) fn new(provider: ProviderTag) -> Self {
        Self {
            provider,
            tools: BTreeMap::new(),
            stop_reason: None,
        }
    }

    fn complete(tool: PendingToolUse) -> StreamPart {
        StreamPart::ToolCall {
            call: ToolCall {
                id: tool.id,
                name: tool.name,
                input: parse_arguments(&tool.json),
            },
        }
    }
}

impl EventParser for StreamParser {
    fn on_data(&mut self, data: &str) -> Result<Vec<StreamPart>, LlmError> {
        let Ok(ev) = serde_json::from_str::<Value>(data) else {
            return Ok(Vec::new());
        };
        let index = ev["index"].as_u64().unwrap_or_default();

        match ev["type"].as_str() {
            Some("content_block_start") if ev["content_block"]["type"] == "tool_use" => {
                let block = &ev["content_block"];
                self.tools.insert(
                    index,
                    PendingToolUse {
                        id: block["id"].as_str().unwrap_or_default().to_string(),
                        name: block["name"].as_str().unwrap_or_default().to_string(),
                        json: String::new(),
                    },
                );
            }
            Some("content_block_delta") => {
                let delta = &ev["delta"];
                match delta["type"].as_str() {
                    Some("text_delta") => {
                        if let Some(text) = delta["text"].as_str().filter(|s| !s.is_empty()) {
                            return Ok(vec![StreamPart::TextDelta { text: text.to_string() }]);
                        }
                    }
                    Some("thinking_delta") => {
                        if let Some(text) = delta["thinking"].as_str().filter(|s| !s.is_empty()) {
                            return Ok(vec![StreamPart::ReasoningDelta { text: text.to_string() }]);
                        }
                    }
                    Some("input_json_delta") => {
                        if let Some(tool) = self.tools.get_mut(&index) {
                            tool.json.push_str(delta["partial_json"].as_str().unwrap_or_default());
                        }
                    }
                    _ => {}
                }
            }
            Some("content_block_stop") => {
                if let Some(tool) = self.tools.remove(&index) {
                    return Ok(vec![Self::complete(tool)]);
                }
            }
            Some("message_delta") => {
                if let Some(reason) = ev["delta"]["stop_reason"].as_str() {
                    self.stop_reason = Some(reason.to_string());
                }
            }
            Some("error") => {
                return Err(LlmError::Stream {
                    provider: self.provider,
                    message: ev["error"]["message"].as_str().unwrap_or("stream error").to_string(),
                });
            }
            _ => {}
        }
        Ok(Vec::new())
    }

    fn finish(&mut self) -> Vec<StreamPart> {
        let mut parts: Vec<StreamPart> = std::mem::take(&mut self.tools)
            .into_values()
            .map(Self::complete)
            .collect();
        parts.push(StreamPart::Finish {
            reason: finish_reason(self.stop_reason.as_deref()),
        });
        parts
    }
}
