//! Google Gemini `generateContent`.
//!
//! The key travels in the `x-goog-api-key` header so it never appears in a
//! URL, and so never in transport error messages.

use serde::Serialize;
use serde_json::{Value, json};
use trogon_vault::ProviderTag;

use crate::error::LlmError;
use crate::sse::EventParser;
use crate::types::{FinishReason, GenerateRequest, Generation, LlmMessage, StreamPart, ToolCall};

pub(super) fn endpoint(base_url: &str, model: &str, stream: bool) -> String {
    if stream {
        format!("{base_url}/models/{model}:streamGenerateContent?alt=sse")
    } else {
        format!("{base_url}/models/{model}:generateContent")
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct GenerateContentRequest<'a> {
    contents: Vec<Value>,
    generation_config: GenerationConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<SystemInstruction<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ToolGroup<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
}

#[derive(Serialize)]
struct SystemInstruction<'a> {
    parts: [TextPart<'a>; 1],
}

#[derive(Serialize)]
struct TextPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ToolGroup<'a> {
    function_declarations: Vec<FunctionDeclaration<'a>>,
}

#[derive(Serialize)]
struct FunctionDeclaration<'a> {
    name: &'a str,
    description: &'a str,
    parameters: &'a Value,
}

pub(super) fn request_body(request: &GenerateRequest, max_tokens: u32) -> GenerateContentRequest<'_> {
    let tools = if request.tools.is_empty() {
        Vec::new()
    } else {
        vec![ToolGroup {
            function_declarations: request
                .tools
                .iter()
                .map(|t| FunctionDeclaration {
                    name: &t.name,
                    description: &t.description,
                    parameters: &t.input_schema,
                })
                .collect(),
        }]
    };

    GenerateContentRequest {
        contents: contents(&request.messages),
        generation_config: GenerationConfig {
            max_output_tokens: max_tokens,
        },
        system_instruction: request.system.as_deref().map(|text| SystemInstruction {
            parts: [TextPart { text }],
        }),
        tools,
    }
}

/// Gemini roles are `user` and `model`; function responses ride in a user
/// turn and consecutive ones are merged.
fn contents(messages: &[LlmMessage]) -> Vec<Value> {
    let mut contents: Vec<Value> = Vec::with_capacity(messages.len());
    for message in messages {
        match message {
            LlmMessage::User { content } => {
                contents.push(json!({"role": "user", "parts": [{"text": content}]}));
            }
            LlmMessage::Assistant { content, tool_calls } => {
                let mut parts = Vec::new();
                if !content.is_empty() {
                    parts.push(json!({"text": content}));
                }
                parts.extend(
                    tool_calls
                        .iter()
                        .map(|call| json!({"functionCall": {"name": call.name, "args": call.input}})),
                );
                contents.push(json!({"role": "model", "parts": parts}));
            }
            LlmMessage::Tool { name, output, .. } => {
                let response = if output.is_object() {
                    output.clone()
                } else {
                    json!({"content": output})
                };
                let part = json!({"functionResponse": {"name": name, "response": response}});
                match contents.last_mut() {
                    Some(last) if is_function_response_turn(last) => {
                        if let Some(parts) = last["parts"].as_array_mut() {
                            parts.push(part);
                        }
                    }
                    _ => contents.push(json!({"role": "user", "parts": [part]})),
                }
            }
        }
    }
    contents
}

fn is_function_response_turn(content: &Value) -> bool {
    content["role"] == "user"
        && content["parts"]
            .as_array()
            .and_then(|parts| parts.first())
            .is_some_and(|p| p.get("functionResponse").is_some())
}

fn finish_reason(reason: Option<&str>, has_tool_calls: bool) -> FinishReason {
    if has_tool_calls {
        return FinishReason::ToolCalls;
    }
    match reason {
        Some("STOP") | None => FinishReason::Stop,
        Some("MAX_TOKENS") => FinishReason::Length,
        Some("SAFETY" | "RECITATION" | "BLOCKLIST" | "PROHIBITED_CONTENT" | "SPII") => {
            FinishReason::ContentFilter
        }
        Some(_) => FinishReason::Other,
    }
}

/// Gemini function calls carry no id; one is derived from the name and the
/// call's position in the response.
fn call_id(name: &str, ordinal: usize) -> String {
    format!("{name}-{ordinal}")
}

enum Piece {
    Text(String),
    Thought(String),
    Call(ToolCall),
}

fn pieces(candidate: &Value, calls_seen: &mut usize) -> Vec<Piece> {
    let mut out = Vec::new();
    for part in candidate["content"]["parts"].as_array().into_iter().flatten() {
        if let Some(call) = part.get("functionCall") {
            let name = call["name"].as_str().unwrap_or_default().to_string();
            *calls_seen += 1;
            out.push(Piece::Call(ToolCall {
                id: call_id(&name, *calls_seen),
                name,
                input: call.get("args").cloned().unwrap_or_else(|| json!({})),
            }));
        } else if let Some(text) = part["text"].as_str().filter(|s| !s.is_empty()) {
            if part["thought"].as_bool() == Some(true) {
                out.push(Piece::Thought(text.to_string()));
            } else {
                out.push(Piece::Text(text.to_string()));
            }
        }
    }
    out
}

pub(super) fn parse_response(body: &Value) -> Result<Generation, String> {
    let candidate = body["candidates"].get(0).ok_or_else(|| {
        match body["promptFeedback"]["blockReason"].as_str() {
            Some(reason) => format!("prompt blocked: {reason}"),
            None => "response has no candidates".to_string(),
        }
    })?;

    let mut generation = Generation::default();
    let mut reasoning = String::new();
    let mut calls_seen = 0;
    for piece in pieces(candidate, &mut calls_seen) {
        match piece {
            Piece::Text(text) => generation.text.push_str(&text),
            Piece::Thought(text) => reasoning.push_str(&text),
            Piece::Call(call) => generation.tool_calls.push(call),
        }
    }
    generation.finish_reason =
        finish_reason(candidate["finishReason"].as_str(), !generation.tool_calls.is_empty());
    if !reasoning.is_empty() {
        generation.reasoning = Some(reasoning);
    }
    Ok(generation)
}

/// Each SSE event is a full `GenerateContentResponse` chunk; there is no
/// `[DONE]` sentinel, the stream ends with the HTTP response.
pub(super) struct StreamParser {
    provider: ProviderTag,
    calls_seen: usize,
    finish: Option<String>,
}

impl StreamParser {
    pub(super) fn new(provider: ProviderTag) -> Self {
        Self {
            provider,
            calls_seen: 0,
            finish: None,
        }
    }
}

impl EventParser for StreamParser {
    fn on_data(&mut self, data: &str) -> Result<Vec<StreamPart>, LlmError> {
        let Ok(ev) = serde_json::from_str::<Value>(data) else {
            return Ok(Vec::new());
        };
        if let Some(message) = ev["error"]["message"].as_str() {
            return Err(LlmError::Stream {
                provider: self.provider,
                message: message.to_string(),
            });
        }
        let Some(candidate) = ev["candidates"].get(0) else {
            return Ok(Vec::new());
        };
        if let Some(reason) = candidate["finishReason"].as_str() {
            self.finish = Some(reason.to_string());
        }
        Ok(pieces(candidate, &mut self.calls_seen)
            .into_iter()
            .map(|piece| match piece {
                Piece::Text(text) => StreamPart::TextDelta { text },
                Piece::Thought(text) => StreamPart::ReasoningDelta { text },
                Piece::Call(call) => StreamPart::ToolCall { call },
            })
            .collect())
    }

    fn finish(&mut self) -> Vec<StreamPart> {
        vec![StreamPart::Finish {
            reason: finish_reason(self.finish.as_deref(), self.calls_seen > 0),
        }]
    }
}
