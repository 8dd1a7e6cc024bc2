use std::pin::Pin;

use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};

use crate::error::LlmError;

/// One conversation turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum LlmMessage {
    User {
        content: String,
    },
    Assistant {
        #[serde(default)]
        content: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCall>,
    },
    /// The result of executing a tool call, fed back to the model.
    Tool {
        call_id: String,
        name: String,
        output: serde_json::Value,
    },
}

impl LlmMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self::User { content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::Assistant {
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }
}

/// A tool the model may call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON Schema for the tool's input object.
    pub input_schema: serde_json::Value,
    /// Calls to this tool must be approved by a human before they run.
    #[serde(default)]
    pub needs_approval: bool,
}

/// A tool call proposed by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub input: serde_json::Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerateRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    pub messages: Vec<LlmMessage>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,
    /// Falls back to the router's configured default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    #[default]
    Stop,
    Length,
    ToolCalls,
    ContentFilter,
    Other,
}

/// A complete model response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Generation {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    pub finish_reason: FinishReason,
}

/// Incremental output of a streaming call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamPart {
    TextDelta { text: String },
    ReasoningDelta { text: String },
    /// Emitted once the call's arguments are complete.
    ToolCall { call: ToolCall },
    Finish { reason: FinishReason },
}

pub type TokenStream = Pin<Box<dyn Stream<Item = Result<StreamPart, LlmError>> + Send>>;

/// Drain a stream into a [`Generation`].
///
/// Reasoning deltas are concatenated as they arrive; an absent `Finish` part
/// leaves the reason at [`FinishReason::Stop`].
pub async fn collect_stream(mut stream: TokenStream) -> Result<Generation, LlmError> {
    let mut generation = Generation::default();
    let mut reasoning = String::new();
    while let Some(part) = stream.next().await {
        match part? {
            StreamPart::TextDelta { text } => generation.text.push_str(&text),
            StreamPart::ReasoningDelta { text } => reasoning.push_str(&text),
            StreamPart::ToolCall { call } => generation.tool_calls.push(call),
            StreamPart::Finish { reason } => generation.finish_reason = reason,
        }
    }
    if !reasoning.is_empty() {
        generation.reasoning = Some(reasoning);
    }
    Ok(generation)
}
