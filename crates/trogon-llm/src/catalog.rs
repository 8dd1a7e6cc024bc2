//! Curated chat models offered to users.

use serde::Serialize;

pub const DEFAULT_CHAT_MODEL: &str = "openai/gpt-4.1-mini";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChatModel {
    pub id: &'static str,
    pub name: &'static str,
    /// Display group: a provider name, or `reasoning`.
    pub provider: &'static str,
    pub description: &'static str,
}

const fn model(
    id: &'static str,
    name: &'static str,
    provider: &'static str,
    description: &'static str,
) -> ChatModel {
    ChatModel { id, name, provider, description }
}

static CHAT_MODELS: &[ChatModel] = &[
    model("openai/gpt-4.1-mini", "GPT-4.1 Mini", "openai", "Fast and cost-effective for simple tasks"),
    model("openai/gpt-4.1", "GPT-4.1", "openai", "Flagship OpenAI model, great all-rounder"),
    model("openai/gpt-4o", "GPT-4o", "openai", "Fast multimodal model with vision support"),
    model(
        "anthropic/claude-haiku-4.5",
        "Claude Haiku 4.5",
        "anthropic",
        "Fast and affordable, great for everyday tasks",
    ),
    model(
        "anthropic/claude-sonnet-4.5",
        "Claude Sonnet 4.5",
        "anthropic",
        "Best balance of speed, intelligence, and cost",
    ),
    model("anthropic/claude-opus-4.5", "Claude Opus 4.5", "anthropic", "Most capable Anthropic model"),
    model("google/gemini-2.5-flash", "Gemini 2.5 Flash", "google", "Ultra fast and affordable"),
    model("google/gemini-2.5-pro", "Gemini 2.5 Pro", "google", "Most capable Google model"),
    model("openrouter/deepseek/deepseek-r1", "DeepSeek R1", "openrouter", "Strong reasoning model, open-source"),
    model(
        "openrouter/meta-llama/llama-4-maverick",
        "Llama 4 Maverick",
        "openrouter",
        "Meta's most capable open model",
    ),
    model("openrouter/mistralai/mistral-large-2411", "Mistral Large", "openrouter", "Mistral's flagship model"),
    model(
        "anthropic/claude-3.7-sonnet-thinking",
        "Claude 3.7 Sonnet",
        "reasoning",
        "Extended thinking for complex problems",
    ),
    model("openai/o4-mini", "o4-mini", "reasoning", "OpenAI reasoning model, fast and efficient"),
];

pub fn chat_models() -> &'static [ChatModel] {
    CHAT_MODELS
}

pub fn find(id: &str) -> Option<&'static ChatModel> {
    CHAT_MODELS.iter().find(|m| m.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model_id::ModelId;

    #[test]
    fn default_model_is_listed() {
        assert!(find(DEFAULT_CHAT_MODEL).is_some());
    }

    #[test]
    fn every_catalog_id_parses() {
        for m in chat_models() {
            ModelId::parse(m.id).unwrap_or_else(|e| panic!("{}: {e}", m.id));
        }
    }

    #[test]
    fn ids_are_unique() {
        let mut ids: Vec<_> = chat_models().iter().map(|m| m.id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), chat_models().len());
    }

    #[test]
    fn thinking_entry_resolves_to_reasoning_mode() {
        let id = ModelId::parse("anthropic/claude-3.7-sonnet-thinking").unwrap();
        assert!(id.reasoning());
        assert_eq!(find("anthropic/claude-3.7-sonnet-thinking").unwrap().provider, "reasoning");
    }
}
