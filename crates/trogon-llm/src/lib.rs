//! Model routing for tenant-scoped agents.
//!
//! A compound model identifier such as `anthropic/claude-sonnet-4.5` or
//! `openrouter/deepseek/deepseek-r1` is resolved against one tenant's
//! decrypted credentials into a [`ModelHandle`]. The handle talks to the
//! provider with that tenant's key and nothing else.
//!
//! Identifiers whose native name ends in `-thinking` or contains `reasoning`
//! are resolved to the base model and wrapped in [`ReasoningModel`], which
//! splits `<thinking>…</thinking>` content out of the visible text for both
//! one-shot and streaming calls.
//!
//! ```text
//! "anthropic/claude-3.7-sonnet-thinking"
//!     │ ModelId::parse
//!     ▼
//! provider = anthropic, native = "claude-3.7-sonnet", reasoning = true
//!     │ ModelRouter::resolve(…, &TenantCredentials)
//!     ▼
//! ModelHandle { tenant, ReasoningModel<ProviderModel> }
//! ```

pub mod catalog;
pub mod config;
pub mod error;
pub mod handle;
pub mod model_id;
pub mod providers;
pub mod reasoning;
pub mod router;
pub mod types;

mod sse;

pub use catalog::{ChatModel, DEFAULT_CHAT_MODEL, chat_models};
pub use config::RouterConfig;
pub use error::{LlmError, RouterError};
pub use handle::{LanguageModel, ModelHandle};
pub use model_id::ModelId;
pub use providers::ProviderModel;
pub use reasoning::{ReasoningModel, ThinkingSplitter, extract_reasoning};
pub use router::ModelRouter;
pub use types::{
    FinishReason, GenerateRequest, Generation, LlmMessage, StreamPart, TokenStream, ToolCall,
    ToolDefinition, collect_stream,
};
pub use trogon_vault::ProviderTag;
