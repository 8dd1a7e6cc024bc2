//! [`Sandbox`]: one agent turn for one tenant.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use trogon_llm::{
    FinishReason, GenerateRequest, LanguageModel, LlmMessage, ModelHandle, ModelRouter, ToolCall, ToolDefinition,
};
use trogon_query_tool::{
    DocumentStore, PendingApproval, QueryError, QueryExecutor, QueryOutcome, QueryRequest, TOOL_NAME, USAGE_PROMPT,
};
use trogon_vault::{CredentialStore, CredentialVault, TenantId};

use crate::approval::ApprovalGate;
use crate::error::SandboxError;

const DEFAULT_MAX_TOOL_STEPS: usize = 5;

/// The conversation a tenant wants answered.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    pub messages: Vec<LlmMessage>,
}

/// A tool call the model made during the turn and what it got back.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolResult {
    pub call: ToolCall,
    pub outcome: QueryOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentResponse {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    pub tool_results: Vec<ToolResult>,
    /// Model round trips taken.
    pub steps: usize,
    pub finish_reason: FinishReason,
}

/// Owns the vault, the router and the query executor.
///
/// Built once at startup; every method is scoped to the tenant passed in and
/// nothing is cached between calls.
pub struct Sandbox<S, D> {
    vault: CredentialVault<S>,
    router: ModelRouter,
    executor: QueryExecutor<D>,
    max_tool_steps: usize,
}

impl<S, D> Sandbox<S, D>
where
    S: CredentialStore,
    D: DocumentStore,
{
    pub fn new(vault: CredentialVault<S>, router: ModelRouter, executor: QueryExecutor<D>) -> Self {
        Self {
            vault,
            router,
            executor,
            max_tool_steps: DEFAULT_MAX_TOOL_STEPS,
        }
    }

    pub fn with_max_tool_steps(mut self, steps: usize) -> Self {
        self.max_tool_steps = steps.max(1);
        self
    }

    pub fn vault(&self) -> &CredentialVault<S> {
        &self.vault
    }

    pub fn router(&self) -> &ModelRouter {
        &self.router
    }

    pub fn executor(&self) -> &QueryExecutor<D> {
        &self.executor
    }

    /// Decrypt the tenant's keys and resolve `model_id` against them.
    pub async fn model_for(&self, tenant: &TenantId, model_id: &str) -> Result<ModelHandle, SandboxError> {
        let credentials = self.vault.tenant_credentials(tenant).await?;
        Ok(self.router.resolve(model_id, &credentials)?)
    }

    /// Tools attached to every model call.
    pub fn tools(&self) -> Vec<ToolDefinition> {
        vec![trogon_query_tool::definition()]
    }

    /// Decode, gate and execute one tool call. Always yields an outcome the
    /// model can read.
    pub async fn run_tool_call<G: ApprovalGate>(&self, tenant: &TenantId, call: &ToolCall, gate: &G) -> QueryOutcome {
        if call.name != TOOL_NAME {
            warn!(tenant = %tenant, tool = %call.name, "Model called an unknown tool");
            return QueryError::InvalidInput(format!("unknown tool '{}'", call.name)).into();
        }
        let request = match QueryRequest::from_tool_input(&call.input) {
            Ok(request) => request,
            Err(err) => return err.into(),
        };

        match gate.review(tenant, call, PendingApproval::new(request)).await {
            Some(approved) => self.executor.invoke(approved).await,
            None => QueryOutcome::denied(),
        }
    }

    /// Resolve the model for the tenant and run a full turn.
    pub async fn respond<G: ApprovalGate>(
        &self,
        tenant: &TenantId,
        model_id: &str,
        request: AgentRequest,
        gate: &G,
    ) -> Result<AgentResponse, SandboxError> {
        let model = self.model_for(tenant, model_id).await?;
        self.respond_with(tenant, &model, request, gate).await
    }

    /// Run a turn against an already resolved model.
    ///
    /// Tool calls are fed back to the model until it answers without one or
    /// the step budget runs out.
    pub async fn respond_with<M, G>(
        &self,
        tenant: &TenantId,
        model: &M,
        request: AgentRequest,
        gate: &G,
    ) -> Result<AgentResponse, SandboxError>
    where
        M: LanguageModel,
        G: ApprovalGate,
    {
        let system = match request.system.as_deref().map(str::trim) {
            Some(system) if !system.is_empty() => format!("{system}\n\n{USAGE_PROMPT}"),
            _ => USAGE_PROMPT.to_string(),
        };
        let mut messages = request.messages;
        let mut reasoning = Vec::new();
        let mut tool_results = Vec::new();
        let mut step = 0;

        loop {
            step += 1;
            let generation = model
                .generate(&GenerateRequest {
                    system: Some(system.clone()),
                    messages: messages.clone(),
                    tools: self.tools(),
                    max_tokens: None,
                })
                .await?;
            info!(
                tenant = %tenant,
                model = %model.model_name(),
                step,
                tool_calls = generation.tool_calls.len(),
                "Model step finished"
            );
            if let Some(text) = generation.reasoning.as_deref().filter(|r| !r.is_empty()) {
                reasoning.push(text.to_string());
            }

            if generation.tool_calls.is_empty() {
                return Ok(AgentResponse {
                    text: generation.text,
                    reasoning: join_reasoning(reasoning),
                    tool_results,
                    steps: step,
                    finish_reason: generation.finish_reason,
                });
            }

            messages.push(LlmMessage::Assistant {
                content: generation.text.clone(),
                tool_calls: generation.tool_calls.clone(),
            });
            for call in &generation.tool_calls {
                let outcome = self.run_tool_call(tenant, call, gate).await;
                messages.push(LlmMessage::Tool {
                    call_id: call.id.clone(),
                    name: call.name.clone(),
                    output: outcome.to_value(),
                });
                tool_results.push(ToolResult {
                    call: call.clone(),
                    outcome,
                });
            }

            if step >= self.max_tool_steps {
                warn!(tenant = %tenant, steps = step, "Tool step budget exhausted");
                return Ok(AgentResponse {
                    text: generation.text,
                    reasoning: join_reasoning(reasoning),
                    tool_results,
                    steps: step,
                    finish_reason: FinishReason::ToolCalls,
                });
            }
        }
    }
}

fn join_reasoning(parts: Vec<String>) -> Option<String> {
    (!parts.is_empty()).then(|| parts.join("\n"))
}
