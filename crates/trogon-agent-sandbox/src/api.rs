//! Axum HTTP surface.
//!
//! Authentication happens upstream; the authenticated tenant arrives in the
//! `x-tenant-id` header.

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{FromRequestParts, Path, State};
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::info;
use trogon_llm::{ChatModel, DEFAULT_CHAT_MODEL, LlmMessage, chat_models};
use trogon_query_tool::DocumentStore;
use trogon_vault::{CredentialStore, ProviderTag, TenantId};
use uuid::Uuid;

use crate::approval::{PendingApprovals, PendingToolCall};
use crate::error::ApiError;
use crate::runtime::{AgentRequest, AgentResponse, Sandbox};

pub const TENANT_HEADER: &str = "x-tenant-id";

/// Shared handler state.
pub struct AppState<S, D> {
    pub sandbox: Arc<Sandbox<S, D>>,
    pub approvals: Arc<PendingApprovals>,
}

impl<S, D> Clone for AppState<S, D> {
    fn clone(&self) -> Self {
        Self {
            sandbox: Arc::clone(&self.sandbox),
            approvals: Arc::clone(&self.approvals),
        }
    }
}

/// The caller's tenant, taken from [`TENANT_HEADER`].
#[derive(Debug, Clone)]
pub struct Tenant(pub TenantId);

impl<St: Send + Sync> FromRequestParts<St> for Tenant {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &St) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(TENANT_HEADER)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(ApiError::unauthorized)?;
        TenantId::new(raw)
            .map(Tenant)
            .map_err(|_| ApiError::bad_request("Invalid tenant id"))
    }
}

pub fn router<S, D>(state: AppState<S, D>) -> Router
where
    S: CredentialStore + 'static,
    D: DocumentStore + 'static,
{
    Router::new()
        .route(
            "/api/user/api-keys",
            get(list_keys::<S, D>).post(save_key::<S, D>).delete(delete_key::<S, D>),
        )
        .route("/api/models", get(list_models))
        .route("/api/agent/respond", post(respond::<S, D>))
        .route("/api/agent/approvals", get(list_approvals::<S, D>))
        .route("/api/agent/approvals/{id}", post(decide_approval::<S, D>))
        .route("/health", get(health))
        .route("/live", get(live))
        .with_state(state)
}

fn payload<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    body.map(|Json(value)| value)
        .map_err(|_| ApiError::bad_request("Request body is not valid JSON for this endpoint"))
}

fn parse_provider(raw: &str) -> Result<ProviderTag, ApiError> {
    raw.parse().map_err(|_| ApiError::bad_request("Invalid provider"))
}

fn success() -> Json<Value> {
    Json(json!({ "success": true }))
}

#[derive(Debug, Serialize)]
struct ConfiguredProvider {
    provider: ProviderTag,
}

async fn list_keys<S: CredentialStore + 'static, D: DocumentStore + 'static>(
    State(state): State<AppState<S, D>>,
    Tenant(tenant): Tenant,
) -> Result<Json<Vec<ConfiguredProvider>>, ApiError> {
    let providers = state.sandbox.vault().configured_providers(&tenant).await?;
    Ok(Json(
        providers
            .into_iter()
            .map(|provider| ConfiguredProvider { provider })
            .collect(),
    ))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SaveKeyBody {
    #[serde(default)]
    provider: String,
    #[serde(default)]
    api_key: String,
}

async fn save_key<S: CredentialStore + 'static, D: DocumentStore + 'static>(
    State(state): State<AppState<S, D>>,
    Tenant(tenant): Tenant,
    body: Result<Json<SaveKeyBody>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let body = payload(body)?;
    if body.provider.is_empty() || body.api_key.trim().is_empty() {
        return Err(ApiError::bad_request("Missing provider or apiKey"));
    }
    let provider = parse_provider(&body.provider)?;
    state
        .sandbox
        .vault()
        .store_credential(&tenant, provider, &body.api_key)
        .await?;
    Ok(success())
}

#[derive(Debug, Deserialize)]
struct DeleteKeyBody {
    #[serde(default)]
    provider: String,
}

async fn delete_key<S: CredentialStore + 'static, D: DocumentStore + 'static>(
    State(state): State<AppState<S, D>>,
    Tenant(tenant): Tenant,
    body: Result<Json<DeleteKeyBody>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let body = payload(body)?;
    if body.provider.is_empty() {
        return Err(ApiError::bad_request("Missing provider"));
    }
    let provider = parse_provider(&body.provider)?;
    state.sandbox.vault().delete_credential(&tenant, provider).await?;
    Ok(success())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ModelCatalog {
    default_model: &'static str,
    models: &'static [ChatModel],
}

async fn list_models() -> Json<ModelCatalog> {
    Json(ModelCatalog {
        default_model: DEFAULT_CHAT_MODEL,
        models: chat_models(),
    })
}

#[derive(Debug, Deserialize)]
struct RespondBody {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    system: Option<String>,
    messages: Vec<LlmMessage>,
}

async fn respond<S: CredentialStore + 'static, D: DocumentStore + 'static>(
    State(state): State<AppState<S, D>>,
    Tenant(tenant): Tenant,
    body: Result<Json<RespondBody>, JsonRejection>,
) -> Result<Json<AgentResponse>, ApiError> {
    let body = payload(body)?;
    let model_id = body.model.as_deref().unwrap_or(DEFAULT_CHAT_MODEL);
    info!(tenant = %tenant, model = %model_id, messages = body.messages.len(), "Agent request");

    let request = AgentRequest {
        system: body.system,
        messages: body.messages,
    };
    let response = state
        .sandbox
        .respond(&tenant, model_id, request, state.approvals.as_ref())
        .await?;
    Ok(Json(response))
}

async fn list_approvals<S: CredentialStore + 'static, D: DocumentStore + 'static>(
    State(state): State<AppState<S, D>>,
    Tenant(tenant): Tenant,
) -> Json<Vec<PendingToolCall>> {
    Json(state.approvals.list(&tenant))
}

#[derive(Debug, Deserialize)]
struct DecisionBody {
    approved: bool,
}

async fn decide_approval<S: CredentialStore + 'static, D: DocumentStore + 'static>(
    State(state): State<AppState<S, D>>,
    Tenant(tenant): Tenant,
    id: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<DecisionBody>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let not_found = || ApiError::not_found("not_found:approval", "No pending tool call with that id");
    let Path(id) = id.map_err(|_| not_found())?;
    let body = payload(body)?;
    state
        .approvals
        .decide(&tenant, id, body.approved)
        .map_err(|_| not_found())?;
    Ok(success())
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn live() -> StatusCode {
    StatusCode::NO_CONTENT
}
