//! Human-in-the-loop gating for tool calls.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::oneshot;
use tracing::{info, warn};
use trogon_llm::ToolCall;
use trogon_query_tool::{Approved, PendingApproval, QueryRequest};
use trogon_vault::TenantId;
use uuid::Uuid;

/// Decides whether a proposed query may run.
///
/// Returning `None` denies the call. The only way to produce an
/// [`Approved`] value is [`PendingApproval::approve`].
pub trait ApprovalGate: Send + Sync {
    fn review(
        &self,
        tenant: &TenantId,
        call: &ToolCall,
        pending: PendingApproval<QueryRequest>,
    ) -> impl std::future::Future<Output = Option<Approved<QueryRequest>>> + Send;
}

/// Denies everything. Used when no human is available to ask.
#[derive(Debug, Clone, Copy, Default)]
pub struct DenyAll;

impl ApprovalGate for DenyAll {
    async fn review(
        &self,
        tenant: &TenantId,
        call: &ToolCall,
        pending: PendingApproval<QueryRequest>,
    ) -> Option<Approved<QueryRequest>> {
        info!(tenant = %tenant, tool = %call.name, "Tool call denied, no approver configured");
        pending.deny();
        None
    }
}

/// A tool call waiting for a decision, as shown to the tenant.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingToolCall {
    pub id: Uuid,
    pub tool_call_id: String,
    pub tool: String,
    pub input: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApprovalError {
    /// Unknown id, already decided, expired, or owned by another tenant.
    #[error("no pending tool call with that id")]
    NotFound,
}

struct Waiting {
    tenant: TenantId,
    call: ToolCall,
    decision: oneshot::Sender<bool>,
}

/// Parks each tool call until the tenant approves or denies it.
///
/// Calls nobody decides on within the timeout are denied.
pub struct PendingApprovals {
    waiting: Mutex<HashMap<Uuid, Waiting>>,
    timeout: Duration,
}

impl PendingApprovals {
    pub fn new(timeout: Duration) -> Self {
        Self {
            waiting: Mutex::new(HashMap::new()),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// The tenant's undecided calls, in no particular order.
    pub fn list(&self, tenant: &TenantId) -> Vec<PendingToolCall> {
        self.lock()
            .iter()
            .filter(|(_, waiting)| &waiting.tenant == tenant)
            .map(|(id, waiting)| PendingToolCall {
                id: *id,
                tool_call_id: waiting.call.id.clone(),
                tool: waiting.call.name.clone(),
                input: waiting.call.input.clone(),
            })
            .collect()
    }

    /// Record the tenant's decision. A tenant can only decide its own calls.
    pub fn decide(&self, tenant: &TenantId, id: Uuid, approved: bool) -> Result<(), ApprovalError> {
        let waiting = {
            let mut map = self.lock();
            match map.get(&id) {
                Some(waiting) if &waiting.tenant == tenant => map.remove(&id),
                _ => None,
            }
        };
        let waiting = waiting.ok_or(ApprovalError::NotFound)?;
        waiting.decision.send(approved).map_err(|_| ApprovalError::NotFound)?;
        info!(tenant = %tenant, id = %id, approved, "Tool call decided");
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, Waiting>> {
        self.waiting.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Drops the registry entry if the reviewing future goes away first.
struct Registration<'a> {
    registry: &'a PendingApprovals,
    id: Uuid,
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        self.registry.lock().remove(&self.id);
    }
}

impl ApprovalGate for PendingApprovals {
    async fn review(
        &self,
        tenant: &TenantId,
        call: &ToolCall,
        pending: PendingApproval<QueryRequest>,
    ) -> Option<Approved<QueryRequest>> {
        let id = Uuid::new_v4();
        let (tx, rx) = oneshot::channel();
        self.lock().insert(
            id,
            Waiting {
                tenant: tenant.clone(),
                call: call.clone(),
                decision: tx,
            },
        );
        let _registration = Registration { registry: self, id };
        info!(
            tenant = %tenant,
            id = %id,
            collection = %pending.request().collection,
            operation = %pending.request().operation,
            "Tool call awaiting approval"
        );

        match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(true)) => Some(pending.approve()),
            Ok(Ok(false)) | Ok(Err(_)) => {
                pending.deny();
                None
            }
            Err(_) => {
                warn!(tenant = %tenant, id = %id, "Tool call approval timed out, denying");
                pending.deny();
                None
            }
        }
    }
}
