//! Tenant-scoped agent sandbox.
//!
//! Each tenant brings its own provider API keys. A request is answered by
//! decrypting that tenant's keys, resolving the requested model against them,
//! and running a bounded tool loop in which every database query waits for
//! the tenant's explicit approval.
//!
//! ```text
//! HTTP (x-tenant-id) ──▶ Sandbox::respond
//!                           │ CredentialVault::tenant_credentials
//!                           │ ModelRouter::resolve ──▶ ModelHandle
//!                           ▼
//!                     model.generate ◀──────────────┐
//!                           │ tool call              │ tool result
//!                           ▼                        │
//!                     ApprovalGate::review ─▶ QueryExecutor::invoke
//! ```

pub mod api;
pub mod approval;
pub mod config;
pub mod error;
pub mod runtime;

pub use api::{AppState, TENANT_HEADER, Tenant, router};
pub use approval::{ApprovalError, ApprovalGate, DenyAll, PendingApprovals, PendingToolCall};
pub use config::{AppConfig, ConfigError, SandboxConfig};
pub use error::{ApiError, SandboxError};
pub use runtime::{AgentRequest, AgentResponse, Sandbox, ToolResult};
