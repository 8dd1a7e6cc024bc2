//! Read-only MongoDB query tool for language models.
//!
//! The model proposes a call; a human approves it; the executor runs it under
//! hard bounds and hands back a small JSON result.
//!
//! ```text
//! tool input (JSON) ──QueryRequest::from_tool_input──▶ QueryRequest
//!        │                                                 │
//!        │ invalid → QueryOutcome{kind: validation}        ▼
//!        │                                     PendingApproval<QueryRequest>
//!        │                                                 │ .approve()
//!        │                                                 ▼
//!        │                                     Approved<QueryRequest>
//!        │                                                 │ QueryExecutor::invoke
//!        ▼                                                 ▼
//!   QueryOutcome ◀── validate ─ shape ─ bound (limit ≤ 50, 10 s) ─ classify
//! ```
//!
//! Only `find` and `aggregate` exist. The executor never returns an error; every
//! failure becomes a [`QueryOutcome`] with an [`ErrorKind`].

pub mod approval;
pub mod config;
pub mod error;
pub mod executor;
pub mod mongo;
pub mod outcome;
pub mod plan;
pub mod request;
pub mod schema;
pub mod store;

#[cfg(any(test, feature = "test-support"))]
pub mod mocks;

pub use approval::{Approved, PendingApproval};
pub use config::StoreConfig;
pub use error::{ErrorKind, QueryError};
pub use executor::{DEFAULT_QUERY_TIMEOUT, QueryExecutor};
pub use mongo::MongoStore;
pub use outcome::{QueryFailure, QueryOutcome, QuerySuccess};
pub use plan::QueryPlan;
pub use request::{DEFAULT_LIMIT, MAX_LIMIT, Operation, QueryRequest};
pub use schema::{TOOL_NAME, USAGE_PROMPT, definition};
pub use store::{DocumentStore, FindOptions, StoreError};
