//! [`DocumentStore`] trait, the seam between the executor and the database.

use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

/// Options for a bounded `find`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    /// Empty means "all fields".
    pub projection: Map<String, Value>,
    /// Empty means natural order.
    pub sort: Map<String, Value>,
    pub limit: i64,
}

/// Failures a store reports back to the executor.
///
/// Messages are already sanitized: no connection string, no credentials.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("invalid store configuration: {0}")]
    Configuration(String),

    #[error("database unavailable")]
    Unavailable,

    #[error("{0}")]
    Execution(String),

    /// The server gave up on its own time limit.
    #[error("operation exceeded its time limit")]
    Timeout,

    /// The cancellation token fired before the store finished.
    #[error("operation cancelled")]
    Cancelled,
}

/// A read-only document database.
///
/// Both calls must stop work promptly once `cancel` fires; the executor does
/// not wait for them after its deadline.
pub trait DocumentStore: Send + Sync {
    fn find(
        &self,
        collection: &str,
        filter: Map<String, Value>,
        options: FindOptions,
        cancel: CancellationToken,
    ) -> impl std::future::Future<Output = Result<Vec<Value>, StoreError>> + Send;

    fn aggregate(
        &self,
        collection: &str,
        pipeline: Vec<Value>,
        cancel: CancellationToken,
    ) -> impl std::future::Future<Output = Result<Vec<Value>, StoreError>> + Send;
}
