//! [`QueryExecutor`]: validate, bound, run and classify one approved query.

use std::time::{Duration, Instant};

use futures::FutureExt;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::approval::Approved;
use crate::error::QueryError;
use crate::outcome::QueryOutcome;
use crate::plan::QueryPlan;
use crate::request::QueryRequest;
use crate::store::{DocumentStore, StoreError};

pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(10);

/// Runs approved queries against a [`DocumentStore`].
///
/// Stateless apart from the shared store handle; concurrent invocations are
/// independent.
#[derive(Debug, Clone)]
pub struct QueryExecutor<S> {
    store: S,
    timeout: Duration,
}

impl<S: DocumentStore> QueryExecutor<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Execute a query a human has approved. Never fails: every problem is
    /// reported as a [`QueryOutcome::Failure`].
    pub async fn invoke(&self, approved: Approved<QueryRequest>) -> QueryOutcome {
        let request = approved.into_inner();
        let plan = match QueryPlan::from_request(&request) {
            Ok(plan) => plan,
            Err(err) => {
                warn!(collection = %request.collection, operation = %request.operation, "rejected query input");
                return err.into();
            }
        };

        info!(collection = %request.collection, operation = %request.operation, "running query");
        let started = Instant::now();

        match self.run(plan).await {
            Ok(results) => {
                info!(
                    collection = %request.collection,
                    count = results.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "query finished"
                );
                QueryOutcome::success(request.collection, request.operation, results)
            }
            Err(err) => {
                warn!(collection = %request.collection, kind = ?err.kind(), "query failed");
                err.into()
            }
        }
    }

    async fn run(&self, plan: QueryPlan) -> Result<Vec<serde_json::Value>, QueryError> {
        let cancel = CancellationToken::new();
        let call = async {
            match plan {
                QueryPlan::Find { collection, filter, options } => {
                    self.store.find(&collection, filter, options, cancel.clone()).await
                }
                QueryPlan::Aggregate { collection, pipeline } => {
                    self.store.aggregate(&collection, pipeline, cancel.clone()).await
                }
            }
        };

        tokio::pin!(call);
        let result = tokio::select! {
            biased;
            result = &mut call => result,
            _ = tokio::time::sleep(self.timeout) => {
                cancel.cancel();
                // One last poll so the store sees the signal before the call is dropped.
                let _ = call.as_mut().now_or_never();
                return Err(QueryError::Timeout(self.timeout));
            }
        };

        match result {
            Ok(results) => Ok(results),
            Err(StoreError::Timeout | StoreError::Cancelled) => Err(QueryError::Timeout(self.timeout)),
            Err(err) => Err(QueryError::Store(err)),
        }
    }
}
