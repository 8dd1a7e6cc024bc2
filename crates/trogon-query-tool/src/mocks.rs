//! Mock [`DocumentStore`] for tests that should not need a database.
//!
//! Enabled with the `test-support` feature:
//!
//! ```toml
//! [dev-dependencies]
//! trogon-query-tool = { path = "...", features = ["test-support"] }
//! ```

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};
use std::time::Duration;

use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

use crate::store::{DocumentStore, FindOptions, StoreError};

/// A call the executor made against the store.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreCall {
    Find {
        collection: String,
        filter: Map<String, Value>,
        options: FindOptions,
    },
    Aggregate {
        collection: String,
        pipeline: Vec<Value>,
    },
}

/// Returns canned rows (or a canned error), optionally after a delay.
///
/// Calls dropped before they finish are counted as abandoned, which is how
/// tests observe that a timed-out query really stopped.
#[derive(Clone, Default)]
pub struct MockDocumentStore {
    results: Vec<Value>,
    error: Option<StoreError>,
    delay: Option<Duration>,
    calls: Arc<Mutex<Vec<StoreCall>>>,
    last_cancel: Arc<Mutex<Option<CancellationToken>>>,
    abandoned: Arc<AtomicUsize>,
    cancelled: Arc<AtomicUsize>,
}

impl MockDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_results(mut self, results: Vec<Value>) -> Self {
        self.results = results;
        self
    }

    pub fn with_error(mut self, error: StoreError) -> Self {
        self.error = Some(error);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().unwrap().clone()
    }

    /// The cancellation token passed with the most recent call.
    pub fn last_cancel(&self) -> Option<CancellationToken> {
        self.last_cancel.lock().unwrap().clone()
    }

    /// Calls that were dropped or cancelled before completing.
    pub fn abandoned(&self) -> usize {
        self.abandoned.load(Ordering::SeqCst)
    }

    /// Calls that saw their cancellation token fire while still running.
    pub fn observed_cancellations(&self) -> usize {
        self.cancelled.load(Ordering::SeqCst)
    }

    async fn respond(&self, call: StoreCall, cancel: CancellationToken) -> Result<Vec<Value>, StoreError> {
        self.calls.lock().unwrap().push(call);
        *self.last_cancel.lock().unwrap() = Some(cancel.clone());

        let mut probe = DropProbe {
            counter: Arc::clone(&self.abandoned),
            armed: true,
        };

        if let Some(delay) = self.delay {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = cancel.cancelled() => {
                    self.cancelled.fetch_add(1, Ordering::SeqCst);
                    return Err(StoreError::Cancelled);
                }
            }
        }

        probe.armed = false;
        match &self.error {
            Some(err) => Err(err.clone()),
            None => Ok(self.results.clone()),
        }
    }
}

impl DocumentStore for MockDocumentStore {
    async fn find(
        &self,
        collection: &str,
        filter: Map<String, Value>,
        options: FindOptions,
        cancel: CancellationToken,
    ) -> Result<Vec<Value>, StoreError> {
        let call = StoreCall::Find {
            collection: collection.to_string(),
            filter,
            options,
        };
        self.respond(call, cancel).await
    }

    async fn aggregate(
        &self,
        collection: &str,
        pipeline: Vec<Value>,
        cancel: CancellationToken,
    ) -> Result<Vec<Value>, StoreError> {
        let call = StoreCall::Aggregate {
            collection: collection.to_string(),
            pipeline,
        };
        self.respond(call, cancel).await
    }
}

struct DropProbe {
    counter: Arc<AtomicUsize>,
    armed: bool,
}

impl Drop for DropProbe {
    fn drop(&mut self) {
        if self.armed {
            self.counter.fetch_add(1, Ordering::SeqCst);
        }
    }
}
