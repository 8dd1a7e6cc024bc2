use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ErrorKind, QueryError};
use crate::request::Operation;

/// Rows returned by a successful query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuerySuccess {
    pub collection: String,
    pub operation: Operation,
    pub count: usize,
    pub results: Vec<Value>,
}

/// A failure rendered for the model. `error` is always safe to show.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryFailure {
    pub error: String,
    pub kind: ErrorKind,
}

/// What a tool invocation hands back. Never an `Err`: failures are data the
/// model can read and react to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryOutcome {
    Success(QuerySuccess),
    Failure(QueryFailure),
}

impl QueryOutcome {
    pub fn success(collection: impl Into<String>, operation: Operation, results: Vec<Value>) -> Self {
        Self::Success(QuerySuccess {
            collection: collection.into(),
            operation,
            count: results.len(),
            results,
        })
    }

    /// The result returned to the model when a human declines the call.
    pub fn denied() -> Self {
        QueryError::Denied.into()
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Success(_) => None,
            Self::Failure(failure) => Some(failure.kind),
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| Value::Null)
    }
}

impl From<QueryError> for QueryOutcome {
    fn from(err: QueryError) -> Self {
        Self::Failure(QueryFailure {
            kind: err.kind(),
            error: err.to_string(),
        })
    }
}
