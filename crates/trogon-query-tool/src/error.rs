use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::store::StoreError;

/// Classification attached to every failed [`QueryOutcome`](crate::QueryOutcome).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    /// The input never reached the store.
    Validation,
    Timeout,
    Execution,
    /// A human declined the call.
    Denied,
}

/// Why a query did not produce results.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    #[error("Invalid tool input: {0}")]
    InvalidInput(String),

    #[error("Invalid JSON in filter parameter")]
    InvalidFilter,

    #[error("Query timed out after {} seconds", .0.as_secs())]
    Timeout(Duration),

    #[error("Query failed: {0}")]
    Store(StoreError),

    #[error("Tool execution was denied")]
    Denied,
}

impl QueryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_) | Self::InvalidFilter => ErrorKind::Validation,
            Self::Timeout(_) | Self::Store(StoreError::Cancelled) => ErrorKind::Timeout,
            Self::Store(_) => ErrorKind::Execution,
            Self::Denied => ErrorKind::Denied,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_match_the_tool_contract() {
        assert_eq!(QueryError::InvalidFilter.to_string(), "Invalid JSON in filter parameter");
        assert_eq!(
            QueryError::Timeout(Duration::from_secs(10)).to_string(),
            "Query timed out after 10 seconds"
        );
        assert_eq!(
            QueryError::Store(StoreError::Execution("unknown operator: $foo".into())).to_string(),
            "Query failed: unknown operator: $foo"
        );
        assert_eq!(QueryError::Denied.to_string(), "Tool execution was denied");
    }

    #[test]
    fn kinds() {
        assert_eq!(QueryError::InvalidInput("x".into()).kind(), ErrorKind::Validation);
        assert_eq!(QueryError::Timeout(Duration::from_secs(1)).kind(), ErrorKind::Timeout);
        assert_eq!(QueryError::Store(StoreError::Cancelled).kind(), ErrorKind::Timeout);
        assert_eq!(QueryError::Store(StoreError::Unavailable).kind(), ErrorKind::Execution);
        assert_eq!(QueryError::Denied.kind(), ErrorKind::Denied);
    }

    #[test]
    fn kind_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&ErrorKind::Validation).unwrap(), "\"validation\"");
    }
}
