//! Tool input decoding.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::QueryError;

pub const DEFAULT_LIMIT: i64 = 10;
pub const MAX_LIMIT: i64 = 50;

/// The only operations that exist. Anything else fails input decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Find,
    Aggregate,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Find => "find",
            Self::Aggregate => "aggregate",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A query as proposed by the model.
///
/// `filter`, `projection` and `sort` are JSON text; they are parsed, never
/// interpolated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub collection: String,
    pub operation: Operation,
    pub filter: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub projection: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
    #[serde(default, deserialize_with = "lenient_limit", skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,
}

/// Models sometimes send `10.0` for an integer field.
fn lenient_limit<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    let value: Option<f64> = Option::deserialize(deserializer)?;
    Ok(value.filter(|v| v.is_finite()).map(|v| v.trunc() as i64))
}

impl QueryRequest {
    /// Decode the model's tool input. Missing fields and unknown operations
    /// are validation failures; extra fields are ignored.
    pub fn from_tool_input(input: &Value) -> Result<Self, QueryError> {
        let request: Self =
            serde_json::from_value(input.clone()).map_err(|e| QueryError::InvalidInput(e.to_string()))?;
        request.validate_collection()?;
        Ok(request)
    }

    fn validate_collection(&self) -> Result<(), QueryError> {
        let name = self.collection.as_str();
        if name.trim().is_empty() {
            return Err(QueryError::InvalidInput("collection must not be empty".into()));
        }
        if name.contains('$') || name.contains('\0') {
            return Err(QueryError::InvalidInput(format!(
                "collection name {name:?} contains a reserved character"
            )));
        }
        Ok(())
    }

    /// The requested limit clamped to `[1, MAX_LIMIT]`, or [`DEFAULT_LIMIT`].
    pub fn effective_limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decode(input: Value) -> Result<QueryRequest, QueryError> {
        QueryRequest::from_tool_input(&input)
    }

    #[test]
    fn decodes_minimal_find() {
        let req = decode(json!({"collection": "users", "operation": "find", "filter": "{}"})).unwrap();
        assert_eq!(req.operation, Operation::Find);
        assert_eq!(req.effective_limit(), DEFAULT_LIMIT);
    }

    #[test]
    fn unknown_operation_is_rejected() {
        let err = decode(json!({"collection": "users", "operation": "delete", "filter": "{}"})).unwrap_err();
        assert!(matches!(err, QueryError::InvalidInput(_)));
        assert!(err.to_string().starts_with("Invalid tool input: "));
    }

    #[test]
    fn missing_filter_is_rejected() {
        let err = decode(json!({"collection": "users", "operation": "find"})).unwrap_err();
        assert!(matches!(err, QueryError::InvalidInput(_)));
    }

    #[test]
    fn filter_must_be_text() {
        let err = decode(json!({"collection": "users", "operation": "find", "filter": {"a": 1}})).unwrap_err();
        assert!(matches!(err, QueryError::InvalidInput(_)));
    }

    #[test]
    fn extra_fields_are_ignored() {
        let req = decode(json!({
            "collection": "users", "operation": "find", "filter": "{}", "update": "{}"
        }))
        .unwrap();
        assert_eq!(req.collection, "users");
    }

    #[test]
    fn reserved_collection_names_are_rejected() {
        for name in ["", "  ", "a$b"] {
            let err = decode(json!({"collection": name, "operation": "find", "filter": "{}"})).unwrap_err();
            assert!(matches!(err, QueryError::InvalidInput(_)), "{name:?}");
        }
    }

    #[test]
    fn limit_is_clamped() {
        let limit = |l: Value| {
            decode(json!({"collection": "c", "operation": "find", "filter": "{}", "limit": l}))
                .unwrap()
                .effective_limit()
        };
        assert_eq!(limit(json!(1000)), 50);
        assert_eq!(limit(json!(0)), 1);
        assert_eq!(limit(json!(-5)), 1);
        assert_eq!(limit(json!(25)), 25);
        assert_eq!(limit(json!(7.9)), 7);
        assert_eq!(limit(Value::Null), DEFAULT_LIMIT);
    }
}
