//! Turns a [`QueryRequest`] into a bounded store call.

use serde_json::{Map, Value, json};

use crate::error::QueryError;
use crate::request::{Operation, QueryRequest};
use crate::store::FindOptions;

/// A validated query, ready for the store.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryPlan {
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

impl QueryPlan {
    /// Parse and shape the request.
    ///
    /// Only an unparsable `filter` fails; every other oddity falls back to an
    /// empty value. A final `$limit` stage is always appended to pipelines, so
    /// no aggregate returns more than the clamped limit.
    pub fn from_request(request: &QueryRequest) -> Result<Self, QueryError> {
        let filter = parse_filter(&request.filter)?;
        let limit = request.effective_limit();

        Ok(match request.operation {
            Operation::Find => Self::Find {
                collection: request.collection.clone(),
                filter: match filter {
                    Value::Object(map) => map,
                    _ => Map::new(),
                },
                options: FindOptions {
                    projection: parse_object(request.projection.as_deref()),
                    sort: parse_object(request.sort.as_deref()),
                    limit,
                },
            },
            Operation::Aggregate => {
                let mut pipeline = match filter {
                    Value::Array(stages) => stages,
                    _ => Vec::new(),
                };
                pipeline.push(json!({ "$limit": limit }));
                Self::Aggregate {
                    collection: request.collection.clone(),
                    pipeline,
                }
            }
        })
    }

    pub fn collection(&self) -> &str {
        match self {
            Self::Find { collection, .. } | Self::Aggregate { collection, .. } => collection,
        }
    }
}

/// `null` counts as unparsable.
fn parse_filter(text: &str) -> Result<Value, QueryError> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Null) | Err(_) => Err(QueryError::InvalidFilter),
        Ok(value) => Ok(value),
    }
}

fn parse_object(text: Option<&str>) -> Map<String, Value> {
    match text.map(serde_json::from_str::<Value>) {
        Some(Ok(Value::Object(map))) => map,
        _ => Map::new(),
    }
}
