//! How the query tool is presented to language models.

use serde_json::json;
use trogon_llm::ToolDefinition;

use crate::request::MAX_LIMIT;

pub const TOOL_NAME: &str = "queryMongo";

const DESCRIPTION: &str = "Query a MongoDB database. Supports 'find' for simple lookups and \
'aggregate' for advanced queries (grouping, counting, joins). Read-only: no inserts, updates, \
or deletes.";

/// Guidance appended to the system prompt whenever the tool is attached.
pub const USAGE_PROMPT: &str = "You have access to a MongoDB database through the `queryMongo` tool.

Rules:
- Use `find` for simple lookups and filtering
- Use `aggregate` for grouping, counting, joining ($lookup), and computed fields
- Keep `limit` reasonable (max 50, default 10) to avoid huge responses
- The filter, projection, sort, and pipeline params must be valid JSON strings
- Always project only the fields needed to answer the question
- Every call is shown to the user for approval before it runs";

/// The tool definition, always marked as requiring approval.
pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: TOOL_NAME.to_string(),
        description: DESCRIPTION.to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "collection": {
                    "type": "string",
                    "description": "Name of the MongoDB collection to query"
                },
                "operation": {
                    "type": "string",
                    "enum": ["find", "aggregate"],
                    "description": "'find' for simple queries, 'aggregate' for pipelines"
                },
                "filter": {
                    "type": "string",
                    "description": "For find: JSON filter object (e.g. '{\"status\":\"active\"}'). For aggregate: JSON array pipeline (e.g. '[{\"$match\":{\"status\":\"active\"}},{\"$group\":{\"_id\":\"$category\",\"count\":{\"$sum\":1}}}]')"
                },
                "projection": {
                    "type": "string",
                    "description": "JSON object specifying fields to include/exclude (e.g. '{\"name\":1,\"email\":1,\"_id\":0}'). Only used with find."
                },
                "sort": {
                    "type": "string",
                    "description": "JSON object for sort order (e.g. '{\"createdAt\":-1}'). Only used with find."
                },
                "limit": {
                    "type": "integer",
                    "minimum": 1,
                    "maximum": MAX_LIMIT,
                    "description": format!("Max documents to return (1-{MAX_LIMIT}, default 10)")
                }
            },
            "required": ["collection", "operation", "filter"],
            "additionalProperties": false
        }),
        needs_approval: true,
    }
}
