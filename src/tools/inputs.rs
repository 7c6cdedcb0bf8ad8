//! Tool input types with JSON Schema generation.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Input for the `execute_sql` tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ExecuteSqlInput {
    /// The SQL query to execute.
    #[schemars(description = "The SQL query to execute")]
    pub query: String,
}
