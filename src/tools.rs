//! MCP Tools for SQL Server operations.
//!
//! - `execute_sql`: execute an arbitrary SQL statement
//! - `get_auth_info`: describe the active authentication configuration and
//!   session, with secrets reported as present/absent only

mod inputs;

pub use inputs::*;

use crate::database::query::{self, QueryOutcome};
use crate::server::MssqlMcpServer;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{CallToolResult, Content};
use rmcp::{tool, tool_router, ErrorData};
use tracing::{debug, warn};

#[tool_router(vis = "pub(crate)")]
impl MssqlMcpServer {
    /// Execute a SQL statement and return results.
    ///
    /// SELECT statements return CSV-style text; other statements report the
    /// affected row count. Driver errors are reported in the tool result,
    /// unmodified.
    #[tool(description = "Execute an SQL query on the SQL Server")]
    pub async fn execute_sql(
        &self,
        Parameters(input): Parameters<ExecuteSqlInput>,
    ) -> Result<CallToolResult, ErrorData> {
        let sql = input.query.trim();
        if sql.is_empty() {
            return Ok(tool_error("Query is required"));
        }
        debug!("Executing query: {}", truncate(sql, 100));

        let mut client = match self.open_connection().await {
            Ok(client) => client,
            Err(e) => return Ok(tool_error(format!("Error executing query: {}", e))),
        };

        // Table-listing queries get the compact `Tables_in_<db>` format.
        if is_table_listing_query(sql) {
            return match query::execute(&mut client, sql).await {
                Ok(QueryOutcome::Rows(result)) => {
                    let mut lines = vec![format!("Tables_in_{}", self.descriptor.database)];
                    lines.extend(
                        result
                            .rows
                            .iter()
                            .filter_map(|row| row.first())
                            .map(|v| v.to_string()),
                    );
                    Ok(tool_text(lines.join("\n")))
                }
                Ok(_) => Ok(tool_text("Query executed successfully (no results returned)")),
                Err(e) => {
                    warn!("Query execution failed: {}", e);
                    Ok(tool_error(format!("Error executing query: {}", e)))
                }
            };
        }

        match query::execute(&mut client, sql).await {
            Ok(QueryOutcome::Rows(result)) => Ok(tool_text(result.to_csv_text())),
            Ok(QueryOutcome::NoResults) => {
                Ok(tool_text("Query executed successfully (no results returned)"))
            }
            Ok(QueryOutcome::RowsAffected(count)) => Ok(tool_text(format!(
                "Query executed successfully. Rows affected: {}",
                count
            ))),
            Err(e) => {
                warn!("Query execution failed: {}", e);
                Ok(tool_error(format!("Error executing query: {}", e)))
            }
        }
    }

    /// Describe the current authentication method and connection.
    ///
    /// Configuration facts come from the resolved descriptor (secrets
    /// redacted); session facts come from a live query.
    #[tool(
        description = "Get information about the current authentication method and connection"
    )]
    pub async fn get_auth_info(&self) -> Result<CallToolResult, ErrorData> {
        let configuration = self.descriptor.describe();

        let session = match self.session_info().await {
            Ok(session) => session,
            Err(e) => {
                return Ok(tool_error(format!(
                    "Error getting authentication info: {}",
                    e
                )))
            }
        };

        let info = format!(
            "Authentication Information:\n\
             Method: {}\n\
             Server: {}\n\
             Database: {}\n\
             System User: {}\n\
             Database User: {}\n\
             Host: {}\n\
             Azure Auth Available: {}\n\
             SQL Server Version: {}\n\
             Configuration: {}",
            self.descriptor.auth_method(),
            self.descriptor.server,
            session.database,
            session.system_user,
            session.database_user,
            session.host,
            cfg!(feature = "azure-auth"),
            truncate(&session.version, 100),
            configuration,
        );

        Ok(tool_text(info))
    }
}

/// Session facts reported by `get_auth_info`.
struct SessionInfo {
    version: String,
    database: String,
    system_user: String,
    database_user: String,
    host: String,
}

impl MssqlMcpServer {
    async fn session_info(&self) -> Result<SessionInfo, crate::error::ServerError> {
        let mut client = self.open_connection().await?;
        let outcome = query::execute(
            &mut client,
            "SELECT @@VERSION, DB_NAME(), SYSTEM_USER, USER_NAME(), HOST_NAME()",
        )
        .await?;

        let field = |row: &Vec<crate::database::SqlValue>, idx: usize| {
            row.get(idx)
                .map(|v| v.to_string())
                .unwrap_or_else(|| "Unknown".to_string())
        };

        match outcome {
            QueryOutcome::Rows(result) if !result.rows.is_empty() => {
                let row = &result.rows[0];
                Ok(SessionInfo {
                    version: field(row, 0),
                    database: field(row, 1),
                    system_user: field(row, 2),
                    database_user: field(row, 3),
                    host: field(row, 4),
                })
            }
            _ => Ok(SessionInfo {
                version: "Unknown".to_string(),
                database: "Unknown".to_string(),
                system_user: "Unknown".to_string(),
                database_user: "Unknown".to_string(),
                host: "Unknown".to_string(),
            }),
        }
    }
}

fn tool_text(text: impl Into<String>) -> CallToolResult {
    CallToolResult::success(vec![Content::text(text.into())])
}

fn tool_error(text: impl Into<String>) -> CallToolResult {
    CallToolResult::error(vec![Content::text(text.into())])
}

/// Detect a table-listing query on `INFORMATION_SCHEMA.TABLES`.
///
/// Aggregate queries against the same view (COUNT etc.) fall through to
/// regular SELECT handling.
fn is_table_listing_query(sql: &str) -> bool {
    let upper = sql.to_uppercase();
    query::is_select(sql)
        && upper.contains("INFORMATION_SCHEMA.TABLES")
        && upper.contains("TABLE_NAME")
        && !upper.contains("COUNT(*)")
}

/// Truncate a string for logging and display.
fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        let end = s
            .char_indices()
            .map(|(i, _)| i)
            .take_while(|&i| i <= max_len)
            .last()
            .unwrap_or(0);
        format!("{}...", &s[..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_table_listing_query() {
        assert!(is_table_listing_query(
            "SELECT TABLE_NAME FROM INFORMATION_SCHEMA.TABLES"
        ));
        assert!(is_table_listing_query(
            "select table_name from information_schema.tables where table_type = 'BASE TABLE'"
        ));
        assert!(!is_table_listing_query(
            "SELECT COUNT(*) FROM INFORMATION_SCHEMA.TABLES"
        ));
        assert!(!is_table_listing_query("SELECT * FROM Users"));
        assert!(!is_table_listing_query(
            "DELETE FROM INFORMATION_SCHEMA.TABLES WHERE TABLE_NAME = 'x'"
        ));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("this is a long string", 10), "this is a ...");
        assert_eq!(truncate("exactly10!", 10), "exactly10!");
    }
}
