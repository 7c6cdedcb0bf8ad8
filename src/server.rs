//! MCP server struct definition and initialization.

use crate::config::ConnectionDescriptor;
use crate::database::{self, RawConnection};
use crate::error::ServerError;
use rmcp::handler::server::router::tool::ToolRouter;
use std::sync::Arc;
use tracing::debug;

/// The MSSQL Entra MCP Server instance.
///
/// The struct is cloned per request; the resolved connection descriptor is
/// shared via `Arc` and never mutated. Connections are opened per operation
/// from the descriptor, so the server itself holds no database state.
#[derive(Clone)]
pub struct MssqlMcpServer {
    /// Resolved, validated connection configuration.
    pub(crate) descriptor: Arc<ConnectionDescriptor>,

    /// Tool router for dispatching tool calls.
    pub(crate) tool_router: ToolRouter<Self>,
}

impl MssqlMcpServer {
    /// Create a new server instance from a resolved descriptor.
    pub fn new(descriptor: ConnectionDescriptor) -> Self {
        Self {
            descriptor: Arc::new(descriptor),
            tool_router: Self::tool_router(),
        }
    }

    /// Create a server from environment variables.
    ///
    /// This is the standard way to create a server for production use.
    pub fn from_env() -> Result<Self, ServerError> {
        Ok(Self::new(ConnectionDescriptor::from_env()?))
    }

    /// Get a reference to the connection descriptor.
    pub fn descriptor(&self) -> &ConnectionDescriptor {
        &self.descriptor
    }

    /// Open a fresh connection using the configured authentication method.
    pub(crate) async fn open_connection(&self) -> Result<RawConnection, ServerError> {
        database::connect(&self.descriptor).await
    }

    /// Verify connectivity at startup.
    ///
    /// Opens a connection and reports the session's database and login, so a
    /// misconfigured authentication method fails before the server starts
    /// answering requests.
    pub async fn startup_check(&self) -> Result<String, ServerError> {
        let mut client = self.open_connection().await?;
        let outcome = database::query::execute(
            &mut client,
            "SELECT @@VERSION, DB_NAME(), SYSTEM_USER",
        )
        .await?;

        if let database::QueryOutcome::Rows(result) = outcome {
            if let Some(row) = result.rows.first() {
                if let Some(version) = row.first() {
                    debug!("SQL Server version: {}", version);
                }
                let db = row.get(1).map(|v| v.to_string()).unwrap_or_default();
                let user = row.get(2).map(|v| v.to_string()).unwrap_or_default();
                return Ok(format!("{} as {}", db, user));
            }
        }
        Ok("connected".to_string())
    }
}
