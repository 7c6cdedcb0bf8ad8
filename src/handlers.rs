//! ServerHandler implementation for the MSSQL Entra MCP Server.
//!
//! This module implements the rmcp `ServerHandler` trait which defines how
//! the server responds to MCP protocol requests.

use crate::resources::{build_resource_list, read_resource};
use crate::server::MssqlMcpServer;
use rmcp::handler::server::ServerHandler;
use rmcp::model::{
    Implementation, ListResourcesResult, PaginatedRequestParam, ProtocolVersion,
    ReadResourceRequestParam, ReadResourceResult, ServerCapabilities, ServerInfo,
};
use rmcp::service::{RequestContext, RoleServer};
use rmcp::{tool_handler, ErrorData};
use tracing::info;

/// The `#[tool_handler]` macro wires up tool routing automatically.
/// It generates the `list_tools` and `call_tool` method implementations.
#[tool_handler]
impl ServerHandler for MssqlMcpServer {
    /// Server identification - called during initialization handshake.
    fn get_info(&self) -> ServerInfo {
        info!("MCP client requesting server info");

        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,

            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_resources()
                .build(),

            server_info: Implementation {
                name: env!("CARGO_PKG_NAME").to_string(),
                title: Some("MSSQL Entra MCP Server".to_string()),
                version: env!("CARGO_PKG_VERSION").to_string(),
                icons: None,
                website_url: None,
            },

            instructions: Some(build_instructions(self)),
        }
    }

    /// List SQL Server tables as resources.
    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, ErrorData> {
        let resources = build_resource_list(self).await;

        Ok(ListResourcesResult {
            resources,
            next_cursor: None,
        })
    }

    /// Read table contents.
    async fn read_resource(
        &self,
        request: ReadResourceRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, ErrorData> {
        read_resource(self, &request.uri).await.map_err(ErrorData::from)
    }
}

/// Build server instructions based on the resolved configuration.
fn build_instructions(server: &MssqlMcpServer) -> String {
    let descriptor = server.descriptor();
    format!(
        "# MSSQL Entra MCP Server\n\n\
         Connected to `{}` on `{}` using `{}` authentication.\n\n\
         ## Available Operations\n\n\
         - Resources: browse user tables and preview their data\n\
         - `execute_sql`: run SQL statements against the database\n\
         - `get_auth_info`: inspect the active authentication configuration\n",
        descriptor.database,
        descriptor.server,
        descriptor.auth_method(),
    )
}
