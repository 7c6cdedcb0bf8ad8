//! MSSQL Entra MCP Server entry point.
//!
//! Starts the MCP server on stdio transport for integration with Claude
//! Desktop, Cursor, and other MCP clients. Configuration is resolved from
//! `MSSQL_*` environment variables before serving; a connection test runs at
//! startup so authentication failures surface immediately.

use anyhow::Result;
use mssql_entra_mcp_server::{ConnectionDescriptor, MssqlMcpServer};
use rmcp::ServiceExt;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging to stderr (stdout is reserved for JSON-RPC)
    init_logging();

    let version = env!("CARGO_PKG_VERSION");
    eprintln!("MSSQL Entra MCP Server v{version} starting...");
    eprintln!("Transport: stdio");

    // Resolve configuration from environment
    let descriptor = ConnectionDescriptor::from_env()?;
    info!("Authentication method: {}", descriptor.auth_method());
    info!(
        "Database config: {}/{}",
        descriptor.server, descriptor.database
    );
    info!(
        "Azure authentication support compiled in: {}",
        cfg!(feature = "azure-auth")
    );

    let server = MssqlMcpServer::new(descriptor);

    // Test connection on startup
    match server.startup_check().await {
        Ok(session) => info!("Connection test successful: connected to {}", session),
        Err(e) => {
            error!("Database connection test failed: {}", e);
            return Err(e.into());
        }
    }

    eprintln!("Server initialized. Ready to accept requests...");

    let service = server.serve(rmcp::transport::stdio()).await?;
    service.waiting().await?;

    Ok(())
}

/// Initialize tracing subscriber with stderr output.
///
/// Logs MUST go to stderr because stdout is used for JSON-RPC communication.
fn init_logging() {
    let filter = std::env::var("RUST_LOG")
        .map(EnvFilter::new)
        .unwrap_or_else(|_| EnvFilter::new("warn,mssql_entra_mcp_server=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}
