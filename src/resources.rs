//! MCP Resources exposing SQL Server tables.
//!
//! Each user table in the current database is exposed as a resource at
//! `mssql://{table}/data`; reading it returns the first rows of the table as
//! CSV-style text.

use crate::database::query::{self, TABLE_PREVIEW_ROWS};
use crate::error::ServerError;
use crate::server::MssqlMcpServer;
use rmcp::model::{AnnotateAble, RawResource, ReadResourceResult, Resource, ResourceContents};
use tracing::{info, warn};

/// Build the list of available resources by querying the database for user
/// tables.
///
/// A database error yields an empty list rather than a protocol failure, so
/// clients can still initialize against an unreachable server.
pub async fn build_resource_list(server: &MssqlMcpServer) -> Vec<Resource> {
    let tables = match list_tables(server).await {
        Ok(tables) => tables,
        Err(e) => {
            warn!("Failed to list resources: {}", e);
            return Vec::new();
        }
    };

    info!("Found {} tables", tables.len());

    tables
        .iter()
        .map(|table| {
            create_resource(
                &format!("mssql://{}/data", table),
                &format!("Table: {}", table),
                &format!("Data in table: {}", table),
            )
        })
        .collect()
}

async fn list_tables(server: &MssqlMcpServer) -> Result<Vec<String>, ServerError> {
    let mut client = server.open_connection().await?;
    query::list_tables(&mut client).await
}

/// Read a table resource by URI.
pub async fn read_resource(
    server: &MssqlMcpServer,
    uri: &str,
) -> Result<ReadResourceResult, ServerError> {
    let table = parse_resource_uri(uri)?;
    info!("Reading resource: {}", uri);

    let mut client = server.open_connection().await?;
    let result = query::read_table_rows(&mut client, &table, TABLE_PREVIEW_ROWS).await?;

    Ok(ReadResourceResult {
        contents: vec![ResourceContents::text(result.to_csv_text(), uri.to_string())],
    })
}

/// Parse a `mssql://{table}/data` URI into the table name.
fn parse_resource_uri(uri: &str) -> Result<String, ServerError> {
    let path = uri
        .strip_prefix("mssql://")
        .ok_or_else(|| ServerError::invalid_input(format!("Invalid URI scheme: {}", uri)))?;

    let table = path.split('/').next().unwrap_or_default();
    if table.is_empty() {
        return Err(ServerError::invalid_input(format!(
            "Invalid resource URI '{}': missing table name",
            uri
        )));
    }

    Ok(table.to_string())
}

/// Create a resource definition.
fn create_resource(uri: &str, name: &str, description: &str) -> Resource {
    let mut resource = RawResource::new(uri, name);
    resource.description = Some(description.to_string());
    resource.mime_type = Some("text/plain".to_string());
    resource.no_annotation()
}
