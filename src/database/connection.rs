//! Connection establishment for SQL Server.
//!
//! One connection is opened per operation from a validated descriptor,
//! mirroring the stateless request model of the tool layer. A failed attempt
//! is retried once before the driver's error is reported to the caller.

use super::auth::{configure_auth, create_base_config, parse_server_address, RawConnection};
use crate::config::ConnectionDescriptor;
use crate::error::ServerError;
use tiberius::Client;
use tokio::net::TcpStream;
use tokio_util::compat::TokioAsyncWriteCompatExt;
use tracing::{debug, warn};

/// Open a connection to SQL Server using the descriptor's authentication
/// method.
///
/// The full flow: build the tiberius config, configure authentication
/// (acquiring an Entra token if the method needs one), connect TCP within the
/// configured timeout, and perform the TDS handshake.
pub async fn connect(descriptor: &ConnectionDescriptor) -> Result<RawConnection, ServerError> {
    match try_connect(descriptor).await {
        Ok(client) => Ok(client),
        Err(first) => {
            warn!("Connection attempt failed, retrying once: {}", first);
            try_connect(descriptor).await
        }
    }
}

async fn try_connect(descriptor: &ConnectionDescriptor) -> Result<RawConnection, ServerError> {
    let base_config = create_base_config(descriptor)?;
    let config = configure_auth(base_config, descriptor).await?;

    let (host, port) = parse_server_address(&descriptor.server)?;
    let address = format!("{}:{}", host, port);
    debug!("Connecting to {} as {}", address, descriptor.auth_method());

    let tcp = tokio::time::timeout(descriptor.connection_timeout, TcpStream::connect(&address))
        .await
        .map_err(|_| {
            ServerError::connection(format!(
                "Timed out connecting to {} after {} seconds",
                address,
                descriptor.connection_timeout.as_secs()
            ))
        })?
        .map_err(|e| ServerError::connection(format!("Failed to connect to {}: {}", address, e)))?;

    tcp.set_nodelay(true)
        .map_err(|e| ServerError::connection(format!("Failed to set TCP_NODELAY: {}", e)))?;

    let client = Client::connect(config, tcp.compat_write())
        .await
        .map_err(ServerError::from)?;

    debug!("Connection established successfully");
    Ok(client)
}
