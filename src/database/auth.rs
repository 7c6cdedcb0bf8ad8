//! Authentication plumbing for SQL Server connections.
//!
//! Maps a resolved [`ConnectionDescriptor`] onto a tiberius [`Config`]:
//! - SQL Server authentication (username/password)
//! - Windows authentication (SSPI)
//! - Entra ID methods, which all reduce to an access token acquired through
//!   the Azure identity SDK (behind the `azure-auth` feature)
//!
//! Token acquisition is the SDK's job; this module only selects which
//! credential type to ask for and passes the token to the driver.

use crate::config::{ConnectionDescriptor, ResolvedAuth};
use crate::error::ServerError;
use tiberius::{AuthMethod, Client, Config, EncryptionLevel};
use tokio::net::TcpStream;
use tokio_util::compat::Compat;

/// Type alias for a raw tiberius connection.
pub type RawConnection = Client<Compat<TcpStream>>;

/// Application name sent to SQL Server.
const APPLICATION_NAME: &str = "mssql-entra-mcp-server";

/// SQL Server resource URI for Entra ID token acquisition.
#[cfg_attr(not(feature = "azure-auth"), allow(dead_code))]
const AZURE_SQL_RESOURCE: &str = "https://database.windows.net/";

/// Default TDS port.
const DEFAULT_PORT: u16 = 1433;

/// Split a server address into host and port.
///
/// Accepts the ODBC-style `host,port` form used by Azure SQL connection
/// strings (`server.database.windows.net,1433`) as well as `host:port`, with
/// an optional `tcp:` prefix. A missing port defaults to 1433.
pub fn parse_server_address(server: &str) -> Result<(String, u16), ServerError> {
    let server = server.strip_prefix("tcp:").unwrap_or(server);

    let (host, port) = match server.split_once(',').or_else(|| server.split_once(':')) {
        Some((host, port)) => {
            let port = port.trim().parse::<u16>().map_err(|_| {
                ServerError::invalid_input(format!("Invalid port in server address '{}'", server))
            })?;
            (host, port)
        }
        None => (server, DEFAULT_PORT),
    };

    let host = host.trim();
    if host.is_empty() {
        return Err(ServerError::invalid_input(format!(
            "Invalid server address '{}'",
            server
        )));
    }

    Ok((host.to_string(), port))
}

/// Build the base tiberius configuration from a descriptor.
///
/// This covers host, port, database, encryption, and certificate trust, but
/// not authentication; use [`configure_auth`] for that.
pub fn create_base_config(descriptor: &ConnectionDescriptor) -> Result<Config, ServerError> {
    let (host, port) = parse_server_address(&descriptor.server)?;

    let mut config = Config::new();
    config.host(host);
    config.port(port);
    config.database(&descriptor.database);
    config.application_name(APPLICATION_NAME);

    if descriptor.encrypt {
        config.encryption(EncryptionLevel::Required);
    } else {
        config.encryption(EncryptionLevel::Off);
    }

    if descriptor.trust_server_certificate {
        config.trust_cert();
    }

    Ok(config)
}

/// Configure tiberius authentication based on the descriptor's credential
/// payload.
///
/// For Entra ID methods this acquires a fresh access token through the Azure
/// identity SDK.
pub async fn configure_auth(
    mut config: Config,
    descriptor: &ConnectionDescriptor,
) -> Result<Config, ServerError> {
    match &descriptor.auth {
        ResolvedAuth::Sql { user, password } => {
            config.authentication(AuthMethod::sql_server(user, password.expose()));
            Ok(config)
        }
        ResolvedAuth::Windows => {
            #[cfg(windows)]
            {
                config.authentication(AuthMethod::Integrated);
                Ok(config)
            }
            #[cfg(not(windows))]
            {
                Err(ServerError::auth(
                    "Windows authentication is only available on Windows hosts",
                ))
            }
        }
        ResolvedAuth::EntraPassword { .. }
        | ResolvedAuth::EntraServicePrincipal { .. }
        | ResolvedAuth::EntraManagedIdentity { .. }
        | ResolvedAuth::EntraIntegrated
        | ResolvedAuth::EntraInteractive => {
            #[cfg(feature = "azure-auth")]
            {
                let token = entra::acquire_token(&descriptor.auth).await?;
                config.authentication(AuthMethod::aad_token(token));
                Ok(config)
            }
            #[cfg(not(feature = "azure-auth"))]
            {
                Err(ServerError::auth(format!(
                    "Authentication method '{}' requires the 'azure-auth' feature. \
                     Rebuild with: cargo build --features azure-auth",
                    descriptor.auth_method()
                )))
            }
        }
    }
}

/// Entra ID token acquisition via the Azure identity SDK.
#[cfg(feature = "azure-auth")]
mod entra {
    use super::AZURE_SQL_RESOURCE;
    use crate::config::ResolvedAuth;
    use crate::error::ServerError;
    use azure_core::auth::TokenCredential;
    use tracing::debug;

    /// Acquire an access token for Azure SQL using the credential type that
    /// matches the resolved method.
    pub async fn acquire_token(auth: &ResolvedAuth) -> Result<String, ServerError> {
        let credential: std::sync::Arc<dyn TokenCredential> = match auth {
            ResolvedAuth::EntraServicePrincipal {
                client_id,
                client_secret,
                tenant_id,
            } => {
                debug!(
                    "Acquiring Entra token for service principal {}",
                    &client_id[..8.min(client_id.len())]
                );
                // Client-credential grants without an explicit tenant use the
                // multi-tenant authority.
                let tenant = tenant_id.as_deref().unwrap_or("organizations");
                let authority_host: azure_core::Url =
                    format!("https://login.microsoftonline.com/{}", tenant)
                        .parse()
                        .map_err(|e| {
                            ServerError::auth(format!("Invalid tenant ID URL: {}", e))
                        })?;

                std::sync::Arc::new(azure_identity::ClientSecretCredential::new(
                    azure_core::new_http_client(),
                    authority_host,
                    tenant.to_string(),
                    client_id.clone(),
                    client_secret.expose().to_string(),
                ))
            }
            ResolvedAuth::EntraManagedIdentity { client_id } => {
                debug!(
                    "Acquiring Entra token via managed identity ({})",
                    if client_id.is_some() {
                        "user-assigned"
                    } else {
                        "system-assigned"
                    }
                );
                let credential = azure_identity::ImdsManagedIdentityCredential::default();
                let credential = match client_id {
                    Some(id) => credential.with_client_id(id.clone()),
                    None => credential,
                };
                std::sync::Arc::new(credential)
            }
            ResolvedAuth::EntraIntegrated | ResolvedAuth::EntraInteractive => {
                debug!("Acquiring Entra token via default credential chain");
                std::sync::Arc::new(
                    azure_identity::DefaultAzureCredentialBuilder::new()
                        .build()
                        .map_err(|e| {
                            ServerError::auth(format!(
                                "Failed to build default credential chain: {}",
                                e
                            ))
                        })?,
                )
            }
            ResolvedAuth::EntraPassword { .. } => {
                // The resource-owner password grant is not exposed by the
                // Rust Azure SDK.
                return Err(ServerError::auth(
                    "Entra ID password authentication is not supported by the Azure identity \
                     SDK; use entra_interactive or entra_service_principal instead",
                ));
            }
            ResolvedAuth::Windows | ResolvedAuth::Sql { .. } => {
                return Err(ServerError::internal(
                    "non-Entra method routed to token acquisition",
                ));
            }
        };

        let token = credential
            .get_token(&[AZURE_SQL_RESOURCE])
            .await
            .map_err(|e| ServerError::auth(format!("Failed to acquire Entra ID token: {}", e)))?;

        debug!("Entra ID token acquired successfully");
        Ok(token.token.secret().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AuthMethod as ConfiguredMethod, ConnectionDescriptor, ConnectionInputs};

    fn descriptor(method: ConfiguredMethod) -> ConnectionDescriptor {
        let mut inputs = ConnectionInputs {
            auth_method: Some(method.as_str().to_string()),
            server: Some("localhost".to_string()),
            database: Some("master".to_string()),
            ..Default::default()
        };
        if matches!(method, ConfiguredMethod::Sql | ConfiguredMethod::EntraPassword) {
            inputs.user = Some("sa".to_string());
            inputs.password = Some("test".to_string());
        }
        ConnectionDescriptor::resolve(&inputs).unwrap()
    }

    #[test]
    fn test_parse_server_address() {
        assert_eq!(
            parse_server_address("localhost").unwrap(),
            ("localhost".to_string(), 1433)
        );
        assert_eq!(
            parse_server_address("s.database.windows.net,1433").unwrap(),
            ("s.database.windows.net".to_string(), 1433)
        );
        assert_eq!(
            parse_server_address("tcp:myhost,14330").unwrap(),
            ("myhost".to_string(), 14330)
        );
        assert_eq!(
            parse_server_address("myhost:1434").unwrap(),
            ("myhost".to_string(), 1434)
        );
        assert!(parse_server_address("myhost,notaport").is_err());
        assert!(parse_server_address(",1433").is_err());
    }

    #[test]
    fn test_create_base_config() {
        let descriptor = descriptor(ConfiguredMethod::Sql);
        // Config doesn't expose getters; verify construction succeeds.
        create_base_config(&descriptor).unwrap();
    }

    #[tokio::test]
    async fn test_configure_sql_auth() {
        let descriptor = descriptor(ConfiguredMethod::Sql);
        let config = create_base_config(&descriptor).unwrap();
        configure_auth(config, &descriptor).await.unwrap();
    }

    #[cfg(not(windows))]
    #[tokio::test]
    async fn test_windows_auth_rejected_off_windows() {
        let descriptor = descriptor(ConfiguredMethod::Windows);
        let config = create_base_config(&descriptor).unwrap();
        let err = configure_auth(config, &descriptor).await.unwrap_err();
        assert!(matches!(err, ServerError::Authentication(_)));
    }

    #[cfg(not(feature = "azure-auth"))]
    #[tokio::test]
    async fn test_entra_requires_azure_auth_feature() {
        let descriptor = descriptor(ConfiguredMethod::EntraInteractive);
        let config = create_base_config(&descriptor).unwrap();
        let err = configure_auth(config, &descriptor).await.unwrap_err();
        assert!(err.to_string().contains("azure-auth"), "{}", err);
    }
}
