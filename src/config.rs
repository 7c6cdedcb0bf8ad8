//! Connection configuration and authentication-method resolution.
//!
//! Configuration is loaded from `MSSQL_*` environment variables following the
//! 12-factor app pattern, then resolved into an immutable
//! [`ConnectionDescriptor`]. Resolution is a pure function: it validates the
//! fields required by the selected authentication method and either returns a
//! complete descriptor or a structured [`ConfigError`]. It never performs I/O
//! and never produces a partially-validated descriptor.

use serde_json::json;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Default connection timeout in seconds.
pub const DEFAULT_CONNECTION_TIMEOUT_SECS: u64 = 30;

/// Errors produced while resolving connection configuration.
///
/// All variants are configuration-time and non-retryable: the caller must fix
/// the inputs, not retry the call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A field required by the selected authentication method is absent or empty.
    #[error("missing required configuration field '{0}'")]
    MissingField(&'static str),

    /// The authentication method selector is not one of the recognized values.
    #[error("unsupported authentication method '{0}'")]
    UnknownAuthMethod(String),

    /// A boolean or integer field failed to parse.
    #[error("invalid value '{value}' for field '{field}'")]
    InvalidValue {
        field: &'static str,
        value: String,
    },
}

impl ConfigError {
    fn invalid(field: &'static str, value: impl Into<String>) -> Self {
        Self::InvalidValue {
            field,
            value: value.into(),
        }
    }
}

/// The supported authentication methods.
///
/// Selected via `MSSQL_AUTH_METHOD`. Unset defaults to [`AuthMethod::Sql`];
/// an unrecognized value is an error rather than a silent fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod {
    /// Windows authentication (SSPI, OS credentials).
    Windows,
    /// SQL Server authentication (username/password).
    Sql,
    /// Entra ID username/password.
    EntraPassword,
    /// Entra ID service principal (client credentials grant).
    EntraServicePrincipal,
    /// Entra ID managed identity (system- or user-assigned).
    EntraManagedIdentity,
    /// Entra ID integrated authentication (OS credentials against Entra).
    EntraIntegrated,
    /// Entra ID interactive / default-credential discovery chain.
    EntraInteractive,
}

impl AuthMethod {
    /// All methods, in selector order.
    pub const ALL: [AuthMethod; 7] = [
        AuthMethod::Windows,
        AuthMethod::Sql,
        AuthMethod::EntraPassword,
        AuthMethod::EntraServicePrincipal,
        AuthMethod::EntraManagedIdentity,
        AuthMethod::EntraIntegrated,
        AuthMethod::EntraInteractive,
    ];

    /// The selector string for this method.
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMethod::Windows => "windows",
            AuthMethod::Sql => "sql",
            AuthMethod::EntraPassword => "entra_password",
            AuthMethod::EntraServicePrincipal => "entra_service_principal",
            AuthMethod::EntraManagedIdentity => "entra_managed_identity",
            AuthMethod::EntraIntegrated => "entra_integrated",
            AuthMethod::EntraInteractive => "entra_interactive",
        }
    }
}

impl fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthMethod {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "windows" => Ok(AuthMethod::Windows),
            "sql" => Ok(AuthMethod::Sql),
            "entra_password" => Ok(AuthMethod::EntraPassword),
            "entra_service_principal" => Ok(AuthMethod::EntraServicePrincipal),
            "entra_managed_identity" => Ok(AuthMethod::EntraManagedIdentity),
            "entra_integrated" => Ok(AuthMethod::EntraIntegrated),
            "entra_interactive" => Ok(AuthMethod::EntraInteractive),
            _ => Err(ConfigError::UnknownAuthMethod(s.to_string())),
        }
    }
}

/// A secret value (password, client secret).
///
/// Wraps the string so that `Debug` output and diagnostics report presence
/// without echoing the value. Only [`Secret::expose`] yields the raw string,
/// at the single point where it is handed to the driver or the identity SDK.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Access the underlying value.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(\"***\")")
    }
}

/// The credential payload of a resolved descriptor.
///
/// One variant per authentication method, carrying exactly the fields that
/// method needs, so the per-method validation table is exhaustive at compile
/// time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedAuth {
    /// OS credentials via SSPI. No payload.
    Windows,
    /// SQL Server login.
    Sql { user: String, password: Secret },
    /// Entra ID username/password.
    EntraPassword { user: String, password: Secret },
    /// Entra ID service principal. Tenant is optional; the identity SDK
    /// discovers it when absent.
    EntraServicePrincipal {
        client_id: String,
        client_secret: Secret,
        tenant_id: Option<String>,
    },
    /// Managed identity; `client_id` selects a user-assigned identity,
    /// `None` means system-assigned.
    EntraManagedIdentity { client_id: Option<String> },
    /// OS credentials against Entra. No payload.
    EntraIntegrated,
    /// Delegate to the default-credential discovery chain. No payload.
    EntraInteractive,
}

impl ResolvedAuth {
    /// The method this payload belongs to.
    pub fn method(&self) -> AuthMethod {
        match self {
            ResolvedAuth::Windows => AuthMethod::Windows,
            ResolvedAuth::Sql { .. } => AuthMethod::Sql,
            ResolvedAuth::EntraPassword { .. } => AuthMethod::EntraPassword,
            ResolvedAuth::EntraServicePrincipal { .. } => AuthMethod::EntraServicePrincipal,
            ResolvedAuth::EntraManagedIdentity { .. } => AuthMethod::EntraManagedIdentity,
            ResolvedAuth::EntraIntegrated => AuthMethod::EntraIntegrated,
            ResolvedAuth::EntraInteractive => AuthMethod::EntraInteractive,
        }
    }
}

/// Raw configuration inputs, prior to resolution.
///
/// Every field is optional at this level; which ones are required depends on
/// the selected authentication method. Built from the environment via
/// [`ConnectionInputs::from_env`], or constructed directly in tests.
#[derive(Default, Clone)]
pub struct ConnectionInputs {
    pub auth_method: Option<String>,
    pub server: Option<String>,
    pub database: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub tenant_id: Option<String>,
    pub encrypt: Option<String>,
    pub trust_server_certificate: Option<String>,
    pub connection_timeout: Option<String>,
}

impl ConnectionInputs {
    /// Read inputs from the environment.
    ///
    /// # Environment Variables
    ///
    /// - `MSSQL_AUTH_METHOD`: `windows`, `sql` (default), `entra_password`,
    ///   `entra_service_principal`, `entra_managed_identity`,
    ///   `entra_integrated`, `entra_interactive`
    /// - `MSSQL_SERVER`: server address, optionally `host,port` (required)
    /// - `MSSQL_DATABASE`: database name (required)
    /// - `MSSQL_USER` / `MSSQL_PASSWORD`: SQL or Entra password login
    /// - `MSSQL_CLIENT_ID` / `MSSQL_CLIENT_SECRET` / `MSSQL_TENANT_ID`:
    ///   service principal, or user-assigned managed identity (`CLIENT_ID`)
    /// - `MSSQL_ENCRYPT`: `yes`/`no` (default `yes`)
    /// - `MSSQL_TRUST_SERVER_CERTIFICATE`: `yes`/`no` (default `no`)
    /// - `MSSQL_CONNECTION_TIMEOUT`: positive integer seconds (default 30)
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok();
        Self {
            auth_method: var("MSSQL_AUTH_METHOD"),
            server: var("MSSQL_SERVER"),
            database: var("MSSQL_DATABASE"),
            user: var("MSSQL_USER"),
            password: var("MSSQL_PASSWORD"),
            client_id: var("MSSQL_CLIENT_ID"),
            client_secret: var("MSSQL_CLIENT_SECRET"),
            tenant_id: var("MSSQL_TENANT_ID"),
            encrypt: var("MSSQL_ENCRYPT"),
            trust_server_certificate: var("MSSQL_TRUST_SERVER_CERTIFICATE"),
            connection_timeout: var("MSSQL_CONNECTION_TIMEOUT"),
        }
    }
}

impl fmt::Debug for ConnectionInputs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionInputs")
            .field("auth_method", &self.auth_method)
            .field("server", &self.server)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "***"))
            .field("tenant_id", &self.tenant_id)
            .field("encrypt", &self.encrypt)
            .field("trust_server_certificate", &self.trust_server_certificate)
            .field("connection_timeout", &self.connection_timeout)
            .finish()
    }
}

/// The resolved, validated connection configuration.
///
/// Immutable once produced. One descriptor is built per connection attempt.
/// Invariant: a descriptor is only constructed when every field required by
/// its authentication method is present and non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionDescriptor {
    /// Server address as supplied, e.g. `myserver.database.windows.net,1433`.
    pub server: String,
    /// Database name.
    pub database: String,
    /// Credential payload for the selected authentication method.
    pub auth: ResolvedAuth,
    /// Enable TLS encryption.
    pub encrypt: bool,
    /// Trust the server certificate (self-signed certs).
    pub trust_server_certificate: bool,
    /// Connection timeout.
    pub connection_timeout: Duration,
}

impl ConnectionDescriptor {
    /// Resolve raw inputs into a validated descriptor.
    ///
    /// Pure and deterministic: identical inputs yield structurally equal
    /// descriptors. Fields not used by the selected method are ignored, not
    /// validated.
    pub fn resolve(inputs: &ConnectionInputs) -> Result<Self, ConfigError> {
        let server = required("server", &inputs.server)?;
        let database = required("database", &inputs.database)?;

        let method = match non_empty(&inputs.auth_method) {
            Some(selector) => selector.parse::<AuthMethod>()?,
            None => AuthMethod::Sql,
        };

        let auth = match method {
            AuthMethod::Windows => ResolvedAuth::Windows,
            AuthMethod::Sql => ResolvedAuth::Sql {
                user: required("user", &inputs.user)?.to_string(),
                password: Secret::new(required("password", &inputs.password)?),
            },
            AuthMethod::EntraPassword => ResolvedAuth::EntraPassword {
                user: required("user", &inputs.user)?.to_string(),
                password: Secret::new(required("password", &inputs.password)?),
            },
            AuthMethod::EntraServicePrincipal => ResolvedAuth::EntraServicePrincipal {
                client_id: required("client_id", &inputs.client_id)?.to_string(),
                client_secret: Secret::new(required("client_secret", &inputs.client_secret)?),
                tenant_id: non_empty(&inputs.tenant_id).map(str::to_string),
            },
            AuthMethod::EntraManagedIdentity => ResolvedAuth::EntraManagedIdentity {
                client_id: non_empty(&inputs.client_id).map(str::to_string),
            },
            AuthMethod::EntraIntegrated => ResolvedAuth::EntraIntegrated,
            AuthMethod::EntraInteractive => ResolvedAuth::EntraInteractive,
        };

        let encrypt = parse_yes_no("encrypt", &inputs.encrypt, true)?;
        let trust_server_certificate = parse_yes_no(
            "trust_server_certificate",
            &inputs.trust_server_certificate,
            false,
        )?;
        let connection_timeout = parse_timeout(&inputs.connection_timeout)?;

        Ok(Self {
            server: server.to_string(),
            database: database.to_string(),
            auth,
            encrypt,
            trust_server_certificate,
            connection_timeout,
        })
    }

    /// Resolve a descriptor from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::resolve(&ConnectionInputs::from_env())
    }

    /// The selected authentication method.
    pub fn auth_method(&self) -> AuthMethod {
        self.auth.method()
    }

    /// Describe this configuration without exposing secret values.
    ///
    /// Secrets are reported as present/absent so the `get_auth_info` tool can
    /// answer without re-reading raw credentials.
    pub fn describe(&self) -> serde_json::Value {
        let credentials = match &self.auth {
            ResolvedAuth::Windows
            | ResolvedAuth::EntraIntegrated
            | ResolvedAuth::EntraInteractive => json!({}),
            ResolvedAuth::Sql { user, .. } | ResolvedAuth::EntraPassword { user, .. } => json!({
                "user": user,
                "password": "present",
            }),
            ResolvedAuth::EntraServicePrincipal {
                client_id,
                tenant_id,
                ..
            } => json!({
                "client_id": client_id,
                "client_secret": "present",
                "tenant_id": tenant_id,
            }),
            ResolvedAuth::EntraManagedIdentity { client_id } => json!({
                "client_id": client_id,
                "identity": if client_id.is_some() { "user-assigned" } else { "system-assigned" },
            }),
        };

        json!({
            "auth_method": self.auth_method().as_str(),
            "server": self.server,
            "database": self.database,
            "encrypt": self.encrypt,
            "trust_server_certificate": self.trust_server_certificate,
            "connection_timeout_seconds": self.connection_timeout.as_secs(),
            "credentials": credentials,
        })
    }
}

/// Treat empty strings the same as unset values.
fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

fn required<'a>(field: &'static str, value: &'a Option<String>) -> Result<&'a str, ConfigError> {
    non_empty(value).ok_or(ConfigError::MissingField(field))
}

/// Parse a `yes`/`no` flag, case-insensitively. Any other literal is an error.
fn parse_yes_no(
    field: &'static str,
    value: &Option<String>,
    default: bool,
) -> Result<bool, ConfigError> {
    match non_empty(value) {
        None => Ok(default),
        Some(v) => match v.to_lowercase().as_str() {
            "yes" => Ok(true),
            "no" => Ok(false),
            _ => Err(ConfigError::invalid(field, v)),
        },
    }
}

/// Parse the connection timeout as a positive integer number of seconds.
fn parse_timeout(value: &Option<String>) -> Result<Duration, ConfigError> {
    match non_empty(value) {
        None => Ok(Duration::from_secs(DEFAULT_CONNECTION_TIMEOUT_SECS)),
        Some(v) => {
            let secs: i64 = v
                .parse()
                .map_err(|_| ConfigError::invalid("connection_timeout", v))?;
            if secs <= 0 {
                return Err(ConfigError::invalid("connection_timeout", v));
            }
            Ok(Duration::from_secs(secs as u64))
        }
    }
}
