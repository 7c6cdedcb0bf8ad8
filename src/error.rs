//! Error types for the MSSQL Entra MCP Server.
//!
//! Configuration failures are structured ([`crate::config::ConfigError`]) and
//! non-retryable; driver and authentication failures are passed through with
//! their original messages so callers see exactly what SQL Server or the
//! identity SDK reported.

use crate::config::ConfigError;
use rmcp::ErrorData;
use thiserror::Error;

/// Domain-specific errors for the MSSQL Entra MCP Server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Configuration resolution error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Connection error.
    #[error("Connection error: {message}")]
    Connection {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Authentication error (login failure, token acquisition).
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Database not found.
    #[error("Database not found: {0}")]
    DatabaseNotFound(String),

    /// Object not found (table, view, procedure).
    #[error("{object_type} not found: {name}")]
    ObjectNotFound { object_type: String, name: String },

    /// Permission denied.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Query execution error.
    #[error("Query execution error: {message}")]
    Query {
        message: String,
        sql_error_code: Option<u32>,
    },

    /// Invalid input (bad identifier, empty query).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServerError {
    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection {
            message: msg.into(),
            source: None,
        }
    }

    /// Create a connection error with a source.
    pub fn connection_with_source(
        msg: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Connection {
            message: msg.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an authentication error.
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create a query execution error.
    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query {
            message: msg.into(),
            sql_error_code: None,
        }
    }

    /// Create an invalid input error.
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Get a user-friendly suggestion for how to fix this error.
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::Config(_) => Some("Check your MSSQL_* environment variables"),
            Self::Connection { .. } => {
                Some("Check server hostname, port, and network connectivity")
            }
            Self::Authentication(_) => {
                Some("Verify the credentials for the configured authentication method")
            }
            Self::DatabaseNotFound(_) => Some("Check the database name and ensure it exists"),
            Self::ObjectNotFound { .. } => Some("Check the object name and schema"),
            Self::PermissionDenied(_) => {
                Some("Request appropriate permissions from your database administrator")
            }
            _ => None,
        }
    }
}

/// Map SQL Server error codes to semantic [`ServerError`] values.
pub fn from_sql_error(code: u32, message: &str) -> ServerError {
    match code {
        // Login failed
        18456 => ServerError::auth(format!("Login failed: {}", message)),
        // Azure AD token rejected
        18455 | 33134 => ServerError::auth(message.to_string()),

        // Database errors
        4060 => ServerError::DatabaseNotFound(message.to_string()),

        // Object not found
        208 => ServerError::ObjectNotFound {
            object_type: "Object".to_string(),
            name: message.to_string(),
        },
        2812 => ServerError::ObjectNotFound {
            object_type: "Stored procedure".to_string(),
            name: message.to_string(),
        },

        // Permission errors
        229 | 230 | 262 => ServerError::PermissionDenied(message.to_string()),

        // Default: generic query error carrying the server's code
        _ => ServerError::Query {
            message: message.to_string(),
            sql_error_code: Some(code),
        },
    }
}

impl From<tiberius::error::Error> for ServerError {
    fn from(e: tiberius::error::Error) -> Self {
        use tiberius::error::Error;

        match &e {
            Error::Server(token) => from_sql_error(token.code(), token.message()),
            Error::Io { .. } => ServerError::connection(format!("IO error: {}", e)),
            Error::Tls(msg) => ServerError::connection(format!("TLS error: {}", msg)),
            Error::Routing { host, port } => {
                ServerError::connection(format!("Server requested routing to {}:{}", host, port))
            }
            Error::Protocol(_) => ServerError::connection(format!("Protocol error: {}", e)),
            Error::Conversion(_) => ServerError::query(format!("Type conversion error: {}", e)),
            _ => ServerError::internal(e.to_string()),
        }
    }
}

/// Convert [`ServerError`] to rmcp's `ErrorData` for protocol responses.
///
/// Tool failures generally return `CallToolResult::error` with a message
/// instead; this conversion is for protocol-level errors (resources,
/// initialization).
impl From<ServerError> for ErrorData {
    fn from(e: ServerError) -> Self {
        match &e {
            ServerError::Config(_) => ErrorData::invalid_request(e.to_string(), None),
            ServerError::InvalidInput(msg) => ErrorData::invalid_params(msg.clone(), None),
            ServerError::ObjectNotFound { .. } => ErrorData::invalid_params(e.to_string(), None),
            _ => ErrorData::internal_error(e.to_string(), None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sql_error_mapping() {
        let err = from_sql_error(18456, "Login failed for user 'test'");
        assert!(matches!(err, ServerError::Authentication(_)));

        let err = from_sql_error(208, "Invalid object name 'foo'");
        assert!(matches!(err, ServerError::ObjectNotFound { .. }));

        let err = from_sql_error(229, "SELECT permission denied");
        assert!(matches!(err, ServerError::PermissionDenied(_)));

        let err = from_sql_error(547, "constraint violated");
        assert!(matches!(
            err,
            ServerError::Query {
                sql_error_code: Some(547),
                ..
            }
        ));
    }

    #[test]
    fn test_config_error_conversion() {
        let err: ServerError = ConfigError::MissingField("server").into();
        assert!(err.to_string().contains("server"));
        assert!(err.suggestion().is_some());
    }

    #[test]
    fn test_error_suggestions() {
        assert!(ServerError::auth("Login failed").suggestion().is_some());
        assert!(ServerError::internal("unknown").suggestion().is_none());
    }
}
