//! # MSSQL Entra MCP Server
//!
//! A Model Context Protocol (MCP) server for Microsoft SQL Server and Azure
//! SQL with Entra ID authentication support.
//!
//! This crate provides:
//! - **Resources**: Browse user tables and preview their data
//! - **Tools**: Execute SQL statements and inspect the auth configuration
//! - **Authentication**: SQL login, Windows integrated, and five Entra ID
//!   methods resolved from `MSSQL_*` environment variables
//!
//! ## Architecture
//!
//! The [`config`] module resolves environment inputs into an immutable
//! [`ConnectionDescriptor`] — a pure step that validates the fields required
//! by the selected authentication method before any connection is attempted.
//! The [`database`] module consumes descriptors: it maps them onto the
//! tiberius driver and, for Entra ID methods, onto the Azure identity SDK.

pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod resources;
pub mod server;
pub mod tools;

pub use config::{AuthMethod, ConfigError, ConnectionDescriptor, ConnectionInputs};
pub use error::ServerError;
pub use server::MssqlMcpServer;
