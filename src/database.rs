//! Database connectivity for SQL Server and Azure SQL.
//!
//! The resolver ([`crate::config`]) hands this module a validated
//! [`crate::config::ConnectionDescriptor`]; everything here is the
//! driver-invocation side: tiberius configuration, Entra token acquisition,
//! connection establishment, and query execution.

pub mod auth;
pub mod connection;
pub mod query;

pub use auth::RawConnection;
pub use connection::connect;
pub use query::{QueryOutcome, QueryResult, SqlValue};
