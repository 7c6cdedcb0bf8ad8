//! Integration tests for the MSSQL Entra MCP Server.
//!
//! These tests support two modes:
//! 1. **Testcontainers** (default): Automatically spins up SQL Server containers
//! 2. **External server**: Connect to an existing server via MSSQL_TEST_HOST
//!
//! ## Running with testcontainers (requires Docker):
//! ```bash
//! cargo test --test integration_tests -- --ignored --test-threads=1
//! ```
//!
//! ## Running against an external server:
//! ```bash
//! MSSQL_TEST_HOST=localhost MSSQL_TEST_PASSWORD='yourPass' \
//!   cargo test --test integration_tests -- --ignored --test-threads=1
//! ```
//!
//! Note: SQL Server containers require ~2GB RAM and take 30-60 seconds to start.

use mssql_entra_mcp_server::config::{ConnectionDescriptor, ConnectionInputs};
use mssql_entra_mcp_server::database::{self, query, QueryOutcome};
use serial_test::serial;
use std::time::Duration;
use testcontainers::{runners::AsyncRunner, ContainerAsync, ImageExt};
use testcontainers_modules::mssql_server::MssqlServer;

/// Default SA password for testcontainers.
const DEFAULT_SA_PASSWORD: &str = "yourStrong(!)Password";

/// SQL Server image tag under test.
const DEFAULT_VERSION: &str = "2022-latest";

/// Test database source.
#[allow(dead_code)] // Container variant held for lifetime management (Drop)
enum TestDatabaseSource {
    External,
    Container(Box<ContainerAsync<MssqlServer>>),
}

/// Helper managing the test SQL Server.
struct TestDatabase {
    #[allow(dead_code)] // Held for lifetime management (Drop on Container)
    source: TestDatabaseSource,
    host: String,
    port: u16,
    password: String,
}

impl TestDatabase {
    async fn new() -> Self {
        if std::env::var("MSSQL_TEST_HOST").is_ok() {
            Self::from_external()
        } else {
            Self::from_testcontainer().await
        }
    }

    fn from_external() -> Self {
        let host = std::env::var("MSSQL_TEST_HOST").expect("MSSQL_TEST_HOST must be set");
        let port = std::env::var("MSSQL_TEST_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(1433);
        let password = std::env::var("MSSQL_TEST_PASSWORD")
            .unwrap_or_else(|_| DEFAULT_SA_PASSWORD.to_string());

        eprintln!("Using external SQL Server at {}:{}", host, port);

        Self {
            source: TestDatabaseSource::External,
            host,
            port,
            password,
        }
    }

    async fn from_testcontainer() -> Self {
        eprintln!("Starting SQL Server container via testcontainers...");

        let container = MssqlServer::default()
            .with_accept_eula()
            .with_tag(DEFAULT_VERSION)
            .start()
            .await
            .unwrap_or_else(|e| panic!("Failed to start SQL Server container: {}", e));

        let host = container.get_host().await.expect("Failed to get host");
        let port = container
            .get_host_port_ipv4(1433)
            .await
            .expect("Failed to get port");

        // Give SQL Server time to fully initialize
        tokio::time::sleep(Duration::from_secs(5)).await;

        eprintln!("SQL Server container ready at {}:{}", host, port);

        Self {
            source: TestDatabaseSource::Container(Box::new(container)),
            host: host.to_string(),
            port,
            password: DEFAULT_SA_PASSWORD.to_string(),
        }
    }

    /// Connection inputs pointing at the test server with SQL authentication.
    fn inputs(&self) -> ConnectionInputs {
        ConnectionInputs {
            server: Some(format!("{},{}", self.host, self.port)),
            database: Some("master".to_string()),
            user: Some("sa".to_string()),
            password: Some(self.password.clone()),
            encrypt: Some("no".to_string()),
            trust_server_certificate: Some("yes".to_string()),
            ..Default::default()
        }
    }

    fn descriptor(&self) -> ConnectionDescriptor {
        ConnectionDescriptor::resolve(&self.inputs()).expect("resolve failed")
    }
}

#[tokio::test]
#[ignore = "requires Docker"]
#[serial]
async fn test_connect_with_sql_authentication() {
    let db = TestDatabase::new().await;
    let mut client = database::connect(&db.descriptor())
        .await
        .expect("connect failed");

    let outcome = query::execute(&mut client, "SELECT 1 AS test")
        .await
        .expect("query failed");

    match outcome {
        QueryOutcome::Rows(result) => {
            assert_eq!(result.columns, vec!["test".to_string()]);
            assert_eq!(result.rows.len(), 1);
            assert_eq!(result.rows[0][0].to_string(), "1");
        }
        other => panic!("expected rows, got {:?}", other),
    }
}

#[tokio::test]
#[ignore = "requires Docker"]
#[serial]
async fn test_wrong_password_reports_authentication_error() {
    let db = TestDatabase::new().await;
    let mut inputs = db.inputs();
    inputs.password = Some("definitely-wrong".to_string());
    let descriptor = ConnectionDescriptor::resolve(&inputs).expect("resolve failed");

    let err = database::connect(&descriptor)
        .await
        .expect_err("connect should fail");
    let message = err.to_string();
    assert!(
        message.contains("Login failed") || message.contains("Authentication"),
        "unexpected error: {}",
        message
    );
}

#[tokio::test]
#[ignore = "requires Docker"]
#[serial]
async fn test_execute_round_trip_and_row_counts() {
    let db = TestDatabase::new().await;
    let descriptor = db.descriptor();
    let mut client = database::connect(&descriptor).await.expect("connect failed");

    query::execute(
        &mut client,
        "CREATE TABLE #items (id INT, name NVARCHAR(50))",
    )
    .await
    .expect("create failed");

    let outcome = query::execute(
        &mut client,
        "INSERT INTO #items (id, name) VALUES (1, N'alpha'), (2, NULL)",
    )
    .await
    .expect("insert failed");
    assert_eq!(outcome, QueryOutcome::RowsAffected(2));

    let outcome = query::execute(&mut client, "SELECT id, name FROM #items ORDER BY id")
        .await
        .expect("select failed");
    match outcome {
        QueryOutcome::Rows(result) => {
            assert_eq!(result.to_csv_text(), "id,name\n1,alpha\n2,NULL");
        }
        other => panic!("expected rows, got {:?}", other),
    }
}

#[tokio::test]
#[ignore = "requires Docker"]
#[serial]
async fn test_list_tables_orders_by_name() {
    let db = TestDatabase::new().await;
    let descriptor = db.descriptor();
    let mut client = database::connect(&descriptor).await.expect("connect failed");

    query::execute(&mut client, "IF OBJECT_ID('zebra_test') IS NULL CREATE TABLE zebra_test (id INT)")
        .await
        .expect("create failed");
    query::execute(&mut client, "IF OBJECT_ID('apple_test') IS NULL CREATE TABLE apple_test (id INT)")
        .await
        .expect("create failed");

    let tables = query::list_tables(&mut client).await.expect("list failed");
    let apple = tables.iter().position(|t| t == "apple_test");
    let zebra = tables.iter().position(|t| t == "zebra_test");
    assert!(apple.is_some() && zebra.is_some(), "tables: {:?}", tables);
    assert!(apple < zebra, "expected alphabetical order: {:?}", tables);

    query::execute(&mut client, "DROP TABLE zebra_test")
        .await
        .expect("drop failed");
    query::execute(&mut client, "DROP TABLE apple_test")
        .await
        .expect("drop failed");
}

#[tokio::test]
#[ignore = "requires Docker"]
#[serial]
async fn test_read_table_rows_limits_output() {
    let db = TestDatabase::new().await;
    let descriptor = db.descriptor();
    let mut client = database::connect(&descriptor).await.expect("connect failed");

    query::execute(
        &mut client,
        "IF OBJECT_ID('preview_test') IS NULL CREATE TABLE preview_test (id INT)",
    )
    .await
    .expect("create failed");
    for i in 0..5 {
        query::execute(
            &mut client,
            &format!("INSERT INTO preview_test (id) VALUES ({})", i),
        )
        .await
        .expect("insert failed");
    }

    let result = query::read_table_rows(&mut client, "preview_test", 3)
        .await
        .expect("read failed");
    assert_eq!(result.columns, vec!["id".to_string()]);
    assert_eq!(result.rows.len(), 3);

    query::execute(&mut client, "DROP TABLE preview_test")
        .await
        .expect("drop failed");
}
