//! Query execution and result handling.
//!
//! Results are rendered as CSV-style text (header row, `NULL` for nulls),
//! matching what SQL-literate MCP clients expect from this server.

use crate::error::ServerError;
use std::fmt;
use tiberius::Row;

use super::auth::RawConnection;

/// Maximum length for SQL Server identifiers.
const MAX_IDENTIFIER_LENGTH: usize = 128;

/// Rows returned when reading a table through a resource.
pub const TABLE_PREVIEW_ROWS: usize = 100;

/// A single SQL value converted to a displayable Rust type.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Bool(bool),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    String(String),
    Decimal(rust_decimal::Decimal),
    Uuid(uuid::Uuid),
    Date(chrono::NaiveDate),
    Time(chrono::NaiveTime),
    DateTime(chrono::NaiveDateTime),
    Bytes(Vec<u8>),
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Null => f.write_str("NULL"),
            SqlValue::Bool(v) => write!(f, "{}", v),
            SqlValue::I16(v) => write!(f, "{}", v),
            SqlValue::I32(v) => write!(f, "{}", v),
            SqlValue::I64(v) => write!(f, "{}", v),
            SqlValue::F32(v) => write!(f, "{}", v),
            SqlValue::F64(v) => write!(f, "{}", v),
            SqlValue::String(v) => f.write_str(v),
            SqlValue::Decimal(v) => write!(f, "{}", v),
            SqlValue::Uuid(v) => write!(f, "{}", v),
            SqlValue::Date(v) => write!(f, "{}", v),
            SqlValue::Time(v) => write!(f, "{}", v),
            SqlValue::DateTime(v) => write!(f, "{}", v),
            SqlValue::Bytes(v) => {
                f.write_str("0x")?;
                for b in v {
                    write!(f, "{:02X}", b)?;
                }
                Ok(())
            }
        }
    }
}

/// Extract a value from a tiberius row column, probing types in order of
/// likelihood. Unsupported types fall back to NULL.
fn extract_column(row: &Row, idx: usize) -> SqlValue {
    if let Some(v) = row.try_get::<&str, _>(idx).ok().flatten() {
        return SqlValue::String(v.to_string());
    }
    if let Some(v) = row.try_get::<i32, _>(idx).ok().flatten() {
        return SqlValue::I32(v);
    }
    if let Some(v) = row.try_get::<i64, _>(idx).ok().flatten() {
        return SqlValue::I64(v);
    }
    if let Some(v) = row.try_get::<i16, _>(idx).ok().flatten() {
        return SqlValue::I16(v);
    }
    // TINYINT surfaces as u8 in tiberius
    if let Some(v) = row.try_get::<u8, _>(idx).ok().flatten() {
        return SqlValue::I16(v as i16);
    }
    if let Some(v) = row.try_get::<f64, _>(idx).ok().flatten() {
        return SqlValue::F64(v);
    }
    if let Some(v) = row.try_get::<f32, _>(idx).ok().flatten() {
        return SqlValue::F32(v);
    }
    if let Some(v) = row.try_get::<rust_decimal::Decimal, _>(idx).ok().flatten() {
        return SqlValue::Decimal(v);
    }
    if let Some(v) = row.try_get::<bool, _>(idx).ok().flatten() {
        return SqlValue::Bool(v);
    }
    if let Some(v) = row.try_get::<uuid::Uuid, _>(idx).ok().flatten() {
        return SqlValue::Uuid(v);
    }
    if let Some(v) = row.try_get::<chrono::NaiveDateTime, _>(idx).ok().flatten() {
        return SqlValue::DateTime(v);
    }
    if let Some(v) = row.try_get::<chrono::NaiveDate, _>(idx).ok().flatten() {
        return SqlValue::Date(v);
    }
    if let Some(v) = row.try_get::<chrono::NaiveTime, _>(idx).ok().flatten() {
        return SqlValue::Time(v);
    }
    if let Some(v) = row.try_get::<&[u8], _>(idx).ok().flatten() {
        return SqlValue::Bytes(v.to_vec());
    }
    SqlValue::Null
}

/// A result set from a SELECT query.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    /// Column names in order.
    pub columns: Vec<String>,
    /// Result rows.
    pub rows: Vec<Vec<SqlValue>>,
}

impl QueryResult {
    /// Render as CSV-style text: header row, then one line per row, with
    /// `NULL` for null values.
    pub fn to_csv_text(&self) -> String {
        let mut lines = Vec::with_capacity(self.rows.len() + 1);
        lines.push(self.columns.join(","));
        for row in &self.rows {
            let values: Vec<String> = row.iter().map(|v| v.to_string()).collect();
            lines.push(values.join(","));
        }
        lines.join("\n")
    }
}

/// The outcome of executing an arbitrary SQL statement.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    /// A SELECT produced a result set.
    Rows(QueryResult),
    /// A SELECT produced no result description.
    NoResults,
    /// A non-SELECT statement affected this many rows.
    RowsAffected(u64),
}

/// Check whether a statement is a SELECT (result-set producing) query.
pub fn is_select(sql: &str) -> bool {
    sql.trim_start()
        .get(..6)
        .map(|prefix| prefix.eq_ignore_ascii_case("select"))
        .unwrap_or(false)
}

/// Execute an arbitrary SQL statement.
///
/// SELECT statements stream their first result set; other statements report
/// the affected row count. Driver errors are mapped through
/// [`crate::error::from_sql_error`] and otherwise passed through unmodified.
pub async fn execute(client: &mut RawConnection, sql: &str) -> Result<QueryOutcome, ServerError> {
    if is_select(sql) {
        let stream = client.query(sql, &[]).await?;
        let result = collect_first_result(stream).await?;
        match result {
            Some(result) => Ok(QueryOutcome::Rows(result)),
            None => Ok(QueryOutcome::NoResults),
        }
    } else {
        let result = client.execute(sql, &[]).await?;
        Ok(QueryOutcome::RowsAffected(result.total()))
    }
}

/// Drain the first result set of a query stream into a [`QueryResult`].
async fn collect_first_result(
    mut stream: tiberius::QueryStream<'_>,
) -> Result<Option<QueryResult>, ServerError> {
    let columns: Vec<String> = match stream.columns().await? {
        Some(columns) => columns.iter().map(|c| c.name().to_string()).collect(),
        None => return Ok(None),
    };

    let raw_rows = stream.into_first_result().await?;
    let rows = raw_rows
        .iter()
        .map(|row| (0..columns.len()).map(|i| extract_column(row, i)).collect())
        .collect();

    Ok(Some(QueryResult { columns, rows }))
}

/// List the user tables of the current database, ordered by name.
pub async fn list_tables(client: &mut RawConnection) -> Result<Vec<String>, ServerError> {
    const SQL: &str = "SELECT TABLE_NAME \
                       FROM INFORMATION_SCHEMA.TABLES \
                       WHERE TABLE_TYPE = 'BASE TABLE' \
                       ORDER BY TABLE_NAME";

    let stream = client.query(SQL, &[]).await?;
    let rows = stream.into_first_result().await?;

    Ok(rows
        .iter()
        .filter_map(|row| row.try_get::<&str, _>(0).ok().flatten())
        .map(str::to_string)
        .collect())
}

/// Read the first rows of a table.
pub async fn read_table_rows(
    client: &mut RawConnection,
    table: &str,
    limit: usize,
) -> Result<QueryResult, ServerError> {
    let sql = format!(
        "SELECT TOP {} * FROM {}",
        limit,
        escape_identifier(table)?
    );
    match execute(client, &sql).await? {
        QueryOutcome::Rows(result) => Ok(result),
        _ => Ok(QueryResult {
            columns: Vec::new(),
            rows: Vec::new(),
        }),
    }
}

/// Escape a SQL Server identifier using bracket notation.
///
/// Embedded right brackets are doubled (`a]b` -> `[a]]b]`); identifiers
/// already wrapped in brackets are normalized first.
pub fn escape_identifier(identifier: &str) -> Result<String, ServerError> {
    let trimmed = identifier.trim();

    if trimmed.is_empty() {
        return Err(ServerError::invalid_input("Identifier cannot be empty"));
    }
    if trimmed.len() > MAX_IDENTIFIER_LENGTH {
        return Err(ServerError::invalid_input(format!(
            "Identifier exceeds maximum length of {} characters",
            MAX_IDENTIFIER_LENGTH
        )));
    }

    let clean = if trimmed.starts_with('[') && trimmed.ends_with(']') && trimmed.len() >= 2 {
        &trimmed[1..trimmed.len() - 1]
    } else {
        trimmed
    };

    Ok(format!("[{}]", clean.replace(']', "]]")))
}
