//! Query-execution capability.
//!
//! The planner never owns a database connection. It is handed a
//! [`Connection`] and goes through `prepare` → `execute` → drain →
//! `release` for every query. Result sets are released explicitly and
//! [`fetch_rows`] releases them on every exit path, drain failures
//! included.

use std::collections::VecDeque;

use async_trait::async_trait;
use oxide_mysql::{decode_row, encode_params, ColumnMeta, MySqlValue, Value};
use tracing::debug;

use crate::error::{MigrateError, Result};

/// A source of prepared statements.
#[async_trait]
pub trait Connection: Send {
    /// Prepares `sql` for execution.
    async fn prepare<'a>(&'a mut self, sql: &str) -> Result<Box<dyn Statement + 'a>>;
}

/// A prepared statement.
#[async_trait]
pub trait Statement: Send {
    /// Executes the statement with already-encoded parameters.
    async fn execute(&mut self, params: &[MySqlValue]) -> Result<Execution>;
}

/// Outcome of executing a statement.
pub enum Execution {
    /// Number of rows affected by a write.
    Affected(u64),
    /// Rows returned by a query. Must be released once drained.
    Rows(Box<dyn ResultSet>),
}

impl std::fmt::Debug for Execution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Affected(n) => f.debug_tuple("Affected").field(n).finish(),
            Self::Rows(rows) => f.debug_tuple("Rows").field(&rows.columns()).finish(),
        }
    }
}

/// A stream of rows held open until released.
#[async_trait]
pub trait ResultSet: Send {
    /// Metadata of the returned columns.
    fn columns(&self) -> &[ColumnMeta];

    /// Returns the next row, or `None` once the set is drained.
    async fn next_row(&mut self) -> Result<Option<Vec<MySqlValue>>>;

    /// Releases the result set.
    async fn release(self: Box<Self>) -> Result<()>;
}

/// A result set held entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryResultSet {
    columns: Vec<ColumnMeta>,
    rows: VecDeque<Vec<MySqlValue>>,
}

impl MemoryResultSet {
    /// Creates a result set over the given rows.
    #[must_use]
    pub fn new(columns: Vec<ColumnMeta>, rows: Vec<Vec<MySqlValue>>) -> Self {
        Self {
            columns,
            rows: rows.into(),
        }
    }

    /// Creates a result set with no columns and no rows.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ResultSet for MemoryResultSet {
    fn columns(&self) -> &[ColumnMeta] {
        &self.columns
    }

    async fn next_row(&mut self) -> Result<Option<Vec<MySqlValue>>> {
        Ok(self.rows.pop_front())
    }

    async fn release(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

/// Rows fetched by [`fetch_rows`], still in wire form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchedRows {
    /// Column metadata.
    pub columns: Vec<ColumnMeta>,
    /// Rows in the order the server returned them.
    pub rows: Vec<Vec<MySqlValue>>,
}

/// Runs a query and drains its result set.
///
/// # Errors
///
/// Fails if a parameter cannot be encoded, if the connection fails, or
/// if the statement reports an affected-row count instead of rows. A
/// drain failure is reported in preference to a release failure.
pub async fn fetch_rows<C>(conn: &mut C, sql: &str, params: &[Value]) -> Result<FetchedRows>
where
    C: Connection + ?Sized,
{
    let params = encode_params(params)?;
    debug!(sql = %sql, params = params.len(), "Running query");

    let mut statement = conn.prepare(sql).await?;
    let mut result_set = match statement.execute(&params).await? {
        Execution::Rows(rows) => rows,
        Execution::Affected(n) => {
            return Err(MigrateError::UnexpectedResult(format!(
                "{n} row(s) affected by `{sql}`"
            )));
        }
    };

    let columns = result_set.columns().to_vec();
    let drained = drain(result_set.as_mut()).await;
    let released = result_set.release().await;

    let rows = drained?;
    released?;
    Ok(FetchedRows { columns, rows })
}

async fn drain(result_set: &mut dyn ResultSet) -> Result<Vec<Vec<MySqlValue>>> {
    let mut rows = Vec::new();
    while let Some(row) = result_set.next_row().await? {
        rows.push(row);
    }
    Ok(rows)
}

/// Runs a query and decodes every row into application values.
///
/// # Errors
///
/// See [`fetch_rows`]. Also fails if a returned value cannot be
/// decoded.
pub async fn query_values<C>(conn: &mut C, sql: &str, params: &[Value]) -> Result<Vec<Vec<Value>>>
where
    C: Connection + ?Sized,
{
    let fetched = fetch_rows(conn, sql, params).await?;
    fetched
        .rows
        .into_iter()
        .map(|row| decode_row(row, &fetched.columns).map_err(MigrateError::from))
        .collect()
}

/// Runs a write statement and returns the affected-row count.
///
/// # Errors
///
/// Fails if a parameter cannot be encoded, if the connection fails, or
/// if the statement returns rows. Returned rows are released before
/// the error is reported.
pub async fn execute<C>(conn: &mut C, sql: &str, params: &[Value]) -> Result<u64>
where
    C: Connection + ?Sized,
{
    let params = encode_params(params)?;
    let mut statement = conn.prepare(sql).await?;
    match statement.execute(&params).await? {
        Execution::Affected(n) => Ok(n),
        Execution::Rows(rows) => {
            rows.release().await?;
            Err(MigrateError::UnexpectedResult(format!(
                "`{sql}` returned rows"
            )))
        }
    }
}

/// A catalog that reports nothing: every query returns no rows.
///
/// Planning against it takes the create-table path for every entity,
/// which is how previews run without a database.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyCatalog;

struct EmptyStatement;

#[async_trait]
impl Connection for EmptyCatalog {
    async fn prepare<'a>(&'a mut self, _sql: &str) -> Result<Box<dyn Statement + 'a>> {
        Ok(Box::new(EmptyStatement))
    }
}

#[async_trait]
impl Statement for EmptyStatement {
    async fn execute(&mut self, _params: &[MySqlValue]) -> Result<Execution> {
        Ok(Execution::Rows(Box::new(MemoryResultSet::empty())))
    }
}
