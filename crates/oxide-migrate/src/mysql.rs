//! [`Connection`] backed by a live sqlx MySQL connection.

use async_trait::async_trait;
use futures::TryStreamExt;
use oxide_mysql::{ColumnMeta, MySqlValue};
use rust_decimal::Decimal;
use sqlx::mysql::{MySqlArguments, MySqlColumn, MySqlConnection, MySqlRow};
use sqlx::query::Query;
use sqlx::{Column, Connection as _, Either, Executor, MySql, Row, Statement as _, TypeInfo};
use tracing::debug;

use crate::connection::{Connection, Execution, MemoryResultSet, Statement};
use crate::error::Result;

/// A MySQL connection usable by the planner.
///
/// Whether a statement returns rows is decided by the server: the
/// statement is described first, and rows are fetched in full and
/// served from memory.
#[derive(Debug)]
pub struct SqlxConnection {
    inner: MySqlConnection,
}

impl SqlxConnection {
    /// Connects to a MySQL URL.
    ///
    /// # Errors
    ///
    /// Returns [`crate::MigrateError::Database`] if the connection
    /// cannot be established.
    pub async fn connect(url: &str) -> Result<Self> {
        let inner = MySqlConnection::connect(url).await?;
        debug!("Connected to MySQL");
        Ok(Self { inner })
    }

    /// Wraps an existing sqlx connection.
    #[must_use]
    pub const fn from_connection(inner: MySqlConnection) -> Self {
        Self { inner }
    }

    /// Returns the wrapped connection.
    #[must_use]
    pub fn into_inner(self) -> MySqlConnection {
        self.inner
    }

    /// Closes the connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the server does not acknowledge the close.
    pub async fn close(self) -> Result<()> {
        self.inner.close().await?;
        Ok(())
    }
}

struct SqlxStatement<'a> {
    conn: &'a mut MySqlConnection,
    sql: String,
}

#[async_trait]
impl Connection for SqlxConnection {
    async fn prepare<'a>(&'a mut self, sql: &str) -> Result<Box<dyn Statement + 'a>> {
        Ok(Box::new(SqlxStatement {
            conn: &mut self.inner,
            sql: sql.to_string(),
        }))
    }
}

#[async_trait]
impl<'a> Statement for SqlxStatement<'a> {
    async fn execute(&mut self, params: &[MySqlValue]) -> Result<Execution> {
        // An empty result set still has columns.
        let mut columns = column_meta(
            Executor::prepare(&mut *self.conn, self.sql.as_str())
                .await?
                .columns(),
        );

        let query = params
            .iter()
            .fold(sqlx::query(&self.sql), |query, value| bind(query, value));

        let mut affected = 0;
        let mut rows = Vec::new();
        {
            let mut results = Executor::fetch_many(&mut *self.conn, query);
            while let Some(result) = results.try_next().await? {
                match result {
                    Either::Left(done) => affected += done.rows_affected(),
                    Either::Right(row) => rows.push(row),
                }
            }
        }

        if columns.is_empty() {
            match rows.first() {
                Some(row) => columns = column_meta(row.columns()),
                None => return Ok(Execution::Affected(affected)),
            }
        }

        let values = rows.iter().map(row_values).collect::<Result<Vec<_>>>()?;
        debug!(rows = values.len(), "Fetched rows");
        Ok(Execution::Rows(Box::new(MemoryResultSet::new(columns, values))))
    }
}

fn bind<'q>(
    query: Query<'q, MySql, MySqlArguments>,
    value: &MySqlValue,
) -> Query<'q, MySql, MySqlArguments> {
    match value {
        MySqlValue::Null => query.bind(None::<String>),
        MySqlValue::Tiny(v) => query.bind(*v),
        MySqlValue::Short(v) => query.bind(*v),
        MySqlValue::Long(v) => query.bind(*v),
        MySqlValue::LongLong(v) => query.bind(*v),
        MySqlValue::Unsigned(v) => query.bind(*v),
        MySqlValue::Float(v) => query.bind(*v),
        MySqlValue::Double(v) => query.bind(*v),
        MySqlValue::Decimal(v) | MySqlValue::Text(v) => query.bind(v.clone()),
        MySqlValue::Bytes(v) => query.bind(v.clone()),
        MySqlValue::Date(v) => query.bind(*v),
        MySqlValue::Time(v) => query.bind(*v),
        MySqlValue::DateTime(v) => query.bind(*v),
        MySqlValue::Other { payload, .. } => query.bind(payload.clone()),
    }
}

fn column_meta(columns: &[MySqlColumn]) -> Vec<ColumnMeta> {
    columns
        .iter()
        .map(|column| {
            let meta = ColumnMeta::new(column.name());
            if column.type_info().name() == "BOOLEAN" {
                meta.display_width(1)
            } else {
                meta
            }
        })
        .collect()
}

fn row_values(row: &MySqlRow) -> Result<Vec<MySqlValue>> {
    row.columns()
        .iter()
        .map(|column| column_value(row, column.ordinal(), column.type_info().name()))
        .collect()
}

fn column_value(row: &MySqlRow, index: usize, type_name: &str) -> Result<MySqlValue> {
    let value = match type_name {
        "NULL" => MySqlValue::Null,
        "BOOLEAN" | "TINYINT" => opt(row.try_get::<Option<i8>, _>(index)?, MySqlValue::Tiny),
        "SMALLINT" => opt(row.try_get::<Option<i16>, _>(index)?, MySqlValue::Short),
        "INT" | "MEDIUMINT" => opt(row.try_get::<Option<i32>, _>(index)?, MySqlValue::Long),
        "BIGINT" => opt(row.try_get::<Option<i64>, _>(index)?, MySqlValue::LongLong),
        name if name.ends_with("UNSIGNED") => {
            opt(row.try_get::<Option<u64>, _>(index)?, MySqlValue::Unsigned)
        }
        "FLOAT" => opt(row.try_get::<Option<f32>, _>(index)?, MySqlValue::Float),
        "DOUBLE" => opt(row.try_get::<Option<f64>, _>(index)?, MySqlValue::Double),
        "DECIMAL" => opt(row.try_get::<Option<Decimal>, _>(index)?, |d| {
            MySqlValue::Decimal(d.to_string())
        }),
        "CHAR" | "VARCHAR" | "TINYTEXT" | "TEXT" | "MEDIUMTEXT" | "LONGTEXT" | "ENUM" | "SET" => {
            opt(row.try_get::<Option<String>, _>(index)?, MySqlValue::Text)
        }
        "BINARY" | "VARBINARY" | "TINYBLOB" | "BLOB" | "MEDIUMBLOB" | "LONGBLOB" => {
            opt(row.try_get::<Option<Vec<u8>>, _>(index)?, MySqlValue::Bytes)
        }
        "DATE" => opt(row.try_get::<Option<chrono::NaiveDate>, _>(index)?, MySqlValue::Date),
        "TIME" => opt(row.try_get::<Option<chrono::NaiveTime>, _>(index)?, MySqlValue::Time),
        "DATETIME" | "TIMESTAMP" => opt(
            row.try_get::<Option<chrono::NaiveDateTime>, _>(index)?,
            MySqlValue::DateTime,
        ),
        other => opt(row.try_get_unchecked::<Option<Vec<u8>>, _>(index)?, |payload| {
            MySqlValue::Other {
                type_name: other.to_string(),
                payload,
            }
        }),
    };
    Ok(value)
}

fn opt<T>(value: Option<T>, wrap: impl FnOnce(T) -> MySqlValue) -> MySqlValue {
    value.map_or(MySqlValue::Null, wrap)
}
