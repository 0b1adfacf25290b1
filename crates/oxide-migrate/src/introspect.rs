//! Live schema introspection from `INFORMATION_SCHEMA`.
//!
//! Rows that do not have the expected shape are not errors: they are
//! collected as messages next to the rows that did parse, so a table
//! with a corrupt catalog entry yields a report instead of a plan.
//! Failures of the connection itself, and a column with more than one
//! leading-position foreign key, are returned as [`MigrateError`]s.

use oxide_mysql::{parse_type, CatalogColumnType, MySqlValue, Value};
use tracing::{debug, warn};

use crate::connection::{fetch_rows, Connection};
use crate::error::{MigrateError, Result};
use crate::schema::{ColumnReference, ColumnSchema, EntityDefinition, UniqueConstraint};

/// Selects the identifier column of a table.
pub const ID_COLUMN_QUERY: &str = "SELECT COLUMN_NAME, IS_NULLABLE, DATA_TYPE, COLUMN_TYPE, \
     CHARACTER_MAXIMUM_LENGTH, NUMERIC_PRECISION, NUMERIC_SCALE, COLUMN_DEFAULT \
     FROM INFORMATION_SCHEMA.COLUMNS \
     WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ? AND COLUMN_NAME = ?";

/// Selects every column of a table except the bound one, in table
/// order.
pub const COLUMNS_QUERY: &str = "SELECT COLUMN_NAME, IS_NULLABLE, DATA_TYPE, COLUMN_TYPE, \
     CHARACTER_MAXIMUM_LENGTH, NUMERIC_PRECISION, NUMERIC_SCALE, COLUMN_DEFAULT \
     FROM INFORMATION_SCHEMA.COLUMNS \
     WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ? AND COLUMN_NAME <> ? \
     ORDER BY ORDINAL_POSITION";

/// Selects non-primary unique constraint membership, except for the
/// bound column, ordered so that members of one constraint are
/// adjacent.
pub const UNIQUE_QUERY: &str = "SELECT CONSTRAINT_NAME, COLUMN_NAME \
     FROM INFORMATION_SCHEMA.KEY_COLUMN_USAGE \
     WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ? AND COLUMN_NAME <> ? \
     AND CONSTRAINT_NAME <> 'PRIMARY' AND REFERENCED_TABLE_SCHEMA IS NULL \
     ORDER BY CONSTRAINT_NAME, COLUMN_NAME";

/// Selects the foreign key a column leads, if any.
pub const FOREIGN_KEY_QUERY: &str = "SELECT REFERENCED_TABLE_NAME, CONSTRAINT_NAME, ORDINAL_POSITION \
     FROM INFORMATION_SCHEMA.KEY_COLUMN_USAGE \
     WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ? AND COLUMN_NAME = ? \
     AND REFERENCED_TABLE_SCHEMA = ? AND ORDINAL_POSITION = 1 \
     ORDER BY CONSTRAINT_NAME";

/// A successfully parsed catalog item other than the identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiveItem {
    /// A column.
    Column(ColumnSchema),
    /// A unique constraint with its member columns as returned.
    Unique(UniqueConstraint),
}

/// Everything read from the catalog for one table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LiveSchema {
    /// The identifier column. Empty when the table does not exist.
    pub identifier: Vec<std::result::Result<ColumnSchema, String>>,
    /// Every other column, then every unique constraint.
    pub items: Vec<std::result::Result<LiveItem, String>>,
}

/// Live state of an existing table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableState {
    /// Columns other than an auto-increment identifier, in table order.
    pub columns: Vec<ColumnSchema>,
    /// Unique constraints, with members ordered by column name.
    pub unique_constraints: Vec<UniqueConstraint>,
}

impl LiveSchema {
    /// Splits the catalog read into a table state or its parse errors.
    ///
    /// Returns `Ok(None)` when the identifier column is missing, which
    /// means the table does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns every parse error when at least one row failed.
    pub fn into_table_state(self) -> std::result::Result<Option<TableState>, Vec<String>> {
        let mut errors = Vec::new();
        let mut has_identifier = false;
        for entry in self.identifier {
            match entry {
                Ok(_) => has_identifier = true,
                Err(e) => errors.push(e),
            }
        }

        let mut state = TableState::default();
        for entry in self.items {
            match entry {
                Ok(LiveItem::Column(column)) => state.columns.push(column),
                Ok(LiveItem::Unique(constraint)) => state.unique_constraints.push(constraint),
                Err(e) => errors.push(e),
            }
        }

        if !errors.is_empty() {
            return Err(errors);
        }
        Ok(has_identifier.then_some(state))
    }
}

/// Reads the live schema of `entity`'s table in `database`.
///
/// Queries run one at a time: the identifier, the other columns, then
/// the unique constraints. The foreign key of each column is looked up
/// after the column query has been drained.
///
/// # Errors
///
/// Fails on connection errors and on ambiguous foreign keys. Rows that
/// do not parse are reported inside the returned [`LiveSchema`].
pub async fn introspect<C>(conn: &mut C, database: &str, entity: &EntityDefinition) -> Result<LiveSchema>
where
    C: Connection + ?Sized,
{
    let table = entity.name.as_str();
    let identifier_column = entity.identifier_column();
    let key = [
        Value::from(database),
        Value::from(table),
        Value::from(identifier_column),
    ];
    // MySQL rejects empty column names, so "" excludes nothing.
    let others = [
        Value::from(database),
        Value::from(table),
        Value::from(entity.excluded_column().unwrap_or_default()),
    ];

    debug!(table = %table, column = %identifier_column, "Reading identifier column");
    let rows = fetch_rows(conn, ID_COLUMN_QUERY, &key).await?.rows;
    let mut identifier = Vec::with_capacity(rows.len());
    for row in rows {
        identifier.push(read_column(conn, database, table, row).await?);
    }

    debug!(table = %table, "Reading columns");
    let rows = fetch_rows(conn, COLUMNS_QUERY, &others).await?.rows;
    let mut items = Vec::with_capacity(rows.len());
    for row in rows {
        items.push(read_column(conn, database, table, row).await?.map(LiveItem::Column));
    }

    debug!(table = %table, "Reading unique constraints");
    let rows = fetch_rows(conn, UNIQUE_QUERY, &others).await?.rows;
    items.extend(group_unique_rows(rows).into_iter().map(|c| c.map(LiveItem::Unique)));

    let failures = identifier.iter().filter(|r| r.is_err()).count()
        + items.iter().filter(|r| r.is_err()).count();
    if failures > 0 {
        warn!(table = %table, failures, "Catalog rows failed to parse");
    }

    Ok(LiveSchema { identifier, items })
}

async fn read_column<C>(
    conn: &mut C,
    database: &str,
    table: &str,
    row: Vec<MySqlValue>,
) -> Result<std::result::Result<ColumnSchema, String>>
where
    C: Connection + ?Sized,
{
    let column = match parse_column_row(table, &row) {
        Ok(column) => column,
        Err(e) => return Ok(Err(e)),
    };

    let params = [
        Value::from(database),
        Value::from(table),
        Value::from(column.name.as_str()),
        Value::from(database),
    ];
    let rows = fetch_rows(conn, FOREIGN_KEY_QUERY, &params).await?.rows;
    let reference = match rows.as_slice() {
        [] => None,
        [row] => match parse_reference_row(table, &column.name, row) {
            Ok(reference) => Some(reference),
            Err(e) => return Ok(Err(e)),
        },
        many => {
            return Err(MigrateError::AmbiguousForeignKey {
                table: table.to_string(),
                column: column.name,
                matches: many.len(),
            });
        }
    };

    Ok(Ok(ColumnSchema { reference, ..column }))
}

/// Parses one row of [`ID_COLUMN_QUERY`] or [`COLUMNS_QUERY`], without
/// its foreign key.
///
/// # Errors
///
/// Returns a message naming the table when the row has the wrong
/// shape, its default is not text, or its type cannot be read.
pub fn parse_column_row(table: &str, row: &[MySqlValue]) -> std::result::Result<ColumnSchema, String> {
    let [name, nullable, data_type, column_type, max_length, precision, scale, default] = row else {
        return Err(format!(
            "Invalid column row for table '{table}': expected 8 values, got {}",
            row.len()
        ));
    };

    let name = text(name).ok_or_else(|| format!("Invalid column name in table '{table}': {name:?}"))?;
    let nullable = match text(nullable).as_deref() {
        Some("YES") => true,
        Some("NO") => false,
        _ => {
            return Err(format!(
                "Invalid IS_NULLABLE for column '{table}.{name}': {nullable:?}"
            ));
        }
    };
    let data_type = text(data_type)
        .ok_or_else(|| format!("Invalid DATA_TYPE for column '{table}.{name}': {data_type:?}"))?;
    let column_type = text(column_type)
        .ok_or_else(|| format!("Invalid COLUMN_TYPE for column '{table}.{name}': {column_type:?}"))?;

    let catalog_type = CatalogColumnType {
        data_type,
        column_type,
        max_length: optional_u32(max_length)
            .map_err(|v| format!("Invalid maximum length for column '{table}.{name}': {v:?}"))?,
        numeric_precision: optional_u32(precision)
            .map_err(|v| format!("Invalid precision for column '{table}.{name}': {v:?}"))?,
        numeric_scale: optional_u32(scale)
            .map_err(|v| format!("Invalid scale for column '{table}.{name}': {v:?}"))?,
    };
    let default = parse_default(default).map_err(|e| format!("Column '{table}.{name}': {e}"))?;
    let (sql_type, max_len) =
        parse_type(&catalog_type).map_err(|e| format!("Column '{table}.{name}': {e}"))?;

    Ok(ColumnSchema {
        name,
        sql_type,
        nullable,
        max_len,
        default,
        reference: None,
    })
}

/// Reads a `COLUMN_DEFAULT` value.
///
/// # Errors
///
/// Fails on byte payloads that are not UTF-8 and on any non-text
/// value.
pub fn parse_default(value: &MySqlValue) -> std::result::Result<Option<String>, String> {
    match value {
        MySqlValue::Null => Ok(None),
        MySqlValue::Text(s) => Ok(Some(s.clone())),
        MySqlValue::Bytes(b) => String::from_utf8(b.clone())
            .map(Some)
            .map_err(|e| format!("default value is not valid UTF-8: {e}")),
        other => Err(format!("unexpected default value {other:?}")),
    }
}

fn parse_reference_row(
    table: &str,
    column: &str,
    row: &[MySqlValue],
) -> std::result::Result<ColumnReference, String> {
    match row {
        [target, name, position] if position.as_i64() == Some(1) => match (text(target), text(name)) {
            (Some(table), Some(constraint_name)) => Ok(ColumnReference {
                table,
                constraint_name,
            }),
            _ => Err(format!(
                "Invalid foreign key row for column '{table}.{column}': {row:?}"
            )),
        },
        _ => Err(format!(
            "Invalid foreign key row for column '{table}.{column}': {row:?}"
        )),
    }
}

/// Groups adjacent `(constraint, column)` rows into constraints.
fn group_unique_rows(rows: Vec<Vec<MySqlValue>>) -> Vec<std::result::Result<UniqueConstraint, String>> {
    let mut out: Vec<std::result::Result<UniqueConstraint, String>> = Vec::new();
    let mut current: Option<UniqueConstraint> = None;

    for row in rows {
        let (name, column) = match row.as_slice() {
            [name, column] => match (text(name), text(column)) {
                (Some(name), Some(column)) => (name, column),
                _ => {
                    out.push(Err(format!("Invalid unique constraint row: {row:?}")));
                    continue;
                }
            },
            _ => {
                out.push(Err(format!("Invalid unique constraint row: {row:?}")));
                continue;
            }
        };

        match current.as_mut() {
            Some(constraint) if constraint.name == name => constraint.columns.push(column),
            _ => {
                if let Some(done) = current.replace(UniqueConstraint {
                    name,
                    columns: vec![column],
                }) {
                    out.push(Ok(done));
                }
            }
        }
    }
    if let Some(done) = current {
        out.push(Ok(done));
    }
    out
}

fn text(value: &MySqlValue) -> Option<String> {
    value.as_text().map(ToString::to_string)
}

fn optional_u32(value: &MySqlValue) -> std::result::Result<Option<u32>, &MySqlValue> {
    match value {
        MySqlValue::Null => Ok(None),
        other => other
            .as_i64()
            .and_then(|v| u32::try_from(v).ok())
            .map(Some)
            .ok_or(other),
    }
}
