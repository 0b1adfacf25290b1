//! In-memory catalog answering the introspection queries.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use oxide_migrate::introspect::{COLUMNS_QUERY, FOREIGN_KEY_QUERY, ID_COLUMN_QUERY, UNIQUE_QUERY};
use oxide_migrate::prelude::*;
use oxide_mysql::{CatalogColumnType, ColumnMeta, MySqlValue};

/// One table as the fake catalog sees it.
#[derive(Debug, Clone, Default)]
pub struct FakeTable {
    pub columns: Vec<ColumnSchema>,
    pub uniques: Vec<UniqueConstraint>,
    /// Column rows appended verbatim to the column query.
    pub raw_column_rows: Vec<Vec<MySqlValue>>,
    /// Extra key-usage rows returned for a column.
    pub extra_fk_rows: HashMap<String, Vec<Vec<MySqlValue>>>,
}

#[derive(Debug, Default)]
pub struct FakeCatalog {
    pub database: String,
    pub tables: HashMap<String, FakeTable>,
    pub opened: Arc<AtomicUsize>,
    pub released: Arc<AtomicUsize>,
    /// Queries whose result set fails while being drained.
    pub failing_query: Option<&'static str>,
}

impl FakeCatalog {
    pub fn new(database: &str) -> Self {
        Self {
            database: database.to_string(),
            ..Self::default()
        }
    }

    pub fn with_table(mut self, name: &str, table: FakeTable) -> Self {
        self.tables.insert(name.to_string(), table);
        self
    }

    pub fn table_mut(&mut self, name: &str) -> &mut FakeTable {
        self.tables.entry(name.to_string()).or_default()
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    /// Applies an operation the way the server would.
    pub fn apply(&mut self, operation: &MigrationOperation) {
        match operation {
            MigrationOperation::CreateTable {
                name,
                columns,
                primary_key,
            } => {
                let mut table = FakeTable::default();
                if let PrimaryKey::AutoIncrement { column, sql_type } = primary_key {
                    table.columns.push(ColumnSchema::new(column, sql_type.clone()));
                }
                table.columns.extend(columns.iter().map(|c| ColumnSchema {
                    reference: None,
                    ..c.clone()
                }));
                self.tables.insert(name.clone(), table);
            }
            MigrationOperation::AlterColumn { table, alteration } => {
                let table = self.table_mut(table);
                let subject = alteration.subject.as_str();
                match &alteration.op {
                    AlterColumnOp::Add(column) => table.columns.push(ColumnSchema {
                        reference: None,
                        ..column.clone()
                    }),
                    AlterColumnOp::Change(column) => {
                        if let Some(current) = table.columns.iter_mut().find(|c| c.name == column.name) {
                            *current = ColumnSchema {
                                reference: current.reference.clone(),
                                ..column.clone()
                            };
                        }
                    }
                    AlterColumnOp::Drop => table.columns.retain(|c| c.name != subject),
                    AlterColumnOp::SetDefault(value) => {
                        if let Some(current) = table.columns.iter_mut().find(|c| c.name == subject) {
                            current.default = Some(value.clone());
                        }
                    }
                    AlterColumnOp::ClearDefault => {
                        if let Some(current) = table.columns.iter_mut().find(|c| c.name == subject) {
                            current.default = None;
                        }
                    }
                    AlterColumnOp::SetForeignKey(reference) => {
                        let leading = reference.columns.first().cloned().unwrap_or_default();
                        if let Some(current) = table.columns.iter_mut().find(|c| c.name == leading) {
                            current.reference = Some(ColumnReference {
                                table: reference.references_table.clone(),
                                constraint_name: reference.constraint_name.clone(),
                            });
                        }
                    }
                    AlterColumnOp::DropForeignKey(name) => {
                        for column in &mut table.columns {
                            if column
                                .reference
                                .as_ref()
                                .is_some_and(|r| &r.constraint_name == name)
                            {
                                column.reference = None;
                            }
                        }
                    }
                    AlterColumnOp::DataFix(_) => {}
                }
            }
            MigrationOperation::AlterTable { table, op } => {
                let table = self.table_mut(table);
                match op {
                    AlterTableOp::AddUniqueConstraint { name, columns } => {
                        table.uniques.push(UniqueConstraint {
                            name: name.clone(),
                            columns: columns.iter().map(|c| c.name.clone()).collect(),
                        });
                    }
                    AlterTableOp::DropUniqueConstraint(name) => {
                        table.uniques.retain(|u| &u.name != name);
                    }
                }
            }
        }
    }

    fn answer(&self, sql: &str, params: &[MySqlValue]) -> Result<(Vec<ColumnMeta>, Vec<Vec<MySqlValue>>)> {
        let text = |i: usize| params.get(i).and_then(MySqlValue::as_text).unwrap_or_default();
        if text(0) != self.database {
            return Ok((Vec::new(), Vec::new()));
        }
        let Some(table) = self.tables.get(text(1)) else {
            return Ok((Vec::new(), Vec::new()));
        };
        let column = text(2);

        let rows = if sql == ID_COLUMN_QUERY {
            table
                .columns
                .iter()
                .filter(|c| c.name == column)
                .map(column_row)
                .collect()
        } else if sql == COLUMNS_QUERY {
            table
                .columns
                .iter()
                .filter(|c| c.name != column)
                .map(column_row)
                .chain(table.raw_column_rows.iter().cloned())
                .collect()
        } else if sql == UNIQUE_QUERY {
            let mut pairs: Vec<(String, String)> = table
                .uniques
                .iter()
                .flat_map(|u| u.columns.iter().map(|c| (u.name.clone(), c.clone())))
                .filter(|(_, c)| c != column)
                .collect();
            pairs.sort();
            pairs
                .into_iter()
                .map(|(name, c)| vec![MySqlValue::Text(name), MySqlValue::Text(c)])
                .collect()
        } else if sql == FOREIGN_KEY_QUERY {
            let mut rows: Vec<Vec<MySqlValue>> = table
                .columns
                .iter()
                .filter(|c| c.name == column)
                .filter_map(|c| c.reference.as_ref())
                .map(|r| {
                    vec![
                        MySqlValue::Text(r.table.clone()),
                        MySqlValue::Text(r.constraint_name.clone()),
                        MySqlValue::Unsigned(1),
                    ]
                })
                .collect();
            rows.extend(table.extra_fk_rows.get(column).cloned().unwrap_or_default());
            rows
        } else {
            return Err(MigrateError::Connection(format!("unexpected query: {sql}")));
        };
        Ok((Vec::new(), rows))
    }
}

/// The type metadata MySQL 5.7 reports for a column created from
/// `sql_type.render(max_len, _)`.
pub fn catalog_type(sql_type: &SqlType, max_len: Option<u32>) -> CatalogColumnType {
    let plain = |data_type: &str, column_type: String| CatalogColumnType {
        data_type: data_type.to_string(),
        column_type,
        ..CatalogColumnType::default()
    };
    match (sql_type, max_len) {
        (SqlType::Bool, _) => plain("tinyint", "tinyint(1)".into()),
        (SqlType::Int32, _) => plain("int", "int(11)".into()),
        (SqlType::Int64, _) => plain("bigint", "bigint(20)".into()),
        (SqlType::Real, _) => plain("double", "double".into()),
        (SqlType::Numeric { precision, scale }, _) => CatalogColumnType {
            data_type: "decimal".into(),
            column_type: format!("decimal({precision},{scale})"),
            max_length: None,
            numeric_precision: Some(*precision),
            numeric_scale: Some(*scale),
        },
        (SqlType::String, None) => plain("text", "text".into()),
        (SqlType::String, Some(len)) => CatalogColumnType {
            max_length: Some(len),
            ..plain("varchar", format!("varchar({len})"))
        },
        (SqlType::Blob, None) => plain("blob", "blob".into()),
        (SqlType::Blob, Some(len)) => CatalogColumnType {
            max_length: Some(len),
            ..plain("varbinary", format!("varbinary({len})"))
        },
        (SqlType::Time, _) => plain("time", "time".into()),
        (SqlType::Date, _) => plain("date", "date".into()),
        (SqlType::DateTime, _) => plain("datetime", "datetime".into()),
        (SqlType::Other(raw), _) => {
            let column_type = raw.to_lowercase();
            let data_type = column_type
                .split(['(', ' '])
                .next()
                .unwrap_or_default()
                .to_string();
            CatalogColumnType {
                data_type,
                column_type,
                ..CatalogColumnType::default()
            }
        }
    }
}

/// The `INFORMATION_SCHEMA.COLUMNS` row MySQL reports for a column.
pub fn column_row(column: &ColumnSchema) -> Vec<MySqlValue> {
    let info = catalog_type(&column.sql_type, column.max_len);
    let number = |v: Option<u32>| v.map_or(MySqlValue::Null, |n| MySqlValue::Unsigned(u64::from(n)));
    vec![
        MySqlValue::Text(column.name.clone()),
        MySqlValue::Text(if column.nullable { "YES" } else { "NO" }.to_string()),
        MySqlValue::Text(info.data_type),
        MySqlValue::Text(info.column_type),
        number(info.max_length),
        number(info.numeric_precision),
        number(info.numeric_scale),
        column
            .default
            .clone()
            .map_or(MySqlValue::Null, MySqlValue::Text),
    ]
}

struct FakeStatement<'a> {
    catalog: &'a mut FakeCatalog,
    sql: String,
}

struct FakeRows {
    inner: MemoryResultSet,
    fail: bool,
    released: Arc<AtomicUsize>,
}

#[async_trait]
impl Connection for FakeCatalog {
    async fn prepare<'a>(&'a mut self, sql: &str) -> Result<Box<dyn Statement + 'a>> {
        Ok(Box::new(FakeStatement {
            catalog: self,
            sql: sql.to_string(),
        }))
    }
}

#[async_trait]
impl<'a> Statement for FakeStatement<'a> {
    async fn execute(&mut self, params: &[MySqlValue]) -> Result<Execution> {
        let (columns, rows) = self.catalog.answer(&self.sql, params)?;
        self.catalog.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Execution::Rows(Box::new(FakeRows {
            inner: MemoryResultSet::new(columns, rows),
            fail: self.catalog.failing_query == Some(self.sql.as_str()),
            released: Arc::clone(&self.catalog.released),
        })))
    }
}

#[async_trait]
impl ResultSet for FakeRows {
    fn columns(&self) -> &[ColumnMeta] {
        self.inner.columns()
    }

    async fn next_row(&mut self) -> Result<Option<Vec<MySqlValue>>> {
        if self.fail {
            return Err(MigrateError::Connection("lost connection during query".into()));
        }
        self.inner.next_row().await
    }

    async fn release(self: Box<Self>) -> Result<()> {
        self.released.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
