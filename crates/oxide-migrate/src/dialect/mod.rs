//! Database dialect implementations.
//!
//! Each dialect knows how to render migration operations as
//! statement text for its database. Rendering is pure: it never
//! queries the database and never fails.

mod mysql;

pub use mysql::MySqlDialect;

use crate::operations::{AlterColumn, AlterTableOp, MigrationOperation};
use crate::schema::{ColumnSchema, PrimaryKey, SqlType};

/// Trait for database-specific SQL generation.
pub trait MigrationDialect: Send + Sync {
    /// Returns the dialect name.
    fn name(&self) -> &'static str;

    /// Generates SQL for a migration operation.
    fn generate_sql(&self, operation: &MigrationOperation) -> String {
        match operation {
            MigrationOperation::CreateTable {
                name,
                columns,
                primary_key,
            } => self.create_table(name, columns, primary_key),
            MigrationOperation::AlterColumn { table, alteration } => {
                self.alter_column(table, alteration)
            }
            MigrationOperation::AlterTable { table, op } => self.alter_table(table, op),
        }
    }

    /// Generates SQL for CREATE TABLE.
    fn create_table(&self, name: &str, columns: &[ColumnSchema], primary_key: &PrimaryKey) -> String {
        let mut defs = Vec::with_capacity(columns.len() + 1);
        if let PrimaryKey::AutoIncrement { column, sql_type } = primary_key {
            defs.push(self.identifier_definition(column, sql_type));
        }
        defs.extend(columns.iter().map(|c| self.column_definition(c)));
        if let PrimaryKey::Composite(key) = primary_key {
            let cols: Vec<String> = key.iter().map(|c| self.quote_identifier(c)).collect();
            defs.push(format!("PRIMARY KEY ({})", cols.join(", ")));
        }

        let mut sql = String::from("CREATE TABLE ");
        sql.push_str(&self.quote_identifier(name));
        sql.push_str(" (\n  ");
        sql.push_str(&defs.join(",\n  "));
        sql.push_str("\n)");
        sql
    }

    /// Generates SQL for a column alteration.
    fn alter_column(&self, table: &str, alteration: &AlterColumn) -> String;

    /// Generates SQL for a table alteration.
    fn alter_table(&self, table: &str, op: &AlterTableOp) -> String;

    /// Returns the SQL type name for the given type.
    fn type_name(&self, sql_type: &SqlType, max_len: Option<u32>) -> String;

    /// Generates the definition of the auto-increment identifier.
    fn identifier_definition(&self, column: &str, sql_type: &SqlType) -> String {
        format!(
            "{} {} NOT NULL {} PRIMARY KEY",
            self.quote_identifier(column),
            self.type_name(sql_type, None),
            self.auto_increment_keyword()
        )
    }

    /// Generates column definition SQL.
    fn column_definition(&self, column: &ColumnSchema) -> String {
        let mut parts = vec![
            self.quote_identifier(&column.name),
            self.type_name(&column.sql_type, column.max_len),
        ];

        parts.push(if column.nullable { "NULL" } else { "NOT NULL" }.to_string());

        if let Some(ref default) = column.default {
            parts.push(format!("DEFAULT {default}"));
        }

        parts.join(" ")
    }

    /// Returns the auto-increment keyword for this dialect.
    fn auto_increment_keyword(&self) -> &'static str;

    /// Returns the identifier quote character.
    fn quote_char(&self) -> char {
        '"'
    }

    /// Quote an identifier (table name, column name, etc.).
    fn quote_identifier(&self, name: &str) -> String {
        let q = self.quote_char();
        let escaped = name.replace(q, &format!("{q}{q}"));
        format!("{q}{escaped}{q}")
    }
}
