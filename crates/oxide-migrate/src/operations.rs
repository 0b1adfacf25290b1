//! Migration operations.
//!
//! This module defines the schema changes the planner can emit. They
//! are pure data; [`crate::dialect`] turns them into statement text.

use crate::schema::{ColumnSchema, PrimaryKey, SqlType};

/// Foreign key added by [`AlterColumnOp::SetForeignKey`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddReference {
    /// Referenced table.
    pub references_table: String,
    /// Constraint name.
    pub constraint_name: String,
    /// Column(s) in the altered table.
    pub columns: Vec<String>,
    /// Referenced column(s).
    pub references_columns: Vec<String>,
}

/// A change to a single column or to a column's foreign key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlterColumnOp {
    /// Add a new column.
    Add(ColumnSchema),
    /// Rewrite the column's full definition.
    Change(ColumnSchema),
    /// Drop the column.
    Drop,
    /// Set the default value (literal SQL).
    SetDefault(String),
    /// Remove the default value.
    ClearDefault,
    /// Add a foreign key constraint.
    SetForeignKey(AddReference),
    /// Drop the named foreign key constraint.
    DropForeignKey(String),
    /// Fill NULLs with the given expression before a NOT NULL change.
    DataFix(String),
}

/// A column-level alteration attached to a subject.
///
/// The subject is the column name for column changes. For foreign key
/// changes it is the referenced table: dropping a reference is
/// attributed to the old target, adding one to the new target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlterColumn {
    /// Column name, or referenced table for foreign key changes.
    pub subject: String,
    /// The change to apply.
    pub op: AlterColumnOp,
}

impl AlterColumn {
    /// Creates an alteration.
    #[must_use]
    pub fn new(subject: impl Into<String>, op: AlterColumnOp) -> Self {
        Self {
            subject: subject.into(),
            op,
        }
    }
}

/// A column taking part in a unique constraint, with what is needed
/// to choose a key prefix length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniqueColumn {
    /// Column name.
    pub name: String,
    /// Column type.
    pub sql_type: SqlType,
    /// Maximum length, if bounded.
    pub max_len: Option<u32>,
}

/// A table-level change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlterTableOp {
    /// Add a unique constraint.
    AddUniqueConstraint {
        /// Constraint name.
        name: String,
        /// Member columns.
        columns: Vec<UniqueColumn>,
    },
    /// Drop the named unique constraint.
    DropUniqueConstraint(String),
}

/// A single migration operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationOperation {
    /// Create a table from scratch.
    CreateTable {
        /// Table name.
        name: String,
        /// Column definitions, excluding an auto-increment id.
        columns: Vec<ColumnSchema>,
        /// Primary key strategy.
        primary_key: PrimaryKey,
    },

    /// Alter a column of a table.
    AlterColumn {
        /// Table name.
        table: String,
        /// The alteration.
        alteration: AlterColumn,
    },

    /// Alter a table-level constraint.
    AlterTable {
        /// Table name.
        table: String,
        /// The change.
        op: AlterTableOp,
    },
}

impl MigrationOperation {
    /// Creates a column alteration.
    #[must_use]
    pub fn alter_column(table: impl Into<String>, alteration: AlterColumn) -> Self {
        Self::AlterColumn {
            table: table.into(),
            alteration,
        }
    }

    /// Creates a table alteration.
    #[must_use]
    pub fn alter_table(table: impl Into<String>, op: AlterTableOp) -> Self {
        Self::AlterTable {
            table: table.into(),
            op,
        }
    }

    /// Returns the table this operation applies to.
    #[must_use]
    pub fn table(&self) -> &str {
        match self {
            Self::CreateTable { name, .. } => name,
            Self::AlterColumn { table, .. } | Self::AlterTable { table, .. } => table,
        }
    }

    /// Returns whether applying this operation may destroy data
    /// without recovery.
    ///
    /// Only column drops are unsafe. Type and default changes can
    /// lose data as well but are reported as safe.
    #[must_use]
    pub const fn is_unsafe(&self) -> bool {
        matches!(
            self,
            Self::AlterColumn {
                alteration: AlterColumn {
                    op: AlterColumnOp::Drop,
                    ..
                },
                ..
            }
        )
    }
}
