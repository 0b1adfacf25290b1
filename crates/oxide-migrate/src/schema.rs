//! Schema representation types.
//!
//! These types describe the structure of a table in the same shape
//! whether it comes from the application's entity definitions (the
//! desired schema) or from the database catalog (the live schema),
//! so the two can be compared field by field.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{MigrateError, Result};

pub use oxide_mysql::SqlType;

/// Default name of the auto-increment identifier column.
pub const DEFAULT_ID_COLUMN: &str = "id";

/// A single-column foreign key carried on a column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnReference {
    /// Referenced table.
    pub table: String,
    /// Constraint name.
    pub constraint_name: String,
}

/// Schema definition for a column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSchema {
    /// Column name.
    pub name: String,
    /// Logical data type.
    pub sql_type: SqlType,
    /// Whether the column allows NULL values.
    #[serde(default)]
    pub nullable: bool,
    /// Maximum length for string and blob columns.
    #[serde(default)]
    pub max_len: Option<u32>,
    /// Default value, as literal SQL text.
    #[serde(default)]
    pub default: Option<String>,
    /// Foreign key reference, if any.
    #[serde(default)]
    pub reference: Option<ColumnReference>,
}

impl ColumnSchema {
    /// Creates a new NOT NULL column schema.
    #[must_use]
    pub fn new(name: impl Into<String>, sql_type: SqlType) -> Self {
        Self {
            name: name.into(),
            sql_type,
            nullable: false,
            max_len: None,
            default: None,
            reference: None,
        }
    }

    /// Sets the column as nullable.
    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Sets the maximum length.
    #[must_use]
    pub fn max_len(mut self, len: u32) -> Self {
        self.max_len = Some(len);
        self
    }

    /// Sets the default value.
    #[must_use]
    pub fn default(mut self, sql: impl Into<String>) -> Self {
        self.default = Some(sql.into());
        self
    }

    /// Adds a foreign key to `table` named `constraint_name`.
    #[must_use]
    pub fn references(mut self, table: impl Into<String>, constraint_name: impl Into<String>) -> Self {
        self.reference = Some(ColumnReference {
            table: table.into(),
            constraint_name: constraint_name.into(),
        });
        self
    }
}

/// Schema definition for a unique constraint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UniqueConstraint {
    /// Constraint name.
    pub name: String,
    /// Columns that form the unique constraint.
    pub columns: Vec<String>,
}

impl UniqueConstraint {
    /// Creates a new unique constraint.
    #[must_use]
    pub fn new(name: impl Into<String>, columns: &[&str]) -> Self {
        Self {
            name: name.into(),
            columns: columns.iter().map(ToString::to_string).collect(),
        }
    }
}

/// Schema definition for a (possibly composite) foreign key
/// declared at entity level.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ForeignKeySchema {
    /// Constraint name.
    pub name: String,
    /// Referenced table name.
    pub references_table: String,
    /// Column(s) in the referencing table.
    pub columns: Vec<String>,
    /// Referenced column(s).
    pub references_columns: Vec<String>,
}

/// How an entity's rows are identified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimaryKey {
    /// A single auto-increment identifier column.
    AutoIncrement {
        /// Column name.
        column: String,
        /// Column type.
        sql_type: SqlType,
    },
    /// An explicit key over one or more declared columns.
    Composite(Vec<String>),
}

impl Default for PrimaryKey {
    fn default() -> Self {
        Self::AutoIncrement {
            column: DEFAULT_ID_COLUMN.to_string(),
            sql_type: SqlType::Int64,
        }
    }
}

impl PrimaryKey {
    /// Returns the primary key column names.
    #[must_use]
    pub fn columns(&self) -> Vec<String> {
        match self {
            Self::AutoIncrement { column, .. } => vec![column.clone()],
            Self::Composite(columns) => columns.clone(),
        }
    }
}

/// Desired state of one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityDefinition {
    /// Table name.
    pub name: String,
    /// Primary key strategy.
    #[serde(default)]
    pub primary_key: PrimaryKey,
    /// Columns in declaration order, excluding an auto-increment id.
    #[serde(default)]
    pub columns: Vec<ColumnSchema>,
    /// Unique constraints (the primary key is not one of them).
    #[serde(default)]
    pub unique_constraints: Vec<UniqueConstraint>,
    /// Entity-level foreign keys.
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKeySchema>,
}

impl EntityDefinition {
    /// Creates an entity with the default `id BIGINT` identifier.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            primary_key: PrimaryKey::default(),
            columns: Vec::new(),
            unique_constraints: Vec::new(),
            foreign_keys: Vec::new(),
        }
    }

    /// Replaces the primary key with a composite key.
    #[must_use]
    pub fn composite_key(mut self, columns: &[&str]) -> Self {
        self.primary_key = PrimaryKey::Composite(columns.iter().map(ToString::to_string).collect());
        self
    }

    /// Adds a column.
    #[must_use]
    pub fn column(mut self, column: ColumnSchema) -> Self {
        self.columns.push(column);
        self
    }

    /// Adds a unique constraint.
    #[must_use]
    pub fn unique(mut self, constraint: UniqueConstraint) -> Self {
        self.unique_constraints.push(constraint);
        self
    }

    /// Adds an entity-level foreign key.
    #[must_use]
    pub fn foreign_key(mut self, fk: ForeignKeySchema) -> Self {
        self.foreign_keys.push(fk);
        self
    }

    /// Returns the column whose presence tells whether the table
    /// exists: the identifier, or the first composite key column.
    #[must_use]
    pub fn identifier_column(&self) -> &str {
        match &self.primary_key {
            PrimaryKey::AutoIncrement { column, .. } => column,
            PrimaryKey::Composite(columns) => columns
                .first()
                .map_or(DEFAULT_ID_COLUMN, String::as_str),
        }
    }

    /// Returns the auto-increment identifier, which is owned by the
    /// primary key and never diffed. Composite key columns are ordinary
    /// columns.
    #[must_use]
    pub fn excluded_column(&self) -> Option<&str> {
        match &self.primary_key {
            PrimaryKey::AutoIncrement { column, .. } => Some(column),
            PrimaryKey::Composite(_) => None,
        }
    }

    /// Returns the columns compared against the live schema: every
    /// declared column except an auto-increment identifier.
    pub fn compared_columns(&self) -> impl Iterator<Item = &ColumnSchema> {
        let excluded = self.excluded_column();
        self.columns
            .iter()
            .filter(move |c| Some(c.name.as_str()) != excluded)
    }

    /// Looks up a declared column by name.
    #[must_use]
    pub fn column_named(&self, name: &str) -> Option<&ColumnSchema> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// The complete desired schema: every entity the application
/// declares.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDefinition {
    /// Entities in declaration order.
    pub entities: Vec<EntityDefinition>,
}

impl SchemaDefinition {
    /// Creates a schema definition.
    #[must_use]
    pub const fn new(entities: Vec<EntityDefinition>) -> Self {
        Self { entities }
    }

    /// Looks up an entity by table name.
    ///
    /// # Errors
    ///
    /// Returns [`MigrateError::UnknownEntity`] if no entity has that name.
    pub fn entity(&self, name: &str) -> Result<&EntityDefinition> {
        self.entities
            .iter()
            .find(|e| e.name == name)
            .ok_or_else(|| MigrateError::UnknownEntity(name.to_string()))
    }

    /// Returns the primary key columns of `table`, used as the
    /// target of foreign keys. Tables that are not declared are
    /// assumed to use the default `id` column.
    #[must_use]
    pub fn primary_key_columns(&self, table: &str) -> Vec<String> {
        self.entities
            .iter()
            .find(|e| e.name == table)
            .map_or_else(|| vec![DEFAULT_ID_COLUMN.to_string()], |e| e.primary_key.columns())
    }

    /// Reads a schema definition from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`MigrateError::Io`] if the file cannot be read and
    /// [`MigrateError::ParseError`] if it is not a valid definition.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        serde_json::from_str(&text).map_err(|e| MigrateError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}
