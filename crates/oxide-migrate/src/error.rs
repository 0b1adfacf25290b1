//! Error types for the migration planner.

use std::path::PathBuf;

use oxide_mysql::CodecError;

/// Errors that can occur while planning migrations.
///
/// Catalog rows that fail to parse are not errors at this level:
/// they are collected as text and returned in place of a plan.
#[derive(Debug, thiserror::Error)]
pub enum MigrateError {
    /// A query parameter could not be encoded.
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    /// Database error raised by the sqlx driver.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Error raised by an injected connection.
    #[error("Connection error: {0}")]
    Connection(String),

    /// A catalog query returned an affected-row count instead of rows.
    #[error("Expected rows from query, got an affected-row count: {0}")]
    UnexpectedResult(String),

    /// More than one leading-position foreign key references a column.
    #[error("Column '{table}.{column}' has {matches} leading-position foreign keys")]
    AmbiguousForeignKey {
        /// Table holding the column.
        table: String,
        /// Column name.
        column: String,
        /// Number of matching catalog rows.
        matches: usize,
    },

    /// Catalog rows that failed to parse.
    #[error("Could not read live schema:\n{}", .0.iter().map(|e| format!("  - {}", e)).collect::<Vec<_>>().join("\n"))]
    Introspection(Vec<String>),

    /// An entity references a table that is not defined.
    #[error("Entity '{0}' not found in schema definition")]
    UnknownEntity(String),

    /// IO error (reading entity definitions).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse an entity definitions file.
    #[error("Failed to parse entity definitions '{path}': {message}")]
    ParseError {
        /// Path to the definitions file.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// Multiple errors occurred.
    #[error("Multiple errors occurred:\n{}", .0.iter().map(|e| format!("  - {}", e)).collect::<Vec<_>>().join("\n"))]
    Multiple(Vec<MigrateError>),
}

/// Result type for migration operations.
pub type Result<T> = std::result::Result<T, MigrateError>;
