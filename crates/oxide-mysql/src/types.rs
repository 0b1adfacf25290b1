//! Logical column types and their MySQL spelling.
//!
//! [`SqlType::render`] produces the type text used in DDL, and
//! [`parse_type`] reads it back from `INFORMATION_SCHEMA.COLUMNS`.
//! The reverse direction only recognizes the integer forms that
//! `render` itself produces (`tinyint(1)`, `int(11)`, `bigint(20)`);
//! any other width is kept verbatim as [`SqlType::Other`].

use serde::{Deserialize, Serialize};

/// Character set appended to string columns when requested.
pub const DEFAULT_CHARSET: &str = "utf8mb4";

/// Logical column types understood by the migration planner.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SqlType {
    /// Boolean, stored as `TINYINT(1)`.
    Bool,
    /// 32-bit integer.
    Int32,
    /// 64-bit integer.
    Int64,
    /// Double precision floating point.
    Real,
    /// Fixed-point number with precision and scale.
    Numeric {
        /// Total number of digits.
        precision: u32,
        /// Digits after the decimal point.
        scale: u32,
    },
    /// Character data, `TEXT` or `VARCHAR(n)`.
    String,
    /// Binary data, `BLOB` or `VARBINARY(n)`.
    Blob,
    /// Time of day.
    Time,
    /// Calendar date.
    Date,
    /// Date and time.
    DateTime,
    /// Any other native type, carried as raw type text.
    Other(String),
}

impl SqlType {
    /// Returns the MySQL type text for this type.
    ///
    /// `max_len` selects the bounded variant for strings and blobs.
    /// `include_charset` appends `CHARACTER SET utf8mb4` to string
    /// types; comparisons always render without it.
    #[must_use]
    pub fn render(&self, max_len: Option<u32>, include_charset: bool) -> String {
        let charset = if include_charset {
            format!(" CHARACTER SET {DEFAULT_CHARSET}")
        } else {
            String::new()
        };
        match (self, max_len) {
            (Self::Bool, _) => "TINYINT(1)".to_string(),
            (Self::Int32, _) => "INT(11)".to_string(),
            (Self::Int64, _) => "BIGINT".to_string(),
            (Self::Real, _) => "DOUBLE".to_string(),
            (Self::Numeric { precision, scale }, _) => format!("NUMERIC({precision},{scale})"),
            (Self::String, None) => format!("TEXT{charset}"),
            (Self::String, Some(len)) => format!("VARCHAR({len}){charset}"),
            (Self::Blob, None) => "BLOB".to_string(),
            (Self::Blob, Some(len)) => format!("VARBINARY({len})"),
            (Self::Time, _) => "TIME".to_string(),
            (Self::Date, _) => "DATE".to_string(),
            (Self::DateTime, _) => "DATETIME".to_string(),
            (Self::Other(raw), _) => raw.clone(),
        }
    }

    /// Returns whether the type is character or binary data, which
    /// needs a key prefix length when used in a unique index.
    #[must_use]
    pub const fn needs_key_prefix(&self) -> bool {
        matches!(self, Self::String | Self::Blob)
    }
}

/// Type metadata of one row of `INFORMATION_SCHEMA.COLUMNS`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogColumnType {
    /// `DATA_TYPE`, e.g. `int`.
    pub data_type: String,
    /// `COLUMN_TYPE`, e.g. `int(11)`, including the display width.
    pub column_type: String,
    /// `CHARACTER_MAXIMUM_LENGTH`.
    pub max_length: Option<u32>,
    /// `NUMERIC_PRECISION`.
    pub numeric_precision: Option<u32>,
    /// `NUMERIC_SCALE`.
    pub numeric_scale: Option<u32>,
}

/// Reads a logical type and maximum length back from catalog
/// metadata.
///
/// # Errors
///
/// Returns a message when a `decimal` column lacks precision or
/// scale. No default is guessed.
pub fn parse_type(info: &CatalogColumnType) -> Result<(SqlType, Option<u32>), String> {
    let parsed = match info.data_type.as_str() {
        "tinyint" if info.column_type == "tinyint(1)" => (SqlType::Bool, None),
        "int" if info.column_type == "int(11)" => (SqlType::Int32, None),
        "bigint" if info.column_type == "bigint(20)" => (SqlType::Int64, None),
        "double" if info.column_type == "double" => (SqlType::Real, None),
        "decimal" => match (info.numeric_precision, info.numeric_scale) {
            (Some(precision), Some(scale)) => (SqlType::Numeric { precision, scale }, None),
            _ => {
                return Err(format!(
                    "missing DECIMAL precision or scale for column type '{}'",
                    info.column_type
                ));
            }
        },
        "varchar" => (SqlType::String, info.max_length),
        "text" => (SqlType::String, None),
        "varbinary" => (SqlType::Blob, info.max_length),
        "blob" => (SqlType::Blob, None),
        "time" => (SqlType::Time, None),
        "date" => (SqlType::Date, None),
        "datetime" => (SqlType::DateTime, None),
        _ => (SqlType::Other(info.column_type.clone()), None),
    };
    Ok(parsed)
}
