//! MySQL type mapping and value codec.
//!
//! `oxide-mysql` is the MySQL-specific layer under `oxide-migrate`:
//!
//! - [`types`] maps logical column types to MySQL type text and back
//!   from `INFORMATION_SCHEMA` metadata.
//! - [`codec`] converts application [`Value`]s into wire
//!   [`MySqlValue`]s for query parameters, and decodes result
//!   columns back.
//!
//! # Example
//!
//! ```rust
//! use oxide_mysql::{decode_column_value, encode_param, MySqlValue, SqlType, Value};
//!
//! assert_eq!(SqlType::String.render(Some(64), false), "VARCHAR(64)");
//!
//! let wire = encode_param(&Value::Bool(true)).unwrap();
//! assert_eq!(wire, MySqlValue::Tiny(1));
//! assert_eq!(decode_column_value(wire, Some(1)).unwrap(), Value::Bool(true));
//! ```

pub mod codec;
pub mod error;
pub mod types;
pub mod value;

pub use codec::{decode_column_value, decode_row, encode_param, encode_params, ColumnMeta};
pub use error::{CodecError, Result};
pub use types::{parse_type, CatalogColumnType, SqlType, DEFAULT_CHARSET};
pub use value::{MySqlValue, Value};
