//! Conversion between [`Value`] and [`MySqlValue`].
//!
//! Encoding is driven by the application value alone. Decoding also
//! needs the column's declared display width: MySQL sends a
//! `TINYINT(1)` boolean as a plain integer, and the width is the only
//! way to tell the two apart.

use serde_json::{Map, Number};

use crate::error::{CodecError, Result};
use crate::value::{MySqlValue, Value};

/// Metadata of one result column, as needed for decoding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMeta {
    /// Column name or alias.
    pub name: String,
    /// Declared display width, when the driver reports one.
    pub display_width: Option<u32>,
}

impl ColumnMeta {
    /// Creates column metadata without a display width.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            display_width: None,
        }
    }

    /// Sets the display width.
    #[must_use]
    pub const fn display_width(mut self, width: u32) -> Self {
        self.display_width = Some(width);
        self
    }
}

/// Encodes an application value as a query parameter.
///
/// Date-times are sent as wall-clock time with no zone conversion;
/// the value is taken to already be in the server's zone.
///
/// # Errors
///
/// Returns [`CodecError::UnsupportedValue`] for [`Value::ObjectId`],
/// including one nested in a list or map.
pub fn encode_param(value: &Value) -> Result<MySqlValue> {
    let encoded = match value {
        Value::Null => MySqlValue::Null,
        Value::Bool(b) => MySqlValue::Tiny(i8::from(*b)),
        Value::Int64(i) => MySqlValue::LongLong(*i),
        Value::Double(f) => MySqlValue::Double(*f),
        Value::Rational(d) => MySqlValue::Decimal(d.normalize().to_string()),
        Value::Text(s) => MySqlValue::Text(s.clone()),
        Value::Bytes(b) | Value::Raw(b) => MySqlValue::Bytes(b.clone()),
        Value::Date(d) => MySqlValue::Date(*d),
        Value::TimeOfDay(t) => MySqlValue::Time(*t),
        Value::UtcTime(t) => MySqlValue::DateTime(t.naive_utc()),
        Value::List(_) | Value::Map(_) => {
            MySqlValue::Text(serde_json::to_string(&to_json(value)?)?)
        }
        Value::ObjectId(_) => {
            return Err(CodecError::UnsupportedValue { kind: value.kind() });
        }
    };
    Ok(encoded)
}

/// Encodes every parameter, stopping at the first failure.
///
/// # Errors
///
/// See [`encode_param`].
pub fn encode_params(values: &[Value]) -> Result<Vec<MySqlValue>> {
    values.iter().map(encode_param).collect()
}

/// Decodes a wire value returned in a column with the given display
/// width.
///
/// Integers become [`Value::Bool`] only at width 1; every other
/// integer widens or narrows into [`Value::Int64`]. `FLOAT`, `DOUBLE`
/// and `DECIMAL` all decode to [`Value::Double`]. Date-times are read
/// as UTC. Unknown native types are kept as [`Value::Raw`].
///
/// # Errors
///
/// Returns [`CodecError::MalformedDecimal`] when a `DECIMAL` column
/// carries text that is not a number.
pub fn decode_column_value(native: MySqlValue, display_width: Option<u32>) -> Result<Value> {
    let is_bool = display_width == Some(1);
    let integer = |v: i64| {
        if is_bool {
            Value::Bool(v != 0)
        } else {
            Value::Int64(v)
        }
    };
    let decoded = match native {
        MySqlValue::Null => Value::Null,
        MySqlValue::Tiny(v) => integer(i64::from(v)),
        MySqlValue::Short(v) => integer(i64::from(v)),
        MySqlValue::Long(v) => integer(i64::from(v)),
        MySqlValue::LongLong(v) => integer(v),
        // Values above i64::MAX wrap around.
        MySqlValue::Unsigned(v) => integer(i64::from_ne_bytes(v.to_ne_bytes())),
        MySqlValue::Float(f) => Value::Double(f64::from(f)),
        MySqlValue::Double(f) => Value::Double(f),
        MySqlValue::Decimal(text) => match text.trim().parse::<f64>() {
            Ok(f) => Value::Double(f),
            Err(_) => return Err(CodecError::MalformedDecimal(text)),
        },
        MySqlValue::Text(s) => Value::Text(s),
        MySqlValue::Bytes(b) => Value::Bytes(b),
        MySqlValue::Date(d) => Value::Date(d),
        MySqlValue::Time(t) => Value::TimeOfDay(t),
        MySqlValue::DateTime(dt) => Value::UtcTime(dt.and_utc()),
        MySqlValue::Other { payload, .. } => Value::Raw(payload),
    };
    Ok(decoded)
}

/// Decodes a full row, pairing each value with its column metadata.
///
/// # Errors
///
/// See [`decode_column_value`].
pub fn decode_row(row: Vec<MySqlValue>, columns: &[ColumnMeta]) -> Result<Vec<Value>> {
    row.into_iter()
        .enumerate()
        .map(|(i, native)| {
            let width = columns.get(i).and_then(|c| c.display_width);
            decode_column_value(native, width)
        })
        .collect()
}

fn to_json(value: &Value) -> Result<serde_json::Value> {
    let json = match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Int64(i) => serde_json::Value::Number((*i).into()),
        Value::Double(f) => Number::from_f64(*f).map_or(serde_json::Value::Null, serde_json::Value::Number),
        Value::Rational(d) => serde_json::Value::String(d.normalize().to_string()),
        Value::Text(s) => serde_json::Value::String(s.clone()),
        Value::Bytes(b) | Value::Raw(b) => {
            serde_json::Value::Array(b.iter().map(|byte| (*byte).into()).collect())
        }
        Value::Date(d) => serde_json::Value::String(d.to_string()),
        Value::TimeOfDay(t) => serde_json::Value::String(t.to_string()),
        Value::UtcTime(t) => serde_json::Value::String(t.to_rfc3339()),
        Value::List(items) => {
            serde_json::Value::Array(items.iter().map(to_json).collect::<Result<_>>()?)
        }
        Value::Map(entries) => {
            let mut object = Map::new();
            for (key, item) in entries {
                object.insert(key.clone(), to_json(item)?);
            }
            serde_json::Value::Object(object)
        }
        Value::ObjectId(_) => {
            return Err(CodecError::UnsupportedValue { kind: value.kind() });
        }
    };
    Ok(json)
}
