//! Application values and MySQL wire values.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;

/// A typed application value.
///
/// This is the database-independent side of the codec: query
/// parameters are built from it and result rows decode into it.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// NULL
    Null,

    /// Boolean
    Bool(bool),

    /// Integer; 32-bit and 64-bit values share this variant.
    Int64(i64),

    /// Floating point.
    Double(f64),

    /// Exact fixed-point number.
    Rational(Decimal),

    /// Text.
    Text(String),

    /// Binary data.
    Bytes(Vec<u8>),

    /// Calendar date.
    Date(NaiveDate),

    /// Time of day.
    TimeOfDay(NaiveTime),

    /// Instant in time.
    UtcTime(DateTime<Utc>),

    /// List of values, stored as JSON text.
    List(Vec<Value>),

    /// Key/value pairs, stored as a JSON object.
    Map(Vec<(String, Value)>),

    /// Document-store object identifier. MySQL has no encoding for it.
    ObjectId(Vec<u8>),

    /// Opaque payload of a native type the codec does not model.
    Raw(Vec<u8>),
}

impl Value {
    /// Returns true if this is a NULL value.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Short name of the value kind, used in error messages.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int64(_) => "int64",
            Self::Double(_) => "double",
            Self::Rational(_) => "rational",
            Self::Text(_) => "text",
            Self::Bytes(_) => "bytes",
            Self::Date(_) => "date",
            Self::TimeOfDay(_) => "time of day",
            Self::UtcTime(_) => "utc time",
            Self::List(_) => "list",
            Self::Map(_) => "map",
            Self::ObjectId(_) => "object id",
            Self::Raw(_) => "raw",
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int64(i64::from(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<Decimal> for Value {
    fn from(v: Decimal) -> Self {
        Self::Rational(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_owned())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Self::Date(v)
    }
}

impl From<NaiveTime> for Value {
    fn from(v: NaiveTime) -> Self {
        Self::TimeOfDay(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Self::UtcTime(v)
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

/// A value as it travels on the MySQL wire protocol.
///
/// Integer variants mirror the protocol's column types so the codec
/// can tell a `TINYINT` apart from a `BIGINT`.
#[derive(Debug, Clone, PartialEq)]
pub enum MySqlValue {
    /// NULL
    Null,
    /// `TINYINT`
    Tiny(i8),
    /// `SMALLINT`
    Short(i16),
    /// `INT` / `MEDIUMINT`
    Long(i32),
    /// `BIGINT`
    LongLong(i64),
    /// Any `UNSIGNED` integer.
    Unsigned(u64),
    /// `FLOAT`
    Float(f32),
    /// `DOUBLE`
    Double(f64),
    /// `DECIMAL`, in its text form.
    Decimal(String),
    /// Character data.
    Text(String),
    /// Binary data.
    Bytes(Vec<u8>),
    /// `DATE`
    Date(NaiveDate),
    /// `TIME`
    Time(NaiveTime),
    /// `DATETIME` / `TIMESTAMP`, in server wall-clock time.
    DateTime(NaiveDateTime),
    /// Any other column type, kept as its raw payload.
    Other {
        /// Native type name, as reported by the driver.
        type_name: String,
        /// Raw payload bytes.
        payload: Vec<u8>,
    },
}

impl MySqlValue {
    /// Returns the value as text when it is character data, or
    /// binary data holding valid UTF-8.
    ///
    /// Catalog tables report names as either, depending on the
    /// server's collation.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Bytes(b) => std::str::from_utf8(b).ok(),
            _ => None,
        }
    }

    /// Returns the value as a signed integer when it is any integer
    /// variant that fits.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Tiny(v) => Some(i64::from(*v)),
            Self::Short(v) => Some(i64::from(*v)),
            Self::Long(v) => Some(i64::from(*v)),
            Self::LongLong(v) => Some(*v),
            Self::Unsigned(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }
}
