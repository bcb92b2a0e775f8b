//! Runtime values passed to and read from the database.

use serde::{Deserialize, Serialize};

/// A dynamically typed database value.
///
/// `Value` is the currency between mapped types, query arguments, and rows
/// streamed back from a connection. Decimals are carried as strings so no
/// precision is lost in transit; temporal values are carried in their ISO-8601
/// text form and interpreted by the driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// SQL NULL.
    Null,
    /// Boolean value.
    Bool(bool),
    /// 32-bit signed integer.
    Int(i32),
    /// 64-bit signed integer.
    BigInt(i64),
    /// 64-bit floating point value.
    Double(f64),
    /// Exact decimal, carried as text to preserve precision.
    Decimal(String),
    /// Text value.
    Text(String),
    /// Binary value.
    Bytes(Vec<u8>),
    /// Calendar date in `YYYY-MM-DD` form.
    Date(String),
    /// Timestamp in ISO-8601 form.
    Timestamp(String),
    /// JSON document.
    Json(serde_json::Value),
}

impl Value {
    /// Whether this value is SQL NULL.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Whether this value is the default for an identifier property.
    ///
    /// An unset identifier is NULL, a zero integer, or an empty string. Used
    /// to decide whether an instance already carries a database identity.
    #[must_use]
    pub fn is_default_identifier(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Int(i) => *i == 0,
            Value::BigInt(i) => *i == 0,
            Value::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    /// Read this value as an `i64` if it carries an integral number.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(i64::from(*i)),
            Value::BigInt(i) => Some(*i),
            Value::Decimal(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Read this value as text if it carries a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Read this value as a `bool` if it carries one.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::BigInt(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Double(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Value::Bytes(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}
