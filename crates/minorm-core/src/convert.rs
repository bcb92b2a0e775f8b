//! Conversion of database values to declared storage types.
//!
//! Databases frequently hand back a wider or differently typed scalar than
//! the mapped property declares — MySQL's `LAST_INSERT_ID()` arrives as an
//! unsigned 64-bit value, SQL Server's `SCOPE_IDENTITY()` as a decimal. The
//! session funnels every such scalar through [`to_sql_type`] before assigning
//! it to an instance. Parsing is culture-independent: decimal text uses `.`
//! and no grouping, exactly what the drivers emit.

use crate::error::{Error, Result};
use crate::types::SqlType;
use crate::value::Value;

/// Convert `value` to the representation declared by `target`.
///
/// Nulls pass through untouched. Numeric values convert between the integer,
/// double, and decimal representations as long as no information is lost;
/// anything else is a [`Error::TypeConversion`].
pub fn to_sql_type(value: Value, target: SqlType) -> Result<Value> {
    if value.is_null() {
        return Ok(Value::Null);
    }

    let converted = match (target, &value) {
        (SqlType::Int, Value::Int(_))
        | (SqlType::BigInt, Value::BigInt(_))
        | (SqlType::Double, Value::Double(_))
        | (SqlType::Decimal, Value::Decimal(_))
        | (SqlType::Text, Value::Text(_))
        | (SqlType::Bool, Value::Bool(_))
        | (SqlType::Bytes, Value::Bytes(_))
        | (SqlType::Date, Value::Date(_))
        | (SqlType::Timestamp, Value::Timestamp(_))
        | (SqlType::Json, Value::Json(_)) => Some(value.clone()),

        (SqlType::Int, _) => integral(&value)
            .and_then(|i| i32::try_from(i).ok())
            .map(Value::Int),
        (SqlType::BigInt, _) => integral(&value).map(Value::BigInt),
        (SqlType::Double, Value::Int(i)) => Some(Value::Double(f64::from(*i))),
        (SqlType::Double, Value::BigInt(i)) => Some(Value::Double(*i as f64)),
        (SqlType::Double, Value::Decimal(s)) => s.parse().ok().map(Value::Double),
        (SqlType::Decimal, Value::Int(i)) => Some(Value::Decimal(i.to_string())),
        (SqlType::Decimal, Value::BigInt(i)) => Some(Value::Decimal(i.to_string())),
        (SqlType::Decimal, Value::Double(d)) => Some(Value::Decimal(d.to_string())),
        (SqlType::Text, _) => text(&value),
        _ => None,
    };

    converted.ok_or_else(|| Error::TypeConversion {
        from: format!("{value:?}"),
        to: target,
    })
}

/// Read an exact integral value out of any numeric variant.
fn integral(value: &Value) -> Option<i64> {
    match value {
        Value::Int(i) => Some(i64::from(*i)),
        Value::BigInt(i) => Some(*i),
        Value::Decimal(s) => {
            // Accept a trailing fractional part only when it is zero.
            match s.split_once('.') {
                Some((whole, fraction)) if fraction.bytes().all(|b| b == b'0') => {
                    whole.parse().ok()
                }
                Some(_) => None,
                None => s.parse().ok(),
            }
        }
        Value::Double(d) if d.fract() == 0.0 => Some(*d as i64),
        Value::Text(s) => s.parse().ok(),
        _ => None,
    }
}

fn text(value: &Value) -> Option<Value> {
    match value {
        Value::Int(i) => Some(Value::Text(i.to_string())),
        Value::BigInt(i) => Some(Value::Text(i.to_string())),
        Value::Double(d) => Some(Value::Text(d.to_string())),
        Value::Decimal(s) => Some(Value::Text(s.clone())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_conversions() {
        assert_eq!(
            to_sql_type(Value::Int(5), SqlType::Int).unwrap(),
            Value::Int(5)
        );
        assert_eq!(
            to_sql_type(Value::Text("x".to_string()), SqlType::Text).unwrap(),
            Value::Text("x".to_string())
        );
    }

    #[test]
    fn test_null_passes_through() {
        assert_eq!(to_sql_type(Value::Null, SqlType::Int).unwrap(), Value::Null);
    }

    #[test]
    fn test_decimal_scalar_to_int() {
        // SCOPE_IDENTITY() returns a decimal; the mapped identifier is an int.
        assert_eq!(
            to_sql_type(Value::Decimal("4354".to_string()), SqlType::Int).unwrap(),
            Value::Int(4354)
        );
        assert_eq!(
            to_sql_type(Value::Decimal("4354.00".to_string()), SqlType::BigInt).unwrap(),
            Value::BigInt(4354)
        );
    }

    #[test]
    fn test_fractional_decimal_does_not_convert_to_int() {
        let error = to_sql_type(Value::Decimal("4354.5".to_string()), SqlType::Int).unwrap_err();
        assert!(matches!(error, Error::TypeConversion { .. }));
    }

    #[test]
    fn test_bigint_narrowing_checks_range() {
        assert_eq!(
            to_sql_type(Value::BigInt(42), SqlType::Int).unwrap(),
            Value::Int(42)
        );

        let error = to_sql_type(Value::BigInt(i64::MAX), SqlType::Int).unwrap_err();
        assert!(matches!(error, Error::TypeConversion { .. }));
    }

    #[test]
    fn test_text_identifier_from_number() {
        assert_eq!(
            to_sql_type(Value::BigInt(7), SqlType::Text).unwrap(),
            Value::Text("7".to_string())
        );
    }

    #[test]
    fn test_incompatible_conversion_is_an_error() {
        let error = to_sql_type(Value::Bytes(vec![1]), SqlType::Int).unwrap_err();
        assert!(matches!(error, Error::TypeConversion { .. }));
    }
}
