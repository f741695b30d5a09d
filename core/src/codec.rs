//! Value typecasting between the external and canonical representations.
//!
//! [`cast`] converts a loosely-typed scalar into the canonical [`Value`] for a
//! [`PropertyType`]. [`decode_field`] goes one step further for record loading:
//! it also validates enum membership and the structured shapes of `file` and
//! `reference` values.
//!
//! # Examples
//!
//! ```
//! use entity_maker_core::*;
//!
//! assert_eq!(cast(PropertyType::Int, &Value::from("30.7")).unwrap(), Value::Int(31));
//! assert_eq!(cast(PropertyType::Float, &Value::Int(2)).unwrap(), Value::Float(2.0));
//! assert_eq!(cast(PropertyType::Bool, &Value::from("")).unwrap(), Value::Bool(false));
//! assert!(cast(PropertyType::Float, &Value::from("abc")).is_err());
//! ```

use thiserror::Error;

use crate::{PropertyKind, PropertySchema, PropertyType, Value};

/// Errors raised while typecasting a value.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CodecError {
    /// Input has no numeric interpretation.
    #[error("expected a number, found {0}")]
    NotANumber(String),
    /// Integer cast of NaN or an infinity.
    #[error("cannot represent {0} as an integer")]
    NonFinite(f64),
    /// Rounded value does not fit in 64 bits.
    #[error("{0} is out of integer range")]
    IntegerOverflow(f64),
    /// Enum value is not among the configured values.
    #[error("\"{0}\" is not one of the allowed values")]
    NotAMember(String),
    /// Structured value has the wrong shape for its property.
    #[error("expected {expected}, found {found}")]
    Shape {
        /// Description of the accepted shape.
        expected: &'static str,
        /// String form of the rejected value.
        found: String,
    },
}

/// Casts `raw` to the canonical form for `ty`.
///
/// `file` and `reference` values pass through unchanged; their shapes are
/// checked by [`decode_field`]. Casting is idempotent.
pub fn cast(ty: PropertyType, raw: &Value) -> Result<Value, CodecError> {
    match ty {
        PropertyType::Float => parse_number(raw).map(Value::Float),
        PropertyType::Int => {
            let number = parse_number(raw)?;
            round_to_int(number).map(Value::Int)
        }
        PropertyType::Bool => Ok(Value::Bool(raw.is_truthy())),
        PropertyType::Enum => Ok(Value::Text(match raw {
            Value::Text(s) => s.clone(),
            other => other.to_display_string(),
        })),
        PropertyType::File | PropertyType::Reference => Ok(raw.clone()),
    }
}

/// Casts a value for a specific property, checking its full shape.
///
/// Used when records are loaded from external data. Enum values must be
/// members of the property's `values`; reference values must be a name (or a
/// list of names when `multiple`); file values must be `[filename, content]`
/// pairs (or a list of pairs when `multiple`). A null single value is
/// accepted for `file`/`reference`, and null becomes an empty list for
/// multi-valued ones.
pub fn decode_field(prop: &PropertySchema, raw: &Value) -> Result<Value, CodecError> {
    match &prop.kind {
        PropertyKind::Enum { values, .. } => {
            let value = cast(PropertyType::Enum, raw)?;
            match value.as_str() {
                Some(s) if values.iter().any(|v| v == s) => Ok(value),
                _ => Err(CodecError::NotAMember(value.to_display_string())),
            }
        }
        PropertyKind::Reference { multiple, .. } => {
            if *multiple {
                decode_list(raw, "a list of names", |item| match item {
                    Value::Text(_) => Some(item.clone()),
                    _ => None,
                })
            } else {
                match raw {
                    Value::Null | Value::Text(_) => Ok(raw.clone()),
                    other => Err(shape("a name or null", other)),
                }
            }
        }
        PropertyKind::File { multiple, .. } => {
            if *multiple {
                decode_list(raw, "a list of [filename, content] pairs", decode_file_pair)
            } else if raw.is_null() {
                Ok(Value::Null)
            } else {
                decode_file_pair(raw).ok_or_else(|| shape("a [filename, content] pair", raw))
            }
        }
        _ => cast(prop.property_type(), raw),
    }
}

/// Returns the file name of a `[filename, content]` pair.
pub fn file_name(pair: &Value) -> Option<&str> {
    pair.as_list()?.first()?.as_str()
}

/// Returns `true` once a `[filename, content]` pair has content.
pub fn file_loaded(pair: &Value) -> bool {
    pair.as_list()
        .and_then(|p| p.get(1))
        .is_some_and(|content| !content.is_null())
}

fn parse_number(raw: &Value) -> Result<f64, CodecError> {
    match raw {
        Value::Int(i) => Ok(*i as f64),
        Value::Float(f) => Ok(*f),
        Value::Text(s) => {
            let trimmed = s.trim();
            trimmed
                .parse::<f64>()
                .map_err(|_| CodecError::NotANumber(format!("\"{s}\"")))
        }
        other => Err(CodecError::NotANumber(other.to_display_string())),
    }
}

fn round_to_int(number: f64) -> Result<i64, CodecError> {
    if !number.is_finite() {
        return Err(CodecError::NonFinite(number));
    }
    // f64::round breaks ties away from zero.
    let rounded = number.round();
    if rounded < i64::MIN as f64 || rounded >= i64::MAX as f64 {
        return Err(CodecError::IntegerOverflow(number));
    }
    Ok(rounded as i64)
}

fn decode_list(
    raw: &Value,
    expected: &'static str,
    item: impl Fn(&Value) -> Option<Value>,
) -> Result<Value, CodecError> {
    match raw {
        Value::Null => Ok(Value::List(Vec::new())),
        Value::List(items) => items
            .iter()
            .map(|v| item(v).ok_or_else(|| shape(expected, raw)))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List),
        other => Err(shape(expected, other)),
    }
}

fn decode_file_pair(raw: &Value) -> Option<Value> {
    match raw.as_list()? {
        [Value::Text(_), Value::Null | Value::Text(_)] => Some(raw.clone()),
        _ => None,
    }
}

fn shape(expected: &'static str, found: &Value) -> CodecError {
    CodecError::Shape {
        expected,
        found: serde_json::Value::from(found.clone()).to_string(),
    }
}
