//! Normalization of single loosely-typed configuration values.

use crate::error::{Result, SensorError};
use serde::Serialize;
use serde_json::{Number, Value};
use std::fmt;

/// A scalar reading value.
///
/// Numbers with no fractional part are always held as [`ReadingValue::Int`];
/// everything else numeric is a [`ReadingValue::Float`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ReadingValue {
    /// A boolean value
    Bool(bool),
    /// An integral number
    Int(i64),
    /// A number with a fractional part
    Float(f64),
    /// A string value
    String(String),
}

impl ReadingValue {
    /// Normalize a JSON number into an integer when it is mathematically integral.
    pub fn from_number(number: &Number) -> Self {
        if let Some(i) = number.as_i64() {
            return Self::Int(i);
        }
        // u64 beyond i64::MAX and all true floats land here
        let f = number.as_f64().unwrap_or(f64::NAN);
        if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
            Self::Int(f as i64)
        } else {
            Self::Float(f)
        }
    }

    /// Convert to a JSON value (for hosts that speak JSON).
    pub fn to_json(&self) -> Value {
        match self {
            Self::Bool(b) => Value::Bool(*b),
            Self::Int(i) => Value::from(*i),
            Self::Float(f) => Number::from_f64(*f).map(Value::Number).unwrap_or(Value::Null),
            Self::String(s) => Value::String(s.clone()),
        }
    }
}

impl fmt::Display for ReadingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{}", b),
            Self::Int(i) => write!(f, "{}", i),
            Self::Float(x) => write!(f, "{}", x),
            Self::String(s) => write!(f, "{}", s),
        }
    }
}

impl From<bool> for ReadingValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for ReadingValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for ReadingValue {
    fn from(value: f64) -> Self {
        Number::from_f64(value)
            .map(|n| Self::from_number(&n))
            .unwrap_or(Self::Float(value))
    }
}

impl From<&str> for ReadingValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for ReadingValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

/// The result of parsing one configuration node.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedValue {
    /// A single scalar
    Scalar(ReadingValue),
    /// A flat list of scalars, in source order
    List(Vec<ReadingValue>),
}

impl ParsedValue {
    /// Turn the parsed value into an ordered list, wrapping a scalar in a singleton.
    pub fn into_values(self) -> Vec<ReadingValue> {
        match self {
            Self::Scalar(value) => vec![value],
            Self::List(values) => values,
        }
    }
}

/// Convert a JSON scalar into a [`ReadingValue`].
///
/// Returns `None` for null, arrays and objects.
pub fn parse_scalar(value: &Value) -> Option<ReadingValue> {
    match value {
        Value::Bool(b) => Some(ReadingValue::Bool(*b)),
        Value::Number(n) => Some(ReadingValue::from_number(n)),
        Value::String(s) => Some(ReadingValue::String(s.clone())),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Parse one configuration node as a scalar or a flat list of scalars.
///
/// `context` names the attribute or field being parsed and is carried into
/// the error.
///
/// # Errors
///
/// Returns [`SensorError::UnsupportedValue`] for null, objects, and lists that
/// contain anything other than strings, numbers and bools.
pub fn parse_value(context: &str, value: &Value) -> Result<ParsedValue> {
    match value {
        Value::Array(items) => items
            .iter()
            .map(|item| {
                parse_scalar(item).ok_or_else(|| SensorError::unsupported_value(context, item))
            })
            .collect::<Result<Vec<_>>>()
            .map(ParsedValue::List),
        Value::Null | Value::Object(_) => Err(SensorError::unsupported_value(context, value)),
        scalar => parse_scalar(scalar)
            .map(ParsedValue::Scalar)
            .ok_or_else(|| SensorError::unsupported_value(context, value)),
    }
}
