//! Parameters bound next to compiled statements.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::coerce;

/// A bound statement parameter.
///
/// Values are never interpolated into SQL text; the compiler pushes them onto
/// a parameter list that travels next to the statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    BigInt(i64),
    Double(f64),
    Text(String),
    /// Calendar date, bound for `date` columns and `{date: ...}` operands
    Date(NaiveDate),
    /// Naive UTC timestamp
    Timestamp(NaiveDateTime),
    /// A structured document (object operands)
    Json(JsonValue),
    /// Array columns
    Array(Vec<Value>),
    /// Emitted as the `DEFAULT` keyword, never bound
    Default,
}

impl Value {
    pub const fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Integer view; booleans count as 0/1.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::BigInt(n) => Some(*n),
            Value::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    /// Numeric view of integer and double parameters.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::BigInt(n) => Some(*n as f64),
            Value::Double(f) => Some(*f),
            _ => None,
        }
    }

    /// Bind a JSON scalar as-is.
    ///
    /// Integers stay integers, other numbers become doubles, arrays become
    /// arrays of bound values and objects are bound as JSON.
    pub fn from_json(value: &JsonValue) -> Self {
        match value {
            JsonValue::Null => Value::Null,
            JsonValue::Bool(b) => Value::Bool(*b),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => Value::BigInt(i),
                None => Value::Double(n.as_f64().unwrap_or(f64::NAN)),
            },
            JsonValue::String(s) => Value::Text(s.clone()),
            JsonValue::Array(items) => Value::Array(items.iter().map(Value::from_json).collect()),
            JsonValue::Object(_) => Value::Json(value.clone()),
        }
    }

    /// Render this value as the JSON a driver would hand back for it.
    ///
    /// Dates render as `YYYY-MM-DD`, timestamps as ISO-8601 with a `Z`
    /// suffix. Non-finite doubles and `DEFAULT` render as `null`.
    pub fn to_json(&self) -> JsonValue {
        match self {
            Value::Null | Value::Default => JsonValue::Null,
            Value::Bool(b) => JsonValue::Bool(*b),
            Value::BigInt(i) => JsonValue::from(*i),
            Value::Double(f) => serde_json::Number::from_f64(*f)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            Value::Text(s) => JsonValue::String(s.clone()),
            Value::Date(d) => JsonValue::String(d.format("%Y-%m-%d").to_string()),
            Value::Timestamp(ts) => JsonValue::String(coerce::iso_string(ts)),
            Value::Json(j) => j.clone(),
            Value::Array(items) => JsonValue::Array(items.iter().map(Value::to_json).collect()),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::BigInt(i64::from(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::BigInt(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::Timestamp(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

impl From<JsonValue> for Value {
    fn from(v: JsonValue) -> Self {
        Value::from_json(&v)
    }
}
