//! Filter operand decoding.
//!
//! A filter value arrives either as a bare literal or as a one-key wrapper
//! that states how the literal should be read:
//! `{value}`, `{string}`, `{number}`, `{boolean}`, `{date}` or `{dateTime}`.
//! The shape is inspected once here; everything downstream works on the
//! decoded [`TypedValue`].

use chrono::{NaiveDate, NaiveDateTime};
use relmodel_core::{Value, coerce};
use serde_json::Value as JsonValue;

/// Wrapper keys in precedence order.
const WRAPPER_KEYS: [&str; 6] = ["value", "string", "number", "boolean", "date", "dateTime"];

/// A decoded filter operand.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    /// A literal passed through unchanged
    Raw(JsonValue),
    /// `{string: x}` cast with `String(x)`
    Text(String),
    /// `{number: x}` cast with `Number(x)`; may be NaN
    Number(f64),
    /// `{boolean: x}` cast with `Boolean(x)`
    Boolean(bool),
    /// `{date: x}` cast with `new Date(x)`; `None` is an invalid date
    Date(Option<NaiveDate>),
    /// `{dateTime: x}` cast with `new Date(x)`; `None` is an invalid date
    DateTime(Option<NaiveDateTime>),
}

impl TypedValue {
    /// Decode a literal or wrapper.
    ///
    /// A wrapper key that is present wins even when its value is `null`.
    /// Objects with no wrapper key pass through as [`TypedValue::Raw`].
    pub fn decode(input: &JsonValue) -> Self {
        if let JsonValue::Object(map) = input {
            for key in WRAPPER_KEYS {
                let Some(inner) = map.get(key) else {
                    continue;
                };
                return match key {
                    "value" => TypedValue::Raw(inner.clone()),
                    "string" => TypedValue::Text(coerce::js_string(inner)),
                    "number" => TypedValue::Number(coerce::js_number(inner)),
                    "boolean" => TypedValue::Boolean(coerce::js_truthy(inner)),
                    "date" => TypedValue::Date(coerce::js_date(inner).map(|d| d.date())),
                    _ => TypedValue::DateTime(coerce::js_date(inner)),
                };
            }
        }
        TypedValue::Raw(input.clone())
    }

    /// Is this the SQL `NULL` literal?
    pub fn is_null(&self) -> bool {
        matches!(self, TypedValue::Raw(JsonValue::Null))
    }

    /// The parameter bound for this operand.
    ///
    /// Invalid dates and NaN bind as `NULL`; integral numbers bind as
    /// integers.
    pub fn to_value(&self) -> Value {
        match self {
            TypedValue::Raw(json) => Value::from_json(json),
            TypedValue::Text(s) => Value::Text(s.clone()),
            TypedValue::Number(n) => {
                if n.is_nan() || n.is_infinite() {
                    Value::Null
                } else if n.fract() == 0.0 && n.abs() < 9.0e15 {
                    Value::BigInt(*n as i64)
                } else {
                    Value::Double(*n)
                }
            }
            TypedValue::Boolean(b) => Value::Bool(*b),
            TypedValue::Date(d) => (*d).into(),
            TypedValue::DateTime(dt) => (*dt).into(),
        }
    }
}
