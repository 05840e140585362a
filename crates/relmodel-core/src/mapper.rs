//! Schema-driven payload mapping.
//!
//! [`DataMapper`] turns a flat client payload into a record keyed by column
//! name, checking required columns and column types on the way. The output is
//! itself a valid payload, so mapping already-mapped data is a no-op.

use std::net::IpAddr;

use convert_case::{Case, Casing};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::catalog::{ColumnCatalog, ColumnDefinition, TypeTag};
use crate::coerce;
use crate::connection::Record;
use crate::error::{ModelError, ModelErrorKind, Result};
use crate::pattern;

/// How payload keys relate to column names.
///
/// Columns are always snake_case. With `Camel`, payloads are expected in
/// camelCase; the snake_case form is still accepted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NamingConvention {
    Snake,
    #[default]
    Camel,
}

impl NamingConvention {
    /// The payload key to look up first for a column.
    pub fn payload_key(self, column: &str) -> String {
        match self {
            NamingConvention::Snake => column.to_string(),
            NamingConvention::Camel => column.to_case(Case::Camel),
        }
    }

    /// Candidate payload keys for a column, preferred form first.
    fn candidates(self, column: &str) -> Vec<String> {
        let preferred = self.payload_key(column);
        let alternate = match self {
            NamingConvention::Snake => column.to_case(Case::Camel),
            NamingConvention::Camel => column.to_string(),
        };
        if alternate == preferred {
            vec![preferred]
        } else {
            vec![preferred, alternate]
        }
    }
}

/// Maps payloads against a column catalog.
#[derive(Debug, Clone, Copy)]
pub struct DataMapper<'a> {
    catalog: &'a ColumnCatalog,
    naming: NamingConvention,
}

impl<'a> DataMapper<'a> {
    pub fn new(catalog: &'a ColumnCatalog, naming: NamingConvention) -> Self {
        Self { catalog, naming }
    }

    /// Map one payload.
    ///
    /// In full mode (`partial == false`) every required column must be
    /// present and non-null. In partial mode missing columns are skipped, but
    /// at least one known column must remain.
    ///
    /// An explicit `null` for a required column is rejected in both modes,
    /// so a partial update cannot clear a `NOT NULL` column.
    pub fn map_one(&self, payload: &JsonValue, partial: bool) -> Result<Record> {
        let JsonValue::Object(input) = payload else {
            return Err(self
                .error(ModelErrorKind::InvalidPayload, "payload must be an object")
                .into());
        };

        let mut out = Map::new();
        for column in self.catalog.iter() {
            let found = self
                .naming
                .candidates(&column.name)
                .into_iter()
                .find_map(|key| input.get(&key));

            match found {
                None if column.required && !partial => {
                    return Err(self.missing(column).into());
                }
                None => {}
                Some(JsonValue::Null) if column.required => {
                    return Err(self.missing(column).into());
                }
                Some(JsonValue::Null) => {
                    out.insert(column.name.clone(), JsonValue::Null);
                }
                Some(value) => {
                    let cleaned = check_value(&column.type_tag, value)
                        .ok_or_else(|| self.mismatch(column, value))?;
                    out.insert(column.name.clone(), cleaned);
                }
            }
        }

        if input.len() > out.len() {
            tracing::trace!(
                supplied = input.len(),
                mapped = out.len(),
                "Dropped payload keys with no matching column"
            );
        }

        if partial && out.is_empty() {
            return Err(self
                .error(
                    ModelErrorKind::EmptyPartialUpdate,
                    "partial payload contains no known columns",
                )
                .into());
        }

        Ok(out)
    }

    /// Map every payload in a non-empty array.
    pub fn map_many(&self, payload: &JsonValue, partial: bool) -> Result<Vec<Record>> {
        match payload {
            JsonValue::Array(items) if !items.is_empty() => items
                .iter()
                .map(|item| self.map_one(item, partial))
                .collect(),
            _ => Err(self
                .error(
                    ModelErrorKind::InvalidPayload,
                    "payload must be a non-empty array",
                )
                .into()),
        }
    }

    fn error(&self, kind: ModelErrorKind, message: &str) -> ModelError {
        ModelError::new(kind, message).with_expected(self.catalog.expected())
    }

    fn missing(&self, column: &ColumnDefinition) -> ModelError {
        self.error(
            ModelErrorKind::RequiredFieldMissing,
            "required field is missing",
        )
        .with_key(self.naming.payload_key(&column.name))
    }

    fn mismatch(&self, column: &ColumnDefinition, value: &JsonValue) -> ModelError {
        let message = format!(
            "expected {} for column '{}', found {}",
            column.type_tag,
            column.name,
            json_type_name(value)
        );
        ModelError::new(ModelErrorKind::TypeMismatch, message)
            .with_key(column.name.clone())
            .with_expected(self.catalog.expected())
    }
}

/// Check a non-null value against a type tag, returning the cleaned value.
fn check_value(tag: &TypeTag, value: &JsonValue) -> Option<JsonValue> {
    match tag {
        TypeTag::Boolean => value.is_boolean().then(|| value.clone()),
        TypeTag::String => value.is_string().then(|| value.clone()),
        TypeTag::Number | TypeTag::Float => value.is_number().then(|| value.clone()),
        TypeTag::Integer | TypeTag::Serial => match value {
            JsonValue::Number(n) if n.is_i64() || n.is_u64() => Some(value.clone()),
            JsonValue::Number(n) => n
                .as_f64()
                .filter(|f| f.fract() == 0.0 && f.is_finite())
                .map(|f| JsonValue::from(f as i64)),
            _ => None,
        },
        TypeTag::Timestamp | TypeTag::Date | TypeTag::DateTime => match value {
            JsonValue::String(_) | JsonValue::Number(_) => {
                coerce::js_date(value).map(|_| value.clone())
            }
            _ => None,
        },
        TypeTag::Uuid => value
            .as_str()
            .filter(|s| pattern::is_uuid(s))
            .map(|_| value.clone()),
        TypeTag::Cidr => value
            .as_str()
            .filter(|s| is_cidr(s))
            .map(|_| value.clone()),
        TypeTag::Json | TypeTag::Jsonb => match value {
            JsonValue::String(_) => Some(value.clone()),
            other => Some(JsonValue::String(other.to_string())),
        },
        TypeTag::Point => {
            let x = value.get("x")?.as_f64()?;
            let y = value.get("y")?.as_f64()?;
            let mut point = Map::with_capacity(2);
            point.insert("x".to_string(), value["x"].clone());
            point.insert("y".to_string(), value["y"].clone());
            (x.is_finite() && y.is_finite()).then_some(JsonValue::Object(point))
        }
        TypeTag::Enum(allowed) => value
            .as_str()
            .filter(|s| allowed.iter().any(|a| a == s))
            .map(|_| value.clone()),
        TypeTag::Array(inner) => match value {
            JsonValue::Array(items) => items
                .iter()
                .map(|item| {
                    if item.is_null() {
                        Some(JsonValue::Null)
                    } else {
                        check_value(inner, item)
                    }
                })
                .collect::<Option<Vec<_>>>()
                .map(JsonValue::Array),
            _ => None,
        },
    }
}

fn is_cidr(text: &str) -> bool {
    let (addr, prefix) = match text.split_once('/') {
        Some((addr, prefix)) => (addr, Some(prefix)),
        None => (text, None),
    };
    let Ok(ip) = addr.parse::<IpAddr>() else {
        return false;
    };
    let max = if ip.is_ipv4() { 32 } else { 128 };
    match prefix {
        None => true,
        Some(p) => p.parse::<u8>().is_ok_and(|p| p <= max),
    }
}

fn json_type_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}
