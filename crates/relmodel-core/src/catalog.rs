//! Column catalog: the per-model map of column name to type tag and
//! required flag.
//!
//! A catalog is built once when a model is constructed and never mutated.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::error::{Error, Result};

/// The declared type of a column.
///
/// Parsed from the textual tags `boolean`, `string`, `number`, `integer`,
/// `float`, `serial`, `timestamp`, `date`, `datetime`, `uuid`, `cidr`,
/// `json`, `jsonb`, `point`, `enum[a,b,...]` and `<type>[]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TypeTag {
    Boolean,
    String,
    Number,
    Integer,
    Float,
    Serial,
    Timestamp,
    Date,
    DateTime,
    Uuid,
    Cidr,
    Json,
    Jsonb,
    Point,
    /// One of a closed set of string values
    Enum(Vec<String>),
    /// Array of the inner type
    Array(Box<TypeTag>),
}

impl TypeTag {
    /// Is this a JSON document column?
    pub const fn is_json(&self) -> bool {
        matches!(self, TypeTag::Json | TypeTag::Jsonb)
    }

    /// Is this a timestamp-like column?
    pub const fn is_temporal(&self) -> bool {
        matches!(self, TypeTag::Timestamp | TypeTag::Date | TypeTag::DateTime)
    }
}

impl FromStr for TypeTag {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let tag = s.trim();
        let lower = tag.to_ascii_lowercase();

        if let Some(rest) = lower.strip_prefix("enum[") {
            let inner = rest
                .strip_suffix(']')
                .ok_or_else(|| Error::Custom(format!("unterminated enum type tag '{tag}'")))?;
            // Keep the original casing of the allowed values.
            let start = tag.len() - rest.len();
            let original = &tag[start..start + inner.len()];
            let values = original
                .split(',')
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .collect();
            return Ok(TypeTag::Enum(values));
        }

        if let Some(inner) = lower.strip_suffix("[]") {
            return Ok(TypeTag::Array(Box::new(inner.parse()?)));
        }

        Ok(match lower.as_str() {
            "boolean" | "bool" => TypeTag::Boolean,
            "string" | "text" => TypeTag::String,
            "number" => TypeTag::Number,
            "integer" | "int" => TypeTag::Integer,
            "float" => TypeTag::Float,
            "serial" => TypeTag::Serial,
            "timestamp" => TypeTag::Timestamp,
            "date" => TypeTag::Date,
            "datetime" => TypeTag::DateTime,
            "uuid" => TypeTag::Uuid,
            "cidr" => TypeTag::Cidr,
            "json" => TypeTag::Json,
            "jsonb" => TypeTag::Jsonb,
            "point" => TypeTag::Point,
            _ => return Err(Error::Custom(format!("unknown column type tag '{tag}'"))),
        })
    }
}

impl TryFrom<String> for TypeTag {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<TypeTag> for String {
    fn from(tag: TypeTag) -> Self {
        tag.to_string()
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeTag::Boolean => f.write_str("boolean"),
            TypeTag::String => f.write_str("string"),
            TypeTag::Number => f.write_str("number"),
            TypeTag::Integer => f.write_str("integer"),
            TypeTag::Float => f.write_str("float"),
            TypeTag::Serial => f.write_str("serial"),
            TypeTag::Timestamp => f.write_str("timestamp"),
            TypeTag::Date => f.write_str("date"),
            TypeTag::DateTime => f.write_str("datetime"),
            TypeTag::Uuid => f.write_str("uuid"),
            TypeTag::Cidr => f.write_str("cidr"),
            TypeTag::Json => f.write_str("json"),
            TypeTag::Jsonb => f.write_str("jsonb"),
            TypeTag::Point => f.write_str("point"),
            TypeTag::Enum(values) => write!(f, "enum[{}]", values.join(",")),
            TypeTag::Array(inner) => write!(f, "{inner}[]"),
        }
    }
}

/// A single column of a model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    pub name: String,
    #[serde(rename = "type")]
    pub type_tag: TypeTag,
    #[serde(default)]
    pub required: bool,
}

impl ColumnDefinition {
    /// Create an optional column.
    pub fn new(name: impl Into<String>, type_tag: TypeTag) -> Self {
        Self {
            name: name.into(),
            type_tag,
            required: false,
        }
    }

    /// Mark the column as required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// Ordered, immutable set of column definitions with O(1) lookup by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<ColumnDefinition>", into = "Vec<ColumnDefinition>")]
pub struct ColumnCatalog {
    columns: Vec<ColumnDefinition>,
    name_to_index: HashMap<String, usize>,
}

impl ColumnCatalog {
    /// Build a catalog. A later definition with a duplicate name replaces the
    /// earlier one in place.
    pub fn new(definitions: Vec<ColumnDefinition>) -> Self {
        let mut columns: Vec<ColumnDefinition> = Vec::with_capacity(definitions.len());
        let mut name_to_index = HashMap::with_capacity(definitions.len());
        for def in definitions {
            if let Some(&i) = name_to_index.get(&def.name) {
                columns[i] = def;
            } else {
                name_to_index.insert(def.name.clone(), columns.len());
                columns.push(def);
            }
        }
        Self {
            columns,
            name_to_index,
        }
    }

    /// Get the number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Check if there are no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Look up a column by name.
    pub fn get(&self, name: &str) -> Option<&ColumnDefinition> {
        self.name_to_index.get(name).map(|&i| &self.columns[i])
    }

    /// Check if a column exists.
    pub fn contains(&self, name: &str) -> bool {
        self.name_to_index.contains_key(name)
    }

    /// Iterate over the columns in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &ColumnDefinition> {
        self.columns.iter()
    }

    /// Column names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// A new catalog without the named columns.
    pub fn without(&self, names: &[&str]) -> Self {
        Self::new(
            self.columns
                .iter()
                .filter(|c| !names.contains(&c.name.as_str()))
                .cloned()
                .collect(),
        )
    }

    /// The expected-column map handed to callers for debugging:
    /// `{ "<name>": { "type": "<tag>", "required": <bool> }, ... }`.
    pub fn expected(&self) -> JsonValue {
        let mut map = Map::with_capacity(self.columns.len());
        for column in &self.columns {
            let mut entry = Map::with_capacity(2);
            entry.insert(
                "type".to_string(),
                JsonValue::String(column.type_tag.to_string()),
            );
            entry.insert("required".to_string(), JsonValue::Bool(column.required));
            map.insert(column.name.clone(), JsonValue::Object(entry));
        }
        JsonValue::Object(map)
    }
}

impl From<Vec<ColumnDefinition>> for ColumnCatalog {
    fn from(definitions: Vec<ColumnDefinition>) -> Self {
        Self::new(definitions)
    }
}

impl From<ColumnCatalog> for Vec<ColumnDefinition> {
    fn from(catalog: ColumnCatalog) -> Self {
        catalog.columns
    }
}

impl FromIterator<ColumnDefinition> for ColumnCatalog {
    fn from_iter<I: IntoIterator<Item = ColumnDefinition>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
