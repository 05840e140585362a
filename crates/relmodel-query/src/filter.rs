//! The filter tree.
//!
//! Caller input is parsed once into a [`FilterNode`] tree; the SQL compiler
//! and the in-memory evaluator are separate passes over the same immutable
//! structure.
//!
//! Two input shapes are accepted:
//!
//! - a flat map, `{"status": "active", "age": [1, 2]}`, read as an AND of
//!   equality leaves;
//! - a structured form, `{"where": [...]}`, whose entries are leaf
//!   descriptors `{key, condition?, chain?, value, date?}` or nested groups
//!   `{chain?, where: [...]}`.

use relmodel_core::{ColumnCatalog, Error, ModelError, ModelErrorKind, Result, coerce};
use serde_json::{Map, Value as JsonValue};

use crate::typed::TypedValue;

/// Comparison applied by a leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    Equals,
    NotEquals,
    Gt,
    Lt,
    Gte,
    Lte,
    Like,
    NotLike,
    In,
    IsNull,
    IsNotNull,
}

impl Condition {
    /// Parse a condition token (case-insensitive).
    pub fn parse(token: &str) -> Result<Self> {
        Ok(match token.trim().to_ascii_lowercase().as_str() {
            "=" | "==" | "equal" | "equals" | "is" => Condition::Equals,
            "!" | "!=" | "<>" | "not" | "not_equal" | "not_equals" | "is_not" => {
                Condition::NotEquals
            }
            "gt" | "greater_than" | ">" => Condition::Gt,
            "lt" | "less_than" | "<" => Condition::Lt,
            "gte" | ">=" => Condition::Gte,
            "lte" | "<=" => Condition::Lte,
            "like" | "lk" => Condition::Like,
            "not_like" | "nl" => Condition::NotLike,
            "in" | "[]" | "()" => Condition::In,
            "is_null" => Condition::IsNull,
            "is_not_null" => Condition::IsNotNull,
            _ => {
                return Err(ModelError::new(
                    ModelErrorKind::UnknownCondition,
                    format!("unknown condition '{token}'"),
                )
                .into());
            }
        })
    }

    /// The SQL operator for binary conditions.
    pub const fn as_sql(self) -> &'static str {
        match self {
            Condition::Equals => "=",
            Condition::NotEquals => "<>",
            Condition::Gt => ">",
            Condition::Lt => "<",
            Condition::Gte => ">=",
            Condition::Lte => "<=",
            Condition::Like => "LIKE",
            Condition::NotLike => "NOT LIKE",
            Condition::In => "IN",
            Condition::IsNull => "IS NULL",
            Condition::IsNotNull => "IS NOT NULL",
        }
    }
}

/// Boolean connective placed before a node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Chain {
    #[default]
    And,
    Or,
}

impl Chain {
    /// Parse a chain token (case-insensitive).
    pub fn parse(token: &str) -> Result<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "and" | "&" | "&&" => Ok(Chain::And),
            "or" | "|" | "||" => Ok(Chain::Or),
            _ => Err(ModelError::new(
                ModelErrorKind::UnknownChain,
                format!("unknown chain '{token}'"),
            )
            .into()),
        }
    }

    pub const fn as_sql(self) -> &'static str {
        match self {
            Chain::And => "AND",
            Chain::Or => "OR",
        }
    }
}

/// The right-hand side of a leaf after normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Single(TypedValue),
    List(Vec<TypedValue>),
}

/// A single comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct Leaf {
    pub key: String,
    pub condition: Condition,
    pub operand: Operand,
    pub chain: Chain,
    pub date_cast: bool,
}

/// A chain-joined sequence of nodes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Group {
    pub chain: Chain,
    pub children: Vec<FilterNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterNode {
    Leaf(Leaf),
    Group(Group),
}

impl FilterNode {
    pub fn chain(&self) -> Chain {
        match self {
            FilterNode::Leaf(leaf) => leaf.chain,
            FilterNode::Group(group) => group.chain,
        }
    }
}

impl Leaf {
    /// Build a leaf, applying the condition normalization rules:
    ///
    /// - an array operand is a list of decoded operands;
    /// - a list of at most one element collapses to that element (an empty
    ///   list to `NULL`) unless the condition is `IN`;
    /// - `=` with a longer list becomes `IN`;
    /// - `=` / `<>` against `NULL` become `IS NULL` / `IS NOT NULL`.
    pub fn new(
        key: impl Into<String>,
        condition: Condition,
        value: &JsonValue,
        chain: Chain,
        date_cast: bool,
    ) -> Result<Self> {
        let key = key.into();
        let operand = match TypedValue::decode(value) {
            TypedValue::Raw(JsonValue::Array(items)) => {
                Operand::List(items.iter().map(TypedValue::decode).collect())
            }
            other => Operand::Single(other),
        };
        let (condition, operand) = normalize(&key, condition, operand)?;
        Ok(Self {
            key,
            condition,
            operand,
            chain,
            date_cast,
        })
    }

    /// `key IS NULL`
    pub fn is_null(key: impl Into<String>, chain: Chain) -> Self {
        Self {
            key: key.into(),
            condition: Condition::IsNull,
            operand: Operand::Single(TypedValue::Raw(JsonValue::Null)),
            chain,
            date_cast: false,
        }
    }
}

fn normalize(key: &str, condition: Condition, operand: Operand) -> Result<(Condition, Operand)> {
    let operand = match operand {
        Operand::Single(value) if condition == Condition::In => Operand::List(vec![value]),
        Operand::List(mut items) if items.len() <= 1 && condition != Condition::In => {
            Operand::Single(items.pop().unwrap_or(TypedValue::Raw(JsonValue::Null)))
        }
        other => other,
    };

    Ok(match (condition, operand) {
        (Condition::Equals, Operand::List(items)) => (Condition::In, Operand::List(items)),
        (Condition::In, list) => (Condition::In, list),
        (other, Operand::List(_)) => {
            return Err(ModelError::new(
                ModelErrorKind::TypeMismatch,
                format!(
                    "a list operand is only valid with '=' or 'in', not '{}'",
                    other.as_sql()
                ),
            )
            .with_key(key)
            .into());
        }
        (Condition::Equals, Operand::Single(v)) if v.is_null() => {
            (Condition::IsNull, Operand::Single(v))
        }
        (Condition::NotEquals, Operand::Single(v)) if v.is_null() => {
            (Condition::IsNotNull, Operand::Single(v))
        }
        (other, single) => (other, single),
    })
}

/// Parse caller input into the root group.
///
/// Fails with `BadWhereStructure` when the input is not an object or a
/// structured entry is malformed, and with `UnknownColumn` when a leaf key is
/// not in the catalog.
pub fn parse_where(input: &JsonValue, catalog: &ColumnCatalog) -> Result<Group> {
    let JsonValue::Object(map) = input else {
        return Err(bad_structure("where argument must be an object"));
    };

    let group = match map.get("where") {
        Some(entries) => Group {
            chain: Chain::And,
            children: parse_entries(entries, catalog)?,
        },
        None => parse_flat(map, catalog)?,
    };

    tracing::trace!(children = group.children.len(), "Parsed filter tree");
    Ok(group)
}

fn parse_flat(map: &Map<String, JsonValue>, catalog: &ColumnCatalog) -> Result<Group> {
    let children = map
        .iter()
        .map(|(key, value)| {
            check_column(key, catalog)?;
            Leaf::new(key.clone(), Condition::Equals, value, Chain::And, false)
                .map(FilterNode::Leaf)
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Group {
        chain: Chain::And,
        children,
    })
}

fn parse_entries(entries: &JsonValue, catalog: &ColumnCatalog) -> Result<Vec<FilterNode>> {
    match entries {
        JsonValue::Array(items) => items.iter().map(|e| parse_entry(e, catalog)).collect(),
        JsonValue::Object(_) => Ok(vec![parse_entry(entries, catalog)?]),
        _ => Err(bad_structure("'where' must be an array of conditions")),
    }
}

fn parse_entry(entry: &JsonValue, catalog: &ColumnCatalog) -> Result<FilterNode> {
    let JsonValue::Object(map) = entry else {
        return Err(bad_structure("where entries must be objects"));
    };

    let chain = match map.get("chain") {
        None | Some(JsonValue::Null) => Chain::And,
        Some(JsonValue::String(token)) => Chain::parse(token)?,
        Some(_) => return Err(bad_structure("'chain' must be a string")),
    };

    if let Some(entries) = map.get("where") {
        return Ok(FilterNode::Group(Group {
            chain,
            children: parse_entries(entries, catalog)?,
        }));
    }

    let key = match map.get("key") {
        Some(JsonValue::String(key)) => key,
        _ => return Err(bad_structure("where entries need a string 'key'")),
    };
    check_column(key, catalog)?;

    let condition = match map.get("condition") {
        None | Some(JsonValue::Null) => Condition::Equals,
        Some(JsonValue::String(token)) => Condition::parse(token)?,
        Some(_) => return Err(bad_structure("'condition' must be a string")),
    };
    let value = map.get("value").unwrap_or(&JsonValue::Null);
    let date_cast = map.get("date").is_some_and(coerce::js_truthy);

    Leaf::new(key.clone(), condition, value, chain, date_cast).map(FilterNode::Leaf)
}

pub(crate) fn check_column(key: &str, catalog: &ColumnCatalog) -> Result<()> {
    if catalog.contains(key) {
        Ok(())
    } else {
        Err(ModelError::new(
            ModelErrorKind::UnknownColumn,
            format!("'{key}' is not a column of this model"),
        )
        .with_key(key)
        .with_expected(catalog.expected())
        .into())
    }
}

fn bad_structure(message: &str) -> Error {
    Error::model(ModelErrorKind::BadWhereStructure, message)
}
