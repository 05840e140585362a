//! ORDER BY / LIMIT / OFFSET and the parsed query bundle.

use relmodel_core::{ColumnCatalog, Error, ModelError, ModelErrorKind, Result, coerce};
use serde_json::Value as JsonValue;

use crate::filter::{Group, check_column, parse_where};

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    /// Parse a direction token (case-insensitive).
    pub fn parse(token: &str) -> Result<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(Direction::Asc),
            "desc" | "descending" => Ok(Direction::Desc),
            _ => Err(ModelError::new(
                ModelErrorKind::UnknownDirection,
                format!("unknown sort direction '{token}'"),
            )
            .into()),
        }
    }

    pub const fn as_sql(self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

/// One ORDER BY term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderSpec {
    pub key: String,
    pub direction: Direction,
}

impl OrderSpec {
    /// Create an ascending order term.
    pub fn asc(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            direction: Direction::Asc,
        }
    }

    /// Create a descending order term.
    pub fn desc(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            direction: Direction::Desc,
        }
    }
}

/// A parsed `{where, order, limit, offset}` request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filter: Group,
    pub order: Vec<OrderSpec>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl Query {
    /// A query that matches everything.
    pub fn all() -> Self {
        Self::default()
    }

    /// Parse caller input.
    ///
    /// The structured form may carry `order` (a `{key, direction}` object or
    /// an array of them), `limit` and `offset` next to `where`. A flat map is
    /// a filter only.
    pub fn parse(input: &JsonValue, catalog: &ColumnCatalog) -> Result<Self> {
        let filter = parse_where(input, catalog)?;
        let mut query = Query {
            filter,
            ..Self::default()
        };

        if let Some(map) = input.as_object().filter(|m| m.contains_key("where")) {
            if let Some(order) = map.get("order") {
                query.order = parse_order(order, catalog)?;
            }
            query.limit = map.get("limit").and_then(positive_count);
            query.offset = map.get("offset").and_then(positive_count);
        }
        Ok(query)
    }

    pub fn with_order(mut self, order: OrderSpec) -> Self {
        self.order = vec![order];
        self
    }

    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = (limit > 0).then_some(limit);
        self
    }
}

fn parse_order(order: &JsonValue, catalog: &ColumnCatalog) -> Result<Vec<OrderSpec>> {
    match order {
        JsonValue::Null => Ok(Vec::new()),
        JsonValue::Array(items) => items.iter().map(|i| parse_order_term(i, catalog)).collect(),
        other => Ok(vec![parse_order_term(other, catalog)?]),
    }
}

fn parse_order_term(term: &JsonValue, catalog: &ColumnCatalog) -> Result<OrderSpec> {
    let (key, direction) = match term {
        JsonValue::String(key) => (key.as_str(), None),
        JsonValue::Object(map) => match map.get("key") {
            Some(JsonValue::String(key)) => (key.as_str(), map.get("direction")),
            _ => return Err(bad_order()),
        },
        _ => return Err(bad_order()),
    };
    check_column(key, catalog)?;
    let direction = match direction {
        None | Some(JsonValue::Null) => Direction::Asc,
        Some(JsonValue::String(token)) => Direction::parse(token)?,
        Some(_) => return Err(bad_order()),
    };
    Ok(OrderSpec {
        key: key.to_string(),
        direction,
    })
}

fn bad_order() -> Error {
    Error::model(
        ModelErrorKind::BadWhereStructure,
        "order terms must be a column name or {key, direction}",
    )
}

/// Read a limit/offset argument. Absent, zero, negative and non-numeric
/// arguments yield `None`.
pub fn positive_count(value: &JsonValue) -> Option<u64> {
    let n = match value {
        JsonValue::Number(_) | JsonValue::String(_) => coerce::js_number(value),
        _ => return None,
    };
    (n.is_finite() && n >= 1.0).then(|| n.trunc() as u64)
}
