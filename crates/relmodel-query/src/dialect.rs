//! SQL dialects and parameter allocation.

use relmodel_core::{Value, inject_identifier};
use serde::{Deserialize, Serialize};

/// SQL dialect for generating dialect-specific SQL.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// MySQL dialect (uses backtick quoting and ? placeholders)
    Mysql,
    /// PostgreSQL dialect (uses double-quote quoting and $1, $2 placeholders)
    #[default]
    Postgres,
}

impl Dialect {
    /// The identifier quote character.
    pub const fn quote_char(self) -> char {
        match self {
            Dialect::Mysql => '`',
            Dialect::Postgres => '"',
        }
    }

    /// Sanitize and quote an identifier for this dialect.
    ///
    /// See [`inject_identifier`] for the sanitization rules.
    pub fn quote_identifier(self, name: &str) -> String {
        inject_identifier(name, self.quote_char())
    }

    /// Generate a placeholder for the given parameter index (1-based).
    pub fn placeholder(self, index: usize) -> String {
        match self {
            Dialect::Mysql => "?".to_string(),
            Dialect::Postgres => format!("${index}"),
        }
    }

    /// Wrap an expression in a calendar-date cast.
    pub fn date_cast(self, expr: &str) -> String {
        format!("DATE({expr})")
    }

    /// Check if this dialect supports `RETURNING`.
    pub const fn supports_returning(self) -> bool {
        matches!(self, Dialect::Postgres)
    }

    /// Do NULLs sort before non-NULL values in ascending order?
    ///
    /// MySQL treats NULL as the smallest value; Postgres as the largest.
    pub const fn nulls_sort_first(self) -> bool {
        matches!(self, Dialect::Mysql)
    }

    /// Build a ` RETURNING ...` suffix, or `None` when there is nothing to
    /// return or the dialect cannot return rows from a write.
    pub fn returning_clause(self, columns: &[String]) -> Option<String> {
        if columns.is_empty() || !self.supports_returning() {
            return None;
        }
        let cols = columns
            .iter()
            .map(|c| self.quote_identifier(c))
            .collect::<Vec<_>>()
            .join(", ");
        Some(format!(" RETURNING {cols}"))
    }

    /// Start a fresh parameter allocator for one statement.
    pub fn allocator(self) -> ParamAllocator {
        ParamAllocator::new(self)
    }
}

/// Collects bound parameters for one statement and hands out placeholders.
///
/// A single allocator is threaded by reference through every clause of a
/// statement, so Postgres numbering continues across clauses (an UPDATE's
/// `SET` parameters come first, its `WHERE` parameters continue the count).
#[derive(Debug, Clone)]
pub struct ParamAllocator {
    dialect: Dialect,
    offset: usize,
    params: Vec<Value>,
}

impl ParamAllocator {
    pub fn new(dialect: Dialect) -> Self {
        Self::with_offset(dialect, 0)
    }

    /// Start numbering after `offset` parameters bound elsewhere.
    pub fn with_offset(dialect: Dialect, offset: usize) -> Self {
        Self {
            dialect,
            offset,
            params: Vec::new(),
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Bind a value and return its placeholder.
    pub fn bind(&mut self, value: impl Into<Value>) -> String {
        let value = value.into();
        if matches!(value, Value::Default) {
            return "DEFAULT".to_string();
        }
        self.params.push(value);
        self.dialect.placeholder(self.offset + self.params.len())
    }

    /// Number of parameters bound so far (excluding the offset).
    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn params(&self) -> &[Value] {
        &self.params
    }

    pub fn into_params(self) -> Vec<Value> {
        self.params
    }
}
