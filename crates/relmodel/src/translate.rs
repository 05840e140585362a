//! Driver error translation.
//!
//! Maps dialect-specific error codes to a uniform `{kind, detail}` shape
//! that callers can render without knowing which backend produced it.

use relmodel_core::{ColumnCatalog, DriverError, pattern};
use relmodel_query::Dialect;
use serde::Serialize;
use serde_json::Value as JsonValue;

/// Normalized category of a driver failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TranslatedKind {
    /// A value could not be cast to `uuid`
    InvalidUuid,
    /// A unique constraint rejected the write
    DuplicateValue,
    /// A foreign key has no referenced row
    ForeignKeyViolation,
    /// A `NOT NULL` column received `NULL`
    NotNullViolation,
    /// A value does not fit its column type
    TypeMismatch,
    /// Any code without a mapping
    Unknown,
}

/// A translated driver error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranslatedError {
    pub kind: TranslatedKind,
    /// The driver's raw code
    pub code: String,
    /// Offending column, when the driver text names one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    /// Driver detail text, or its message when there is no detail
    pub detail: String,
}

/// Result of [`translate`].
#[derive(Debug, Clone, PartialEq)]
pub enum Translation {
    Error(TranslatedError),
    /// No error: the expected column catalog, for debugging
    Expected(JsonValue),
}

/// Translate a driver error, or describe the expected columns when there is
/// none.
pub fn translate(
    dialect: Dialect,
    error: Option<&DriverError>,
    catalog: &ColumnCatalog,
) -> Translation {
    let Some(error) = error else {
        return Translation::Expected(catalog.expected());
    };

    let kind = match dialect {
        Dialect::Postgres => postgres_kind(&error.code),
        Dialect::Mysql => mysql_kind(&error.code),
    };
    let column = match kind {
        TranslatedKind::DuplicateValue => unique_column(dialect, error),
        _ => None,
    };

    Translation::Error(TranslatedError {
        kind,
        code: error.code.clone(),
        column,
        detail: error.detail.clone().unwrap_or_else(|| error.message.clone()),
    })
}

fn postgres_kind(code: &str) -> TranslatedKind {
    match code {
        "22P02" => TranslatedKind::InvalidUuid,
        "23505" => TranslatedKind::DuplicateValue,
        "23503" => TranslatedKind::ForeignKeyViolation,
        "23502" => TranslatedKind::NotNullViolation,
        _ => TranslatedKind::Unknown,
    }
}

fn mysql_kind(code: &str) -> TranslatedKind {
    match code {
        "1062" | "ER_DUP_ENTRY" => TranslatedKind::DuplicateValue,
        "1452" | "ER_NO_REFERENCED_ROW_2" => TranslatedKind::ForeignKeyViolation,
        "1048" | "ER_BAD_NULL_ERROR" => TranslatedKind::NotNullViolation,
        "1411" | "ER_WRONG_VALUE_FOR_TYPE" => TranslatedKind::TypeMismatch,
        _ => TranslatedKind::Unknown,
    }
}

/// Column named by a unique violation.
///
/// Postgres reports `Key (email)=(a@b.c) already exists.` in the detail;
/// MySQL reports `Duplicate entry 'a@b.c' for key 'users.email'` in the
/// message.
pub fn unique_column(dialect: Dialect, error: &DriverError) -> Option<String> {
    let (text, re) = match dialect {
        Dialect::Postgres => (
            error.detail.as_deref().unwrap_or(&error.message),
            r"Key \(([^)]+)\)=",
        ),
        Dialect::Mysql => (error.message.as_str(), r"for key '([^']+)'"),
    };
    let regex = match pattern::cached_regex(re) {
        Ok(regex) => regex,
        Err(e) => {
            tracing::warn!(error = %e, "Invalid unique-violation pattern");
            return None;
        }
    };
    let captured = regex.captures(text)?.get(1)?.as_str();
    // MySQL 8 prefixes the key with the table name.
    let column = captured.rsplit('.').next().unwrap_or(captured);
    Some(column.to_string())
}
