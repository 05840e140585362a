//! The driver contract.
//!
//! relmodel never opens connections itself. Everything it needs from a
//! database is a single operation, [`Driver::execute`], that takes SQL text
//! plus its bound parameters and yields rows. Pooling, retries, timeouts and
//! cancellation belong to the driver; the core just awaits the future it is
//! handed.

use asupersync::{Cx, Outcome};
use serde_json::{Map, Value as JsonValue};

use crate::error::DriverError;
use crate::value::Value;

/// A fetched row or an in-memory record: column name to JSON value.
pub type Record = Map<String, JsonValue>;

/// The two result shapes drivers hand back.
///
/// Postgres-style drivers return `{ rows }`; MySQL-style drivers return a
/// `[rows, meta]` pair. Both normalize to a plain row sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum DriverResponse {
    /// Rows only
    Rows(Vec<Record>),
    /// Rows plus driver metadata (affected rows, insert id, field packets)
    WithMeta(Vec<Record>, JsonValue),
}

impl DriverResponse {
    /// Discard driver metadata and keep the rows.
    pub fn into_rows(self) -> Vec<Record> {
        match self {
            DriverResponse::Rows(rows) | DriverResponse::WithMeta(rows, _) => rows,
        }
    }

    /// Driver metadata, if any.
    pub fn meta(&self) -> Option<&JsonValue> {
        match self {
            DriverResponse::Rows(_) => None,
            DriverResponse::WithMeta(_, meta) => Some(meta),
        }
    }
}

impl From<Vec<Record>> for DriverResponse {
    fn from(rows: Vec<Record>) -> Self {
        DriverResponse::Rows(rows)
    }
}

/// A database driver capable of executing one statement.
///
/// All operations are async and take a `Cx` context for cancellation/timeout support.
/// Implementations must be `Send + Sync` for use across async boundaries.
///
/// # Example
///
/// ```rust,ignore
/// let response = driver
///     .execute(&cx, "SELECT * FROM \"users\" WHERE \"id\" = $1", &[Value::BigInt(1)])
///     .await;
/// ```
pub trait Driver: Send + Sync {
    /// Execute a statement and return its rows.
    fn execute(
        &self,
        cx: &Cx,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Outcome<DriverResponse, DriverError>> + Send;
}
