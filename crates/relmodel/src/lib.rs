//! relmodel - single-table relational data access over SQL drivers.
//!
//! relmodel gives a table a small CRUD surface driven by JSON arguments:
//!
//! - a where/order/limit/offset filter DSL, compiled to parameterized SQL for
//!   MySQL-style or Postgres-style drivers, or evaluated directly against
//!   records already in memory with the same results
//! - schema-driven payload mapping with required-field and type checks
//! - soft delete as a timestamp column, with restore
//! - uniform translation of driver error codes
//!
//! # Quick Start
//!
//! ```ignore
//! use relmodel::prelude::*;
//! use serde_json::json;
//!
//! async fn example(cx: &Cx, driver: impl Driver) -> Outcome<(), Error> {
//!     let config = ModelConfig::new(
//!         "users",
//!         vec![
//!             ColumnDefinition::new("id", TypeTag::Serial),
//!             ColumnDefinition::new("status", TypeTag::String),
//!             ColumnDefinition::new("deleted_at", TypeTag::Timestamp),
//!         ],
//!     )
//!     .deleted_column("deleted_at");
//!     let users = match Model::new(driver, config) {
//!         Ok(model) => model,
//!         Err(e) => return Outcome::Err(e),
//!     };
//!
//!     // SELECT * FROM "users" WHERE "status" = $1 AND "deleted_at" IS NULL;
//!     let rows = match users.find(cx, &json!({"status": "active"})).await {
//!         Outcome::Ok(rows) => rows,
//!         other => return other.map(|_| ()),
//!     };
//!
//!     // The same filter over rows already in memory.
//!     let again = users.filter_records(&json!({"status": "active"}), &rows);
//!     Outcome::Ok(())
//! }
//! ```

pub mod config;
pub mod model;
pub mod statement;
pub mod translate;

pub use config::ModelConfig;
pub use model::{DeleteMode, Model};
pub use translate::{TranslatedError, TranslatedKind, Translation};

pub use relmodel_core::{
    ColumnCatalog, ColumnDefinition, Cx, DataMapper, Driver, DriverError, DriverResponse, Error,
    ModelError, ModelErrorKind, NamingConvention, Outcome, Record, Result, TypeTag, Value,
};
pub use relmodel_query::{
    CompiledSql, Condition, Dialect, Direction, Group, OrderSpec, ParamAllocator, Query,
};

/// Prelude module for convenient imports.
///
/// ```ignore
/// use relmodel::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        ColumnCatalog, ColumnDefinition, Cx, DeleteMode, Dialect, Driver, DriverError,
        DriverResponse, Error, Model, ModelConfig, ModelError, ModelErrorKind, NamingConvention,
        Outcome, Query, Record, Result, TypeTag, Value,
    };
}
