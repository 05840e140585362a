//! Model configuration.
//!
//! A model is declared by its table, its column catalog and the names of the
//! system-owned columns. Configs can be built in code or deserialized:
//!
//! ```json
//! {
//!   "table": "users",
//!   "dialect": "postgres",
//!   "columns": [
//!     {"name": "id", "type": "serial"},
//!     {"name": "email", "type": "string", "required": true},
//!     {"name": "deleted_at", "type": "timestamp"}
//!   ],
//!   "created_column": "created_at",
//!   "deleted_column": "deleted_at"
//! }
//! ```

use relmodel_core::{ColumnCatalog, Error, NamingConvention, Result};
use relmodel_query::Dialect;
use serde::{Deserialize, Serialize};

fn default_id_column() -> String {
    "id".to_string()
}

/// Declaration of a single-table model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Table name (sanitized and quoted on every use)
    pub table: String,
    /// SQL dialect of the backing driver
    #[serde(default)]
    pub dialect: Dialect,
    /// Column catalog
    #[serde(default)]
    pub columns: ColumnCatalog,
    /// Primary key column (default: `id`)
    #[serde(default = "default_id_column")]
    pub id_column: String,
    /// Creation timestamp column, required by `first`/`last`
    #[serde(default)]
    pub created_column: Option<String>,
    /// Last-update timestamp column
    #[serde(default)]
    pub updated_column: Option<String>,
    /// Soft-delete timestamp column
    #[serde(default)]
    pub deleted_column: Option<String>,
    /// Soft delete on `delete` (default: on whenever a delete column exists)
    #[serde(default)]
    pub soft_delete: Option<bool>,
    /// Accept caller-supplied primary keys on insert/update
    #[serde(default)]
    pub keep_id: bool,
    /// Payload key convention
    #[serde(default)]
    pub naming: NamingConvention,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            table: String::new(),
            dialect: Dialect::default(),
            columns: ColumnCatalog::default(),
            id_column: default_id_column(),
            created_column: None,
            updated_column: None,
            deleted_column: None,
            soft_delete: None,
            keep_id: false,
            naming: NamingConvention::default(),
        }
    }
}

impl ModelConfig {
    /// Create a configuration for a table with the given catalog.
    pub fn new(table: impl Into<String>, columns: impl Into<ColumnCatalog>) -> Self {
        Self {
            table: table.into(),
            columns: columns.into(),
            ..Default::default()
        }
    }

    /// Set the dialect.
    pub fn dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    /// Set the primary key column.
    pub fn id_column(mut self, column: impl Into<String>) -> Self {
        self.id_column = column.into();
        self
    }

    /// Set the creation timestamp column.
    pub fn created_column(mut self, column: impl Into<String>) -> Self {
        self.created_column = Some(column.into());
        self
    }

    /// Set the update timestamp column.
    pub fn updated_column(mut self, column: impl Into<String>) -> Self {
        self.updated_column = Some(column.into());
        self
    }

    /// Set the soft-delete timestamp column.
    pub fn deleted_column(mut self, column: impl Into<String>) -> Self {
        self.deleted_column = Some(column.into());
        self
    }

    /// Enable or disable soft delete explicitly.
    pub fn soft_delete(mut self, enabled: bool) -> Self {
        self.soft_delete = Some(enabled);
        self
    }

    /// Keep caller-supplied primary keys.
    pub fn keep_id(mut self, keep: bool) -> Self {
        self.keep_id = keep;
        self
    }

    /// Set the payload naming convention.
    pub fn naming(mut self, naming: NamingConvention) -> Self {
        self.naming = naming;
        self
    }

    /// The delete column, when soft delete is in effect.
    pub fn soft_delete_column(&self) -> Option<&str> {
        let column = self.deleted_column.as_deref()?;
        self.soft_delete.unwrap_or(true).then_some(column)
    }

    /// Columns the caller may write: everything except the system-owned
    /// timestamp columns and, unless `keep_id` is set, the primary key.
    pub fn writable_columns(&self) -> ColumnCatalog {
        let mut system: Vec<&str> = [
            self.created_column.as_deref(),
            self.updated_column.as_deref(),
            self.deleted_column.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect();
        if !self.keep_id {
            system.push(&self.id_column);
        }
        self.columns.without(&system)
    }

    /// Check the configuration is usable.
    pub fn validate(&self) -> Result<()> {
        if relmodel_core::sanitize_identifier(&self.table).is_empty() {
            return Err(Error::Custom(format!(
                "model table name '{}' is empty after sanitization",
                self.table
            )));
        }
        if self.columns.is_empty() {
            return Err(Error::Custom(format!(
                "model '{}' declares no columns",
                self.table
            )));
        }
        if self.soft_delete == Some(true) && self.deleted_column.is_none() {
            return Err(Error::Custom(format!(
                "model '{}' enables soft delete without a delete column",
                self.table
            )));
        }
        Ok(())
    }
}
