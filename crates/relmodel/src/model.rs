//! The CRUD surface.
//!
//! A [`Model`] binds a [`ModelConfig`] to a [`Driver`]. Every operation
//! validates and compiles its arguments synchronously, then issues exactly
//! one `execute` and awaits it. Validation failures never reach the driver.

use asupersync::{Cx, Outcome};
use relmodel_core::{
    ColumnCatalog, DataMapper, Driver, DriverError, Error, ModelError, ModelErrorKind, Record,
    Result, Value, coerce,
};
use relmodel_query::{
    Chain, CompiledSql, Condition, Dialect, Direction, FilterNode, Group, Leaf, OrderSpec, Query,
};
use serde_json::Value as JsonValue;

use crate::config::ModelConfig;
use crate::statement;
use crate::translate::{self, Translation};

/// How [`Model::delete`] removes a record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeleteMode {
    /// Soft delete when the model has soft delete enabled, hard otherwise
    #[default]
    Auto,
    /// Set the delete timestamp
    Soft,
    /// Remove the row
    Hard,
}

/// A single-table model over a driver.
#[derive(Debug)]
pub struct Model<D> {
    driver: D,
    config: ModelConfig,
    writable: ColumnCatalog,
}

impl<D: Driver> Model<D> {
    /// Create a model. Fails if the configuration is unusable.
    pub fn new(driver: D, config: ModelConfig) -> Result<Self> {
        config.validate()?;
        let writable = config.writable_columns();
        tracing::debug!(
            table = %config.table,
            dialect = ?config.dialect,
            columns = config.columns.len(),
            writable = writable.len(),
            "Created model"
        );
        Ok(Self {
            driver,
            config,
            writable,
        })
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn dialect(&self) -> Dialect {
        self.config.dialect
    }

    pub fn columns(&self) -> &ColumnCatalog {
        &self.config.columns
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Parse a filter argument against this model's columns.
    pub fn query(&self, filter: &JsonValue) -> Result<Query> {
        Query::parse(filter, &self.config.columns)
    }

    /// Fetch one live record by primary key.
    pub async fn get(&self, cx: &Cx, id: impl Into<Value>) -> Outcome<Option<Record>, Error> {
        let stmt = statement::select_by_id(&self.config, id.into());
        self.execute(cx, stmt, false)
            .await
            .map(|rows| rows.into_iter().next())
    }

    /// Fetch every live record matching a filter, honoring any `order`,
    /// `limit` and `offset` next to a structured `where`.
    pub async fn find(&self, cx: &Cx, filter: &JsonValue) -> Outcome<Vec<Record>, Error> {
        let query = match self.query(filter) {
            Ok(query) => query,
            Err(e) => return Outcome::Err(e),
        };
        self.execute(cx, statement::select(&self.config, &query), false)
            .await
    }

    /// Fetch every live record.
    pub async fn all(&self, cx: &Cx) -> Outcome<Vec<Record>, Error> {
        self.execute(cx, statement::select(&self.config, &Query::all()), false)
            .await
    }

    /// The oldest live record by creation time.
    pub async fn first(
        &self,
        cx: &Cx,
        filter: Option<&JsonValue>,
    ) -> Outcome<Option<Record>, Error> {
        self.edge(cx, filter, Direction::Asc).await
    }

    /// The newest live record by creation time.
    pub async fn last(
        &self,
        cx: &Cx,
        filter: Option<&JsonValue>,
    ) -> Outcome<Option<Record>, Error> {
        self.edge(cx, filter, Direction::Desc).await
    }

    async fn edge(
        &self,
        cx: &Cx,
        filter: Option<&JsonValue>,
        direction: Direction,
    ) -> Outcome<Option<Record>, Error> {
        let Some(key) = self.config.created_column.clone() else {
            return Outcome::Err(Error::model(
                ModelErrorKind::MissingOrderColumn,
                format!(
                    "model '{}' has no creation timestamp column to order by",
                    self.config.table
                ),
            ));
        };
        let query = match filter.map(|f| self.query(f)).transpose() {
            Ok(query) => query.unwrap_or_default(),
            Err(e) => return Outcome::Err(e),
        };
        let query = query
            .with_order(OrderSpec { key, direction })
            .with_limit(1);
        self.execute(cx, statement::select(&self.config, &query), false)
            .await
            .map(|rows| rows.into_iter().next())
    }

    /// Count live records matching an optional filter.
    pub async fn count(&self, cx: &Cx, filter: Option<&JsonValue>) -> Outcome<u64, Error> {
        let query = match filter.map(|f| self.query(f)).transpose() {
            Ok(query) => query.unwrap_or_default(),
            Err(e) => return Outcome::Err(e),
        };
        let stmt = statement::count(&self.config, &query.filter);
        self.execute(cx, stmt, false).await.map(|rows| {
            rows.first()
                .and_then(|row| row.get("count"))
                .map(coerce::js_number)
                .filter(|n| n.is_finite() && *n >= 0.0)
                .map_or(0, |n| n as u64)
        })
    }

    /// Run a filter (with optional order and paging) over records that are
    /// already in memory. Selects exactly what [`Model::find`] would select
    /// from a table holding those records.
    pub fn filter_records(&self, filter: &JsonValue, records: &[Record]) -> Result<Vec<Record>> {
        Ok(self.query(filter)?.apply(self.config.dialect, records))
    }

    /// Insert one record (an object) or a batch (an array of objects).
    ///
    /// System-owned columns are dropped from the payload. `returning` names
    /// the columns to hand back; it is ignored on MySQL.
    pub async fn insert(
        &self,
        cx: &Cx,
        data: &JsonValue,
        returning: Option<&[&str]>,
    ) -> Outcome<Vec<Record>, Error> {
        let stmt = match self.prepare_insert(data, returning) {
            Ok(stmt) => stmt,
            Err(e) => return Outcome::Err(e),
        };
        self.execute(cx, stmt, true).await
    }

    fn prepare_insert(&self, data: &JsonValue, returning: Option<&[&str]>) -> Result<CompiledSql> {
        let mapper = DataMapper::new(&self.writable, self.config.naming);
        let rows = match data {
            JsonValue::Array(_) => mapper.map_many(data, false)?,
            _ => vec![mapper.map_one(data, false)?],
        };
        statement::insert(&self.config, &self.writable, &rows, &returning_columns(returning))
    }

    /// Update records.
    ///
    /// `target` is either a primary key value or a filter object (flat or
    /// structured). `data` is mapped in partial mode, so only supplied
    /// columns are written.
    pub async fn update(
        &self,
        cx: &Cx,
        target: &JsonValue,
        data: &JsonValue,
        returning: Option<&[&str]>,
    ) -> Outcome<Vec<Record>, Error> {
        let stmt = match self.prepare_update(target, data, returning) {
            Ok(stmt) => stmt,
            Err(e) => return Outcome::Err(e),
        };
        self.execute(cx, stmt, true).await
    }

    fn prepare_update(
        &self,
        target: &JsonValue,
        data: &JsonValue,
        returning: Option<&[&str]>,
    ) -> Result<CompiledSql> {
        let filter = self.target_filter(target)?;
        let mapper = DataMapper::new(&self.writable, self.config.naming);
        let record = mapper.map_one(data, true)?;
        statement::update(
            &self.config,
            &self.writable,
            &record,
            &filter,
            &returning_columns(returning),
        )
    }

    fn target_filter(&self, target: &JsonValue) -> Result<Group> {
        let filter = match target {
            JsonValue::Object(_) => self.query(target)?.filter,
            JsonValue::String(_) | JsonValue::Number(_) => Group {
                chain: Chain::And,
                children: vec![FilterNode::Leaf(Leaf::new(
                    self.config.id_column.clone(),
                    Condition::Equals,
                    target,
                    Chain::And,
                    false,
                )?)],
            },
            _ => Group::default(),
        };
        if filter.children.is_empty() {
            return Err(ModelError::new(
                ModelErrorKind::BadWhereStructure,
                "update target must be a primary key or a non-empty filter",
            )
            .with_expected(self.config.columns.expected())
            .into());
        }
        Ok(filter)
    }

    /// Delete a record by primary key.
    pub async fn delete(
        &self,
        cx: &Cx,
        id: impl Into<Value>,
        mode: DeleteMode,
    ) -> Outcome<Vec<Record>, Error> {
        let soft = match mode {
            DeleteMode::Auto => self.config.soft_delete_column().is_some(),
            DeleteMode::Soft => true,
            DeleteMode::Hard => false,
        };
        let stmt = if soft {
            let deleted = match self.delete_column() {
                Ok(column) => column,
                Err(e) => return Outcome::Err(e),
            };
            let now = Value::Timestamp(chrono::Utc::now().naive_utc());
            statement::set_deleted(&self.config, deleted, now, id.into())
        } else {
            statement::hard_delete(&self.config, id.into())
        };
        self.execute(cx, stmt, true).await
    }

    /// Clear the delete timestamp of a soft-deleted record.
    pub async fn restore(&self, cx: &Cx, id: impl Into<Value>) -> Outcome<Vec<Record>, Error> {
        let deleted = match self.delete_column() {
            Ok(column) => column,
            Err(e) => return Outcome::Err(e),
        };
        let stmt = statement::set_deleted(&self.config, deleted, Value::Null, id.into());
        self.execute(cx, stmt, true).await
    }

    fn delete_column(&self) -> Result<&str> {
        self.config.deleted_column.as_deref().ok_or_else(|| {
            Error::model(
                ModelErrorKind::MissingDeleteColumn,
                format!("model '{}' has no delete timestamp column", self.config.table),
            )
        })
    }

    /// Translate a driver error into `{kind, detail}`, or describe the
    /// expected columns when there is no error.
    pub fn translate_error(&self, error: Option<&DriverError>) -> Translation {
        translate::translate(self.config.dialect, error, &self.config.columns)
    }

    async fn execute(
        &self,
        cx: &Cx,
        stmt: CompiledSql,
        write: bool,
    ) -> Outcome<Vec<Record>, Error> {
        tracing::debug!(
            table = %self.config.table,
            sql = %stmt.sql,
            params = stmt.params.len(),
            "Executing statement"
        );
        match self.driver.execute(cx, &stmt.sql, &stmt.params).await {
            Outcome::Ok(response) => Outcome::Ok(response.into_rows()),
            Outcome::Err(e) if write => Outcome::Err(self.write_error(e)),
            Outcome::Err(e) => Outcome::Err(Error::Driver(e)),
            Outcome::Cancelled(r) => Outcome::Cancelled(r),
            Outcome::Panicked(p) => Outcome::Panicked(p),
        }
    }

    /// Unique violations on Postgres become `DuplicateValue`; everything else
    /// propagates unchanged.
    fn write_error(&self, error: DriverError) -> Error {
        if self.config.dialect != Dialect::Postgres || !error.is_unique_violation() {
            return Error::Driver(error);
        }
        let column = translate::unique_column(self.config.dialect, &error);
        tracing::warn!(
            table = %self.config.table,
            column = column.as_deref().unwrap_or("?"),
            "Unique constraint violated"
        );
        let mut model_error = ModelError::new(
            ModelErrorKind::DuplicateValue,
            error.detail.unwrap_or(error.message),
        )
        .with_expected(self.config.columns.expected());
        if let Some(column) = column {
            model_error = model_error.with_key(column);
        }
        model_error.into()
    }
}

fn returning_columns(returning: Option<&[&str]>) -> Vec<String> {
    returning
        .unwrap_or_default()
        .iter()
        .map(|c| (*c).to_string())
        .collect()
}
