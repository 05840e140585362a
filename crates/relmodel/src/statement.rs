//! Statement builders for the CRUD surface.
//!
//! Every builder is a pure function from a model configuration plus caller
//! arguments to one [`CompiledSql`]; the model decides which one to run.

use relmodel_core::{ColumnCatalog, Error, ModelErrorKind, Record, Result, TypeTag, Value, coerce};
use relmodel_query::{
    Chain, CompiledSql, FilterNode, Group, Leaf, ParamAllocator, Query, compile_filter,
    compile_select,
};
use serde_json::Value as JsonValue;

use crate::config::ModelConfig;

/// Restrict a filter to live rows when soft delete is on.
///
/// A filter with a top-level `OR` is wrapped in a group first, so the
/// appended `AND <deleted> IS NULL` applies to every branch.
pub fn live_filter(config: &ModelConfig, filter: &Group) -> Group {
    let Some(deleted) = config.soft_delete_column() else {
        return filter.clone();
    };
    let has_or = filter
        .children
        .iter()
        .skip(1)
        .any(|child| child.chain() == Chain::Or);
    let mut children = if has_or {
        vec![FilterNode::Group(filter.clone())]
    } else {
        filter.children.clone()
    };
    children.push(FilterNode::Leaf(Leaf::is_null(deleted, Chain::And)));
    Group {
        chain: Chain::And,
        children,
    }
}

/// `SELECT * FROM <T> WHERE <id> = <ph> [AND <deleted> IS NULL] LIMIT 1;`
pub fn select_by_id(config: &ModelConfig, id: Value) -> CompiledSql {
    let dialect = config.dialect;
    let mut alloc = dialect.allocator();
    let mut sql = format!(
        "SELECT * FROM {} WHERE {} = {}",
        dialect.quote_identifier(&config.table),
        dialect.quote_identifier(&config.id_column),
        alloc.bind(id)
    );
    if let Some(deleted) = config.soft_delete_column() {
        sql.push_str(&format!(" AND {} IS NULL", dialect.quote_identifier(deleted)));
    }
    sql.push_str(" LIMIT 1;");
    CompiledSql::new(sql, alloc.into_params())
}

/// `SELECT * FROM <T> [WHERE ...] [ORDER BY ...] [LIMIT n] [OFFSET n];`
pub fn select(config: &ModelConfig, query: &Query) -> CompiledSql {
    let scoped = Query {
        filter: live_filter(config, &query.filter),
        ..query.clone()
    };
    compile_select(&config.table, &scoped, config.dialect)
}

/// `SELECT COUNT(*) AS <count> FROM <T> [WHERE ...];`
pub fn count(config: &ModelConfig, filter: &Group) -> CompiledSql {
    let dialect = config.dialect;
    let mut alloc = dialect.allocator();
    let mut sql = format!(
        "SELECT COUNT(*) AS {} FROM {}",
        dialect.quote_identifier("count"),
        dialect.quote_identifier(&config.table)
    );
    if let Some(cond) = compile_filter(&live_filter(config, filter), &mut alloc) {
        sql.push_str(" WHERE ");
        sql.push_str(&cond);
    }
    sql.push(';');
    CompiledSql::new(sql, alloc.into_params())
}

/// `INSERT INTO <T> (<cols>) VALUES (...)[, (...)] [RETURNING ...];`
///
/// Rows come from the data mapper, keyed by column name. The column list is
/// every catalog column supplied by at least one row; a row missing one of
/// them gets `DEFAULT`. Point columns expand to `POINT(<x>, <y>)`.
pub fn insert(
    config: &ModelConfig,
    catalog: &ColumnCatalog,
    rows: &[Record],
    returning: &[String],
) -> Result<CompiledSql> {
    let columns: Vec<&str> = catalog
        .names()
        .filter(|name| rows.iter().any(|row| row.contains_key(*name)))
        .collect();
    if columns.is_empty() {
        return Err(Error::model(
            ModelErrorKind::InvalidPayload,
            "insert payload contains no writable columns",
        ));
    }

    let dialect = config.dialect;
    let mut alloc = dialect.allocator();
    let tuples = rows
        .iter()
        .map(|row| {
            let values = columns
                .iter()
                .map(|name| match row.get(*name) {
                    Some(value) => bind_column(catalog, name, value, &mut alloc),
                    None => alloc.bind(Value::Default),
                })
                .collect::<Vec<_>>()
                .join(", ");
            format!("({values})")
        })
        .collect::<Vec<_>>()
        .join(", ");

    let column_list = columns
        .iter()
        .map(|c| dialect.quote_identifier(c))
        .collect::<Vec<_>>()
        .join(", ");
    let mut sql = format!(
        "INSERT INTO {} ({column_list}) VALUES {tuples}",
        dialect.quote_identifier(&config.table)
    );
    if let Some(clause) = dialect.returning_clause(returning) {
        sql.push_str(&clause);
    }
    sql.push(';');
    Ok(CompiledSql::new(sql, alloc.into_params()))
}

/// `UPDATE <T> SET <col> = <ph>[, ...] [WHERE ...] [RETURNING ...];`
///
/// `SET` parameters are bound first; the `WHERE` clause continues the same
/// numbering.
pub fn update(
    config: &ModelConfig,
    catalog: &ColumnCatalog,
    data: &Record,
    filter: &Group,
    returning: &[String],
) -> Result<CompiledSql> {
    if data.is_empty() {
        return Err(Error::model(
            ModelErrorKind::EmptyPartialUpdate,
            "update payload contains no writable columns",
        ));
    }

    let dialect = config.dialect;
    let mut alloc = dialect.allocator();
    let assignments = data
        .iter()
        .map(|(name, value)| {
            let ph = bind_column(catalog, name, value, &mut alloc);
            format!("{} = {ph}", dialect.quote_identifier(name))
        })
        .collect::<Vec<_>>()
        .join(", ");

    let mut sql = format!(
        "UPDATE {} SET {assignments}",
        dialect.quote_identifier(&config.table)
    );
    if let Some(cond) = compile_filter(filter, &mut alloc) {
        sql.push_str(" WHERE ");
        sql.push_str(&cond);
    }
    if let Some(clause) = dialect.returning_clause(returning) {
        sql.push_str(&clause);
    }
    sql.push(';');
    Ok(CompiledSql::new(sql, alloc.into_params()))
}

/// `DELETE FROM <T> WHERE <id> = <ph>;`
pub fn hard_delete(config: &ModelConfig, id: Value) -> CompiledSql {
    let dialect = config.dialect;
    let mut alloc = dialect.allocator();
    let sql = format!(
        "DELETE FROM {} WHERE {} = {};",
        dialect.quote_identifier(&config.table),
        dialect.quote_identifier(&config.id_column),
        alloc.bind(id)
    );
    CompiledSql::new(sql, alloc.into_params())
}

/// `UPDATE <T> SET <deleted> = <ph> WHERE <id> = <ph>;`
///
/// Soft delete binds the deletion time; restore binds `NULL`.
pub fn set_deleted(config: &ModelConfig, deleted: &str, at: Value, id: Value) -> CompiledSql {
    let dialect = config.dialect;
    let mut alloc = dialect.allocator();
    let set = alloc.bind(at);
    let sql = format!(
        "UPDATE {} SET {} = {set} WHERE {} = {};",
        dialect.quote_identifier(&config.table),
        dialect.quote_identifier(deleted),
        dialect.quote_identifier(&config.id_column),
        alloc.bind(id)
    );
    CompiledSql::new(sql, alloc.into_params())
}

/// Bind one mapped payload value according to its column type.
fn bind_column(
    catalog: &ColumnCatalog,
    name: &str,
    value: &JsonValue,
    alloc: &mut ParamAllocator,
) -> String {
    match catalog.get(name).map(|c| &c.type_tag) {
        Some(TypeTag::Point) if value.is_object() => {
            let x = alloc.bind(Value::from_json(&value["x"]));
            let y = alloc.bind(Value::from_json(&value["y"]));
            format!("POINT({x}, {y})")
        }
        Some(tag) => alloc.bind(column_value(tag, value)),
        None => alloc.bind(Value::from_json(value)),
    }
}

fn column_value(tag: &TypeTag, value: &JsonValue) -> Value {
    if value.is_null() {
        return Value::Null;
    }
    match tag {
        TypeTag::Timestamp | TypeTag::DateTime => coerce::js_date(value)
            .map(Value::Timestamp)
            .unwrap_or_else(|| Value::from_json(value)),
        TypeTag::Date => coerce::js_date(value)
            .map(|ts| Value::Date(ts.date()))
            .unwrap_or_else(|| Value::from_json(value)),
        TypeTag::Json | TypeTag::Jsonb => match value {
            JsonValue::String(s) => Value::Text(s.clone()),
            other => Value::Text(other.to_string()),
        },
        TypeTag::Array(inner) => match value {
            JsonValue::Array(items) => {
                Value::Array(items.iter().map(|item| column_value(inner, item)).collect())
            }
            other => Value::from_json(other),
        },
        _ => Value::from_json(value),
    }
}
