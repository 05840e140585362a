//! SQL generation for filter trees and query tails.
//!
//! Identifiers always go through [`Dialect::quote_identifier`]; values are
//! never interpolated, only bound through the [`ParamAllocator`].

use relmodel_core::Value;
use serde_json::Value as JsonValue;

use crate::clause::{OrderSpec, Query};
use crate::dialect::{Dialect, ParamAllocator};
use crate::filter::{Condition, FilterNode, Group, Leaf, Operand};
use crate::typed::TypedValue;

/// A statement ready for [`relmodel_core::Driver::execute`].
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledSql {
    pub sql: String,
    pub params: Vec<Value>,
}

impl CompiledSql {
    pub fn new(sql: String, params: Vec<Value>) -> Self {
        Self { sql, params }
    }
}

/// Compile a root group into a condition string.
///
/// Returns `None` when the group has no children, so callers can omit the
/// `WHERE` keyword entirely.
pub fn compile_filter(group: &Group, alloc: &mut ParamAllocator) -> Option<String> {
    if group.children.is_empty() {
        None
    } else {
        Some(compile_children(group, alloc))
    }
}

fn compile_children(group: &Group, alloc: &mut ParamAllocator) -> String {
    let mut sql = String::new();
    for (i, child) in group.children.iter().enumerate() {
        if i > 0 {
            sql.push(' ');
            sql.push_str(child.chain().as_sql());
            sql.push(' ');
        }
        sql.push_str(&compile_node(child, alloc));
    }
    sql
}

fn compile_node(node: &FilterNode, alloc: &mut ParamAllocator) -> String {
    match node {
        FilterNode::Leaf(leaf) => compile_leaf(leaf, alloc),
        // An empty nested group is vacuously true.
        FilterNode::Group(group) if group.children.is_empty() => "1 = 1".to_string(),
        FilterNode::Group(group) => format!("({})", compile_children(group, alloc)),
    }
}

fn compile_leaf(leaf: &Leaf, alloc: &mut ParamAllocator) -> String {
    let dialect = alloc.dialect();
    let mut ident = dialect.quote_identifier(&leaf.key);
    if leaf.date_cast {
        ident = dialect.date_cast(&ident);
    }

    match (&leaf.condition, &leaf.operand) {
        (Condition::IsNull | Condition::IsNotNull, _) => {
            format!("{ident} {}", leaf.condition.as_sql())
        }
        (Condition::In, Operand::List(items)) if items.is_empty() => "1 = 0".to_string(),
        (Condition::In, Operand::List(items)) => {
            let placeholders = items
                .iter()
                .map(|item| bind_operand(item.to_value(), leaf.date_cast, alloc))
                .collect::<Vec<_>>()
                .join(", ");
            format!("{ident} IN ({placeholders})")
        }
        (Condition::Like | Condition::NotLike, Operand::Single(value)) => {
            let ph = bind_operand(like_pattern(value), leaf.date_cast, alloc);
            format!("{ident} {} {ph}", leaf.condition.as_sql())
        }
        (condition, Operand::Single(value)) => {
            let ph = bind_operand(value.to_value(), leaf.date_cast, alloc);
            format!("{ident} {} {ph}", condition.as_sql())
        }
        // Normalization only leaves lists on IN.
        (condition, Operand::List(_)) => {
            tracing::warn!(
                key = %leaf.key,
                condition = condition.as_sql(),
                "List operand on non-IN condition; compiling as always false"
            );
            "1 = 0".to_string()
        }
    }
}

fn bind_operand(value: Value, date_cast: bool, alloc: &mut ParamAllocator) -> String {
    let ph = alloc.bind(value);
    if date_cast {
        alloc.dialect().date_cast(&ph)
    } else {
        ph
    }
}

/// `*` is accepted as a wildcard alias for `%`; `\*` keeps a literal star.
///
/// Backslash escapes pass through untouched, since both dialects use `\` as
/// the default `LIKE` escape character.
pub(crate) fn like_pattern(value: &TypedValue) -> Value {
    match value {
        TypedValue::Text(s) | TypedValue::Raw(JsonValue::String(s)) => {
            let mut out = String::with_capacity(s.len());
            let mut chars = s.chars();
            while let Some(ch) = chars.next() {
                match ch {
                    '\\' => {
                        out.push('\\');
                        if let Some(escaped) = chars.next() {
                            out.push(escaped);
                        }
                    }
                    '*' => out.push('%'),
                    other => out.push(other),
                }
            }
            Value::Text(out)
        }
        other => other.to_value(),
    }
}

/// `ORDER BY a ASC, b DESC`, or `None` for an empty order list.
pub fn compile_order(order: &[OrderSpec], dialect: Dialect) -> Option<String> {
    if order.is_empty() {
        return None;
    }
    let terms = order
        .iter()
        .map(|o| format!("{} {}", dialect.quote_identifier(&o.key), o.direction.as_sql()))
        .collect::<Vec<_>>()
        .join(", ");
    Some(format!("ORDER BY {terms}"))
}

/// The ` ORDER BY ... LIMIT n OFFSET n` tail of a query (with a leading
/// space when non-empty).
pub fn compile_tail(query: &Query, dialect: Dialect) -> String {
    let mut sql = String::new();
    if let Some(order) = compile_order(&query.order, dialect) {
        sql.push(' ');
        sql.push_str(&order);
    }
    if let Some(limit) = query.limit {
        sql.push_str(&format!(" LIMIT {limit}"));
    }
    if let Some(offset) = query.offset {
        sql.push_str(&format!(" OFFSET {offset}"));
    }
    sql
}

/// Compile a full `SELECT * FROM <table> [WHERE ...] [ORDER BY ...] [LIMIT]
/// [OFFSET];` statement.
pub fn compile_select(table: &str, query: &Query, dialect: Dialect) -> CompiledSql {
    let mut alloc = dialect.allocator();
    let mut sql = format!("SELECT * FROM {}", dialect.quote_identifier(table));
    if let Some(cond) = compile_filter(&query.filter, &mut alloc) {
        sql.push_str(" WHERE ");
        sql.push_str(&cond);
    }
    sql.push_str(&compile_tail(query, dialect));
    sql.push(';');
    CompiledSql::new(sql, alloc.into_params())
}
