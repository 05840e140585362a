//! In-memory evaluation of filter trees.
//!
//! The evaluator answers the same question as the compiled SQL, directly
//! against fetched records. Operands go through the same binding step as the
//! compiler ([`TypedValue::to_value`]), so both paths compare a record field
//! against identical parameters.
//!
//! SQL three-valued logic collapses to `false` at the leaf: a comparison
//! involving `NULL` never matches. Chains follow SQL precedence, so
//! `a OR b AND c` reads as `a OR (b AND c)`.

use std::borrow::Cow;
use std::cmp::Ordering;

use relmodel_core::{Record, Value, coerce, pattern};
use serde_json::Value as JsonValue;

use crate::clause::{Direction, OrderSpec, Query};
use crate::compile::like_pattern;
use crate::dialect::Dialect;
use crate::filter::{Chain, Condition, FilterNode, Group, Leaf, Operand};

/// Does `record` satisfy `group`? An empty group matches everything.
pub fn matches_group(group: &Group, record: &Record) -> bool {
    if group.children.is_empty() {
        return true;
    }
    // OR-separated runs of AND terms.
    let mut runs: Vec<Vec<&FilterNode>> = vec![Vec::new()];
    for (i, child) in group.children.iter().enumerate() {
        if i > 0 && child.chain() == Chain::Or {
            runs.push(Vec::new());
        }
        if let Some(run) = runs.last_mut() {
            run.push(child);
        }
    }
    runs.iter()
        .any(|run| run.iter().all(|node| matches(node, record)))
}

/// Does `record` satisfy a single node?
pub fn matches(node: &FilterNode, record: &Record) -> bool {
    match node {
        FilterNode::Leaf(leaf) => matches_leaf(leaf, record),
        FilterNode::Group(group) => matches_group(group, record),
    }
}

fn matches_leaf(leaf: &Leaf, record: &Record) -> bool {
    let raw = record.get(&leaf.key).unwrap_or(&JsonValue::Null);
    let field = cast_field(raw, leaf.date_cast);
    let operand = |value: Value| cast_operand(value, leaf.date_cast);

    match (leaf.condition, &leaf.operand) {
        (Condition::IsNull, _) => field.is_null(),
        (Condition::IsNotNull, _) => !field.is_null(),
        (Condition::In, Operand::List(items)) => items
            .iter()
            .any(|item| compare(&field, &operand(item.to_value())) == Some(Ordering::Equal)),
        (Condition::Like, Operand::Single(value)) => {
            like(&field, &operand(like_pattern(value))) == Some(true)
        }
        (Condition::NotLike, Operand::Single(value)) => {
            like(&field, &operand(like_pattern(value))) == Some(false)
        }
        (condition, Operand::Single(value)) => compare(&field, &operand(value.to_value()))
            .is_some_and(|ord| holds(condition, ord)),
        (_, Operand::List(_)) => false,
    }
}

fn holds(condition: Condition, ord: Ordering) -> bool {
    match condition {
        Condition::Equals => ord == Ordering::Equal,
        Condition::NotEquals => ord != Ordering::Equal,
        Condition::Gt => ord == Ordering::Greater,
        Condition::Lt => ord == Ordering::Less,
        Condition::Gte => ord != Ordering::Less,
        Condition::Lte => ord != Ordering::Greater,
        _ => false,
    }
}

fn cast_field(field: &JsonValue, date_cast: bool) -> Cow<'_, JsonValue> {
    if date_cast {
        Cow::Owned(calendar_of_json(field).map_or(JsonValue::Null, JsonValue::String))
    } else {
        Cow::Borrowed(field)
    }
}

fn cast_operand(value: Value, date_cast: bool) -> Value {
    if date_cast {
        calendar_of_value(&value).map_or(Value::Null, Value::Text)
    } else {
        value
    }
}

/// `YYYY-MM-DD` of a stored field, or `None` when it is not a date.
pub fn calendar_of_json(field: &JsonValue) -> Option<String> {
    coerce::stored_date(field).map(|d| coerce::calendar_date(&d))
}

/// `YYYY-MM-DD` of a bound parameter, or `None` when it is not a date.
pub fn calendar_of_value(value: &Value) -> Option<String> {
    match value {
        Value::Null | Value::Default => None,
        Value::Date(d) => Some(d.format("%Y-%m-%d").to_string()),
        Value::Timestamp(ts) => Some(coerce::calendar_date(ts)),
        other => calendar_of_json(&other.to_json()),
    }
}

/// Compare a stored field with a bound parameter.
///
/// Returns `None` when either side is `NULL` or the two cannot be compared.
/// Numbers compare numerically (numeric strings included), dates
/// chronologically and everything else as case-sensitive text.
pub fn compare(field: &JsonValue, operand: &Value) -> Option<Ordering> {
    match (field, operand) {
        (JsonValue::Null, _) | (_, Value::Null | Value::Default) => None,
        (_, Value::Date(d)) => {
            let midnight = d.and_hms_opt(0, 0, 0)?;
            coerce::stored_date(field)?.partial_cmp(&midnight)
        }
        (_, Value::Timestamp(ts)) => coerce::stored_date(field)?.partial_cmp(ts),
        (JsonValue::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (_, Value::Bool(b)) => json_number(field)?.partial_cmp(&f64::from(u8::from(*b))),
        (_, Value::BigInt(_) | Value::Double(_)) => {
            json_number(field)?.partial_cmp(&operand.as_f64()?)
        }
        (JsonValue::Number(_) | JsonValue::Bool(_), Value::Text(s)) => {
            json_number(field)?.partial_cmp(&s.trim().parse::<f64>().ok()?)
        }
        (_, Value::Text(s)) => Some(json_text(field).as_str().cmp(s.as_str())),
        (_, Value::Json(doc)) => (field == doc).then_some(Ordering::Equal),
        (_, Value::Array(_)) => None,
    }
}

/// Evaluate `field LIKE pattern`. `None` when either side is `NULL`.
pub fn like(field: &JsonValue, pattern: &Value) -> Option<bool> {
    if field.is_null() {
        return None;
    }
    let pattern = match pattern {
        Value::Null | Value::Default => return None,
        Value::Text(s) => s.clone(),
        other => json_text(&other.to_json()),
    };
    Some(pattern::matches_pattern(&json_text(field), &like_regex(&pattern)))
}

/// Translate a `LIKE` pattern into an anchored regular expression.
///
/// `%` and `*` match any run of characters, `_` exactly one. A backslash
/// makes the next character literal; a trailing backslash matches itself.
pub fn like_regex(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 8);
    out.push_str("(?s)^");
    let mut buf = [0u8; 4];
    let mut chars = pattern.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => {
                let literal = chars.next().unwrap_or('\\');
                out.push_str(&regex::escape(literal.encode_utf8(&mut buf)));
            }
            '%' | '*' => out.push_str(".*"),
            '_' => out.push('.'),
            other => out.push_str(&regex::escape(other.encode_utf8(&mut buf))),
        }
    }
    out.push('$');
    out
}

fn json_number(field: &JsonValue) -> Option<f64> {
    match field {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::Bool(b) => Some(f64::from(u8::from(*b))),
        JsonValue::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn json_text(field: &JsonValue) -> String {
    match field {
        JsonValue::String(s) => s.clone(),
        JsonValue::Array(_) | JsonValue::Object(_) => field.to_string(),
        other => coerce::js_string(other),
    }
}

/// Keep the records that satisfy `group`, in their original order.
pub fn filter_records(group: &Group, records: &[Record]) -> Vec<Record> {
    records
        .iter()
        .filter(|record| matches_group(group, record))
        .cloned()
        .collect()
}

/// Stable-sort records by an order list, placing NULLs the way `dialect`
/// does.
pub fn sort_records(records: &mut [Record], order: &[OrderSpec], dialect: Dialect) {
    if order.is_empty() {
        return;
    }
    records.sort_by(|a, b| {
        for spec in order {
            let lhs = a.get(&spec.key).unwrap_or(&JsonValue::Null);
            let rhs = b.get(&spec.key).unwrap_or(&JsonValue::Null);
            let ord = ascending(lhs, rhs, dialect.nulls_sort_first());
            let ord = match spec.direction {
                Direction::Asc => ord,
                Direction::Desc => ord.reverse(),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });
}

fn ascending(a: &JsonValue, b: &JsonValue, nulls_first: bool) -> Ordering {
    match (a.is_null(), b.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) if nulls_first => Ordering::Less,
        (true, false) => Ordering::Greater,
        (false, true) if nulls_first => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => compare(a, &Value::from_json(b))
            .unwrap_or_else(|| json_text(a).cmp(&json_text(b))),
    }
}

impl Query {
    /// Run this query against fetched records: filter, order, then skip
    /// `offset` and keep at most `limit`.
    pub fn apply(&self, dialect: Dialect, records: &[Record]) -> Vec<Record> {
        let mut out = filter_records(&self.filter, records);
        sort_records(&mut out, &self.order, dialect);

        let offset = self.offset.map_or(0, |n| usize::try_from(n).unwrap_or(usize::MAX));
        let limit = self.limit.map_or(usize::MAX, |n| usize::try_from(n).unwrap_or(usize::MAX));
        let kept: Vec<Record> = out.into_iter().skip(offset).take(limit).collect();

        tracing::trace!(
            input = records.len(),
            output = kept.len(),
            "Applied query in memory"
        );
        kept
    }
}
