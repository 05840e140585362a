//! Shared fixtures for the integration tests.
//!
//! [`MemoryStore`] is a single-table driver that interprets the SQL subset
//! relmodel emits: `SELECT` (rows or `COUNT(*)`), `INSERT` (multi-row,
//! `DEFAULT`, `POINT(x, y)`), `UPDATE ... SET`, `DELETE`, and `WHERE`
//! clauses built from `=`, `<>`, `<`, `>`, `<=`, `>=`, `[NOT] LIKE`, `IN`,
//! `IS [NOT] NULL`, `DATE(...)`, `AND`/`OR` with SQL precedence and
//! parentheses. Every executed statement is logged.
//!
//! Predicates, `LIKE` and `ORDER BY` are evaluated with the store's own
//! engine rules (implicit numeric casts, `\` as the `LIKE` escape, NULLs
//! lowest on MySQL and highest on Postgres), independent of the crate's
//! in-memory evaluator, so the two can be checked against each other.

#![allow(dead_code)]

use std::cmp::Ordering;
use std::sync::Mutex;

use asupersync::runtime::RuntimeBuilder;
use asupersync::{Cx, Outcome};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use relmodel::{
    ColumnDefinition, Dialect, Direction, Driver, DriverError, DriverResponse, Error, ModelConfig,
    OrderSpec, Record, TypeTag, Value,
};
use serde_json::{Map, Value as JsonValue, json};

pub fn unwrap_outcome<T>(outcome: Outcome<T, Error>) -> T {
    match outcome {
        Outcome::Ok(v) => v,
        Outcome::Err(e) => panic!("unexpected error: {e}"),
        Outcome::Cancelled(r) => panic!("cancelled: {r:?}"),
        Outcome::Panicked(p) => panic!("panicked: {p:?}"),
    }
}

pub fn expect_err<T: std::fmt::Debug>(outcome: Outcome<T, Error>) -> Error {
    match outcome {
        Outcome::Err(e) => e,
        other => panic!("expected an error, got {other:?}"),
    }
}

pub fn block_on<T>(f: impl Future<Output = T>) -> T {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    rt.block_on(f)
}

pub fn record(value: JsonValue) -> Record {
    match value {
        JsonValue::Object(map) => map,
        other => panic!("expected an object, got {other}"),
    }
}

pub fn records(value: JsonValue) -> Vec<Record> {
    match value {
        JsonValue::Array(items) => items.into_iter().map(record).collect(),
        other => panic!("expected an array, got {other}"),
    }
}

pub fn ids(rows: &[Record]) -> Vec<i64> {
    rows.iter()
        .map(|row| row.get("id").and_then(JsonValue::as_i64).unwrap_or(-1))
        .collect()
}

/// The `users` model used across the CRUD tests.
pub fn users_config(dialect: Dialect) -> ModelConfig {
    ModelConfig::new(
        "users",
        vec![
            ColumnDefinition::new("id", TypeTag::Serial),
            ColumnDefinition::new("name", TypeTag::String).required(),
            ColumnDefinition::new("email", TypeTag::String),
            ColumnDefinition::new("status", TypeTag::String),
            ColumnDefinition::new("age", TypeTag::Integer),
            ColumnDefinition::new("location", TypeTag::Point),
            ColumnDefinition::new("created_at", TypeTag::Timestamp),
            ColumnDefinition::new("deleted_at", TypeTag::Timestamp),
        ],
    )
    .dialect(dialect)
    .created_column("created_at")
    .deleted_column("deleted_at")
}

/// Three live users and one soft-deleted one.
pub fn seed_users() -> Vec<Record> {
    records(json!([
        {"id": 1, "name": "Jonas", "email": "jonas@example.com", "status": "active", "age": 30,
         "location": null, "created_at": "2024-01-01T08:00:00.000Z", "deleted_at": null},
        {"id": 2, "name": "Joan", "email": "joan@example.com", "status": "banned", "age": 17,
         "location": null, "created_at": "2024-02-01T08:00:00.000Z", "deleted_at": null},
        {"id": 3, "name": "Ada", "email": "ada@example.com", "status": "active", "age": 45,
         "location": null, "created_at": "2024-03-01T08:00:00.000Z", "deleted_at": null},
        {"id": 4, "name": "Gone", "email": "gone@example.com", "status": "active", "age": 50,
         "location": null, "created_at": "2024-04-01T08:00:00.000Z",
         "deleted_at": "2024-05-01T00:00:00.000Z"},
    ]))
}

pub fn users_store(dialect: Dialect) -> MemoryStore {
    MemoryStore::new(dialect, "users")
        .with_rows(seed_users())
        .unique("email")
}

/// An in-memory table behind the [`Driver`] contract.
pub struct MemoryStore {
    dialect: Dialect,
    table: String,
    rows: Mutex<Vec<Record>>,
    unique: Vec<String>,
    log: Mutex<Vec<(String, Vec<Value>)>>,
}

impl MemoryStore {
    pub fn new(dialect: Dialect, table: &str) -> Self {
        Self {
            dialect,
            table: table.to_string(),
            rows: Mutex::new(Vec::new()),
            unique: Vec::new(),
            log: Mutex::new(Vec::new()),
        }
    }

    pub fn with_rows(self, rows: Vec<Record>) -> Self {
        *self.rows.lock().unwrap() = rows;
        self
    }

    pub fn unique(mut self, column: &str) -> Self {
        self.unique.push(column.to_string());
        self
    }

    pub fn rows(&self) -> Vec<Record> {
        self.rows.lock().unwrap().clone()
    }

    pub fn statements(&self) -> Vec<(String, Vec<Value>)> {
        self.log.lock().unwrap().clone()
    }

    pub fn last_statement(&self) -> (String, Vec<Value>) {
        self.log
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no statement executed")
    }

    /// Parse and run one statement.
    pub fn run(&self, sql: &str, params: &[Value]) -> Result<DriverResponse, DriverError> {
        self.log
            .lock()
            .unwrap()
            .push((sql.to_string(), params.to_vec()));

        let tokens = tokenize(sql)?;
        let statement = Parser {
            tokens,
            pos: 0,
            params,
        }
        .statement()?;

        if statement.table() != self.table {
            return Err(DriverError::new(
                "42P01",
                format!("relation \"{}\" does not exist", statement.table()),
            ));
        }

        let rows = match statement {
            Statement::Select {
                projection,
                filter,
                order,
                limit,
                offset,
                ..
            } => self.select(projection, filter.as_ref(), &order, limit, offset),
            Statement::Insert {
                columns,
                rows,
                returning,
                ..
            } => self.insert(&columns, rows, returning.as_deref())?,
            Statement::Update {
                sets,
                filter,
                returning,
                ..
            } => self.update(&sets, filter.as_ref(), returning.as_deref())?,
            Statement::Delete { filter, .. } => self.delete(filter.as_ref()),
        };

        Ok(match self.dialect {
            Dialect::Postgres => DriverResponse::Rows(rows),
            Dialect::Mysql => {
                let affected = rows.len();
                DriverResponse::WithMeta(rows, json!({"affectedRows": affected}))
            }
        })
    }

    fn select(
        &self,
        projection: Projection,
        filter: Option<&Expr>,
        order: &[OrderSpec],
        limit: Option<usize>,
        offset: Option<usize>,
    ) -> Vec<Record> {
        let mut rows: Vec<Record> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|row| filter.is_none_or(|f| f.eval(row)))
            .cloned()
            .collect();
        if let Projection::Count(alias) = projection {
            let mut row = Map::new();
            row.insert(alias, json!(rows.len()));
            return vec![row];
        }
        sort_rows(&mut rows, order, self.dialect);
        rows.into_iter()
            .skip(offset.unwrap_or(0))
            .take(limit.unwrap_or(usize::MAX))
            .collect()
    }

    fn insert(
        &self,
        columns: &[String],
        tuples: Vec<Vec<Cell>>,
        returning: Option<&[String]>,
    ) -> Result<Vec<Record>, DriverError> {
        let mut table = self.rows.lock().unwrap();
        let mut next_id = table
            .iter()
            .filter_map(|row| row.get("id").and_then(JsonValue::as_i64))
            .max()
            .unwrap_or(0)
            + 1;

        let mut inserted = Vec::new();
        for tuple in tuples {
            let mut row = Map::new();
            for (column, cell) in columns.iter().zip(tuple) {
                let value = match cell {
                    Cell::Value(v) => v.to_json(),
                    Cell::Default => continue,
                    Cell::Point(x, y) => json!({"x": x.to_json(), "y": y.to_json()}),
                };
                row.insert(column.clone(), value);
            }
            if !row.contains_key("id") {
                row.insert("id".to_string(), json!(next_id));
                next_id += 1;
            }
            self.check_unique(&table, &row, None)?;
            table.push(row.clone());
            inserted.push(row);
        }
        Ok(project(inserted, returning))
    }

    fn update(
        &self,
        sets: &[(String, Value)],
        filter: Option<&Expr>,
        returning: Option<&[String]>,
    ) -> Result<Vec<Record>, DriverError> {
        let mut table = self.rows.lock().unwrap();
        let mut updated = Vec::new();
        for i in 0..table.len() {
            if !filter.is_none_or(|f| f.eval(&table[i])) {
                continue;
            }
            let mut row = table[i].clone();
            for (column, value) in sets {
                row.insert(column.clone(), value.to_json());
            }
            self.check_unique(&table, &row, Some(i))?;
            table[i] = row.clone();
            updated.push(row);
        }
        Ok(project(updated, returning))
    }

    fn delete(&self, filter: Option<&Expr>) -> Vec<Record> {
        let mut table = self.rows.lock().unwrap();
        table.retain(|row| !filter.is_none_or(|f| f.eval(row)));
        Vec::new()
    }

    fn check_unique(
        &self,
        table: &[Record],
        row: &Record,
        skip: Option<usize>,
    ) -> Result<(), DriverError> {
        for column in &self.unique {
            let Some(value) = row.get(column).filter(|v| !v.is_null()) else {
                continue;
            };
            let clash = table
                .iter()
                .enumerate()
                .any(|(i, other)| Some(i) != skip && other.get(column) == Some(value));
            if clash {
                let shown = match value {
                    JsonValue::String(s) => s.clone(),
                    other => other.to_string(),
                };
                return Err(match self.dialect {
                    Dialect::Postgres => DriverError::new(
                        "23505",
                        format!(
                            "duplicate key value violates unique constraint \"{}_{column}_key\"",
                            self.table
                        ),
                    )
                    .with_detail(format!("Key ({column})=({shown}) already exists.")),
                    Dialect::Mysql => DriverError::new(
                        "ER_DUP_ENTRY",
                        format!(
                            "Duplicate entry '{shown}' for key '{}.{column}'",
                            self.table
                        ),
                    ),
                });
            }
        }
        Ok(())
    }
}

fn project(rows: Vec<Record>, returning: Option<&[String]>) -> Vec<Record> {
    match returning {
        None => Vec::new(),
        Some(cols) if cols.iter().any(|c| c == "*") => rows,
        Some(cols) => rows
            .into_iter()
            .map(|row| {
                cols.iter()
                    .map(|c| (c.clone(), row.get(c).cloned().unwrap_or(JsonValue::Null)))
                    .collect()
            })
            .collect(),
    }
}

impl Driver for MemoryStore {
    fn execute(
        &self,
        _cx: &Cx,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Outcome<DriverResponse, DriverError>> + Send {
        let result = self.run(sql, params);
        async move {
            match result {
                Ok(response) => Outcome::Ok(response),
                Err(e) => Outcome::Err(e),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// SQL subset
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Word(String),
    Param(usize),
    Int(i64),
    Star,
    LParen,
    RParen,
    Comma,
    Semi,
    Op(String),
}

fn syntax(message: impl Into<String>) -> DriverError {
    DriverError::new("42601", message)
}

fn tokenize(sql: &str) -> Result<Vec<Token>, DriverError> {
    let chars: Vec<char> = sql.chars().collect();
    let mut tokens = Vec::new();
    let mut next_anonymous = 0;
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '`' | '"' => {
                let end = chars[i + 1..]
                    .iter()
                    .position(|&ch| ch == c)
                    .ok_or_else(|| syntax("unterminated identifier"))?;
                tokens.push(Token::Ident(chars[i + 1..i + 1 + end].iter().collect()));
                i += end + 2;
            }
            '?' => {
                tokens.push(Token::Param(next_anonymous));
                next_anonymous += 1;
                i += 1;
            }
            '$' => {
                let digits: String = chars[i + 1..]
                    .iter()
                    .take_while(|ch| ch.is_ascii_digit())
                    .collect();
                let n: usize = digits.parse().map_err(|_| syntax("bad placeholder"))?;
                if n == 0 {
                    return Err(syntax("placeholders start at $1"));
                }
                tokens.push(Token::Param(n - 1));
                i += 1 + digits.len();
            }
            c if c.is_ascii_digit() => {
                let digits: String = chars[i..]
                    .iter()
                    .take_while(|ch| ch.is_ascii_digit())
                    .collect();
                tokens.push(Token::Int(digits.parse().map_err(|_| syntax("bad integer"))?));
                i += digits.len();
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let word: String = chars[i..]
                    .iter()
                    .take_while(|ch| ch.is_ascii_alphanumeric() || **ch == '_')
                    .collect();
                i += word.len();
                tokens.push(Token::Word(word.to_ascii_uppercase()));
            }
            '*' => {
                tokens.push(Token::Star);
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            ';' => {
                tokens.push(Token::Semi);
                i += 1;
            }
            '<' | '>' | '=' => {
                let two: String = chars[i..chars.len().min(i + 2)].iter().collect();
                let op = if matches!(two.as_str(), "<>" | "<=" | ">=") {
                    two
                } else {
                    c.to_string()
                };
                i += op.len();
                tokens.push(Token::Op(op));
            }
            other => return Err(syntax(format!("unexpected character '{other}'"))),
        }
    }
    Ok(tokens)
}

enum Projection {
    All,
    Count(String),
}

enum Cell {
    Value(Value),
    Default,
    Point(Value, Value),
}

enum Statement {
    Select {
        table: String,
        projection: Projection,
        filter: Option<Expr>,
        order: Vec<OrderSpec>,
        limit: Option<usize>,
        offset: Option<usize>,
    },
    Insert {
        table: String,
        columns: Vec<String>,
        rows: Vec<Vec<Cell>>,
        returning: Option<Vec<String>>,
    },
    Update {
        table: String,
        sets: Vec<(String, Value)>,
        filter: Option<Expr>,
        returning: Option<Vec<String>>,
    },
    Delete {
        table: String,
        filter: Option<Expr>,
    },
}

impl Statement {
    fn table(&self) -> &str {
        match self {
            Statement::Select { table, .. }
            | Statement::Insert { table, .. }
            | Statement::Update { table, .. }
            | Statement::Delete { table, .. } => table,
        }
    }
}

/// A bound right-hand side, optionally wrapped in `DATE(...)`.
struct Operand {
    value: Value,
    date: bool,
}

impl Operand {
    fn resolve(&self) -> Value {
        if self.date {
            param_date(&self.value).map_or(Value::Null, Value::Date)
        } else {
            self.value.clone()
        }
    }
}

enum Test {
    IsNull,
    IsNotNull,
    Compare(String, Operand),
    Like { negated: bool, pattern: Operand },
    In(Vec<Operand>),
}

enum Expr {
    Or(Vec<Expr>),
    And(Vec<Expr>),
    Const(bool),
    Predicate {
        column: String,
        date: bool,
        test: Test,
    },
}

impl Expr {
    fn eval(&self, row: &Record) -> bool {
        match self {
            Expr::Or(terms) => terms.iter().any(|t| t.eval(row)),
            Expr::And(terms) => terms.iter().all(|t| t.eval(row)),
            Expr::Const(b) => *b,
            Expr::Predicate { column, date, test } => {
                let raw = row.get(column).cloned().unwrap_or(JsonValue::Null);
                let field = if *date {
                    field_date(&raw).map_or(JsonValue::Null, |d| {
                        JsonValue::String(d.format("%Y-%m-%d").to_string())
                    })
                } else {
                    raw
                };
                match test {
                    Test::IsNull => field.is_null(),
                    Test::IsNotNull => !field.is_null(),
                    Test::Compare(op, rhs) => {
                        let Some(ord) = sql_compare(&field, &rhs.resolve()) else {
                            return false;
                        };
                        match op.as_str() {
                            "=" => ord.is_eq(),
                            "<>" => ord.is_ne(),
                            "<" => ord.is_lt(),
                            ">" => ord.is_gt(),
                            "<=" => ord.is_le(),
                            ">=" => ord.is_ge(),
                            _ => false,
                        }
                    }
                    Test::Like { negated, pattern } => {
                        sql_like(&field, &pattern.resolve()) == Some(!negated)
                    }
                    Test::In(items) => items
                        .iter()
                        .any(|rhs| sql_compare(&field, &rhs.resolve()) == Some(Ordering::Equal)),
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Engine rules
// ---------------------------------------------------------------------------

/// `field <op> param` under SQL rules; `None` is UNKNOWN.
///
/// Dates and timestamps compare as instants. A number on either side puts
/// the comparison in numeric context, casting text that parses; anything
/// else compares as binary-collated text.
fn sql_compare(field: &JsonValue, param: &Value) -> Option<Ordering> {
    match (field, param) {
        (JsonValue::Null, _) | (_, Value::Null | Value::Default | Value::Array(_)) => None,
        (_, Value::Timestamp(ts)) => field_timestamp(field)?.partial_cmp(ts),
        (_, Value::Date(d)) => field_timestamp(field)?.partial_cmp(&d.and_hms_opt(0, 0, 0)?),
        (_, Value::Json(doc)) => (field == doc).then_some(Ordering::Equal),
        (JsonValue::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (JsonValue::Number(_) | JsonValue::Bool(_), _)
        | (_, Value::BigInt(_) | Value::Double(_) | Value::Bool(_)) => {
            field_number(field)?.partial_cmp(&param_number(param)?)
        }
        (_, Value::Text(text)) => Some(field_text(field).as_str().cmp(text.as_str())),
    }
}

fn field_number(field: &JsonValue) -> Option<f64> {
    match field {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        JsonValue::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn param_number(param: &Value) -> Option<f64> {
    match param {
        Value::BigInt(n) => Some(*n as f64),
        Value::Double(f) => Some(*f),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Text(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn field_text(field: &JsonValue) -> String {
    match field {
        JsonValue::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Stored timestamps are RFC 3339 text; bare `YYYY-MM-DD` reads as midnight.
fn field_timestamp(field: &JsonValue) -> Option<NaiveDateTime> {
    let JsonValue::String(text) = field else {
        return None;
    };
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.naive_utc());
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()?
        .and_hms_opt(0, 0, 0)
}

/// `DATE(column)`.
fn field_date(field: &JsonValue) -> Option<NaiveDate> {
    field_timestamp(field).map(|ts| ts.date())
}

/// `DATE(param)`.
fn param_date(param: &Value) -> Option<NaiveDate> {
    match param {
        Value::Date(d) => Some(*d),
        Value::Timestamp(ts) => Some(ts.date()),
        Value::Text(text) => field_date(&JsonValue::String(text.clone())),
        _ => None,
    }
}

/// `field LIKE pattern`; `None` when either side is NULL.
fn sql_like(field: &JsonValue, pattern: &Value) -> Option<bool> {
    if field.is_null() {
        return None;
    }
    let pattern = match pattern {
        Value::Null | Value::Default => return None,
        Value::Text(text) => text.clone(),
        Value::Date(d) => d.format("%Y-%m-%d").to_string(),
        other => field_text(&other.to_json()),
    };
    let text: Vec<char> = field_text(field).chars().collect();
    Some(like_match(&text, &like_tokens(&pattern)))
}

enum LikeToken {
    Any,
    One,
    Literal(char),
}

/// `%` and `_` are the only wildcards; `\` escapes the next character.
fn like_tokens(pattern: &str) -> Vec<LikeToken> {
    let mut tokens = Vec::new();
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        tokens.push(match c {
            '\\' => LikeToken::Literal(chars.next().unwrap_or('\\')),
            '%' => LikeToken::Any,
            '_' => LikeToken::One,
            other => LikeToken::Literal(other),
        });
    }
    tokens
}

fn like_match(text: &[char], pattern: &[LikeToken]) -> bool {
    match pattern.split_first() {
        None => text.is_empty(),
        Some((LikeToken::Any, rest)) => (0..=text.len()).any(|i| like_match(&text[i..], rest)),
        Some((LikeToken::One, rest)) => !text.is_empty() && like_match(&text[1..], rest),
        Some((LikeToken::Literal(c), rest)) => {
            text.first() == Some(c) && like_match(&text[1..], rest)
        }
    }
}

/// Stable `ORDER BY`. MySQL treats NULL as the lowest value, Postgres as the
/// highest.
fn sort_rows(rows: &mut [Record], order: &[OrderSpec], dialect: Dialect) {
    let null_lowest = matches!(dialect, Dialect::Mysql);
    rows.sort_by(|a, b| {
        order
            .iter()
            .map(|spec| {
                let lhs = a.get(&spec.key).unwrap_or(&JsonValue::Null);
                let rhs = b.get(&spec.key).unwrap_or(&JsonValue::Null);
                let ord = match (lhs.is_null(), rhs.is_null()) {
                    (true, true) => Ordering::Equal,
                    (true, false) if null_lowest => Ordering::Less,
                    (true, false) => Ordering::Greater,
                    (false, true) if null_lowest => Ordering::Greater,
                    (false, true) => Ordering::Less,
                    (false, false) => sort_value_cmp(lhs, rhs),
                };
                match spec.direction {
                    Direction::Asc => ord,
                    Direction::Desc => ord.reverse(),
                }
            })
            .find(|ord| ord.is_ne())
            .unwrap_or(Ordering::Equal)
    });
}

fn sort_value_cmp(a: &JsonValue, b: &JsonValue) -> Ordering {
    match (a, b) {
        (JsonValue::Number(x), JsonValue::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (JsonValue::String(x), JsonValue::String(y)) => x.cmp(y),
        (JsonValue::Bool(x), JsonValue::Bool(y)) => x.cmp(y),
        _ => field_text(a).cmp(&field_text(b)),
    }
}

struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    params: &'a [Value],
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Result<Token, DriverError> {
        let token = self
            .tokens
            .get(self.pos)
            .cloned()
            .ok_or_else(|| syntax("unexpected end of statement"))?;
        self.pos += 1;
        Ok(token)
    }

    fn eat_word(&mut self, word: &str) -> bool {
        if self.peek() == Some(&Token::Word(word.to_string())) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_word(&mut self, word: &str) -> Result<(), DriverError> {
        if self.eat_word(word) {
            Ok(())
        } else {
            Err(syntax(format!("expected {word}, found {:?}", self.peek())))
        }
    }

    fn expect(&mut self, token: &Token) -> Result<(), DriverError> {
        let found = self.next()?;
        if &found == token {
            Ok(())
        } else {
            Err(syntax(format!("expected {token:?}, found {found:?}")))
        }
    }

    fn ident(&mut self) -> Result<String, DriverError> {
        match self.next()? {
            Token::Ident(name) => Ok(name),
            other => Err(syntax(format!("expected identifier, found {other:?}"))),
        }
    }

    fn param(&mut self) -> Result<Value, DriverError> {
        match self.next()? {
            Token::Param(i) => self
                .params
                .get(i)
                .cloned()
                .ok_or_else(|| syntax(format!("no value bound for parameter {}", i + 1))),
            other => Err(syntax(format!("expected placeholder, found {other:?}"))),
        }
    }

    fn count(&mut self) -> Result<usize, DriverError> {
        match self.next()? {
            Token::Int(n) => usize::try_from(n).map_err(|_| syntax("negative count")),
            other => Err(syntax(format!("expected integer, found {other:?}"))),
        }
    }

    fn statement(mut self) -> Result<Statement, DriverError> {
        let statement = match self.next()? {
            Token::Word(w) if w == "SELECT" => self.select()?,
            Token::Word(w) if w == "INSERT" => self.insert()?,
            Token::Word(w) if w == "UPDATE" => self.update()?,
            Token::Word(w) if w == "DELETE" => self.delete()?,
            other => return Err(syntax(format!("unsupported statement {other:?}"))),
        };
        self.expect(&Token::Semi)?;
        if self.pos != self.tokens.len() {
            return Err(syntax("trailing tokens after statement"));
        }
        Ok(statement)
    }

    fn select(&mut self) -> Result<Statement, DriverError> {
        let projection = if self.peek() == Some(&Token::Star) {
            self.pos += 1;
            Projection::All
        } else {
            self.expect_word("COUNT")?;
            self.expect(&Token::LParen)?;
            self.expect(&Token::Star)?;
            self.expect(&Token::RParen)?;
            self.expect_word("AS")?;
            Projection::Count(self.ident()?)
        };
        self.expect_word("FROM")?;
        let table = self.ident()?;
        let filter = self.where_clause()?;

        let mut order = Vec::new();
        if self.eat_word("ORDER") {
            self.expect_word("BY")?;
            loop {
                let key = self.ident()?;
                let direction = if self.eat_word("DESC") {
                    Direction::Desc
                } else {
                    self.expect_word("ASC")?;
                    Direction::Asc
                };
                order.push(OrderSpec { key, direction });
                if self.peek() != Some(&Token::Comma) {
                    break;
                }
                self.pos += 1;
            }
        }
        let limit = if self.eat_word("LIMIT") { Some(self.count()?) } else { None };
        let offset = if self.eat_word("OFFSET") { Some(self.count()?) } else { None };

        Ok(Statement::Select {
            table,
            projection,
            filter,
            order,
            limit,
            offset,
        })
    }

    fn insert(&mut self) -> Result<Statement, DriverError> {
        self.expect_word("INTO")?;
        let table = self.ident()?;
        self.expect(&Token::LParen)?;
        let mut columns = vec![self.ident()?];
        while self.peek() == Some(&Token::Comma) {
            self.pos += 1;
            columns.push(self.ident()?);
        }
        self.expect(&Token::RParen)?;
        self.expect_word("VALUES")?;

        let mut rows = Vec::new();
        loop {
            self.expect(&Token::LParen)?;
            let mut cells = vec![self.cell()?];
            while self.peek() == Some(&Token::Comma) {
                self.pos += 1;
                cells.push(self.cell()?);
            }
            self.expect(&Token::RParen)?;
            if cells.len() != columns.len() {
                return Err(syntax("VALUES tuple does not match column list"));
            }
            rows.push(cells);
            if self.peek() != Some(&Token::Comma) {
                break;
            }
            self.pos += 1;
        }

        let returning = self.returning()?;
        Ok(Statement::Insert {
            table,
            columns,
            rows,
            returning,
        })
    }

    fn cell(&mut self) -> Result<Cell, DriverError> {
        if self.eat_word("DEFAULT") {
            return Ok(Cell::Default);
        }
        if self.eat_word("POINT") {
            self.expect(&Token::LParen)?;
            let x = self.param()?;
            self.expect(&Token::Comma)?;
            let y = self.param()?;
            self.expect(&Token::RParen)?;
            return Ok(Cell::Point(x, y));
        }
        Ok(Cell::Value(self.param()?))
    }

    fn update(&mut self) -> Result<Statement, DriverError> {
        let table = self.ident()?;
        self.expect_word("SET")?;
        let mut sets = Vec::new();
        loop {
            let column = self.ident()?;
            self.expect(&Token::Op("=".to_string()))?;
            sets.push((column, self.param()?));
            if self.peek() != Some(&Token::Comma) {
                break;
            }
            self.pos += 1;
        }
        let filter = self.where_clause()?;
        let returning = self.returning()?;
        Ok(Statement::Update {
            table,
            sets,
            filter,
            returning,
        })
    }

    fn delete(&mut self) -> Result<Statement, DriverError> {
        self.expect_word("FROM")?;
        let table = self.ident()?;
        let filter = self.where_clause()?;
        Ok(Statement::Delete { table, filter })
    }

    fn returning(&mut self) -> Result<Option<Vec<String>>, DriverError> {
        if !self.eat_word("RETURNING") {
            return Ok(None);
        }
        let mut columns = Vec::new();
        loop {
            if self.peek() == Some(&Token::Star) {
                self.pos += 1;
                columns.push("*".to_string());
            } else {
                columns.push(self.ident()?);
            }
            if self.peek() != Some(&Token::Comma) {
                break;
            }
            self.pos += 1;
        }
        Ok(Some(columns))
    }

    fn where_clause(&mut self) -> Result<Option<Expr>, DriverError> {
        if self.eat_word("WHERE") {
            Ok(Some(self.or_expr()?))
        } else {
            Ok(None)
        }
    }

    fn or_expr(&mut self) -> Result<Expr, DriverError> {
        let mut terms = vec![self.and_expr()?];
        while self.eat_word("OR") {
            terms.push(self.and_expr()?);
        }
        Ok(if terms.len() == 1 { terms.remove(0) } else { Expr::Or(terms) })
    }

    fn and_expr(&mut self) -> Result<Expr, DriverError> {
        let mut terms = vec![self.primary()?];
        while self.eat_word("AND") {
            terms.push(self.primary()?);
        }
        Ok(if terms.len() == 1 { terms.remove(0) } else { Expr::And(terms) })
    }

    fn primary(&mut self) -> Result<Expr, DriverError> {
        match self.peek() {
            Some(Token::LParen) => {
                self.pos += 1;
                let inner = self.or_expr()?;
                self.expect(&Token::RParen)?;
                Ok(inner)
            }
            Some(Token::Int(_)) => {
                let lhs = self.count()?;
                self.expect(&Token::Op("=".to_string()))?;
                let rhs = self.count()?;
                Ok(Expr::Const(lhs == rhs))
            }
            _ => self.predicate(),
        }
    }

    fn predicate(&mut self) -> Result<Expr, DriverError> {
        let (column, date) = if self.eat_word("DATE") {
            self.expect(&Token::LParen)?;
            let column = self.ident()?;
            self.expect(&Token::RParen)?;
            (column, true)
        } else {
            (self.ident()?, false)
        };

        let test = match self.next()? {
            Token::Word(w) if w == "IS" => {
                let negated = self.eat_word("NOT");
                self.expect_word("NULL")?;
                if negated { Test::IsNotNull } else { Test::IsNull }
            }
            Token::Word(w) if w == "LIKE" => Test::Like {
                negated: false,
                pattern: self.operand()?,
            },
            Token::Word(w) if w == "NOT" => {
                self.expect_word("LIKE")?;
                Test::Like {
                    negated: true,
                    pattern: self.operand()?,
                }
            }
            Token::Word(w) if w == "IN" => {
                self.expect(&Token::LParen)?;
                let mut items = vec![self.operand()?];
                while self.peek() == Some(&Token::Comma) {
                    self.pos += 1;
                    items.push(self.operand()?);
                }
                self.expect(&Token::RParen)?;
                Test::In(items)
            }
            Token::Op(op) => Test::Compare(op, self.operand()?),
            other => return Err(syntax(format!("unexpected {other:?} after column"))),
        };
        Ok(Expr::Predicate { column, date, test })
    }

    fn operand(&mut self) -> Result<Operand, DriverError> {
        if self.eat_word("DATE") {
            self.expect(&Token::LParen)?;
            let value = self.param()?;
            self.expect(&Token::RParen)?;
            Ok(Operand { value, date: true })
        } else {
            Ok(Operand {
                value: self.param()?,
                date: false,
            })
        }
    }
}
