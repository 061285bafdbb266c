//! WHERE clause input and formatting.
//!
//! Two input shapes are accepted:
//!
//! - an ordered `column => value` map, every predicate an equality joined by `AND`
//! - an explicit sequence of predicates (`[column, operator, value]`) with
//!   logical operator tokens placed between them; adjacent predicates without
//!   a token are joined by `AND`
//!
//! Every predicate binds its value to `:where_<column>`, so a column that is
//! also being set or inserted in the same statement never collides with the
//! predicate parameter.

use crate::error::{DbError, DbResult};
use crate::ident::{placeholder_name, quote_ident};
use crate::record::Record;
use crate::statement::Params;
use crate::value::Value;
use std::fmt::{self, Write as _};
use std::str::FromStr;

/// Prefix of every predicate placeholder.
pub const WHERE_PREFIX: &str = "where_";

/// Logical operator joining two predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Logic {
    And,
    Or,
}

impl Logic {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Logic::And => "AND",
            Logic::Or => "OR",
        }
    }
}

impl fmt::Display for Logic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

impl FromStr for Logic {
    type Err = DbError;

    fn from_str(s: &str) -> DbResult<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "AND" | "&&" => Ok(Logic::And),
            "OR" | "||" => Ok(Logic::Or),
            _ => Err(DbError::validation(format!(
                "unknown logical operator '{}'",
                s.trim()
            ))),
        }
    }
}

/// Comparison operator of a predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
    Like,
    NotLike,
    ILike,
    NotILike,
}

impl CompareOp {
    pub fn as_sql(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "!=",
            CompareOp::Lt => "<",
            CompareOp::Lte => "<=",
            CompareOp::Gt => ">",
            CompareOp::Gte => ">=",
            CompareOp::Like => "LIKE",
            CompareOp::NotLike => "NOT LIKE",
            CompareOp::ILike => "ILIKE",
            CompareOp::NotILike => "NOT ILIKE",
        }
    }
}

impl FromStr for CompareOp {
    type Err = DbError;

    fn from_str(s: &str) -> DbResult<Self> {
        let normalized = s.split_whitespace().collect::<Vec<_>>().join(" ");
        let op = match normalized.to_ascii_uppercase().as_str() {
            "=" | "==" => CompareOp::Eq,
            "!=" | "<>" => CompareOp::Ne,
            "<" => CompareOp::Lt,
            "<=" => CompareOp::Lte,
            ">" => CompareOp::Gt,
            ">=" => CompareOp::Gte,
            "LIKE" => CompareOp::Like,
            "NOT LIKE" => CompareOp::NotLike,
            "ILIKE" => CompareOp::ILike,
            "NOT ILIKE" => CompareOp::NotILike,
            _ => {
                return Err(DbError::validation(format!(
                    "unknown comparison operator '{normalized}'"
                )));
            }
        };
        Ok(op)
    }
}

/// One `column OP value` comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub column: String,
    pub op: CompareOp,
    pub value: Value,
}

/// An entry of a WHERE sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum WhereItem {
    Predicate(Predicate),
    Logic(Logic),
}

impl WhereItem {
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, CompareOp::Eq, value)
    }

    pub fn compare(column: impl Into<String>, op: CompareOp, value: impl Into<Value>) -> Self {
        WhereItem::Predicate(Predicate {
            column: column.into(),
            op,
            value: value.into(),
        })
    }

    /// A `[column, operator, value]` triple with a textual operator.
    pub fn triple(column: impl Into<String>, op: &str, value: impl Into<Value>) -> DbResult<Self> {
        Ok(Self::compare(column, op.parse()?, value))
    }

    /// A bare logical operator token (`AND`, `&&`, `OR`, `||`).
    pub fn logic(token: &str) -> DbResult<Self> {
        Ok(WhereItem::Logic(token.parse()?))
    }
}

/// Ordered WHERE input.
#[derive(Debug, Clone, Default, PartialEq)]
#[must_use]
pub struct Where {
    items: Vec<WhereItem>,
}

impl Where {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `column = value`.
    pub fn eq(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.item(WhereItem::eq(column, value))
    }

    /// Add `column <op> value`.
    pub fn compare(self, column: impl Into<String>, op: CompareOp, value: impl Into<Value>) -> Self {
        self.item(WhereItem::compare(column, op, value))
    }

    /// Add a `[column, operator, value]` triple, parsing the operator.
    pub fn triple(
        self,
        column: impl Into<String>,
        op: &str,
        value: impl Into<Value>,
    ) -> DbResult<Self> {
        Ok(self.item(WhereItem::triple(column, op, value)?))
    }

    /// Join the next predicate with `AND`.
    pub fn and(self) -> Self {
        self.item(WhereItem::Logic(Logic::And))
    }

    /// Join the next predicate with `OR`.
    pub fn or(self) -> Self {
        self.item(WhereItem::Logic(Logic::Or))
    }

    pub fn item(mut self, item: WhereItem) -> Self {
        self.items.push(item);
        self
    }

    pub fn push(&mut self, item: WhereItem) -> &mut Self {
        self.items.push(item);
        self
    }

    pub fn items(&self) -> &[WhereItem] {
        &self.items
    }

    /// True when nothing was added. A lone `AND`/`OR` is not empty: it fails
    /// formatting instead of dropping the clause.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Format the clause body (without `WHERE`) and the parameters it binds.
    ///
    /// Fails when a logical operator starts or ends the sequence, or two
    /// operators follow each other.
    pub fn format(&self) -> DbResult<(String, Params)> {
        let mut sql = String::new();
        let mut params = Params::new();
        let mut pending: Option<Logic> = None;

        for item in &self.items {
            match item {
                WhereItem::Logic(logic) => {
                    if sql.is_empty() {
                        return Err(DbError::validation(format!(
                            "where clause cannot start with '{logic}'"
                        )));
                    }
                    if let Some(previous) = pending {
                        return Err(DbError::validation(format!(
                            "where clause has '{previous}' followed by '{logic}'"
                        )));
                    }
                    pending = Some(*logic);
                }
                WhereItem::Predicate(predicate) => {
                    if !sql.is_empty() {
                        let logic = pending.take().unwrap_or(Logic::And);
                        let _ = write!(sql, " {logic} ");
                    }
                    write_predicate(&mut sql, &mut params, predicate);
                }
            }
        }

        if let Some(logic) = pending {
            return Err(DbError::validation(format!(
                "where clause cannot end with '{logic}'"
            )));
        }

        Ok((sql, params))
    }
}

fn write_predicate(sql: &mut String, params: &mut Params, predicate: &Predicate) {
    let column = quote_ident(&predicate.column);

    if predicate.value.is_null() {
        match predicate.op {
            CompareOp::Eq => {
                let _ = write!(sql, "{column} IS NULL");
                return;
            }
            CompareOp::Ne => {
                let _ = write!(sql, "{column} IS NOT NULL");
                return;
            }
            _ => {}
        }
    }

    let base = format!("{WHERE_PREFIX}{}", placeholder_name(&predicate.column));
    let mut name = base.clone();
    let mut n = 1;
    while params.contains_key(&name) {
        n += 1;
        name = format!("{base}_{n}");
    }

    let _ = write!(sql, "{column} {} :{name}", predicate.op.as_sql());
    params.insert(name, predicate.value.clone());
}

impl From<Vec<WhereItem>> for Where {
    fn from(items: Vec<WhereItem>) -> Self {
        Self { items }
    }
}

impl FromIterator<WhereItem> for Where {
    fn from_iter<I: IntoIterator<Item = WhereItem>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Where {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        iter.into_iter()
            .map(|(column, value)| WhereItem::eq(column, value))
            .collect()
    }
}

impl<K: Into<String>, V: Into<Value>, const N: usize> From<[(K, V); N]> for Where {
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

impl From<Record> for Where {
    fn from(record: Record) -> Self {
        record.into_iter().collect()
    }
}

impl From<&Record> for Where {
    fn from(record: &Record) -> Self {
        record
            .iter()
            .map(|(column, value)| WhereItem::eq(column.clone(), value.clone()))
            .collect()
    }
}
