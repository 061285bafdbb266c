//! Named-placeholder statements and their conversion to positional form.
//!
//! The builder emits SQL with `:name` placeholders so that `SET`/`VALUES`
//! parameters (`:username`) and predicate parameters (`:where_username`) can
//! be told apart by name. PostgreSQL only understands `$1, $2, ...`, so
//! [`Statement::to_positional`] rewrites the names just before execution:
//!
//! - each distinct name gets one index, in order of first appearance
//! - repeated names reuse their index
//! - text inside `'...'` literals, `"..."` identifiers and `::` casts is left alone

use crate::builder::Mode;
use crate::error::{DbError, DbResult};
use crate::ident::placeholder_names;
use crate::record::Record;
use crate::value::Value;
use indexmap::IndexMap;
use std::collections::HashMap;
use std::fmt::{self, Write as _};
use tokio_postgres::types::ToSql;

/// Named parameters of a statement, in binding order.
pub type Params = IndexMap<String, Value>;

/// SQL with `:name` placeholders plus the parameters bound to those names.
#[derive(Debug, Clone, Default, PartialEq)]
#[must_use]
pub struct Statement {
    sql: String,
    params: Params,
    mode: Option<Mode>,
}

impl Statement {
    /// Create a statement from raw named-placeholder SQL.
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Params::new(),
            mode: None,
        }
    }

    pub(crate) fn with_mode(sql: String, params: Params, mode: Option<Mode>) -> Self {
        Self { sql, params, mode }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// The builder mode that produced this statement, if any.
    pub fn mode(&self) -> Option<Mode> {
        self.mode
    }

    /// An empty statement is what the builder produces without a mode.
    pub fn is_empty(&self) -> bool {
        self.sql.is_empty()
    }

    /// Bind a value to `:name`, replacing any previous binding.
    pub fn bind(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Bind every column of a record under its plain placeholder name.
    pub fn bind_record(mut self, record: &Record) -> Self {
        self.params.extend(record_params(record));
        self
    }

    /// Rewrite `:name` placeholders to `$n` and collect the values in index order.
    pub fn to_positional(&self) -> DbResult<PositionalQuery> {
        let PositionalSql { sql, names } = self.to_positional_sql();
        let values = collect_values(&names, &self.params)?;
        Ok(PositionalQuery { sql, names, values })
    }

    /// Rewrite `:name` placeholders to `$n` without resolving any values.
    pub fn to_positional_sql(&self) -> PositionalSql {
        let src = self.sql.as_str();
        let bytes = src.as_bytes();
        let mut sql = String::with_capacity(src.len());
        let mut names: Vec<String> = Vec::new();
        let mut indices: HashMap<&str, usize> = HashMap::new();
        let mut copied = 0;
        let mut i = 0;

        while i < bytes.len() {
            match bytes[i] {
                quote @ (b'\'' | b'"') => {
                    i += 1;
                    while i < bytes.len() {
                        if bytes[i] == quote {
                            // Doubled quote is an escape, not the end.
                            if bytes.get(i + 1) == Some(&quote) {
                                i += 2;
                                continue;
                            }
                            break;
                        }
                        i += 1;
                    }
                    i += 1;
                }
                b':' if bytes.get(i + 1) == Some(&b':') => i += 2,
                b':' if bytes.get(i + 1).is_some_and(|b| is_name_byte(*b)) => {
                    let start = i + 1;
                    let end = start
                        + bytes[start..]
                            .iter()
                            .take_while(|b| is_name_byte(**b))
                            .count();
                    let name = &src[start..end];

                    let index = *indices.entry(name).or_insert_with(|| {
                        names.push(name.to_string());
                        names.len()
                    });

                    sql.push_str(&src[copied..i]);
                    let _ = write!(sql, "${index}");
                    copied = end;
                    i = end;
                }
                _ => i += 1,
            }
        }
        sql.push_str(&src[copied.min(src.len())..]);

        PositionalSql { sql, names }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql)
    }
}

fn is_name_byte(b: u8) -> bool {
    b == b'_' || b.is_ascii_alphanumeric()
}

fn collect_values(names: &[String], params: &Params) -> DbResult<Vec<Value>> {
    names
        .iter()
        .map(|name| {
            params
                .get(name)
                .cloned()
                .ok_or_else(|| DbError::MissingParam(name.clone()))
        })
        .collect()
}

/// Positional SQL plus the placeholder name behind each `$n`.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionalSql {
    sql: String,
    names: Vec<String>,
}

impl PositionalSql {
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Placeholder names; `names()[0]` is `$1`.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Resolve the placeholders against a parameter set
    /// (used to execute one prepared statement for many rows).
    pub fn values_for(&self, params: &Params) -> DbResult<Vec<Value>> {
        collect_values(&self.names, params)
    }
}

/// A statement ready for the driver: `$n` placeholders and values in index order.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionalQuery {
    sql: String,
    names: Vec<String>,
    values: Vec<Value>,
}

impl PositionalQuery {
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Placeholder names; `names()[0]` is `$1`.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }
}

/// Parameters of a record keyed by placeholder name.
pub fn record_params(record: &Record) -> Params {
    placeholder_names(record.columns())
        .into_iter()
        .zip(record.values().cloned())
        .collect()
}

/// Parameters of `row` for the given column list, named the way
/// `Columns::placeholders` names them. Columns absent from the row are
/// skipped.
pub fn column_params(columns: &[String], row: &Record) -> Params {
    placeholder_names(columns)
        .into_iter()
        .zip(columns)
        .filter_map(|(name, column)| row.get(column).map(|value| (name, value.clone())))
        .collect()
}

/// Borrow values as driver parameters.
pub fn as_sql_params(values: &[Value]) -> Vec<&(dyn ToSql + Sync)> {
    values.iter().map(|v| v as &(dyn ToSql + Sync)).collect()
}
