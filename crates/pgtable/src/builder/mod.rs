//! Query builder.
//!
//! [`QueryBuilder`] is a value: every setter consumes the builder and returns
//! the updated one, and [`QueryBuilder::build`] renders one [`Statement`].
//! Nothing carries over from one query to the next except the table, which
//! [`QueryBuilder::reset`] keeps.
//!
//! ```ignore
//! use pgtable::{Mode, QueryBuilder, Where};
//!
//! let stmt = QueryBuilder::new("users")
//!     .mode(Mode::Update)
//!     .data(&record! { "username" => "Johnny" })
//!     .filter(&Where::from([("username", "John")]))?
//!     .build();
//!
//! assert_eq!(
//!     stmt.sql(),
//!     r#"UPDATE "users" SET "username" = :username WHERE "username" = :where_username"#
//! );
//! ```

mod where_clause;


pub use where_clause::{CompareOp, Logic, Predicate, WHERE_PREFIX, Where, WhereItem};

use crate::error::DbResult;
use crate::ident::{placeholder_names, quote_ident};
use crate::record::Record;
use crate::statement::{Params, Statement};
use std::fmt;

/// The kind of statement a builder renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Select,
    Insert,
    Update,
    Delete,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Select => "select",
            Mode::Insert => "insert",
            Mode::Update => "update",
            Mode::Delete => "delete",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A column list: `*` or named columns.
///
/// Built from a delimited string (`"a, b, c"`), `"*"`, or a sequence of names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Columns {
    All,
    List(Vec<String>),
}

impl Columns {
    /// Parse a comma-delimited list; `*` alone means every column.
    pub fn parse(s: &str) -> Self {
        if s.trim() == "*" {
            return Columns::All;
        }
        Columns::List(
            s.split(',')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    /// Named columns; empty for `*`.
    pub fn names(&self) -> &[String] {
        match self {
            Columns::All => &[],
            Columns::List(names) => names,
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Columns::All)
    }

    /// Quoted, comma-joined list. `*` and an empty list render as `*`.
    pub fn to_sql(&self) -> String {
        match self {
            Columns::List(names) if !names.is_empty() => names
                .iter()
                .map(|c| quote_ident(c))
                .collect::<Vec<_>>()
                .join(", "),
            _ => "*".to_string(),
        }
    }

    /// `:a, :b` placeholder list for `INSERT ... VALUES`.
    pub fn placeholders(&self) -> String {
        placeholder_names(self.names())
            .iter()
            .map(|name| format!(":{name}"))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl From<&str> for Columns {
    fn from(s: &str) -> Self {
        Columns::parse(s)
    }
}

impl From<String> for Columns {
    fn from(s: String) -> Self {
        Columns::parse(&s)
    }
}

impl From<Vec<String>> for Columns {
    fn from(names: Vec<String>) -> Self {
        Columns::List(names)
    }
}

impl From<Vec<&str>> for Columns {
    fn from(names: Vec<&str>) -> Self {
        names.as_slice().into()
    }
}

impl From<&[&str]> for Columns {
    fn from(names: &[&str]) -> Self {
        Columns::List(names.iter().map(|c| c.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Columns {
    fn from(names: [&str; N]) -> Self {
        names.as_slice().into()
    }
}

impl From<&Record> for Columns {
    fn from(record: &Record) -> Self {
        Columns::List(record.columns().map(str::to_string).collect())
    }
}

/// Assembles one parameterized SQL statement.
///
/// Fragments are formatted when set, so `build` only stitches them together.
#[derive(Debug, Clone, Default, PartialEq)]
#[must_use]
pub struct QueryBuilder {
    table: String,
    mode: Option<Mode>,
    columns: Option<String>,
    filter: Option<String>,
    values: Option<String>,
    data: Option<String>,
    params: Params,
}

impl QueryBuilder {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Self::default()
        }
    }

    /// Set the raw table identifier.
    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    pub fn table_name(&self) -> &str {
        &self.table
    }

    /// A builder for the same table with every other setting cleared.
    pub fn reset(&self) -> Self {
        Self::new(self.table.clone())
    }

    pub fn mode(mut self, mode: Mode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn columns(mut self, columns: impl Into<Columns>) -> Self {
        self.columns = Some(columns.into().to_sql());
        self
    }

    /// Set the WHERE clause. An empty input clears it; logical tokens without
    /// predicates are a validation error.
    pub fn filter(mut self, filter: &Where) -> DbResult<Self> {
        if filter.is_empty() {
            self.filter = None;
            return Ok(self);
        }
        let (sql, params) = filter.format()?;
        self.params.extend(params);
        self.filter = Some(sql);
        Ok(self)
    }

    /// Set the `VALUES (...)` placeholders of an insert.
    pub fn values(mut self, columns: impl Into<Columns>) -> Self {
        self.values = Some(columns.into().placeholders());
        self
    }

    /// Set the `SET` fragment of an update and bind its values.
    pub fn data(mut self, data: &Record) -> Self {
        let mut fragments = Vec::with_capacity(data.len());
        for ((column, value), name) in data.iter().zip(placeholder_names(data.columns())) {
            fragments.push(format!("{} = :{name}", quote_ident(column)));
            self.params.insert(name, value.clone());
        }
        self.data = Some(fragments.join(", "));
        self
    }

    /// Render the statement for the current mode; empty when no mode is set.
    pub fn build(&self) -> Statement {
        let table = quote_ident(&self.table);
        let columns = self.columns.as_deref().unwrap_or("*");
        let where_sql = self
            .filter
            .as_deref()
            .map(|w| format!(" WHERE {w}"))
            .unwrap_or_default();

        let sql = match self.mode {
            Some(Mode::Select) => format!("SELECT {columns} FROM {table}{where_sql}"),
            Some(Mode::Insert) => format!(
                "INSERT INTO {table} ({}) VALUES ({})",
                self.columns.as_deref().unwrap_or_default(),
                self.values.as_deref().unwrap_or_default()
            ),
            Some(Mode::Update) => format!(
                "UPDATE {table} SET {}{where_sql}",
                self.data.as_deref().unwrap_or_default()
            ),
            Some(Mode::Delete) => format!("DELETE FROM {table}{where_sql}"),
            None => String::new(),
        };

        Statement::with_mode(sql, self.params.clone(), self.mode)
    }
}
