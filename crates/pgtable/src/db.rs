//! The table-oriented facade.
//!
//! [`Db`] owns a client and a [`QueryBuilder`] for the current table. Every
//! operation starts from a fresh builder for that table, so nothing from a
//! previous call leaks into the next statement. `select` keeps its outcome
//! until [`Db::retrieve`] takes it.


use crate::builder::{Columns, Mode, QueryBuilder, Where};
use crate::client::{self, GenericClient};
use crate::config::DbConfig;
use crate::error::{DbError, DbResult};
use crate::log::SqlLogConfig;
use crate::record::Record;
use crate::statement::{Statement, column_params};
use std::fmt;
use std::str::FromStr;

/// How selected rows are keyed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FetchMode {
    /// By column name.
    #[default]
    Assoc,
    /// By column position: `"0"`, `"1"`, ...
    Num,
}

/// How many rows [`Db::retrieve`] returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Retrieve {
    #[default]
    All,
    First,
}

impl Retrieve {
    pub fn as_str(&self) -> &'static str {
        match self {
            Retrieve::All => "all",
            Retrieve::First => "first",
        }
    }
}

impl fmt::Display for Retrieve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Retrieve {
    type Err = DbError;

    fn from_str(s: &str) -> DbResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Retrieve::All),
            "first" => Ok(Retrieve::First),
            _ => Err(DbError::UnsupportedKeyword(s.trim().to_string())),
        }
    }
}

/// Rows handed out by [`Db::retrieve`].
#[derive(Debug, Clone, PartialEq)]
pub enum Retrieved {
    All(Vec<Record>),
    First(Option<Record>),
}

impl Retrieved {
    /// Every retrieved row (zero or one for `First`).
    pub fn into_all(self) -> Vec<Record> {
        match self {
            Retrieved::All(rows) => rows,
            Retrieved::First(row) => row.into_iter().collect(),
        }
    }

    /// The first retrieved row, if any.
    pub fn into_first(self) -> Option<Record> {
        match self {
            Retrieved::All(rows) => rows.into_iter().next(),
            Retrieved::First(row) => row,
        }
    }
}

/// Outcome of the last `select`.
#[derive(Debug)]
pub struct ResultSet {
    outcome: DbResult<Vec<Record>>,
}

impl ResultSet {
    pub fn is_failed(&self) -> bool {
        self.outcome.is_err()
    }

    /// The fetched rows; empty when the select failed.
    pub fn rows(&self) -> &[Record] {
        match &self.outcome {
            Ok(rows) => rows,
            Err(_) => &[],
        }
    }

    pub fn error(&self) -> Option<&DbError> {
        self.outcome.as_ref().err()
    }

    pub fn into_rows(self) -> DbResult<Vec<Record>> {
        self.outcome
    }
}

/// A row of a `multi_insert` that was not inserted.
#[derive(Debug)]
pub struct RowFailure {
    /// Position of the row in the input.
    pub index: usize,
    pub error: DbError,
}

/// Outcome of [`Db::multi_insert`].
#[derive(Debug)]
pub enum MultiInsert {
    /// Every row was inserted.
    Complete { inserted: usize },
    /// Some rows were inserted, some were not.
    Partial {
        inserted: usize,
        failures: Vec<RowFailure>,
    },
    /// No row was inserted. `aborted` is set when the batch never ran
    /// (invalid columns, missing table, failed preparation).
    Failed {
        failures: Vec<RowFailure>,
        aborted: Option<DbError>,
    },
}

impl MultiInsert {
    fn aborted(error: DbError) -> Self {
        MultiInsert::Failed {
            failures: Vec::new(),
            aborted: Some(error),
        }
    }

    fn from_outcome(total: usize, inserted: usize, mut failures: Vec<RowFailure>) -> Self {
        failures.sort_by_key(|f| f.index);
        if inserted == total {
            MultiInsert::Complete { inserted }
        } else if inserted > 0 {
            MultiInsert::Partial { inserted, failures }
        } else {
            MultiInsert::Failed {
                failures,
                aborted: None,
            }
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, MultiInsert::Complete { .. })
    }

    pub fn is_partial(&self) -> bool {
        matches!(self, MultiInsert::Partial { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, MultiInsert::Failed { .. })
    }

    /// Number of rows inserted.
    pub fn inserted(&self) -> usize {
        match self {
            MultiInsert::Complete { inserted } | MultiInsert::Partial { inserted, .. } => *inserted,
            MultiInsert::Failed { .. } => 0,
        }
    }

    /// Rows that were not inserted.
    pub fn failures(&self) -> &[RowFailure] {
        match self {
            MultiInsert::Complete { .. } => &[],
            MultiInsert::Partial { failures, .. } | MultiInsert::Failed { failures, .. } => {
                failures
            }
        }
    }
}

/// Table-oriented database facade over a [`GenericClient`].
///
/// ```ignore
/// let mut db = Db::connect(&DbConfig::from_env()?).await?;
///
/// db.table("users")
///     .insert(&record! { "username" => "John", "password" => "secret" })
///     .await?;
///
/// let john = db
///     .table("users")
///     .select("*", Where::from([("username", "John")]))
///     .await
///     .retrieve(Retrieve::First)?
///     .into_first();
/// ```
pub struct Db<C> {
    client: C,
    builder: QueryBuilder,
    results: Option<ResultSet>,
    sql_log: SqlLogConfig,
}

impl Db<tokio_postgres::Client> {
    /// Connect without TLS using `config`.
    pub async fn connect(config: &DbConfig) -> DbResult<Self> {
        let client = client::connect(config).await?;
        Ok(Db::new(client).with_sql_log(config.sql_log_config().clone()))
    }
}

impl<C: GenericClient> Db<C> {
    /// Wrap an existing client.
    pub fn new(client: C) -> Self {
        Self {
            client,
            builder: QueryBuilder::default(),
            results: None,
            sql_log: SqlLogConfig::default(),
        }
    }

    pub fn with_sql_log(mut self, sql_log: SqlLogConfig) -> Self {
        self.sql_log = sql_log;
        self
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn into_client(self) -> C {
        self.client
    }

    /// Whether the underlying connection is still open.
    pub fn is_connected(&self) -> bool {
        !self.client.is_closed()
    }

    /// Target a table for subsequent operations.
    ///
    /// The name is an identifier, optionally schema-qualified (`public.users`).
    pub fn table(&mut self, table: impl Into<String>) -> &mut Self {
        self.builder = QueryBuilder::new(table);
        self
    }

    /// The table currently targeted; empty before [`Db::table`].
    pub fn table_name(&self) -> &str {
        self.builder.table_name()
    }

    /// Run a select with name-keyed rows; see [`Db::select_with`].
    pub async fn select(
        &mut self,
        columns: impl Into<Columns>,
        filter: impl Into<Where>,
    ) -> &mut Self {
        self.select_with(columns, filter, FetchMode::Assoc).await
    }

    /// Run a select and keep its outcome for [`Db::retrieve`].
    ///
    /// A failed select does not fail here: the error is kept and handed out
    /// by `retrieve`. Any earlier pending result is replaced.
    pub async fn select_with(
        &mut self,
        columns: impl Into<Columns>,
        filter: impl Into<Where>,
        fetch_mode: FetchMode,
    ) -> &mut Self {
        let columns = columns.into();
        let filter = filter.into();
        let outcome = self.fetch(columns, &filter, fetch_mode).await;
        self.results = Some(ResultSet { outcome });
        self
    }

    async fn fetch(
        &self,
        columns: Columns,
        filter: &Where,
        fetch_mode: FetchMode,
    ) -> DbResult<Vec<Record>> {
        let stmt = self
            .start(Mode::Select)?
            .columns(columns)
            .filter(filter)?
            .build();
        let rows = self.run_query(&stmt).await?;
        Ok(match fetch_mode {
            FetchMode::Assoc => rows,
            FetchMode::Num => rows.into_iter().map(Record::into_positional).collect(),
        })
    }

    /// The pending select outcome, if any, without consuming it.
    pub fn result_set(&self) -> Option<&ResultSet> {
        self.results.as_ref()
    }

    /// Take the rows of the last select.
    ///
    /// Fails with [`DbError::NoResultSet`] when no select is pending, and
    /// with the select's own error when it failed.
    pub fn retrieve(&mut self, amount: Retrieve) -> DbResult<Retrieved> {
        let rows = self.results.take().ok_or(DbError::NoResultSet)?.into_rows()?;
        Ok(match amount {
            Retrieve::All => Retrieved::All(rows),
            Retrieve::First => Retrieved::First(rows.into_iter().next()),
        })
    }

    /// Insert one row; returns the number of rows inserted.
    pub async fn insert(&mut self, data: &Record) -> DbResult<u64> {
        if data.is_empty() {
            return Err(DbError::validation("insert requires at least one column"));
        }
        let columns = Columns::from(data);
        let stmt = self
            .start(Mode::Insert)?
            .columns(columns.clone())
            .values(columns)
            .build()
            .bind_record(data);
        self.run_execute(&stmt).await
    }

    /// Insert many rows with one prepared statement.
    ///
    /// Every row is bound by the column names in `columns`; a row missing one
    /// of them is reported as a failure without being sent. Rows run one
    /// after another and each succeeds or fails on its own.
    pub async fn multi_insert(&mut self, columns: impl Into<Columns>, rows: &[Record]) -> MultiInsert {
        let columns = columns.into();
        if columns.names().is_empty() {
            return MultiInsert::aborted(DbError::validation(
                "multi_insert requires an explicit column list",
            ));
        }
        let builder = match self.start(Mode::Insert) {
            Ok(builder) => builder,
            Err(e) => return MultiInsert::aborted(e),
        };
        if rows.is_empty() {
            return MultiInsert::Complete { inserted: 0 };
        }

        let stmt = builder
            .columns(columns.clone())
            .values(columns.clone())
            .build();
        let positional = stmt.to_positional_sql();

        let mut failures = Vec::new();
        let mut batch = Vec::with_capacity(rows.len());
        let mut batch_indexes = Vec::with_capacity(rows.len());
        for (index, row) in rows.iter().enumerate() {
            match positional.values_for(&column_params(columns.names(), row)) {
                Ok(values) => {
                    batch.push(values);
                    batch_indexes.push(index);
                }
                Err(error) => failures.push(RowFailure { index, error }),
            }
        }

        if batch.is_empty() {
            return MultiInsert::from_outcome(rows.len(), 0, failures);
        }

        let event = self.sql_log.begin(
            stmt.mode(),
            self.table_name(),
            positional.sql(),
            positional.names().len(),
        );
        let results = match self.client.execute_many(positional.sql(), &batch).await {
            Ok(results) => results,
            Err(e) => {
                event.failed(&e);
                return MultiInsert::aborted(e);
            }
        };

        let mut inserted = 0;
        for (index, result) in batch_indexes.into_iter().zip(results) {
            match result {
                Ok(_) => inserted += 1,
                Err(error) => {
                    event.failed(&error);
                    failures.push(RowFailure { index, error });
                }
            }
        }
        event.completed(inserted as u64);

        MultiInsert::from_outcome(rows.len(), inserted, failures)
    }

    /// Update matching rows; an empty filter updates every row.
    pub async fn update(&mut self, data: &Record, filter: impl Into<Where>) -> DbResult<u64> {
        if data.is_empty() {
            return Err(DbError::validation("update requires at least one column to set"));
        }
        let filter = filter.into();
        let stmt = self
            .start(Mode::Update)?
            .data(data)
            .filter(&filter)?
            .build();
        self.run_execute(&stmt).await
    }

    /// Delete matching rows; an empty filter deletes every row.
    pub async fn delete(&mut self, filter: impl Into<Where>) -> DbResult<u64> {
        let filter = filter.into();
        let stmt = self.start(Mode::Delete)?.filter(&filter)?.build();
        self.run_execute(&stmt).await
    }

    /// A fresh builder for the current table.
    fn start(&self, mode: Mode) -> DbResult<QueryBuilder> {
        if self.builder.table_name().trim().is_empty() {
            return Err(DbError::validation("no table selected; call table() first"));
        }
        Ok(self.builder.reset().mode(mode))
    }

    async fn run_query(&self, stmt: &Statement) -> DbResult<Vec<Record>> {
        let query = stmt.to_positional()?;
        let event = self
            .sql_log
            .begin(stmt.mode(), self.table_name(), query.sql(), query.values().len());
        event.finish(self.client.query(query.sql(), query.values()).await)
    }

    async fn run_execute(&self, stmt: &Statement) -> DbResult<u64> {
        let query = stmt.to_positional()?;
        let event = self
            .sql_log
            .begin(stmt.mode(), self.table_name(), query.sql(), query.values().len());
        event.finish(self.client.execute(query.sql(), query.values()).await)
    }
}

impl<C> fmt::Debug for Db<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Db")
            .field("table", &self.builder.table_name())
            .field("pending_result", &self.results.is_some())
            .finish_non_exhaustive()
    }
}
