//! SQL logging through `tracing`.
//!
//! Each statement the facade sends opens a [`SqlEvent`]: the positional SQL
//! is emitted under the `pgtable.sql` target before execution, and the
//! outcome (affected rows or error, with elapsed time) when it completes.

use crate::builder::Mode;
use crate::error::{DbError, DbResult};
use crate::record::Record;
use std::time::{Duration, Instant};
use tracing::Level;

/// Target of every statement event.
pub const SQL_TARGET: &str = "pgtable.sql";

macro_rules! event_at {
    ($level:expr, $($field:tt)*) => {
        match $level {
            Level::ERROR => tracing::error!($($field)*),
            Level::WARN => tracing::warn!($($field)*),
            Level::INFO => tracing::info!($($field)*),
            Level::DEBUG => tracing::debug!($($field)*),
            Level::TRACE => tracing::trace!($($field)*),
        }
    };
}

/// How statements are logged.
///
/// ```ignore
/// let log = SqlLogConfig::default().level(tracing::Level::INFO).no_truncate();
/// ```
#[derive(Debug, Clone)]
pub struct SqlLogConfig {
    pub enabled: bool,
    /// Level of statement and completion events. Failures are always `WARN`.
    pub level: Level,
    /// Longest SQL text logged, in bytes; longer text is cut and ends in `...`.
    pub max_sql_length: Option<usize>,
}

impl Default for SqlLogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: Level::DEBUG,
            max_sql_length: Some(200),
        }
    }
}

impl SqlLogConfig {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    pub fn level(self, level: Level) -> Self {
        Self { level, ..self }
    }

    pub fn max_sql_length(self, len: usize) -> Self {
        Self {
            max_sql_length: Some(len),
            ..self
        }
    }

    pub fn no_truncate(self) -> Self {
        Self {
            max_sql_length: None,
            ..self
        }
    }

    /// Log `sql` as about to run and start timing it.
    pub(crate) fn begin<'a>(
        &'a self,
        mode: Option<Mode>,
        table: &'a str,
        sql: &str,
        param_count: usize,
    ) -> SqlEvent<'a> {
        let mode = mode.map_or("-", |m| m.as_str());
        if self.enabled {
            let sql = shorten(sql, self.max_sql_length);
            event_at!(self.level, target: SQL_TARGET, mode, table, param_count, sql = %sql);
        }
        SqlEvent {
            config: self,
            mode,
            table,
            started: Instant::now(),
        }
    }
}

/// One statement in flight.
#[derive(Debug)]
pub(crate) struct SqlEvent<'a> {
    config: &'a SqlLogConfig,
    mode: &'static str,
    table: &'a str,
    started: Instant,
}

impl SqlEvent<'_> {
    /// Log the outcome and hand the result back.
    pub(crate) fn finish<T: Outcome>(self, result: DbResult<T>) -> DbResult<T> {
        match &result {
            Ok(value) => self.completed(value.rows()),
            Err(error) => self.failed(error),
        }
        result
    }

    pub(crate) fn completed(&self, rows: u64) {
        if !self.config.enabled {
            return;
        }
        let elapsed_ms = millis(self.started.elapsed());
        event_at!(
            self.config.level,
            target: SQL_TARGET,
            mode = self.mode,
            table = self.table,
            rows,
            elapsed_ms,
            "statement completed"
        );
    }

    pub(crate) fn failed(&self, error: &DbError) {
        if !self.config.enabled {
            return;
        }
        tracing::warn!(
            target: SQL_TARGET,
            mode = self.mode,
            table = self.table,
            elapsed_ms = millis(self.started.elapsed()),
            error = %error,
            "statement failed"
        );
    }
}

/// Row count reported for a completed statement.
pub(crate) trait Outcome {
    fn rows(&self) -> u64;
}

impl Outcome for u64 {
    fn rows(&self) -> u64 {
        *self
    }
}

impl Outcome for Vec<Record> {
    fn rows(&self) -> u64 {
        self.len() as u64
    }
}

fn millis(elapsed: Duration) -> f64 {
    elapsed.as_secs_f64() * 1000.0
}

/// Cut `sql` to at most `max` bytes without splitting a character.
fn shorten(sql: &str, max: Option<usize>) -> String {
    let Some(max) = max.filter(|&max| sql.len() > max) else {
        return sql.to_string();
    };
    let end = sql
        .char_indices()
        .map(|(i, c)| i + c.len_utf8())
        .take_while(|&end| end <= max)
        .last()
        .unwrap_or(0);
    format!("{}...", &sql[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_sql_is_cut() {
        assert_eq!(shorten("SELECT * FROM users", Some(10)), "SELECT * F...");
        assert_eq!(shorten("SELECT 1", Some(10)), "SELECT 1");
        let sql = "x".repeat(500);
        assert_eq!(shorten(&sql, None), sql);
    }

    #[test]
    fn cut_never_splits_a_character() {
        // 'é' is two bytes.
        assert_eq!(shorten("aéb", Some(2)), "a...");
        assert_eq!(shorten("aéb", Some(3)), "aé...");
        assert_eq!(shorten("éé", Some(1)), "...");
    }

    #[test]
    fn setters_chain() {
        let log = SqlLogConfig::default().level(Level::INFO).max_sql_length(10);
        assert_eq!(log.level, Level::INFO);
        assert_eq!(log.max_sql_length, Some(10));
        assert_eq!(log.no_truncate().max_sql_length, None);
    }

    #[test]
    fn events_pass_results_through() {
        for log in [SqlLogConfig::default(), SqlLogConfig::disabled()] {
            let ok = log.begin(Some(Mode::Delete), "users", "DELETE FROM users", 0);
            assert_eq!(ok.finish(Ok(3u64)).unwrap(), 3);

            let failed = log.begin(None, "users", "SELECT 1", 0);
            assert!(matches!(
                failed.finish::<Vec<Record>>(Err(DbError::NoResultSet)),
                Err(DbError::NoResultSet)
            ));
        }
    }
}
