//! Generic client trait for the facade's database access.

use crate::config::DbConfig;
use crate::error::{DbError, DbResult};
use crate::record::Record;
use crate::statement::as_sql_params;
use crate::value::Value;
use std::future::Future;
use tokio_postgres::tls::{MakeTlsConnect, TlsConnect};
use tokio_postgres::{NoTls, Socket};

/// The calls [`Db`](crate::Db) makes against a connection.
///
/// Rows come back already decoded into [`Record`]s, so anything that can
/// answer SQL with records (a live connection, a scripted client in tests)
/// can sit behind the facade.
pub trait GenericClient: Send + Sync {
    /// Execute a query and return all rows.
    fn query(
        &self,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = DbResult<Vec<Record>>> + Send;

    /// Execute a statement and return the number of affected rows.
    fn execute(&self, sql: &str, params: &[Value]) -> impl Future<Output = DbResult<u64>> + Send;

    /// Execute one statement once per parameter set.
    ///
    /// The outer error means nothing was executed (e.g. preparation failed);
    /// otherwise there is one result per parameter set, in order.
    ///
    /// The default implementation calls [`GenericClient::execute`] per row.
    fn execute_many(
        &self,
        sql: &str,
        rows: &[Vec<Value>],
    ) -> impl Future<Output = DbResult<Vec<DbResult<u64>>>> + Send {
        async move {
            let mut results = Vec::with_capacity(rows.len());
            for params in rows {
                results.push(self.execute(sql, params).await);
            }
            Ok(results)
        }
    }

    /// Whether the underlying connection has been closed.
    fn is_closed(&self) -> bool {
        false
    }
}

impl GenericClient for tokio_postgres::Client {
    async fn query(&self, sql: &str, params: &[Value]) -> DbResult<Vec<Record>> {
        let rows = tokio_postgres::Client::query(self, sql, &as_sql_params(params))
            .await
            .map_err(DbError::from_db_error)?;
        rows.iter().map(Record::from_row).collect()
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> DbResult<u64> {
        tokio_postgres::Client::execute(self, sql, &as_sql_params(params))
            .await
            .map_err(DbError::from_db_error)
    }

    async fn execute_many(&self, sql: &str, rows: &[Vec<Value>]) -> DbResult<Vec<DbResult<u64>>> {
        let stmt = tokio_postgres::Client::prepare(self, sql)
            .await
            .map_err(DbError::from_db_error)?;

        let mut results = Vec::with_capacity(rows.len());
        for params in rows {
            let result = tokio_postgres::Client::execute(self, &stmt, &as_sql_params(params))
                .await
                .map_err(DbError::from_db_error);
            results.push(result);
        }
        Ok(results)
    }

    fn is_closed(&self) -> bool {
        tokio_postgres::Client::is_closed(self)
    }
}

/// Open a connection without TLS and spawn its driver task.
pub async fn connect(config: &DbConfig) -> DbResult<tokio_postgres::Client> {
    connect_with_tls(config, NoTls).await
}

/// Open a connection with a custom TLS connector and spawn its driver task.
///
/// The driver task ends when the client is dropped; a connection error is
/// logged, after which [`GenericClient::is_closed`] reports `true`.
pub async fn connect_with_tls<T>(config: &DbConfig, tls: T) -> DbResult<tokio_postgres::Client>
where
    T: MakeTlsConnect<Socket> + Send + 'static,
    T::Stream: Send + 'static,
    T::TlsConnect: Send,
    <T::TlsConnect as TlsConnect<Socket>>::Future: Send,
{
    let (client, connection) = match config.pg_config().connect(tls).await {
        Ok(pair) => pair,
        Err(e) => {
            tracing::error!(target: "pgtable", error = %e, "failed to connect to database");
            return Err(DbError::Connection(e.to_string()));
        }
    };

    tokio::spawn(async move {
        if let Err(e) = connection.await {
            tracing::error!(target: "pgtable", error = %e, "database connection closed with error");
        }
    });

    tracing::info!(
        target: "pgtable",
        host = %config.describe_hosts(),
        dbname = config.pg_config().get_dbname().unwrap_or("-"),
        "connected to database"
    );
    Ok(client)
}
