//! # pgtable
//!
//! A small table-oriented facade over PostgreSQL.
//!
//! ## Features
//!
//! - **One table at a time**: pick a table, then `select` / `insert` /
//!   `multi_insert` / `update` / `delete` on it
//! - **Always parameterized**: values are bound, identifiers are quoted
//! - **Collision-free placeholders**: predicate parameters are named
//!   `:where_<column>`, so a column can be both set and filtered on
//! - **Ordered records**: rows and input data are insertion-ordered
//!   column → value maps
//! - **Explicit errors**: every operation returns a `DbResult`
//! - **SQL logging**: statements are emitted through `tracing` under the
//!   `pgtable.sql` target
//!
//! ## Facade
//!
//! ```ignore
//! use pgtable::{Db, DbConfig, Retrieve, Where, record};
//!
//! let mut db = Db::connect(&DbConfig::from_env()?).await?;
//!
//! db.table("users")
//!     .insert(&record! { "username" => "Bob", "password" => "ilovecats123" })
//!     .await?;
//!
//! let bob = db
//!     .table("users")
//!     .select("id, username", Where::from([("username", "Bob")]))
//!     .await
//!     .retrieve(Retrieve::First)?
//!     .into_first();
//!
//! db.table("users")
//!     .update(
//!         &record! { "username" => "Robert" },
//!         Where::from([("username", "Bob")]),
//!     )
//!     .await?;
//! ```
//!
//! ## Builder
//!
//! The facade is built on [`QueryBuilder`], which can also be used on its
//! own to render a [`Statement`]:
//!
//! ```ignore
//! use pgtable::{CompareOp, Mode, QueryBuilder, Where};
//!
//! let stmt = QueryBuilder::new("users")
//!     .mode(Mode::Select)
//!     .columns("id, username")
//!     .filter(&Where::new().compare("age", CompareOp::Gt, 18).or().eq("admin", true))?
//!     .build();
//!
//! let query = stmt.to_positional()?; // `$1`, `$2` for tokio-postgres
//! ```

pub mod builder;
pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod ident;
pub mod log;
pub mod record;
pub mod statement;
pub mod value;

pub use builder::{Columns, CompareOp, Logic, Mode, Predicate, QueryBuilder, Where, WhereItem};
pub use client::{GenericClient, connect, connect_with_tls};
pub use config::DbConfig;
pub use db::{Db, FetchMode, MultiInsert, ResultSet, Retrieve, Retrieved, RowFailure};
pub use error::{DbError, DbResult};
pub use log::SqlLogConfig;
pub use record::Record;
pub use statement::{Params, PositionalQuery, PositionalSql, Statement};
pub use value::Value;
