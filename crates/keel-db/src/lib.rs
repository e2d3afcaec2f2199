//! keel-db - Database layer for Keel
//!
//! This crate provides the [`Connection`] / [`Connector`] capability traits,
//! DuckDB and PostgreSQL implementations of them, and the migration
//! [`Applier`] that serializes schema changes behind an advisory lock.

pub mod applier;
pub mod backend;
pub mod connection;
pub mod context;
pub mod duckdb;
pub mod error;
pub mod lock;
pub mod postgres;
pub mod state;

pub use crate::duckdb::DuckDbConnector;
pub use crate::postgres::PostgresConnector;
pub use applier::{Applier, ApplierOptions, ApplyReport, SchemaStatus};
pub use backend::{open_applier, AnyApplier, Backend, DatabaseUrl};
pub use connection::{Connection, Connector, Interrupt, Param, Row, Value};
pub use context::{CancelToken, Context, Watch};
pub use error::{DbError, DbResult, MigrateError, MigrateResult};
pub use keel_core::DEFAULT_LOCK_KEY;
pub use state::{HistoryEntry, MigrationState};
