//! DuckDB connector implementation
//!
//! DuckDB has no advisory locks. Across processes, DuckDB's single-writer
//! file lock already keeps a second process out of the database file; that
//! process is refused when it opens the file rather than blocked. Within
//! a process, every connection handed out by one [`DuckDbConnector`] shares a
//! [`LockTable`], which gives the same blocking, session-scoped semantics as
//! `pg_advisory_lock`.

use crate::connection::{Connection, Connector, Param, Row, Value};
use crate::context::Context;
use crate::error::{DbError, DbResult};
use crate::lock::LockTable;
use duckdb::types::{ToSqlOutput, Value as DuckValue};
use duckdb::ToSql;
use keel_core::sql_utils::{quote_ident, quote_literal};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Hands out connections to one DuckDB database.
///
/// In-memory databases live as long as the connector, so every connection
/// is a clone of one root connection.
pub struct DuckDbConnector {
    root: Mutex<duckdb::Connection>,
    locks: Arc<LockTable>,
}

impl DuckDbConnector {
    /// Create a new in-memory DuckDB database
    pub fn in_memory() -> DbResult<Self> {
        let conn = duckdb::Connection::open_in_memory()
            .map_err(|e| DbError::ConnectionError(e.to_string()))?;
        Ok(Self::from_connection(conn))
    }

    /// Open (or create) a DuckDB database file
    pub fn from_path(path: &Path) -> DbResult<Self> {
        let conn = duckdb::Connection::open(path)
            .map_err(|e| DbError::ConnectionError(format!("{e}: {}", path.display())))?;
        Ok(Self::from_connection(conn))
    }

    /// Create from path string (handles :memory: special case)
    pub fn new(path: &str) -> DbResult<Self> {
        if path == ":memory:" {
            Self::in_memory()
        } else {
            Self::from_path(Path::new(path))
        }
    }

    fn from_connection(conn: duckdb::Connection) -> Self {
        Self {
            root: Mutex::new(conn),
            locks: Arc::new(LockTable::new()),
        }
    }

    /// The lock table shared by this connector's connections.
    pub fn lock_table(&self) -> Arc<LockTable> {
        Arc::clone(&self.locks)
    }
}

impl Connector for DuckDbConnector {
    type Conn = DuckDbConnection;

    fn connect(&self) -> DbResult<DuckDbConnection> {
        let root = self
            .root
            .lock()
            .map_err(|e| DbError::MutexPoisoned(e.to_string()))?;
        let conn = root
            .try_clone()
            .map_err(|e| DbError::ConnectionError(e.to_string()))?;
        Ok(DuckDbConnection {
            conn,
            locks: Arc::clone(&self.locks),
            held: Vec::new(),
        })
    }

    fn backend_name(&self) -> &'static str {
        "duckdb"
    }
}

/// One DuckDB session.
pub struct DuckDbConnection {
    conn: duckdb::Connection,
    locks: Arc<LockTable>,
    held: Vec<i64>,
}

impl ToSql for Param<'_> {
    fn to_sql(&self) -> duckdb::Result<ToSqlOutput<'_>> {
        match self {
            Param::Int(v) => v.to_sql(),
            Param::Bool(v) => v.to_sql(),
            Param::Text(v) => v.to_sql(),
        }
    }
}

impl From<DuckValue> for Value {
    fn from(value: DuckValue) -> Self {
        match value {
            DuckValue::Null => Value::Null,
            DuckValue::Boolean(b) => Value::Bool(b),
            DuckValue::TinyInt(n) => Value::Int(n.into()),
            DuckValue::SmallInt(n) => Value::Int(n.into()),
            DuckValue::Int(n) => Value::Int(n.into()),
            DuckValue::BigInt(n) => Value::Int(n),
            DuckValue::UTinyInt(n) => Value::Int(n.into()),
            DuckValue::USmallInt(n) => Value::Int(n.into()),
            DuckValue::UInt(n) => Value::Int(n.into()),
            DuckValue::Text(s) => Value::Text(s),
            other => Value::Text(format!("{other:?}")),
        }
    }
}

impl Connection for DuckDbConnection {
    fn backend_name(&self) -> &'static str {
        "duckdb"
    }

    fn execute(&mut self, sql: &str, params: &[Param<'_>]) -> DbResult<u64> {
        let affected = self
            .conn
            .execute(sql, duckdb::params_from_iter(params.iter().copied()))
            .map_err(|e| DbError::ExecutionError(format!("{e}: {sql}")))?;
        Ok(affected as u64)
    }

    fn execute_batch(&mut self, sql: &str) -> DbResult<()> {
        self.conn
            .execute_batch(sql)
            .map_err(|e| DbError::ExecutionError(e.to_string()))
    }

    fn query(&mut self, sql: &str, params: &[Param<'_>]) -> DbResult<Vec<Row>> {
        let mut stmt = self
            .conn
            .prepare(sql)
            .map_err(|e| DbError::ExecutionError(format!("{e}: {sql}")))?;

        // Column count is read per row: DuckDB panics on
        // `stmt.column_count()` before the statement has executed.
        let rows = stmt
            .query_map(duckdb::params_from_iter(params.iter().copied()), |row| {
                let col_count = row.as_ref().column_count();
                (0..col_count)
                    .map(|i| row.get::<_, DuckValue>(i).map(Value::from))
                    .collect::<duckdb::Result<Row>>()
            })
            .map_err(|e| DbError::ExecutionError(format!("{e}: {sql}")))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| DbError::ExecutionError(format!("row error: {e}")))?;
        Ok(rows)
    }

    fn begin(&mut self) -> DbResult<()> {
        self.conn
            .execute_batch("BEGIN TRANSACTION")
            .map_err(|e| DbError::TransactionError(format!("BEGIN failed: {e}")))
    }

    fn commit(&mut self) -> DbResult<()> {
        self.conn
            .execute_batch("COMMIT")
            .map_err(|e| DbError::TransactionError(format!("COMMIT failed: {e}")))
    }

    fn rollback(&mut self) -> DbResult<()> {
        self.conn
            .execute_batch("ROLLBACK")
            .map_err(|e| DbError::TransactionError(format!("ROLLBACK failed: {e}")))
    }

    fn lock(&mut self, ctx: &Context, key: i64) -> DbResult<()> {
        self.locks.acquire(ctx, key)?;
        self.held.push(key);
        Ok(())
    }

    fn unlock(&mut self, key: i64) -> DbResult<bool> {
        let Some(pos) = self.held.iter().position(|k| *k == key) else {
            return Ok(false);
        };
        self.held.remove(pos);
        self.locks.release(key)
    }

    fn set_search_path(&mut self, namespace: &str) -> DbResult<()> {
        let path = format!("{},main", quote_ident(namespace));
        self.execute_batch(&format!("SET search_path = {}", quote_literal(&path)))
    }

    fn reset_search_path(&mut self) -> DbResult<()> {
        self.execute_batch("RESET search_path")
    }
}

impl Drop for DuckDbConnection {
    fn drop(&mut self) {
        // Session end releases session locks, as with PostgreSQL.
        for key in self.held.drain(..) {
            if let Err(e) = self.locks.release(key) {
                log::warn!("Failed to release DuckDB lock {key} on close: {e}");
            }
        }
    }
}

#[cfg(test)]
#[path = "duckdb_test.rs"]
mod tests;
