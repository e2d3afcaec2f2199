//! Connection capability traits
//!
//! The applier needs very little from a database: run batches and
//! parametrized statements, read a few rows, control transactions, take a
//! session-scoped advisory lock, and point unqualified names at a namespace.
//! [`Connection`] is that surface; [`Connector`] hands out dedicated
//! connections.

use crate::context::Context;
use crate::error::DbResult;

/// A bound statement parameter.
///
/// Placeholders are written `$1`, `$2`, ... which both DuckDB and PostgreSQL
/// accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Param<'a> {
    Int(i64),
    Bool(bool),
    Text(&'a str),
}

/// A column value read back from a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Null,
    Int(i64),
    Bool(bool),
    Text(String),
}

impl Value {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(v) => Some(v),
            _ => None,
        }
    }
}

/// One result row, columns in select order.
pub type Row = Vec<Value>;

/// Stops whatever statement a session is running, from another thread.
pub type Interrupt = Box<dyn FnOnce() + Send>;

/// A single dedicated database session.
///
/// Implementations are not shared between threads; each operation obtains
/// its own connection from a [`Connector`] and drops it when done. Dropping a
/// connection must end the session, releasing any advisory lock it holds.
pub trait Connection: Send {
    /// Backend identifier for logging
    fn backend_name(&self) -> &'static str;

    /// Execute one parametrized statement, returning affected rows
    fn execute(&mut self, sql: &str, params: &[Param<'_>]) -> DbResult<u64>;

    /// Execute one or more `;`-separated statements without parameters
    fn execute_batch(&mut self, sql: &str) -> DbResult<()>;

    /// Run a query and collect every row
    fn query(&mut self, sql: &str, params: &[Param<'_>]) -> DbResult<Vec<Row>>;

    fn begin(&mut self) -> DbResult<()> {
        self.execute_batch("BEGIN TRANSACTION")
    }

    fn commit(&mut self) -> DbResult<()> {
        self.execute_batch("COMMIT")
    }

    fn rollback(&mut self) -> DbResult<()> {
        self.execute_batch("ROLLBACK")
    }

    /// Block until the advisory lock `key` is held by this session.
    ///
    /// Gives up with [`crate::DbError::Interrupted`] once `ctx` is done.
    fn lock(&mut self, ctx: &Context, key: i64) -> DbResult<()>;

    /// Release the advisory lock `key`; returns `false` if it was not held
    fn unlock(&mut self, key: i64) -> DbResult<bool>;

    /// Resolve and create unqualified names inside `namespace`
    fn set_search_path(&mut self, namespace: &str) -> DbResult<()>;

    /// Restore the session's default search path
    fn reset_search_path(&mut self) -> DbResult<()>;

    /// A handle that interrupts this session's running statement, if the
    /// backend supports it
    fn interrupter(&self) -> Option<Interrupt> {
        None
    }
}

/// Factory for dedicated [`Connection`]s.
pub trait Connector: Send + Sync {
    type Conn: Connection;

    /// Open a new session
    fn connect(&self) -> DbResult<Self::Conn>;

    /// Backend identifier for logging
    fn backend_name(&self) -> &'static str;
}
