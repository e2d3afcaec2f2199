//! PostgreSQL connector implementation
//!
//! Uses the blocking `postgres` client. The advisory lock is
//! `pg_advisory_lock`, which is session-scoped and cluster-wide, so closing
//! the client also releases it.

use crate::connection::{Connection, Connector, Interrupt, Param, Row, Value};
use crate::context::Context;
use crate::error::{DbError, DbResult};
use keel_core::sql_utils::quote_ident;
use postgres::types::{ToSql, Type};
use postgres::{Client, Config, NoTls};
use std::str::FromStr;

/// Opens PostgreSQL sessions from a connection URL.
pub struct PostgresConnector {
    config: Config,
}

impl PostgresConnector {
    /// Parse a `postgres://` / `postgresql://` URL or a key=value string.
    pub fn new(url: &str) -> DbResult<Self> {
        let config = Config::from_str(url).map_err(|e| DbError::ConnectionError(e.to_string()))?;
        Ok(Self { config })
    }
}

impl Connector for PostgresConnector {
    type Conn = PostgresConnection;

    fn connect(&self) -> DbResult<PostgresConnection> {
        let mut client = self
            .config
            .connect(NoTls)
            .map_err(|e| DbError::ConnectionError(e.to_string()))?;
        let version = client
            .query_one("SHOW server_version", &[])
            .and_then(|row| row.try_get::<_, String>(0))
            .map_err(|e| DbError::ConnectionError(format!("not a PostgreSQL server: {e}")))?;
        log::debug!("Connected to PostgreSQL {version}");
        Ok(PostgresConnection { client })
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}

/// One PostgreSQL session.
pub struct PostgresConnection {
    client: Client,
}

fn as_sql<'a>(param: &'a Param<'_>) -> &'a (dyn ToSql + Sync) {
    match param {
        Param::Int(v) => v,
        Param::Bool(v) => v,
        Param::Text(v) => v,
    }
}

fn bind<'a>(params: &'a [Param<'_>]) -> Vec<&'a (dyn ToSql + Sync)> {
    params.iter().map(as_sql).collect()
}

fn column_value(row: &postgres::Row, idx: usize) -> DbResult<Value> {
    let ty = row.columns()[idx].type_();
    let value = if *ty == Type::INT8 {
        row.try_get::<_, Option<i64>>(idx)?.map(Value::Int)
    } else if *ty == Type::INT4 {
        row.try_get::<_, Option<i32>>(idx)?
            .map(|n| Value::Int(n.into()))
    } else if *ty == Type::INT2 {
        row.try_get::<_, Option<i16>>(idx)?
            .map(|n| Value::Int(n.into()))
    } else if *ty == Type::BOOL {
        row.try_get::<_, Option<bool>>(idx)?.map(Value::Bool)
    } else {
        row.try_get::<_, Option<String>>(idx)?.map(Value::Text)
    };
    Ok(value.unwrap_or(Value::Null))
}

impl Connection for PostgresConnection {
    fn backend_name(&self) -> &'static str {
        "postgres"
    }

    fn execute(&mut self, sql: &str, params: &[Param<'_>]) -> DbResult<u64> {
        Ok(self.client.execute(sql, &bind(params))?)
    }

    fn execute_batch(&mut self, sql: &str) -> DbResult<()> {
        Ok(self.client.batch_execute(sql)?)
    }

    fn query(&mut self, sql: &str, params: &[Param<'_>]) -> DbResult<Vec<Row>> {
        let rows = self.client.query(sql, &bind(params))?;
        rows.iter()
            .map(|row| {
                (0..row.len())
                    .map(|i| column_value(row, i))
                    .collect::<DbResult<Row>>()
            })
            .collect()
    }

    fn begin(&mut self) -> DbResult<()> {
        self.client
            .batch_execute("BEGIN")
            .map_err(|e| DbError::TransactionError(format!("BEGIN failed: {}", DbError::from(e))))
    }

    fn commit(&mut self) -> DbResult<()> {
        self.client
            .batch_execute("COMMIT")
            .map_err(|e| DbError::TransactionError(format!("COMMIT failed: {}", DbError::from(e))))
    }

    fn rollback(&mut self) -> DbResult<()> {
        self.client.batch_execute("ROLLBACK").map_err(|e| {
            DbError::TransactionError(format!("ROLLBACK failed: {}", DbError::from(e)))
        })
    }

    /// `pg_advisory_lock` itself cannot see `ctx`; a finished context
    /// cancels it through [`Connection::interrupter`].
    fn lock(&mut self, ctx: &Context, key: i64) -> DbResult<()> {
        if ctx.is_done() {
            return Err(DbError::Interrupted(format!(
                "context finished before taking lock {key}"
            )));
        }
        self.client
            .execute("SELECT pg_advisory_lock($1)", &[&key])?;
        Ok(())
    }

    fn unlock(&mut self, key: i64) -> DbResult<bool> {
        let row = self
            .client
            .query_one("SELECT pg_advisory_unlock($1)", &[&key])?;
        Ok(row.try_get::<_, bool>(0)?)
    }

    fn set_search_path(&mut self, namespace: &str) -> DbResult<()> {
        self.execute_batch(&format!(
            "SET search_path TO {}, public",
            quote_ident(namespace)
        ))
    }

    fn reset_search_path(&mut self) -> DbResult<()> {
        self.execute_batch("SET search_path TO DEFAULT")
    }

    fn interrupter(&self) -> Option<Interrupt> {
        let token = self.client.cancel_token();
        Some(Box::new(move || {
            log::debug!("Cancelling running PostgreSQL statement");
            if let Err(e) = token.cancel_query(NoTls) {
                log::warn!("Failed to send PostgreSQL cancel request: {e}");
            }
        }))
    }
}
