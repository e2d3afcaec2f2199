//! Persisted migration bookkeeping.
//!
//! Each namespace carries two tables: `schema_migrations` with exactly one
//! `(version, dirty)` row, and the append-only `schema_migration_history`.
//! All names are schema-qualified so these helpers never depend on the
//! session search path.

use crate::connection::{Connection, Param, Row, Value};
use crate::error::{DbError, DbResult};
use chrono::NaiveDateTime;
use keel_core::sql_utils::{qualified_table, quote_ident};
use keel_core::Change;
use serde::Serialize;

pub const STATE_TABLE: &str = "schema_migrations";
pub const HISTORY_TABLE: &str = "schema_migration_history";

/// The single persisted `(version, dirty)` row of a namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MigrationState {
    /// Ordinal of the last fully committed change
    pub version: i64,
    /// A change was started and never committed
    pub dirty: bool,
}

/// One applied change, as recorded in the history table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    pub version: i64,
    pub id: String,
    pub statement: String,
    pub applied_at: Option<NaiveDateTime>,
}

/// Drop the namespace and everything in it. Succeeds if it does not exist.
pub fn drop_namespace<C: Connection + ?Sized>(conn: &mut C, namespace: &str) -> DbResult<()> {
    conn.execute_batch(&format!(
        "DROP SCHEMA IF EXISTS {} CASCADE",
        quote_ident(namespace)
    ))
}

/// Create the namespace and bookkeeping tables if missing and seed the state
/// row with `(0, false)` when the state table is empty.
pub fn ensure_bookkeeping<C: Connection + ?Sized>(conn: &mut C, namespace: &str) -> DbResult<()> {
    let state = qualified_table(namespace, STATE_TABLE);
    let history = qualified_table(namespace, HISTORY_TABLE);
    conn.execute_batch(&format!(
        "CREATE SCHEMA IF NOT EXISTS {schema};
         CREATE TABLE IF NOT EXISTS {state} (
             version BIGINT NOT NULL,
             dirty   BOOLEAN NOT NULL
         );
         INSERT INTO {state} (version, dirty)
             SELECT 0, false
             WHERE NOT EXISTS (SELECT 1 FROM {state});
         CREATE TABLE IF NOT EXISTS {history} (
             version    BIGINT NOT NULL,
             id         TEXT NOT NULL PRIMARY KEY,
             statement  TEXT NOT NULL,
             applied_at TIMESTAMP DEFAULT now()
         );",
        schema = quote_ident(namespace),
    ))
}

/// Whether the namespace's state table exists.
pub fn bookkeeping_exists<C: Connection + ?Sized>(conn: &mut C, namespace: &str) -> DbResult<bool> {
    let rows = conn.query(
        "SELECT COUNT(*) FROM information_schema.tables \
         WHERE table_schema = CAST($1 AS TEXT) AND table_name = CAST($2 AS TEXT)",
        &[Param::Text(namespace), Param::Text(STATE_TABLE)],
    )?;
    let count = single_row(rows, "table count")?
        .first()
        .and_then(Value::as_i64)
        .unwrap_or(0);
    Ok(count > 0)
}

/// Read the `(version, dirty)` row.
pub fn read_state<C: Connection + ?Sized>(conn: &mut C, namespace: &str) -> DbResult<MigrationState> {
    let rows = conn.query(
        &format!(
            "SELECT version, dirty FROM {}",
            qualified_table(namespace, STATE_TABLE)
        ),
        &[],
    )?;
    let row = single_row(rows, "migration state")?;
    match row.as_slice() {
        [Value::Int(version), Value::Bool(dirty)] => Ok(MigrationState {
            version: *version,
            dirty: *dirty,
        }),
        other => Err(DbError::UnexpectedResult(format!(
            "migration state row has unexpected shape: {other:?}"
        ))),
    }
}

/// Read `(version, id)` of every applied change, ordered by version.
pub fn read_applied_ids<C: Connection + ?Sized>(
    conn: &mut C,
    namespace: &str,
) -> DbResult<Vec<(i64, String)>> {
    let rows = conn.query(
        &format!(
            "SELECT version, id FROM {} ORDER BY version",
            qualified_table(namespace, HISTORY_TABLE)
        ),
        &[],
    )?;
    rows.into_iter()
        .map(|row| match row.as_slice() {
            [Value::Int(version), Value::Text(id)] => Ok((*version, id.clone())),
            other => Err(DbError::UnexpectedResult(format!(
                "history row has unexpected shape: {other:?}"
            ))),
        })
        .collect()
}

/// Read the full history, ordered by version.
pub fn read_history<C: Connection + ?Sized>(
    conn: &mut C,
    namespace: &str,
) -> DbResult<Vec<HistoryEntry>> {
    let rows = conn.query(
        &format!(
            "SELECT version, id, statement, CAST(applied_at AS TEXT) FROM {} ORDER BY version",
            qualified_table(namespace, HISTORY_TABLE)
        ),
        &[],
    )?;
    rows.into_iter().map(history_entry).collect()
}

fn history_entry(row: Row) -> DbResult<HistoryEntry> {
    match row.as_slice() {
        [Value::Int(version), Value::Text(id), Value::Text(statement), applied_at] => {
            Ok(HistoryEntry {
                version: *version,
                id: id.clone(),
                statement: statement.clone(),
                applied_at: applied_at.as_str().and_then(parse_timestamp),
            })
        }
        other => Err(DbError::UnexpectedResult(format!(
            "history row has unexpected shape: {other:?}"
        ))),
    }
}

fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f").ok()
}

/// Persist the dirty marker outside any change transaction, so it survives a
/// crash or a rolled-back change.
pub fn mark_dirty<C: Connection + ?Sized>(conn: &mut C, namespace: &str) -> DbResult<()> {
    conn.execute(
        &format!(
            "UPDATE {} SET dirty = true",
            qualified_table(namespace, STATE_TABLE)
        ),
        &[],
    )?;
    Ok(())
}

/// Inside the change transaction: advance the version, clear the dirty
/// marker, and append the history row.
pub fn record_applied<C: Connection + ?Sized>(
    conn: &mut C,
    namespace: &str,
    version: i64,
    change: &Change,
) -> DbResult<()> {
    conn.execute(
        &format!(
            "UPDATE {} SET version = $1, dirty = false",
            qualified_table(namespace, STATE_TABLE)
        ),
        &[Param::Int(version)],
    )?;
    conn.execute(
        &format!(
            "INSERT INTO {} (version, id, statement) VALUES ($1, $2, $3)",
            qualified_table(namespace, HISTORY_TABLE)
        ),
        &[
            Param::Int(version),
            Param::Text(&change.id),
            Param::Text(&change.statement),
        ],
    )?;
    Ok(())
}

fn single_row(rows: Vec<Row>, what: &str) -> DbResult<Row> {
    let count = rows.len();
    let mut rows = rows.into_iter();
    match (rows.next(), count) {
        (Some(row), 1) => Ok(row),
        _ => Err(DbError::UnexpectedResult(format!(
            "expected exactly one {what} row, found {count}"
        ))),
    }
}

#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
