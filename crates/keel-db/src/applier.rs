//! Migration applier
//!
//! Applies a [`Schema`]'s pending changes one transaction at a time while
//! holding the advisory lock on a single dedicated connection. The dirty
//! marker is committed before each change starts and cleared by the change's
//! own transaction, so a change that fails or dies half way leaves the
//! namespace visibly dirty.

use crate::backend::Backend;
use crate::connection::{Connection, Connector};
use crate::context::Context;
use crate::error::{DbError, MigrateError, MigrateResult};
use crate::lock::with_advisory_lock;
use crate::state::{self, HistoryEntry, MigrationState};
use keel_core::{
    pending_changes, validate_schema, verify_applied_prefix, PendingChange, Schema,
    DEFAULT_LOCK_KEY,
};
use serde::Serialize;

/// Tunables for an [`Applier`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApplierOptions {
    /// Advisory lock key; must match every other applier of the same database
    pub lock_key: i64,
}

impl Default for ApplierOptions {
    fn default() -> Self {
        Self {
            lock_key: DEFAULT_LOCK_KEY,
        }
    }
}

/// Outcome of a successful apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplyReport {
    pub namespace: String,
    /// The namespace was dropped before applying
    pub destroyed: bool,
    pub from_version: i64,
    pub to_version: i64,
    /// Ids of the changes applied by this call, in order
    pub applied: Vec<String>,
}

/// Persisted state of a namespace, read without taking the lock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaStatus {
    pub namespace: String,
    /// Bookkeeping tables exist
    pub initialized: bool,
    pub state: Option<MigrationState>,
    pub history: Vec<HistoryEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Apply,
    DestroyAndApply,
}

/// The migration applier, generic over how connections are opened.
pub struct Applier<C> {
    connector: C,
    options: ApplierOptions,
}

impl<C: Connector> Applier<C> {
    pub fn new(connector: C) -> Self {
        Self::with_options(connector, ApplierOptions::default())
    }

    pub fn with_options(connector: C, options: ApplierOptions) -> Self {
        Self { connector, options }
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    pub fn options(&self) -> ApplierOptions {
        self.options
    }

    /// Read the persisted state and history of `namespace`.
    pub fn status(&self, ctx: &Context, namespace: &str) -> MigrateResult<SchemaStatus> {
        ctx.check(namespace)?;
        let mut conn = self.connector.connect().map_err(MigrateError::Connection)?;
        let read_err = |source: DbError| MigrateError::StateRead {
            namespace: namespace.to_string(),
            source,
        };

        if !state::bookkeeping_exists(&mut conn, namespace).map_err(read_err)? {
            return Ok(SchemaStatus {
                namespace: namespace.to_string(),
                initialized: false,
                state: None,
                history: Vec::new(),
            });
        }
        let current = state::read_state(&mut conn, namespace).map_err(read_err)?;
        let history = state::read_history(&mut conn, namespace).map_err(read_err)?;
        Ok(SchemaStatus {
            namespace: namespace.to_string(),
            initialized: true,
            state: Some(current),
            history,
        })
    }

    fn run(&self, ctx: &Context, schema: &Schema, mode: Mode) -> MigrateResult<ApplyReport> {
        validate_schema(schema)?;
        ctx.check(&schema.name)?;

        let mut conn = self.connector.connect().map_err(MigrateError::Connection)?;
        log::debug!(
            "Opened {} connection for '{}'",
            conn.backend_name(),
            schema.name
        );

        let result = with_advisory_lock(&mut conn, ctx, self.options.lock_key, |conn| {
            ctx.check(&schema.name)?;
            apply_locked(conn, ctx, schema, mode)
        });

        drop(conn);
        log::debug!("Closed connection for '{}'", schema.name);
        result.map_err(|err| cancelled_if_done(ctx, &schema.name, err))
    }
}

/// Report database work that failed after the context finished as a
/// cancellation: the failure is the interrupted wait or statement.
fn cancelled_if_done(ctx: &Context, namespace: &str, err: MigrateError) -> MigrateError {
    let db_failure = matches!(
        err,
        MigrateError::LockAcquisition { .. }
            | MigrateError::Setup { .. }
            | MigrateError::StateRead { .. }
            | MigrateError::ChangeApplication { .. }
            | MigrateError::Commit { .. }
    );
    if !db_failure || !ctx.is_done() {
        return err;
    }
    log::debug!("Stopped by cancellation: {err}");
    MigrateError::Cancelled {
        namespace: namespace.to_string(),
    }
}

impl<C: Connector> Backend for Applier<C> {
    fn apply(&self, ctx: &Context, schema: &Schema) -> MigrateResult<ApplyReport> {
        self.run(ctx, schema, Mode::Apply)
    }

    fn destroy_and_apply(&self, ctx: &Context, schema: &Schema) -> MigrateResult<ApplyReport> {
        self.run(ctx, schema, Mode::DestroyAndApply)
    }

    fn backend_name(&self) -> &'static str {
        self.connector.backend_name()
    }
}

/// Everything that happens while the lock is held.
fn apply_locked<T: Connection + ?Sized>(
    conn: &mut T,
    ctx: &Context,
    schema: &Schema,
    mode: Mode,
) -> MigrateResult<ApplyReport> {
    let namespace = schema.name.as_str();
    let setup_err = |source: DbError| MigrateError::Setup {
        namespace: namespace.to_string(),
        source,
    };
    let read_err = |source: DbError| MigrateError::StateRead {
        namespace: namespace.to_string(),
        source,
    };

    if mode == Mode::DestroyAndApply {
        state::drop_namespace(conn, namespace).map_err(setup_err)?;
        log::info!("Dropped namespace '{namespace}'");
    }

    state::ensure_bookkeeping(conn, namespace).map_err(setup_err)?;
    conn.set_search_path(namespace).map_err(setup_err)?;

    let current = state::read_state(conn, namespace).map_err(read_err)?;
    if current.dirty {
        return Err(MigrateError::DirtySchema {
            namespace: namespace.to_string(),
            version: current.version,
        });
    }

    let applied = state::read_applied_ids(conn, namespace).map_err(read_err)?;
    verify_applied_prefix(&applied, &schema.changes).map_err(|source| {
        MigrateError::Ordering {
            namespace: namespace.to_string(),
            source,
        }
    })?;

    if current.version > schema.target_version() {
        log::warn!(
            "'{namespace}' is at version {} but the schema declares only {} changes",
            current.version,
            schema.target_version()
        );
    }

    let plan = pending_changes(current.version, &schema.changes);
    log::debug!(
        "'{namespace}' at version {}, {} pending change(s)",
        current.version,
        plan.len()
    );

    let mut report = ApplyReport {
        namespace: namespace.to_string(),
        destroyed: mode == Mode::DestroyAndApply,
        from_version: current.version,
        to_version: current.version,
        applied: Vec::with_capacity(plan.len()),
    };
    for pending in plan {
        ctx.check(namespace)?;
        apply_change(conn, namespace, pending)?;
        report.to_version = pending.version;
        report.applied.push(pending.change.id.clone());
    }
    Ok(report)
}

/// Apply one change in its own transaction.
fn apply_change<T: Connection + ?Sized>(
    conn: &mut T,
    namespace: &str,
    pending: PendingChange<'_>,
) -> MigrateResult<()> {
    let PendingChange { version, change } = pending;
    let change_err = |source: DbError| MigrateError::ChangeApplication {
        namespace: namespace.to_string(),
        id: change.id.clone(),
        version,
        source,
    };

    state::mark_dirty(conn, namespace).map_err(change_err)?;
    conn.begin().map_err(change_err)?;

    let body = match conn.execute_batch(&change.statement) {
        Ok(()) => state::record_applied(conn, namespace, version, change),
        Err(e) => Err(e),
    };
    if let Err(source) = body {
        rollback_quietly(conn, namespace, &change.id);
        return Err(change_err(source));
    }

    if let Err(source) = conn.commit() {
        rollback_quietly(conn, namespace, &change.id);
        return Err(MigrateError::Commit {
            namespace: namespace.to_string(),
            id: change.id.clone(),
            version,
            source,
        });
    }

    log::info!("Applied change '{}' to '{namespace}' (version {version})", change.id);
    Ok(())
}

fn rollback_quietly<T: Connection + ?Sized>(conn: &mut T, namespace: &str, id: &str) {
    if let Err(e) = conn.rollback() {
        log::warn!("Rollback of change '{id}' in '{namespace}' failed: {e}");
    }
}

#[cfg(test)]
#[path = "applier_test.rs"]
mod tests;
