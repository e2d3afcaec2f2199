//! Advisory lock scoping.
//!
//! [`with_advisory_lock`] runs a body while a connection holds the lock and
//! always attempts the release afterwards. [`LockTable`] is the in-process
//! keyed lock used by backends without native advisory locks.

use crate::connection::Connection;
use crate::context::{Context, POLL_INTERVAL};
use crate::error::{DbError, DbResult, MigrateError, MigrateResult};
use std::collections::HashSet;
use std::sync::{Condvar, Mutex};

/// Run `body` while `conn` holds advisory lock `key`.
///
/// While the lock is awaited and while `body` runs, a finished `ctx`
/// interrupts the session's running statement where the backend allows it.
///
/// The release step resets the session search path and unlocks. It runs on
/// every exit path of `body`, and the unlock is attempted even when the reset
/// fails. If either fails, the result is [`MigrateError::LockReleaseFailure`]
/// regardless of what `body` returned; the body's own error is logged so it
/// is not lost.
pub fn with_advisory_lock<C, T, F>(
    conn: &mut C,
    ctx: &Context,
    key: i64,
    body: F,
) -> MigrateResult<T>
where
    C: Connection + ?Sized,
    F: FnOnce(&mut C) -> MigrateResult<T>,
{
    let watch = conn.interrupter().map(|interrupt| ctx.on_done(interrupt));

    log::debug!("Acquiring advisory lock {key} ({})", conn.backend_name());
    if let Err(source) = conn.lock(ctx, key) {
        return Err(MigrateError::LockAcquisition { key, source });
    }
    log::debug!("Advisory lock {key} acquired");

    let result = body(conn);

    // The release must not be interrupted. A cancel request sent just before
    // the watcher stopped can still land on the first release statement.
    drop(watch);
    let reset = match conn.reset_search_path() {
        Err(DbError::Interrupted(_)) => conn.reset_search_path(),
        other => other,
    };
    let unlocked = match conn.unlock(key) {
        Err(DbError::Interrupted(_)) => conn.unlock(key),
        other => other,
    };
    let failure = match (reset, unlocked) {
        (Ok(()), Ok(true)) => {
            log::debug!("Advisory lock {key} released");
            return result;
        }
        (Err(e), Ok(true)) => format!("search path reset failed: {e}"),
        (_, Ok(false)) => "lock was not held by this session".to_string(),
        (_, Err(e)) => e.to_string(),
    };

    if let Err(body_err) = &result {
        log::warn!("Error superseded by lock release failure: {body_err}");
    }
    Err(MigrateError::LockReleaseFailure {
        key,
        message: failure,
    })
}

/// Keyed, blocking, non-reentrant lock shared by connections of one process.
#[derive(Debug, Default)]
pub struct LockTable {
    held: Mutex<HashSet<i64>>,
    released: Condvar,
}

impl LockTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until `key` is free, then take it.
    ///
    /// Returns [`DbError::Interrupted`] without taking the key once `ctx` is
    /// done.
    pub fn acquire(&self, ctx: &Context, key: i64) -> DbResult<()> {
        let mut held = self
            .held
            .lock()
            .map_err(|e| DbError::MutexPoisoned(e.to_string()))?;
        while held.contains(&key) {
            if ctx.is_done() {
                return Err(DbError::Interrupted(format!(
                    "gave up waiting for lock {key}"
                )));
            }
            held = self
                .released
                .wait_timeout(held, POLL_INTERVAL)
                .map_err(|e| DbError::MutexPoisoned(e.to_string()))?
                .0;
        }
        held.insert(key);
        Ok(())
    }

    /// Free `key`; returns `false` if it was not taken.
    pub fn release(&self, key: i64) -> DbResult<bool> {
        let mut held = self
            .held
            .lock()
            .map_err(|e| DbError::MutexPoisoned(e.to_string()))?;
        let removed = held.remove(&key);
        drop(held);
        self.released.notify_all();
        Ok(removed)
    }

    pub fn is_held(&self, key: i64) -> bool {
        self.held.lock().map(|h| h.contains(&key)).unwrap_or(false)
    }
}

#[cfg(test)]
#[path = "lock_test.rs"]
mod tests;
