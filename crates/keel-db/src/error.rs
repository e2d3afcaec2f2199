//! Error types for keel-db

use keel_core::{OrderingError, ValidationError};
use thiserror::Error;

/// Low-level database errors raised by [`crate::Connection`] implementations
#[derive(Error, Debug)]
pub enum DbError {
    /// Connection error (D001)
    #[error("[D001] Database connection failed: {0}")]
    ConnectionError(String),

    /// Query execution error (D002)
    #[error("[D002] SQL execution failed: {0}")]
    ExecutionError(String),

    /// Transaction control error (D003)
    #[error("[D003] Transaction failed: {0}")]
    TransactionError(String),

    /// Mutex poisoned (D004)
    #[error("[D004] Lock table mutex poisoned: {0}")]
    MutexPoisoned(String),

    /// A query returned something other than what the caller expects (D005)
    #[error("[D005] Unexpected query result: {0}")]
    UnexpectedResult(String),

    /// A wait or statement was stopped because its context finished (D006)
    #[error("[D006] Interrupted: {0}")]
    Interrupted(String),
}

/// Result type alias for DbError
pub type DbResult<T> = Result<T, DbError>;

impl From<duckdb::Error> for DbError {
    fn from(err: duckdb::Error) -> Self {
        DbError::ExecutionError(err.to_string())
    }
}

impl From<postgres::Error> for DbError {
    fn from(err: postgres::Error) -> Self {
        // `Display` on a server error only says "db error"; the detail
        // carries the actual message.
        match err.as_db_error() {
            Some(db) if *db.code() == postgres::error::SqlState::QUERY_CANCELED => {
                DbError::Interrupted(db.message().to_string())
            }
            Some(db) => DbError::ExecutionError(format!("{}: {}", db.code().code(), db.message())),
            None if err.is_closed() => DbError::ConnectionError(err.to_string()),
            None => DbError::ExecutionError(err.to_string()),
        }
    }
}

/// Errors returned by the migration [`crate::Applier`].
///
/// Every variant that touches the database names the namespace (and, where
/// relevant, the change id and version) so an operator can locate the problem.
#[derive(Error, Debug)]
pub enum MigrateError {
    /// Malformed schema, detected before any I/O (K001)
    #[error("[K001] Invalid schema: {0}")]
    Validation(#[from] ValidationError),

    /// Declared changes disagree with the applied history (K002)
    #[error("[K002] Schema '{namespace}' does not match its applied history: {source}")]
    Ordering {
        namespace: String,
        source: OrderingError,
    },

    /// Could not obtain a connection (K003)
    #[error("[K003] Could not open a database connection: {0}")]
    Connection(#[source] DbError),

    /// Could not acquire the advisory lock (K004)
    #[error("[K004] Could not acquire advisory lock {key}: {source}")]
    LockAcquisition { key: i64, source: DbError },

    /// Could not create, drop, or enter the namespace and bookkeeping tables (K005)
    #[error("[K005] Bookkeeping setup failed for '{namespace}': {source}")]
    Setup { namespace: String, source: DbError },

    /// Could not read the persisted migration state (K006)
    #[error("[K006] Could not read migration state for '{namespace}': {source}")]
    StateRead { namespace: String, source: DbError },

    /// A previous run started a change and never finished it (K007)
    #[error(
        "[K007] Schema '{namespace}' is dirty at version {version}: a previous run failed mid-change and needs manual repair"
    )]
    DirtySchema { namespace: String, version: i64 },

    /// A change statement or its bookkeeping writes failed (K008)
    #[error("[K008] Could not apply change '{id}' (version {version}) to '{namespace}': {source}")]
    ChangeApplication {
        namespace: String,
        id: String,
        version: i64,
        source: DbError,
    },

    /// The change transaction failed to commit (K009)
    #[error("[K009] Could not commit change '{id}' (version {version}) to '{namespace}': {source}")]
    Commit {
        namespace: String,
        id: String,
        version: i64,
        source: DbError,
    },

    /// The advisory lock could not be released; its state is unknown (K010)
    #[error("[K010] Failed to release advisory lock {key}, lock state is unknown: {message}")]
    LockReleaseFailure { key: i64, message: String },

    /// The caller's context was cancelled or timed out (K011)
    #[error("[K011] Migration of '{namespace}' cancelled")]
    Cancelled { namespace: String },

    /// The database URL names no supported backend (K012)
    #[error("[K012] Unsupported database URL: {0}")]
    UnsupportedUrl(String),
}

impl MigrateError {
    /// True when the process can no longer trust the lock state.
    ///
    /// Callers must not retry or continue with other database work after a
    /// fatal error; the only safe reaction is to surface it and exit.
    pub fn is_fatal(&self) -> bool {
        matches!(self, MigrateError::LockReleaseFailure { .. })
    }
}

/// Result type alias for MigrateError
pub type MigrateResult<T> = Result<T, MigrateError>;
