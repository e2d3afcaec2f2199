//! Shared utilities for CLI commands

use anyhow::{Context as _, Result};
use keel_core::{load_schema, validate_schema, ProjectConfig, Schema};
use keel_db::{
    open_applier, AnyApplier, ApplierOptions, Context, DbError, MigrateError, MigrateResult,
};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::cli::GlobalArgs;

/// Error type representing a non-zero process exit code.
///
/// Use `return Err(ExitCode(N).into())` instead of `std::process::exit(N)`
/// so that RAII destructors run and cleanup happens properly.
#[derive(Debug)]
pub(crate) struct ExitCode(pub(crate) i32);

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Intentionally empty: ExitCode is a control-flow mechanism, not a
        // user-facing error. If anyhow's Display chain ever reaches this
        // (e.g. downcast_ref fails in main.rs), we don't want "exit code N"
        // leaking into stderr.
        write!(f, "")
    }
}

impl std::error::Error for ExitCode {}

/// Exit code for a namespace left dirty by an earlier run
pub(crate) const EXIT_DIRTY: i32 = 2;
/// Exit code when the advisory lock state is unknown
pub(crate) const EXIT_LOCK_RELEASE: i32 = 3;
/// Exit code after Ctrl-C
pub(crate) const EXIT_CANCELLED: i32 = 130;

/// Load `keel.yml` from `--config`, or from the working directory when present.
pub(crate) fn load_config(global: &GlobalArgs) -> Result<ProjectConfig> {
    match &global.config {
        Some(path) => ProjectConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => ProjectConfig::load_from_dir(Path::new("."))
            .context("Failed to load keel.yml from the current directory"),
    }
}

/// The schema file to use: the command's `--schema`, else `keel.yml`'s.
pub(crate) fn schema_path(config: &ProjectConfig, flag: Option<&Path>) -> PathBuf {
    flag.map(Path::to_path_buf)
        .unwrap_or_else(|| config.schema.clone())
}

/// Load a schema file and validate it.
pub(crate) fn load_valid_schema(path: &Path) -> Result<Schema> {
    let schema = load_schema(path)
        .with_context(|| format!("Failed to load schema from {}", path.display()))?;
    validate_schema(&schema).with_context(|| format!("Invalid schema in {}", path.display()))?;
    Ok(schema)
}

/// Resolve the database URL: flag or `KEEL_DATABASE_URL`, then `keel.yml`.
pub(crate) fn database_url(global: &GlobalArgs, config: &ProjectConfig) -> Result<String> {
    global
        .database_url
        .clone()
        .or_else(|| config.database_url.clone())
        .context(
            "No database URL: pass --database-url, set KEEL_DATABASE_URL, or add database_url to keel.yml",
        )
}

/// Resolve applier options: flag or `KEEL_LOCK_KEY`, then `keel.yml`.
pub(crate) fn applier_options(global: &GlobalArgs, config: &ProjectConfig) -> ApplierOptions {
    ApplierOptions {
        lock_key: global.lock_key.unwrap_or(config.lock_key),
    }
}

/// Open the applier for the resolved database URL.
pub(crate) fn open(global: &GlobalArgs, config: &ProjectConfig) -> Result<AnyApplier> {
    let url = database_url(global, config)?;
    match open_applier(&url, applier_options(global, config)) {
        Ok(applier) => Ok(applier),
        Err(err) if is_file_in_use(&err) => Err(anyhow::Error::new(err).context(
            "The database file is open in another process; retry once that process exits",
        )),
        Err(err) => Err(err.into()),
    }
}

/// DuckDB refuses a file another process holds instead of waiting for it.
fn is_file_in_use(err: &MigrateError) -> bool {
    matches!(
        err,
        MigrateError::Connection(DbError::ConnectionError(message))
            if message.contains("Could not set lock on file")
    )
}

/// Run a blocking applier call off the async runtime.
///
/// Ctrl-C cancels the call's [`Context`]. The applier stops waiting for the
/// lock, or interrupts the running change where the backend allows it, then
/// releases the lock.
pub(crate) async fn run_blocking<T, F>(f: F) -> Result<MigrateResult<T>>
where
    T: Send + 'static,
    F: FnOnce(&Context) -> MigrateResult<T> + Send + 'static,
{
    let (ctx, token) = Context::with_cancel();

    let signal = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nReceived Ctrl-C. Cancelling...");
            token.cancel();
        }
    });

    let result = tokio::task::spawn_blocking(move || f(&ctx))
        .await
        .context("Applier task panicked");
    signal.abort();
    result
}

/// Report a migration failure on stderr and convert it to an exit code.
pub(crate) fn migrate_failure(err: MigrateError) -> anyhow::Error {
    let code = match &err {
        MigrateError::Cancelled { .. } => EXIT_CANCELLED,
        MigrateError::DirtySchema { .. } => EXIT_DIRTY,
        e if e.is_fatal() => EXIT_LOCK_RELEASE,
        _ => 1,
    };
    eprintln!("Error: {err}");
    match &err {
        MigrateError::DirtySchema { namespace, .. } => eprintln!(
            "Repair '{namespace}' by hand and clear its dirty flag, or run `keel reset --yes` to rebuild it."
        ),
        e if e.is_fatal() => {
            log::error!("Advisory lock state unknown, stopping: {e}");
            eprintln!("The advisory lock may still be held; do not retry from this process.");
        }
        _ => {}
    }
    ExitCode(code).into()
}

/// Print `value` as pretty JSON.
pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{json}");
    Ok(())
}

#[cfg(test)]
#[path = "common_test.rs"]
mod tests;
