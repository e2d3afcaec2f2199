//! Backend capability trait and URL-based backend selection

use crate::applier::{Applier, ApplierOptions, ApplyReport, SchemaStatus};
use crate::context::Context;
use crate::duckdb::DuckDbConnector;
use crate::error::{MigrateError, MigrateResult};
use crate::postgres::PostgresConnector;
use keel_core::Schema;
use std::path::PathBuf;

/// What callers use to bring a namespace up to date.
///
/// [`Applier`] is the database implementation; tests and alternative
/// storage can substitute their own.
pub trait Backend: Send + Sync {
    /// Apply pending changes, never destroying existing state
    fn apply(&self, ctx: &Context, schema: &Schema) -> MigrateResult<ApplyReport>;

    /// Drop the whole namespace, then apply every change from scratch
    fn destroy_and_apply(&self, ctx: &Context, schema: &Schema) -> MigrateResult<ApplyReport>;

    /// Backend identifier for logging
    fn backend_name(&self) -> &'static str;
}

/// A parsed database URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseUrl {
    Postgres(String),
    /// `None` is an in-memory database
    DuckDb(Option<PathBuf>),
}

impl DatabaseUrl {
    /// Recognizes `postgres://`, `postgresql://`, `duckdb:<path>`,
    /// `duckdb://<path>`, `:memory:`, and bare `*.duckdb` / `*.db` paths.
    pub fn parse(url: &str) -> MigrateResult<Self> {
        let url = url.trim();
        if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            return Ok(DatabaseUrl::Postgres(url.to_string()));
        }
        if url == ":memory:" {
            return Ok(DatabaseUrl::DuckDb(None));
        }
        if let Some(rest) = url.strip_prefix("duckdb:") {
            let path = rest.strip_prefix("//").unwrap_or(rest);
            return Ok(match path {
                "" | ":memory:" => DatabaseUrl::DuckDb(None),
                p => DatabaseUrl::DuckDb(Some(PathBuf::from(p))),
            });
        }
        if url.ends_with(".duckdb") || url.ends_with(".db") {
            return Ok(DatabaseUrl::DuckDb(Some(PathBuf::from(url))));
        }
        Err(MigrateError::UnsupportedUrl(url.to_string()))
    }
}

/// An applier for whichever backend a URL selected.
pub enum AnyApplier {
    DuckDb(Applier<DuckDbConnector>),
    Postgres(Applier<PostgresConnector>),
}

impl AnyApplier {
    pub fn status(&self, ctx: &Context, namespace: &str) -> MigrateResult<SchemaStatus> {
        match self {
            AnyApplier::DuckDb(a) => a.status(ctx, namespace),
            AnyApplier::Postgres(a) => a.status(ctx, namespace),
        }
    }

    fn as_backend(&self) -> &dyn Backend {
        match self {
            AnyApplier::DuckDb(a) => a,
            AnyApplier::Postgres(a) => a,
        }
    }
}

impl Backend for AnyApplier {
    fn apply(&self, ctx: &Context, schema: &Schema) -> MigrateResult<ApplyReport> {
        self.as_backend().apply(ctx, schema)
    }

    fn destroy_and_apply(&self, ctx: &Context, schema: &Schema) -> MigrateResult<ApplyReport> {
        self.as_backend().destroy_and_apply(ctx, schema)
    }

    fn backend_name(&self) -> &'static str {
        self.as_backend().backend_name()
    }
}

/// Build an applier from a database URL.
///
/// Opening a DuckDB file takes DuckDB's file lock for the applier's lifetime;
/// PostgreSQL connections are only opened per operation.
pub fn open_applier(url: &str, options: ApplierOptions) -> MigrateResult<AnyApplier> {
    let applier = match DatabaseUrl::parse(url)? {
        DatabaseUrl::Postgres(url) => {
            let connector = PostgresConnector::new(&url).map_err(MigrateError::Connection)?;
            AnyApplier::Postgres(Applier::with_options(connector, options))
        }
        DatabaseUrl::DuckDb(None) => {
            let connector = DuckDbConnector::in_memory().map_err(MigrateError::Connection)?;
            AnyApplier::DuckDb(Applier::with_options(connector, options))
        }
        DatabaseUrl::DuckDb(Some(path)) => {
            let connector = DuckDbConnector::from_path(&path).map_err(MigrateError::Connection)?;
            AnyApplier::DuckDb(Applier::with_options(connector, options))
        }
    };
    log::debug!("Selected {} backend", applier.backend_name());
    Ok(applier)
}
