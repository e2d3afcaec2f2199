//! Integration tests for the applier against file-backed DuckDB databases.
//!
//! These exercise the public keel-db API only: schema loading from the
//! keel-core fixtures, concurrent appliers sharing one database, and state
//! surviving a reopen.

use keel_core::{load_schema, Schema};
use keel_db::{
    open_applier, Applier, ApplierOptions, Backend, Connection, Connector, Context,
    DuckDbConnector, MigrateError, MigrationState,
};
use std::path::Path;
use std::sync::{Arc, Barrier};
use std::thread;

// ── Helpers ────────────────────────────────────────────────────────────

fn fixture_schema() -> Schema {
    load_schema(Path::new("../keel-core/tests/fixtures/shop/schema.yml")).unwrap()
}

fn file_applier(dir: &tempfile::TempDir) -> Applier<DuckDbConnector> {
    let connector = DuckDbConnector::from_path(&dir.path().join("app.duckdb")).unwrap();
    Applier::new(connector)
}

fn history_rows(applier: &Applier<DuckDbConnector>, namespace: &str) -> i64 {
    let mut conn = applier.connector().connect().unwrap();
    let rows = conn
        .query(
            &format!("SELECT COUNT(*) FROM \"{namespace}\".schema_migration_history"),
            &[],
        )
        .unwrap();
    rows[0][0].as_i64().unwrap()
}

// ── Tests ──────────────────────────────────────────────────────────────

#[test]
fn test_apply_fixture_schema() {
    let dir = tempfile::tempdir().unwrap();
    let applier = file_applier(&dir);
    let schema = fixture_schema();

    let report = applier.apply(&Context::background(), &schema).unwrap();
    assert_eq!(report.to_version, 3);
    assert_eq!(
        report.applied,
        vec![
            "create_customers",
            "create_orders",
            "add_orders_customer_index"
        ]
    );

    let mut conn = applier.connector().connect().unwrap();
    conn.execute_batch(
        "INSERT INTO shop.customers VALUES (1, 'a@example.com');
         INSERT INTO shop.orders VALUES (10, 1, NULL);",
    )
    .unwrap();
}

#[test]
fn test_concurrent_appliers_apply_each_change_once() {
    let dir = tempfile::tempdir().unwrap();
    let applier = Arc::new(file_applier(&dir));
    let schema = Arc::new(fixture_schema());
    let workers = 8;
    let start = Arc::new(Barrier::new(workers));

    let handles: Vec<_> = (0..workers)
        .map(|_| {
            let applier = Arc::clone(&applier);
            let schema = Arc::clone(&schema);
            let start = Arc::clone(&start);
            thread::spawn(move || {
                start.wait();
                applier.apply(&Context::background(), &schema)
            })
        })
        .collect();

    let reports: Vec<_> = handles
        .into_iter()
        .map(|h| h.join().unwrap().unwrap())
        .collect();

    let applied: usize = reports.iter().map(|r| r.applied.len()).sum();
    assert_eq!(applied, 3, "every change applied by exactly one worker");
    assert!(reports.iter().all(|r| r.to_version == 3));
    assert_eq!(history_rows(&applier, "shop"), 3);
}

#[test]
fn test_concurrent_appliers_with_different_namespaces() {
    let dir = tempfile::tempdir().unwrap();
    let applier = Arc::new(file_applier(&dir));

    let handles: Vec<_> = ["north", "south", "east", "west"]
        .into_iter()
        .map(|name| {
            let applier = Arc::clone(&applier);
            thread::spawn(move || {
                let schema = Schema::new(name)
                    .with_change("create_sites", "CREATE TABLE sites (id INTEGER)")
                    .with_change("seed_sites", "INSERT INTO sites VALUES (1), (2)");
                applier.apply(&Context::background(), &schema)
            })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap().unwrap().to_version, 2);
    }
    for name in ["north", "south", "east", "west"] {
        assert_eq!(history_rows(&applier, name), 2);
    }
}

#[test]
fn test_state_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let schema = fixture_schema();
    {
        let applier = file_applier(&dir);
        applier.apply(&Context::background(), &schema).unwrap();
    }

    let applier = file_applier(&dir);
    let status = applier.status(&Context::background(), "shop").unwrap();
    assert_eq!(
        status.state,
        Some(MigrationState {
            version: 3,
            dirty: false
        })
    );
    let report = applier.apply(&Context::background(), &schema).unwrap();
    assert!(report.applied.is_empty());
}

#[test]
fn test_dirty_state_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let broken = Schema::new("shop")
        .with_change("create_customers", "CREATE TABLE customers (id INTEGER)")
        .with_change("bad", "INSERT INTO missing_table VALUES (1)");
    {
        let applier = file_applier(&dir);
        assert!(applier.apply(&Context::background(), &broken).is_err());
    }

    let applier = file_applier(&dir);
    let err = applier
        .apply(&Context::background(), &fixture_schema())
        .unwrap_err();
    assert!(matches!(
        err,
        MigrateError::DirtySchema { version: 1, .. }
    ));

    let report = applier
        .destroy_and_apply(&Context::background(), &fixture_schema())
        .unwrap();
    assert_eq!(report.to_version, 3);
}

#[test]
fn test_open_applier_from_duckdb_url() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("duckdb:{}", dir.path().join("url.duckdb").display());
    let applier = open_applier(&url, ApplierOptions::default()).unwrap();
    assert_eq!(applier.backend_name(), "duckdb");

    applier
        .apply(&Context::background(), &fixture_schema())
        .unwrap();
    let status = applier.status(&Context::background(), "shop").unwrap();
    assert_eq!(status.history.len(), 3);
    assert!(dir.path().join("url.duckdb").exists());
}
