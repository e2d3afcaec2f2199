use super::*;
use crate::connection::Connector;
use crate::duckdb::{DuckDbConnection, DuckDbConnector};

fn setup() -> (DuckDbConnector, DuckDbConnection) {
    let connector = DuckDbConnector::in_memory().unwrap();
    let conn = connector.connect().unwrap();
    (connector, conn)
}

#[test]
fn test_ensure_bookkeeping_seeds_clean_state() {
    let (_connector, mut conn) = setup();
    ensure_bookkeeping(&mut conn, "shop").unwrap();

    let state = read_state(&mut conn, "shop").unwrap();
    assert_eq!(
        state,
        MigrationState {
            version: 0,
            dirty: false
        }
    );
    assert!(read_history(&mut conn, "shop").unwrap().is_empty());
}

#[test]
fn test_ensure_bookkeeping_is_idempotent() {
    let (_connector, mut conn) = setup();
    ensure_bookkeeping(&mut conn, "shop").unwrap();
    ensure_bookkeeping(&mut conn, "shop").unwrap();

    let rows = conn
        .query("SELECT COUNT(*) FROM \"shop\".\"schema_migrations\"", &[])
        .unwrap();
    assert_eq!(rows[0][0].as_i64(), Some(1), "exactly one state row");
}

#[test]
fn test_bookkeeping_exists() {
    let (_connector, mut conn) = setup();
    assert!(!bookkeeping_exists(&mut conn, "shop").unwrap());
    ensure_bookkeeping(&mut conn, "shop").unwrap();
    assert!(bookkeeping_exists(&mut conn, "shop").unwrap());
    assert!(!bookkeeping_exists(&mut conn, "other").unwrap());
}

#[test]
fn test_mark_dirty_persists_outside_transaction() {
    let (_connector, mut conn) = setup();
    ensure_bookkeeping(&mut conn, "shop").unwrap();

    mark_dirty(&mut conn, "shop").unwrap();
    conn.begin().unwrap();
    conn.execute_batch("SELECT 1").unwrap();
    conn.rollback().unwrap();

    assert!(read_state(&mut conn, "shop").unwrap().dirty);
}

#[test]
fn test_record_applied_advances_version_and_history() {
    let (_connector, mut conn) = setup();
    ensure_bookkeeping(&mut conn, "shop").unwrap();
    mark_dirty(&mut conn, "shop").unwrap();

    let change = Change::new("create_customers", "CREATE TABLE customers (id BIGINT)");
    record_applied(&mut conn, "shop", 1, &change).unwrap();

    assert_eq!(
        read_state(&mut conn, "shop").unwrap(),
        MigrationState {
            version: 1,
            dirty: false
        }
    );
    let history = read_history(&mut conn, "shop").unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].version, 1);
    assert_eq!(history[0].id, "create_customers");
    assert_eq!(history[0].statement, change.statement);
    assert!(history[0].applied_at.is_some());

    assert_eq!(
        read_applied_ids(&mut conn, "shop").unwrap(),
        vec![(1, "create_customers".to_string())]
    );
}

#[test]
fn test_history_rejects_reused_id() {
    let (_connector, mut conn) = setup();
    ensure_bookkeeping(&mut conn, "shop").unwrap();
    let change = Change::new("a", "SELECT 1");
    record_applied(&mut conn, "shop", 1, &change).unwrap();
    assert!(record_applied(&mut conn, "shop", 2, &change).is_err());
}

#[test]
fn test_drop_namespace_is_idempotent() {
    let (_connector, mut conn) = setup();
    drop_namespace(&mut conn, "shop").unwrap();
    ensure_bookkeeping(&mut conn, "shop").unwrap();
    drop_namespace(&mut conn, "shop").unwrap();
    assert!(!bookkeeping_exists(&mut conn, "shop").unwrap());
}

#[test]
fn test_quoted_namespace() {
    let (_connector, mut conn) = setup();
    ensure_bookkeeping(&mut conn, "Shop Floor").unwrap();
    assert!(bookkeeping_exists(&mut conn, "Shop Floor").unwrap());
    assert_eq!(read_state(&mut conn, "Shop Floor").unwrap().version, 0);
}

#[test]
fn test_parse_timestamp_formats() {
    assert!(parse_timestamp("2026-10-16 08:30:00").is_some());
    assert!(parse_timestamp("2026-10-16 08:30:00.123456").is_some());
    assert!(parse_timestamp("yesterday").is_none());
}
