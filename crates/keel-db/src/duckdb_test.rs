use super::*;

fn connect(connector: &DuckDbConnector) -> DuckDbConnection {
    connector.connect().unwrap()
}

#[test]
fn test_in_memory() {
    let connector = DuckDbConnector::in_memory().unwrap();
    assert_eq!(connector.backend_name(), "duckdb");
    assert_eq!(connect(&connector).backend_name(), "duckdb");
}

#[test]
fn test_new_handles_memory_special_case() {
    let connector = DuckDbConnector::new(":memory:").unwrap();
    let mut conn = connect(&connector);
    let rows = conn.query("SELECT 1", &[]).unwrap();
    assert_eq!(rows, vec![vec![Value::Int(1)]]);
}

#[test]
fn test_connections_share_one_database() {
    let connector = DuckDbConnector::in_memory().unwrap();
    let mut first = connect(&connector);
    first
        .execute_batch("CREATE TABLE t (id BIGINT); INSERT INTO t VALUES (1), (2);")
        .unwrap();

    let mut second = connect(&connector);
    let rows = second.query("SELECT COUNT(*) FROM t", &[]).unwrap();
    assert_eq!(rows[0][0].as_i64(), Some(2));
}

#[test]
fn test_parametrized_execute_and_query() {
    let connector = DuckDbConnector::in_memory().unwrap();
    let mut conn = connect(&connector);
    conn.execute_batch("CREATE TABLE kv (k VARCHAR, v BIGINT, flag BOOLEAN)")
        .unwrap();

    let affected = conn
        .execute(
            "INSERT INTO kv VALUES ($1, $2, $3)",
            &[Param::Text("a"), Param::Int(10), Param::Bool(true)],
        )
        .unwrap();
    assert_eq!(affected, 1);

    let rows = conn
        .query("SELECT k, v, flag FROM kv WHERE k = $1", &[Param::Text("a")])
        .unwrap();
    assert_eq!(
        rows,
        vec![vec![
            Value::Text("a".to_string()),
            Value::Int(10),
            Value::Bool(true)
        ]]
    );
}

#[test]
fn test_query_null_column() {
    let connector = DuckDbConnector::in_memory().unwrap();
    let mut conn = connect(&connector);
    let rows = conn.query("SELECT NULL", &[]).unwrap();
    assert_eq!(rows[0][0], Value::Null);
}

#[test]
fn test_rollback_discards_changes() {
    let connector = DuckDbConnector::in_memory().unwrap();
    let mut conn = connect(&connector);
    conn.execute_batch("CREATE TABLE t (id BIGINT)").unwrap();

    conn.begin().unwrap();
    conn.execute("INSERT INTO t VALUES ($1)", &[Param::Int(1)])
        .unwrap();
    conn.rollback().unwrap();

    let rows = conn.query("SELECT COUNT(*) FROM t", &[]).unwrap();
    assert_eq!(rows[0][0].as_i64(), Some(0));
}

#[test]
fn test_failed_batch_reports_execution_error() {
    let connector = DuckDbConnector::in_memory().unwrap();
    let mut conn = connect(&connector);
    let err = conn.execute_batch("CREATE TABLE broken (").unwrap_err();
    assert!(matches!(err, DbError::ExecutionError(_)));
}

#[test]
fn test_search_path_routes_unqualified_ddl() {
    let connector = DuckDbConnector::in_memory().unwrap();
    let mut conn = connect(&connector);
    conn.execute_batch("CREATE SCHEMA shop").unwrap();

    conn.set_search_path("shop").unwrap();
    conn.execute_batch("CREATE TABLE customers (id BIGINT)")
        .unwrap();
    conn.reset_search_path().unwrap();

    let rows = conn
        .query(
            "SELECT COUNT(*) FROM information_schema.tables \
             WHERE table_schema = 'shop' AND table_name = 'customers'",
            &[],
        )
        .unwrap();
    assert_eq!(rows[0][0].as_i64(), Some(1));
}

#[test]
fn test_unlock_without_lock_reports_false() {
    let connector = DuckDbConnector::in_memory().unwrap();
    let mut conn = connect(&connector);
    assert!(!conn.unlock(5).unwrap());
}

#[test]
fn test_unlock_by_other_session_reports_false() {
    let connector = DuckDbConnector::in_memory().unwrap();
    let mut owner = connect(&connector);
    let mut other = connect(&connector);

    owner.lock(&Context::background(), 5).unwrap();
    assert!(!other.unlock(5).unwrap());
    assert!(connector.lock_table().is_held(5));
    assert!(owner.unlock(5).unwrap());
}

#[test]
fn test_dropping_connection_releases_its_locks() {
    let connector = DuckDbConnector::in_memory().unwrap();
    {
        let mut conn = connect(&connector);
        conn.lock(&Context::background(), 5).unwrap();
        assert!(connector.lock_table().is_held(5));
    }
    assert!(!connector.lock_table().is_held(5));
}
