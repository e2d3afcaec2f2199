use super::*;
use std::fs;
use tempfile::TempDir;

fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_load_inline_schema() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        "schema.yml",
        r#"
name: shop
changes:
  - id: create_customers
    statement: CREATE TABLE customers (id INTEGER PRIMARY KEY)
  - id: create_orders
    statement: |
      CREATE TABLE orders (
        id INTEGER PRIMARY KEY,
        customer_id INTEGER
      );
"#,
    );

    let schema = load_schema(&path).unwrap();
    assert_eq!(schema.name, "shop");
    assert_eq!(schema.changes.len(), 2);
    assert_eq!(schema.changes[0].id, "create_customers");
    assert!(schema.changes[1].statement.contains("customer_id"));
}

#[test]
fn test_load_schema_with_file_change() {
    let dir = TempDir::new().unwrap();
    write(&dir, "sql/add_index.sql", "CREATE INDEX idx ON orders (id);");
    let path = write(
        &dir,
        "schema.yml",
        r#"
name: shop
changes:
  - id: add_index
    file: sql/add_index.sql
"#,
    );

    let schema = load_schema(&path).unwrap();
    assert_eq!(
        schema.changes[0].statement,
        "CREATE INDEX idx ON orders (id);"
    );
}

#[test]
fn test_change_with_statement_and_file_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        "schema.yml",
        r#"
name: shop
changes:
  - id: both
    statement: SELECT 1
    file: x.sql
"#,
    );

    let err = load_schema(&path).unwrap_err();
    assert!(matches!(err, CoreError::InvalidChange { ref id, .. } if id == "both"));
}

#[test]
fn test_change_without_sql_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "schema.yml", "name: shop\nchanges:\n  - id: empty\n");
    assert!(matches!(
        load_schema(&path),
        Err(CoreError::InvalidChange { .. })
    ));
}

#[test]
fn test_missing_change_file_reports_path() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        "schema.yml",
        "name: shop\nchanges:\n  - id: a\n    file: nope.sql\n",
    );
    let err = load_schema(&path).unwrap_err();
    assert!(err.to_string().contains("nope.sql"));
}

#[test]
fn test_empty_name_is_left_for_validation() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        "schema.yml",
        "changes:\n  - id: a\n    statement: SELECT 1\n",
    );
    let schema = load_schema(&path).unwrap();
    assert_eq!(schema.name, "");
    assert_eq!(
        crate::validate_schema(&schema),
        Err(crate::ValidationError::MissingName)
    );
}

#[test]
fn test_unknown_schema_field_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "schema.yml", "name: shop\nversion: 3\n");
    assert!(matches!(
        load_schema(&path),
        Err(CoreError::YamlParse { .. })
    ));
}

#[test]
fn test_missing_schema_file() {
    let dir = TempDir::new().unwrap();
    let err = load_schema(&dir.path().join("missing.yml")).unwrap_err();
    assert!(matches!(err, CoreError::FileNotFound { .. }));
}

#[test]
fn test_project_config_defaults() {
    let dir = TempDir::new().unwrap();
    let config = ProjectConfig::load_from_dir(dir.path()).unwrap();
    assert_eq!(config.lock_key, DEFAULT_LOCK_KEY);
    assert!(config.database_url.is_none());
    assert_eq!(config.schema, dir.path().join("schema.yml"));
}

#[test]
fn test_project_config_resolves_schema_relative_to_file() {
    let dir = TempDir::new().unwrap();
    write(
        &dir,
        "keel.yml",
        "database_url: \"duckdb:app.duckdb\"\nschema: db/schema.yml\nlock_key: 42\n",
    );

    let config = ProjectConfig::load_from_dir(dir.path()).unwrap();
    assert_eq!(config.database_url.as_deref(), Some("duckdb:app.duckdb"));
    assert_eq!(config.schema, dir.path().join("db/schema.yml"));
    assert_eq!(config.lock_key, 42);
}

#[test]
fn test_project_config_rejects_blank_url() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "keel.yml", "database_url: \"  \"\n");
    assert!(matches!(
        ProjectConfig::load(&path),
        Err(CoreError::ConfigInvalid { .. })
    ));
}
