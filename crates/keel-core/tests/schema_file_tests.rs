//! Integration tests for loading the sample project from disk.

use keel_core::{load_schema, pending_changes, validate_schema, ProjectConfig};
use std::path::Path;

const SHOP_DIR: &str = "tests/fixtures/shop";

#[test]
fn test_load_sample_project() {
    let config = ProjectConfig::load_from_dir(Path::new(SHOP_DIR)).unwrap();
    assert_eq!(config.database_url.as_deref(), Some(":memory:"));

    let schema = load_schema(&config.schema).unwrap();
    assert_eq!(schema.name, "shop");
    assert_eq!(schema.target_version(), 3);
    validate_schema(&schema).unwrap();
}

#[test]
fn test_sample_project_file_change_is_inlined() {
    let schema = load_schema(&Path::new(SHOP_DIR).join("schema.yml")).unwrap();
    let orders = schema
        .changes
        .iter()
        .find(|c| c.id == "create_orders")
        .unwrap();
    assert!(orders.statement.contains("REFERENCES customers"));
}

#[test]
fn test_sample_project_plan_after_partial_apply() {
    let schema = load_schema(&Path::new(SHOP_DIR).join("schema.yml")).unwrap();
    let plan = pending_changes(1, &schema.changes);
    let ids: Vec<&str> = plan.iter().map(|p| p.change.id.as_str()).collect();
    assert_eq!(ids, vec!["create_orders", "add_orders_customer_index"]);
    assert_eq!(plan[0].version, 2);
}
