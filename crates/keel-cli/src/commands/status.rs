//! Status command implementation

use anyhow::Result;
use keel_db::SchemaStatus;

use crate::cli::{GlobalArgs, OutputFormat, StatusArgs};
use crate::commands::common::{
    load_config, load_valid_schema, migrate_failure, open, print_json, run_blocking, schema_path,
};

/// Execute the status command
pub async fn execute(args: &StatusArgs, global: &GlobalArgs) -> Result<()> {
    let config = load_config(global)?;
    let namespace = match &args.namespace {
        Some(name) => name.clone(),
        None => load_valid_schema(&schema_path(&config, args.schema.as_deref()))?.name,
    };
    let applier = open(global, &config)?;

    let status = run_blocking(move |ctx| applier.status(ctx, &namespace))
        .await?
        .map_err(migrate_failure)?;

    match args.output {
        OutputFormat::Json => print_json(&status),
        OutputFormat::Text => {
            print_status(&status);
            Ok(())
        }
    }
}

fn print_status(status: &SchemaStatus) {
    let Some(state) = &status.state else {
        println!("'{}' has no migration state", status.namespace);
        return;
    };

    println!("Namespace: {}", status.namespace);
    println!("Version:   {}", state.version);
    println!("Dirty:     {}", if state.dirty { "yes" } else { "no" });

    if status.history.is_empty() {
        return;
    }
    println!();
    println!("{:>7}  {:<40}  APPLIED AT", "VERSION", "ID");
    for entry in &status.history {
        let applied_at = entry
            .applied_at
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!("{:>7}  {:<40}  {}", entry.version, entry.id, applied_at);
    }
}
