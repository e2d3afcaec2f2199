//! Validate command implementation

use anyhow::Result;

use crate::cli::{GlobalArgs, ValidateArgs};
use crate::commands::common::{load_config, load_valid_schema, schema_path};

/// Execute the validate command
pub async fn execute(args: &ValidateArgs, global: &GlobalArgs) -> Result<()> {
    let config = load_config(global)?;
    let path = schema_path(&config, args.schema.as_deref());
    let schema = load_valid_schema(&path)?;

    println!(
        "Schema '{}' is valid: {} change(s) in {}",
        schema.name,
        schema.changes.len(),
        path.display()
    );
    if global.verbose {
        for (idx, change) in schema.changes.iter().enumerate() {
            println!("  {:>4}  {}", idx + 1, change.id);
        }
    }
    Ok(())
}
